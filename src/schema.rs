//! Type metadata driving the codec: descriptors for primitives, SEQUENCE,
//! SEQUENCE OF, and CHOICE, plus per-field tagging and optionality.
//!
//! Descriptors are the runtime stand-in for what an offline ASN.1 schema
//! compiler would emit: plain data, built once per type (normally through
//! [`crate::registry`]), immutable afterwards, and shared via `Arc`. The
//! codec walks them instead of per-message generated code.

use crate::tag::{universal, Tag};
use crate::value::Node;
use std::sync::Arc;

/// The ASN.1 primitive kinds the codec supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
}

impl PrimitiveKind {
    /// The universal tag a value of this kind carries when untagged.
    pub fn universal_tag(self) -> Tag {
        let number = match self {
            PrimitiveKind::Boolean => universal::BOOLEAN,
            PrimitiveKind::Integer => universal::INTEGER,
            PrimitiveKind::BitString => universal::BIT_STRING,
            PrimitiveKind::OctetString => universal::OCTET_STRING,
            PrimitiveKind::Null => universal::NULL,
            PrimitiveKind::ObjectIdentifier => universal::OBJECT_IDENTIFIER,
        };
        Tag::universal(number, false)
    }
}

/// Whether a context tag replaces the value's universal tag (implicit) or
/// wraps the universal TLV one level deeper (explicit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Implicit,
    Explicit,
}

/// A context-specific tag assigned to a field by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextTag {
    pub number: u32,
    pub mode: TagMode,
}

/// One field of a SEQUENCE, or one alternative of a CHOICE.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: Arc<TypeDescriptor>,
    /// Context tag, if the schema assigns one. `None` means the field is
    /// identified by its type's own universal tag.
    pub tag: Option<ContextTag>,
    pub optional: bool,
    /// DEFAULT value: restored on decode when the field is absent. An unset
    /// defaulted field is omitted on encode.
    pub default: Option<Node>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        Field { name: name.into(), ty, tag: None, optional: false, default: None }
    }

    /// Assign an implicit context tag (the common case in MMS-style schemas).
    pub fn tagged(name: impl Into<String>, ty: Arc<TypeDescriptor>, number: u32) -> Self {
        let mut f = Field::new(name, ty);
        f.tag = Some(ContextTag { number, mode: TagMode::Implicit });
        f
    }

    /// Switch an assigned context tag to explicit mode.
    pub fn explicit(mut self) -> Self {
        if let Some(ref mut t) = self.tag {
            t.mode = TagMode::Explicit;
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: Node) -> Self {
        self.default = Some(default);
        self
    }

    /// May this field be absent from the encoding?
    pub fn omittable(&self) -> bool {
        self.optional || self.default.is_some()
    }

    /// Effective tagging mode. A CHOICE has no tag of its own to replace, so
    /// a context tag on a choice-typed field is always explicit (X.690).
    pub fn effective_mode(&self) -> TagMode {
        match self.tag {
            Some(ContextTag { mode, .. }) => {
                if matches!(self.ty.kind, TypeKind::Choice(_)) {
                    TagMode::Explicit
                } else {
                    mode
                }
            }
            None => TagMode::Implicit,
        }
    }

    /// The single outer tag this field encodes with, if it has one.
    /// `None` only for an untagged choice field, whose outer tag is whichever
    /// alternative is selected.
    pub fn wire_tag(&self) -> Option<Tag> {
        match self.tag {
            Some(ContextTag { number, .. }) => {
                let constructed = match self.effective_mode() {
                    TagMode::Explicit => true,
                    TagMode::Implicit => self.ty.is_constructed(),
                };
                Some(Tag::context(number, constructed))
            }
            None => self.ty.own_tag(),
        }
    }

    /// All tags a value of this field can start with on the wire. More than
    /// one entry only for an untagged choice field.
    pub fn expected_tags(&self) -> Vec<Tag> {
        match self.wire_tag() {
            Some(t) => vec![t],
            None => {
                let mut tags = Vec::new();
                self.ty.leading_tags(&mut tags);
                tags
            }
        }
    }

    /// Does an incoming tag identify this field? Compares class and number;
    /// the constructed bit differs between implicit and explicit tagging of
    /// the same field, so it does not participate in dispatch.
    pub fn matches(&self, tag: &Tag) -> bool {
        self.expected_tags().iter().any(|t| t.same_identity(tag))
    }
}

/// The shape of a schema type.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    /// Ordered fields; decode matches them greedily in declared order.
    Sequence(Vec<Field>),
    /// Homogeneous repetition of one element type.
    SequenceOf(Arc<TypeDescriptor>),
    /// Exactly one of the alternatives; first declared tag match wins on
    /// decode.
    Choice(Vec<Field>),
}

/// One schema-derived type: a stable name (the cache identity) plus its shape.
///
/// Read-only after construction; concurrent decode/encode calls share these
/// through `Arc` without locking.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn primitive(name: impl Into<String>, kind: PrimitiveKind) -> Arc<Self> {
        Arc::new(TypeDescriptor { name: name.into(), kind: TypeKind::Primitive(kind) })
    }

    pub fn sequence(name: impl Into<String>, fields: Vec<Field>) -> Arc<Self> {
        Arc::new(TypeDescriptor { name: name.into(), kind: TypeKind::Sequence(fields) })
    }

    pub fn sequence_of(name: impl Into<String>, element: Arc<TypeDescriptor>) -> Arc<Self> {
        Arc::new(TypeDescriptor { name: name.into(), kind: TypeKind::SequenceOf(element) })
    }

    pub fn choice(name: impl Into<String>, alternatives: Vec<Field>) -> Arc<Self> {
        Arc::new(TypeDescriptor { name: name.into(), kind: TypeKind::Choice(alternatives) })
    }

    /// Look up a field (SEQUENCE) or alternative (CHOICE) by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        match &self.kind {
            TypeKind::Sequence(fields) | TypeKind::Choice(fields) => {
                fields.iter().find(|f| f.name == name)
            }
            _ => None,
        }
    }

    /// The universal tag this type carries when untagged. `None` for CHOICE,
    /// which borrows its tag from the selected alternative.
    pub fn own_tag(&self) -> Option<Tag> {
        match &self.kind {
            TypeKind::Primitive(kind) => Some(kind.universal_tag()),
            TypeKind::Sequence(_) | TypeKind::SequenceOf(_) => {
                Some(Tag::universal(universal::SEQUENCE, true))
            }
            TypeKind::Choice(_) => None,
        }
    }

    fn is_constructed(&self) -> bool {
        matches!(self.kind, TypeKind::Sequence(_) | TypeKind::SequenceOf(_))
    }

    /// Collect every tag a value of this type can start with. Recurses into
    /// untagged choice alternatives.
    pub fn leading_tags(&self, out: &mut Vec<Tag>) {
        match &self.kind {
            TypeKind::Choice(alternatives) => {
                for alt in alternatives {
                    out.extend(alt.expected_tags());
                }
            }
            _ => {
                if let Some(t) = self.own_tag() {
                    out.push(t);
                }
            }
        }
    }
}
