//! Runtime values for encoding/decoding (codec representation), including
//! the CHOICE selector.

use crate::codec::CodecError;
use crate::schema::{TypeDescriptor, TypeKind};
use std::collections::HashMap;

/// A decoded or to-be-encoded primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Boolean(bool),
    Integer(i64),
    /// Content bytes plus the count of unused bits in the final byte.
    BitString { unused_bits: u8, bytes: Vec<u8> },
    OctetString(Vec<u8>),
    Null,
    /// OID arcs, e.g. `[1, 3, 6, 1]`.
    ObjectIdentifier(Vec<u64>),
}

impl PrimitiveValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimitiveValue::Integer(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrimitiveValue::Boolean(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PrimitiveValue::OctetString(b) => Some(b),
            PrimitiveValue::BitString { bytes, .. } => Some(bytes),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<&[u64]> {
        match self {
            PrimitiveValue::ObjectIdentifier(arcs) => Some(arcs),
            _ => None,
        }
    }
}

/// A single node of a message tree: one primitive value or one composite.
///
/// A node's shape must conform to its [`TypeDescriptor`]; the codec checks
/// that at both encode and decode boundaries. Each decode call produces a
/// freshly owned tree; nodes are never shared between operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Primitive(PrimitiveValue),
    Sequence(HashMap<String, Node>),
    SequenceOf(Vec<Node>),
    Choice(ChoiceNode),
}

impl Node {
    pub fn integer(v: i64) -> Node {
        Node::Primitive(PrimitiveValue::Integer(v))
    }

    pub fn boolean(v: bool) -> Node {
        Node::Primitive(PrimitiveValue::Boolean(v))
    }

    pub fn octet_string(bytes: impl Into<Vec<u8>>) -> Node {
        Node::Primitive(PrimitiveValue::OctetString(bytes.into()))
    }

    pub fn bit_string(unused_bits: u8, bytes: impl Into<Vec<u8>>) -> Node {
        Node::Primitive(PrimitiveValue::BitString { unused_bits, bytes: bytes.into() })
    }

    pub fn null() -> Node {
        Node::Primitive(PrimitiveValue::Null)
    }

    pub fn object_identifier(arcs: impl Into<Vec<u64>>) -> Node {
        Node::Primitive(PrimitiveValue::ObjectIdentifier(arcs.into()))
    }

    pub fn sequence<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Node {
        Node::Sequence(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn sequence_of(items: impl Into<Vec<Node>>) -> Node {
        Node::SequenceOf(items.into())
    }

    /// A CHOICE node with no alternative selected. Valid only prior to
    /// encode: encoding it fails with [`CodecError::NoAlternativeSelected`].
    pub fn choice_unselected() -> Node {
        Node::Choice(ChoiceNode::unselected())
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Node::Primitive(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_primitive().and_then(PrimitiveValue::as_i64)
    }

    pub fn as_sequence(&self) -> Option<&HashMap<String, Node>> {
        match self {
            Node::Sequence(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence_of(&self) -> Option<&[Node]> {
        match self {
            Node::SequenceOf(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceNode> {
        match self {
            Node::Choice(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_choice_mut(&mut self) -> Option<&mut ChoiceNode> {
        match self {
            Node::Choice(c) => Some(c),
            _ => None,
        }
    }
}

/// The value of a CHOICE: at most one alternative, held in a single slot.
///
/// Exactly-one-active is a property of the representation, not of a
/// validation pass: there is no state in which two alternatives are
/// populated, and selecting a new alternative replaces the slot in one
/// assignment. The generated-binding pattern of one hidden boolean per
/// alternative (with every setter clearing all the others) collapses into
/// this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceNode {
    selected: Option<(String, Box<Node>)>,
}

impl ChoiceNode {
    pub fn unselected() -> Self {
        ChoiceNode::default()
    }

    /// Select `alternative`, replacing any previous selection. Re-selecting
    /// the currently active alternative just overwrites its value.
    ///
    /// Fails with [`CodecError::UnknownAlternative`] when `alternative` is
    /// not declared by `descriptor`, and [`CodecError::UnknownType`] when
    /// `descriptor` is not a CHOICE.
    pub fn select(
        &mut self,
        descriptor: &TypeDescriptor,
        alternative: &str,
        value: Node,
    ) -> Result<(), CodecError> {
        let alternatives = match &descriptor.kind {
            TypeKind::Choice(alts) => alts,
            _ => {
                return Err(CodecError::UnknownType(format!(
                    "{} is not a CHOICE",
                    descriptor.name
                )))
            }
        };
        if !alternatives.iter().any(|f| f.name == alternative) {
            return Err(CodecError::UnknownAlternative(format!(
                "{} has no alternative {:?}",
                descriptor.name, alternative
            )));
        }
        self.selected = Some((alternative.to_string(), Box::new(value)));
        Ok(())
    }

    /// Set the slot without schema validation. Decode uses this after tag
    /// dispatch has already identified the alternative.
    pub(crate) fn select_unchecked(&mut self, alternative: String, value: Node) {
        self.selected = Some((alternative, Box::new(value)));
    }

    /// The active alternative, if any.
    pub fn selected(&self) -> Option<(&str, &Node)> {
        self.selected.as_ref().map(|(name, node)| (name.as_str(), node.as_ref()))
    }

    pub fn is_selected(&self, alternative: &str) -> bool {
        matches!(&self.selected, Some((name, _)) if name == alternative)
    }
}
