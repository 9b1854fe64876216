//! Encode/decode BER TLV streams from type descriptors.
//!
//! The dispatcher walks a [`TypeDescriptor`] and a [`Node`] (encode) or a
//! byte buffer (decode), delegating leaves to [`crate::primitive`] and
//! recursing for SEQUENCE, SEQUENCE OF, and CHOICE. Both directions are
//! synchronous pure computations over in-memory buffers: a malformed or
//! truncated input terminates with an error, never blocks, and leaves
//! cached metadata untouched.

use crate::primitive;
use crate::schema::{Field, TagMode, TypeDescriptor, TypeKind};
use crate::tag::{self, Tag};
use crate::value::{ChoiceNode, Node};
use log::trace;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Bad tag or length framing.
    #[error("malformed TLV: {0}")]
    MalformedTlv(String),
    /// Content octets inconsistent with the primitive kind's rules.
    #[error("malformed primitive: {0}")]
    MalformedPrimitive(String),
    /// A select or decode referenced an alternative not in the schema.
    #[error("unknown alternative: {0}")]
    UnknownAlternative(String),
    /// Encode attempted on an unselected CHOICE.
    #[error("no alternative selected for CHOICE {0}")]
    NoAlternativeSelected(String),
    /// Required SEQUENCE field absent at encode, or unmatched at decode.
    #[error("incomplete value: {0}")]
    IncompleteValue(String),
    /// Declared length exceeds the remaining buffer.
    #[error("truncated input: need {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },
    /// Descriptor lookup or descriptor misuse (e.g. selecting on a
    /// non-CHOICE type).
    #[error("unknown type: {0}")]
    UnknownType(String),
}

/// The encode/decode engine. Stateless apart from its configuration, so one
/// instance serves any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Codec {
    max_depth: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Codec { max_depth: 64 }
    }
}

impl Codec {
    pub fn new() -> Self {
        Codec::default()
    }

    /// Cap on composite nesting, against hostile deeply nested input.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Codec { max_depth }
    }

    /// Encode `node` as one complete TLV of type `ty`.
    pub fn encode(&self, ty: &TypeDescriptor, node: &Node) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode_untagged(ty, node, &mut out, 0)?;
        trace!("encoded {} ({} bytes)", ty.name, out.len());
        Ok(out)
    }

    /// Decode one value of type `ty` from the front of `bytes`, ignoring any
    /// trailing octets (the caller hands in a delimited buffer).
    pub fn decode(&self, ty: &TypeDescriptor, bytes: &[u8]) -> Result<Node, CodecError> {
        self.decode_with_extent(ty, bytes).map(|(node, _)| node)
    }

    /// Decode one value and return how many bytes it consumed.
    pub fn decode_with_extent(
        &self,
        ty: &TypeDescriptor,
        bytes: &[u8],
    ) -> Result<(Node, usize), CodecError> {
        trace!("decoding {} from {} bytes", ty.name, bytes.len());
        self.decode_untagged(ty, bytes, 0)
    }

    // ---- encode ----

    /// Emit the complete TLV for `node` using the type's own universal tag.
    /// For CHOICE the emitted TLV is the selected alternative's.
    fn encode_untagged(
        &self,
        ty: &TypeDescriptor,
        node: &Node,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), CodecError> {
        self.check_depth(ty, depth)?;
        match &ty.kind {
            TypeKind::Choice(_) => self.encode_choice(ty, node, out, depth),
            _ => {
                let tag = ty.own_tag().ok_or_else(|| {
                    CodecError::UnknownType(format!("{} has no universal tag", ty.name))
                })?;
                let content = self.encode_content(ty, node, depth)?;
                emit_tlv(tag, &content, out);
                Ok(())
            }
        }
    }

    /// Emit the TLV for a field value, applying its tagging.
    fn encode_field(
        &self,
        field: &Field,
        node: &Node,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), CodecError> {
        match field.tag {
            None => self.encode_untagged(&field.ty, node, out, depth),
            Some(ctag) => match field.effective_mode() {
                TagMode::Explicit => {
                    // Outer constructed context TLV wrapping the complete
                    // universal TLV.
                    let mut inner = Vec::new();
                    self.encode_untagged(&field.ty, node, &mut inner, depth)?;
                    emit_tlv(Tag::context(ctag.number, true), &inner, out);
                    Ok(())
                }
                TagMode::Implicit => {
                    // Context tag replaces the universal tag at the same
                    // level; content octets are unchanged.
                    self.check_depth(&field.ty, depth)?;
                    let content = self.encode_content(&field.ty, node, depth)?;
                    let outer = field.wire_tag().ok_or_else(|| {
                        CodecError::UnknownType(format!(
                            "field {} has no resolvable tag",
                            field.name
                        ))
                    })?;
                    emit_tlv(outer, &content, out);
                    Ok(())
                }
            },
        }
    }

    /// Content octets of `node` for a non-CHOICE type (CHOICE is always
    /// routed through explicit tagging or its selected alternative).
    fn encode_content(
        &self,
        ty: &TypeDescriptor,
        node: &Node,
        depth: usize,
    ) -> Result<Vec<u8>, CodecError> {
        match (&ty.kind, node) {
            (TypeKind::Primitive(kind), Node::Primitive(value)) => {
                if primitive::kind_of(value) != *kind {
                    return Err(CodecError::MalformedPrimitive(format!(
                        "{}: value kind {:?} does not match {:?}",
                        ty.name,
                        primitive::kind_of(value),
                        kind
                    )));
                }
                primitive::encode_content(value)
            }
            (TypeKind::Sequence(fields), Node::Sequence(entries)) => {
                let mut body = Vec::new();
                self.encode_sequence_body(ty, fields, entries, &mut body, depth + 1)?;
                Ok(body)
            }
            (TypeKind::SequenceOf(element), Node::SequenceOf(items)) => {
                let mut body = Vec::new();
                for item in items {
                    self.encode_untagged(element, item, &mut body, depth + 1)?;
                }
                Ok(body)
            }
            (TypeKind::Choice(_), _) => Err(CodecError::MalformedTlv(format!(
                "{}: CHOICE cannot be implicitly tagged",
                ty.name
            ))),
            (_, _) => Err(CodecError::IncompleteValue(format!(
                "{}: node shape does not match descriptor",
                ty.name
            ))),
        }
    }

    fn encode_sequence_body(
        &self,
        ty: &TypeDescriptor,
        fields: &[Field],
        entries: &HashMap<String, Node>,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), CodecError> {
        for field in fields {
            match entries.get(&field.name) {
                Some(node) => self.encode_field(field, node, out, depth)?,
                // Optional-absent and unset-DEFAULT fields are omitted from
                // the encoding; decode restores the default.
                None if field.omittable() => continue,
                None => {
                    return Err(CodecError::IncompleteValue(format!(
                        "{}: required field {} absent",
                        ty.name, field.name
                    )))
                }
            }
        }
        Ok(())
    }

    fn encode_choice(
        &self,
        ty: &TypeDescriptor,
        node: &Node,
        out: &mut Vec<u8>,
        depth: usize,
    ) -> Result<(), CodecError> {
        let choice = node.as_choice().ok_or_else(|| {
            CodecError::IncompleteValue(format!(
                "{}: node shape does not match descriptor",
                ty.name
            ))
        })?;
        let (name, value) = choice
            .selected()
            .ok_or_else(|| CodecError::NoAlternativeSelected(ty.name.clone()))?;
        let alternative = ty.field(name).ok_or_else(|| {
            CodecError::UnknownAlternative(format!("{} has no alternative {:?}", ty.name, name))
        })?;
        self.encode_field(alternative, value, out, depth)
    }

    // ---- decode ----

    /// Decode one value of `ty` from the front of `buf` using its own
    /// universal tag; for CHOICE, dispatch on the incoming tag across the
    /// alternatives. Returns the node and the bytes consumed.
    fn decode_untagged(
        &self,
        ty: &TypeDescriptor,
        buf: &[u8],
        depth: usize,
    ) -> Result<(Node, usize), CodecError> {
        self.check_depth(ty, depth)?;
        if let TypeKind::Choice(alternatives) = &ty.kind {
            return self.decode_choice(ty, alternatives, buf, depth);
        }
        let header = tag::read_header(buf)?;
        let expected = ty.own_tag().ok_or_else(|| {
            CodecError::UnknownType(format!("{} has no universal tag", ty.name))
        })?;
        if !header.tag.same_identity(&expected) {
            return Err(CodecError::MalformedTlv(format!(
                "{}: expected tag {:?}, got {:?}",
                ty.name, expected, header.tag
            )));
        }
        let (content_len, trailer) = tag::content_extent(buf, &header)?;
        let content = &buf[header.header_len..header.header_len + content_len];
        let node = self.decode_body(ty, content, depth)?;
        Ok((node, header.header_len + content_len + trailer))
    }

    /// Decode the content octets of a non-CHOICE type.
    fn decode_body(
        &self,
        ty: &TypeDescriptor,
        content: &[u8],
        depth: usize,
    ) -> Result<Node, CodecError> {
        match &ty.kind {
            TypeKind::Primitive(kind) => {
                primitive::decode_content(*kind, content).map(Node::Primitive)
            }
            TypeKind::Sequence(fields) => self
                .decode_sequence_body(ty, fields, content, depth + 1)
                .map(Node::Sequence),
            TypeKind::SequenceOf(element) => {
                let mut items = Vec::new();
                let mut pos = 0;
                while pos < content.len() {
                    let (item, used) = self.decode_untagged(element, &content[pos..], depth + 1)?;
                    items.push(item);
                    pos += used;
                }
                Ok(Node::SequenceOf(items))
            }
            TypeKind::Choice(_) => Err(CodecError::MalformedTlv(format!(
                "{}: CHOICE cannot be implicitly tagged",
                ty.name
            ))),
        }
    }

    /// Greedy in-order matching of incoming TLVs against declared fields.
    /// A tag mismatch on an omittable field means "absent, try the next
    /// field"; on a required field it fails the decode.
    fn decode_sequence_body(
        &self,
        ty: &TypeDescriptor,
        fields: &[Field],
        content: &[u8],
        depth: usize,
    ) -> Result<HashMap<String, Node>, CodecError> {
        let mut out = HashMap::new();
        let mut pos = 0;
        for field in fields {
            if pos >= content.len() {
                self.settle_absent(ty, field, &mut out)?;
                continue;
            }
            let (incoming, _) = Tag::decode(&content[pos..])?;
            if field.matches(&incoming) {
                let (node, used) = self.decode_field(field, &content[pos..], depth)?;
                pos += used;
                out.insert(field.name.clone(), node);
            } else {
                trace!(
                    "{}: field {} absent (incoming tag {:?})",
                    ty.name,
                    field.name,
                    incoming
                );
                self.settle_absent(ty, field, &mut out)?;
            }
        }
        if pos != content.len() {
            return Err(CodecError::MalformedTlv(format!(
                "{}: {} trailing octets after last field",
                ty.name,
                content.len() - pos
            )));
        }
        Ok(out)
    }

    /// Handle a field confirmed absent from the encoding: restore its
    /// DEFAULT, skip it if OPTIONAL, or fail if required.
    fn settle_absent(
        &self,
        ty: &TypeDescriptor,
        field: &Field,
        out: &mut HashMap<String, Node>,
    ) -> Result<(), CodecError> {
        if let Some(default) = &field.default {
            out.insert(field.name.clone(), default.clone());
            return Ok(());
        }
        if field.optional {
            return Ok(());
        }
        Err(CodecError::IncompleteValue(format!(
            "{}: required field {} not present",
            ty.name, field.name
        )))
    }

    /// Decode one field value from the front of `buf`, undoing its tagging.
    fn decode_field(
        &self,
        field: &Field,
        buf: &[u8],
        depth: usize,
    ) -> Result<(Node, usize), CodecError> {
        match field.tag {
            None => self.decode_untagged(&field.ty, buf, depth),
            Some(_) => match field.effective_mode() {
                TagMode::Explicit => {
                    let header = tag::read_header(buf)?;
                    let (content_len, trailer) = tag::content_extent(buf, &header)?;
                    let content = &buf[header.header_len..header.header_len + content_len];
                    let (node, used) = self.decode_untagged(&field.ty, content, depth)?;
                    if used != content.len() {
                        return Err(CodecError::MalformedTlv(format!(
                            "field {}: {} trailing octets inside explicit tag",
                            field.name,
                            content.len() - used
                        )));
                    }
                    Ok((node, header.header_len + content_len + trailer))
                }
                TagMode::Implicit => {
                    self.check_depth(&field.ty, depth)?;
                    let header = tag::read_header(buf)?;
                    let (content_len, trailer) = tag::content_extent(buf, &header)?;
                    let content = &buf[header.header_len..header.header_len + content_len];
                    let node = self.decode_body(&field.ty, content, depth)?;
                    Ok((node, header.header_len + content_len + trailer))
                }
            },
        }
    }

    /// Match the single incoming TLV against each alternative's tag in
    /// declared order; first match wins.
    fn decode_choice(
        &self,
        ty: &TypeDescriptor,
        alternatives: &[Field],
        buf: &[u8],
        depth: usize,
    ) -> Result<(Node, usize), CodecError> {
        if buf.is_empty() {
            return Err(CodecError::TruncatedInput { needed: 2, remaining: 0 });
        }
        let (incoming, _) = Tag::decode(buf)?;
        for alternative in alternatives {
            if alternative.matches(&incoming) {
                trace!("{}: tag {:?} selects {}", ty.name, incoming, alternative.name);
                let (node, used) = self.decode_field(alternative, buf, depth + 1)?;
                let mut choice = ChoiceNode::unselected();
                choice.select_unchecked(alternative.name.clone(), node);
                return Ok((Node::Choice(choice), used));
            }
        }
        Err(CodecError::UnknownAlternative(format!(
            "{}: no alternative matches tag {:?}",
            ty.name, incoming
        )))
    }

    fn check_depth(&self, ty: &TypeDescriptor, depth: usize) -> Result<(), CodecError> {
        if depth > self.max_depth {
            return Err(CodecError::MalformedTlv(format!(
                "{}: nesting exceeds {} levels",
                ty.name, self.max_depth
            )));
        }
        Ok(())
    }
}

fn emit_tlv(tag: Tag, content: &[u8], out: &mut Vec<u8>) {
    tag.encode_into(out);
    tag::encode_length(content.len(), out);
    out.extend_from_slice(content);
}
