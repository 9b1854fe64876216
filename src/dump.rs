//! Format TLV structures and decoded nodes for display (dump text, tree
//! view). Schema-free: the raw dump walks tag/length framing only, so it
//! works on any delimited BER buffer.

use crate::codec::CodecError;
use crate::tag::{self, universal, Length, Tag, TagClass};
use crate::value::{Node, PrimitiveValue};
use std::fmt::Write;

/// Render the TLV structure of a buffer as an indented tree, one line per
/// TLV: tag, length, and a hex preview of primitive content.
pub fn dump_tlv(bytes: &[u8]) -> Result<String, CodecError> {
    let mut out = String::new();
    dump_tlv_level(bytes, 0, &mut out)?;
    Ok(out)
}

/// Cap on constructed nesting in the raw dump, against hostile input.
const MAX_DUMP_DEPTH: usize = 64;

fn dump_tlv_level(buf: &[u8], depth: usize, out: &mut String) -> Result<(), CodecError> {
    if depth > MAX_DUMP_DEPTH {
        return Err(CodecError::MalformedTlv(format!(
            "nesting exceeds {} levels",
            MAX_DUMP_DEPTH
        )));
    }
    let mut pos = 0;
    while pos < buf.len() {
        if tag::is_end_of_contents(&buf[pos..]) {
            pos += 2;
            continue;
        }
        let header = tag::read_header(&buf[pos..])?;
        let (content_len, trailer) = tag::content_extent(&buf[pos..], &header)?;
        let content = &buf[pos + header.header_len..pos + header.header_len + content_len];
        let indent = "  ".repeat(depth);
        let length_note = match header.length {
            Length::Indefinite => " (indefinite)".to_string(),
            Length::Definite(_) => String::new(),
        };
        if header.tag.constructed {
            let _ = writeln!(
                out,
                "{}{} {} bytes{}",
                indent,
                tag_label(&header.tag),
                content_len,
                length_note
            );
            dump_tlv_level(content, depth + 1, out)?;
        } else {
            let _ = writeln!(
                out,
                "{}{} {} bytes: {}",
                indent,
                tag_label(&header.tag),
                content_len,
                hex_preview(content)
            );
        }
        pos += header.header_len + content_len + trailer;
    }
    Ok(())
}

fn tag_label(tag: &Tag) -> String {
    match tag.class {
        TagClass::Universal => universal_name(tag.number)
            .map(str::to_string)
            .unwrap_or_else(|| format!("UNIVERSAL {}", tag.number)),
        TagClass::Application => format!("APPLICATION {}", tag.number),
        TagClass::Context => format!("[{}]", tag.number),
        TagClass::Private => format!("PRIVATE {}", tag.number),
    }
}

fn universal_name(number: u32) -> Option<&'static str> {
    Some(match number {
        universal::BOOLEAN => "BOOLEAN",
        universal::INTEGER => "INTEGER",
        universal::BIT_STRING => "BIT STRING",
        universal::OCTET_STRING => "OCTET STRING",
        universal::NULL => "NULL",
        universal::OBJECT_IDENTIFIER => "OBJECT IDENTIFIER",
        universal::SEQUENCE => "SEQUENCE",
        _ => return None,
    })
}

fn hex_preview(content: &[u8]) -> String {
    const MAX: usize = 16;
    let mut s = content
        .iter()
        .take(MAX)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    if content.len() > MAX {
        let _ = write!(s, " .. (+{} bytes)", content.len() - MAX);
    }
    if s.is_empty() {
        s.push('-');
    }
    s
}

/// Render a decoded node tree as indented text. Sequence fields print in
/// name order (the node map is unordered; the descriptor order is a codec
/// concern, not a display one).
pub fn render_node(node: &Node) -> String {
    let mut out = String::new();
    render_level(node, 0, &mut out);
    out
}

fn render_level(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Primitive(v) => {
            let _ = writeln!(out, "{}{}", indent, primitive_label(v));
        }
        Node::Sequence(entries) => {
            let _ = writeln!(out, "{}sequence", indent);
            let mut names: Vec<&String> = entries.keys().collect();
            names.sort();
            for name in names {
                let _ = writeln!(out, "{}  {}:", indent, name);
                render_level(&entries[name], depth + 2, out);
            }
        }
        Node::SequenceOf(items) => {
            let _ = writeln!(out, "{}sequence-of ({} items)", indent, items.len());
            for item in items {
                render_level(item, depth + 1, out);
            }
        }
        Node::Choice(choice) => match choice.selected() {
            Some((name, value)) => {
                let _ = writeln!(out, "{}choice {}:", indent, name);
                render_level(value, depth + 1, out);
            }
            None => {
                let _ = writeln!(out, "{}choice (unselected)", indent);
            }
        },
    }
}

fn primitive_label(value: &PrimitiveValue) -> String {
    match value {
        PrimitiveValue::Boolean(b) => format!("boolean {}", b),
        PrimitiveValue::Integer(v) => format!("integer {}", v),
        PrimitiveValue::BitString { unused_bits, bytes } => {
            format!("bit-string {} ({} unused bits)", hex_preview(bytes), unused_bits)
        }
        PrimitiveValue::OctetString(bytes) => format!("octet-string {}", hex_preview(bytes)),
        PrimitiveValue::Null => "null".to_string(),
        PrimitiveValue::ObjectIdentifier(arcs) => {
            let dotted = arcs
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(".");
            format!("oid {}", dotted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumps_nested_structure() {
        // SEQUENCE { [0] INTEGER 5, OCTET STRING "hi" }
        let buf = [0x30, 0x07, 0x80, 0x01, 0x05, 0x04, 0x02, b'h', b'i'];
        let text = dump_tlv(&buf).unwrap();
        assert!(text.contains("SEQUENCE 7 bytes"));
        assert!(text.contains("[0] 1 bytes: 05"));
        assert!(text.contains("OCTET STRING 2 bytes: 68 69"));
    }

    #[test]
    fn dump_depth_is_bounded() {
        // 100 definite-length constructed levels, above the cap.
        let mut buf = vec![0x30, 0x00];
        for _ in 0..100 {
            let mut outer = vec![0x30];
            tag::encode_length(buf.len(), &mut outer);
            outer.extend_from_slice(&buf);
            buf = outer;
        }
        assert!(matches!(
            dump_tlv(&buf),
            Err(CodecError::MalformedTlv(_))
        ));
    }

    #[test]
    fn dump_rejects_truncated_buffer() {
        let buf = [0x30, 0x05, 0x02];
        assert!(dump_tlv(&buf).is_err());
    }

    #[test]
    fn renders_choice_node() {
        let mut node = Node::choice_unselected();
        assert!(render_node(&node).contains("unselected"));
        if let Node::Choice(c) = &mut node {
            c.select_unchecked("name".to_string(), Node::integer(3));
        }
        let text = render_node(&node);
        assert!(text.contains("choice name:"));
        assert!(text.contains("integer 3"));
    }
}
