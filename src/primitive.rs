//! Content-octet codec for the ASN.1 primitive kinds.
//!
//! Pure functions between [`PrimitiveValue`] and BER content octets (the V
//! of a TLV; tag and length framing lives in [`crate::tag`] and
//! [`crate::codec`]). Decoding fails with
//! [`CodecError::MalformedPrimitive`] when the content is inconsistent with
//! the kind's encoding rules.

use crate::codec::CodecError;
use crate::schema::PrimitiveKind;
use crate::value::PrimitiveValue;
use byteorder::{BigEndian, ByteOrder};

/// The kind a given value encodes as.
pub fn kind_of(value: &PrimitiveValue) -> PrimitiveKind {
    match value {
        PrimitiveValue::Boolean(_) => PrimitiveKind::Boolean,
        PrimitiveValue::Integer(_) => PrimitiveKind::Integer,
        PrimitiveValue::BitString { .. } => PrimitiveKind::BitString,
        PrimitiveValue::OctetString(_) => PrimitiveKind::OctetString,
        PrimitiveValue::Null => PrimitiveKind::Null,
        PrimitiveValue::ObjectIdentifier(_) => PrimitiveKind::ObjectIdentifier,
    }
}

/// Encode a primitive value to content octets.
pub fn encode_content(value: &PrimitiveValue) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    match value {
        PrimitiveValue::Boolean(b) => out.push(if *b { 0xFF } else { 0x00 }),
        PrimitiveValue::Integer(v) => encode_integer(*v, &mut out),
        PrimitiveValue::BitString { unused_bits, bytes } => {
            if *unused_bits > 7 {
                return Err(CodecError::MalformedPrimitive(format!(
                    "BIT STRING unused bit count {} (max 7)",
                    unused_bits
                )));
            }
            if bytes.is_empty() && *unused_bits != 0 {
                return Err(CodecError::MalformedPrimitive(
                    "empty BIT STRING with non-zero unused bits".to_string(),
                ));
            }
            out.push(*unused_bits);
            out.extend_from_slice(bytes);
        }
        PrimitiveValue::OctetString(bytes) => out.extend_from_slice(bytes),
        PrimitiveValue::Null => {}
        PrimitiveValue::ObjectIdentifier(arcs) => encode_oid(arcs, &mut out)?,
    }
    Ok(out)
}

/// Decode content octets into a primitive value of the given kind.
pub fn decode_content(kind: PrimitiveKind, content: &[u8]) -> Result<PrimitiveValue, CodecError> {
    match kind {
        PrimitiveKind::Boolean => {
            if content.len() != 1 {
                return Err(CodecError::MalformedPrimitive(format!(
                    "BOOLEAN content length {} (expected 1)",
                    content.len()
                )));
            }
            // BER: any non-zero octet is TRUE.
            Ok(PrimitiveValue::Boolean(content[0] != 0))
        }
        PrimitiveKind::Integer => decode_integer(content).map(PrimitiveValue::Integer),
        PrimitiveKind::BitString => {
            let unused_bits = *content.first().ok_or_else(|| {
                CodecError::MalformedPrimitive(
                    "BIT STRING missing unused-bit octet".to_string(),
                )
            })?;
            if unused_bits > 7 {
                return Err(CodecError::MalformedPrimitive(format!(
                    "BIT STRING unused bit count {} (max 7)",
                    unused_bits
                )));
            }
            if content.len() == 1 && unused_bits != 0 {
                return Err(CodecError::MalformedPrimitive(
                    "empty BIT STRING with non-zero unused bits".to_string(),
                ));
            }
            Ok(PrimitiveValue::BitString { unused_bits, bytes: content[1..].to_vec() })
        }
        PrimitiveKind::OctetString => Ok(PrimitiveValue::OctetString(content.to_vec())),
        PrimitiveKind::Null => {
            if !content.is_empty() {
                return Err(CodecError::MalformedPrimitive(format!(
                    "NULL content length {} (expected 0)",
                    content.len()
                )));
            }
            Ok(PrimitiveValue::Null)
        }
        PrimitiveKind::ObjectIdentifier => decode_oid(content),
    }
}

/// Minimal two's-complement big-endian encoding: redundant leading 0x00 /
/// 0xFF octets are stripped, keeping the sign bit intact.
fn encode_integer(v: i64, out: &mut Vec<u8>) {
    let bytes = v.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    out.extend_from_slice(&bytes[start..]);
}

fn decode_integer(content: &[u8]) -> Result<i64, CodecError> {
    if content.is_empty() {
        return Err(CodecError::MalformedPrimitive(
            "INTEGER with empty content".to_string(),
        ));
    }
    if content.len() > 8 {
        return Err(CodecError::MalformedPrimitive(format!(
            "INTEGER content length {} exceeds i64 range",
            content.len()
        )));
    }
    Ok(BigEndian::read_int(content, content.len()))
}

fn encode_oid(arcs: &[u64], out: &mut Vec<u8>) -> Result<(), CodecError> {
    if arcs.len() < 2 {
        return Err(CodecError::MalformedPrimitive(format!(
            "OBJECT IDENTIFIER needs at least 2 arcs, got {}",
            arcs.len()
        )));
    }
    if arcs[0] > 2 || (arcs[0] < 2 && arcs[1] > 39) {
        return Err(CodecError::MalformedPrimitive(format!(
            "invalid leading OBJECT IDENTIFIER arcs {}.{}",
            arcs[0], arcs[1]
        )));
    }
    // First two arcs share one subidentifier: 40 * first + second.
    push_base128(arcs[0] * 40 + arcs[1], out);
    for &arc in &arcs[2..] {
        push_base128(arc, out);
    }
    Ok(())
}

fn decode_oid(content: &[u8]) -> Result<PrimitiveValue, CodecError> {
    if content.is_empty() {
        return Err(CodecError::MalformedPrimitive(
            "OBJECT IDENTIFIER with empty content".to_string(),
        ));
    }
    let mut subids = Vec::new();
    let mut current = 0u64;
    let mut in_subid = false;
    for &byte in content {
        if current >> 57 != 0 {
            return Err(CodecError::MalformedPrimitive(
                "OBJECT IDENTIFIER arc exceeds u64 range".to_string(),
            ));
        }
        current = (current << 7) | (byte & 0x7F) as u64;
        in_subid = byte & 0x80 != 0;
        if !in_subid {
            subids.push(current);
            current = 0;
        }
    }
    if in_subid {
        return Err(CodecError::MalformedPrimitive(
            "unterminated OBJECT IDENTIFIER subidentifier".to_string(),
        ));
    }
    let first = subids[0];
    let mut arcs = if first < 40 {
        vec![0, first]
    } else if first < 80 {
        vec![1, first - 40]
    } else {
        vec![2, first - 80]
    };
    arcs.extend_from_slice(&subids[1..]);
    Ok(PrimitiveValue::ObjectIdentifier(arcs))
}

fn push_base128(mut v: u64, out: &mut Vec<u8>) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (v & 0x7F) as u8;
        n += 1;
        v >>= 7;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let cont = if i > 0 { 0x80 } else { 0x00 };
        out.push(groups[i] | cont);
    }
}
