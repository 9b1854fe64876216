//! BER tag and length wire codec (identifier octets and length octets).
//!
//! Handles short and high-tag-number identifier forms, short/long definite
//! lengths, and indefinite-length constructed values (delimited by an
//! end-of-contents marker). Everything here operates on byte slices and
//! returns how many bytes were consumed; no allocation beyond the encode
//! output buffer.

use crate::codec::CodecError;
use byteorder::{BigEndian, ByteOrder};

/// Universal class tag numbers for the primitive kinds the codec handles.
pub mod universal {
    pub const BOOLEAN: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const BIT_STRING: u32 = 3;
    pub const OCTET_STRING: u32 = 4;
    pub const NULL: u32 = 5;
    pub const OBJECT_IDENTIFIER: u32 = 6;
    pub const SEQUENCE: u32 = 16;
}

/// BER tag class (bits 8-7 of the first identifier octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    Context,
    Private,
}

impl TagClass {
    fn from_bits(byte: u8) -> Self {
        match (byte >> 6) & 0x03 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::Context,
            _ => TagClass::Private,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            TagClass::Universal => 0,
            TagClass::Application => 1,
            TagClass::Context => 2,
            TagClass::Private => 3,
        }
    }
}

/// A BER tag: class, number, and primitive/constructed form.
///
/// Tags are the wire-level identity of a TLV. Within a fixed schema the tag
/// for a given field position is stable, so `PartialEq` equality is how
/// decode dispatch matches incoming TLVs against expected fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub class: TagClass,
    pub number: u32,
    pub constructed: bool,
}

impl Tag {
    pub const fn new(class: TagClass, number: u32, constructed: bool) -> Self {
        Tag { class, number, constructed }
    }

    pub const fn universal(number: u32, constructed: bool) -> Self {
        Tag::new(TagClass::Universal, number, constructed)
    }

    pub const fn context(number: u32, constructed: bool) -> Self {
        Tag::new(TagClass::Context, number, constructed)
    }

    /// Same identity (class + number), ignoring the constructed bit.
    ///
    /// Explicit tagging flips the form of a context tag relative to the
    /// implicit case, so field matching compares identity only.
    pub fn same_identity(&self, other: &Tag) -> bool {
        self.class == other.class && self.number == other.number
    }

    /// Append the identifier octets for this tag.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let lead = (self.class.to_bits() << 6) | if self.constructed { 0x20 } else { 0x00 };
        if self.number <= 30 {
            out.push(lead | self.number as u8);
        } else {
            // High-tag-number form: lead octet with all tag bits set, then
            // base-128 continuation octets, most significant first.
            out.push(lead | 0x1F);
            let mut groups = [0u8; 5];
            let mut n = 0;
            let mut rest = self.number;
            loop {
                groups[n] = (rest & 0x7F) as u8;
                n += 1;
                rest >>= 7;
                if rest == 0 {
                    break;
                }
            }
            for i in (0..n).rev() {
                let cont = if i > 0 { 0x80 } else { 0x00 };
                out.push(groups[i] | cont);
            }
        }
    }

    /// Decode identifier octets from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<(Tag, usize), CodecError> {
        let first = *buf.first().ok_or(CodecError::TruncatedInput { needed: 1, remaining: 0 })?;
        let class = TagClass::from_bits(first);
        let constructed = (first & 0x20) != 0;
        if first & 0x1F != 0x1F {
            return Ok((Tag::new(class, (first & 0x1F) as u32, constructed), 1));
        }
        // High-tag-number form. Accumulate in u64 so a hostile fifth
        // continuation octet cannot overflow before the range check.
        let mut number = 0u64;
        let mut pos = 1;
        loop {
            let byte = *buf.get(pos).ok_or_else(|| {
                CodecError::MalformedTlv("unterminated high-tag-number form".to_string())
            })?;
            number = (number << 7) | (byte & 0x7F) as u64;
            if number > u32::MAX as u64 {
                return Err(CodecError::MalformedTlv(
                    "tag number exceeds u32 range".to_string(),
                ));
            }
            pos += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok((Tag::new(class, number as u32, constructed), pos))
    }
}

/// Decoded length octets: a definite content length, or the indefinite form
/// (constructed only, content runs to the end-of-contents marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    Indefinite,
}

/// Append definite-form length octets (short form below 128, long form above).
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 128 {
        out.push(len as u8);
    } else {
        let mut needed = 0;
        let mut rest = len;
        while rest > 0 {
            needed += 1;
            rest >>= 8;
        }
        out.push(0x80 | needed as u8);
        let mut buf = [0u8; 8];
        BigEndian::write_uint(&mut buf, len as u64, needed);
        out.extend_from_slice(&buf[..needed]);
    }
}

/// Decode length octets from the front of `buf`.
pub fn decode_length(buf: &[u8]) -> Result<(Length, usize), CodecError> {
    let first = *buf.first().ok_or(CodecError::TruncatedInput { needed: 1, remaining: 0 })?;
    if first & 0x80 == 0 {
        return Ok((Length::Definite(first as usize), 1));
    }
    let num_bytes = (first & 0x7F) as usize;
    if num_bytes == 0 {
        return Ok((Length::Indefinite, 1));
    }
    if num_bytes > 8 {
        return Err(CodecError::MalformedTlv(format!(
            "length-of-length {} exceeds 8 octets",
            num_bytes
        )));
    }
    if buf.len() < 1 + num_bytes {
        return Err(CodecError::TruncatedInput {
            needed: 1 + num_bytes,
            remaining: buf.len(),
        });
    }
    let value = BigEndian::read_uint(&buf[1..1 + num_bytes], num_bytes);
    usize::try_from(value)
        .map(|v| (Length::Definite(v), 1 + num_bytes))
        .map_err(|_| CodecError::MalformedTlv(format!("length {} exceeds usize", value)))
}

/// A parsed TLV header: tag, length, and how many octets the header took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: Tag,
    pub length: Length,
    pub header_len: usize,
}

/// Parse the tag and length octets at the front of `buf`.
pub fn read_header(buf: &[u8]) -> Result<Header, CodecError> {
    let (tag, tag_len) = Tag::decode(buf)?;
    let (length, len_len) = decode_length(&buf[tag_len..])?;
    if length == Length::Indefinite && !tag.constructed {
        return Err(CodecError::MalformedTlv(
            "indefinite length on a primitive TLV".to_string(),
        ));
    }
    Ok(Header { tag, length, header_len: tag_len + len_len })
}

/// Content length and trailer length (end-of-contents octets) for a header
/// parsed at the front of `buf`.
///
/// For a definite length this verifies the buffer actually holds the content;
/// for the indefinite form it scans nested TLVs until the matching
/// end-of-contents marker. `buf` must start at the same position
/// `read_header` was given.
pub fn content_extent(buf: &[u8], header: &Header) -> Result<(usize, usize), CodecError> {
    match header.length {
        Length::Definite(len) => {
            let total = header.header_len + len;
            if buf.len() < total {
                return Err(CodecError::TruncatedInput { needed: total, remaining: buf.len() });
            }
            Ok((len, 0))
        }
        Length::Indefinite => {
            let len = indefinite_content_len(&buf[header.header_len..])?;
            Ok((len, 2))
        }
    }
}

/// True if `buf` starts with the two end-of-contents octets.
pub fn is_end_of_contents(buf: &[u8]) -> bool {
    buf.len() >= 2 && buf[0] == 0x00 && buf[1] == 0x00
}

/// Upper bound on nested indefinite-length headers within one extent scan.
const MAX_INDEFINITE_NESTING: usize = 64;

/// Scan TLVs until the end-of-contents marker closing this nesting level,
/// returning the content length (marker excluded).
///
/// The scan is iterative: definite-length TLVs are skipped whole by their
/// declared length, and only an indefinite header opens a new level,
/// counted against [`MAX_INDEFINITE_NESTING`].
fn indefinite_content_len(buf: &[u8]) -> Result<usize, CodecError> {
    let mut pos = 0;
    let mut open = 1;
    loop {
        if is_end_of_contents(&buf[pos..]) {
            open -= 1;
            if open == 0 {
                return Ok(pos);
            }
            pos += 2;
            continue;
        }
        if pos >= buf.len() {
            return Err(CodecError::TruncatedInput {
                needed: pos + 2,
                remaining: buf.len(),
            });
        }
        let header = read_header(&buf[pos..])?;
        match header.length {
            Length::Definite(len) => {
                let total = header.header_len + len;
                if buf.len() - pos < total {
                    return Err(CodecError::TruncatedInput {
                        needed: pos + total,
                        remaining: buf.len(),
                    });
                }
                pos += total;
            }
            Length::Indefinite => {
                open += 1;
                if open > MAX_INDEFINITE_NESTING {
                    return Err(CodecError::MalformedTlv(format!(
                        "indefinite-length nesting exceeds {} levels",
                        MAX_INDEFINITE_NESTING
                    )));
                }
                pos += header.header_len;
            }
        }
    }
}
