//! # berkit: Schema-Driven ASN.1 BER Codec
//!
//! A generic BER (Basic Encoding Rules) engine that serializes and
//! deserializes tagged, nested protocol data units (as used by industrial
//! messaging formats such as MMS) from per-type metadata instead of
//! generated per-message bindings.
//!
//! ## Model
//!
//! - **[`TypeDescriptor`]**: the shape of a schema type (primitive,
//!   SEQUENCE, SEQUENCE OF, CHOICE) with per-field tags, optionality, and
//!   defaults. Built once per type, cached in a [`DescriptorCache`].
//! - **[`Node`]**: the runtime value tree. A CHOICE node holds exactly one
//!   active alternative; selection goes through [`ChoiceNode::select`],
//!   which atomically replaces any previous alternative.
//! - **[`Codec`]**: the recursive encode/decode dispatcher over TLV byte
//!   buffers (short, long, and indefinite lengths; implicit and explicit
//!   context tags).
//!
//! ## Example
//!
//! ```
//! use berkit::{Codec, Field, Node, PrimitiveKind, TypeDescriptor};
//!
//! let int = TypeDescriptor::primitive("Integer", PrimitiveKind::Integer);
//! let report = TypeDescriptor::sequence(
//!     "Report",
//!     vec![
//!         Field::tagged("id", int.clone(), 0),
//!         Field::tagged("limit", int, 1).optional(),
//!     ],
//! );
//!
//! let codec = Codec::new();
//! let node = Node::sequence([("id", Node::integer(7))]);
//! let bytes = codec.encode(&report, &node).unwrap();
//! let decoded = codec.decode(&report, &bytes).unwrap();
//! assert_eq!(decoded, node);
//! ```
//!
//! Out of scope: parsing ASN.1 module syntax (descriptors are data, normally
//! emitted by an offline schema compiler), transport framing, and protocol
//! semantics. The caller hands in delimited buffers and owns the decoded
//! trees.

pub mod codec;
pub mod dump;
pub mod primitive;
pub mod registry;
pub mod schema;
pub mod tag;
pub mod value;

pub use codec::{Codec, CodecError};
pub use dump::{dump_tlv, render_node};
pub use registry::DescriptorCache;
pub use schema::{ContextTag, Field, PrimitiveKind, TagMode, TypeDescriptor, TypeKind};
pub use tag::{Tag, TagClass};
pub use value::{ChoiceNode, Node, PrimitiveValue};
