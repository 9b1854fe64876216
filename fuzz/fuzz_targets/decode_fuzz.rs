//! Decode fuzz target: feed arbitrary bytes to the codec against a nested
//! descriptor. Decoding must not panic; it returns Ok(Node) or a CodecError.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fn fuzz_descriptor() -> std::sync::Arc<berkit::TypeDescriptor> {
    use berkit::{Field, Node, PrimitiveKind, TypeDescriptor};
    let integer = TypeDescriptor::primitive("Integer", PrimitiveKind::Integer);
    let octets = TypeDescriptor::primitive("OctetString", PrimitiveKind::OctetString);
    let name = TypeDescriptor::choice(
        "Name",
        vec![
            Field::tagged("numeric", integer.clone(), 0),
            Field::tagged("symbolic", octets.clone(), 1),
        ],
    );
    TypeDescriptor::sequence(
        "FuzzMessage",
        vec![
            Field::tagged("id", integer.clone(), 0),
            Field::new("name", name).optional(),
            Field::tagged("values", TypeDescriptor::sequence_of("Values", integer), 2)
                .optional(),
            Field::tagged("flag", TypeDescriptor::primitive("Boolean", PrimitiveKind::Boolean), 3)
                .with_default(Node::boolean(false)),
        ],
    )
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    use std::sync::OnceLock;
    static DESCRIPTOR: OnceLock<std::sync::Arc<berkit::TypeDescriptor>> = OnceLock::new();
    let ty = DESCRIPTOR.get_or_init(fuzz_descriptor);
    let codec = berkit::Codec::new();
    if let Ok(node) = codec.decode(ty, data) {
        // Anything that decodes must re-encode without panicking.
        let _ = codec.encode(ty, &node);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
