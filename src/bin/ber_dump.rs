//! Dump the TLV structure of a BER-encoded buffer.
//!
//! Usage:
//!   ber_dump FILE            read a binary file
//!   ber_dump --hex "30 03 02 01 07"
//!   ber_dump < file.ber      read binary from stdin
//!
//! The dump is schema-free: it walks tag/length framing only, so any
//! delimited BER buffer works.

use anyhow::{bail, Context, Result};
use berkit::dump::dump_tlv;
use std::io::Read;

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        bail!("hex input has an odd number of digits");
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("bad hex at offset {}", i))
        })
        .collect()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let bytes = match args.first().map(String::as_str) {
        Some("--hex") => {
            let hex = args.get(1).context("--hex requires an argument")?;
            parse_hex(hex)?
        }
        Some("--help") | Some("-h") => {
            eprintln!("Usage: ber_dump FILE | ber_dump --hex \"30 03 ...\" | ber_dump < file.ber");
            return Ok(());
        }
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    if bytes.is_empty() {
        bail!("empty input");
    }
    let text = dump_tlv(&bytes).context("malformed BER input")?;
    print!("{}", text);
    Ok(())
}
