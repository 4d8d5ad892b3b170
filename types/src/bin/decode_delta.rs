use bytes::Buf;
use commonware_codec::ReadExt;
use commonware_utils::from_hex_formatted;
use std::env;
use strata_types::{Delta, Row};

fn main() {
    let hex_str = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: decode-delta <hex>");
        std::process::exit(1);
    });

    let bytes = match from_hex_formatted(hex_str.trim()) {
        Some(bytes) => bytes,
        None => {
            eprintln!("invalid hex string");
            std::process::exit(1);
        }
    };

    // A hex blob may hold several concatenated deltas.
    let mut buf = bytes.as_slice();
    let mut index = 0usize;
    while buf.has_remaining() {
        let delta = match Delta::read(&mut buf) {
            Ok(delta) => delta,
            Err(err) => {
                eprintln!("decode error at delta[{index}]: {err}");
                std::process::exit(1);
            }
        };
        match Row::try_from(&delta) {
            Ok(_) => println!("delta[{index}]: {delta}"),
            Err(err) => println!("delta[{index}]: {delta} (malformed: {err})"),
        }
        index += 1;
    }
    println!("deltas: {index}");
}
