// Copyright (c) 2023 Nick Piaddo
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Encode strings to a safe, udev-compatible format.
//!
//! Values harvested by the prober can
//! contain arbitrary on-disk bytes; these helpers turn them into strings safe to print, log, or
//! embed in a `/dev/disk/by-*` symlink name.

// From dependency library

// From standard library

// From this library
use crate::core::errors::EncodeError;

/// Encodes every potentially unsafe character of `string` to its hex value, prefixed by `\x`.
///
/// "Unsafe" here means any byte that is not an ASCII alphanumeric character, `#+-.:=@_` or `/`
/// (following `libblkid`'s own notion of a udev-safe string).
pub fn encode_string<T>(string: T) -> Result<String, EncodeError>
where
    T: AsRef<[u8]>,
{
    let bytes = string.as_ref();
    log::debug!("encode::encode_string encoding {:?}", bytes);

    let mut encoded = String::with_capacity(bytes.len());
    for &b in bytes {
        let c = b as char;
        if c.is_ascii_alphanumeric() || "#+-.:=@_/".contains(c) {
            encoded.push(c);
        } else {
            encoded.push_str(&format!("\\x{b:02x}"));
        }
    }

    log::debug!("encode::encode_string encoded {:?} to {:?}", bytes, encoded);

    Ok(encoded)
}

/// Processes white-space and non-UTF-8 characters. Keeps all valid ASCII and UTF-8 characters,
/// then replaces everything else with `_`.
pub fn to_safe_string<T>(bytes: T) -> String
where
    T: AsRef<[u8]>,
{
    let bytes = bytes.as_ref();
    log::debug!(
        "encode::to_safe_string converting bytes {:?} to safe string",
        bytes
    );

    let safe_string: String = String::from_utf8_lossy(bytes)
        .chars()
        .map(|c| {
            if c == '\u{fffd}' {
                '_'
            } else if c.is_whitespace() || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    log::debug!(
        "encode::to_safe_string converted bytes {:?} to a safe string: {:?}",
        bytes,
        safe_string
    );

    safe_string
}

#[cfg(test)]
#[allow(unused_imports)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn to_safe_string_correctly_processes_an_empty_byte_string() {
        let bytes = b"".to_vec();
        let actual = to_safe_string(bytes);
        let expected = String::new();
        assert_eq!(actual, expected);
    }

    #[test]
    fn to_safe_string_correctly_processes_whitespace() {
        let bytes = b"text with white space".to_vec();
        let actual = to_safe_string(bytes);
        let expected = String::from("text_with_white_space");
        assert_eq!(actual, expected);
    }

    #[test]
    fn encode_string_escapes_whitespace() {
        let actual = encode_string(b"hello world").unwrap();
        assert_eq!(actual, "hello\\x20world");
    }

    #[test]
    fn encode_string_keeps_safe_characters() {
        let actual = encode_string(b"ext4-part_01").unwrap();
        assert_eq!(actual, "ext4-part_01");
    }
}
