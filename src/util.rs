//! Payload decoding.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

/// Decode raw payload bytes to a string.
///
/// The encoding is taken from, in order:
/// 1. a byte order mark,
/// 2. the `encoding` of the XML declaration,
/// 3. UTF-8.
///
/// Unlike lenient text decoding, malformed input is an error rather than
/// being replaced: a payload that lies about its encoding is not readable.
pub fn decode_payload(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => {
            let declared = declared_encoding(bytes)
                .and_then(|label| Encoding::for_label(label.as_bytes()));
            (declared.unwrap_or(UTF_8), bytes)
        }
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| Error::MalformedXml(format!("Payload is not valid {}", encoding.name())))
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
///
/// Only ASCII-compatible declarations are recognized; UTF-16 payloads carry a
/// BOM instead.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let decl = bytes.strip_prefix(b"<?xml")?;
    let end = memchr::memmem::find(decl, b"?>")?;
    let decl = std::str::from_utf8(&decl[..end]).ok()?;
    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|end| &value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_default() {
        assert_eq!(decode_payload("<a>é</a>".as_bytes()).unwrap(), "<a>é</a>");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let bytes = b"\xEF\xBB\xBF<a/>";
        assert_eq!(decode_payload(bytes).unwrap(), "<a/>");
    }

    #[test]
    fn test_utf16_bom() {
        let bytes = b"\xFF\xFE<\0a\0/\0>\0";
        assert_eq!(decode_payload(bytes).unwrap(), "<a/>");
    }

    #[test]
    fn test_declared_encoding() {
        let bytes = b"<?xml version=\"1.0\" encoding='ISO-8859-1'?><a>\xE9</a>";
        assert_eq!(declared_encoding(bytes), Some("ISO-8859-1"));
        let text = decode_payload(bytes).unwrap();
        assert!(text.ends_with("<a>é</a>"));
    }

    #[test]
    fn test_malformed_utf8_is_an_error() {
        assert!(matches!(decode_payload(b"<a>\xFF</a>"), Err(Error::MalformedXml(_))));
    }

    #[test]
    fn test_no_declaration() {
        assert_eq!(declared_encoding(b"<a/>"), None);
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><a/>"), None);
    }
}
