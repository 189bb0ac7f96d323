//! Character encoding of inputs and outputs.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{Error, Result};

/// The UTF-8 byte order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Look up an encoding by label (`UTF-8`, `latin1`, `windows-1252`...).
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::Encoding(format!("unknown encoding '{}'", label)))
}

/// Text decoded from an input.
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// The decoded text, without byte order mark
    pub text: String,
    /// Encoding actually used
    pub encoding: &'static Encoding,
    /// The input started with a byte order mark
    pub had_bom: bool,
}

/// Decode input bytes.
///
/// A byte order mark overrides the declared encoding. Byte sequences that are
/// invalid in the encoding are an error.
pub fn decode(bytes: &[u8], declared: &str) -> Result<DecodedText> {
    let (encoding, bom_len) = match Encoding::for_bom(bytes) {
        Some((encoding, len)) => (encoding, len),
        None => (lookup(declared)?, 0),
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(Error::Encoding(format!(
            "input is not valid {}",
            encoding.name()
        )));
    }

    Ok(DecodedText {
        text: text.into_owned(),
        encoding,
        had_bom: bom_len > 0,
    })
}

/// Encode output text.
///
/// Returns the bytes and whether some characters could not be represented
/// (those are written as numeric character references).
pub fn encode(text: &str, encoding: &'static Encoding) -> (Vec<u8>, bool) {
    if encoding == UTF_16LE {
        return (text.encode_utf16().flat_map(u16::to_le_bytes).collect(), false);
    }
    if encoding == UTF_16BE {
        return (text.encode_utf16().flat_map(u16::to_be_bytes).collect(), false);
    }
    let (bytes, _, unmappable) = encoding.encode(text);
    (bytes.into_owned(), unmappable)
}

/// Byte order mark to write at the start of an output, if any.
///
/// The input's byte order mark is kept as it was. UTF-16 output converted
/// from another encoding always starts with one.
pub fn output_bom(
    encoding: &'static Encoding,
    input_encoding: &'static Encoding,
    input_had_bom: bool,
) -> &'static [u8] {
    let converted = encoding != input_encoding;
    if encoding == UTF_16LE && (input_had_bom || converted) {
        b"\xFF\xFE"
    } else if encoding == UTF_16BE && (input_had_bom || converted) {
        b"\xFE\xFF"
    } else if encoding == UTF_8 && input_had_bom {
        UTF8_BOM
    } else {
        b""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("utf-8").unwrap(), UTF_8);
        assert_eq!(lookup("latin1").unwrap().name(), "windows-1252");
        assert!(lookup("klingon").is_err());
    }

    #[test]
    fn test_decode_utf8_bom() {
        let decoded = decode(b"\xEF\xBB\xBFhi", "windows-1252").unwrap();
        assert_eq!(decoded.text, "hi");
        assert_eq!(decoded.encoding, UTF_8);
        assert!(decoded.had_bom);
    }

    #[test]
    fn test_decode_declared() {
        let decoded = decode(b"caf\xE9", "ISO-8859-1").unwrap();
        assert_eq!(decoded.text, "café");
        assert!(!decoded.had_bom);

        assert!(decode(b"caf\xE9", "UTF-8").is_err());
    }

    #[test]
    fn test_decode_utf16_bom() {
        let decoded = decode(b"\xFF\xFEh\x00i\x00", "UTF-8").unwrap();
        assert_eq!(decoded.text, "hi");
        assert_eq!(decoded.encoding, UTF_16LE);
    }

    #[test]
    fn test_encode() {
        let latin1 = lookup("ISO-8859-1").unwrap();
        assert_eq!(encode("café", latin1), (b"caf\xE9".to_vec(), false));

        let (bytes, unmappable) = encode("日", latin1);
        assert!(unmappable);
        assert_eq!(bytes, b"&#26085;");

        assert_eq!(encode("hi", UTF_16BE).0, b"\x00h\x00i");
        assert_eq!(output_bom(UTF_8, UTF_8, true), UTF8_BOM);
        assert!(output_bom(UTF_8, UTF_8, false).is_empty());
    }

    #[test]
    fn test_utf16_bom_kept_as_in_input() {
        assert!(output_bom(UTF_16LE, UTF_16LE, false).is_empty());
        assert_eq!(output_bom(UTF_16LE, UTF_16LE, true), b"\xFF\xFE");
        assert_eq!(output_bom(UTF_16BE, UTF_8, false), b"\xFE\xFF");
        assert_eq!(output_bom(UTF_8, UTF_16LE, true), UTF8_BOM);
        let latin1 = lookup("latin1").unwrap();
        assert!(output_bom(UTF_8, latin1, false).is_empty());
    }
}
