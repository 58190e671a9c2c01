//! Percent codec for credential headers
//!
//! The proxy percent-encodes `Auth-User` and `Auth-Pass` before forwarding
//! them. Decoding must never fail: a `%` that is not followed by two hex
//! digits is passed through as literal characters, which is exactly what
//! `percent-encoding` does.

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

/// Decode a percent-encoded header value as UTF-8.
///
/// Malformed escape triplets are kept verbatim; invalid UTF-8 is replaced
/// rather than rejected.
pub fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Percent-encode a value the way the proxy does (every non-alphanumeric
/// byte escaped).
pub fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_basic() {
        assert_eq!(decode("peter%40example.com"), "peter@example.com");
        assert_eq!(decode("pa%20ss%2Bword"), "pa ss+word");
        assert_eq!(decode(""), "");
    }

    #[test]
    fn test_plus_is_not_a_space() {
        // header values are not form-encoded
        assert_eq!(decode("a+b"), "a+b");
    }

    #[test]
    fn test_malformed_escapes_pass_through() {
        assert_eq!(decode("50%discount"), "50%discount");
        assert_eq!(decode("%zz"), "%zz");
        assert_eq!(decode("%4"), "%4");
        assert_eq!(decode("trailing%"), "trailing%");
        // decoding malformed input twice changes nothing
        assert_eq!(decode(&decode("%zz%4")), "%zz%4");
    }

    #[test]
    fn test_round_trip_printable_ascii() {
        let printable: String = (0x20u8..0x7f).map(char::from).collect();
        assert_eq!(decode(&encode(&printable)), printable);
    }

    #[test]
    fn test_round_trip_utf8() {
        let original = "pässwörd✓";
        assert_eq!(decode(&encode(original)), original);
    }
}
