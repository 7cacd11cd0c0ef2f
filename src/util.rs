//! Argument and encoding helpers shared by the command handlers.
//!
//! Commands arrive as one space-joined `key=value ...` string; hostapd wants
//! ssid/pass parameters hex-encoded on the DPP_AUTH_INIT line.

/// Extract the value of `key=...` from a space-separated argument string.
///
/// Returns the first match; values cannot contain spaces (same contract as
/// the daemon's own control commands).
pub fn arg(args: &str, key: &str) -> Option<String> {
    let prefix = format!("{}=", key);
    args.split_whitespace()
        .find_map(|tok| tok.strip_prefix(prefix.as_str()))
        .map(str::to_string)
}

/// Hex-encode a string's bytes (lowercase), as hostapd expects for
/// ssid= and pass= parameters.
pub fn encode_hex(s: &str) -> String {
    hex::encode(s.as_bytes())
}

/// True if `s` is already a plausible hex encoding: non-empty, even length,
/// hex digits only. Such values are passed through to the daemon unchanged.
pub fn is_hex_string(s: &str) -> bool {
    !s.is_empty() && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Matter commissioning PINs are exactly 8 ASCII digits.
pub fn is_valid_matter_pin(pin: &str) -> bool {
    pin.len() == 8 && pin.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_finds_key_value_pairs() {
        assert_eq!(arg("curve=prime256v1 type=qr", "curve"), Some("prime256v1".into()));
        assert_eq!(arg("curve=prime256v1 type=qr", "type"), Some("qr".into()));
        assert_eq!(arg("curve=prime256v1", "key"), None);
        assert_eq!(arg("", "curve"), None);
    }

    #[test]
    fn arg_does_not_match_key_as_substring() {
        // "ssid=" must not match "bssid=..."
        assert_eq!(arg("bssid=aa:bb", "ssid"), None);
        assert_eq!(arg("matter_pin=12345678 pin=9", "pin"), Some("9".into()));
    }

    #[test]
    fn arg_returns_first_match() {
        assert_eq!(arg("id=1 id=2", "id"), Some("1".into()));
    }

    #[test]
    fn encode_hex_matches_hostapd_expectation() {
        assert_eq!(encode_hex("MyWiFi"), "4d7957694669");
        assert_eq!(encode_hex(""), "");
    }

    #[test]
    fn is_hex_string_accepts_even_hex_only() {
        assert!(is_hex_string("4d7957694669"));
        assert!(is_hex_string("DEADBEEF"));
        assert!(!is_hex_string("abc")); // odd length
        assert!(!is_hex_string("not-hex"));
        assert!(!is_hex_string(""));
    }

    #[test]
    fn matter_pin_is_exactly_eight_digits() {
        assert!(is_valid_matter_pin("12345678"));
        assert!(!is_valid_matter_pin("1234567"));
        assert!(!is_valid_matter_pin("123456789"));
        assert!(!is_valid_matter_pin("1234567a"));
    }
}
