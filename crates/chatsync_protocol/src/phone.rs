//! Phone number normalization and display.

use crate::error::{ProtocolError, ProtocolResult};

/// Suffix of WhatsApp individual-chat channel ids.
pub const CONTACT_CHANNEL_SUFFIX: &str = "@c.us";

/// Strips everything but ASCII digits.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes a phone and rejects inputs without any digit.
pub fn require_phone(phone: &str) -> ProtocolResult<String> {
    let digits = normalize_phone(phone);
    if digits.is_empty() {
        return Err(ProtocolError::InvalidPhone(phone.to_string()));
    }
    Ok(digits)
}

/// Returns true for Brazilian numbers with area code (10 or 11 digits).
pub fn is_valid_brazilian_phone(phone: &str) -> bool {
    matches!(normalize_phone(phone).len(), 10 | 11)
}

/// Formats 10/11 digit numbers as `(11) 9999-9999` / `(11) 99999-9999`.
///
/// Any other input is returned unchanged.
pub fn format_phone(phone: &str) -> String {
    let digits = normalize_phone(phone);
    match digits.len() {
        11 => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
        10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        _ => phone.to_string(),
    }
}

/// Channel id used when a contact is created without one.
pub fn default_channel_id(normalized_phone: &str) -> String {
    format!("{normalized_phone}{CONTACT_CHANNEL_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_digits() {
        assert_eq!(normalize_phone("+55 (11) 99999-8888"), "5511999998888");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn require_phone_rejects_empty() {
        assert_eq!(require_phone("(11) 4444-3333").unwrap(), "1144443333");
        assert_eq!(
            require_phone("  -- "),
            Err(ProtocolError::InvalidPhone("  -- ".into()))
        );
    }

    #[test]
    fn brazilian_validation() {
        assert!(is_valid_brazilian_phone("(11) 99999-8888"));
        assert!(is_valid_brazilian_phone("1144443333"));
        assert!(!is_valid_brazilian_phone("5511999998888"));
        assert!(!is_valid_brazilian_phone("123"));
    }

    #[test]
    fn formats_known_lengths() {
        assert_eq!(format_phone("11999998888"), "(11) 99999-8888");
        assert_eq!(format_phone("1144443333"), "(11) 4444-3333");
        assert_eq!(format_phone("+1 555"), "+1 555");
    }

    proptest::proptest! {
        #[test]
        fn normalization_is_idempotent(raw in ".{0,40}") {
            let once = normalize_phone(&raw);
            proptest::prop_assert!(once.chars().all(|c| c.is_ascii_digit()));
            proptest::prop_assert_eq!(normalize_phone(&once), once);
        }
    }

    #[test]
    fn default_channel() {
        assert_eq!(default_channel_id("5511999998888"), "5511999998888@c.us");
    }
}
