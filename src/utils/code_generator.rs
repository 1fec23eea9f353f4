//! Short code generation and validation utilities.
//!
//! Generated codes draw from an alphabet without look-alike glyphs so they
//! survive being read aloud or retyped. Custom codes follow a looser, more
//! memorable rule set.

use crate::error::AppError;
use regex::Regex;
use std::sync::LazyLock;

/// URL-safe symbols with `0 O o 1 l I` removed.
pub const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are rejected so every symbol is equally likely.
const ACCEPT_BELOW: u8 = (256 / ALPHABET.len() * ALPHABET.len()) as u8;

/// Reserved codes that cannot be used as short links.
///
/// These collide with top-level routes. `api` is shorter than any custom code
/// and never reaches this list.
const RESERVED_CODES: &[&str] = &["health"];

static CUSTOM_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{4,20}$").unwrap_or_else(|e| unreachable!("static regex: {e}"))
});

/// Generates a random short code of `length` symbols from [`ALPHABET`].
///
/// Uses the OS entropy source via `getrandom` with rejection sampling.
///
/// # Errors
///
/// Returns [`AppError::Entropy`] if the system random number generator fails.
pub fn generate(length: usize) -> Result<String, AppError> {
    let mut code = String::with_capacity(length);
    let mut buffer = [0u8; 32];

    while code.len() < length {
        getrandom::fill(&mut buffer).map_err(|e| AppError::Entropy(e.to_string()))?;

        for &byte in buffer.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if code.len() == length {
                break;
            }
            code.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
        }
    }

    Ok(code)
}

/// Returns true if `code` is acceptable as a caller-chosen short code.
///
/// 4-20 characters from `[A-Za-z0-9_-]`, not a reserved route word.
pub fn is_valid_custom_code(code: &str) -> bool {
    CUSTOM_CODE_RE.is_match(code) && !RESERVED_CODES.contains(&code.to_ascii_lowercase().as_str())
}

/// Validates a user-provided custom short code.
///
/// # Errors
///
/// Returns [`AppError::Validation`] naming the violated rule.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if is_valid_custom_code(code) {
        return Ok(());
    }

    if RESERVED_CODES.contains(&code.to_ascii_lowercase().as_str()) {
        return Err(AppError::validation(format!("code '{code}' is reserved")));
    }

    Err(AppError::validation(
        "custom code must be 4-20 characters of letters, digits, '-' or '_'",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_alphabet_has_no_ambiguous_glyphs() {
        assert_eq!(ALPHABET.len(), 56);
        for glyph in b"0Oo1lI" {
            assert!(!ALPHABET.contains(glyph), "{}", *glyph as char);
        }
    }

    #[test]
    fn test_generate_has_requested_length() {
        for length in [4, 7, 12, 20] {
            assert_eq!(generate(length).unwrap().len(), length);
        }
    }

    #[test]
    fn test_generate_uses_only_alphabet() {
        let code = generate(64).unwrap();
        assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generate_produces_unique_codes() {
        let codes: HashSet<String> = (0..1000).map(|_| generate(7).unwrap()).collect();
        assert_eq!(codes.len(), 1000);
    }

    #[test]
    fn test_generate_zero_length() {
        assert_eq!(generate(0).unwrap(), "");
    }

    #[test]
    fn test_valid_custom_codes() {
        for code in ["promo", "abcd", "my-link_2025", "A1b2C3d4E5f6G7h8I9j0"] {
            assert!(is_valid_custom_code(code), "{code}");
        }
    }

    #[test]
    fn test_invalid_custom_codes() {
        for code in ["abc", "a".repeat(21).as_str(), "has space", "emoji🙂", "semi;colon", ""] {
            assert!(!is_valid_custom_code(code), "{code}");
        }
    }

    #[test]
    fn test_reserved_codes_rejected() {
        assert!(!is_valid_custom_code("health"));
        assert!(!is_valid_custom_code("HEALTH"));
        assert!(!is_valid_custom_code("api"));
        assert!(validate_custom_code("health")
            .unwrap_err()
            .to_string()
            .contains("reserved"));
    }

    #[test]
    fn test_validate_reports_rule() {
        let err = validate_custom_code("ab").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(validate_custom_code("promo").is_ok());
    }
}
