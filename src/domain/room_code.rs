//! Human-facing room codes.
//!
//! Codes are drawn from an alphabet without visually ambiguous characters
//! (`I`, `O`, `0`, `1`). Each character comes from one byte of the OS
//! CSPRNG reduced modulo the alphabet length. Uniqueness is left to the
//! store's unique constraint.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::{AppError, Area};

/// Characters a room code may contain.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Default code length.
pub const DEFAULT_LENGTH: usize = 6;

/// Shortest configurable code length.
pub const MIN_LENGTH: usize = 4;

/// Longest configurable code length.
pub const MAX_LENGTH: usize = 12;

/// Generates a random code of exactly `length` characters.
#[must_use]
pub fn generate(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .filter_map(|b| ALPHABET.get(usize::from(*b) % ALPHABET.len()))
        .map(|c| char::from(*c))
        .collect()
}

/// Trims and upper-cases `input`, then checks its length and alphabet.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if the code has the wrong length or
/// contains characters outside [`ALPHABET`].
pub fn normalize(input: &str, length: usize) -> Result<String, AppError> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() != length {
        return Err(AppError::invalid(
            Area::Rooms,
            format!("room code must be {length} characters long"),
        ));
    }
    if !code.bytes().all(|b| ALPHABET.contains(&b)) {
        return Err(AppError::invalid(
            Area::Rooms,
            "room code contains invalid characters",
        ));
    }
    Ok(code)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_has_requested_length() {
        for length in [MIN_LENGTH, DEFAULT_LENGTH, MAX_LENGTH] {
            assert_eq!(generate(length).len(), length);
        }
    }

    #[test]
    fn generated_code_uses_alphabet_only() {
        for _ in 0..200 {
            let code = generate(DEFAULT_LENGTH);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)), "{code}");
        }
    }

    #[test]
    fn alphabet_has_no_ambiguous_characters() {
        for c in [b'I', b'O', b'0', b'1'] {
            assert!(!ALPHABET.contains(&c));
        }
    }

    #[test]
    fn normalize_upper_cases_and_trims() {
        assert_eq!(normalize(" abc234 ", 6).ok().as_deref(), Some("ABC234"));
    }

    #[test]
    fn normalize_rejects_bad_codes() {
        assert!(normalize("ABC23", 6).is_err());
        assert!(normalize("ABC10O", 6).is_err());
        assert!(normalize("ABC-34", 6).is_err());
    }
}
