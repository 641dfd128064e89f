use std::fmt::Write;

use sha2::{Digest, Sha256};

use qbox_core::{AppError, AppResult};

/// Length of an encoded access token.
pub(super) const ACCESS_TOKEN_HEX_LEN: usize = 64;

/// Generates a 256-bit random access token and its SHA-256 digest.
///
/// Returns `(raw_token_hex, sha256_hash_hex)`. Hex keeps the token URL-safe.
pub(super) fn generate_token() -> AppResult<(String, String)> {
    let mut bytes = [0u8; ACCESS_TOKEN_HEX_LEN / 2];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate access token: {error}")))?;

    let raw_token = to_hex(&bytes);
    let hash = hash_token(&raw_token);
    Ok((raw_token, hash))
}

/// Computes the SHA-256 digest of a token string for storage and lookup.
pub(super) fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::{ACCESS_TOKEN_HEX_LEN, generate_token, hash_token};

    #[test]
    fn generated_tokens_are_unique_url_safe_and_hashed() {
        let first = generate_token();
        let second = generate_token();
        assert!(first.is_ok() && second.is_ok());
        let (Ok((first_token, first_hash)), Ok((second_token, _))) = (first, second) else {
            return;
        };

        assert_eq!(first_token.len(), ACCESS_TOKEN_HEX_LEN);
        assert!(first_token.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(first_token, second_token);
        assert_eq!(first_hash, hash_token(&first_token));
        assert_ne!(first_hash, first_token);
    }
}
