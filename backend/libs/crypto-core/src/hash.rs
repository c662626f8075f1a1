use sha2::{Digest, Sha256};

/// Hex characters kept from the digest when fingerprinting a token.
const FINGERPRINT_LEN: usize = 16;

/// Compute SHA256 hash of input bytes
pub fn sha256(input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Short, stable identifier for a bearer token.
///
/// Tokens are credentials and must never reach the logs; this prefix of the
/// SHA256 digest lets operators correlate log lines for the same token.
pub fn token_fingerprint(token: &str) -> String {
    let mut digest = hex::encode(sha256(token.as_bytes()));
    digest.truncate(FINGERPRINT_LEN);
    digest
}
