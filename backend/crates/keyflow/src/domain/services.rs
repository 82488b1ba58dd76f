//! Domain Services
//!
//! Pure functions with no store access: key-string generation and format
//! checks.

use rand::Rng;
use rand::rngs::OsRng;

/// Alphabet for key characters: uppercase alphanumeric, 36 symbols.
pub const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random key string: `prefix` plus `segment_count` groups of
/// `segment_len` characters, `-`-joined (e.g. `KG-XXXX-XXXX-XXXX-XXXX`).
///
/// Each character is drawn uniformly from [`KEY_ALPHABET`] using the OS
/// CSPRNG. Calls are independent; collision handling is left to the store's
/// uniqueness constraint.
pub fn generate_key(prefix: &str, segment_count: usize, segment_len: usize) -> String {
    let mut key = String::with_capacity(prefix.len() + segment_count * (segment_len + 1));
    key.push_str(prefix);
    for _ in 0..segment_count {
        key.push('-');
        for _ in 0..segment_len {
            let idx = OsRng.gen_range(0..KEY_ALPHABET.len());
            key.push(KEY_ALPHABET[idx] as char);
        }
    }
    key
}

/// Check that a string matches the generated key format.
pub fn is_well_formed_key(key: &str, prefix: &str, segment_count: usize, segment_len: usize) -> bool {
    let mut parts = key.split('-');
    if parts.next() != Some(prefix) {
        return false;
    }
    let mut seen = 0;
    for part in parts {
        if part.len() != segment_len || !part.bytes().all(|b| KEY_ALPHABET.contains(&b)) {
            return false;
        }
        seen += 1;
    }
    seen == segment_count
}
