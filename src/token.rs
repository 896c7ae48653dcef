//! Opaque page tokens.
//!
//! A token is the only credential for reading a tip page, so it must be
//! unguessable: 128 bits from the OS CSPRNG, rendered as 32 lowercase hex
//! characters. Nothing user-supplied (name, time) feeds the generator.

use rand::rngs::OsRng;
use rand::RngCore;

/// Length of a rendered token in characters.
pub const TOKEN_LEN: usize = 32;

/// Generate a fresh page token.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_LEN / 2];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Check that a string has the exact shape of a generated token.
///
/// Stores call this before a token is used as a file name or database key,
/// so arbitrary strings (path traversal included) can never reach storage.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN
        && token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
