//! Opaque share token generation.
//!
//! Tokens are URL-safe bearer strings backed by OS randomness. The generator
//! is stateless: collision checking against stored tokens is the caller's
//! responsibility (see `db::queries::create_or_get_share_token`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Default share token length in characters.
pub const SHARE_TOKEN_LENGTH: usize = 32;

/// Generate `length` bytes of cryptographically secure randomness, encoded
/// as a URL-safe string and truncated to `length` characters.
///
/// Base64 expands 3 bytes into 4 characters, so encoding `length` bytes
/// always yields at least `length` characters to truncate from.
pub fn generate(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);

    let mut encoded = URL_SAFE_NO_PAD.encode(&bytes);
    encoded.truncate(length);
    encoded
}
