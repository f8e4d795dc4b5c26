use rand::{rngs::OsRng, RngCore};

/// Random bytes per session token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generate an opaque session token: 32 bytes from the OS RNG, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
