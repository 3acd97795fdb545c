//! Reload hash generation.

/// Meta key that receives the reload hash unless overridden.
pub const DEFAULT_HASH_KEY: &str = "reload-hash";

/// Generate a fresh reload hash: 16 random bytes, hex encoded.
pub fn generate_reload_hash() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}
