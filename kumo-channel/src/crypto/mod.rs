//! Primitive wrappers used by the handshake and transport layers.
//!
//! - [`aead`]: ChaCha20-Poly1305 with Noise nonce encoding
//! - [`hash`]: BLAKE2s, HMAC-BLAKE2s and the two-output Noise HKDF
//! - [`x25519`]: X25519 Diffie-Hellman with all-zero output rejection

pub mod aead;
pub mod hash;
pub mod x25519;
