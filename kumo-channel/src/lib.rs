#![deny(unsafe_code)]

//! # kumo-channel
//!
//! A sans-IO secure channel between two peers identified by static X25519
//! keys: a Noise handshake (`KK`, `XK`, `XX` or `IK`) over the fixed
//! ciphersuite `25519_ChaChaPoly_BLAKE2s`, followed by a transport mode in
//! which every frame carries an explicit sequence number that doubles as
//! the AEAD nonce and as a replay marker.
//!
//! The crate never touches the network. Callers move handshake messages
//! and transport frames between peers themselves, preserving message
//! boundaries.
//!
//! ## Security Properties
//!
//! - Low-order X25519 points rejected
//! - Pinned peer keys compared in constant time
//! - Key material zeroized on drop
//! - Replayed and stale frames rejected by a per-direction high-water mark
//! - No panics on network input

pub mod crypto;
pub mod error;
pub mod keys;
pub mod pattern;

mod channel;
mod cipher_state;
mod config;
mod handshake;
mod symmetric_state;
mod transport;

pub use channel::SecureChannel;
pub use config::HandshakeConfig;
pub use error::{ConfigError, Error, HandshakeError, StateError};
pub use handshake::{HandshakeAction, HandshakeState, MAX_HANDSHAKE_MESSAGE_LEN};
pub use keys::{KeyPair, PublicKey, StaticSecret};
pub use pattern::{HandshakePattern, Role};
pub use transport::{Decrypted, FRAME_OVERHEAD, Receiver, SEQUENCE_LEN, Sender};
