use thiserror::Error;

/// Errors surfaced by a [`SecureChannel`](crate::SecureChannel).
///
/// Every variant is fatal for the channel instance that produced it: the
/// caller should discard the channel and, if it wants to, reconnect and
/// handshake again. Stale or duplicate transport frames are *not* errors,
/// see [`Decrypted::Rejected`](crate::Decrypted::Rejected).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The construction inputs were rejected.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// Authentication or identity validation failed during the handshake.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// An operation was called in the wrong phase or out of turn.
    #[error("invalid state: {0}")]
    State(#[from] StateError),

    /// A transport frame could not be encrypted.
    #[error("transport frame could not be encrypted")]
    Encryption,

    /// A transport frame failed authentication.
    #[error("transport frame failed authentication")]
    Decryption,

    /// A transport frame is shorter than its sequence header.
    #[error("malformed transport frame: {len} bytes is shorter than the {min}-byte header")]
    MalformedFrame {
        /// Length of the frame that was received.
        len: usize,
        /// Minimum length of a non-empty frame.
        min: usize,
    },

    /// The send sequence counter reached its reserved maximum.
    #[error("sequence counter exhausted")]
    NonceExhausted,
}

impl Error {
    /// Whether the channel must be discarded after this error.
    ///
    /// Always `true`; kept as a method so callers can branch on it without
    /// matching every variant.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        true
    }

    /// Whether this error may indicate tampering or an impersonation attempt.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Self::Decryption
                | Self::MalformedFrame { .. }
                | Self::Handshake(HandshakeError::IdentityMismatch)
                | Self::Handshake(HandshakeError::Authentication)
        )
    }
}

/// Problems with the inputs given to [`SecureChannel::new`](crate::SecureChannel::new).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The local public key does not belong to the local secret key.
    #[error("local public key does not match the local secret key")]
    KeyMismatch,

    /// The pattern requires the remote static key up front and none was given.
    #[error("pattern {pattern} requires the remote static key before the handshake")]
    MissingRemoteKey {
        /// Name of the selected pattern.
        pattern: &'static str,
    },

    /// The remote static key is a low-order point.
    #[error("remote static key is not a usable curve point")]
    BadRemoteKey,

    /// A pattern name could not be parsed.
    #[error("unknown handshake pattern {0:?}")]
    UnknownPattern(String),

    /// A hex-encoded key could not be parsed.
    #[error("invalid key encoding: {0}")]
    KeyEncoding(String),
}

/// Failures while processing handshake messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// The message is truncated, oversized, or has trailing bytes.
    #[error("malformed handshake message")]
    BadMessage,

    /// An encrypted handshake field failed authentication.
    #[error("handshake message failed authentication")]
    Authentication,

    /// The peer presented a static key other than the pinned one.
    #[error("peer static key does not match the pinned key")]
    IdentityMismatch,

    /// The peer sent a low-order public key.
    #[error("peer sent an invalid public key")]
    BadKey,
}

/// Operations invoked in the wrong phase or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    /// It is this side's turn to read, not to write.
    #[error("expected to read a handshake message, not write one")]
    ExpectedRead,

    /// It is this side's turn to write, not to read.
    #[error("expected to write a handshake message, not read one")]
    ExpectedWrite,

    /// The handshake pattern has no steps left.
    #[error("handshake already complete")]
    HandshakeComplete,

    /// Transport operations need a completed handshake.
    #[error("handshake not complete")]
    HandshakeIncomplete,

    /// The peer's static key has not been revealed yet.
    #[error("remote static key not known yet")]
    RemoteKeyUnknown,

    /// A previous fatal error poisoned the handshake.
    #[error("handshake previously failed")]
    Poisoned,
}

/// Failures reported by the primitive wrappers in [`crypto`](crate::crypto).
///
/// These are mapped into [`Error`] by the layer that knows whether it is
/// handshaking or in transport mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// AEAD encryption or decryption failed.
    #[error("AEAD operation failed")]
    Aead,

    /// Diffie-Hellman produced the all-zero output.
    #[error("low-order public key")]
    LowOrderPoint,

    /// The input is shorter than an AEAD tag.
    #[error("ciphertext shorter than the AEAD tag")]
    Truncated,

    /// The nonce counter has reached the reserved maximum.
    #[error("nonce counter exhausted")]
    NonceExhausted,
}

impl From<CryptoError> for HandshakeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Aead => Self::Authentication,
            CryptoError::LowOrderPoint => Self::BadKey,
            CryptoError::Truncated | CryptoError::NonceExhausted => Self::BadMessage,
        }
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Self::Handshake(err.into())
    }
}
