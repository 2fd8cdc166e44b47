//! Transport-mode framing.
//!
//! ```text
//! +----------------------+----------------------------------+
//! | sequence (8, BE u64) | ChaCha20-Poly1305(payload) + tag |
//! +----------------------+----------------------------------+
//! ```
//!
//! The sequence number doubles as the AEAD nonce. The sender emits 1, 2,
//! 3, ... and the receiver accepts a frame only if its sequence is above
//! the highest one accepted so far. Gaps are fine; anything at or below the
//! high-water mark is reported as [`Decrypted::Rejected`].

use tracing::{trace, warn};

use crate::cipher_state::CipherState;
use crate::crypto::aead::AEAD_TAG_LEN;
use crate::error::{CryptoError, Error};

/// Length of the sequence header.
pub const SEQUENCE_LEN: usize = 8;

/// Bytes a transport frame adds to its payload.
pub const FRAME_OVERHEAD: usize = SEQUENCE_LEN + AEAD_TAG_LEN;

/// Outcome of decrypting a transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decrypted {
    /// The frame authenticated; here is its payload.
    Plaintext(Vec<u8>),
    /// The frame's sequence number is not above the high-water mark: a
    /// replay, duplicate, or late reordered frame. Nothing to deliver, but
    /// the channel is still healthy.
    Rejected {
        /// Sequence number carried by the frame.
        sequence: u64,
        /// Highest sequence number accepted so far.
        high_water: u64,
    },
}

impl Decrypted {
    /// The payload, if the frame was accepted.
    pub fn into_plaintext(self) -> Option<Vec<u8>> {
        match self {
            Self::Plaintext(p) => Some(p),
            Self::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// The sending half of an established channel.
///
/// `&mut self` on [`encrypt`](Self::encrypt) is the exclusive-access
/// requirement; move the half to the writer task instead of locking it.
pub struct Sender {
    cipher: CipherState,
    /// Last sequence number emitted; 0 before the first frame.
    sequence: u64,
}

impl Sender {
    pub(crate) fn new(cipher: CipherState) -> Self {
        Self { cipher, sequence: 0 }
    }

    /// Encrypt `plaintext` into a frame carrying the next sequence number.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        // u64::MAX is reserved by Noise and never used as a nonce.
        let sequence = match self.sequence.checked_add(1) {
            Some(n) if n < u64::MAX => n,
            _ => return Err(Error::NonceExhausted),
        };

        let mut frame = Vec::with_capacity(FRAME_OVERHEAD + plaintext.len());
        frame.extend_from_slice(&sequence.to_be_bytes());
        self.cipher
            .seal(sequence, &[], plaintext, &mut frame)
            .map_err(|err| match err {
                CryptoError::NonceExhausted => Error::NonceExhausted,
                _ => Error::Encryption,
            })?;

        self.sequence = sequence;
        trace!(sequence, len = plaintext.len(), "encrypted frame");
        Ok(frame)
    }

    /// Sequence number of the last frame produced.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// The receiving half of an established channel.
pub struct Receiver {
    cipher: CipherState,
    /// Highest sequence number accepted so far; 0 before the first frame.
    high_water: u64,
}

impl Receiver {
    pub(crate) fn new(cipher: CipherState) -> Self {
        Self {
            cipher,
            high_water: 0,
        }
    }

    /// Decrypt a frame produced by the peer's [`Sender::encrypt`].
    ///
    /// An empty frame is a heartbeat and yields an empty payload without
    /// touching the high-water mark. Stale frames are
    /// [`Decrypted::Rejected`]; frames that fail authentication are
    /// [`Error::Decryption`].
    pub fn decrypt(&mut self, frame: &[u8]) -> Result<Decrypted, Error> {
        if frame.is_empty() {
            return Ok(Decrypted::Plaintext(Vec::new()));
        }
        if frame.len() < SEQUENCE_LEN {
            return Err(Error::MalformedFrame {
                len: frame.len(),
                min: SEQUENCE_LEN,
            });
        }

        let (header, body) = frame.split_at(SEQUENCE_LEN);
        let mut sequence_bytes = [0u8; SEQUENCE_LEN];
        sequence_bytes.copy_from_slice(header);
        let sequence = u64::from_be_bytes(sequence_bytes);

        let high_water = self.high_water;
        if sequence <= high_water {
            warn!(
                sequence,
                high_water, "rejected transport frame: sequence not above high-water mark"
            );
            return Ok(Decrypted::Rejected {
                sequence,
                high_water,
            });
        }

        let plaintext = self.cipher.open(sequence, &[], body).map_err(|_| {
            warn!(sequence, len = frame.len(), "transport frame failed authentication");
            Error::Decryption
        })?;

        self.high_water = sequence;
        trace!(sequence, len = plaintext.len(), "decrypted frame");
        Ok(Decrypted::Plaintext(plaintext))
    }

    /// Highest sequence number accepted so far.
    pub fn high_water(&self) -> u64 {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::aead::AEAD_KEY_LEN;

    fn pair() -> (Sender, Receiver) {
        let key = [0x11u8; AEAD_KEY_LEN];
        (
            Sender::new(CipherState::with_key(key)),
            Receiver::new(CipherState::with_key(key)),
        )
    }

    #[test]
    fn frame_layout() {
        let (mut tx, _) = pair();
        let frame = tx.encrypt(b"abc").unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD + 3);
        assert_eq!(&frame[..SEQUENCE_LEN], &1u64.to_be_bytes());
        assert_eq!(tx.sequence(), 1);
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let (mut tx, _) = pair();
        for expected in 1..=5u64 {
            let frame = tx.encrypt(b"").unwrap();
            assert_eq!(frame[..SEQUENCE_LEN], expected.to_be_bytes());
        }
    }

    #[test]
    fn empty_frame_is_heartbeat() {
        let (_, mut rx) = pair();
        assert_eq!(rx.decrypt(&[]).unwrap(), Decrypted::Plaintext(Vec::new()));
        assert_eq!(rx.high_water(), 0);
    }

    #[test]
    fn short_frame_is_malformed() {
        let (_, mut rx) = pair();
        assert_eq!(
            rx.decrypt(&[0u8; 7]),
            Err(Error::MalformedFrame { len: 7, min: 8 })
        );
    }

    #[test]
    fn header_only_frame_fails_authentication() {
        let (_, mut rx) = pair();
        assert_eq!(rx.decrypt(&5u64.to_be_bytes()), Err(Error::Decryption));
        assert_eq!(rx.high_water(), 0);
    }

    #[test]
    fn replay_is_rejected_without_error() {
        let (mut tx, mut rx) = pair();
        let frame = tx.encrypt(b"once").unwrap();

        assert_eq!(rx.decrypt(&frame).unwrap(), Decrypted::Plaintext(b"once".to_vec()));
        assert_eq!(
            rx.decrypt(&frame).unwrap(),
            Decrypted::Rejected {
                sequence: 1,
                high_water: 1
            }
        );

        let next = tx.encrypt(b"twice").unwrap();
        assert_eq!(rx.decrypt(&next).unwrap().into_plaintext().unwrap(), b"twice");
    }

    #[test]
    fn gaps_are_tolerated() {
        let (mut tx, mut rx) = pair();
        let frames: Vec<_> = (0..4).map(|_| tx.encrypt(b"x").unwrap()).collect();

        assert!(!rx.decrypt(&frames[1]).unwrap().is_rejected());
        assert!(rx.decrypt(&frames[0]).unwrap().is_rejected());
        assert!(!rx.decrypt(&frames[3]).unwrap().is_rejected());
        assert!(rx.decrypt(&frames[2]).unwrap().is_rejected());
        assert_eq!(rx.high_water(), 4);
    }

    #[test]
    fn forged_high_sequence_does_not_move_high_water() {
        let (mut tx, mut rx) = pair();
        let mut frame = tx.encrypt(b"data").unwrap();
        frame[..SEQUENCE_LEN].copy_from_slice(&1000u64.to_be_bytes());

        assert_eq!(rx.decrypt(&frame), Err(Error::Decryption));
        assert_eq!(rx.high_water(), 0);
    }

    #[test]
    fn exhausted_sender_refuses() {
        let (mut tx, _) = pair();
        tx.sequence = u64::MAX - 2;
        assert!(tx.encrypt(b"last").is_ok());
        assert_eq!(tx.sequence(), u64::MAX - 1);
        assert_eq!(tx.encrypt(b"one more"), Err(Error::NonceExhausted));
        assert_eq!(tx.sequence(), u64::MAX - 1);
    }
}
