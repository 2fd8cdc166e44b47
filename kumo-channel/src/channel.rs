use rand_core::{CryptoRngCore, OsRng};
use tracing::debug;

use crate::config::HandshakeConfig;
use crate::crypto::hash::HASH_LEN;
use crate::error::{Error, StateError};
use crate::handshake::{HandshakeAction, HandshakeState};
use crate::keys::PublicKey;
use crate::pattern::{HandshakePattern, Role};
use crate::transport::{Decrypted, Receiver, Sender};

enum Phase {
    Handshaking(Box<HandshakeState>),
    Transport {
        sender: Sender,
        receiver: Receiver,
        handshake_hash: [u8; HASH_LEN],
    },
}

/// A mutually authenticated, encrypted channel between two static keys.
///
/// The channel starts out handshaking. Callers alternate
/// [`produce_handshake_message`](Self::produce_handshake_message) and
/// [`consume_handshake_message`](Self::consume_handshake_message) as
/// [`next_action`](Self::next_action) directs, moving the bytes to the peer
/// themselves. Once the pattern is exhausted the channel switches to
/// transport mode for good and [`encrypt`](Self::encrypt) /
/// [`decrypt`](Self::decrypt) become available.
///
/// Any error is fatal: drop the channel and start over.
///
/// ```rust
/// use kumo_channel::{HandshakeConfig, KeyPair, SecureChannel};
/// use rand_core::OsRng;
///
/// let a = KeyPair::generate(&mut OsRng);
/// let b = KeyPair::generate(&mut OsRng);
///
/// let mut alice = SecureChannel::kk(
///     HandshakeConfig::initiator(a.clone()).with_remote_public(b.public),
/// )?;
/// let mut bob = SecureChannel::kk(HandshakeConfig::responder(b).with_remote_public(a.public))?;
///
/// bob.consume_handshake_message(&alice.produce_handshake_message()?)?;
/// alice.consume_handshake_message(&bob.produce_handshake_message()?)?;
/// assert!(alice.is_handshake_complete() && bob.is_handshake_complete());
///
/// let frame = alice.encrypt(b"hello")?;
/// assert_eq!(bob.decrypt(&frame)?.into_plaintext().unwrap(), b"hello");
/// # Ok::<(), kumo_channel::Error>(())
/// ```
pub struct SecureChannel {
    pattern: HandshakePattern,
    role: Role,
    local: PublicKey,
    remote: Option<PublicKey>,
    phase: Phase,
}

impl SecureChannel {
    /// Create a channel that will run `pattern` with `config`.
    pub fn new(pattern: HandshakePattern, config: HandshakeConfig) -> Result<Self, Error> {
        let handshake = HandshakeState::new(pattern, &config)?;
        debug!(pattern = pattern.name(), role = %handshake.role(), "created secure channel");
        Ok(Self {
            pattern,
            role: handshake.role(),
            local: handshake.local_static(),
            remote: handshake.remote_static(),
            phase: Phase::Handshaking(Box::new(handshake)),
        })
    }

    /// Both static keys known up front.
    pub fn kk(config: HandshakeConfig) -> Result<Self, Error> {
        Self::new(HandshakePattern::KK, config)
    }

    /// The responder learns the initiator's static key during the handshake.
    pub fn xk(config: HandshakeConfig) -> Result<Self, Error> {
        Self::new(HandshakePattern::XK, config)
    }

    pub fn pattern(&self) -> HandshakePattern {
        self.pattern
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn next_action(&self) -> HandshakeAction {
        match &self.phase {
            Phase::Handshaking(hs) => hs.next_action(),
            Phase::Transport { .. } => HandshakeAction::Complete,
        }
    }

    pub fn is_handshake_complete(&self) -> bool {
        matches!(self.phase, Phase::Transport { .. })
    }

    /// Produce this side's next handshake message.
    ///
    /// If it is the pattern's last message the channel is in transport mode
    /// when this returns.
    pub fn produce_handshake_message(&mut self) -> Result<Vec<u8>, Error> {
        self.produce_handshake_message_with_rng(&mut OsRng)
    }

    /// [`produce_handshake_message`](Self::produce_handshake_message) with a
    /// caller-supplied RNG for the ephemeral key.
    pub fn produce_handshake_message_with_rng(
        &mut self,
        rng: &mut impl CryptoRngCore,
    ) -> Result<Vec<u8>, Error> {
        let hs = self.handshake_mut()?;
        let message = hs.write_message_with_rng(rng)?;
        self.advance()?;
        Ok(message)
    }

    /// Consume the peer's next handshake message.
    pub fn consume_handshake_message(&mut self, message: &[u8]) -> Result<(), Error> {
        let hs = self.handshake_mut()?;
        hs.read_message(message)?;
        self.advance()
    }

    /// The local static public key.
    pub fn local_static(&self) -> PublicKey {
        self.local
    }

    /// The peer's static public key, once known.
    ///
    /// Known from the start when the pattern pre-shares it; otherwise known
    /// once the handshake message carrying it has been authenticated.
    pub fn remote_static(&self) -> Result<PublicKey, Error> {
        self.remote
            .ok_or_else(|| StateError::RemoteKeyUnknown.into())
    }

    /// The final handshake hash, identical on both peers; usable for channel
    /// binding.
    pub fn handshake_hash(&self) -> Option<&[u8; HASH_LEN]> {
        match &self.phase {
            Phase::Transport { handshake_hash, .. } => Some(handshake_hash),
            Phase::Handshaking(_) => None,
        }
    }

    /// Encrypt an outbound payload into a sequence-numbered frame.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        match &mut self.phase {
            Phase::Transport { sender, .. } => sender.encrypt(plaintext),
            Phase::Handshaking(_) => Err(StateError::HandshakeIncomplete.into()),
        }
    }

    /// Decrypt an inbound frame. See [`Receiver::decrypt`].
    pub fn decrypt(&mut self, frame: &[u8]) -> Result<Decrypted, Error> {
        match &mut self.phase {
            Phase::Transport { receiver, .. } => receiver.decrypt(frame),
            Phase::Handshaking(_) => Err(StateError::HandshakeIncomplete.into()),
        }
    }

    /// Split into independently owned halves so that sending and receiving
    /// can run on different threads without sharing a lock.
    pub fn into_split(self) -> Result<(Sender, Receiver), Error> {
        match self.phase {
            Phase::Transport {
                sender, receiver, ..
            } => Ok((sender, receiver)),
            Phase::Handshaking(_) => Err(StateError::HandshakeIncomplete.into()),
        }
    }

    fn handshake_mut(&mut self) -> Result<&mut HandshakeState, StateError> {
        match &mut self.phase {
            Phase::Handshaking(hs) => Ok(hs.as_mut()),
            Phase::Transport { .. } => Err(StateError::HandshakeComplete),
        }
    }

    /// Pick up a newly revealed remote key and enter transport mode once the
    /// pattern is exhausted.
    fn advance(&mut self) -> Result<(), Error> {
        let Phase::Handshaking(hs) = &self.phase else {
            return Ok(());
        };
        if self.remote.is_none() {
            self.remote = hs.remote_static();
        }
        if !hs.is_complete() {
            return Ok(());
        }

        let keys = hs.split()?;
        debug!(
            pattern = self.pattern.name(),
            role = %self.role,
            remote = %self.remote.map(|k| k.to_string()).unwrap_or_default(),
            "handshake complete, entering transport mode"
        );
        self.phase = Phase::Transport {
            sender: Sender::new(keys.send),
            receiver: Receiver::new(keys.recv),
            handshake_hash: keys.handshake_hash,
        };
        Ok(())
    }
}
