use rand_core::{CryptoRngCore, OsRng};
use tracing::debug;
use zeroize::Zeroize;

use crate::cipher_state::CipherState;
use crate::config::HandshakeConfig;
use crate::crypto::hash::HASH_LEN;
use crate::crypto::x25519::{self, DH_LEN, SharedSecret};
use crate::error::{ConfigError, Error, HandshakeError, StateError};
use crate::keys::{PublicKey, StaticSecret};
use crate::pattern::{HandshakePattern, Role, Token};
use crate::symmetric_state::SymmetricState;

/// Largest handshake message accepted or produced (Noise limit).
pub const MAX_HANDSHAKE_MESSAGE_LEN: usize = 65535;

/// What the caller has to do next to advance the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Produce the next message and send it to the peer.
    WriteMessage,
    /// Feed the peer's next message in.
    ReadMessage,
    /// Every message of the pattern has been processed.
    Complete,
}

/// Transport keys derived from a finished handshake, already assigned to
/// directions from this side's point of view.
pub(crate) struct TransportKeys {
    pub send: CipherState,
    pub recv: CipherState,
    pub handshake_hash: [u8; HASH_LEN],
}

/// Token-driven Noise handshake state machine.
///
/// Owns the local static secret, the ephemeral generated along the way, and
/// the running transcript. Every handshake message carries an empty payload.
pub struct HandshakeState {
    symmetric: SymmetricState,
    pattern: HandshakePattern,
    role: Role,
    /// Index of the next message in `pattern.messages()`.
    index: usize,
    failed: bool,
    s: StaticSecret,
    s_pub: PublicKey,
    /// Remote static key, once known (pre-message or received).
    rs: Option<[u8; DH_LEN]>,
    /// Expected remote static key for patterns that transmit it.
    pinned: Option<PublicKey>,
    e: Option<StaticSecret>,
    re: Option<[u8; DH_LEN]>,
}

impl Drop for HandshakeState {
    fn drop(&mut self) {
        if let Some(ref mut re) = self.re {
            re.zeroize();
        }
        if let Some(ref mut rs) = self.rs {
            rs.zeroize();
        }
    }
}

impl HandshakeState {
    /// Seed a handshake with the pattern, role and pre-message keys.
    pub fn new(pattern: HandshakePattern, config: &HandshakeConfig) -> Result<Self, Error> {
        let role = config.role();
        let s = config.local_secret().clone();
        let s_pub = config.local_public();
        if s.public_key() != s_pub {
            return Err(ConfigError::KeyMismatch.into());
        }

        let remote = config.remote_public();
        let peer_is_premessage = pattern.static_is_premessage(role.peer());
        if peer_is_premessage && remote.is_none() {
            return Err(ConfigError::MissingRemoteKey {
                pattern: pattern.name(),
            }
            .into());
        }
        if let Some(remote) = remote {
            x25519::dh(s.inner(), remote.as_bytes()).map_err(|_| ConfigError::BadRemoteKey)?;
        }

        let mut symmetric = SymmetricState::initialize(&pattern.protocol_name());
        // Empty prologue.
        symmetric.mix_hash(&[]);
        for owner in [Role::Initiator, Role::Responder] {
            if !pattern.static_is_premessage(owner) {
                continue;
            }
            let key = if owner == role {
                Some(s_pub)
            } else {
                remote
            };
            if let Some(key) = key {
                symmetric.mix_hash(key.as_bytes());
            }
        }

        let (rs, pinned) = if peer_is_premessage {
            (remote.map(|k| *k.as_bytes()), None)
        } else {
            (None, remote)
        };

        Ok(Self {
            symmetric,
            pattern,
            role,
            index: 0,
            failed: false,
            s,
            s_pub,
            rs,
            pinned,
            e: None,
            re: None,
        })
    }

    pub fn pattern(&self) -> HandshakePattern {
        self.pattern
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn local_static(&self) -> PublicKey {
        self.s_pub
    }

    /// The peer's static key, once the handshake has revealed it.
    pub fn remote_static(&self) -> Option<PublicKey> {
        self.rs.map(PublicKey::from_bytes)
    }

    pub fn next_action(&self) -> HandshakeAction {
        match self.pattern.messages().get(self.index) {
            None => HandshakeAction::Complete,
            Some(m) if m.sender == self.role => HandshakeAction::WriteMessage,
            Some(_) => HandshakeAction::ReadMessage,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.pattern.len()
    }

    /// Current transcript hash; after the last message this is the
    /// channel-binding value both peers share.
    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        self.symmetric.handshake_hash()
    }

    /// Produce the next handshake message.
    pub fn write_message(&mut self) -> Result<Vec<u8>, Error> {
        self.write_message_with_rng(&mut OsRng)
    }

    /// Produce the next handshake message using `rng` for the ephemeral key.
    pub fn write_message_with_rng(&mut self, rng: &mut impl CryptoRngCore) -> Result<Vec<u8>, Error> {
        self.check_turn(HandshakeAction::WriteMessage)?;
        let result = self.write_tokens(rng);
        self.finish_step(result, "wrote")
    }

    /// Consume the peer's next handshake message.
    pub fn read_message(&mut self, message: &[u8]) -> Result<(), Error> {
        self.check_turn(HandshakeAction::ReadMessage)?;
        let result = self.read_tokens(message);
        self.finish_step(result, "read")
    }

    /// Derive the transport keys. Only valid once the pattern is exhausted.
    pub(crate) fn split(&self) -> Result<TransportKeys, Error> {
        if !self.is_complete() {
            return Err(StateError::HandshakeIncomplete.into());
        }
        let (handshake_hash, c1, c2) = self.symmetric.split();
        let (send, recv) = match self.role {
            Role::Initiator => (c1, c2),
            Role::Responder => (c2, c1),
        };
        Ok(TransportKeys {
            send,
            recv,
            handshake_hash,
        })
    }

    fn check_turn(&self, wanted: HandshakeAction) -> Result<(), StateError> {
        if self.failed {
            return Err(StateError::Poisoned);
        }
        match (self.next_action(), wanted) {
            (HandshakeAction::Complete, _) => Err(StateError::HandshakeComplete),
            (HandshakeAction::ReadMessage, HandshakeAction::WriteMessage) => {
                Err(StateError::ExpectedRead)
            }
            (HandshakeAction::WriteMessage, HandshakeAction::ReadMessage) => {
                Err(StateError::ExpectedWrite)
            }
            _ => Ok(()),
        }
    }

    fn finish_step<T>(&mut self, result: Result<T, Error>, verb: &str) -> Result<T, Error> {
        match result {
            Ok(value) => {
                debug!(
                    pattern = self.pattern.name(),
                    role = %self.role,
                    message = self.index,
                    "{verb} handshake message"
                );
                self.index += 1;
                Ok(value)
            }
            Err(err) => {
                // The transcript is now inconsistent; nothing can resume it.
                self.failed = true;
                debug!(
                    pattern = self.pattern.name(),
                    role = %self.role,
                    message = self.index,
                    error = %err,
                    "handshake failed"
                );
                Err(err)
            }
        }
    }

    fn write_tokens(&mut self, rng: &mut impl CryptoRngCore) -> Result<Vec<u8>, Error> {
        let tokens = self.pattern.messages()[self.index].tokens;
        let mut out = Vec::with_capacity(3 * DH_LEN);

        for &token in tokens {
            match token {
                Token::E => {
                    let (secret, public) = x25519::generate_keypair(rng);
                    out.extend_from_slice(&public);
                    self.symmetric.mix_hash(&public);
                    self.e = Some(StaticSecret::from_dalek(secret));
                }
                Token::S => {
                    let s_pub = self.s_pub;
                    self.symmetric.encrypt_and_hash(s_pub.as_bytes(), &mut out)?;
                }
                dh => self.mix_dh(dh)?,
            }
        }
        self.symmetric.encrypt_and_hash(&[], &mut out)?;

        if out.len() > MAX_HANDSHAKE_MESSAGE_LEN {
            return Err(HandshakeError::BadMessage.into());
        }
        Ok(out)
    }

    fn read_tokens(&mut self, message: &[u8]) -> Result<(), Error> {
        if message.len() > MAX_HANDSHAKE_MESSAGE_LEN {
            return Err(HandshakeError::BadMessage.into());
        }
        let tokens = self.pattern.messages()[self.index].tokens;
        let mut rest = message;

        for &token in tokens {
            match token {
                Token::E => {
                    let re = take_key(&mut rest)?;
                    self.symmetric.mix_hash(&re);
                    self.re = Some(re);
                }
                Token::S => {
                    let len = self.symmetric.encrypted_len(DH_LEN);
                    if rest.len() < len {
                        return Err(HandshakeError::BadMessage.into());
                    }
                    let (field, tail) = rest.split_at(len);
                    rest = tail;
                    let mut decrypted = self.symmetric.decrypt_and_hash(field)?;
                    let rs = take_key(&mut decrypted.as_slice())?;
                    decrypted.zeroize();
                    if let Some(pinned) = self.pinned {
                        if !pinned.ct_eq(&rs) {
                            return Err(HandshakeError::IdentityMismatch.into());
                        }
                    }
                    self.rs = Some(rs);
                }
                dh => self.mix_dh(dh)?,
            }
        }

        let payload = self.symmetric.decrypt_and_hash(rest)?;
        if !payload.is_empty() {
            return Err(HandshakeError::BadMessage.into());
        }
        Ok(())
    }

    /// Perform the DH named by `token` from this side's perspective and mix
    /// the result into the chaining key.
    fn mix_dh(&mut self, token: Token) -> Result<(), Error> {
        let shared = match (token, self.role) {
            (Token::EE, _) => self.dh(self.e.as_ref(), self.re)?,
            (Token::SS, _) => self.dh(Some(&self.s), self.rs)?,
            (Token::ES, Role::Initiator) | (Token::SE, Role::Responder) => {
                self.dh(self.e.as_ref(), self.rs)?
            }
            (Token::ES, Role::Responder) | (Token::SE, Role::Initiator) => {
                self.dh(Some(&self.s), self.re)?
            }
            (Token::E | Token::S, _) => return Err(StateError::HandshakeIncomplete.into()),
        };
        self.symmetric.mix_key(shared.as_bytes());
        Ok(())
    }

    fn dh(
        &self,
        local: Option<&StaticSecret>,
        remote: Option<[u8; DH_LEN]>,
    ) -> Result<SharedSecret, Error> {
        let local = local.ok_or(StateError::HandshakeIncomplete)?;
        let remote = remote.ok_or(StateError::RemoteKeyUnknown)?;
        Ok(x25519::dh(local.inner(), &remote).map_err(HandshakeError::from)?)
    }
}

fn take_key(rest: &mut &[u8]) -> Result<[u8; DH_LEN], HandshakeError> {
    if rest.len() < DH_LEN {
        return Err(HandshakeError::BadMessage);
    }
    let (key, tail) = rest.split_at(DH_LEN);
    *rest = tail;
    let mut out = [0u8; DH_LEN];
    out.copy_from_slice(key);
    Ok(out)
}
