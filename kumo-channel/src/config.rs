use crate::keys::{KeyPair, PublicKey, StaticSecret};
use crate::pattern::Role;

/// Everything a [`SecureChannel`](crate::SecureChannel) needs besides the
/// pattern: local static keys, the peer's static key if known, and the role.
///
/// ```rust
/// use kumo_channel::{HandshakeConfig, KeyPair};
/// use rand_core::OsRng;
///
/// let server = KeyPair::generate(&mut OsRng);
/// let client = KeyPair::generate(&mut OsRng);
///
/// let config = HandshakeConfig::initiator(client).with_remote_public(server.public);
/// assert!(config.is_initiator());
/// assert_eq!(config.remote_public(), Some(server.public));
/// ```
#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    local: KeyPair,
    local_public: PublicKey,
    remote_public: Option<PublicKey>,
    initiator: bool,
}

impl HandshakeConfig {
    /// Build from the four raw fields.
    ///
    /// `local_public` is kept as given and checked against `local_secret`
    /// when the channel is constructed. A [`PublicKey::NULL`] remote key is
    /// treated as unknown.
    pub fn new(
        local_public: PublicKey,
        local_secret: StaticSecret,
        remote_public: PublicKey,
        initiator: bool,
    ) -> Self {
        let remote_public = (!remote_public.is_null()).then_some(remote_public);
        Self {
            local: KeyPair::from_secret(local_secret),
            local_public,
            remote_public,
            initiator,
        }
    }

    /// Configuration for the side that sends the first handshake message.
    pub fn initiator(local: KeyPair) -> Self {
        Self::from_keypair(local, true)
    }

    /// Configuration for the side that waits for the first message.
    pub fn responder(local: KeyPair) -> Self {
        Self::from_keypair(local, false)
    }

    fn from_keypair(local: KeyPair, initiator: bool) -> Self {
        Self {
            local_public: local.public,
            local,
            remote_public: None,
            initiator,
        }
    }

    /// Set (or pin) the peer's static public key. The null key clears it.
    pub fn with_remote_public(mut self, remote: PublicKey) -> Self {
        self.remote_public = (!remote.is_null()).then_some(remote);
        self
    }

    pub fn local_public(&self) -> PublicKey {
        self.local_public
    }

    pub fn local_secret(&self) -> &StaticSecret {
        &self.local.secret
    }

    pub fn remote_public(&self) -> Option<PublicKey> {
        self.remote_public
    }

    pub fn is_initiator(&self) -> bool {
        self.initiator
    }

    pub fn role(&self) -> Role {
        Role::from_initiator(self.initiator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_remote_is_unknown() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let config = HandshakeConfig::new(kp.public, kp.secret.clone(), PublicKey::NULL, true);
        assert_eq!(config.remote_public(), None);
        assert_eq!(config.role(), Role::Initiator);

        let config = HandshakeConfig::responder(kp).with_remote_public(PublicKey::NULL);
        assert_eq!(config.remote_public(), None);
        assert_eq!(config.role(), Role::Responder);
    }

    #[test]
    fn raw_fields_are_preserved() {
        let kp = KeyPair::from_secret_bytes([3u8; 32]);
        let other = PublicKey::from_bytes([5u8; 32]);
        let config = HandshakeConfig::new(other, kp.secret.clone(), other, false);
        assert_eq!(config.local_public(), other);
        assert_eq!(config.remote_public(), Some(other));
        assert!(!config.is_initiator());
    }
}
