use core::fmt;
use core::str::FromStr;

use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::StaticSecret as DalekStaticSecret;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::x25519::{self, DH_LEN};
use crate::error::ConfigError;

/// An X25519 static secret key. Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticSecret(DalekStaticSecret);

impl StaticSecret {
    /// Wrap raw secret key material.
    pub fn from_bytes(bytes: [u8; DH_LEN]) -> Self {
        Self(DalekStaticSecret::from(bytes))
    }

    pub(crate) fn from_dalek(secret: DalekStaticSecret) -> Self {
        Self(secret)
    }

    /// Export the raw secret key material.
    pub fn to_bytes(&self) -> [u8; DH_LEN] {
        self.0.to_bytes()
    }

    /// The public key that belongs to this secret.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519::public_key(&self.0))
    }

    pub(crate) fn inner(&self) -> &DalekStaticSecret {
        &self.0
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticSecret(..)")
    }
}

/// An X25519 public key.
///
/// The all-zero key, [`PublicKey::NULL`], stands for "no key known yet"
/// wherever a remote key is optional.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; DH_LEN]);

impl PublicKey {
    /// Length of a public key in bytes.
    pub const LEN: usize = DH_LEN;

    /// The null sentinel.
    pub const NULL: Self = Self([0u8; DH_LEN]);

    pub const fn from_bytes(bytes: [u8; DH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DH_LEN] {
        &self.0
    }

    /// Whether this is the [`NULL`](Self::NULL) sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; DH_LEN]
    }

    /// Constant-time equality, for comparing peer identities.
    pub(crate) fn ct_eq(&self, other: &[u8; DH_LEN]) -> bool {
        bool::from(self.0.ct_eq(other))
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; DH_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|err| ConfigError::KeyEncoding(err.to_string()))?;
        Ok(Self(bytes))
    }
}

/// A static secret and its public key.
#[derive(Clone)]
pub struct KeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        let (secret, public) = x25519::generate_keypair(rng);
        Self {
            secret: StaticSecret::from_dalek(secret),
            public: PublicKey(public),
        }
    }

    /// Build a keypair around an existing secret, deriving the public key.
    pub fn from_secret(secret: StaticSecret) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Build a keypair from raw secret key material.
    pub fn from_secret_bytes(bytes: [u8; DH_LEN]) -> Self {
        Self::from_secret(StaticSecret::from_bytes(bytes))
    }

    /// Export the raw secret key material.
    pub fn secret_bytes(&self) -> [u8; DH_LEN] {
        self.secret.to_bytes()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}
