use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret as DalekStaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// X25519 public key and shared secret length.
pub const DH_LEN: usize = 32;

/// Output of one Diffie-Hellman operation. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; DH_LEN]);

impl core::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; DH_LEN] {
        &self.0
    }
}

/// Generate a fresh secret (used for ephemerals) and its public key bytes.
pub fn generate_keypair(rng: &mut impl CryptoRngCore) -> (DalekStaticSecret, [u8; DH_LEN]) {
    let secret = DalekStaticSecret::random_from_rng(rng);
    let public = DalekPublicKey::from(&secret).to_bytes();
    (secret, public)
}

/// Public key bytes belonging to `secret`.
pub fn public_key(secret: &DalekStaticSecret) -> [u8; DH_LEN] {
    DalekPublicKey::from(secret).to_bytes()
}

/// DH(local, remote), rejecting the all-zero output of a low-order `remote`
/// (RFC 7748 §6.1).
pub fn dh(local: &DalekStaticSecret, remote: &[u8; DH_LEN]) -> Result<SharedSecret, CryptoError> {
    let shared = local.diffie_hellman(&DalekPublicKey::from(*remote));
    if bool::from(shared.as_bytes().ct_eq(&[0u8; DH_LEN])) {
        return Err(CryptoError::LowOrderPoint);
    }
    Ok(SharedSecret(*shared.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_zero_public_key() {
        let secret = DalekStaticSecret::from([1u8; 32]);
        assert_eq!(dh(&secret, &[0u8; 32]).unwrap_err(), CryptoError::LowOrderPoint);
    }

    #[test]
    fn reject_order_two_point() {
        let mut point = [0u8; 32];
        point[0] = 1;
        let secret = DalekStaticSecret::from([0x42u8; 32]);
        assert_eq!(dh(&secret, &point).unwrap_err(), CryptoError::LowOrderPoint);
    }

    #[test]
    fn dh_agrees_in_both_directions() {
        let (secret1, pub1) = generate_keypair(&mut rand_core::OsRng);
        let (secret2, pub2) = generate_keypair(&mut rand_core::OsRng);

        let shared1 = dh(&secret1, &pub2).unwrap();
        let shared2 = dh(&secret2, &pub1).unwrap();
        assert_eq!(shared1.as_bytes(), shared2.as_bytes());
    }

    #[test]
    fn public_key_matches_generated() {
        let (secret, public) = generate_keypair(&mut rand_core::OsRng);
        assert_eq!(public_key(&secret), public);
    }

    #[test]
    fn debug_redacts() {
        let secret = DalekStaticSecret::from([7u8; 32]);
        let (_, public) = generate_keypair(&mut rand_core::OsRng);
        let shared = dh(&secret, &public).unwrap();
        assert_eq!(format!("{shared:?}"), "SharedSecret(..)");
    }
}
