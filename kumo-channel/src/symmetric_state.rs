use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::cipher_state::CipherState;
use crate::crypto::aead::AEAD_KEY_LEN;
use crate::crypto::hash::{self, HASH_LEN};
use crate::error::CryptoError;

/// Noise SymmetricState: chaining key, transcript hash and the handshake
/// CipherState.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricState {
    cipher: CipherState,
    ck: Zeroizing<[u8; HASH_LEN]>,
    h: [u8; HASH_LEN],
}

impl SymmetricState {
    /// `InitializeSymmetric(protocol_name)`: names up to [`HASH_LEN`] bytes
    /// are zero padded, longer ones are hashed.
    pub fn initialize(protocol_name: &str) -> Self {
        let name = protocol_name.as_bytes();
        let h = if name.len() <= HASH_LEN {
            let mut h = [0u8; HASH_LEN];
            h[..name.len()].copy_from_slice(name);
            h
        } else {
            hash::hash(&[name])
        };

        Self {
            cipher: CipherState::empty(),
            ck: Zeroizing::new(h),
            h,
        }
    }

    /// `(ck, k) = HKDF(ck, ikm)`, then key the handshake cipher with `k`.
    pub fn mix_key(&mut self, input_key_material: &[u8]) {
        let (ck, temp_k) = hash::hkdf2(&self.ck, input_key_material);
        *self.ck = *ck;
        self.cipher.initialize_key(to_key(&temp_k));
    }

    /// `h = HASH(h || data)`.
    pub fn mix_hash(&mut self, data: &[u8]) {
        self.h = hash::hash(&[&self.h, data]);
    }

    /// Encrypt with `h` as associated data, append to `out`, and mix the
    /// ciphertext into `h`.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        let start = out.len();
        self.cipher.encrypt_with_ad(&self.h, plaintext, out)?;
        let h = hash::hash(&[&self.h, &out[start..]]);
        self.h = h;
        Ok(())
    }

    /// Decrypt with `h` as associated data, then mix the ciphertext into `h`.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let plaintext = self.cipher.decrypt_with_ad(&self.h, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(plaintext)
    }

    /// Length an `encrypt_and_hash` of `len` bytes will produce.
    pub fn encrypted_len(&self, len: usize) -> usize {
        len + self.cipher.overhead()
    }

    /// Derive the two transport cipher states.
    ///
    /// Returns the final handshake hash with `(c1, c2)`; the initiator sends
    /// with `c1`, the responder with `c2`.
    pub fn split(&self) -> ([u8; HASH_LEN], CipherState, CipherState) {
        let (k1, k2) = hash::hkdf2(&self.ck, &[]);
        (
            self.h,
            CipherState::with_key(to_key(&k1)),
            CipherState::with_key(to_key(&k2)),
        )
    }

    pub fn handshake_hash(&self) -> &[u8; HASH_LEN] {
        &self.h
    }
}

fn to_key(material: &[u8; HASH_LEN]) -> [u8; AEAD_KEY_LEN] {
    let mut key = [0u8; AEAD_KEY_LEN];
    key.copy_from_slice(&material[..AEAD_KEY_LEN]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_protocol_name_is_padded() {
        let ss = SymmetricState::initialize("Noise_KK");
        let h = ss.handshake_hash();
        assert_eq!(&h[..8], b"Noise_KK");
        assert!(h[8..].iter().all(|b| *b == 0));
    }

    #[test]
    fn long_protocol_name_is_hashed() {
        let name = "Noise_KK_25519_ChaChaPoly_BLAKE2s";
        assert!(name.len() > HASH_LEN);
        let ss = SymmetricState::initialize(name);
        assert_eq!(*ss.handshake_hash(), hash::hash(&[name.as_bytes()]));
    }

    #[test]
    fn encrypt_before_mix_key_is_plaintext() {
        let mut ss = SymmetricState::initialize("test");
        let mut out = Vec::new();
        ss.encrypt_and_hash(b"visible", &mut out).unwrap();
        assert_eq!(out, b"visible");
        assert_eq!(ss.encrypted_len(7), 7);
    }

    #[test]
    fn peers_with_same_transcript_agree() {
        let mut a = SymmetricState::initialize("test");
        let mut b = SymmetricState::initialize("test");
        for ss in [&mut a, &mut b] {
            ss.mix_hash(b"prologue");
            ss.mix_key(b"shared secret");
        }

        let mut ct = Vec::new();
        a.encrypt_and_hash(b"static key", &mut ct).unwrap();
        assert_eq!(ct.len(), a.encrypted_len(0) + b"static key".len());
        assert_eq!(b.decrypt_and_hash(&ct).unwrap(), b"static key");
        assert_eq!(a.handshake_hash(), b.handshake_hash());

        let (ha, a1, a2) = a.split();
        let (hb, b1, b2) = b.split();
        assert_eq!(ha, hb);

        let mut frame = Vec::new();
        a1.seal(1, &[], b"c1", &mut frame).unwrap();
        assert_eq!(b1.open(1, &[], &frame).unwrap(), b"c1");
        assert!(b2.open(1, &[], &frame).is_err());

        let mut frame = Vec::new();
        b2.seal(1, &[], b"c2", &mut frame).unwrap();
        assert_eq!(a2.open(1, &[], &frame).unwrap(), b"c2");
    }

    #[test]
    fn diverging_transcripts_fail_authentication() {
        let mut a = SymmetricState::initialize("test");
        let mut b = SymmetricState::initialize("test");
        a.mix_key(b"secret");
        b.mix_key(b"secret");
        a.mix_hash(b"one");
        b.mix_hash(b"two");

        let mut ct = Vec::new();
        a.encrypt_and_hash(b"payload", &mut ct).unwrap();
        assert_eq!(b.decrypt_and_hash(&ct), Err(CryptoError::Aead));
    }
}
