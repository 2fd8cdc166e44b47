use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::aead::{self, AEAD_KEY_LEN, AEAD_TAG_LEN};
use crate::error::CryptoError;

/// Noise CipherState: an optional AEAD key plus the implicit nonce used
/// while handshaking.
///
/// Transport frames carry their nonce explicitly, so the transport layer
/// uses [`seal`](Self::seal) and [`open`](Self::open) and ignores the
/// implicit counter.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherState {
    key: Option<[u8; AEAD_KEY_LEN]>,
    #[zeroize(skip)]
    nonce: u64,
}

impl CipherState {
    pub fn empty() -> Self {
        Self {
            key: None,
            nonce: 0,
        }
    }

    pub fn with_key(key: [u8; AEAD_KEY_LEN]) -> Self {
        let mut cs = Self::empty();
        cs.initialize_key(key);
        cs
    }

    /// Install a key and reset the implicit nonce.
    pub fn initialize_key(&mut self, key: [u8; AEAD_KEY_LEN]) {
        self.key = Some(key);
        self.nonce = 0;
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Append `EncryptWithAd(ad, plaintext)` to `out`.
    ///
    /// Without a key the plaintext is appended unchanged.
    pub fn encrypt_with_ad(
        &mut self,
        ad: &[u8],
        plaintext: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), CryptoError> {
        if self.key.is_none() {
            out.extend_from_slice(plaintext);
            return Ok(());
        }
        let nonce = self.take_nonce()?;
        self.seal(nonce, ad, plaintext, out)
    }

    /// `DecryptWithAd(ad, ciphertext)`.
    ///
    /// Without a key the ciphertext is returned unchanged. The implicit
    /// nonce only advances on success.
    pub fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if self.key.is_none() {
            return Ok(ciphertext.to_vec());
        }
        if self.nonce == u64::MAX {
            return Err(CryptoError::NonceExhausted);
        }
        let plaintext = self.open(self.nonce, ad, ciphertext)?;
        self.nonce += 1;
        Ok(plaintext)
    }

    /// Encrypt under an explicit nonce and append ciphertext || tag to `out`.
    pub fn seal(
        &self,
        nonce: u64,
        ad: &[u8],
        plaintext: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), CryptoError> {
        let key = self.key.as_ref().ok_or(CryptoError::Aead)?;
        aead::seal(key, nonce, ad, plaintext, out)
    }

    /// Decrypt ciphertext || tag under an explicit nonce.
    pub fn open(&self, nonce: u64, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key = self.key.as_ref().ok_or(CryptoError::Aead)?;
        aead::open(key, nonce, ad, ciphertext)
    }

    /// Bytes added by encryption: 0 without a key, the tag length otherwise.
    pub fn overhead(&self) -> usize {
        if self.has_key() { AEAD_TAG_LEN } else { 0 }
    }

    fn take_nonce(&mut self) -> Result<u64, CryptoError> {
        // 2^64-1 is reserved by Noise and never used as a nonce.
        if self.nonce == u64::MAX {
            return Err(CryptoError::NonceExhausted);
        }
        let nonce = self.nonce;
        self.nonce += 1;
        Ok(nonce)
    }
}
