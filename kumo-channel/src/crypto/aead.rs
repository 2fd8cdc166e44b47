use chacha20poly1305::{
    ChaCha20Poly1305, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};

use crate::error::CryptoError;

/// AEAD key length in bytes.
pub const AEAD_KEY_LEN: usize = 32;
/// AEAD tag length in bytes.
pub const AEAD_TAG_LEN: usize = 16;
/// AEAD nonce length in bytes.
pub const AEAD_NONCE_LEN: usize = 12;

/// Encrypt `plaintext` and append `ciphertext || tag` to `out`.
///
/// On failure `out` is left as it was.
pub fn seal(
    key: &[u8; AEAD_KEY_LEN],
    counter: u64,
    ad: &[u8],
    plaintext: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), CryptoError> {
    let start = out.len();
    out.reserve(plaintext.len() + AEAD_TAG_LEN);
    out.extend_from_slice(plaintext);

    let sealed = ChaCha20Poly1305::new(key.into()).encrypt_in_place_detached(
        &noise_nonce(counter),
        ad,
        &mut out[start..],
    );
    match sealed {
        Ok(tag) => {
            out.extend_from_slice(&tag);
            Ok(())
        }
        Err(_) => {
            out.truncate(start);
            Err(CryptoError::Aead)
        }
    }
}

/// Authenticate and decrypt `ciphertext || tag`.
pub fn open(
    key: &[u8; AEAD_KEY_LEN],
    counter: u64,
    ad: &[u8],
    sealed: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let body_len = sealed
        .len()
        .checked_sub(AEAD_TAG_LEN)
        .ok_or(CryptoError::Truncated)?;
    let (body, tag) = sealed.split_at(body_len);

    let mut plaintext = body.to_vec();
    ChaCha20Poly1305::new(key.into())
        .decrypt_in_place_detached(&noise_nonce(counter), ad, &mut plaintext, Tag::from_slice(tag))
        .map_err(|_| CryptoError::Aead)?;
    Ok(plaintext)
}

/// Noise ChaChaPoly nonce: 32 zero bits, then the counter little-endian.
fn noise_nonce(counter: u64) -> Nonce {
    let mut nonce = Nonce::default();
    nonce[AEAD_NONCE_LEN - 8..].copy_from_slice(&counter.to_le_bytes());
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; AEAD_KEY_LEN] = [0x42; AEAD_KEY_LEN];

    fn sealed(counter: u64, ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        seal(&KEY, counter, ad, plaintext, &mut out).unwrap();
        out
    }

    #[test]
    fn seal_then_open() {
        let ct = sealed(7, b"ad", b"hello kumo");
        assert_eq!(ct.len(), 10 + AEAD_TAG_LEN);
        assert_eq!(open(&KEY, 7, b"ad", &ct).unwrap(), b"hello kumo");
    }

    #[test]
    fn seal_appends() {
        let mut out = b"prefix".to_vec();
        seal(&KEY, 0, &[], b"x", &mut out).unwrap();
        assert_eq!(&out[..6], b"prefix");
        assert_eq!(out.len(), 6 + 1 + AEAD_TAG_LEN);
    }

    #[test]
    fn open_rejects_mismatched_inputs() {
        let ct = sealed(1, b"ad1", b"hello");
        assert_eq!(open(&[0x43; AEAD_KEY_LEN], 1, b"ad1", &ct), Err(CryptoError::Aead));
        assert_eq!(open(&KEY, 2, b"ad1", &ct), Err(CryptoError::Aead));
        assert_eq!(open(&KEY, 1, b"ad2", &ct), Err(CryptoError::Aead));
    }

    #[test]
    fn open_short_input() {
        assert_eq!(open(&KEY, 0, &[], &[0u8; 15]), Err(CryptoError::Truncated));
    }

    #[test]
    fn empty_plaintext_is_just_a_tag() {
        let ct = sealed(0, &[], &[]);
        assert_eq!(ct.len(), AEAD_TAG_LEN);
        assert_eq!(open(&KEY, 0, &[], &ct).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn counter_is_little_endian_after_zero_prefix() {
        let nonce = noise_nonce(0x0102_0304_0506_0708);
        assert_eq!(&nonce[..4], &[0, 0, 0, 0]);
        assert_eq!(&nonce[4..], &[8, 7, 6, 5, 4, 3, 2, 1]);
    }
}
