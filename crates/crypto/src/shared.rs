//! Symmetric sealing of mailbox messages between a sender and a receiver key.

use agora_primitives::identity::{PrivateKey, PublicKey};
use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{SecretKey, SigningKey};
use rand::RngCore;
use ring::aead;
use thiserror::Error;

pub const NONCE_LEN: usize = 12;

pub type Nonce = [u8; NONCE_LEN];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SharedKeyError {
    /// The public key bytes do not represent a valid Edwards Y coordinate.
    #[error("invalid public key: not a valid Edwards Y coordinate")]
    InvalidPublicKey,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SealError {
    #[error(transparent)]
    SharedKey(#[from] SharedKeyError),

    #[error("sealed message is shorter than its nonce")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,
}

/// Diffie-Hellman secret between two ed25519 identities, used as an
/// AES-256-GCM key.
#[derive(Copy, Clone)]
pub struct SharedKey {
    key: SecretKey,
}

impl core::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SharedKey(..)")
    }
}

impl SharedKey {
    pub fn new(sk: &PrivateKey, pk: &PublicKey) -> Result<Self, SharedKeyError> {
        let point = CompressedEdwardsY(*pk.as_bytes())
            .decompress()
            .ok_or(SharedKeyError::InvalidPublicKey)?;

        Ok(Self {
            key: (SigningKey::from_bytes(sk.as_bytes()).to_scalar() * point)
                .compress()
                .to_bytes(),
        })
    }

    #[must_use]
    pub fn encrypt(&self, payload: Vec<u8>, nonce: Nonce) -> Option<Vec<u8>> {
        let key = aead::LessSafeKey::new(aead::UnboundKey::new(&aead::AES_256_GCM, &self.key).ok()?);

        let mut cipher_text = payload;
        key.seal_in_place_append_tag(
            aead::Nonce::assume_unique_for_key(nonce),
            aead::Aad::empty(),
            &mut cipher_text,
        )
        .ok()?;

        Some(cipher_text)
    }

    #[must_use]
    pub fn decrypt(&self, cipher_text: Vec<u8>, nonce: Nonce) -> Option<Vec<u8>> {
        let key = aead::LessSafeKey::new(aead::UnboundKey::new(&aead::AES_256_GCM, &self.key).ok()?);

        let mut payload = cipher_text;
        let len = key
            .open_in_place(
                aead::Nonce::assume_unique_for_key(nonce),
                aead::Aad::empty(),
                &mut payload,
            )
            .ok()?
            .len();

        payload.truncate(len);

        Some(payload)
    }
}

/// Encrypts `message` for `receiver`. The output is `nonce || ciphertext`.
pub fn seal(sender: &PrivateKey, receiver: &PublicKey, message: &[u8]) -> Result<Vec<u8>, SealError> {
    let shared_key = SharedKey::new(sender, receiver)?;

    let mut nonce = [0; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher_text = shared_key
        .encrypt(message.to_vec(), nonce)
        .ok_or(SealError::Encrypt)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN.saturating_add(cipher_text.len()));
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&cipher_text);

    Ok(sealed)
}

/// Reverses [`seal`] on the receiver's side.
pub fn open(receiver: &PrivateKey, sender: &PublicKey, sealed: &[u8]) -> Result<Vec<u8>, SealError> {
    let shared_key = SharedKey::new(receiver, sender)?;

    let Some((nonce, cipher_text)) = sealed.split_first_chunk::<NONCE_LEN>() else {
        return Err(SealError::Truncated);
    };

    shared_key
        .decrypt(cipher_text.to_vec(), *nonce)
        .ok_or(SealError::Decrypt)
}
