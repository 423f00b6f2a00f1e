use core::fmt;

use agora_primitives::hash::Hash;
use agora_primitives::identity::{PrivateKey, PublicKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

mod shared;

pub use shared::{open, seal, SealError, SharedKey, SharedKeyError, Nonce, NONCE_LEN};

/// Signing, verification and content hashing as consumed by the store.
pub trait CryptoProvider: fmt::Debug + Send + Sync + 'static {
    fn sign(&self, private_key: &PrivateKey, bytes: &[u8]) -> Signature;

    fn verify(&self, public_key: &PublicKey, bytes: &[u8], signature: &Signature) -> bool;

    fn hash(&self, bytes: &[u8]) -> Hash;
}

/// Ed25519 signatures over SHA-256 digests.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Sha256;

impl CryptoProvider for Ed25519Sha256 {
    fn sign(&self, private_key: &PrivateKey, bytes: &[u8]) -> Signature {
        let signing_key = SigningKey::from_bytes(private_key.as_bytes());

        Signature::from(signing_key.sign(bytes).to_bytes())
    }

    fn verify(&self, public_key: &PublicKey, bytes: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
            return false;
        };

        let signature = ed25519_dalek::Signature::from_bytes(signature.as_bytes());

        verifying_key.verify(bytes, &signature).is_ok()
    }

    fn hash(&self, bytes: &[u8]) -> Hash {
        Hash::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use agora_primitives::identity::KeyPair;
    use rand::thread_rng;

    use super::*;

    #[test]
    fn test_sign_verify() {
        let crypto = Ed25519Sha256;
        let keypair = KeyPair::random(&mut thread_rng());

        let signature = crypto.sign(keypair.private_key(), b"sell 2 BTC");

        assert!(crypto.verify(keypair.public_key(), b"sell 2 BTC", &signature));
        assert!(!crypto.verify(keypair.public_key(), b"sell 3 BTC", &signature));
    }

    #[test]
    fn test_verify_with_foreign_key_fails() {
        let crypto = Ed25519Sha256;
        let mut rng = thread_rng();
        let signer = KeyPair::random(&mut rng);
        let stranger = KeyPair::random(&mut rng);

        let signature = crypto.sign(signer.private_key(), b"vote yes");

        assert!(!crypto.verify(stranger.public_key(), b"vote yes", &signature));
    }

    #[test]
    fn test_verify_with_garbage_key_fails() {
        let crypto = Ed25519Sha256;
        let signer = KeyPair::random(&mut thread_rng());
        let signature = crypto.sign(signer.private_key(), b"payload");

        // Not every 32-byte string decompresses to a curve point.
        let garbage = PublicKey::from([0xff; 32]);

        assert!(!crypto.verify(&garbage, b"payload", &signature));
    }

    #[test]
    fn test_hash_is_content_addressed() {
        let crypto = Ed25519Sha256;

        assert_eq!(crypto.hash(b"abc"), crypto.hash(b"abc"));
        assert_ne!(crypto.hash(b"abc"), crypto.hash(b"abd"));
    }
}
