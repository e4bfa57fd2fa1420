//! # Key Management
//!
//! Keypair generation, public-key derivation and secure random bytes.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │  EncryptionKeyPair (X25519, crypto_box)                         │    │
//! │  │  ──────────────────────────────────────                         │    │
//! │  │  • Secret key: 32 bytes (zeroized on drop)                      │    │
//! │  │  • Public key: 32 bytes                                         │    │
//! │  │  • Used for: encryption senders/recipients, signcryption        │    │
//! │  │    recipients, per-message ephemeral keys                       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │  SigningKeyPair (Ed25519, crypto_sign)                          │    │
//! │  │  ─────────────────────────────────────                          │    │
//! │  │  • Secret key: 64 bytes = seed (32) ‖ public key (32)           │    │
//! │  │  • Public key: 32 bytes                                         │    │
//! │  │  • Used for: attached/detached signing, signcryption senders    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  The length of a secret key alone selects its algorithm:                │
//! │  32 bytes → X25519, 64 bytes → Ed25519.                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand_core::RngCore;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{
    CRYPTO_BOX_PUBLICKEYBYTES, CRYPTO_BOX_SECRETKEYBYTES, CRYPTO_SIGN_PUBLICKEYBYTES,
    CRYPTO_SIGN_SECRETKEYBYTES,
};
use crate::error::{Error, Result};

/// A raw public/secret key pair as handed to callers
///
/// The secret half is wiped when the value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Keypair {
    #[zeroize(skip)]
    public_key: Vec<u8>,
    secret_key: Vec<u8>,
}

impl Keypair {
    /// Public key bytes (32 bytes for both algorithms)
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Secret key bytes (32 bytes for encryption, 64 for signing)
    ///
    /// ## Security Warning
    ///
    /// Never log or transmit these bytes.
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &hex::encode(&self.public_key))
            .finish_non_exhaustive()
    }
}

/// X25519 encryption keypair
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKeyPair {
    #[zeroize(skip)] // x25519_dalek handles its own zeroization
    secret: StaticSecret,
    #[zeroize(skip)]
    public: X25519PublicKey,
}

impl EncryptionKeyPair {
    /// Generate a new random encryption keypair
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; CRYPTO_BOX_SECRETKEYBYTES]);
        fill_random(&mut seed[..])?;
        Ok(Self::from_secret(*seed))
    }

    /// Create from a 32-byte secret key
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret: [u8; CRYPTO_BOX_SECRETKEYBYTES] = bytes
            .try_into()
            .map_err(|_| Error::invalid("Wrong key size."))?;
        let secret = Zeroizing::new(secret);
        Ok(Self::from_secret(*secret))
    }

    fn from_secret(bytes: [u8; CRYPTO_BOX_SECRETKEYBYTES]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the secret key bytes
    pub fn secret_bytes(&self) -> [u8; CRYPTO_BOX_SECRETKEYBYTES] {
        self.secret.to_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; CRYPTO_BOX_PUBLICKEYBYTES] {
        self.public.to_bytes()
    }

    /// Raw X25519 shared point with `their_public`
    pub fn diffie_hellman(&self, their_public: &[u8; 32]) -> Zeroizing<[u8; 32]> {
        let their_public = X25519PublicKey::from(*their_public);
        Zeroizing::new(self.secret.diffie_hellman(&their_public).to_bytes())
    }

    /// The same secret as a `crypto_box` key
    pub(crate) fn box_secret(&self) -> crypto_box::SecretKey {
        crypto_box::SecretKey::from(self.secret.to_bytes())
    }
}

/// Ed25519 signing keypair
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    #[zeroize(skip)] // ed25519_dalek::SigningKey handles its own zeroization
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing keypair
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; 32]);
        fill_random(&mut seed[..])?;
        Ok(Self {
            secret: SigningKey::from_bytes(&seed),
        })
    }

    /// Create from a 64-byte secret key (seed ‖ public key)
    ///
    /// The embedded public key must match the one derived from the seed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let keypair: [u8; CRYPTO_SIGN_SECRETKEYBYTES] = bytes
            .try_into()
            .map_err(|_| Error::invalid("Wrong key size."))?;
        let keypair = Zeroizing::new(keypair);
        let secret = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| Error::invalid(format!("Invalid signing key: {}", e)))?;
        Ok(Self { secret })
    }

    /// Get the 64-byte secret key (seed ‖ public key)
    pub fn secret_bytes(&self) -> [u8; CRYPTO_SIGN_SECRETKEYBYTES] {
        self.secret.to_keypair_bytes()
    }

    /// Get the public key bytes
    pub fn public_bytes(&self) -> [u8; CRYPTO_SIGN_PUBLICKEYBYTES] {
        self.secret.verifying_key().to_bytes()
    }

    /// Get the verifying key for signature verification
    pub fn verifying_key(&self) -> VerifyingKey {
        self.secret.verifying_key()
    }

    /// Get reference to the signing key
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

// ============================================================================
// KEY MANAGER OPERATIONS
// ============================================================================

/// Generate an X25519 encryption keypair (32-byte public, 32-byte secret)
pub fn generate_keypair() -> Result<Keypair> {
    let pair = EncryptionKeyPair::generate()?;
    Ok(Keypair {
        public_key: pair.public_bytes().to_vec(),
        secret_key: pair.secret_bytes().to_vec(),
    })
}

/// Generate an Ed25519 signing keypair (32-byte public, 64-byte secret)
pub fn generate_sign_keypair() -> Result<Keypair> {
    let pair = SigningKeyPair::generate()?;
    Ok(Keypair {
        public_key: pair.public_bytes().to_vec(),
        secret_key: pair.secret_bytes().to_vec(),
    })
}

/// Derive the public key belonging to `secret_key`
///
/// A 32-byte key is treated as an X25519 secret, a 64-byte key as an
/// Ed25519 secret. Any other length is rejected.
pub fn derive_public_key(secret_key: &[u8]) -> Result<Vec<u8>> {
    match secret_key.len() {
        CRYPTO_BOX_SECRETKEYBYTES => {
            Ok(EncryptionKeyPair::from_bytes(secret_key)?.public_bytes().to_vec())
        }
        CRYPTO_SIGN_SECRETKEYBYTES => {
            let seed: [u8; 32] = secret_key[..32]
                .try_into()
                .map_err(|_| Error::invalid("Wrong key size."))?;
            let seed = Zeroizing::new(seed);
            Ok(SigningKey::from_bytes(&seed).verifying_key().to_bytes().to_vec())
        }
        _ => Err(Error::invalid("Wrong key size.")),
    }
}

/// Generate `size` cryptographically secure random bytes
pub fn generate_random_bytes(size: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; size];
    fill_random(&mut out)?;
    Ok(out)
}

/// Fill `buf` from the operating system's secure random source
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::ResourceExhausted(format!("Entropy source unavailable: {}", e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = generate_keypair().unwrap();
        let kp2 = generate_keypair().unwrap();

        assert_eq!(kp1.public_key().len(), CRYPTO_BOX_PUBLICKEYBYTES);
        assert_eq!(kp1.secret_key().len(), CRYPTO_BOX_SECRETKEYBYTES);
        assert_ne!(kp1.public_key(), kp2.public_key());
        assert_ne!(kp1.secret_key(), kp2.secret_key());
    }

    #[test]
    fn test_sign_keypair_generation() {
        let kp = generate_sign_keypair().unwrap();

        assert_eq!(kp.public_key().len(), CRYPTO_SIGN_PUBLICKEYBYTES);
        assert_eq!(kp.secret_key().len(), CRYPTO_SIGN_SECRETKEYBYTES);
        // libsodium layout: the public key trails the seed
        assert_eq!(&kp.secret_key()[32..], kp.public_key());
    }

    #[test]
    fn test_derive_public_key() {
        let kp = generate_keypair().unwrap();
        assert_eq!(derive_public_key(kp.secret_key()).unwrap(), kp.public_key());

        let skp = generate_sign_keypair().unwrap();
        assert_eq!(derive_public_key(skp.secret_key()).unwrap(), skp.public_key());
    }

    #[test]
    fn test_derive_public_key_is_pure() {
        let secret = [7u8; 32];
        assert_eq!(
            derive_public_key(&secret).unwrap(),
            derive_public_key(&secret).unwrap()
        );
    }

    #[test]
    fn test_derive_public_key_wrong_length() {
        let err = derive_public_key(&[0u8; 33]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(derive_public_key(&[]).is_err());
    }

    #[test]
    fn test_diffie_hellman() {
        let alice = EncryptionKeyPair::generate().unwrap();
        let bob = EncryptionKeyPair::generate().unwrap();

        let alice_shared = alice.diffie_hellman(&bob.public_bytes());
        let bob_shared = bob.diffie_hellman(&alice.public_bytes());

        assert_eq!(*alice_shared, *bob_shared);
    }

    #[test]
    fn test_signing_key_rejects_mismatched_public_half() {
        let kp = generate_sign_keypair().unwrap();
        let mut secret = kp.secret_key().to_vec();
        secret[40] ^= 0xff;

        assert!(SigningKeyPair::from_bytes(&secret).is_err());
        assert!(SigningKeyPair::from_bytes(kp.secret_key()).is_ok());
    }

    #[test]
    fn test_random_bytes() {
        let b1 = generate_random_bytes(4096).unwrap();
        let b2 = generate_random_bytes(4096).unwrap();

        assert_eq!(b1.len(), 4096);
        assert_eq!(b2.len(), 4096);
        assert_ne!(b1, b2);
        assert!(generate_random_bytes(0).unwrap().is_empty());
    }
}
