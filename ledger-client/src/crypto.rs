//! Cryptographic operations for the client
//!
//! This module provides:
//! - Ed25519 key pair generation, signing, and verification
//! - The `TransactionSigner` capability passed explicitly to builders and the pipeline
//! - SHA-256 hashing and the curve-point test used by address derivation

use crate::types::{Pubkey, Signature};
use crate::{Error, Result};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Signing capability
///
/// The signing identity is always passed explicitly; nothing in the crate
/// reaches for an ambient wallet.
pub trait TransactionSigner: Send + Sync {
    /// Identity this signer signs for
    fn pubkey(&self) -> Pubkey;

    /// Sign the exact message bytes
    fn sign_message(&self, message: &[u8]) -> Signature;
}

/// Ed25519 key pair for signing
#[derive(Debug)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_seed(&rand::random::<[u8; 32]>())
    }

    /// Create from seed (32 bytes) - deterministic generation
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Parse the 64-byte `secret || public` form
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 64] = bytes.try_into().map_err(|_| {
            Error::InvalidArgument(format!("keypair must be 64 bytes, got {}", bytes.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(&array)
            .map_err(|e| Error::InvalidArgument(format!("inconsistent keypair bytes: {}", e)))?;
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Load a keypair file: a JSON array of 64 bytes
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let bytes: Vec<u8> = serde_json::from_str(&content)?;
        Self::from_keypair_bytes(&bytes)
    }

    /// Serialize as the JSON keypair file form
    pub fn to_json(&self) -> String {
        let bytes = self.signing_key.to_keypair_bytes();
        serde_json::to_string(&bytes.to_vec()).unwrap_or_default()
    }

    /// Get public key
    pub fn public_key(&self) -> Pubkey {
        Pubkey::new_from_array(self.verifying_key.to_bytes())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signature = self.signing_key.sign(message);
        Signature::from_bytes(signature.to_bytes())
    }

    /// Verify a signature
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());
        self.verifying_key
            .verify(message, &dalek_sig)
            .map_err(|e| Error::InvalidArgument(format!("Verification failed: {}", e)))
    }
}

impl TransactionSigner for KeyPair {
    fn pubkey(&self) -> Pubkey {
        self.public_key()
    }

    fn sign_message(&self, message: &[u8]) -> Signature {
        self.sign(message)
    }
}

/// Verify a signature with a public key
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &Pubkey) -> bool {
    let dalek_sig = DalekSignature::from_bytes(signature.as_bytes());

    let verifying_key = match VerifyingKey::from_bytes(&public_key.to_bytes()) {
        Ok(key) => key,
        Err(_) => return false,
    };

    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Whether the bytes decompress to a point on the ed25519 curve
///
/// Derived addresses must fail this test so no private key can exist for them.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

/// First eight bytes of `sha256(namespace ":" name)`
pub fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = hash_bytes(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}
