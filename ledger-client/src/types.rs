//! Core types shared by every component
//!
//! All identities are fixed-width byte arrays with a base58 text form, the
//! representation the ledger RPC speaks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of an identity / address in bytes
pub const PUBKEY_BYTES: usize = 32;

/// Length of an ed25519 signature in bytes
pub const SIGNATURE_BYTES: usize = 64;

/// Ledger identity: a signer's public key or a derived storage address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

impl Pubkey {
    /// Create from raw bytes
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, failing unless it is exactly 32 bytes
    pub fn try_from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let array: [u8; PUBKEY_BYTES] = bytes.try_into().map_err(|_| {
            crate::Error::InvalidArgument(format!(
                "identity must be {} bytes, got {}",
                PUBKEY_BYTES,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Get bytes
    pub fn to_bytes(&self) -> [u8; PUBKEY_BYTES] {
        self.0
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| crate::Error::InvalidArgument(format!("invalid base58 '{}': {}", s, e)))?;
        Self::try_from_slice(&bytes)
    }
}

/// Recent blockhash, the ledger's freshness value
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Create from raw bytes
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| crate::Error::InvalidArgument(format!("invalid base58 '{}': {}", s, e)))?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| crate::Error::InvalidArgument(format!("blockhash must be 32 bytes: {}", s)))?;
        Ok(Self(array))
    }
}

/// Digital signature (Ed25519)
///
/// The fee payer's signature doubles as the transaction identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_BYTES]);

impl Signature {
    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; SIGNATURE_BYTES]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_BYTES] {
        &self.0
    }

    /// Verify against a message and signer identity
    pub fn verify(&self, message: &[u8], signer: &Pubkey) -> bool {
        crate::crypto::verify_signature(message, self, signer)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; SIGNATURE_BYTES])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl FromStr for Signature {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| crate::Error::InvalidArgument(format!("invalid base58 '{}': {}", s, e)))?;
        let array: [u8; SIGNATURE_BYTES] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| crate::Error::InvalidArgument(format!("signature must be 64 bytes: {}", s)))?;
        Ok(Self(array))
    }
}

macro_rules! base58_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

base58_serde!(Pubkey);
base58_serde!(Hash);
base58_serde!(Signature);

/// Account reference inside an instruction, with its role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    /// Account address
    pub pubkey: Pubkey,
    /// Must sign the transaction
    pub is_signer: bool,
    /// May be mutated by the program
    pub is_writable: bool,
}

impl AccountMeta {
    /// Writable account
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// Read-only account
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// One opaque request to a program: target, ordered account roles and the
/// `[discriminator][arguments]` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Target program
    pub program_id: Pubkey,
    /// Ordered account list with roles
    pub accounts: Vec<AccountMeta>,
    /// Encoded payload
    pub data: Vec<u8>,
}

impl Instruction {
    /// Identities that must sign for this instruction
    pub fn signers(&self) -> impl Iterator<Item = &Pubkey> {
        self.accounts.iter().filter(|a| a.is_signer).map(|a| &a.pubkey)
    }
}

/// The system program, owner of every fresh account
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; PUBKEY_BYTES]);

/// Raw account as returned by the ledger read API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    /// Owning program
    pub owner: Pubkey,
    /// Raw record bytes
    pub data: Vec<u8>,
}
