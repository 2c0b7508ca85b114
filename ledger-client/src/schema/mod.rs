//! Record schemas for ledger-resident accounts
//!
//! Wire layout per account:
//!
//! ```text
//! [8-byte discriminator][fixed-width fields, declared order][length-prefixed fields]
//! ```
//!
//! Numbers are fixed-width little-endian; strings carry a u64 length prefix.
//! Trailing bytes are ignored since accounts may be allocated larger than
//! their current content.

mod counter;
mod journal;
mod voting;

pub use counter::Counter;
pub use journal::{JournalEntry, MAX_MESSAGE_LEN, MAX_TITLE_LEN};
pub use voting::{Candidate, Poll, MAX_CANDIDATE_NAME_LEN, MAX_DESCRIPTION_LEN};

use crate::crypto::discriminator;
use crate::{Error, Result};
use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

/// Length of a schema discriminator
pub const DISCRIMINATOR_LEN: usize = 8;

/// Width of a string length prefix
pub(crate) const LEN_PREFIX: usize = 8;

/// A versioned, tagged record layout
pub trait AccountSchema: Serialize + DeserializeOwned + Sized {
    /// Schema name; the discriminator is derived from it
    const NAME: &'static str;

    /// Minimum encoded size of the body (after the discriminator)
    const MIN_BODY_LEN: usize;

    /// Tag identifying this schema among the program's accounts
    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        discriminator("account", Self::NAME)
    }

    /// Check every variable-length field against its bound
    fn check_bounds(&self) -> Result<()>;

    /// Encode to `[discriminator][body]`
    fn encode(&self) -> Result<Vec<u8>> {
        self.check_bounds()?;
        let mut out = Self::discriminator().to_vec();
        out.extend(codec().serialize(self)?);
        Ok(out)
    }

    /// Decode from `[discriminator][body]`
    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(Error::TruncatedRecord {
                needed: DISCRIMINATOR_LEN,
                len: data.len(),
            });
        }
        let (tag, body) = data.split_at(DISCRIMINATOR_LEN);
        if tag != Self::discriminator() {
            return Err(Error::SchemaMismatch {
                expected: Self::NAME,
                found: tag.to_vec(),
            });
        }
        let record: Self = decode_body(body, Self::MIN_BODY_LEN)?;
        record.check_bounds().map_err(|e| {
            Error::Serialization(Box::new(bincode::ErrorKind::Custom(e.to_string())))
        })?;
        Ok(record)
    }
}

/// Fixed-int little-endian options shared by records and instruction arguments
pub(crate) fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// Decode a body, mapping short buffers and overlong length prefixes to `TruncatedRecord`
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8], min_len: usize) -> Result<T> {
    let needed = DISCRIMINATOR_LEN + min_len;
    let len = DISCRIMINATOR_LEN + body.len();
    if body.len() < min_len {
        return Err(Error::TruncatedRecord { needed, len });
    }
    codec()
        .with_limit(body.len() as u64)
        .deserialize(body)
        .map_err(|e| {
            let truncated = match e.as_ref() {
                bincode::ErrorKind::Io(io) => io.kind() == std::io::ErrorKind::UnexpectedEof,
                bincode::ErrorKind::SizeLimit => true,
                _ => false,
            };
            if truncated {
                Error::TruncatedRecord { needed, len }
            } else {
                Error::Serialization(e)
            }
        })
}

/// Fail with `InvalidArgument` if `value` exceeds `max` UTF-8 bytes
pub(crate) fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(Error::InvalidArgument(format!(
            "{} is {} bytes (max {})",
            field,
            value.len(),
            max
        )));
    }
    Ok(())
}

/// Serde adapter encoding an identity as 32 raw bytes
pub(crate) mod pubkey_bytes {
    use crate::types::{Pubkey, PUBKEY_BYTES};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        key.to_bytes().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let bytes = <[u8; PUBKEY_BYTES]>::deserialize(deserializer)?;
        Ok(Pubkey::new_from_array(bytes))
    }
}

/// Any record owned by one of the programs, keyed by discriminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramAccount {
    /// Poll record
    Poll(Poll),
    /// Candidate record
    Candidate(Candidate),
    /// Journal entry record
    JournalEntry(JournalEntry),
    /// Counter record
    Counter(Counter),
}

impl ProgramAccount {
    /// Dispatch on the leading discriminator
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DISCRIMINATOR_LEN {
            return Err(Error::TruncatedRecord {
                needed: DISCRIMINATOR_LEN,
                len: data.len(),
            });
        }
        let tag = &data[..DISCRIMINATOR_LEN];
        if tag == Poll::discriminator() {
            Poll::decode(data).map(ProgramAccount::Poll)
        } else if tag == Candidate::discriminator() {
            Candidate::decode(data).map(ProgramAccount::Candidate)
        } else if tag == JournalEntry::discriminator() {
            JournalEntry::decode(data).map(ProgramAccount::JournalEntry)
        } else if tag == Counter::discriminator() {
            Counter::decode(data).map(ProgramAccount::Counter)
        } else {
            Err(Error::SchemaMismatch {
                expected: "program account",
                found: tag.to_vec(),
            })
        }
    }

    /// Encode whichever record this is
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            ProgramAccount::Poll(r) => r.encode(),
            ProgramAccount::Candidate(r) => r.encode(),
            ProgramAccount::JournalEntry(r) => r.encode(),
            ProgramAccount::Counter(r) => r.encode(),
        }
    }

    /// Schema name
    pub fn kind(&self) -> &'static str {
        match self {
            ProgramAccount::Poll(_) => Poll::NAME,
            ProgramAccount::Candidate(_) => Candidate::NAME,
            ProgramAccount::JournalEntry(_) => JournalEntry::NAME,
            ProgramAccount::Counter(_) => Counter::NAME,
        }
    }
}
