//! Journal entry record

use super::{check_len, pubkey_bytes, AccountSchema, DISCRIMINATOR_LEN, LEN_PREFIX};
use crate::address::MAX_PREFIXED_SEED_STR;
use crate::transaction::PACKET_DATA_SIZE;
use crate::types::{Pubkey, PUBKEY_BYTES, SIGNATURE_BYTES};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Maximum title length; the title is also an address seed
pub const MAX_TITLE_LEN: usize = MAX_PREFIXED_SEED_STR;

/// Everything in an owner-paid create or update transaction except the title
/// and message bytes: one signature, header, four account keys (owner, entry,
/// system program, journal program), blockhash, and the instruction framing
/// with its discriminator and two length prefixes
const ENTRY_TX_OVERHEAD: usize = 1
    + SIGNATURE_BYTES
    + 3
    + 1
    + 4 * PUBKEY_BYTES
    + 32
    + 1
    + 1
    + 1
    + 3
    + 2
    + DISCRIMINATOR_LEN
    + 2 * LEN_PREFIX;

/// Maximum message length (UTF-8 bytes)
///
/// The largest message that still fits one packet next to a maximum-length
/// title.
pub const MAX_MESSAGE_LEN: usize = PACKET_DATA_SIZE - ENTRY_TX_OVERHEAD - MAX_TITLE_LEN;

/// One journal entry per `(title, owner)`; only `message` is mutable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Creator; the only identity allowed to update or delete
    #[serde(with = "pubkey_bytes")]
    pub owner: Pubkey,
    /// Title
    pub title: String,
    /// Body
    pub message: String,
}

impl AccountSchema for JournalEntry {
    const NAME: &'static str = "JournalEntryState";
    const MIN_BODY_LEN: usize = PUBKEY_BYTES + LEN_PREFIX * 2;

    fn check_bounds(&self) -> Result<()> {
        check_len("title", &self.title, MAX_TITLE_LEN)?;
        check_len("message", &self.message, MAX_MESSAGE_LEN)
    }
}
