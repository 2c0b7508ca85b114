//! Ledger RPC seam
//!
//! Everything the client needs from the ledger, as one async trait. The
//! JSON-RPC implementation lives in [`http`]; the in-process simulated
//! ledger in [`crate::mock`] implements the same trait.

pub mod http;

pub use http::HttpRpc;

use crate::error::RejectionCode;
use crate::transaction::{FreshnessToken, SignedTransaction};
use crate::types::{AccountInfo, Pubkey, Signature};
use crate::Result;
use async_trait::async_trait;

/// Server-side account filter for program scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Data at `offset` starts with `bytes`
    Memcmp {
        /// Byte offset into the account data
        offset: usize,
        /// Expected bytes
        bytes: Vec<u8>,
    },
    /// Data is exactly this long
    DataSize(u64),
}

impl AccountFilter {
    /// Filter matching a leading discriminator
    pub fn discriminator(tag: &[u8]) -> Self {
        AccountFilter::Memcmp {
            offset: 0,
            bytes: tag.to_vec(),
        }
    }

    /// Whether `data` passes this filter
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset.saturating_add(bytes.len()))
                .map_or(false, |window| window == bytes.as_slice()),
            AccountFilter::DataSize(size) => data.len() as u64 == *size,
        }
    }
}

/// Status of a submitted transaction as the ledger reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Unknown to the ledger, or seen but not yet at the requested commitment
    Pending,
    /// Confirmed and executed successfully
    Confirmed,
    /// Confirmed with a program error
    Failed(RejectionCode),
}

/// Ledger read and write API
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Raw account at `address`, or `None` if nothing lives there
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>>;

    /// Every account owned by `program_id` that passes all `filters`
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>>;

    /// Fresh blockhash and the last height it stays valid for
    async fn get_latest_blockhash(&self) -> Result<FreshnessToken>;

    /// Current block height
    async fn get_block_height(&self) -> Result<u64>;

    /// Status of one transaction
    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus>;

    /// Hand signed bytes to the ledger ingress
    ///
    /// Resending byte-identical bytes is safe: the ledger deduplicates by
    /// signature.
    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<Signature>;
}
