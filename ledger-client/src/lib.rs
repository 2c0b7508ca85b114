//! Ledger Client
//!
//! Deterministic-address account client for the voting, journal and counter
//! programs.
//!
//! # Architecture
//!
//! - **Address derivation**: every record lives at an address derived from
//!   its semantic key, so independent clients agree without coordination
//! - **Tagged records**: each record starts with a schema discriminator
//! - **Pure builders**: instructions are built and validated with no I/O
//! - **Explicit lifecycle**: `Built -> Signed -> Submitted -> {Confirmed | Failed | Expired}`
//!
//! # Invariants
//!
//! - Same entity key, same address: derivation is a pure function
//! - Bad input fails before any derivation or network call
//! - Only transport failures before ledger ingestion are retried
//! - Resubmission sends byte-identical signed bytes; nothing is re-signed

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod error;
pub mod crypto;
pub mod address;
pub mod schema;
pub mod instruction;
pub mod transaction;
pub mod rpc;
pub mod retry;
pub mod pipeline;
pub mod reader;
pub mod mock;
pub mod actions;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, RejectionCode, Result};
pub use types::{AccountInfo, AccountMeta, Hash, Instruction, Pubkey, Signature};
pub use crypto::{KeyPair, TransactionSigner};
pub use schema::{AccountSchema, Candidate, Counter, JournalEntry, Poll, ProgramAccount};
pub use transaction::{FreshnessToken, SignedTransaction, UnsignedTransaction};
pub use rpc::{HttpRpc, LedgerRpc, SignatureStatus};
pub use pipeline::{PendingTransaction, SubmissionPipeline, TxState};
pub use reader::AccountReader;
pub use mock::MockLedger;
pub use config::{Cluster, Config, ProgramIds};
pub use metrics::Metrics;
