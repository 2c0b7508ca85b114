//! Simulated ledger
//!
//! An in-process ledger implementing [`LedgerRpc`] with the voting, journal
//! and counter program rules. Transactions execute atomically against a copy
//! of the account set that is committed only if every instruction succeeds.
//! Fault injection covers the paths a real network produces:
//!
//! - `fail_next_sends`: the send fails before ingestion
//! - `drop_next_acks`: the transaction is ingested, the acknowledgement lost
//! - `pause` / `process_pending`: ingested but not yet executed
//! - `advance_blocks`: move block height past a blockhash's validity window
//!
//! Block height also advances by one for every executed transaction, so the
//! next blockhash handed out differs from the one just used.
//! - `fail_next_status_polls`: status reads fail at the transport level

mod program;

use crate::config::ProgramIds;
use crate::crypto::hash_bytes;
use crate::rpc::{AccountFilter, LedgerRpc, SignatureStatus};
use crate::transaction::{FreshnessToken, SignedTransaction};
use crate::types::{AccountInfo, Hash, Pubkey, Signature};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use program::Executor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Blocks a blockhash stays valid for after it is issued
pub const BLOCKHASH_VALIDITY: u64 = 150;

/// Ledger clock at startup; inside the example poll's window
pub const DEFAULT_UNIX_TIME: i64 = 1_700_000_000;

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, AccountInfo>,
    block_height: u64,
    unix_time: i64,
    blockhashes: HashMap<Hash, u64>,
    statuses: HashMap<Signature, SignatureStatus>,
    queue: Vec<SignedTransaction>,
    paused: bool,
    fail_sends: u32,
    drop_acks: u32,
    fail_status_polls: u32,
    sends: u64,
    executed: u64,
}

/// In-process ledger; clones share state
#[derive(Debug, Clone)]
pub struct MockLedger {
    programs: ProgramIds,
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    /// Ledger with the given programs deployed
    pub fn new(programs: ProgramIds) -> Self {
        let state = LedgerState {
            block_height: 1,
            unix_time: DEFAULT_UNIX_TIME,
            ..LedgerState::default()
        };
        Self {
            programs,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Deployed programs
    pub fn programs(&self) -> &ProgramIds {
        &self.programs
    }

    /// Fail the next `n` sends before ingestion
    pub fn fail_next_sends(&self, n: u32) {
        self.state.lock().fail_sends = n;
    }

    /// Ingest the next `n` sends but report a transport failure
    pub fn drop_next_acks(&self, n: u32) {
        self.state.lock().drop_acks = n;
    }

    /// Fail the next `n` signature status reads at the transport level
    pub fn fail_next_status_polls(&self, n: u32) {
        self.state.lock().fail_status_polls = n;
    }

    /// Queue ingested transactions instead of executing them
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    /// Resume and execute everything queued, in arrival order
    pub fn process_pending(&self) {
        let mut state = self.state.lock();
        state.paused = false;
        let queue = std::mem::take(&mut state.queue);
        for transaction in queue {
            self.process(&mut state, &transaction);
        }
    }

    /// Advance block height by `n`
    pub fn advance_blocks(&self, n: u64) {
        let mut state = self.state.lock();
        state.block_height += n;
        debug!(block_height = state.block_height, "advanced blocks");
    }

    /// Set the ledger clock
    pub fn set_unix_time(&self, unix_time: i64) {
        self.state.lock().unix_time = unix_time;
    }

    /// Place raw bytes at `address`, bypassing every program
    pub fn set_account(&self, address: Pubkey, info: AccountInfo) {
        self.state.lock().accounts.insert(address, info);
    }

    /// Sends received, including duplicates and injected failures
    pub fn send_count(&self) -> u64 {
        self.state.lock().sends
    }

    /// Distinct transactions executed, successful or not
    pub fn executed_count(&self) -> u64 {
        self.state.lock().executed
    }

    /// Transactions ingested while paused
    pub fn queued_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn process(&self, state: &mut LedgerState, transaction: &SignedTransaction) {
        let signature = transaction.signature();
        if state.statuses.contains_key(&signature) {
            return;
        }

        let message = transaction.message();
        let valid_through = state.blockhashes.get(&message.recent_blockhash).copied();
        match valid_through {
            Some(last_valid) if state.block_height <= last_valid => {}
            _ => {
                // unknown or lapsed blockhash: dropped without a trace
                debug!(%signature, "dropping transaction with stale blockhash");
                return;
            }
        }

        let outcome = message
            .decompile()
            .map_err(|_| crate::error::RejectionCode::InstructionDidNotDeserialize)
            .and_then(|instructions| {
                let mut working = state.accounts.clone();
                let mut executor = Executor {
                    accounts: &mut working,
                    programs: &self.programs,
                    unix_time: state.unix_time,
                };
                for ix in &instructions {
                    executor.execute(ix)?;
                }
                Ok(working)
            });

        state.executed += 1;
        // each executed transaction lands in a block of its own
        state.block_height += 1;
        let status = match outcome {
            Ok(accounts) => {
                state.accounts = accounts;
                SignatureStatus::Confirmed
            }
            Err(code) => SignatureStatus::Failed(code),
        };
        info!(%signature, ?status, "executed transaction");
        state.statuses.insert(signature, status);
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_account_info(&self, address: &Pubkey) -> Result<Option<AccountInfo>> {
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, AccountInfo)>> {
        let state = self.state.lock();
        let mut accounts: Vec<(Pubkey, AccountInfo)> = state
            .accounts
            .iter()
            .filter(|(_, info)| info.owner == *program_id)
            .filter(|(_, info)| filters.iter().all(|f| f.matches(&info.data)))
            .map(|(address, info)| (*address, info.clone()))
            .collect();
        accounts.sort_by_key(|(address, _)| *address);
        Ok(accounts)
    }

    async fn get_latest_blockhash(&self) -> Result<FreshnessToken> {
        let mut state = self.state.lock();
        let mut seed = b"blockhash".to_vec();
        seed.extend_from_slice(&state.block_height.to_le_bytes());
        let blockhash = Hash::new_from_array(hash_bytes(&seed));
        let last_valid_block_height = state.block_height + BLOCKHASH_VALIDITY;
        state.blockhashes.insert(blockhash, last_valid_block_height);
        Ok(FreshnessToken {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn get_block_height(&self) -> Result<u64> {
        Ok(self.state.lock().block_height)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<SignatureStatus> {
        let mut state = self.state.lock();
        if state.fail_status_polls > 0 {
            state.fail_status_polls -= 1;
            return Err(Error::Transport("injected status poll failure".into()));
        }
        Ok(state
            .statuses
            .get(signature)
            .copied()
            .unwrap_or(SignatureStatus::Pending))
    }

    async fn send_transaction(&self, transaction: &SignedTransaction) -> Result<Signature> {
        let mut state = self.state.lock();
        state.sends += 1;

        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(Error::Transport("injected send failure".into()));
        }

        transaction.verify().map_err(|e| Error::Rpc {
            code: -32003,
            message: format!("Transaction signature verification failure: {}", e),
        })?;

        let signature = transaction.signature();
        let seen = state.statuses.contains_key(&signature)
            || state.queue.iter().any(|queued| queued.signature() == signature);
        if seen {
            debug!(%signature, "duplicate submission ignored");
        } else if state.paused {
            state.queue.push(transaction.clone());
        } else {
            self.process(&mut state, transaction);
        }

        if state.drop_acks > 0 {
            state.drop_acks -= 1;
            return Err(Error::Transport("injected dropped acknowledgement".into()));
        }
        Ok(signature)
    }
}
