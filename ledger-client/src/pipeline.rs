//! Submission & confirmation pipeline
//!
//! Each transaction moves through an explicit state machine:
//!
//! ```text
//! Built -> Signed -> Submitted -> { Confirmed | Failed | Expired }
//! ```
//!
//! - Signing needs every required signer; nothing is sent otherwise.
//! - Submission retries transport failures with backoff. Exhausting the
//!   retries yields `SubmissionFailed`, and the outcome is then unknown: the
//!   ledger may have ingested a transaction whose acknowledgement was lost.
//! - Confirmation polls the signature status, periodically resending the
//!   same signed bytes. Once the block height passes the token's last valid
//!   height with nothing observed, the transaction is `Expired` and must be
//!   rebuilt with a fresh token.
//!
//! All waiting uses `tokio::time`, so tests drive the pipeline on a paused
//! clock. Dropping a confirmation future only stops the waiting; it never
//! affects what the ledger does with an ingested transaction.

use crate::config::ConfirmationConfig;
use crate::crypto::TransactionSigner;
use crate::error::RejectionCode;
use crate::metrics::Metrics;
use crate::retry::{RetryConfig, RetryStrategy};
use crate::rpc::{LedgerRpc, SignatureStatus};
use crate::transaction::{assemble, FreshnessToken, SignedTransaction, UnsignedTransaction};
use crate::types::{Instruction, Pubkey, Signature};
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Assembled, unsigned
    Built,
    /// Every required signature present
    Signed,
    /// Handed to the ledger at least once
    Submitted,
    /// Confirmed with success
    Confirmed,
    /// Confirmed with a program error
    Failed(RejectionCode),
    /// Freshness window lapsed with no confirmation observed
    Expired,
}

impl TxState {
    /// No further transitions possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Failed(_) | TxState::Expired)
    }

    fn can_advance_to(&self, next: &TxState) -> bool {
        match (self, next) {
            (TxState::Built, TxState::Signed) => true,
            (TxState::Signed, TxState::Submitted) => true,
            (TxState::Submitted, TxState::Submitted) => true,
            (TxState::Submitted, next) => next.is_terminal(),
            _ => false,
        }
    }
}

/// A signed transaction and where it is in its lifecycle
#[derive(Debug, Clone)]
pub struct PendingTransaction {
    transaction: SignedTransaction,
    token: FreshnessToken,
    state: TxState,
    submitted_at: Option<Instant>,
}

impl PendingTransaction {
    /// Transaction identity
    pub fn signature(&self) -> Signature {
        self.transaction.signature()
    }

    /// Current state
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Signed transaction
    pub fn transaction(&self) -> &SignedTransaction {
        &self.transaction
    }

    /// Token the transaction was built with
    pub fn freshness(&self) -> FreshnessToken {
        self.token
    }

    fn advance(&mut self, next: TxState) -> Result<()> {
        if !self.state.can_advance_to(&next) {
            return Err(Error::InvalidArgument(format!(
                "transaction {} cannot move from {:?} to {:?}",
                self.signature(),
                self.state,
                next
            )));
        }
        if self.state != next {
            debug!(signature = %self.signature(), from = ?self.state, to = ?next, "state transition");
        }
        self.state = next;
        Ok(())
    }
}

/// Drives transactions from assembly to a terminal state
#[derive(Debug, Clone)]
pub struct SubmissionPipeline<R> {
    rpc: R,
    retry: RetryStrategy,
    confirmation: ConfirmationConfig,
    metrics: Option<Metrics>,
}

impl<R: LedgerRpc> SubmissionPipeline<R> {
    /// Create a pipeline over `rpc`
    pub fn new(rpc: R, retry: RetryConfig, confirmation: ConfirmationConfig) -> Self {
        Self {
            rpc,
            retry: RetryStrategy::new(retry),
            confirmation,
            metrics: None,
        }
    }

    /// Record into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.retry = self.retry.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Underlying RPC
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Fetch a fresh token and assemble `instructions` under `fee_payer`
    pub async fn build(&self, instructions: &[Instruction], fee_payer: &Pubkey) -> Result<UnsignedTransaction> {
        if instructions.is_empty() {
            return Err(Error::EmptyTransaction);
        }
        let rpc = &self.rpc;
        let token = self
            .retry
            .execute_with_retry(move || rpc.get_latest_blockhash(), "get_latest_blockhash")
            .await?;
        let height = self
            .retry
            .execute_with_retry(move || rpc.get_block_height(), "get_block_height")
            .await?;
        assemble(instructions, fee_payer, Some(token), height)
    }

    /// `Built -> Signed`
    pub fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        signers: &[&dyn TransactionSigner],
    ) -> Result<PendingTransaction> {
        let transaction = unsigned.sign(signers)?;
        let mut pending = PendingTransaction {
            transaction,
            token: unsigned.freshness(),
            state: TxState::Built,
            submitted_at: None,
        };
        pending.advance(TxState::Signed)?;
        Ok(pending)
    }

    /// `Signed -> Submitted`, retrying transport failures
    ///
    /// Resubmitting an already submitted transaction sends the identical
    /// bytes again, which the ledger deduplicates.
    pub async fn submit(&self, pending: &mut PendingTransaction) -> Result<Signature> {
        if pending.state.is_terminal() {
            return Err(Error::InvalidArgument(format!(
                "transaction {} is already {:?}",
                pending.signature(),
                pending.state
            )));
        }

        let rpc = &self.rpc;
        let transaction = &pending.transaction;
        let signature = self
            .retry
            .execute_with_retry(move || rpc.send_transaction(transaction), "send_transaction")
            .await
            .map_err(|e| {
                if matches!(e, Error::SubmissionFailed { .. }) {
                    warn!(
                        signature = %pending.signature(),
                        "submission retries exhausted; the ledger may still have ingested the transaction"
                    );
                }
                e
            })?;

        if signature != pending.signature() {
            warn!(expected = %pending.signature(), returned = %signature, "ledger returned a different signature");
        }
        pending.advance(TxState::Submitted)?;
        if pending.submitted_at.is_none() {
            pending.submitted_at = Some(Instant::now());
        }
        if let Some(metrics) = &self.metrics {
            metrics.submitted.inc();
        }
        info!(signature = %pending.signature(), "transaction submitted");
        Ok(pending.signature())
    }

    /// `Submitted -> {Confirmed | Failed | Expired}`
    ///
    /// Returns the signature on success, `ProgramRejected` on a confirmed
    /// program error, `Expired` once the freshness window has lapsed, and
    /// `ConfirmationTimeout` if the configured wait elapses first (the state
    /// then stays `Submitted`).
    pub async fn confirm(&self, pending: &mut PendingTransaction) -> Result<Signature> {
        match pending.state {
            TxState::Submitted => {}
            TxState::Confirmed => return Ok(pending.signature()),
            TxState::Failed(code) => return Err(Error::ProgramRejected(code)),
            TxState::Expired => {
                return Err(Error::Expired {
                    signature: pending.signature(),
                })
            }
            state => {
                return Err(Error::InvalidArgument(format!(
                    "transaction {} has not been submitted ({:?})",
                    pending.signature(),
                    state
                )))
            }
        }

        let signature = pending.signature();
        let poll_interval = Duration::from_millis(self.confirmation.poll_interval_ms);
        let deadline = Instant::now() + Duration::from_millis(self.confirmation.timeout_ms);
        let mut polls: u32 = 0;

        loop {
            if let Some(status) = self.poll_status(&signature).await? {
                if status != SignatureStatus::Pending {
                    return self.settle(pending, status);
                }
            }

            if self.window_elapsed(pending).await? {
                // the last valid block may have carried it
                let last = self.poll_status(&signature).await?.unwrap_or(SignatureStatus::Pending);
                if last != SignatureStatus::Pending {
                    return self.settle(pending, last);
                }
                pending.advance(TxState::Expired)?;
                self.record(pending);
                warn!(%signature, last_valid = pending.token.last_valid_block_height, "transaction expired");
                return Err(Error::Expired { signature });
            }

            polls += 1;
            let every = self.confirmation.rebroadcast_every_polls;
            if every > 0 && polls % every == 0 {
                self.rebroadcast(pending).await;
            }

            if Instant::now() + poll_interval > deadline {
                warn!(%signature, polls, "gave up waiting for confirmation");
                return Err(Error::ConfirmationTimeout { signature });
            }
            debug!(%signature, polls, "pending");
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Build and sign a transaction the ledger has not already executed
    ///
    /// The same instructions under the same blockhash sign to the same
    /// bytes, so a repeated operation would otherwise resolve to the earlier
    /// one's outcome. While the signature is already known, wait one poll
    /// interval and rebuild with a newer blockhash; after the retry budget
    /// this is `DuplicateTransaction`.
    pub async fn prepare(
        &self,
        instructions: &[Instruction],
        signers: &[&dyn TransactionSigner],
    ) -> Result<PendingTransaction> {
        let fee_payer = signers
            .first()
            .map(|s| s.pubkey())
            .ok_or_else(|| Error::InvalidArgument("at least one signer (the fee payer) is required".into()))?;
        let poll_interval = Duration::from_millis(self.confirmation.poll_interval_ms);
        let attempts = self.retry.config().max_retries + 1;

        let mut attempt = 0;
        loop {
            let unsigned = self.build(instructions, &fee_payer).await?;
            let pending = self.sign(&unsigned, signers)?;
            let signature = pending.signature();
            match self.poll_status(&signature).await? {
                None | Some(SignatureStatus::Pending) => return Ok(pending),
                Some(_) => {}
            }

            attempt += 1;
            if attempt >= attempts {
                warn!(%signature, attempts, "no newer blockhash for a repeated operation");
                return Err(Error::DuplicateTransaction { signature });
            }
            debug!(%signature, attempt, "identical transaction already executed; waiting for a newer blockhash");
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Prepare, submit and confirm; `signers` lists the fee payer first
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        signers: &[&dyn TransactionSigner],
    ) -> Result<Signature> {
        let mut pending = self.prepare(instructions, signers).await?;
        self.submit(&mut pending).await?;
        self.confirm(&mut pending).await
    }

    /// One status read; transport failures count as "nothing learned"
    async fn poll_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        match self.rpc.get_signature_status(signature).await {
            Ok(status) => Ok(Some(status)),
            Err(e) if e.is_retryable() => {
                debug!(%signature, error = %e, "status poll failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn window_elapsed(&self, pending: &PendingTransaction) -> Result<bool> {
        match self.rpc.get_block_height().await {
            Ok(height) => Ok(pending.token.is_expired_at(height)),
            Err(e) if e.is_retryable() => {
                debug!(error = %e, "block height poll failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn rebroadcast(&self, pending: &PendingTransaction) {
        match self.rpc.send_transaction(&pending.transaction).await {
            Ok(_) => {
                debug!(signature = %pending.signature(), "rebroadcast");
                if let Some(metrics) = &self.metrics {
                    metrics.rebroadcasts.inc();
                }
            }
            Err(e) => debug!(signature = %pending.signature(), error = %e, "rebroadcast failed"),
        }
    }

    fn settle(&self, pending: &mut PendingTransaction, status: SignatureStatus) -> Result<Signature> {
        let signature = pending.signature();
        match status {
            SignatureStatus::Confirmed => {
                pending.advance(TxState::Confirmed)?;
                self.record(pending);
                info!(%signature, "transaction confirmed");
                Ok(signature)
            }
            SignatureStatus::Failed(code) => {
                pending.advance(TxState::Failed(code))?;
                self.record(pending);
                warn!(%signature, %code, "transaction rejected by program");
                Err(Error::ProgramRejected(code))
            }
            SignatureStatus::Pending => Err(Error::InvalidArgument(format!(
                "transaction {} is still pending",
                signature
            ))),
        }
    }

    fn record(&self, pending: &PendingTransaction) {
        if let Some(metrics) = &self.metrics {
            let latency = pending
                .submitted_at
                .map(|at| at.elapsed().as_secs_f64())
                .unwrap_or_default();
            metrics.record_outcome(&pending.state, latency);
        }
    }
}
