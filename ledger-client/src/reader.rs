//! Account reader and program account scanner

use crate::rpc::{AccountFilter, LedgerRpc};
use crate::schema::{AccountSchema, ProgramAccount};
use crate::types::Pubkey;
use crate::{Error, Result};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

/// Reads and decodes ledger-resident records
///
/// Every value returned is a snapshot as of the read; it is stale as soon as
/// a mutation lands.
#[derive(Debug, Clone)]
pub struct AccountReader<R> {
    rpc: R,
}

impl<R: LedgerRpc> AccountReader<R> {
    /// Create a reader over `rpc`
    pub fn new(rpc: R) -> Self {
        Self { rpc }
    }

    /// Underlying RPC
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Fetch and decode the record at `address` as `T`
    ///
    /// `NotFound` if nothing lives there; `CorruptAccount` if the bytes are
    /// not a well-formed `T`.
    pub async fn fetch_one<T: AccountSchema>(&self, address: &Pubkey) -> Result<T> {
        let info = self
            .rpc
            .get_account_info(address)
            .await?
            .ok_or(Error::NotFound(*address))?;

        T::decode(&info.data).map_err(|e| Error::CorruptAccount {
            address: *address,
            reason: e.to_string(),
        })
    }

    /// Fetch the record at `address`, whichever schema it is
    pub async fn fetch_any(&self, address: &Pubkey) -> Result<ProgramAccount> {
        let info = self
            .rpc
            .get_account_info(address)
            .await?
            .ok_or(Error::NotFound(*address))?;

        ProgramAccount::decode(&info.data).map_err(|e| Error::CorruptAccount {
            address: *address,
            reason: e.to_string(),
        })
    }

    /// Whether any account lives at `address`
    pub async fn exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self.rpc.get_account_info(address).await?.is_some())
    }

    /// Every `T` owned by `program_id`
    ///
    /// The scan is one-shot: the account set is read once, then decoded
    /// lazily as the stream is consumed. Records of another schema are
    /// skipped silently; malformed records of this schema are logged and
    /// skipped.
    pub async fn scan_all<T>(&self, program_id: &Pubkey) -> Result<impl Stream<Item = (Pubkey, T)> + Send>
    where
        T: AccountSchema + Send + 'static,
    {
        let accounts = self
            .rpc
            .get_program_accounts(program_id, &[AccountFilter::discriminator(&T::discriminator())])
            .await?;
        debug!(program = %program_id, schema = T::NAME, candidates = accounts.len(), "scan");

        Ok(tokio_stream::iter(accounts).filter_map(|(address, info)| {
            match T::decode(&info.data) {
                Ok(record) => Some((address, record)),
                Err(Error::SchemaMismatch { .. }) => None,
                Err(e) => {
                    warn!(%address, schema = T::NAME, error = %e, "skipping malformed record");
                    None
                }
            }
        }))
    }

    /// Every recognizable record owned by `program_id`, dispatched by tag
    pub async fn scan_program(
        &self,
        program_id: &Pubkey,
    ) -> Result<impl Stream<Item = (Pubkey, ProgramAccount)> + Send> {
        let accounts = self.rpc.get_program_accounts(program_id, &[]).await?;
        debug!(program = %program_id, candidates = accounts.len(), "scan all schemas");

        Ok(tokio_stream::iter(accounts).filter_map(|(address, info)| {
            match ProgramAccount::decode(&info.data) {
                Ok(record) => Some((address, record)),
                Err(Error::SchemaMismatch { .. }) => None,
                Err(e) => {
                    warn!(%address, error = %e, "skipping malformed record");
                    None
                }
            }
        }))
    }
}
