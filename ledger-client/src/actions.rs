//! Vote action
//!
//! A shareable "action" lets a wallet vote without running this client: the
//! wallet fetches [`vote_metadata`], the user picks a candidate, and the
//! wallet receives an unsigned transaction from [`build_vote_transaction`]
//! to sign and send itself.

use crate::instruction::voting;
use crate::rpc::LedgerRpc;
use crate::transaction::assemble;
use crate::types::Pubkey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// What to vote on and how to present it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteAction {
    /// Voting program
    pub program_id: Pubkey,
    /// Poll the action votes in
    pub poll_id: u64,
    /// Heading
    pub title: String,
    /// Longer text
    pub description: String,
    /// Image URL
    pub icon: String,
    /// Path the links point at
    pub path: String,
    /// Candidates offered; anything else is refused
    pub candidates: Vec<String>,
}

impl VoteAction {
    /// The peanut butter poll
    pub fn peanut_butter(program_id: Pubkey) -> Self {
        Self {
            program_id,
            poll_id: 1,
            title: "Vote for your favorite peanut butter".to_string(),
            description: "Vote between crunchy and smooth peanut butter".to_string(),
            icon: "https://cookieandkate.com/images/2025/01/peanut-butter-recipe.jpg".to_string(),
            path: "/api/vote".to_string(),
            candidates: vec!["Crunchy".to_string(), "Smooth".to_string()],
        }
    }
}

/// Action description served to wallets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Image URL
    pub icon: String,
    /// Heading
    pub title: String,
    /// Longer text
    pub description: String,
    /// Button label
    pub label: String,
    /// One link per candidate
    pub links: ActionLinks,
}

/// Link group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLinks {
    /// Links
    pub actions: Vec<ActionLink>,
}

/// One selectable choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    /// Target, carrying the candidate as a query parameter
    pub href: String,
    /// Button label
    pub label: String,
    /// Always `transaction`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body a wallet posts when the user picks a choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPostRequest {
    /// Voter identity, base58
    pub account: String,
}

/// Reply carrying the transaction for the wallet to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPostResponse {
    /// Unsigned transaction, base64 wire bytes with zeroed signature slots
    pub transaction: String,
    /// Always `transaction`
    #[serde(rename = "type")]
    pub kind: String,
}

/// Metadata listing one link per allowed candidate
pub fn vote_metadata(action: &VoteAction) -> ActionMetadata {
    let actions = action
        .candidates
        .iter()
        .map(|candidate| ActionLink {
            href: format!("{}?candidate={}", action.path, candidate),
            label: candidate.clone(),
            kind: "transaction".to_string(),
        })
        .collect();

    ActionMetadata {
        icon: action.icon.clone(),
        title: action.title.clone(),
        description: action.description.clone(),
        label: "Vote".to_string(),
        links: ActionLinks { actions },
    }
}

/// Unsigned vote for `candidate` with `request.account` as signer and fee payer
///
/// The candidate must be one the action offers and the account a valid
/// identity; both are checked before the ledger is contacted.
pub async fn build_vote_transaction<R: LedgerRpc>(
    rpc: &R,
    action: &VoteAction,
    request: &ActionPostRequest,
    candidate: &str,
) -> Result<ActionPostResponse> {
    if !action.candidates.iter().any(|c| c == candidate) {
        return Err(Error::InvalidArgument(format!("Invalid candidate '{}'", candidate)));
    }
    let voter: Pubkey = request
        .account
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("Invalid account '{}'", request.account)))?;

    let ix = voting::vote(&action.program_id, &voter, action.poll_id, candidate)?;
    let token = rpc.get_latest_blockhash().await?;
    let height = rpc.get_block_height().await?;
    let unsigned = assemble(&[ix], &voter, Some(token), height)?;

    info!(%voter, candidate, poll_id = action.poll_id, "built vote action transaction");
    Ok(ActionPostResponse {
        transaction: unsigned.to_base64(),
        kind: "transaction".to_string(),
    })
}
