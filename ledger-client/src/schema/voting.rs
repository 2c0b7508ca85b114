//! Poll and candidate records

use super::{check_len, AccountSchema, LEN_PREFIX};
use crate::address::MAX_PREFIXED_SEED_STR;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Maximum poll description length (UTF-8 bytes)
pub const MAX_DESCRIPTION_LEN: usize = 280;

/// Maximum candidate name length; the name is also an address seed
pub const MAX_CANDIDATE_NAME_LEN: usize = MAX_PREFIXED_SEED_STR;

/// A poll, addressed by `poll_id`
///
/// `candidate_amount` only grows, once per successful candidate initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Poll identifier
    pub poll_id: u64,
    /// Opening time (unix seconds)
    pub poll_start: i64,
    /// Closing time (unix seconds)
    pub poll_end: i64,
    /// Number of candidates registered
    pub candidate_amount: u64,
    /// Question text
    pub description: String,
}

impl Poll {
    /// Whether `now` (unix seconds) falls inside the voting window
    pub fn is_open_at(&self, now: i64) -> bool {
        self.poll_start <= now && now <= self.poll_end
    }
}

impl AccountSchema for Poll {
    const NAME: &'static str = "Poll";
    const MIN_BODY_LEN: usize = 8 * 4 + LEN_PREFIX;

    fn check_bounds(&self) -> Result<()> {
        check_len("description", &self.description, MAX_DESCRIPTION_LEN)
    }
}

/// A candidate in a poll, addressed by `(poll_id, candidate_name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Owning poll
    pub poll_id: u64,
    /// Votes received
    pub candidate_votes: u64,
    /// Name, unique within the poll
    pub candidate_name: String,
}

impl AccountSchema for Candidate {
    const NAME: &'static str = "Candidate";
    const MIN_BODY_LEN: usize = 8 * 2 + LEN_PREFIX;

    fn check_bounds(&self) -> Result<()> {
        check_len("candidate_name", &self.candidate_name, MAX_CANDIDATE_NAME_LEN)
    }
}
