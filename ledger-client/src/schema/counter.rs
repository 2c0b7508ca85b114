//! Counter record

use super::AccountSchema;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Single-byte counter living at a caller-generated keypair address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    /// Current value
    pub count: u8,
}

impl AccountSchema for Counter {
    const NAME: &'static str = "Counter";
    const MIN_BODY_LEN: usize = 1;

    fn check_bounds(&self) -> Result<()> {
        Ok(())
    }
}
