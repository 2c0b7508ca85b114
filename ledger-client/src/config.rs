//! Configuration for the client

use crate::retry::RetryConfig;
use crate::types::Pubkey;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Voting program as deployed to local and public test clusters
///
/// The default identities assume programs that follow this crate's seed
/// scheme and record layout (namespaced, length-prefixed seeds). Point the
/// configuration at such a deployment, or derived addresses will not match.
pub const DEFAULT_VOTING_PROGRAM: &str = "JAVuBXeBZqXNtS73azhBDAoYaaAFfo4gWXoZe2e7Jf8H";

/// Journal and counter program on a local validator
pub const LOCALNET_BOOTCAMP_PROGRAM: &str = "EJhsvpPeCpUChwyDEcKyJCLorDb89q1cfY4HPwutzF6";

/// Journal and counter program on devnet and testnet
pub const DEVNET_BOOTCAMP_PROGRAM: &str = "6z68wfurCMYkZG51s1Et9BJEd9nJGUusjHXNt4dGbNNF";

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target cluster
    pub cluster: Cluster,

    /// RPC endpoint
    pub rpc: RpcConfig,

    /// Program identity overrides
    pub programs: ProgramsConfig,

    /// Submission retry policy
    pub retry: RetryConfig,

    /// Confirmation polling
    pub confirmation: ConfirmationConfig,
}

/// Ledger cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    /// Local validator
    #[default]
    Localnet,
    /// Public development cluster
    Devnet,
    /// Public test cluster
    Testnet,
    /// Production cluster
    Mainnet,
}

impl Cluster {
    /// Public RPC endpoint for the cluster
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Cluster::Localnet => "http://127.0.0.1:8899",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Mainnet => "https://api.mainnet-beta.solana.com",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cluster::Localnet => "localnet",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Mainnet => "mainnet",
        };
        f.write_str(name)
    }
}

impl FromStr for Cluster {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            other => Err(Error::Config(format!("unknown cluster '{}'", other))),
        }
    }
}

/// RPC endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Endpoint URL; the cluster's public endpoint when unset
    pub url: Option<String>,

    /// Per-request timeout (milliseconds)
    pub request_timeout_ms: u64,

    /// Commitment level for reads and status checks
    pub commitment: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: None,
            request_timeout_ms: 30_000,
            commitment: "confirmed".to_string(),
        }
    }
}

/// Explicit program identities; unset entries fall back to cluster defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramsConfig {
    /// Voting program
    pub voting: Option<Pubkey>,

    /// Journal program
    pub journal: Option<Pubkey>,

    /// Counter program
    pub counter: Option<Pubkey>,
}

/// Resolved program identities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    /// Voting program
    pub voting: Pubkey,
    /// Journal program
    pub journal: Pubkey,
    /// Counter program
    pub counter: Pubkey,
}

/// Confirmation polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Interval between status polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Give up waiting after this long (milliseconds)
    pub timeout_ms: u64,

    /// Resend the signed bytes every N polls while pending; 0 disables
    pub rebroadcast_every_polls: u32,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_ms: 90_000,
            rebroadcast_every_polls: 4,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `LEDGER_CLIENT_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(cluster) = var("LEDGER_CLIENT_CLUSTER") {
            self.cluster = cluster.parse()?;
        }

        if let Some(url) = var("LEDGER_CLIENT_RPC_URL") {
            self.rpc.url = Some(url);
        }

        let program = |name: &str| -> Result<Option<Pubkey>> {
            var(name)
                .map(|value| {
                    value
                        .parse()
                        .map_err(|e| Error::Config(format!("{}: {}", name, e)))
                })
                .transpose()
        };
        if let Some(id) = program("LEDGER_CLIENT_VOTING_PROGRAM")? {
            self.programs.voting = Some(id);
        }
        if let Some(id) = program("LEDGER_CLIENT_JOURNAL_PROGRAM")? {
            self.programs.journal = Some(id);
        }
        if let Some(id) = program("LEDGER_CLIENT_COUNTER_PROGRAM")? {
            self.programs.counter = Some(id);
        }

        Ok(())
    }

    /// RPC endpoint in effect
    pub fn rpc_url(&self) -> &str {
        self.rpc
            .url
            .as_deref()
            .unwrap_or_else(|| self.cluster.default_rpc_url())
    }

    /// Program identities for the configured cluster
    ///
    /// Mainnet has no built-in identities; every program must be configured.
    pub fn program_ids(&self) -> Result<ProgramIds> {
        let defaults = match self.cluster {
            Cluster::Localnet => Some((DEFAULT_VOTING_PROGRAM, LOCALNET_BOOTCAMP_PROGRAM)),
            Cluster::Devnet | Cluster::Testnet => {
                Some((DEFAULT_VOTING_PROGRAM, DEVNET_BOOTCAMP_PROGRAM))
            }
            Cluster::Mainnet => None,
        };

        let resolve = |explicit: Option<Pubkey>, fallback: Option<&str>, name: &str| {
            match (explicit, fallback) {
                (Some(id), _) => Ok(id),
                (None, Some(literal)) => literal.parse(),
                (None, None) => Err(Error::Config(format!(
                    "no {} program configured for {}",
                    name, self.cluster
                ))),
            }
        };

        Ok(ProgramIds {
            voting: resolve(self.programs.voting, defaults.map(|d| d.0), "voting")?,
            journal: resolve(self.programs.journal, defaults.map(|d| d.1), "journal")?,
            counter: resolve(self.programs.counter, defaults.map(|d| d.1), "counter")?,
        })
    }
}
