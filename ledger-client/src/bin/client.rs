//! Ledger client command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_client::actions::{vote_metadata, VoteAction};
use ledger_client::address::{candidate_address, journal_entry_address, poll_address};
use ledger_client::instruction::{counter, journal, voting};
use ledger_client::{
    AccountReader, Config, HttpRpc, Instruction, KeyPair, Metrics, Pubkey, SubmissionPipeline,
    TransactionSigner,
};
use std::path::PathBuf;
use tokio_stream::StreamExt;

#[derive(Parser, Debug)]
#[command(
    name = "ledger-client",
    version,
    about = "Derive addresses, read records and submit operations to the voting, journal and counter programs"
)]
struct Cli {
    /// TOML configuration file; LEDGER_CLIENT_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RPC endpoint, overriding configuration
    #[arg(long, global = true)]
    url: Option<String>,

    /// Keypair file (JSON array of 64 bytes) used as signer and fee payer
    #[arg(long, global = true)]
    keypair: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the derived address of an entity
    Address {
        #[command(subcommand)]
        entity: Entity,
    },

    /// Fetch and decode the record at an address
    Fetch {
        /// Account address
        address: Pubkey,
    },

    /// List every record owned by a program
    Scan {
        /// voting, journal or counter
        program: String,
    },

    /// Print the vote action metadata as JSON
    VoteAction,

    #[command(flatten)]
    Submit(SubmitCommand),
}

/// Commands that sign and submit a transaction
#[derive(Subcommand, Debug)]
enum SubmitCommand {
    /// Create a poll
    InitPoll {
        #[arg(long)]
        poll_id: u64,
        #[arg(long)]
        description: String,
        #[arg(long)]
        start: i64,
        #[arg(long)]
        end: i64,
    },

    /// Register a candidate
    AddCandidate {
        #[arg(long)]
        poll_id: u64,
        #[arg(long)]
        name: String,
    },

    /// Vote for a candidate
    Vote {
        #[arg(long)]
        poll_id: u64,
        #[arg(long)]
        name: String,
    },

    /// Journal operations
    Journal {
        #[command(subcommand)]
        op: JournalOp,
    },

    /// Counter operations
    Counter {
        #[command(subcommand)]
        op: CounterOp,
    },
}

#[derive(Subcommand, Debug)]
enum Entity {
    /// Poll address
    Poll {
        #[arg(long)]
        poll_id: u64,
    },
    /// Candidate address
    Candidate {
        #[arg(long)]
        poll_id: u64,
        #[arg(long)]
        name: String,
    },
    /// Journal entry address
    Journal {
        #[arg(long)]
        title: String,
        #[arg(long)]
        owner: Pubkey,
    },
}

#[derive(Subcommand, Debug)]
enum JournalOp {
    /// Create an entry
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
    },
    /// Replace an entry's message
    Update {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
    },
    /// Delete an entry
    Delete {
        #[arg(long)]
        title: String,
    },
}

#[derive(Subcommand, Debug)]
enum CounterOp {
    /// Create a counter at a fresh address
    Init,
    /// Add one
    Increment {
        #[arg(long)]
        counter: Pubkey,
    },
    /// Subtract one
    Decrement {
        #[arg(long)]
        counter: Pubkey,
    },
    /// Overwrite the value
    Set {
        #[arg(long)]
        counter: Pubkey,
        #[arg(long)]
        value: u8,
    },
    /// Close the counter
    Close {
        #[arg(long)]
        counter: Pubkey,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;
    if let Some(url) = &cli.url {
        config.rpc.url = Some(url.clone());
    }
    Ok(config)
}

fn load_keypair(cli: &Cli) -> Result<KeyPair> {
    let path = match &cli.keypair {
        Some(path) => path.clone(),
        None => {
            let home = std::env::var("HOME").context("HOME is not set; pass --keypair")?;
            PathBuf::from(home).join(".config/solana/id.json")
        }
    };
    KeyPair::from_json_file(&path).with_context(|| format!("loading keypair {}", path.display()))
}

async fn submit(
    pipeline: &SubmissionPipeline<HttpRpc>,
    instructions: Vec<Instruction>,
    signers: &[&dyn TransactionSigner],
) -> Result<()> {
    let signature = pipeline.send_and_confirm(&instructions, signers).await?;
    println!("{}", signature);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let programs = config.program_ids()?;
    let rpc = HttpRpc::new(config.rpc_url(), &config.rpc)?;
    tracing::debug!(url = rpc.url(), cluster = %config.cluster, "configured");

    match &cli.command {
        Commands::Address { entity } => {
            let (address, bump) = match entity {
                Entity::Poll { poll_id } => poll_address(&programs.voting, *poll_id)?,
                Entity::Candidate { poll_id, name } => {
                    candidate_address(&programs.voting, *poll_id, name)?
                }
                Entity::Journal { title, owner } => {
                    journal_entry_address(&programs.journal, title, owner)?
                }
            };
            println!("{} (bump {})", address, bump);
        }

        Commands::Fetch { address } => {
            let record = AccountReader::new(rpc).fetch_any(address).await?;
            println!("{:#?}", record);
        }

        Commands::Scan { program } => {
            let program_id = match program.as_str() {
                "voting" => programs.voting,
                "journal" => programs.journal,
                "counter" => programs.counter,
                other => anyhow::bail!("unknown program '{}'", other),
            };
            let reader = AccountReader::new(rpc);
            let mut records = Box::pin(reader.scan_program(&program_id).await?);
            while let Some((address, record)) = records.next().await {
                println!("{} {:?}", address, record);
            }
        }

        Commands::VoteAction => {
            let metadata = vote_metadata(&VoteAction::peanut_butter(programs.voting));
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }

        Commands::Submit(command) => {
            let payer = load_keypair(&cli)?;
            let signer = payer.public_key();
            let metrics = Metrics::new()?;
            let pipeline = SubmissionPipeline::new(rpc, config.retry.clone(), config.confirmation.clone())
                .with_metrics(metrics);

            match command {
                SubmitCommand::InitPoll {
                    poll_id,
                    description,
                    start,
                    end,
                } => {
                    let ix = voting::initialize_poll(&programs.voting, &signer, *poll_id, description, *start, *end)?;
                    submit(&pipeline, vec![ix], &[&payer]).await?;
                }
                SubmitCommand::AddCandidate { poll_id, name } => {
                    let ix = voting::initialize_candidate(&programs.voting, &signer, *poll_id, name)?;
                    submit(&pipeline, vec![ix], &[&payer]).await?;
                }
                SubmitCommand::Vote { poll_id, name } => {
                    let ix = voting::vote(&programs.voting, &signer, *poll_id, name)?;
                    submit(&pipeline, vec![ix], &[&payer]).await?;
                }
                SubmitCommand::Journal { op } => {
                    let ix = match op {
                        JournalOp::Create { title, message } => {
                            journal::create_journal_entry(&programs.journal, &signer, title, message)?
                        }
                        JournalOp::Update { title, message } => {
                            journal::update_journal_entry(&programs.journal, &signer, title, message)?
                        }
                        JournalOp::Delete { title } => {
                            journal::delete_journal_entry(&programs.journal, &signer, title)?
                        }
                    };
                    submit(&pipeline, vec![ix], &[&payer]).await?;
                }
                SubmitCommand::Counter { op } => match op {
                    CounterOp::Init => {
                        let account = KeyPair::generate();
                        let ix = counter::initialize(&programs.counter, &signer, &account.public_key())?;
                        println!("counter {}", account.public_key());
                        submit(&pipeline, vec![ix], &[&payer, &account]).await?;
                    }
                    CounterOp::Increment { counter: address } => {
                        let ix = counter::increment(&programs.counter, address)?;
                        submit(&pipeline, vec![ix], &[&payer]).await?;
                    }
                    CounterOp::Decrement { counter: address } => {
                        let ix = counter::decrement(&programs.counter, address)?;
                        submit(&pipeline, vec![ix], &[&payer]).await?;
                    }
                    CounterOp::Set {
                        counter: address,
                        value,
                    } => {
                        let ix = counter::set(&programs.counter, address, *value)?;
                        submit(&pipeline, vec![ix], &[&payer]).await?;
                    }
                    CounterOp::Close { counter: address } => {
                        let ix = counter::close(&programs.counter, &signer, address)?;
                        submit(&pipeline, vec![ix], &[&payer]).await?;
                    }
                },
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_submitting_commands_parse_at_top_level() {
        let cli = Cli::try_parse_from(["ledger-client", "vote", "--poll-id", "1", "--name", "Crunchy"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Submit(SubmitCommand::Vote { poll_id: 1, ref name }) if name == "Crunchy"
        ));

        let cli = Cli::try_parse_from(["ledger-client", "vote-action"]).unwrap();
        assert!(matches!(cli.command, Commands::VoteAction));
    }
}
