//! End-to-end program flows against the simulated ledger
//!
//! Each test drives the same builders, pipeline and reader a real client
//! uses, with `MockLedger` standing in for the network.

use ledger_client::address::{candidate_address, journal_entry_address, poll_address};
use ledger_client::config::ConfirmationConfig;
use ledger_client::instruction::{counter, journal, voting};
use ledger_client::retry::RetryConfig;
use ledger_client::{
    AccountReader, Candidate, Counter, Error, Instruction, JournalEntry, KeyPair, MockLedger,
    Poll, ProgramIds, Pubkey, RejectionCode, Result, Signature, SubmissionPipeline,
    TransactionSigner,
};
use tokio_stream::StreamExt;

const POLL_ID: u64 = 1;
const POLL_END: i64 = 1854222157;
const DESCRIPTION: &str = "What is your favourite pinut butter?";

struct Harness {
    ledger: MockLedger,
    pipeline: SubmissionPipeline<MockLedger>,
    reader: AccountReader<MockLedger>,
    payer: KeyPair,
}

impl Harness {
    fn new() -> Self {
        let bootcamp = Pubkey::new_from_array([2; 32]);
        let ledger = MockLedger::new(ProgramIds {
            voting: Pubkey::new_from_array([1; 32]),
            journal: bootcamp,
            counter: bootcamp,
        });
        Self {
            pipeline: SubmissionPipeline::new(
                ledger.clone(),
                RetryConfig::default(),
                ConfirmationConfig::default(),
            ),
            reader: AccountReader::new(ledger.clone()),
            ledger,
            payer: KeyPair::from_seed(&[7; 32]),
        }
    }

    fn programs(&self) -> ProgramIds {
        *self.ledger.programs()
    }

    fn signer(&self) -> Pubkey {
        self.payer.public_key()
    }

    /// Send under the harness payer
    async fn run(&self, ix: Instruction) -> Result<Signature> {
        self.run_with(ix, &[&self.payer]).await
    }

    async fn run_with(&self, ix: Instruction, signers: &[&dyn TransactionSigner]) -> Result<Signature> {
        self.pipeline.send_and_confirm(&[ix], signers).await
    }

    async fn create_poll(&self) {
        let ix = voting::initialize_poll(&self.programs().voting, &self.signer(), POLL_ID, DESCRIPTION, 0, POLL_END)
            .unwrap();
        self.run(ix).await.unwrap();
    }

    async fn add_candidate(&self, name: &str) -> Result<Signature> {
        let ix = voting::initialize_candidate(&self.programs().voting, &self.signer(), POLL_ID, name).unwrap();
        self.run(ix).await
    }

    async fn vote(&self, name: &str) -> Result<Signature> {
        let ix = voting::vote(&self.programs().voting, &self.signer(), POLL_ID, name).unwrap();
        self.run(ix).await
    }

    async fn poll(&self) -> Poll {
        let (address, _) = poll_address(&self.programs().voting, POLL_ID).unwrap();
        self.reader.fetch_one(&address).await.unwrap()
    }

    async fn votes(&self, name: &str) -> u64 {
        let (address, _) = candidate_address(&self.programs().voting, POLL_ID, name).unwrap();
        let candidate: Candidate = self.reader.fetch_one(&address).await.unwrap();
        candidate.candidate_votes
    }
}

#[tokio::test]
async fn test_initialize_poll() {
    let h = Harness::new();
    h.create_poll().await;

    let poll = h.poll().await;
    assert_eq!(poll.poll_id, POLL_ID);
    assert_eq!(poll.description, DESCRIPTION);
    assert_eq!(poll.poll_start, 0);
    assert_eq!(poll.poll_end, POLL_END);
    assert_eq!(poll.candidate_amount, 0);
}

#[tokio::test]
async fn test_initialize_candidates() {
    let h = Harness::new();
    h.create_poll().await;
    h.add_candidate("Crunchy").await.unwrap();
    h.add_candidate("Smooth").await.unwrap();

    assert_eq!(h.poll().await.candidate_amount, 2);
    assert_eq!(h.votes("Crunchy").await, 0);
    assert_eq!(h.votes("Smooth").await, 0);

    let candidates: Vec<(Pubkey, Candidate)> = h
        .reader
        .scan_all::<Candidate>(&h.programs().voting)
        .await
        .unwrap()
        .collect()
        .await;
    let mut names: Vec<_> = candidates.iter().map(|(_, c)| c.candidate_name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["Crunchy".to_string(), "Smooth".to_string()]);
}

#[tokio::test]
async fn test_vote() {
    let h = Harness::new();
    h.create_poll().await;
    h.add_candidate("Crunchy").await.unwrap();
    h.add_candidate("Smooth").await.unwrap();

    h.vote("Crunchy").await.unwrap();
    assert_eq!(h.votes("Crunchy").await, 1);
    assert_eq!(h.votes("Smooth").await, 0);

    h.vote("Crunchy").await.unwrap();
    assert_eq!(h.votes("Crunchy").await, 2);
}

#[tokio::test]
async fn test_back_to_back_votes_each_count() {
    let h = Harness::new();
    h.create_poll().await;
    h.add_candidate("Crunchy").await.unwrap();

    let first = h.vote("Crunchy").await.unwrap();
    let second = h.vote("Crunchy").await.unwrap();
    assert_ne!(first, second);
    assert_eq!(h.votes("Crunchy").await, 2);
}

#[tokio::test]
async fn test_duplicate_candidate_rejected() {
    let h = Harness::new();
    h.create_poll().await;
    h.add_candidate("Crunchy").await.unwrap();

    let result = h.add_candidate("Crunchy").await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::AccountAlreadyInUse))
    ));
    assert_eq!(h.poll().await.candidate_amount, 1);
}

#[tokio::test]
async fn test_vote_outside_window_rejected() {
    let h = Harness::new();
    h.create_poll().await;
    h.add_candidate("Smooth").await.unwrap();

    h.ledger.set_unix_time(POLL_END + 1);
    let result = h.vote("Smooth").await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::VotingNotOpen))
    ));
    assert_eq!(h.votes("Smooth").await, 0);
}

#[tokio::test]
async fn test_vote_for_unknown_candidate_rejected() {
    let h = Harness::new();
    h.create_poll().await;

    let result = h.vote("Chunky").await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::AccountNotInitialized))
    ));
}

#[tokio::test]
async fn test_invalid_poll_window_never_sent() {
    let h = Harness::new();
    let result = voting::initialize_poll(&h.programs().voting, &h.signer(), POLL_ID, DESCRIPTION, 10, 10);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(h.ledger.send_count(), 0);
}

#[tokio::test]
async fn test_journal_lifecycle() {
    let h = Harness::new();
    let program = h.programs().journal;
    let owner = h.signer();
    let (address, _) = journal_entry_address(&program, "Monday", &owner).unwrap();

    h.run(journal::create_journal_entry(&program, &owner, "Monday", "first").unwrap())
        .await
        .unwrap();
    let entry: JournalEntry = h.reader.fetch_one(&address).await.unwrap();
    assert_eq!(
        entry,
        JournalEntry {
            owner,
            title: "Monday".to_string(),
            message: "first".to_string(),
        }
    );

    h.run(journal::update_journal_entry(&program, &owner, "Monday", "second").unwrap())
        .await
        .unwrap();
    let entry: JournalEntry = h.reader.fetch_one(&address).await.unwrap();
    assert_eq!(entry.title, "Monday");
    assert_eq!(entry.owner, owner);
    assert_eq!(entry.message, "second");

    h.run(journal::delete_journal_entry(&program, &owner, "Monday").unwrap())
        .await
        .unwrap();
    let result = h.reader.fetch_one::<JournalEntry>(&address).await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    // the title is free again
    h.run(journal::create_journal_entry(&program, &owner, "Monday", "again").unwrap())
        .await
        .unwrap();
    assert!(h.reader.exists(&address).await.unwrap());
}

#[tokio::test]
async fn test_journal_create_twice_rejected() {
    let h = Harness::new();
    let program = h.programs().journal;
    let owner = h.signer();

    h.run(journal::create_journal_entry(&program, &owner, "Monday", "first").unwrap())
        .await
        .unwrap();
    let result = h
        .run(journal::create_journal_entry(&program, &owner, "Monday", "other").unwrap())
        .await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::AccountAlreadyInUse))
    ));
}

#[tokio::test]
async fn test_journal_update_by_other_identity_rejected() {
    let h = Harness::new();
    let program = h.programs().journal;
    let owner = h.signer();
    let (address, _) = journal_entry_address(&program, "Monday", &owner).unwrap();
    h.run(journal::create_journal_entry(&program, &owner, "Monday", "mine").unwrap())
        .await
        .unwrap();

    let intruder = KeyPair::from_seed(&[9; 32]);
    let ix = journal::update_journal_entry_at(&program, &intruder.public_key(), address, "Monday", "theirs")
        .unwrap();
    let result = h.run_with(ix, &[&intruder]).await;
    assert!(matches!(result, Err(Error::ProgramRejected(_))));

    let entry: JournalEntry = h.reader.fetch_one(&address).await.unwrap();
    assert_eq!(entry.message, "mine");
}

#[tokio::test]
async fn test_counter_lifecycle() {
    let h = Harness::new();
    let program = h.programs().counter;
    let account = KeyPair::from_seed(&[3; 32]);
    let address = account.public_key();

    h.run_with(counter::initialize(&program, &h.signer(), &address).unwrap(), &[&h.payer, &account])
        .await
        .unwrap();
    let fetched: Counter = h.reader.fetch_one(&address).await.unwrap();
    assert_eq!(fetched.count, 0);

    h.run(counter::increment(&program, &address).unwrap()).await.unwrap();
    assert_eq!(h.reader.fetch_one::<Counter>(&address).await.unwrap().count, 1);

    h.run(counter::decrement(&program, &address).unwrap()).await.unwrap();
    assert_eq!(h.reader.fetch_one::<Counter>(&address).await.unwrap().count, 0);

    h.run(counter::set(&program, &address, 42).unwrap()).await.unwrap();
    assert_eq!(h.reader.fetch_one::<Counter>(&address).await.unwrap().count, 42);

    h.run(counter::close(&program, &h.signer(), &address).unwrap()).await.unwrap();
    let result = h.reader.fetch_one::<Counter>(&address).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_counter_range_enforced() {
    let h = Harness::new();
    let program = h.programs().counter;
    let account = KeyPair::from_seed(&[4; 32]);
    let address = account.public_key();
    h.run_with(counter::initialize(&program, &h.signer(), &address).unwrap(), &[&h.payer, &account])
        .await
        .unwrap();

    let result = h.run(counter::decrement(&program, &address).unwrap()).await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::CounterUnderflow))
    ));

    h.run(counter::set(&program, &address, u8::MAX).unwrap()).await.unwrap();
    let result = h.run(counter::increment(&program, &address).unwrap()).await;
    assert!(matches!(
        result,
        Err(Error::ProgramRejected(RejectionCode::CounterOverflow))
    ));
    assert_eq!(h.reader.fetch_one::<Counter>(&address).await.unwrap().count, u8::MAX);
}

#[tokio::test]
async fn test_counter_initialize_requires_account_signature() {
    let h = Harness::new();
    let account = KeyPair::from_seed(&[5; 32]);
    let ix = counter::initialize(&h.programs().counter, &h.signer(), &account.public_key()).unwrap();

    let result = h.run(ix).await;
    assert!(matches!(result, Err(Error::MissingSignature(_))));
    assert_eq!(h.ledger.send_count(), 0);
}
