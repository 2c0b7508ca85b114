//! Reading records that other writers placed on the ledger

use ledger_client::schema::{AccountSchema, DISCRIMINATOR_LEN};
use ledger_client::{
    AccountInfo, AccountReader, Candidate, Error, MockLedger, Poll, ProgramAccount, ProgramIds,
    Pubkey,
};
use tokio_stream::StreamExt;

fn voting() -> Pubkey {
    Pubkey::new_from_array([1; 32])
}

fn seeded_ledger() -> MockLedger {
    let ledger = MockLedger::new(ProgramIds {
        voting: voting(),
        journal: Pubkey::new_from_array([2; 32]),
        counter: Pubkey::new_from_array([2; 32]),
    });

    let poll = Poll {
        poll_id: 1,
        poll_start: 0,
        poll_end: 1854222157,
        candidate_amount: 1,
        description: "What is your favourite pinut butter?".to_string(),
    };
    let candidate = Candidate {
        poll_id: 1,
        candidate_votes: 3,
        candidate_name: "Smooth".to_string(),
    };
    let owned = |data: Vec<u8>| AccountInfo {
        owner: voting(),
        data,
    };

    ledger.set_account(Pubkey::new_from_array([10; 32]), owned(poll.encode().unwrap()));
    ledger.set_account(Pubkey::new_from_array([11; 32]), owned(candidate.encode().unwrap()));
    // some other program's layout
    ledger.set_account(Pubkey::new_from_array([12; 32]), owned(vec![0xEE; 48]));
    // right tag, body cut short
    let mut truncated = Poll::discriminator().to_vec();
    truncated.extend_from_slice(&[0u8; 4]);
    ledger.set_account(Pubkey::new_from_array([13; 32]), owned(truncated));

    ledger
}

#[tokio::test]
async fn test_scan_returns_only_matching_schema() {
    let reader = AccountReader::new(seeded_ledger());
    let polls: Vec<(Pubkey, Poll)> = reader.scan_all::<Poll>(&voting()).await.unwrap().collect().await;

    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].0, Pubkey::new_from_array([10; 32]));
    assert_eq!(polls[0].1.poll_id, 1);
}

#[tokio::test]
async fn test_scan_program_skips_unrecognized_records() {
    let reader = AccountReader::new(seeded_ledger());
    let records: Vec<(Pubkey, ProgramAccount)> =
        reader.scan_program(&voting()).await.unwrap().collect().await;

    let kinds: Vec<&str> = records.iter().map(|(_, r)| r.kind()).collect();
    assert_eq!(kinds, vec!["Poll", "Candidate"]);
}

#[tokio::test]
async fn test_scan_other_program_is_empty() {
    let reader = AccountReader::new(seeded_ledger());
    let records: Vec<(Pubkey, ProgramAccount)> = reader
        .scan_program(&Pubkey::new_from_array([2; 32]))
        .await
        .unwrap()
        .collect()
        .await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fetch_wrong_schema_is_corrupt() {
    let reader = AccountReader::new(seeded_ledger());

    let result = reader.fetch_one::<Candidate>(&Pubkey::new_from_array([10; 32])).await;
    assert!(matches!(result, Err(Error::CorruptAccount { .. })));

    let result = reader.fetch_any(&Pubkey::new_from_array([12; 32])).await;
    assert!(matches!(result, Err(Error::CorruptAccount { .. })));
}

#[tokio::test]
async fn test_fetch_truncated_is_corrupt() {
    let reader = AccountReader::new(seeded_ledger());
    let address = Pubkey::new_from_array([13; 32]);

    match reader.fetch_one::<Poll>(&address).await {
        Err(Error::CorruptAccount { address: at, reason }) => {
            assert_eq!(at, address);
            assert!(reason.contains(&format!("have {}", DISCRIMINATOR_LEN + 4)));
        }
        other => panic!("expected CorruptAccount, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_empty_address_not_found() {
    let reader = AccountReader::new(seeded_ledger());
    let address = Pubkey::new_from_array([99; 32]);

    assert!(matches!(
        reader.fetch_one::<Poll>(&address).await,
        Err(Error::NotFound(at)) if at == address
    ));
    assert!(!reader.exists(&address).await.unwrap());
}

#[tokio::test]
async fn test_fetch_any_dispatches_by_tag() {
    let reader = AccountReader::new(seeded_ledger());
    let record = reader.fetch_any(&Pubkey::new_from_array([11; 32])).await.unwrap();
    match record {
        ProgramAccount::Candidate(candidate) => {
            assert_eq!(candidate.candidate_name, "Smooth");
            assert_eq!(candidate.candidate_votes, 3);
        }
        other => panic!("expected a candidate, got {:?}", other),
    }
}
