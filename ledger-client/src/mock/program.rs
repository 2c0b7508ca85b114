//! Program rules enforced by the simulated ledger
//!
//! The rules mirror what the deployed programs check: signer and seed
//! constraints, account existence and ownership, string bounds, the poll
//! window, and counter range. A failed instruction reports the same numeric
//! code the real program would.

use crate::address::{candidate_address, journal_entry_address, poll_address};
use crate::config::ProgramIds;
use crate::error::RejectionCode;
use crate::instruction::ProgramInstruction;
use crate::schema::{
    AccountSchema, Candidate, Counter, JournalEntry, Poll, MAX_DESCRIPTION_LEN, MAX_MESSAGE_LEN,
};
use crate::types::{AccountInfo, AccountMeta, Instruction, Pubkey};
use std::collections::HashMap;

/// Not enough account keys supplied
const ACCOUNT_NOT_ENOUGH_KEYS: u32 = 3005;

/// Account data does not carry the expected discriminator
const ACCOUNT_DISCRIMINATOR_MISMATCH: u32 = 3002;

/// A mutated account was not marked writable
const CONSTRAINT_MUT: u32 = 2000;

/// Unknown program
const PROGRAM_NOT_FOUND: u32 = u32::MAX;

type Outcome = std::result::Result<(), RejectionCode>;

/// Which deployed program owns which operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Voting,
    Journal,
    Counter,
}

fn family(ix: &ProgramInstruction) -> Family {
    match ix {
        ProgramInstruction::InitializePoll { .. }
        | ProgramInstruction::InitializeCandidate { .. }
        | ProgramInstruction::Vote { .. } => Family::Voting,
        ProgramInstruction::CreateJournalEntry { .. }
        | ProgramInstruction::UpdateJournalEntry { .. }
        | ProgramInstruction::DeleteJournalEntry { .. } => Family::Journal,
        ProgramInstruction::Initialize
        | ProgramInstruction::Increment
        | ProgramInstruction::Decrement
        | ProgramInstruction::Set { .. }
        | ProgramInstruction::Close => Family::Counter,
    }
}

/// Execution context for one instruction
pub(crate) struct Executor<'a> {
    pub accounts: &'a mut HashMap<Pubkey, AccountInfo>,
    pub programs: &'a ProgramIds,
    pub unix_time: i64,
}

impl Executor<'_> {
    /// Apply one instruction to the working account set
    pub fn execute(&mut self, ix: &Instruction) -> Outcome {
        let program = ix.program_id;
        let known = [self.programs.voting, self.programs.journal, self.programs.counter];
        if !known.contains(&program) {
            return Err(RejectionCode::Other(PROGRAM_NOT_FOUND));
        }

        let payload = ProgramInstruction::decode(&ix.data)
            .map_err(|_| RejectionCode::InstructionDidNotDeserialize)?;
        let serves = match family(&payload) {
            Family::Voting => program == self.programs.voting,
            Family::Journal => program == self.programs.journal,
            Family::Counter => program == self.programs.counter,
        };
        if !serves {
            return Err(RejectionCode::InstructionDidNotDeserialize);
        }

        let accounts = &ix.accounts;
        match payload {
            ProgramInstruction::InitializePoll {
                poll_id,
                description,
                poll_start,
                poll_end,
            } => {
                signer(accounts, 0)?;
                let poll = seeded(accounts, 1, poll_address(&program, poll_id))?;
                if description.len() > MAX_DESCRIPTION_LEN {
                    return Err(RejectionCode::StringTooLong);
                }
                if poll_start >= poll_end {
                    return Err(RejectionCode::InvalidPollWindow);
                }
                self.create(
                    &program,
                    poll,
                    &Poll {
                        poll_id,
                        poll_start,
                        poll_end,
                        candidate_amount: 0,
                        description,
                    },
                )
            }
            ProgramInstruction::InitializeCandidate {
                candidate_name,
                poll_id,
            } => {
                signer(accounts, 0)?;
                let poll_meta = seeded(accounts, 1, poll_address(&program, poll_id))?;
                let candidate = seeded(
                    accounts,
                    2,
                    candidate_address(&program, poll_id, &candidate_name),
                )?;
                let mut poll: Poll = self.load(&program, &poll_meta.pubkey)?;
                poll.candidate_amount = poll
                    .candidate_amount
                    .checked_add(1)
                    .ok_or(RejectionCode::CounterOverflow)?;
                self.create(
                    &program,
                    candidate,
                    &Candidate {
                        poll_id,
                        candidate_votes: 0,
                        candidate_name,
                    },
                )?;
                self.store(&program, poll_meta, &poll)
            }
            ProgramInstruction::Vote {
                candidate_name,
                poll_id,
            } => {
                signer(accounts, 0)?;
                let poll_meta = seeded(accounts, 1, poll_address(&program, poll_id))?;
                let candidate_meta = seeded(
                    accounts,
                    2,
                    candidate_address(&program, poll_id, &candidate_name),
                )?;
                let poll: Poll = self.load(&program, &poll_meta.pubkey)?;
                if !poll.is_open_at(self.unix_time) {
                    return Err(RejectionCode::VotingNotOpen);
                }
                let mut candidate: Candidate = self.load(&program, &candidate_meta.pubkey)?;
                candidate.candidate_votes = candidate
                    .candidate_votes
                    .checked_add(1)
                    .ok_or(RejectionCode::CounterOverflow)?;
                self.store(&program, candidate_meta, &candidate)
            }
            ProgramInstruction::CreateJournalEntry { title, message } => {
                let owner = signer(accounts, 1)?.pubkey;
                let entry = seeded(accounts, 0, journal_entry_address(&program, &title, &owner))?;
                if message.len() > MAX_MESSAGE_LEN {
                    return Err(RejectionCode::StringTooLong);
                }
                self.create(
                    &program,
                    entry,
                    &JournalEntry {
                        owner,
                        title,
                        message,
                    },
                )
            }
            ProgramInstruction::UpdateJournalEntry { title, message } => {
                let owner = signer(accounts, 1)?.pubkey;
                let entry_meta = seeded(accounts, 0, journal_entry_address(&program, &title, &owner))?;
                if message.len() > MAX_MESSAGE_LEN {
                    return Err(RejectionCode::StringTooLong);
                }
                let mut entry: JournalEntry = self.load(&program, &entry_meta.pubkey)?;
                if entry.owner != owner {
                    return Err(RejectionCode::ConstraintSeeds);
                }
                entry.message = message;
                self.store(&program, entry_meta, &entry)
            }
            ProgramInstruction::DeleteJournalEntry { title } => {
                let owner = signer(accounts, 1)?.pubkey;
                let entry_meta = seeded(accounts, 0, journal_entry_address(&program, &title, &owner))?;
                let entry: JournalEntry = self.load(&program, &entry_meta.pubkey)?;
                if entry.owner != owner {
                    return Err(RejectionCode::ConstraintSeeds);
                }
                self.remove(entry_meta)
            }
            ProgramInstruction::Initialize => {
                signer(accounts, 0)?;
                let counter = signer(accounts, 1)?;
                self.create(&program, counter, &Counter { count: 0 })
            }
            ProgramInstruction::Increment => {
                let meta = account(accounts, 0)?;
                let mut counter: Counter = self.load(&program, &meta.pubkey)?;
                counter.count = counter
                    .count
                    .checked_add(1)
                    .ok_or(RejectionCode::CounterOverflow)?;
                self.store(&program, meta, &counter)
            }
            ProgramInstruction::Decrement => {
                let meta = account(accounts, 0)?;
                let mut counter: Counter = self.load(&program, &meta.pubkey)?;
                counter.count = counter
                    .count
                    .checked_sub(1)
                    .ok_or(RejectionCode::CounterUnderflow)?;
                self.store(&program, meta, &counter)
            }
            ProgramInstruction::Set { value } => {
                let meta = account(accounts, 0)?;
                let _: Counter = self.load(&program, &meta.pubkey)?;
                self.store(&program, meta, &Counter { count: value })
            }
            ProgramInstruction::Close => {
                signer(accounts, 0)?;
                let meta = account(accounts, 1)?;
                let _: Counter = self.load(&program, &meta.pubkey)?;
                self.remove(meta)
            }
        }
    }

    fn load<T: AccountSchema>(&self, program: &Pubkey, address: &Pubkey) -> std::result::Result<T, RejectionCode> {
        let info = self
            .accounts
            .get(address)
            .ok_or(RejectionCode::AccountNotInitialized)?;
        if info.owner != *program {
            return Err(RejectionCode::AccountOwnedByWrongProgram);
        }
        T::decode(&info.data).map_err(|_| RejectionCode::Other(ACCOUNT_DISCRIMINATOR_MISMATCH))
    }

    fn create<T: AccountSchema>(&mut self, program: &Pubkey, meta: &AccountMeta, record: &T) -> Outcome {
        writable(meta)?;
        if self.accounts.contains_key(&meta.pubkey) {
            return Err(RejectionCode::AccountAlreadyInUse);
        }
        self.write(program, meta.pubkey, record)
    }

    fn store<T: AccountSchema>(&mut self, program: &Pubkey, meta: &AccountMeta, record: &T) -> Outcome {
        writable(meta)?;
        self.write(program, meta.pubkey, record)
    }

    fn write<T: AccountSchema>(&mut self, program: &Pubkey, address: Pubkey, record: &T) -> Outcome {
        let data = record.encode().map_err(|_| RejectionCode::StringTooLong)?;
        self.accounts.insert(
            address,
            AccountInfo {
                owner: *program,
                data,
            },
        );
        Ok(())
    }

    fn remove(&mut self, meta: &AccountMeta) -> Outcome {
        writable(meta)?;
        self.accounts.remove(&meta.pubkey);
        Ok(())
    }
}

fn account(accounts: &[AccountMeta], index: usize) -> std::result::Result<&AccountMeta, RejectionCode> {
    accounts
        .get(index)
        .ok_or(RejectionCode::Other(ACCOUNT_NOT_ENOUGH_KEYS))
}

fn signer(accounts: &[AccountMeta], index: usize) -> std::result::Result<&AccountMeta, RejectionCode> {
    let meta = account(accounts, index)?;
    if !meta.is_signer {
        return Err(RejectionCode::ConstraintSigner);
    }
    Ok(meta)
}

/// The account at `index` must be the address its seeds derive to
fn seeded(
    accounts: &[AccountMeta],
    index: usize,
    derived: crate::Result<(Pubkey, u8)>,
) -> std::result::Result<&AccountMeta, RejectionCode> {
    let meta = account(accounts, index)?;
    match derived {
        Ok((address, _)) if address == meta.pubkey => Ok(meta),
        _ => Err(RejectionCode::ConstraintSeeds),
    }
}

fn writable(meta: &AccountMeta) -> Outcome {
    if !meta.is_writable {
        return Err(RejectionCode::Other(CONSTRAINT_MUT));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{counter, journal, voting};

    fn programs() -> ProgramIds {
        ProgramIds {
            voting: Pubkey::new_from_array([1; 32]),
            journal: Pubkey::new_from_array([2; 32]),
            counter: Pubkey::new_from_array([2; 32]),
        }
    }

    fn run(accounts: &mut HashMap<Pubkey, AccountInfo>, ix: &Instruction) -> Outcome {
        let programs = programs();
        Executor {
            accounts,
            programs: &programs,
            unix_time: 100,
        }
        .execute(ix)
    }

    #[test]
    fn test_wrong_program_for_operation() {
        let mut accounts = HashMap::new();
        let signer = Pubkey::new_from_array([9; 32]);
        let ix = voting::initialize_poll(&programs().journal, &signer, 1, "q", 0, 10).unwrap();
        assert_eq!(
            run(&mut accounts, &ix),
            Err(RejectionCode::InstructionDidNotDeserialize)
        );
    }

    #[test]
    fn test_vote_outside_window() {
        let mut accounts = HashMap::new();
        let signer = Pubkey::new_from_array([9; 32]);
        let voting_id = programs().voting;
        run(
            &mut accounts,
            &voting::initialize_poll(&voting_id, &signer, 1, "q", 200, 300).unwrap(),
        )
        .unwrap();
        run(
            &mut accounts,
            &voting::initialize_candidate(&voting_id, &signer, 1, "A").unwrap(),
        )
        .unwrap();
        assert_eq!(
            run(&mut accounts, &voting::vote(&voting_id, &signer, 1, "A").unwrap()),
            Err(RejectionCode::VotingNotOpen)
        );
    }

    #[test]
    fn test_tallies_saturate_with_rejection() {
        let mut accounts = HashMap::new();
        let signer = Pubkey::new_from_array([9; 32]);
        let voting_id = programs().voting;
        run(
            &mut accounts,
            &voting::initialize_poll(&voting_id, &signer, 1, "q", 0, 300).unwrap(),
        )
        .unwrap();
        run(
            &mut accounts,
            &voting::initialize_candidate(&voting_id, &signer, 1, "A").unwrap(),
        )
        .unwrap();

        let (candidate_at, _) = candidate_address(&voting_id, 1, "A").unwrap();
        let full = Candidate {
            poll_id: 1,
            candidate_votes: u64::MAX,
            candidate_name: "A".into(),
        };
        accounts.insert(
            candidate_at,
            AccountInfo {
                owner: voting_id,
                data: full.encode().unwrap(),
            },
        );
        assert_eq!(
            run(&mut accounts, &voting::vote(&voting_id, &signer, 1, "A").unwrap()),
            Err(RejectionCode::CounterOverflow)
        );

        let (poll_at, _) = poll_address(&voting_id, 1).unwrap();
        let mut poll = Poll::decode(&accounts[&poll_at].data).unwrap();
        poll.candidate_amount = u64::MAX;
        accounts.insert(
            poll_at,
            AccountInfo {
                owner: voting_id,
                data: poll.encode().unwrap(),
            },
        );
        assert_eq!(
            run(
                &mut accounts,
                &voting::initialize_candidate(&voting_id, &signer, 1, "B").unwrap()
            ),
            Err(RejectionCode::CounterOverflow)
        );
        let (unused, _) = candidate_address(&voting_id, 1, "B").unwrap();
        assert!(!accounts.contains_key(&unused));
    }

    #[test]
    fn test_unsigned_owner_rejected() {
        let mut accounts = HashMap::new();
        let owner = Pubkey::new_from_array([9; 32]);
        let mut ix = journal::create_journal_entry(&programs().journal, &owner, "t", "m").unwrap();
        ix.accounts[1].is_signer = false;
        assert_eq!(run(&mut accounts, &ix), Err(RejectionCode::ConstraintSigner));
    }

    #[test]
    fn test_counter_range() {
        let mut accounts = HashMap::new();
        let payer = Pubkey::new_from_array([9; 32]);
        let address = Pubkey::new_from_array([10; 32]);
        let id = programs().counter;

        run(&mut accounts, &counter::initialize(&id, &payer, &address).unwrap()).unwrap();
        assert_eq!(
            run(&mut accounts, &counter::decrement(&id, &address).unwrap()),
            Err(RejectionCode::CounterUnderflow)
        );
        run(&mut accounts, &counter::set(&id, &address, u8::MAX).unwrap()).unwrap();
        assert_eq!(
            run(&mut accounts, &counter::increment(&id, &address).unwrap()),
            Err(RejectionCode::CounterOverflow)
        );
    }

    #[test]
    fn test_uninitialized_counter() {
        let mut accounts = HashMap::new();
        let id = programs().counter;
        let address = Pubkey::new_from_array([10; 32]);
        assert_eq!(
            run(&mut accounts, &counter::increment(&id, &address).unwrap()),
            Err(RejectionCode::AccountNotInitialized)
        );
    }
}
