//! Deterministic address derivation
//!
//! `address = sha256(seeds.. || [bump] || program_id || "ProgramDerivedAddress")`,
//! searching bump from 255 down to 0 for the first digest that is not an
//! ed25519 curve point. Pure: no state, no I/O.
//!
//! Seeds are concatenated with no delimiters, so every variable-length seed
//! component is length-prefixed by the entity helpers below.

use crate::crypto::is_on_curve;
use crate::types::Pubkey;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Maximum number of seeds, including the bump seed
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed in bytes
pub const MAX_SEED_LEN: usize = 32;

/// Domain separator appended to every derivation
pub const PDA_MARKER: &[u8; 21] = b"ProgramDerivedAddress";

/// Seed namespace for polls
pub const POLL_SEED: &[u8] = b"poll";

/// Seed namespace for candidates
pub const CANDIDATE_SEED: &[u8] = b"candidate";

/// Seed namespace for journal entries
pub const JOURNAL_SEED: &[u8] = b"journal";

/// Longest string usable as a single length-prefixed seed
pub const MAX_PREFIXED_SEED_STR: usize = MAX_SEED_LEN - 1;

/// Hash seeds with an explicit bump already included; fails if the result is on-curve
pub fn create_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey> {
    if seeds.len() > MAX_SEEDS {
        return Err(Error::InvalidArgument(format!(
            "at most {} seeds allowed, got {}",
            MAX_SEEDS,
            seeds.len()
        )));
    }
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(Error::InvalidArgument(format!(
            "seed of {} bytes exceeds {} byte limit",
            seed.len(),
            MAX_SEED_LEN
        )));
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);
    let digest: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&digest) {
        return Err(Error::AddressSpaceExhausted);
    }
    Ok(Pubkey::new_from_array(digest))
}

/// Find the canonical (highest valid bump) address for the seeds
pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> Result<(Pubkey, u8)> {
    if seeds.len() >= MAX_SEEDS {
        return Err(Error::InvalidArgument(format!(
            "at most {} seeds allowed before the bump, got {}",
            MAX_SEEDS - 1,
            seeds.len()
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => {
                tracing::debug!(%address, bump, "derived program address");
                return Ok((address, bump));
            }
            Err(Error::AddressSpaceExhausted) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::AddressSpaceExhausted)
}

/// `u8 length || utf8 bytes`, the unambiguous seed form for strings
pub fn length_prefixed_seed(value: &str) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    if bytes.len() > MAX_PREFIXED_SEED_STR {
        return Err(Error::InvalidArgument(format!(
            "'{}' is {} bytes; seed strings are limited to {}",
            value,
            bytes.len(),
            MAX_PREFIXED_SEED_STR
        )));
    }
    let mut seed = Vec::with_capacity(bytes.len() + 1);
    seed.push(bytes.len() as u8);
    seed.extend_from_slice(bytes);
    Ok(seed)
}

/// Address of a poll: `["poll", poll_id_le]`
pub fn poll_address(program_id: &Pubkey, poll_id: u64) -> Result<(Pubkey, u8)> {
    find_program_address(&[POLL_SEED, &poll_id.to_le_bytes()], program_id)
}

/// Address of a candidate: `["candidate", poll_id_le, len || name]`
pub fn candidate_address(
    program_id: &Pubkey,
    poll_id: u64,
    candidate_name: &str,
) -> Result<(Pubkey, u8)> {
    let name = length_prefixed_seed(candidate_name)?;
    find_program_address(&[CANDIDATE_SEED, &poll_id.to_le_bytes(), &name], program_id)
}

/// Address of a journal entry: `["journal", len || title, owner]`
pub fn journal_entry_address(
    program_id: &Pubkey,
    title: &str,
    owner: &Pubkey,
) -> Result<(Pubkey, u8)> {
    let title = length_prefixed_seed(title)?;
    find_program_address(&[JOURNAL_SEED, &title, owner.as_ref()], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Pubkey {
        "JAVuBXeBZqXNtS73azhBDAoYaaAFfo4gWXoZe2e7Jf8H".parse().unwrap()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = poll_address(&program(), 1).unwrap();
        let b = poll_address(&program(), 1).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_address_is_off_curve() {
        let (address, _) = poll_address(&program(), 7).unwrap();
        assert!(!is_on_curve(&address.to_bytes()));
    }

    #[test]
    fn test_bump_reproduces_address() {
        let (address, bump) = candidate_address(&program(), 1, "Crunchy").unwrap();
        let name = length_prefixed_seed("Crunchy").unwrap();
        let id = 1u64.to_le_bytes();
        let direct =
            create_program_address(&[CANDIDATE_SEED, &id, &name, &[bump]], &program()).unwrap();
        assert_eq!(direct, address);
    }

    #[test]
    fn test_program_id_separates_namespaces() {
        let other = Pubkey::new_from_array([5u8; 32]);
        assert_ne!(
            poll_address(&program(), 1).unwrap().0,
            poll_address(&other, 1).unwrap().0
        );
    }

    #[test]
    fn test_length_prefix_prevents_concatenation_collision() {
        let owner = Pubkey::new_from_array([3u8; 32]);
        // Without a prefix "ab" + owner and "a" + "b"-leading owner could collide.
        let mut shifted = [3u8; 32];
        shifted[0] = b'b';
        let shifted_owner = Pubkey::new_from_array(shifted);
        let a = journal_entry_address(&program(), "ab", &owner).unwrap().0;
        let b = journal_entry_address(&program(), "a", &shifted_owner).unwrap().0;
        assert_ne!(a, b);
    }

    #[test]
    fn test_poll_and_candidate_namespaces_are_disjoint() {
        let poll = poll_address(&program(), 1).unwrap().0;
        let candidate = candidate_address(&program(), 1, "").unwrap().0;
        assert_ne!(poll, candidate);
    }

    #[test]
    fn test_seed_too_long_rejected() {
        let long = "x".repeat(MAX_PREFIXED_SEED_STR + 1);
        assert!(matches!(
            candidate_address(&program(), 1, &long),
            Err(Error::InvalidArgument(_))
        ));
        let raw = [0u8; MAX_SEED_LEN + 1];
        assert!(matches!(
            find_program_address(&[&raw], &program()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_too_many_seeds_rejected() {
        let seed: &[u8] = b"s";
        let seeds = vec![seed; MAX_SEEDS];
        assert!(matches!(
            find_program_address(&seeds, &program()),
            Err(Error::InvalidArgument(_))
        ));
    }
}
