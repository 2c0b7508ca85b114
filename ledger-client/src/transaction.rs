//! Transaction assembly and the legacy wire format
//!
//! ```text
//! transaction = [compact-u16 n][n x 64-byte signature][message]
//! message     = [3-byte header][compact-u16 k][k x 32-byte key]
//!               [32-byte blockhash][compact-u16 m][m x compiled instruction]
//! compiled    = [u8 program index][compact-u16 a][a x u8 account index]
//!               [compact-u16 d][d bytes data]
//! ```
//!
//! Account keys are ordered fee payer, writable signers, read-only signers,
//! writable non-signers, read-only non-signers. Signatures are positional:
//! signature `i` belongs to key `i`.

use crate::crypto::TransactionSigner;
use crate::types::{AccountMeta, Hash, Instruction, Pubkey, Signature, SIGNATURE_BYTES};
use crate::{Error, Result};
use base64::Engine;

/// Largest serialized transaction the ledger ingress accepts
pub const PACKET_DATA_SIZE: usize = 1232;

/// Recent blockhash plus the last block height at which it is still accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FreshnessToken {
    /// Recent blockhash
    pub blockhash: Hash,
    /// Last block height at which a transaction carrying `blockhash` lands
    pub last_valid_block_height: u64,
}

impl FreshnessToken {
    /// Whether the token has lapsed at `block_height`
    pub fn is_expired_at(&self, block_height: u64) -> bool {
        block_height > self.last_valid_block_height
    }
}

/// Signature and read-only counts describing the account key list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// Leading keys that must sign
    pub num_required_signatures: u8,
    /// Trailing keys of the signer block that are read-only
    pub num_readonly_signed_accounts: u8,
    /// Trailing keys of the whole list that are read-only
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction with accounts replaced by indices into the key list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    /// Index of the target program
    pub program_id_index: u8,
    /// Indices of the instruction's accounts, in order
    pub accounts: Vec<u8>,
    /// Encoded payload
    pub data: Vec<u8>,
}

/// The byte sequence every signer signs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Role counts
    pub header: MessageHeader,
    /// Deduplicated, role-ordered keys
    pub account_keys: Vec<Pubkey>,
    /// Freshness value
    pub recent_blockhash: Hash,
    /// Compiled instructions in submission order
    pub instructions: Vec<CompiledInstruction>,
}

#[derive(Clone, Copy)]
struct KeyRole {
    key: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile instructions against a fee payer
    pub fn compile(instructions: &[Instruction], fee_payer: &Pubkey, blockhash: Hash) -> Result<Self> {
        // first-appearance order, fee payer pinned to slot 0
        let mut roles: Vec<KeyRole> = vec![KeyRole {
            key: *fee_payer,
            is_signer: true,
            is_writable: true,
        }];
        let mut merge = |meta: AccountMeta| match roles.iter_mut().find(|r| r.key == meta.pubkey) {
            Some(role) => {
                role.is_signer |= meta.is_signer;
                role.is_writable |= meta.is_writable;
            }
            None => roles.push(KeyRole {
                key: meta.pubkey,
                is_signer: meta.is_signer,
                is_writable: meta.is_writable,
            }),
        };
        for ix in instructions {
            for meta in &ix.accounts {
                merge(*meta);
            }
            merge(AccountMeta::new_readonly(ix.program_id, false));
        }

        let (payer, rest) = roles.split_at(1);
        let group = |signer: bool, writable: bool| {
            rest.iter()
                .filter(move |r| r.is_signer == signer && r.is_writable == writable)
                .copied()
        };
        let ordered: Vec<KeyRole> = payer
            .iter()
            .copied()
            .chain(group(true, true))
            .chain(group(true, false))
            .chain(group(false, true))
            .chain(group(false, false))
            .collect();

        if ordered.len() > u8::MAX as usize + 1 {
            return Err(Error::InvalidArgument(format!(
                "transaction references {} accounts (max 256)",
                ordered.len()
            )));
        }

        let count = |pred: fn(&KeyRole) -> bool| ordered.iter().filter(|r| pred(r)).count() as u8;
        let header = MessageHeader {
            num_required_signatures: count(|r| r.is_signer),
            num_readonly_signed_accounts: count(|r| r.is_signer && !r.is_writable),
            num_readonly_unsigned_accounts: count(|r| !r.is_signer && !r.is_writable),
        };
        let account_keys: Vec<Pubkey> = ordered.iter().map(|r| r.key).collect();

        let index_of = |key: &Pubkey| -> u8 {
            // every key was merged above
            account_keys.iter().position(|k| k == key).unwrap_or_default() as u8
        };
        let instructions = instructions
            .iter()
            .map(|ix| CompiledInstruction {
                program_id_index: index_of(&ix.program_id),
                accounts: ix.accounts.iter().map(|m| index_of(&m.pubkey)).collect(),
                data: ix.data.clone(),
            })
            .collect();

        Ok(Self {
            header,
            account_keys,
            recent_blockhash: blockhash,
            instructions,
        })
    }

    /// Keys that must sign, fee payer first
    pub fn signer_keys(&self) -> &[Pubkey] {
        let n = (self.header.num_required_signatures as usize).min(self.account_keys.len());
        &self.account_keys[..n]
    }

    /// Fee payer identity
    pub fn fee_payer(&self) -> Option<&Pubkey> {
        self.account_keys.first()
    }

    /// Whether key `index` signs
    pub fn is_signer(&self, index: usize) -> bool {
        index < self.header.num_required_signatures as usize
    }

    /// Whether key `index` may be written
    pub fn is_writable(&self, index: usize) -> bool {
        let signed = self.header.num_required_signatures as usize;
        let total = self.account_keys.len();
        if index < signed {
            index < signed.saturating_sub(self.header.num_readonly_signed_accounts as usize)
        } else {
            index < total.saturating_sub(self.header.num_readonly_unsigned_accounts as usize)
        }
    }

    /// Expand compiled instructions back to addresses and roles
    pub fn decompile(&self) -> Result<Vec<Instruction>> {
        let key = |index: u8| {
            self.account_keys.get(index as usize).copied().ok_or_else(|| {
                Error::InvalidArgument(format!("account index {} out of range", index))
            })
        };
        self.instructions
            .iter()
            .map(|ix| {
                let accounts = ix
                    .accounts
                    .iter()
                    .map(|&i| {
                        Ok(AccountMeta {
                            pubkey: key(i)?,
                            is_signer: self.is_signer(i as usize),
                            is_writable: self.is_writable(i as usize),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Instruction {
                    program_id: key(ix.program_id_index)?,
                    accounts,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }

    /// Wire bytes; this is what gets signed
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![
            self.header.num_required_signatures,
            self.header.num_readonly_signed_accounts,
            self.header.num_readonly_unsigned_accounts,
        ];
        encode_len(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_ref());
        }
        out.extend_from_slice(self.recent_blockhash.as_ref());
        encode_len(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_len(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_len(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }

    fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        let header = MessageHeader {
            num_required_signatures: cursor.u8()?,
            num_readonly_signed_accounts: cursor.u8()?,
            num_readonly_unsigned_accounts: cursor.u8()?,
        };
        let key_count = cursor.len()?;
        let mut account_keys = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            account_keys.push(Pubkey::new_from_array(cursor.array()?));
        }
        let recent_blockhash = Hash::new_from_array(cursor.array()?);
        let ix_count = cursor.len()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = cursor.u8()?;
            let accounts_len = cursor.len()?;
            let accounts = cursor.bytes(accounts_len)?.to_vec();
            let data_len = cursor.len()?;
            let data = cursor.bytes(data_len)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }
        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

/// Assembled, not yet signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    message: Message,
    token: FreshnessToken,
}

/// Bundle `instructions` under `fee_payer` with a freshness token
///
/// `token` is whatever the caller has cached; `observed_block_height` is the
/// most recent height the caller knows of. An absent or lapsed token is
/// rejected rather than refreshed here.
pub fn assemble(
    instructions: &[Instruction],
    fee_payer: &Pubkey,
    token: Option<FreshnessToken>,
    observed_block_height: u64,
) -> Result<UnsignedTransaction> {
    if instructions.is_empty() {
        return Err(Error::EmptyTransaction);
    }
    let token = match token {
        Some(token) if !token.is_expired_at(observed_block_height) => token,
        _ => return Err(Error::StaleFreshnessToken),
    };

    let message = Message::compile(instructions, fee_payer, token.blockhash)?;
    let signatures = message.header.num_required_signatures as usize;
    let size = compact_len_size(signatures) + signatures * SIGNATURE_BYTES + message.serialize().len();
    if size > PACKET_DATA_SIZE {
        return Err(Error::TransactionTooLarge {
            size,
            max: PACKET_DATA_SIZE,
        });
    }

    tracing::debug!(
        fee_payer = %fee_payer,
        instructions = instructions.len(),
        accounts = message.account_keys.len(),
        size,
        "assembled transaction"
    );
    Ok(UnsignedTransaction { message, token })
}

impl UnsignedTransaction {
    /// Compiled message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Exact bytes each signer signs
    pub fn message_bytes(&self) -> Vec<u8> {
        self.message.serialize()
    }

    /// Token this transaction was assembled with
    pub fn freshness(&self) -> FreshnessToken {
        self.token
    }

    /// Identities that must sign, fee payer first
    pub fn required_signers(&self) -> &[Pubkey] {
        self.message.signer_keys()
    }

    /// Sign with every required identity
    ///
    /// Fails with `MissingSignature` naming the first required identity no
    /// supplied signer can sign for. Extra signers are ignored.
    pub fn sign(&self, signers: &[&dyn TransactionSigner]) -> Result<SignedTransaction> {
        let bytes = self.message_bytes();
        let signatures = self
            .required_signers()
            .iter()
            .map(|key| {
                signers
                    .iter()
                    .find(|s| s.pubkey() == *key)
                    .map(|s| s.sign_message(&bytes))
                    .ok_or(Error::MissingSignature(*key))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SignedTransaction {
            signatures,
            message: self.message.clone(),
        })
    }

    /// Wire form with zeroed signature slots, base64 encoded, for a wallet
    /// that signs on the caller's behalf
    pub fn to_base64(&self) -> String {
        let placeholder = SignedTransaction {
            signatures: vec![Signature::default(); self.required_signers().len()],
            message: self.message.clone(),
        };
        base64::engine::general_purpose::STANDARD.encode(placeholder.serialize())
    }
}

/// Fully signed, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    signatures: Vec<Signature>,
    message: Message,
}

impl SignedTransaction {
    /// Transaction identity: the fee payer's signature
    pub fn signature(&self) -> Signature {
        self.signatures.first().copied().unwrap_or_default()
    }

    /// All signatures, positional with the signer keys
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Signed message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Check every signature against its key
    pub fn verify(&self) -> Result<()> {
        let bytes = self.message.serialize();
        let keys = self.message.signer_keys();
        if keys.len() != self.signatures.len() {
            return Err(Error::InvalidArgument(format!(
                "{} signatures for {} required signers",
                self.signatures.len(),
                keys.len()
            )));
        }
        for (key, signature) in keys.iter().zip(&self.signatures) {
            if !signature.verify(&bytes, key) {
                return Err(Error::MissingSignature(*key));
            }
        }
        Ok(())
    }

    /// Wire bytes
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_len(&mut out, self.signatures.len());
        for signature in &self.signatures {
            out.extend_from_slice(signature.as_bytes());
        }
        out.extend(self.message.serialize());
        out
    }

    /// Parse wire bytes
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor.len()?;
        let mut signatures = Vec::with_capacity(count.min(PACKET_DATA_SIZE / SIGNATURE_BYTES));
        for _ in 0..count {
            signatures.push(Signature::from_bytes(cursor.array()?));
        }
        let message = Message::read(&mut cursor)?;
        Ok(Self { signatures, message })
    }

    /// Base64 of the wire bytes, the RPC submission encoding
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.serialize())
    }
}

/// Append a compact-u16 length
fn encode_len(out: &mut Vec<u8>, len: usize) {
    let mut rem = len as u16;
    loop {
        let byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

fn compact_len_size(len: usize) -> usize {
    let mut out = Vec::with_capacity(3);
    encode_len(&mut out, len);
    out.len()
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len()).ok_or(
            Error::TruncatedRecord {
                needed: self.pos.saturating_add(n),
                len: self.data.len(),
            },
        )?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Compact-u16: seven bits per byte, at most three bytes
    fn len(&mut self) -> Result<usize> {
        let mut value = 0usize;
        for shift in [0, 7, 14] {
            let byte = self.u8()?;
            value |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::InvalidArgument("compact length longer than three bytes".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn token() -> FreshnessToken {
        FreshnessToken {
            blockhash: Hash::new_from_array([9; 32]),
            last_valid_block_height: 100,
        }
    }

    fn ix(program: Pubkey, accounts: Vec<AccountMeta>) -> Instruction {
        Instruction {
            program_id: program,
            accounts,
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_compact_len_encoding() {
        for (len, expected) in [
            (0usize, vec![0u8]),
            (0x7f, vec![0x7f]),
            (0x80, vec![0x80, 0x01]),
            (0x3fff, vec![0xff, 0x7f]),
            (0x4000, vec![0x80, 0x80, 0x01]),
        ] {
            let mut out = Vec::new();
            encode_len(&mut out, len);
            assert_eq!(out, expected);
            assert_eq!(Cursor::new(&out).len().unwrap(), len);
        }
    }

    #[test]
    fn test_account_ordering_and_header() {
        let payer = Pubkey::new_from_array([1; 32]);
        let co_signer = Pubkey::new_from_array([2; 32]);
        let writable = Pubkey::new_from_array([3; 32]);
        let readonly = Pubkey::new_from_array([4; 32]);
        let program = Pubkey::new_from_array([5; 32]);

        let instruction = ix(
            program,
            vec![
                AccountMeta::new_readonly(readonly, false),
                AccountMeta::new(writable, false),
                AccountMeta::new_readonly(co_signer, true),
                AccountMeta::new(payer, true),
            ],
        );
        let message = Message::compile(&[instruction], &payer, Hash::default()).unwrap();

        assert_eq!(
            message.account_keys,
            vec![payer, co_signer, writable, readonly, program]
        );
        assert_eq!(
            message.header,
            MessageHeader {
                num_required_signatures: 2,
                num_readonly_signed_accounts: 1,
                num_readonly_unsigned_accounts: 2,
            }
        );
        assert!(message.is_writable(0));
        assert!(!message.is_writable(1));
        assert!(message.is_writable(2));
        assert!(!message.is_writable(3));
        assert_eq!(message.instructions[0].accounts, vec![3, 2, 1, 0]);
        assert_eq!(message.instructions[0].program_id_index, 4);
    }

    #[test]
    fn test_roles_merge_across_instructions() {
        let payer = Pubkey::new_from_array([1; 32]);
        let shared = Pubkey::new_from_array([3; 32]);
        let program = Pubkey::new_from_array([5; 32]);
        let a = ix(program, vec![AccountMeta::new_readonly(shared, false)]);
        let b = ix(program, vec![AccountMeta::new(shared, false)]);
        let message = Message::compile(&[a, b], &payer, Hash::default()).unwrap();
        assert_eq!(message.account_keys.len(), 3);
        assert!(message.is_writable(1));
    }

    #[test]
    fn test_decompile_restores_roles() {
        let payer = Pubkey::new_from_array([1; 32]);
        let program = Pubkey::new_from_array([5; 32]);
        let original = ix(
            program,
            vec![
                AccountMeta::new(payer, true),
                AccountMeta::new_readonly(Pubkey::new_from_array([7; 32]), false),
            ],
        );
        let message = Message::compile(&[original.clone()], &payer, Hash::default()).unwrap();
        assert_eq!(message.decompile().unwrap(), vec![original]);
    }

    #[test]
    fn test_assemble_rejections() {
        let payer = Pubkey::new_from_array([1; 32]);
        let program = Pubkey::new_from_array([5; 32]);
        let one = vec![ix(program, vec![])];

        assert!(matches!(assemble(&[], &payer, Some(token()), 0), Err(Error::EmptyTransaction)));
        assert!(matches!(assemble(&one, &payer, None, 0), Err(Error::StaleFreshnessToken)));
        assert!(matches!(
            assemble(&one, &payer, Some(token()), 101),
            Err(Error::StaleFreshnessToken)
        ));
        assert!(assemble(&one, &payer, Some(token()), 100).is_ok());
    }

    #[test]
    fn test_assemble_rejects_oversized() {
        let payer = Pubkey::new_from_array([1; 32]);
        let big = Instruction {
            program_id: Pubkey::new_from_array([5; 32]),
            accounts: vec![],
            data: vec![0u8; PACKET_DATA_SIZE],
        };
        assert!(matches!(
            assemble(&[big], &payer, Some(token()), 0),
            Err(Error::TransactionTooLarge { max: PACKET_DATA_SIZE, .. })
        ));
    }

    #[test]
    fn test_sign_requires_every_signer() {
        let payer = KeyPair::from_seed(&[1; 32]);
        let counter = KeyPair::from_seed(&[2; 32]);
        let program = Pubkey::new_from_array([5; 32]);
        let instruction = ix(
            program,
            vec![
                AccountMeta::new(payer.public_key(), true),
                AccountMeta::new(counter.public_key(), true),
            ],
        );
        let unsigned = assemble(&[instruction], &payer.public_key(), Some(token()), 0).unwrap();

        match unsigned.sign(&[&payer]) {
            Err(Error::MissingSignature(key)) => assert_eq!(key, counter.public_key()),
            other => panic!("expected MissingSignature, got {:?}", other),
        }

        let signed = unsigned.sign(&[&counter, &payer]).unwrap();
        signed.verify().unwrap();
        assert_eq!(signed.signature(), payer.sign(&unsigned.message_bytes()));
    }

    #[test]
    fn test_wire_bytes_parse_back() {
        let payer = KeyPair::from_seed(&[1; 32]);
        let program = Pubkey::new_from_array([5; 32]);
        let instruction = ix(program, vec![AccountMeta::new(Pubkey::new_from_array([6; 32]), false)]);
        let signed = assemble(&[instruction], &payer.public_key(), Some(token()), 0)
            .unwrap()
            .sign(&[&payer])
            .unwrap();
        let parsed = SignedTransaction::deserialize(&signed.serialize()).unwrap();
        assert_eq!(parsed, signed);
        parsed.verify().unwrap();
    }

    #[test]
    fn test_truncated_wire_bytes() {
        assert!(matches!(
            SignedTransaction::deserialize(&[1, 0, 0]),
            Err(Error::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let payer = KeyPair::from_seed(&[1; 32]);
        let unsigned = assemble(
            &[ix(Pubkey::new_from_array([5; 32]), vec![])],
            &payer.public_key(),
            Some(token()),
            0,
        )
        .unwrap();
        assert_eq!(
            unsigned.sign(&[&payer]).unwrap().serialize(),
            unsigned.sign(&[&payer]).unwrap().serialize()
        );
    }
}
