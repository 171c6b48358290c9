//! The ledger: signed-transaction front end over the [`Registry`].
//!
//! Every accepted transaction is appended to a hash-chained journal together
//! with the state root it produced. The journal also carries the ledger
//! configuration, so any observer holding it can re-derive every tally and
//! check it against the recorded roots without outside knowledge.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{Error, Event, Hash, Identity, LedgerConfig, Output, Registry, Result, Transaction};

/// What the submitter of an accepted transaction gets back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_id: Hash,
    pub sequence: u64,
    pub sender: Identity,
    pub output: Output,
    pub events: Vec<Event>,
    pub state_root: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub transaction: Transaction,
    pub prev_hash: Hash,
    /// Registry state root after applying the transaction.
    pub state_root: Hash,
    pub hash: Hash,
}

impl JournalEntry {
    fn compute_hash(sequence: u64, tx_id: &Hash, prev_hash: &Hash, state_root: &Hash) -> Hash {
        Hash::of_parts(&[
            &sequence.to_be_bytes(),
            tx_id.as_bytes(),
            prev_hash.as_bytes(),
            state_root.as_bytes(),
        ])
    }
}

/// Append-only, hash-chained record of accepted transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Rules the entries were accepted under. Covered by every state root.
    config: LedgerConfig,
    entries: Vec<JournalEntry>,
}

impl Journal {
    fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of the latest entry, or [`Hash::ZERO`] when empty.
    pub fn head(&self) -> Hash {
        self.entries.last().map_or(Hash::ZERO, |e| e.hash)
    }

    fn append(&mut self, transaction: Transaction, state_root: Hash) -> &JournalEntry {
        let sequence = self.entries.len() as u64;
        let prev_hash = self.head();
        let hash = JournalEntry::compute_hash(sequence, &transaction.id, &prev_hash, &state_root);

        self.entries.push(JournalEntry {
            sequence,
            transaction,
            prev_hash,
            state_root,
            hash,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Check sequence numbers, chain links, entry hashes and signatures.
    ///
    /// State roots are only checked by [`Ledger::replay`], which re-executes.
    pub fn verify(&self) -> Result<()> {
        let mut prev = Hash::ZERO;

        for (index, entry) in self.entries.iter().enumerate() {
            verify_entry(index as u64, entry, &prev)?;
            prev = entry.hash;
        }

        Ok(())
    }
}

fn verify_entry(expected_sequence: u64, entry: &JournalEntry, prev: &Hash) -> Result<()> {
    let corrupted = |reason: &str| Error::JournalCorrupted {
        sequence: expected_sequence,
        reason: reason.to_string(),
    };

    if entry.sequence != expected_sequence {
        return Err(corrupted("sequence gap"));
    }
    if &entry.prev_hash != prev {
        return Err(corrupted("broken chain link"));
    }

    let tx_id = entry.transaction.compute_id()?;
    let hash = JournalEntry::compute_hash(entry.sequence, &tx_id, &entry.prev_hash, &entry.state_root);
    if hash != entry.hash {
        return Err(corrupted("entry hash mismatch"));
    }

    entry
        .transaction
        .verify()
        .map_err(|_| corrupted("bad transaction signature"))
}

/// Registry plus the replay guard and journal for signed submissions.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    registry: Registry,
    nonces: BTreeMap<Identity, u64>,
    journal: Journal,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        Ok(Self {
            registry: Registry::new(config.clone())?,
            nonces: BTreeMap::new(),
            journal: Journal::new(config),
        })
    }

    /// Read access for queries. Mutation goes through [`Ledger::submit`] only.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// The nonce the sender's next transaction must carry.
    pub fn next_nonce(&self, sender: &Identity) -> u64 {
        self.nonces.get(sender).copied().unwrap_or(0)
    }

    /// Verify, replay-check and apply one transaction.
    ///
    /// A rejected transaction leaves registry, nonces and journal untouched.
    pub fn submit(&mut self, mut tx: Transaction) -> Result<Receipt> {
        tx.refresh_id()?;

        tx.verify()
            .inspect_err(|_| warn!(tx_id = %tx.id, "rejecting transaction with invalid signature"))?;

        let sender = tx.sender_identity()?;
        let expected = self.next_nonce(&sender);
        if tx.nonce != expected {
            warn!(tx_id = %tx.id, %sender, expected, got = tx.nonce, "rejecting transaction with wrong nonce");
            return Err(Error::NonceMismatch {
                sender,
                expected,
                got: tx.nonce,
            });
        }

        // The registry leaves itself untouched on rejection.
        let outcome = self.registry.execute(&sender, &tx.operation)?;
        let state_root = self.registry.state_root()?;

        self.nonces.insert(sender.clone(), expected + 1);
        let tx_id = tx.id;
        let entry = self.journal.append(tx, state_root);

        info!(sequence = entry.sequence, %tx_id, %sender, "transaction applied");

        Ok(Receipt {
            tx_id,
            sequence: entry.sequence,
            sender,
            output: outcome.value,
            events: outcome.events,
            state_root,
        })
    }

    /// Rebuild a ledger from a journal under the configuration it records,
    /// re-executing every transaction and checking each recorded state root.
    pub fn replay(journal: &Journal) -> Result<Self> {
        let mut ledger = Self::new(journal.config.clone()).map_err(|e| Error::JournalCorrupted {
            sequence: 0,
            reason: format!("unusable configuration: {e}"),
        })?;

        for entry in journal.entries.iter().cloned() {
            let sequence = ledger.journal.len() as u64;
            verify_entry(sequence, &entry, &ledger.journal.head())?;

            let receipt = ledger.submit(entry.transaction).map_err(|e| Error::JournalCorrupted {
                sequence,
                reason: format!("transaction rejected on replay: {e}"),
            })?;

            if receipt.state_root != entry.state_root {
                warn!(sequence, "replayed state root diverges from journal");
                return Err(Error::JournalCorrupted {
                    sequence,
                    reason: "state root mismatch".to_string(),
                });
            }
        }

        debug!(entries = ledger.journal.len(), "journal replayed");
        Ok(ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Operation};
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn create(title: &str) -> Operation {
        Operation::CreatePoll {
            title: title.into(),
            candidates: vec!["A".into(), "B".into()],
        }
    }

    #[test]
    fn submit_appends_to_journal() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();

        let receipt = ledger
            .submit(Transaction::new(create("Poll"), 0, &key).unwrap())
            .unwrap();

        assert_eq!(receipt.sequence, 0);
        assert_eq!(receipt.output, Output::PollCreated { poll_id: 1 });
        assert_eq!(ledger.journal().len(), 1);
        assert_eq!(ledger.journal().head(), ledger.journal().entries()[0].hash);
        assert_eq!(receipt.state_root, ledger.registry().state_root().unwrap());
        assert_eq!(ledger.next_nonce(&receipt.sender), 1);
    }

    #[test]
    fn replayed_transaction_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();
        let tx = Transaction::new(create("Poll"), 0, &key).unwrap();

        ledger.submit(tx.clone()).unwrap();
        let err = ledger.submit(tx).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NonceMismatch);
        assert_eq!(ledger.registry().polls_count(), 1);
        assert_eq!(ledger.journal().len(), 1);
    }

    #[test]
    fn rejected_operation_keeps_nonce() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();
        let sender = Identity::from_public_key(&key.verifying_key());

        let bad = Operation::ClosePoll { poll_id: 4 };
        let err = ledger
            .submit(Transaction::new(bad, 0, &key).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(ledger.next_nonce(&sender), 0);
        assert!(ledger.journal().is_empty());

        assert!(ledger.submit(Transaction::new(create("Poll"), 0, &key).unwrap()).is_ok());
    }

    #[test]
    fn forged_signature_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();
        let mut tx = Transaction::new(create("Poll"), 0, &key).unwrap();
        tx.signature[0] ^= 0xFF;

        assert_eq!(ledger.submit(tx).unwrap_err().kind(), ErrorKind::InvalidSignature);
        assert_eq!(ledger.registry().polls_count(), 0);
    }

    #[test]
    fn journal_verifies_and_detects_tampering() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();
        ledger.submit(Transaction::new(create("One"), 0, &key).unwrap()).unwrap();
        ledger.submit(Transaction::new(create("Two"), 1, &key).unwrap()).unwrap();
        assert!(ledger.journal().verify().is_ok());

        let mut tampered = ledger.journal().clone();
        tampered.entries[1].state_root = Hash::of(b"forged");
        assert_eq!(tampered.verify().unwrap_err().kind(), ErrorKind::JournalCorrupted);

        let mut reordered = ledger.journal().clone();
        reordered.entries.swap(0, 1);
        assert!(reordered.verify().is_err());
    }

    #[test]
    fn replay_reproduces_state() {
        let alice = SigningKey::generate(&mut OsRng);
        let bob = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();

        ledger.submit(Transaction::new(create("Poll"), 0, &alice).unwrap()).unwrap();
        let vote = Operation::Vote {
            poll_id: 1,
            candidate_id: 2,
        };
        ledger.submit(Transaction::new(vote, 0, &bob).unwrap()).unwrap();

        let rebuilt = Ledger::replay(ledger.journal()).unwrap();

        assert_eq!(
            rebuilt.registry().state_root().unwrap(),
            ledger.registry().state_root().unwrap()
        );
        assert_eq!(rebuilt.journal().head(), ledger.journal().head());
        assert_eq!(rebuilt.registry().candidate(1, 2).unwrap().vote_count, 1);
    }

    #[test]
    fn replay_detects_forged_root() {
        let key = SigningKey::generate(&mut OsRng);
        let mut ledger = Ledger::default();
        ledger.submit(Transaction::new(create("Poll"), 0, &key).unwrap()).unwrap();

        let mut journal = ledger.journal().clone();
        let forged_root = Hash::of(b"forged");
        let entry = &mut journal.entries[0];
        entry.state_root = forged_root;
        entry.hash = JournalEntry::compute_hash(0, &entry.transaction.id, &Hash::ZERO, &forged_root);

        let err = Ledger::replay(&journal).unwrap_err();
        assert!(matches!(err, Error::JournalCorrupted { sequence: 0, .. }));
    }

    fn moderated() -> (SigningKey, LedgerConfig) {
        let admin = SigningKey::generate(&mut OsRng);
        let config = LedgerConfig {
            admins: vec![Identity::from_public_key(&admin.verifying_key())],
            ..LedgerConfig::default()
        };
        (admin, config)
    }

    #[test]
    fn new_rejects_unusable_config() {
        let mut config = LedgerConfig::default();
        config.limits.min_candidates = 1;
        assert_eq!(Ledger::new(config).unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn replay_honours_recorded_admins() {
        let creator = SigningKey::generate(&mut OsRng);
        let (admin, config) = moderated();
        let mut ledger = Ledger::new(config.clone()).unwrap();

        ledger.submit(Transaction::new(create("Poll"), 0, &creator).unwrap()).unwrap();
        let close = Operation::ClosePoll { poll_id: 1 };
        ledger.submit(Transaction::new(close, 0, &admin).unwrap()).unwrap();

        assert_eq!(ledger.journal().config(), &config);
        let rebuilt = Ledger::replay(ledger.journal()).unwrap();
        assert!(!rebuilt.registry().poll(1).unwrap().active);
        assert_eq!(
            rebuilt.registry().state_root().unwrap(),
            ledger.registry().state_root().unwrap()
        );
    }

    #[test]
    fn replay_detects_rewritten_config() {
        let (admin, config) = moderated();
        let mut ledger = Ledger::new(config).unwrap();
        ledger.submit(Transaction::new(create("Poll"), 0, &admin).unwrap()).unwrap();

        // Same acceptance, different rules: the recorded roots no longer match.
        let mut journal = ledger.journal().clone();
        journal.config.admins.clear();
        let err = Ledger::replay(&journal).unwrap_err();
        assert!(matches!(err, Error::JournalCorrupted { sequence: 0, .. }));
    }
}
