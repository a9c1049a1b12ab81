//! In-Memory Store
//!
//! Backs unit/integration tests and `mock-api` dev runs. Same contract as
//! the PostgreSQL store, including the replace-on-aborted create semantics.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::RelayError;
use super::machine::TxState;
use super::store::{LockFlag, LockStore, RecordStore};
use super::types::{PartyRef, RecordPatch, TransferRecord};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, TransferRecord>>,
    locks: Mutex<HashMap<String, LockFlag>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, unordered. Test helper.
    pub fn dump(&self) -> Vec<TransferRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Number of stored records. Test helper.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, record: &TransferRecord) -> Result<(), RelayError> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&record.id)
            && !existing.machine.matches(TxState::Aborted)
        {
            return Err(RelayError::DuplicateRecord(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TransferRecord>, RelayError> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<(), RelayError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| RelayError::RecordNotFound(id.to_string()))?;
        if let Some(machine) = patch.machine {
            record.machine = machine;
        }
        if let Some(sent_at) = patch.sent_at {
            record.sent_at = Some(sent_at);
        }
        if let Some(synced) = patch.synced {
            record.synced = Some(synced);
        }
        Ok(())
    }

    async fn unresolved(&self) -> Result<Vec<TransferRecord>, RelayError> {
        let records = self.records.lock().unwrap();
        let mut open: Vec<TransferRecord> = records
            .values()
            .filter(|r| !r.machine.matches(TxState::Success))
            .cloned()
            .collect();
        open.sort_by(|a, b| (a.sender.key(), a.nonce).cmp(&(b.sender.key(), b.nonce)));
        Ok(open)
    }

    async fn for_sender(&self, sender: &PartyRef) -> Result<Vec<TransferRecord>, RelayError> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<TransferRecord> = records
            .values()
            .filter(|r| r.sender == *sender)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.nonce);
        Ok(matching)
    }

    async fn max_nonce(&self, sender: &PartyRef) -> Result<Option<u64>, RelayError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| r.sender == *sender)
            .map(|r| r.nonce)
            .max())
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn get_lock(&self, name: &str) -> Result<Option<LockFlag>, RelayError> {
        Ok(self.locks.lock().unwrap().get(name).cloned())
    }

    async fn set_lock(&self, name: &str, locked: bool) -> Result<(), RelayError> {
        let mut locks = self.locks.lock().unwrap();
        let entry = locks.entry(name.to_string()).or_insert(LockFlag {
            locked: false,
            locked_at: None,
        });
        entry.locked = locked;
        if locked {
            entry.locked_at = Some(chrono::Utc::now().timestamp_millis());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::machine::{TxEvent, TxMachine};

    fn record(id: &str, sender: PartyRef, nonce: u64) -> TransferRecord {
        TransferRecord::new(
            id.to_string(),
            sender,
            PartyRef::external("0xfeedfeedfeedfeedfeedfeedfeedfeedfeedfeed"),
            500,
            "0x0000000000000000000000000000000000000001".to_string(),
            vec![0u8; 4],
            nonce,
        )
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let store = MemoryStore::new();
        store
            .create(&record("jti-1", PartyRef::Internal(1), 0))
            .await
            .unwrap();

        let err = store
            .create(&record("jti-1", PartyRef::Internal(1), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::DuplicateRecord(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_create_replaces_aborted() {
        let store = MemoryStore::new();
        let mut aborted = record("jti-1", PartyRef::Internal(1), 0);
        aborted.machine = TxMachine::new().transition(
            &TxEvent::Abort {
                reason: "bad receiver".into(),
            },
            5,
        );
        store.create(&aborted).await.unwrap();

        // A fresh intent with the same jti supersedes the aborted record
        store
            .create(&record("jti-1", PartyRef::Internal(1), 1))
            .await
            .unwrap();
        let replaced = store.get("jti-1").await.unwrap().unwrap();
        assert_eq!(replaced.nonce, 1);
        assert_eq!(replaced.machine.retries, 0);
    }

    #[tokio::test]
    async fn test_unresolved_excludes_success_and_sorts() {
        let store = MemoryStore::new();
        let sender = PartyRef::Internal(1);

        let mut done = record("jti-0", sender.clone(), 0);
        done.machine = done
            .machine
            .transition(
                &TxEvent::Submitted {
                    hash: "0xa".into(),
                },
                5,
            )
            .transition(
                &TxEvent::Mined {
                    hash: "0xb".into(),
                },
                5,
            );
        store.create(&done).await.unwrap();
        store.create(&record("jti-2", sender.clone(), 2)).await.unwrap();
        store.create(&record("jti-1", sender.clone(), 1)).await.unwrap();

        let open = store.unresolved().await.unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].nonce, 1);
        assert_eq!(open[1].nonce, 2);
    }

    #[tokio::test]
    async fn test_max_nonce_per_sender() {
        let store = MemoryStore::new();
        assert_eq!(store.max_nonce(&PartyRef::Internal(1)).await.unwrap(), None);

        store.create(&record("a", PartyRef::Internal(1), 0)).await.unwrap();
        store.create(&record("b", PartyRef::Internal(1), 1)).await.unwrap();
        store.create(&record("c", PartyRef::Internal(2), 0)).await.unwrap();

        assert_eq!(
            store.max_nonce(&PartyRef::Internal(1)).await.unwrap(),
            Some(1)
        );
        assert_eq!(
            store.max_nonce(&PartyRef::Internal(2)).await.unwrap(),
            Some(0)
        );
    }

    #[tokio::test]
    async fn test_lock_flag_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get_lock("pending").await.unwrap().is_none());

        store.set_lock("pending", true).await.unwrap();
        let flag = store.get_lock("pending").await.unwrap().unwrap();
        assert!(flag.locked);
        assert!(flag.locked_at.is_some());

        store.set_lock("pending", false).await.unwrap();
        let flag = store.get_lock("pending").await.unwrap().unwrap();
        assert!(!flag.locked);
    }
}
