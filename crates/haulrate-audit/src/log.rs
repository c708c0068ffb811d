//! The negotiation log interface and its in-memory backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuditError;
use crate::record::{NegotiationRecord, NewNegotiationRecord, GENESIS_HASH};

/// Append-only store of negotiation records.
#[async_trait]
pub trait NegotiationLog: Send + Sync {
    /// Append a record and return its id.
    async fn append(&self, record: NewNegotiationRecord) -> Result<Uuid, AuditError>;

    /// Records for one load, newest first, at most `limit`.
    async fn list_for_load(&self, load_id: Uuid, limit: usize) -> Result<Vec<NegotiationRecord>, AuditError>;

    /// Walk the whole chain and check every link and digest.
    async fn verify_chain(&self) -> Result<ChainIntegrity, AuditError>;
}

/// Result of chain verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIntegrity {
    pub total_records: usize,
    /// Records whose `previous_hash` does not match their predecessor, or
    /// whose own digest no longer matches their contents.
    pub broken_links: usize,
    pub chain_valid: bool,
}

/// Check a chain given in append order.
pub fn verify_records(records: &[NegotiationRecord]) -> ChainIntegrity {
    let mut broken_links = 0;
    let mut expected_prev: &str = GENESIS_HASH;

    for record in records {
        if record.previous_hash != expected_prev || !record.hash_is_valid() {
            broken_links += 1;
        }
        expected_prev = record.record_hash.as_str();
    }

    ChainIntegrity {
        total_records: records.len(),
        broken_links,
        chain_valid: broken_links == 0,
    }
}

/// In-memory log. Cloning shares the chain.
#[derive(Debug, Clone, Default)]
pub struct MemoryNegotiationLog {
    records: Arc<RwLock<Vec<NegotiationRecord>>>,
}

impl MemoryNegotiationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of the whole chain in append order.
    pub fn snapshot(&self) -> Vec<NegotiationRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl NegotiationLog for MemoryNegotiationLog {
    async fn append(&self, record: NewNegotiationRecord) -> Result<Uuid, AuditError> {
        let mut records = self.records.write();
        let previous_hash = records
            .last()
            .map(|r| r.record_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let sequence = records.len() as u64 + 1;

        let sealed = NegotiationRecord::seal(record, sequence, &previous_hash, Utc::now());
        let id = sealed.id;
        tracing::debug!(
            audit_id = %id,
            load_id = %sealed.load_id,
            sequence,
            "negotiation recorded"
        );
        records.push(sealed);
        Ok(id)
    }

    async fn list_for_load(&self, load_id: Uuid, limit: usize) -> Result<Vec<NegotiationRecord>, AuditError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .filter(|r| r.load_id == load_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn verify_chain(&self) -> Result<ChainIntegrity, AuditError> {
        Ok(verify_records(&self.records.read()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(load_id: Uuid, applied: bool) -> NewNegotiationRecord {
        NewNegotiationRecord {
            load_id,
            actor_id: "actor-1".into(),
            broker_id: None,
            applied,
            override_reason: None,
            inputs: serde_json::json!({}),
            selected: serde_json::json!({}),
            fuel: serde_json::json!({}),
            breakdown: serde_json::json!({}),
            warnings: vec!["Driver CPM exceeds threshold".into()],
        }
    }

    #[tokio::test]
    async fn append_chains_records() {
        let log = MemoryNegotiationLog::new();
        let load = Uuid::new_v4();
        log.append(entry(load, false)).await.unwrap();
        log.append(entry(load, true)).await.unwrap();

        let chain = log.snapshot();
        assert_eq!(chain[0].sequence, 1);
        assert_eq!(chain[0].previous_hash, GENESIS_HASH);
        assert_eq!(chain[1].sequence, 2);
        assert_eq!(chain[1].previous_hash, chain[0].record_hash);

        let integrity = log.verify_chain().await.unwrap();
        assert_eq!(integrity.total_records, 2);
        assert!(integrity.chain_valid);
    }

    #[tokio::test]
    async fn lists_newest_first_filtered_and_limited() {
        let log = MemoryNegotiationLog::new();
        let load = Uuid::new_v4();
        let other = Uuid::new_v4();
        let first = log.append(entry(load, false)).await.unwrap();
        log.append(entry(other, false)).await.unwrap();
        let third = log.append(entry(load, true)).await.unwrap();

        let all = log.list_for_load(load, 20).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![third, first]);

        let one = log.list_for_load(load, 1).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].id, third);

        assert!(log.list_for_load(load, 0).await.unwrap().is_empty());
        assert!(log.list_for_load(Uuid::new_v4(), 20).await.unwrap().is_empty());
    }

    #[test]
    fn detects_edited_and_relinked_records() {
        let at = Utc::now();
        let load = Uuid::new_v4();
        let a = NegotiationRecord::seal(entry(load, false), 1, GENESIS_HASH, at);
        let b = NegotiationRecord::seal(entry(load, false), 2, &a.record_hash, at);
        let c = NegotiationRecord::seal(entry(load, false), 3, &b.record_hash, at);

        assert!(verify_records(&[a.clone(), b.clone(), c.clone()]).chain_valid);

        let mut edited = b.clone();
        edited.warnings.clear();
        let report = verify_records(&[a.clone(), edited, c.clone()]);
        assert_eq!(report.broken_links, 1);
        assert!(!report.chain_valid);

        let report = verify_records(&[a, c]);
        assert_eq!(report.total_records, 2);
        assert_eq!(report.broken_links, 1);
    }
}
