//! Audit records and their hash-chain digests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Previous-hash value of the first record in a chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A negotiation to be recorded. Payloads are opaque JSON so the report
/// shape can change without touching stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNegotiationRecord {
    pub load_id: Uuid,
    pub actor_id: String,
    pub broker_id: Option<String>,
    /// Whether the result was written back to the load.
    pub applied: bool,
    pub override_reason: Option<String>,
    pub inputs: serde_json::Value,
    pub selected: serde_json::Value,
    pub fuel: serde_json::Value,
    pub breakdown: serde_json::Value,
    pub warnings: Vec<String>,
}

/// A stored, chained audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegotiationRecord {
    pub id: Uuid,
    /// Position in the chain, starting at 1.
    pub sequence: u64,
    pub load_id: Uuid,
    pub actor_id: String,
    pub broker_id: Option<String>,
    pub applied: bool,
    pub override_reason: Option<String>,
    pub inputs: serde_json::Value,
    pub selected: serde_json::Value,
    pub fuel: serde_json::Value,
    pub breakdown: serde_json::Value,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub previous_hash: String,
    pub record_hash: String,
}

impl NegotiationRecord {
    /// Seal a new record onto the chain after `previous_hash`.
    pub fn seal(new: NewNegotiationRecord, sequence: u64, previous_hash: &str, created_at: DateTime<Utc>) -> Self {
        let mut record = Self {
            id: Uuid::new_v4(),
            sequence,
            load_id: new.load_id,
            actor_id: new.actor_id,
            broker_id: new.broker_id,
            applied: new.applied,
            override_reason: new.override_reason,
            inputs: new.inputs,
            selected: new.selected,
            fuel: new.fuel,
            breakdown: new.breakdown,
            warnings: new.warnings,
            created_at,
            previous_hash: previous_hash.to_string(),
            record_hash: String::new(),
        };
        record.record_hash = record.compute_hash();
        record
    }

    /// SHA-256 over [`Self::hash_preimage`], hex encoded.
    pub fn compute_hash(&self) -> String {
        Sha256::digest(self.hash_preimage().as_bytes())
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Canonical JSON of every field except `id` and `record_hash`. Each
    /// field sits under its own key, so no two records share a preimage.
    pub fn hash_preimage(&self) -> String {
        canonical_json(&serde_json::json!({
            "previous_hash": self.previous_hash,
            "sequence": self.sequence,
            "load_id": self.load_id,
            "actor_id": self.actor_id,
            "applied": self.applied,
            "broker_id": self.broker_id,
            "override_reason": self.override_reason,
            "inputs": self.inputs,
            "selected": self.selected,
            "fuel": self.fuel,
            "breakdown": self.breakdown,
            "warnings": self.warnings,
            "created_at": self.created_at.to_rfc3339(),
        }))
    }

    /// Whether the stored hash still matches the record contents.
    pub fn hash_is_valid(&self) -> bool {
        self.record_hash == self.compute_hash()
    }
}

/// Compact JSON with object keys sorted at every level.
pub fn canonical_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
