//! # haulrate-audit: Negotiation Audit Log
//!
//! Every negotiation run through the API is appended here: who asked, for
//! which load, what went in, what came out, and whether it was applied.
//!
//! ## Properties
//!
//! - Append-only. There is no update or delete.
//! - Tamper-evident. Each record carries a SHA-256 digest chained to its
//!   predecessor ([`GENESIS_HASH`] for the first); [`NegotiationLog::verify_chain`]
//!   reports broken links.
//! - Payloads (`inputs`, `selected`, `fuel`, `breakdown`) are opaque JSON so
//!   the report shape can evolve without migrating stored records.
//!
//! Callers treat [`AuditError`] as non-fatal: a failed write is logged and
//! the negotiation response is returned unchanged.

pub mod error;
pub mod log;
pub mod record;

pub use error::AuditError;
pub use log::{verify_records, ChainIntegrity, MemoryNegotiationLog, NegotiationLog};
pub use record::{canonical_json, NegotiationRecord, NewNegotiationRecord, GENESIS_HASH};
