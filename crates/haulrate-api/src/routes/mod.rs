//! # API Route Modules
//!
//! - `policy`: the active negotiation policy and mileage settings.
//! - `fuel`: fuel quote diagnostics.
//! - `loads`: load registration and lookup, scoped to the caller's broker.
//! - `negotiate`: rate negotiation, write-back, and the negotiation history.
//! - `mileage`: routed-mileage auto-resolution for a load.
//! - `audit`: hash-chain verification of the negotiation log.

pub mod audit;
pub mod fuel;
pub mod loads;
pub mod mileage;
pub mod negotiate;
pub mod policy;
