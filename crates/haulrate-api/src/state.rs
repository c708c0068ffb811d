//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! AppState holds:
//! - **Negotiation configuration**: policy defaults, mpg, deadhead buffer.
//! - **Resolvers**: fuel quotes and routed mileage, each behind provider
//!   traits so tests can inject stubs.
//! - **Loads**: the keyed read/update interface to load records.
//! - **Audit log**: append-only negotiation history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use haulrate_audit::{MemoryNegotiationLog, NegotiationLog};
use haulrate_core::{LoadRateUpdate, NegotiationConfig};
use haulrate_providers::{FuelCostResolver, RouteDistanceResolver};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot` and is never held across `.await`.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    data: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record, returning the previous value if the key existed.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.data.write().insert(id, value)
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, id: &Uuid, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(id)?;
        f(entry);
        Some(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Loads --------------------------------------------------------------------

/// A load as the negotiation service sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoadRecord {
    pub id: Uuid,
    /// Broker that owns the load. Scoped callers only see their own.
    pub broker_id: Option<String>,
    pub pickup_address: String,
    pub delivery_address: String,
    /// Explicit origin postal code; otherwise taken from `pickup_address`.
    pub origin_postal: Option<String>,
    /// Explicit destination postal code; otherwise taken from `delivery_address`.
    pub dest_postal: Option<String>,
    /// Driver pay written by an applied negotiation.
    pub driver_pay: Option<f64>,
    /// Fuel surcharge written by an applied negotiation.
    pub fuel_surcharge: Option<f64>,
    pub created_by: String,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed read/update access to loads.
pub trait LoadAccessor: Send + Sync {
    fn get(&self, id: Uuid) -> Option<LoadRecord>;

    fn insert(&self, load: LoadRecord);

    /// Write negotiated pay back to a load. Returns the updated load.
    fn apply_rate(&self, id: Uuid, update: LoadRateUpdate, actor_id: &str) -> Option<LoadRecord>;
}

impl LoadAccessor for Store<LoadRecord> {
    fn get(&self, id: Uuid) -> Option<LoadRecord> {
        Store::get(self, &id)
    }

    fn insert(&self, load: LoadRecord) {
        Store::insert(self, load.id, load);
    }

    fn apply_rate(&self, id: Uuid, update: LoadRateUpdate, actor_id: &str) -> Option<LoadRecord> {
        self.update(&id, |load| {
            load.driver_pay = Some(update.driver_pay);
            load.fuel_surcharge = Some(update.fuel_surcharge);
            load.updated_by = Some(actor_id.to_string());
            load.updated_at = Utc::now();
        })
    }
}

// -- Configuration --------------------------------------------------------------

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

impl AppConfig {
    /// `PORT` (default 8080) and `AUTH_TOKEN` (blank counts as unset).
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(8080);
        let auth_token = std::env::var("AUTH_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { port, auth_token }
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub negotiation: NegotiationConfig,
    pub fuel: FuelCostResolver,
    pub routes: RouteDistanceResolver,
    pub loads: Arc<dyn LoadAccessor>,
    pub audit: Arc<dyn NegotiationLog>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("negotiation", &self.negotiation)
            .field("fuel", &self.fuel)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State over in-memory loads and audit log.
    pub fn new(
        config: AppConfig,
        negotiation: NegotiationConfig,
        fuel: FuelCostResolver,
        routes: RouteDistanceResolver,
    ) -> Self {
        Self {
            config,
            negotiation,
            fuel,
            routes,
            loads: Arc::new(Store::<LoadRecord>::new()),
            audit: Arc::new(MemoryNegotiationLog::new()),
        }
    }

    pub fn with_loads(mut self, loads: Arc<dyn LoadAccessor>) -> Self {
        self.loads = loads;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn NegotiationLog>) -> Self {
        self.audit = audit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load() -> LoadRecord {
        let now = Utc::now();
        LoadRecord {
            id: Uuid::new_v4(),
            broker_id: Some("broker-1".into()),
            pickup_address: "Dallas, TX 75201".into(),
            delivery_address: "Houston, TX 77002".into(),
            origin_postal: None,
            dest_postal: None,
            driver_pay: None,
            fuel_surcharge: None,
            created_by: "dispatcher-1".into(),
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn store_update_returns_none_for_missing() {
        let store: Store<LoadRecord> = Store::new();
        assert!(store.update(&Uuid::new_v4(), |_| {}).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn apply_rate_stamps_actor() {
        let store: Store<LoadRecord> = Store::new();
        let record = load();
        let id = record.id;
        LoadAccessor::insert(&store, record);

        let updated = store
            .apply_rate(
                id,
                LoadRateUpdate {
                    driver_pay: 2125.0,
                    fuel_surcharge: 0.0,
                },
                "dispatcher-9",
            )
            .unwrap();
        assert_eq!(updated.driver_pay, Some(2125.0));
        assert_eq!(updated.fuel_surcharge, Some(0.0));
        assert_eq!(updated.updated_by.as_deref(), Some("dispatcher-9"));
        assert_eq!(LoadAccessor::get(&store, id), Some(updated));
    }

    #[test]
    fn app_config_debug_redacts_token() {
        let cfg = AppConfig {
            port: 9000,
            auth_token: Some("hunter2".into()),
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
