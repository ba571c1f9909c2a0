//! Integration tests for Clementine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p clementine-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_flow` - Login/logout, expiry, cross-tab convergence
//! - `cart_behavior` - Cart line dedup, quantity clamping
//! - `favorites_persistence` - Durable set behavior, malformed state
//! - `gateway_fallback` - Fail-soft policy at the page-fetch boundary
//!
//! Everything runs against a scripted in-memory gateway and in-memory
//! storage; no network, no real table store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

use clementine_storefront::config::{GatewayConfig, StorefrontConfig};
use clementine_storefront::gateway::{Filter, Gateway, GatewayError, Record};

/// A gateway whose tables are scripted by the test.
///
/// Supports the same matching semantics the stores rely on remotely:
/// equality and case-insensitive pattern filters. `set_failing(true)`
/// simulates a table-store outage on every subsequent call.
#[derive(Default)]
pub struct ScriptedGateway {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    failing: AtomicBool,
}

impl ScriptedGateway {
    /// An empty gateway (every lookup misses).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows of one table.
    pub fn script_table(&self, table: &str, rows: Vec<Record>) {
        self.lock_tables().insert(table.to_owned(), rows);
    }

    /// Mutate one row in place, selected by its `id` column.
    pub fn edit_row(&self, table: &str, id: i32, edit: impl FnOnce(&mut Record)) {
        let mut tables = self.lock_tables();
        if let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == json!(id)))
        {
            edit(row);
        }
    }

    /// Toggle outage mode.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GatewayError::Status {
                status: 503,
                body: "service unavailable".to_owned(),
            });
        }
        Ok(())
    }

    fn lock_tables(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Record>>> {
        self.tables
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Record, GatewayError> {
        self.check_available()?;
        self.lock_tables()
            .get(table)
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)).cloned())
            .ok_or_else(|| GatewayError::NotFound(table.to_owned()))
    }

    async fn query_many(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, GatewayError> {
        self.check_available()?;
        Ok(self
            .lock_tables()
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update(&self, table: &str, id: i32, patch: Record) -> Result<(), GatewayError> {
        self.check_available()?;
        let mut tables = self.lock_tables();
        let Some(row) = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == json!(id)))
        else {
            return Err(GatewayError::NotFound(table.to_owned()));
        };

        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (column, value) in fields {
                target.insert(column.clone(), value.clone());
            }
        }
        Ok(())
    }
}

/// A config pointing nowhere real; collaborator-injected tests never
/// dial the gateway URL.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        gateway: GatewayConfig {
            base_url: Url::parse("https://tables.invalid/").expect("static test URL"),
            api_key: SecretString::from("k3y-aB3xY9mK2nL5pQ7rT0uW4zC6"),
        },
        storage_dir: PathBuf::from(".clementine-test"),
        admin_session_ttl_hours: 24,
    }
}

/// A standard active customer row.
#[must_use]
pub fn customer_row() -> Record {
    json!({
        "id": 7,
        "email": "user@x.com",
        "name": "Sam",
        "phone": "555-0100",
        "address": "12 Orchard Lane",
        "status": "active",
        "password": "hunter2"
    })
}

/// A standard active admin row.
#[must_use]
pub fn admin_row() -> Record {
    json!({
        "id": 1,
        "email": "admin@x.com",
        "name": "Riley",
        "status": "active",
        "password": "letmein"
    })
}

/// A small product listing.
#[must_use]
pub fn product_rows() -> Vec<Record> {
    vec![
        json!({
            "id": 1,
            "name": "Earl Grey Loose Leaf",
            "price": "14.50",
            "image": "https://cdn.example.com/earl-grey.jpg",
            "category": "tea"
        }),
        json!({
            "id": 2,
            "name": "Ceramic Mug",
            "price": "22.00",
            "image": "https://cdn.example.com/mug.jpg",
            "category": "kitchen"
        }),
        json!({
            "id": 3,
            "name": "Green Tea Sampler",
            "price": "18.00",
            "image": "https://cdn.example.com/sampler.jpg",
            "category": "tea"
        }),
    ]
}
