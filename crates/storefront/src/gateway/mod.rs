//! Remote Data Gateway - pass-through access to the hosted table store.
//!
//! # Architecture
//!
//! - [`Gateway`] is the seam every store and page fetcher goes through;
//!   tests inject scripted implementations
//! - [`TableClient`] speaks the table store's REST dialect over `reqwest`
//! - Rows are opaque [`Record`]s; typed call sites deserialize
//! - No retry, no backoff, no partial-failure recovery: a failed call is
//!   logged at the call site and converted to a default result there
//!
//! # Example
//!
//! ```rust,ignore
//! use clementine_storefront::gateway::{Filter, Gateway, TableClient};
//!
//! let client = TableClient::new(&config.gateway);
//!
//! let rows = client
//!     .query_many("products", &Filter::new().eq("category", "tea"))
//!     .await?;
//! ```

mod client;
mod filter;

pub use client::TableClient;
pub use filter::Filter;

use async_trait::async_trait;
use thiserror::Error;

/// An opaque row returned by the table store.
///
/// Column shapes belong to the remote schema; call sites that care
/// deserialize into their own types.
pub type Record = serde_json::Value;

/// Errors that can occur when talking to the table store.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The table store answered with a non-success status.
    #[error("gateway returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// Response body failed to parse as JSON rows.
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A table name produced an invalid endpoint URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The query matched no row.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Query/update interface against the hosted table store.
///
/// Object-safe so stores can hold `Arc<dyn Gateway>` and tests can swap
/// in scripted fakes.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch the first row matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] when no row matches, or another
    /// variant when the query itself fails.
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Record, GatewayError>;

    /// Fetch all rows matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the query fails. An empty match is
    /// an empty vector, not an error.
    async fn query_many(&self, table: &str, filter: &Filter)
    -> Result<Vec<Record>, GatewayError>;

    /// Patch the row with the given `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] when the write is rejected or the
    /// transport fails.
    async fn update(&self, table: &str, id: i32, patch: Record) -> Result<(), GatewayError>;
}
