//! HTTP client for the hosted table store.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::gateway::{Filter, Gateway, GatewayError, Record};

/// How much response body to keep in error values and log lines.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for the hosted table store's REST interface.
///
/// Each call is a single request: no retry, no backoff. Every request is
/// logged under a generated request id so failures can be correlated with
/// the table store's own logs.
#[derive(Clone)]
pub struct TableClient {
    inner: Arc<TableClientInner>,
}

struct TableClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl TableClient {
    /// Create a new table-store client.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            inner: Arc::new(TableClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.expose_secret().to_string(),
            }),
        }
    }

    /// Build the endpoint URL for a table.
    fn endpoint(&self, table: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(&format!("rest/v1/{table}"))
            .map_err(|e| GatewayError::InvalidEndpoint(format!("{table}: {e}")))
    }

    /// Attach auth headers and a request id to a request builder.
    fn prepare(&self, request: reqwest::RequestBuilder, request_id: Uuid) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.inner.api_key)
            .header("Authorization", format!("Bearer {}", self.inner.api_key))
            .header("X-Request-Id", request_id.to_string())
    }

    /// Send a request and decode the JSON rows it returns.
    async fn fetch_rows(
        &self,
        table: &str,
        filter: &Filter,
        request_id: Uuid,
    ) -> Result<Vec<Record>, GatewayError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(table)?)
            .query(&filter.to_query_pairs());

        let response = self.prepare(request, request_id).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            tracing::error!(
                %request_id,
                table,
                status = %status,
                body = %snippet,
                "table store returned non-success status"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let rows: Vec<Record> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                %request_id,
                table,
                error = %e,
                body = %body.chars().take(BODY_SNIPPET_LEN).collect::<String>(),
                "failed to parse table store response"
            );
            GatewayError::Decode(e)
        })?;

        debug!(%request_id, table, rows = rows.len(), "query complete");
        Ok(rows)
    }
}

#[async_trait]
impl Gateway for TableClient {
    #[instrument(skip(self, filter), fields(table = %table))]
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Record, GatewayError> {
        let request_id = Uuid::new_v4();
        let filter = filter.clone().limit(1);
        let mut rows = self.fetch_rows(table, &filter, request_id).await?;

        if rows.is_empty() {
            return Err(GatewayError::NotFound(table.to_owned()));
        }
        Ok(rows.swap_remove(0))
    }

    #[instrument(skip(self, filter), fields(table = %table))]
    async fn query_many(
        &self,
        table: &str,
        filter: &Filter,
    ) -> Result<Vec<Record>, GatewayError> {
        let request_id = Uuid::new_v4();
        self.fetch_rows(table, filter, request_id).await
    }

    #[instrument(skip(self, patch), fields(table = %table, id = %id))]
    async fn update(&self, table: &str, id: i32, patch: Record) -> Result<(), GatewayError> {
        let request_id = Uuid::new_v4();
        let mut url = self.endpoint(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));

        let request = self
            .inner
            .client
            .patch(url)
            .header("Prefer", "return=minimal")
            .json(&patch);

        let response = self.prepare(request, request_id).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            tracing::error!(
                %request_id,
                table,
                id,
                status = %status,
                body = %snippet,
                "table store rejected update"
            );
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: snippet,
            });
        }

        debug!(%request_id, table, id, "update complete");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            base_url: Url::parse("https://tables.example.com/").unwrap(),
            api_key: SecretString::from("k3y-aB3xY9mK2nL5pQ7rT0uW4zC6"),
        }
    }

    #[test]
    fn test_endpoint_joins_table_path() {
        let client = TableClient::new(&test_config());
        let url = client.endpoint("products").unwrap();
        assert_eq!(url.as_str(), "https://tables.example.com/rest/v1/products");
    }
}
