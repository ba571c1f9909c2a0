//! Page-level data fetchers.
//!
//! The product grid, product detail page, and checkout footer read
//! through here. Every call crosses the fail-soft boundary: a gateway
//! failure is logged and the page renders from the default value instead
//! of blocking.

use std::sync::Arc;

use tracing::instrument;

use clementine_core::ProductId;

use crate::gateway::{Filter, Gateway, GatewayError, Record};
use crate::models::Product;
use crate::policy::FailSoft;

const PRODUCTS_TABLE: &str = "products";
const PAYMENT_METHODS_TABLE: &str = "payment_methods";

/// Fetchers over the product and payment-method tables.
#[derive(Clone)]
pub struct Catalog {
    gateway: Arc<dyn Gateway>,
    policy: FailSoft,
}

impl Catalog {
    /// Build a catalog over the injected gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            policy: FailSoft,
        }
    }

    /// All products. Empty on gateway failure.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Vec<Product> {
        let result = self.fetch_products(Filter::new()).await;
        self.policy.recover("list_products", result)
    }

    /// Products in one category. Empty on gateway failure.
    #[instrument(skip(self))]
    pub async fn list_products_in(&self, category: &str) -> Vec<Product> {
        let result = self.fetch_products(Filter::new().eq("category", category)).await;
        self.policy.recover("list_products_in", result)
    }

    /// Products whose name matches `pattern`, case-insensitively.
    /// Empty on gateway failure.
    #[instrument(skip(self))]
    pub async fn search_products(&self, pattern: &str) -> Vec<Product> {
        let filter = Filter::new().ilike("name", format!("%{pattern}%"));
        let result = self.fetch_products(filter).await;
        self.policy.recover("search_products", result)
    }

    /// One product by id. Absent on gateway failure or no match.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        let result = self
            .gateway
            .query_one(PRODUCTS_TABLE, &Filter::new().eq("id", id.as_i32()))
            .await
            .and_then(|row| serde_json::from_value::<Product>(row).map_err(Into::into))
            .map(Some);
        self.policy.recover("product", result)
    }

    /// Payment-method rows, passed through unchanged - their shape
    /// belongs to the payment provider. Empty on gateway failure.
    #[instrument(skip(self))]
    pub async fn payment_methods(&self) -> Vec<Record> {
        let result = self
            .gateway
            .query_many(PAYMENT_METHODS_TABLE, &Filter::new())
            .await;
        self.policy.recover("payment_methods", result)
    }

    /// Patch a product row (admin side). False on gateway failure.
    #[instrument(skip(self, patch))]
    pub async fn update_product(&self, id: ProductId, patch: Record) -> bool {
        let result = self
            .gateway
            .update(PRODUCTS_TABLE, id.as_i32(), patch)
            .await
            .map(|()| true);
        self.policy.recover_or("update_product", result, false)
    }

    async fn fetch_products(&self, filter: Filter) -> Result<Vec<Product>, GatewayError> {
        let rows = self.gateway.query_many(PRODUCTS_TABLE, &filter).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    /// Gateway fake that either serves fixed product rows or fails.
    struct TestGateway {
        rows: Vec<Record>,
        failing: bool,
    }

    #[async_trait]
    impl Gateway for TestGateway {
        async fn query_one(&self, table: &str, filter: &Filter) -> Result<Record, GatewayError> {
            let rows = self.query_many(table, filter).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| GatewayError::NotFound(table.to_owned()))
        }

        async fn query_many(
            &self,
            _table: &str,
            filter: &Filter,
        ) -> Result<Vec<Record>, GatewayError> {
            if self.failing {
                return Err(GatewayError::Status {
                    status: 502,
                    body: "bad gateway".to_owned(),
                });
            }
            Ok(self
                .rows
                .iter()
                .filter(|row| filter.matches(row))
                .cloned()
                .collect())
        }

        async fn update(&self, _table: &str, _id: i32, _patch: Record) -> Result<(), GatewayError> {
            if self.failing {
                return Err(GatewayError::Status {
                    status: 502,
                    body: "bad gateway".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn product_rows() -> Vec<Record> {
        vec![
            json!({"id": 1, "name": "Earl Grey", "price": "14.50", "category": "tea"}),
            json!({"id": 2, "name": "Ceramic Mug", "price": "22.00", "category": "kitchen"}),
            json!({"id": 3, "name": "Green Tea Sampler", "price": "18.00", "category": "tea"}),
        ]
    }

    fn catalog(rows: Vec<Record>, failing: bool) -> Catalog {
        Catalog::new(Arc::new(TestGateway { rows, failing }))
    }

    #[tokio::test]
    async fn test_list_products() {
        let catalog = catalog(product_rows(), false);
        assert_eq!(catalog.list_products().await.len(), 3);
    }

    #[tokio::test]
    async fn test_list_products_in_category() {
        let catalog = catalog(product_rows(), false);
        let teas = catalog.list_products_in("tea").await;
        assert_eq!(teas.len(), 2);
        assert!(teas.iter().all(|p| p.category == "tea"));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let catalog = catalog(product_rows(), false);
        let hits = catalog.search_products("TEA").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Green Tea Sampler");
    }

    #[tokio::test]
    async fn test_product_by_id() {
        let catalog = catalog(product_rows(), false);
        let product = catalog.product(ProductId::new(2)).await.unwrap();
        assert_eq!(product.name, "Ceramic Mug");

        assert!(catalog.product(ProductId::new(99)).await.is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_empty() {
        let catalog = catalog(product_rows(), true);
        assert!(catalog.list_products().await.is_empty());
        assert!(catalog.product(ProductId::new(1)).await.is_none());
        assert!(catalog.payment_methods().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_falls_back_to_empty() {
        let catalog = catalog(vec![json!({"id": "not-a-number"})], false);
        assert!(catalog.list_products().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_product_maps_result_to_bool() {
        let catalog = catalog(vec![], false);
        assert!(catalog.update_product(ProductId::new(1), json!({"price": "9.99"})).await);

        let catalog = catalog_failing();
        assert!(!catalog.update_product(ProductId::new(1), json!({"price": "9.99"})).await);
    }

    fn catalog_failing() -> Catalog {
        catalog(vec![], true)
    }
}
