//! Product listing types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clementine_core::{CurrencyCode, Price, ProductId};

/// A product row from the `products` table, as the listing pages use it.
///
/// The table stores the price as a decimal string and the currency as a
/// separate column defaulting to USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product's row id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price amount.
    pub price: Decimal,
    /// Price currency.
    #[serde(default)]
    pub currency: CurrencyCode,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    /// Listing category.
    #[serde(default)]
    pub category: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// The typed unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::new(self.price, self.currency)
    }
}
