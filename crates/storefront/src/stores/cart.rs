//! In-memory cart store.
//!
//! The cart lives only for the lifetime of the process; a reload loses
//! all items. That is a deliberate choice, not an omission - there is no
//! durable mirror here.

use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clementine_core::{Price, ProductId};

use crate::models::Product;

/// One cart line: a product snapshot plus a quantity.
///
/// At most one line exists per product id; re-adding a product bumps the
/// existing line's quantity instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id this line refers to.
    pub id: ProductId,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub price: Price,
    /// Image URL for the cart row.
    pub image: String,
    /// Listing category.
    pub category: String,
    /// Number of units, always at least 1.
    pub quantity: u32,
}

impl CartItem {
    /// Price times quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.amount * Decimal::from(self.quantity)
    }
}

impl From<&Product> for CartItem {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.unit_price(),
            image: product.image.clone(),
            category: product.category.clone(),
            quantity: 1,
        }
    }
}

/// In-memory cart state holder.
///
/// Cheap `Clone`; all clones share the same line list. No upper bound is
/// enforced on quantity or cart size.
#[derive(Clone, Default)]
pub struct CartStore {
    items: Arc<RwLock<Vec<CartItem>>>,
}

impl CartStore {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item. An existing line with the same id gains one unit;
    /// otherwise the item is inserted as a fresh line with quantity 1.
    pub fn add_item(&self, item: CartItem) {
        let mut items = self.write();
        if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            items.push(CartItem {
                quantity: 1,
                ..item
            });
        }
    }

    /// Remove the line with the given id. No-op when absent.
    pub fn remove_item(&self, id: ProductId) {
        self.write().retain(|line| line.id != id);
    }

    /// Replace the quantity on an existing line, clamped to a minimum
    /// of 1. No-op when the id is absent.
    pub fn update_quantity(&self, id: ProductId, quantity: i64) {
        let clamped = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
        if let Some(line) = self.write().iter_mut().find(|line| line.id == id) {
            line.quantity = clamped;
        }
    }

    /// Empty the cart.
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Snapshot of the current lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read().clone()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Total unit count across all lines (the cart badge number).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.read()
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Sum of line totals. Lines are assumed to share one currency.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.read().iter().map(CartItem::line_total).sum()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CartItem>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CartItem>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, cents: i64) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            price: Price::from_cents(cents),
            image: String::new(),
            category: "tea".to_owned(),
            quantity: 1,
        }
    }

    #[test]
    fn test_repeated_add_increments_single_line() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));
        cart.add_item(item(1, 500));
        cart.add_item(item(1, 500));

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn test_add_forces_fresh_line_to_quantity_one() {
        let cart = CartStore::new();
        let mut oversized = item(1, 500);
        oversized.quantity = 9;
        cart.add_item(oversized);

        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_distinct_ids_get_distinct_lines() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));
        cart.add_item(item(2, 750));
        cart.add_item(item(1, 500));

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_update_quantity_clamps_to_one() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));

        cart.update_quantity(ProductId::new(1), 0);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(ProductId::new(1), -5);
        assert_eq!(cart.items()[0].quantity, 1);

        cart.update_quantity(ProductId::new(1), 4);
        assert_eq!(cart.items()[0].quantity, 4);
    }

    #[test]
    fn test_update_quantity_missing_id_is_noop() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));

        cart.update_quantity(ProductId::new(99), 7);

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));
        cart.add_item(item(2, 750));

        cart.remove_item(ProductId::new(1));
        assert_eq!(cart.len(), 1);

        // removing an absent id is a no-op
        cart.remove_item(ProductId::new(1));
        assert_eq!(cart.len(), 1);

        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_sums_line_totals() {
        let cart = CartStore::new();
        cart.add_item(item(1, 500));
        cart.add_item(item(1, 500));
        cart.add_item(item(2, 750));

        // 2 x $5.00 + 1 x $7.50
        assert_eq!(cart.subtotal(), Decimal::new(1750, 2));
    }

    #[test]
    fn test_clones_share_state() {
        let cart = CartStore::new();
        let view = cart.clone();
        cart.add_item(item(1, 500));
        assert_eq!(view.len(), 1);
    }
}
