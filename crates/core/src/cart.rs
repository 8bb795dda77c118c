//! Cart state model.
//!
//! `CartState` is the pure data half of the cart: entries keyed by product
//! ID in insertion order, plus a running item count. Persistence and
//! sharing live in the client crate.

use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Product, ProductId};

/// A product snapshot with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product snapshot taken when first added.
    pub product: Product,
    /// Units in the cart (always at least one).
    pub quantity: u32,
}

impl CartEntry {
    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price.times(self.quantity)
    }
}

/// A change that would push a quantity or the cart total past `u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cart quantity would exceed {}", u32::MAX)]
pub struct QuantityOverflow;

/// Ordered cart contents.
///
/// Invariants:
/// - at most one entry per product ID
/// - every entry has a quantity of at least one
/// - `total_count` equals the sum of entry quantities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCart")]
pub struct CartState {
    entries: Vec<CartEntry>,
    total_count: u32,
}

/// Serialized form, normalized on the way in so a hand-edited or older
/// payload can't break the invariants.
#[derive(Deserialize)]
struct StoredCart {
    #[serde(default)]
    entries: Vec<CartEntry>,
}

impl From<StoredCart> for CartState {
    fn from(stored: StoredCart) -> Self {
        let mut state = Self::new();
        for entry in stored.entries {
            if let Some(quantity) = NonZeroU32::new(entry.quantity) {
                // Entries that would overflow the count are skipped.
                let _ = state.add(entry.product, quantity);
            }
        }
        state
    }
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            total_count: 0,
        }
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Sum of all entry quantities.
    #[must_use]
    pub const fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for a product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.product.id == id)
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.entries.iter().map(CartEntry::line_total).sum()
    }

    /// Add `quantity` units of `product`.
    ///
    /// An existing entry for the same product ID accumulates the quantity and
    /// keeps its original snapshot and position.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityOverflow`] and leaves the cart unchanged if the
    /// entry or the total would exceed `u32::MAX`.
    pub fn add(&mut self, product: Product, quantity: NonZeroU32) -> Result<(), QuantityOverflow> {
        let quantity = quantity.get();
        let total_count = self.total_count.checked_add(quantity).ok_or(QuantityOverflow)?;
        match self.entries.iter_mut().find(|e| e.product.id == product.id) {
            Some(entry) => {
                entry.quantity = entry.quantity.checked_add(quantity).ok_or(QuantityOverflow)?;
            }
            None => self.entries.push(CartEntry { product, quantity }),
        }
        self.total_count = total_count;
        Ok(())
    }

    /// Remove the entry for `id`, returning it.
    ///
    /// Removing an absent product is a no-op.
    pub fn remove(&mut self, id: ProductId) -> Option<CartEntry> {
        let index = self.entries.iter().position(|e| e.product.id == id)?;
        let entry = self.entries.remove(index);
        self.total_count = self.total_count.saturating_sub(entry.quantity);
        Some(entry)
    }

    /// Set the quantity for an existing entry. Zero removes the entry.
    ///
    /// Returns `false` if the product is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityOverflow`] and leaves the cart unchanged if the new
    /// total would exceed `u32::MAX`.
    pub fn set_quantity(&mut self, id: ProductId, quantity: u32) -> Result<bool, QuantityOverflow> {
        if quantity == 0 {
            return Ok(self.remove(id).is_some());
        }
        let Some(entry) = self.entries.iter_mut().find(|e| e.product.id == id) else {
            return Ok(false);
        };
        self.total_count = self
            .total_count
            .saturating_sub(entry.quantity)
            .checked_add(quantity)
            .ok_or(QuantityOverflow)?;
        entry.quantity = quantity;
        Ok(true)
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_count = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{DocumentId, Price};

    fn product(id: i32, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            document_id: DocumentId::new(format!("doc-{id}")),
            title: format!("Product {id}"),
            description: None,
            price: Price::from_cents(cents).unwrap(),
            stock: 10,
            thumbnail: None,
            category: None,
        }
    }

    fn qty(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn assert_invariants(state: &CartState) {
        let sum: u32 = state.entries().iter().map(|e| e.quantity).sum();
        assert_eq!(sum, state.total_count());
        let mut ids: Vec<_> = state.entries().iter().map(|e| e.product.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), state.len());
        assert!(state.entries().iter().all(|e| e.quantity > 0));
    }

    #[test]
    fn test_add_accumulates_quantity() {
        let mut cart = CartState::new();
        cart.add(product(1, 1000), qty(2)).unwrap();
        cart.add(product(1, 1000), qty(3)).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 5);
        assert_eq!(cart.total_count(), 5);
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = CartState::new();
        cart.add(product(3, 100), qty(1)).unwrap();
        cart.add(product(1, 100), qty(1)).unwrap();
        cart.add(product(3, 100), qty(1)).unwrap();
        cart.add(product(2, 100), qty(1)).unwrap();

        let ids: Vec<i32> = cart.entries().iter().map(|e| e.product.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_repeated_add_keeps_first_snapshot() {
        let mut cart = CartState::new();
        cart.add(product(1, 1000), qty(1)).unwrap();
        cart.add(product(1, 2000), qty(1)).unwrap();
        assert_eq!(
            cart.get(ProductId::new(1)).unwrap().product.price,
            Price::from_cents(1000).unwrap()
        );
    }

    #[test]
    fn test_remove_decrements_total() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(2)).unwrap();
        cart.add(product(2, 100), qty(4)).unwrap();

        let removed = cart.remove(ProductId::new(2)).unwrap();
        assert_eq!(removed.quantity, 4);
        assert_eq!(cart.total_count(), 2);
        assert_invariants(&cart);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(2)).unwrap();
        let before = cart.clone();

        assert!(cart.remove(ProductId::new(99)).is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(2)).unwrap();
        cart.add(product(2, 100), qty(1)).unwrap();

        assert!(cart.set_quantity(ProductId::new(1), 7).unwrap());
        assert_eq!(cart.total_count(), 8);
        assert!(cart.set_quantity(ProductId::new(2), 0).unwrap());
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_count(), 7);
        assert!(!cart.set_quantity(ProductId::new(42), 3).unwrap());
        assert_invariants(&cart);
    }

    #[test]
    fn test_subtotal() {
        let mut cart = CartState::new();
        cart.add(product(1, 1250), qty(2)).unwrap();
        cart.add(product(2, 300), qty(1)).unwrap();
        assert_eq!(cart.subtotal(), Decimal::new(2800, 2));
    }

    #[test]
    fn test_clear() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(2)).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_count(), 0);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut cart = CartState::new();
        cart.add(product(5, 1999), qty(1)).unwrap();
        cart.add(product(2, 450), qty(3)).unwrap();
        cart.add(product(5, 1999), qty(2)).unwrap();
        cart.add(product(9, 100), qty(1)).unwrap();
        cart.remove(ProductId::new(9));

        let json = serde_json::to_string(&cart).unwrap();
        let restored: CartState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_deserialize_normalizes_stored_payload() {
        let a = serde_json::to_value(product(1, 100)).unwrap();
        let b = serde_json::to_value(product(2, 100)).unwrap();
        let payload = serde_json::json!({
            "entries": [
                {"product": a, "quantity": 2},
                {"product": b, "quantity": 0},
                {"product": a, "quantity": 1},
            ],
            "total_count": 999,
        });

        let cart: CartState = serde_json::from_value(payload).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_count(), 3);
        assert_invariants(&cart);
    }

    #[test]
    fn test_overflowing_add_is_rejected_unchanged() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(u32::MAX - 1)).unwrap();
        let before = cart.clone();

        assert_eq!(cart.add(product(1, 100), qty(2)), Err(QuantityOverflow));
        assert_eq!(cart, before);

        // A different product still overflows the total.
        assert_eq!(cart.add(product(2, 100), qty(2)), Err(QuantityOverflow));
        assert_eq!(cart, before);
        assert!(cart.get(ProductId::new(2)).is_none());

        cart.add(product(2, 100), qty(1)).unwrap();
        assert_eq!(cart.total_count(), u32::MAX);
        assert_invariants(&cart);
    }

    #[test]
    fn test_overflowing_set_quantity_is_rejected_unchanged() {
        let mut cart = CartState::new();
        cart.add(product(1, 100), qty(5)).unwrap();
        cart.add(product(2, 100), qty(u32::MAX - 10)).unwrap();
        let before = cart.clone();

        assert_eq!(cart.set_quantity(ProductId::new(1), 20), Err(QuantityOverflow));
        assert_eq!(cart, before);
        assert!(cart.set_quantity(ProductId::new(1), 10).unwrap());
        assert_eq!(cart.total_count(), u32::MAX);
        assert_invariants(&cart);
    }

    #[test]
    fn test_deserialize_skips_overflowing_entries() {
        let a = serde_json::to_value(product(1, 100)).unwrap();
        let b = serde_json::to_value(product(2, 100)).unwrap();
        let payload = serde_json::json!({
            "entries": [
                {"product": a, "quantity": u32::MAX},
                {"product": b, "quantity": 1},
                {"product": a, "quantity": 1},
            ],
        });

        let cart: CartState = serde_json::from_value(payload).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_count(), u32::MAX);
        assert_invariants(&cart);
    }

    #[test]
    fn test_invariants_hold_over_mixed_operations() {
        let mut cart = CartState::new();
        for step in 0..200_u32 {
            let id = i32::try_from(step % 7).unwrap();
            match step % 4 {
                0 | 1 => cart.add(product(id, 100), qty(step % 3 + 1)).unwrap(),
                2 => {
                    cart.remove(ProductId::new(id)).unwrap();
                }
                _ => {
                    cart.set_quantity(ProductId::new(id), step % 5).unwrap();
                }
            }
            assert_invariants(&cart);
        }
    }
}
