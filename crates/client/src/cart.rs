//! Persisted cart container.
//!
//! Wraps [`CartState`] with durable storage. Each mutation runs against a
//! copy that is persisted before it replaces the live state, so a failed
//! write leaves both memory and storage at the previous state.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use storefront_core::{CartState, Product, ProductId, QuantityOverflow};
use tracing::{debug, warn};

use crate::storage::{Storage, StorageError};

/// Errors from cart mutations.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Overflow(#[from] QuantityOverflow),
}

/// Storage entry name for the serialized cart.
pub const CART_KEY: &str = "cart";

/// Process-wide cart.
pub struct CartStore {
    state: Mutex<CartState>,
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Restore the cart from `storage`.
    ///
    /// A missing entry gives an empty cart. An unreadable or corrupt entry is
    /// logged and also gives an empty cart.
    #[must_use]
    pub fn restore(storage: Arc<dyn Storage>) -> Self {
        let state = match storage.get(CART_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable stored cart");
                CartState::new()
            }),
            Ok(None) => CartState::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart");
                CartState::new()
            }
        };
        debug!(entries = state.len(), total = state.total_count(), "Cart restored");

        Self {
            state: Mutex::new(state),
            storage,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy, persist it, then publish it.
    fn mutate<R>(&self, f: impl FnOnce(&mut CartState) -> R) -> Result<R, StorageError> {
        let mut state = self.lock();
        let mut next = state.clone();
        let out = f(&mut next);
        if next != *state {
            self.storage
                .set(CART_KEY, &serde_json::to_string(&next)?, None)?;
            *state = next;
        }
        Ok(out)
    }

    /// Add `quantity` units of `product`, accumulating onto an existing entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity would overflow or the cart cannot be
    /// persisted; the cart is unchanged.
    pub fn add_to_cart(&self, product: Product, quantity: NonZeroU32) -> Result<(), CartError> {
        let id = product.id;
        self.mutate(|cart| cart.add(product, quantity))??;
        debug!(product_id = %id, quantity = quantity.get(), "Added to cart");
        Ok(())
    }

    /// Remove a product. Absent products are ignored.
    ///
    /// Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted; the cart is unchanged.
    pub fn remove_from_cart(&self, id: ProductId) -> Result<bool, StorageError> {
        let removed = self.mutate(|cart| cart.remove(id).is_some())?;
        debug!(product_id = %id, removed, "Removed from cart");
        Ok(removed)
    }

    /// Set a product's quantity; zero removes it.
    ///
    /// Returns whether the product was in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the total would overflow or the cart cannot be
    /// persisted; the cart is unchanged.
    pub fn update_quantity(&self, id: ProductId, quantity: u32) -> Result<bool, CartError> {
        Ok(self.mutate(|cart| cart.set_quantity(id, quantity))??)
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted; the cart is unchanged.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.mutate(CartState::clear)
    }

    /// Current entries and total count.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.lock().clone()
    }

    /// Sum of entry quantities.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.lock().total_count()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lock().subtotal()
    }
}
