//! ============================================================================
//! Cart Store - Persistent shopping cart
//! ============================================================================
//! One line per product id, kept in first-added order. Quantities never drop
//! below 1 through this API: lines leave the cart only via `remove_item` or
//! `clear_cart`. Every mutation is written through to storage before it
//! returns.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::storage::{load_record, save_record, Storage};
use crate::types::{CartItem, Product, ProductId};

/// Storage key for the cart record
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Persisted shape of the cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub items: Vec<CartItem>,
}

impl CartRecord {
    /// Duplicate ids or zero quantities mean the record was not written by us
    fn is_valid(&self) -> bool {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .all(|item| item.quantity >= 1 && seen.insert(item.id))
    }
}

/// Shopping cart with write-through persistence
pub struct CartStore {
    items: Vec<CartItem>,
    storage: Arc<dyn Storage>,
}

impl CartStore {
    /// Restore the cart from storage, or start empty
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let items = match load_record::<CartRecord>(storage.as_ref(), CART_STORAGE_KEY) {
            Some(record) if record.is_valid() => record.items,
            Some(_) => {
                warn!("Persisted cart violates line invariants - starting empty");
                Vec::new()
            }
            None => Vec::new(),
        };

        info!("Cart restored with {} line(s)", items.len());
        Self { items, storage }
    }

    /// Add one unit of `product`: bumps an existing line or appends a new one
    pub fn add_item(&mut self, product: &Product) {
        match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(1);
                debug!("Cart: product {} now x{}", product.id, item.quantity);
            }
            None => {
                self.items.push(CartItem::from_product(product));
                debug!("Cart: added product {}", product.id);
            }
        }
        self.persist();
    }

    /// Set a line's quantity. Values below 1 and unknown ids are ignored;
    /// quantities saturate at `u32::MAX`.
    pub fn update_quantity(&mut self, id: ProductId, new_quantity: i64) {
        if new_quantity < 1 {
            debug!(
                "Cart: ignoring quantity {} for product {} (floor is 1)",
                new_quantity, id
            );
            return;
        }
        let quantity = u32::try_from(new_quantity).unwrap_or(u32::MAX);

        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            debug!("Cart: no line for product {}", id);
            return;
        };
        if item.quantity == quantity {
            return;
        }

        item.quantity = quantity;
        debug!("Cart: product {} set to x{}", id, quantity);
        self.persist();
    }

    /// Drop the line for `id`, if there is one
    pub fn remove_item(&mut self, id: ProductId) {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() != before {
            debug!("Cart: removed product {}", id);
            self.persist();
        }
    }

    /// Empty the cart
    pub fn clear_cart(&mut self) {
        self.items.clear();
        info!("Cart cleared");
        self.persist();
    }

    /// Sum of quantities across all lines
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of price * quantity across all lines. Not rounded.
    pub fn total_price(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// price * quantity for a single line
    pub fn line_total(&self, id: ProductId) -> Option<f64> {
        self.item(id).map(CartItem::line_total)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist(&self) {
        let record = CartRecord {
            items: self.items.clone(),
        };
        save_record(self.storage.as_ref(), CART_STORAGE_KEY, &record);
    }
}
