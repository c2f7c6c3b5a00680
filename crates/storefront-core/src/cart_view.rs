//! ============================================================================
//! Cart View - Cart page and mock checkout
//! ============================================================================
//! Signed-in users see their lines with a quantity stepper, an order summary
//! and a checkout button. Checkout is a demo: it "submits" the order by
//! emptying the cart and going home.
//! ============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::cart::CartStore;
use crate::session::SessionStore;
use crate::types::{CartItem, NavIntent, ProductId};

/// One rendered cart line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub item: CartItem,
    pub line_total: f64,
    /// The "-" button is disabled at quantity 1
    pub can_decrement: bool,
}

/// Order summary panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total_items: u64,
    pub total_price: f64,
}

/// What the cart page renders
#[derive(Debug, Clone, PartialEq)]
pub enum CartPage {
    /// Signed out: render nothing and go to login
    LoginRequired(NavIntent),
    Empty,
    Lines(CartSummary),
}

/// Confirmation of a demo checkout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderReceipt {
    pub total_items: u64,
    pub total_price: f64,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Sign in to check out")]
    NotSignedIn,

    #[error("Cart is empty")]
    EmptyCart,
}

/// Cart page bound to the stores it reads and mutates
pub struct CartView<'a> {
    session: &'a SessionStore,
    cart: &'a mut CartStore,
}

impl<'a> CartView<'a> {
    pub fn new(session: &'a SessionStore, cart: &'a mut CartStore) -> Self {
        Self { session, cart }
    }

    pub fn page(&self) -> CartPage {
        if !self.session.is_authenticated() {
            return CartPage::LoginRequired(NavIntent::Login {
                redirect: Some(NavIntent::Cart.path()),
            });
        }
        if self.cart.is_empty() {
            return CartPage::Empty;
        }
        CartPage::Lines(self.summary())
    }

    pub fn summary(&self) -> CartSummary {
        let lines = self
            .cart
            .items()
            .iter()
            .map(|item| CartLine {
                item: item.clone(),
                line_total: item.line_total(),
                can_decrement: item.quantity > 1,
            })
            .collect();

        CartSummary {
            lines,
            total_items: self.cart.total_items(),
            total_price: self.cart.total_price(),
        }
    }

    /// "+" button. Returns whether anything changed.
    pub fn increment(&mut self, id: ProductId) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }
        let Some(current) = self.cart.item(id).map(|item| item.quantity) else {
            return false;
        };
        self.cart.update_quantity(id, i64::from(current) + 1);
        true
    }

    /// "-" button, disabled at quantity 1
    pub fn decrement(&mut self, id: ProductId) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }
        match self.cart.item(id).map(|item| item.quantity) {
            Some(current) if current > 1 => {
                self.cart.update_quantity(id, i64::from(current) - 1);
                true
            }
            _ => false,
        }
    }

    /// Trash button
    pub fn remove(&mut self, id: ProductId) -> bool {
        if !self.session.is_authenticated() || self.cart.item(id).is_none() {
            return false;
        }
        self.cart.remove_item(id);
        true
    }

    /// "Clear cart" only acts once the user confirmed the prompt
    pub fn clear(&mut self, confirmed: bool) -> bool {
        if !confirmed || !self.session.is_authenticated() {
            return false;
        }
        self.cart.clear_cart();
        true
    }

    /// Demo checkout: empties the cart and returns home
    pub fn checkout(&mut self) -> Result<(OrderReceipt, NavIntent), CheckoutError> {
        if !self.session.is_authenticated() {
            return Err(CheckoutError::NotSignedIn);
        }
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let receipt = OrderReceipt {
            total_items: self.cart.total_items(),
            total_price: self.cart.total_price(),
            placed_at: Utc::now(),
        };
        self.cart.clear_cart();
        info!(
            "Order placed: {} item(s), {:.2}",
            receipt.total_items, receipt.total_price
        );
        Ok((receipt, NavIntent::Home))
    }
}

/// Header badge and user menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderSummary {
    pub cart_count: u64,
    pub username: Option<String>,
}

impl HeaderSummary {
    pub fn from_stores(cart: &CartStore, session: &SessionStore) -> Self {
        Self {
            cart_count: cart.total_items(),
            username: session.user().map(|u| u.username.clone()),
        }
    }
}
