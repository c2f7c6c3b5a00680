//! ============================================================================
//! Product Detail Controller - One product, gated purchase actions
//! ============================================================================
//! Loads a single product and runs the two purchase buttons:
//! - Add to cart: signed in → add + transient confirmation;
//!   signed out → "please log in" then a delayed redirect to login
//! - Buy now: same gate; signed in → add and go straight to the cart
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cart::CartStore;
use crate::catalog::CatalogSource;
use crate::session::SessionStore;
use crate::timer::{Clock, TimerHandle, TimerQueue};
use crate::types::{CatalogError, NavIntent, Product, ProductId};

/// Delay before a signed-out user is sent to the login page
pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(1000);

/// Lifetime of the "added to cart" confirmation
pub const MESSAGE_DISMISS_DELAY: Duration = Duration::from_millis(2000);

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in first";
pub const ADDED_TO_CART_MESSAGE: &str = "Added to cart";

/// Characters of the description used for the page's meta description
const META_DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Found(Product),
    NotFound,
}

/// Result of pressing "add to cart"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// Signed out: a login redirect is scheduled, the cart is untouched
    LoginRequired,
    /// Nothing loaded to add
    Unavailable,
}

/// Identity of one product request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductTicket(u64);

#[derive(Debug, Clone, PartialEq)]
enum DetailTimer {
    ClearMessage,
    Navigate(NavIntent),
}

pub struct ProductDetailController {
    state: DetailState,
    product_id: Option<ProductId>,
    latest_request: u64,
    message: Option<String>,
    message_timer: Option<TimerHandle>,
    timers: TimerQueue<DetailTimer>,
}

impl ProductDetailController {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: DetailState::Loading,
            product_id: None,
            latest_request: 0,
            message: None,
            message_timer: None,
            timers: TimerQueue::new(clock),
        }
    }

    /// Load product `id`. Fetch failures are logged and shown as not found.
    pub async fn open(&mut self, source: &dyn CatalogSource, id: ProductId) {
        let ticket = self.begin_open(id);
        let result = source.product(id).await;
        self.apply_product(ticket, result);
    }

    /// Enter loading for `id`; earlier tickets become stale
    pub fn begin_open(&mut self, id: ProductId) -> ProductTicket {
        self.latest_request += 1;
        self.product_id = Some(id);
        self.state = DetailState::Loading;
        ProductTicket(self.latest_request)
    }

    /// Apply a finished request. Returns false when `ticket` was superseded.
    pub fn apply_product(
        &mut self,
        ticket: ProductTicket,
        result: Result<Option<Product>, CatalogError>,
    ) -> bool {
        if ticket.0 != self.latest_request {
            debug!("Dropping stale product response #{}", ticket.0);
            return false;
        }

        self.state = match result {
            Ok(Some(product)) => {
                debug!("Loaded product {}: {}", product.id, product.title);
                DetailState::Found(product)
            }
            Ok(None) => {
                info!("Product {:?} not found", self.product_id);
                DetailState::NotFound
            }
            Err(e) => {
                warn!("Failed to fetch product {:?}: {}", self.product_id, e);
                DetailState::NotFound
            }
        };
        true
    }

    /// "Add to cart" button
    pub fn add_to_cart(&mut self, session: &SessionStore, cart: &mut CartStore) -> AddOutcome {
        if !session.is_authenticated() {
            self.require_login();
            return AddOutcome::LoginRequired;
        }

        let DetailState::Found(product) = &self.state else {
            return AddOutcome::Unavailable;
        };
        cart.add_item(product);
        self.show_message(ADDED_TO_CART_MESSAGE, Some(MESSAGE_DISMISS_DELAY));
        AddOutcome::Added
    }

    /// "Buy now" button. Returns the cart intent right away when the product
    /// was added; a signed-out user instead gets the delayed login redirect.
    pub fn buy_now(&mut self, session: &SessionStore, cart: &mut CartStore) -> Option<NavIntent> {
        if !session.is_authenticated() {
            self.require_login();
            return None;
        }

        let DetailState::Found(product) = &self.state else {
            return None;
        };
        cart.add_item(product);
        Some(NavIntent::Cart)
    }

    /// Fire due timers. Returns a navigation intent if a redirect came due.
    pub fn poll(&mut self) -> Option<NavIntent> {
        let mut intent = None;
        for timer in self.timers.take_due() {
            match timer {
                DetailTimer::ClearMessage => {
                    self.message = None;
                    self.message_timer = None;
                }
                DetailTimer::Navigate(target) => intent = Some(target),
            }
        }
        intent
    }

    /// Time until the next scheduled message clear or redirect
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Leaving the page drops pending messages and redirects
    pub fn deactivate(&mut self) {
        self.timers.clear();
        self.message = None;
        self.message_timer = None;
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn product(&self) -> Option<&Product> {
        match &self.state {
            DetailState::Found(product) => Some(product),
            _ => None,
        }
    }

    /// Transient message currently shown
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Document title for the loaded product
    pub fn page_title(&self) -> Option<String> {
        self.product().map(|p| format!("{} - NextStore", p.title))
    }

    /// First 160 characters of the description
    pub fn meta_description(&self) -> Option<String> {
        self.product()
            .map(|p| p.description.chars().take(META_DESCRIPTION_CHARS).collect())
    }

    fn require_login(&mut self) {
        info!("Purchase attempted while signed out - redirecting to login");
        self.show_message(LOGIN_REQUIRED_MESSAGE, None);
        self.timers.schedule_after(
            LOGIN_REDIRECT_DELAY,
            DetailTimer::Navigate(NavIntent::Login { redirect: None }),
        );
    }

    /// Replace the current message; a newer message cancels the older clear
    fn show_message(&mut self, text: &str, dismiss_after: Option<Duration>) {
        if let Some(handle) = self.message_timer.take() {
            self.timers.cancel(handle);
        }
        self.message = Some(text.to_string());
        if let Some(delay) = dismiss_after {
            self.message_timer = Some(self.timers.schedule_after(delay, DetailTimer::ClearMessage));
        }
    }
}
