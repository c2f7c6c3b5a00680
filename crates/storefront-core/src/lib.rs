//! ============================================================================
//! STOREFRONT-CORE: Client state for the storefront
//! ============================================================================
//! This crate holds everything behind the storefront's views:
//! - Catalog client for the read-only product API
//! - Cart and session stores with redb-backed persistence
//! - Catalog list controller (category filter + incremental reveal)
//! - Product detail, login and cart page controllers
//! ============================================================================

pub mod cart;
pub mod cart_view;
pub mod catalog;
pub mod catalog_view;
pub mod config;
pub mod db;
pub mod login;
pub mod product_detail;
pub mod session;
pub mod storage;
pub mod timer;
pub mod types;

// Re-export main types for convenience
pub use cart::{CartRecord, CartStore, CART_STORAGE_KEY};
pub use cart_view::{CartPage, CartSummary, CartView, CheckoutError, HeaderSummary, OrderReceipt};
pub use catalog::{CatalogClient, CatalogSource, ScopedCatalog};
pub use catalog_view::{
    CatalogView, CatalogViewController, CategoryFilter, ScrollNotifier, Sentinel,
    VisibilityNotifier, PAGE_SIZE,
};
pub use config::StorefrontConfig;
pub use db::{open_storage, StorefrontDb};
pub use login::{LoginController, LoginError};
pub use product_detail::{AddOutcome, DetailState, ProductDetailController};
pub use session::{SessionRecord, SessionStore, SESSION_STORAGE_KEY};
pub use storage::{MemoryStorage, Storage};
pub use timer::{Clock, ManualClock, SystemClock, TimerHandle, TimerQueue};
pub use types::*;
