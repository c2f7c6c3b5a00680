//! ============================================================================
//! Core Types for the Storefront
//! ============================================================================
//! Catalog records as served by the product API, cart line items, the
//! signed-in user, and the navigation intents controllers hand to the UI.
//! Wire/storage field names follow the JSON the catalog service and the
//! persisted records use.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog product identifier
pub type ProductId = u64;

/// Product as returned by the catalog service. Read-only once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    /// Image URL
    pub image: String,
    pub rating: Rating,
}

/// Aggregate customer rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub rate: f64,
    pub count: u32,
}

/// Snapshot of a product held in the cart, plus how many of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub title: String,
    pub price: f64,
    pub image: String,
    pub category: String,
    pub quantity: u32,
}

impl CartItem {
    /// New line for a product, starting at quantity 1
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
            quantity: 1,
        }
    }

    /// price * quantity, unrounded
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Signed-in identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Where the UI should go next. The core never routes by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "view")]
pub enum NavIntent {
    Home,
    Cart,
    Login {
        /// Path to return to once signed in
        redirect: Option<String>,
    },
    Product { id: ProductId },
}

impl NavIntent {
    /// Route-style path, mirroring the storefront's page layout
    pub fn path(&self) -> String {
        match self {
            NavIntent::Home => "/".to_string(),
            NavIntent::Cart => "/cart".to_string(),
            NavIntent::Login { redirect: None } => "/login".to_string(),
            NavIntent::Login {
                redirect: Some(target),
            } => format!("/login?redirect={}", target),
            NavIntent::Product { id } => format!("/products/{}", id),
        }
    }

    /// Parse a redirect target back into an intent. Unknown paths go home.
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim();
        if trimmed == "/cart" {
            return NavIntent::Cart;
        }
        if let Some(rest) = trimmed.strip_prefix("/products/") {
            if let Ok(id) = rest.parse::<ProductId>() {
                return NavIntent::Product { id };
            }
        }
        NavIntent::Home
    }
}

impl fmt::Display for NavIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Render a price the way every view shows it
pub fn format_price(amount: f64) -> String {
    format!("${:.2}", amount)
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure talking to the catalog service
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed catalog payload: {0}")]
    Decode(String),
}

/// Failure in a persistence adapter
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to open storage: {0}")]
    Open(String),

    #[error("Storage read failed: {0}")]
    Read(String),

    #[error("Storage write failed: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: 3,
            title: "Mens Cotton Jacket".to_string(),
            price: 55.99,
            description: "Great outerwear jacket".to_string(),
            category: "men's clothing".to_string(),
            image: "https://fakestoreapi.com/img/71li-ujtlUL._AC_UX679_.jpg".to_string(),
            rating: Rating {
                rate: 4.7,
                count: 500,
            },
        }
    }

    #[test]
    fn test_product_parses_catalog_json() {
        let json = r#"{
            "id": 1,
            "title": "Fjallraven Backpack",
            "price": 109.95,
            "description": "Your perfect pack",
            "category": "men's clothing",
            "image": "https://fakestoreapi.com/img/81fPKd-2AYL._AC_SL1500_.jpg",
            "rating": { "rate": 3.9, "count": 120 }
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, 1);
        assert_eq!(product.price, 109.95);
        assert_eq!(product.rating.count, 120);
    }

    #[test]
    fn test_cart_item_snapshot() {
        let item = CartItem::from_product(&sample_product());
        assert_eq!(item.id, 3);
        assert_eq!(item.quantity, 1);
        assert_eq!(item.category, "men's clothing");
        assert_eq!(item.line_total(), 55.99);
    }

    #[test]
    fn test_nav_paths() {
        assert_eq!(NavIntent::Home.path(), "/");
        assert_eq!(NavIntent::Cart.path(), "/cart");
        assert_eq!(NavIntent::Login { redirect: None }.path(), "/login");
        assert_eq!(
            NavIntent::Login {
                redirect: Some("/cart".to_string())
            }
            .path(),
            "/login?redirect=/cart"
        );
        assert_eq!(NavIntent::Product { id: 7 }.path(), "/products/7");
    }

    #[test]
    fn test_nav_from_path() {
        assert_eq!(NavIntent::from_path("/cart"), NavIntent::Cart);
        assert_eq!(NavIntent::from_path("/products/12"), NavIntent::Product { id: 12 });
        assert_eq!(NavIntent::from_path("/products/abc"), NavIntent::Home);
        assert_eq!(NavIntent::from_path("/"), NavIntent::Home);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(20.0), "$20.00");
        assert_eq!(format_price(109.95), "$109.95");
        assert_eq!(format_price(19.999), "$20.00");
        assert_eq!(format_price(0.0), "$0.00");
    }
}
