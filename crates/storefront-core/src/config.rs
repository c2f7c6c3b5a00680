//! ============================================================================
//! Storefront Configuration
//! ============================================================================
//! Settings come from the environment (a `.env` file is loaded by the binary
//! before this is read). Command-line flags override individual fields.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default catalog service
pub const DEFAULT_API_BASE: &str = "https://fakestoreapi.com";

/// Default per-request timeout for catalog calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Base URL of the catalog service
    pub api_base: String,
    /// Database file; None means STOREFRONT_DB_PATH or the home-dir default
    pub db_path: Option<String>,
    pub http_timeout_secs: u64,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("STOREFRONT_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            db_path: std::env::var(crate::db::DB_PATH_ENV).ok(),
            http_timeout_secs: std::env::var("STOREFRONT_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl StorefrontConfig {
    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        if let Some(base) = api_base {
            self.api_base = base;
        }
        self
    }

    pub fn with_db_path(mut self, db_path: Option<String>) -> Self {
        if db_path.is_some() {
            self.db_path = db_path;
        }
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
