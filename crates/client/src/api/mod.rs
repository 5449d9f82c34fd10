//! Shop REST API client.
//!
//! # Architecture
//!
//! - [`ApiClient`] owns the `reqwest` client, base URL and bearer token
//! - [`CartService`] maps cart intents onto cart endpoints and returns the
//!   server's [`CartSnapshot`]; it never touches the local cart store
//! - The backend is the source of truth for the cart; no retries here
//!
//! # Example
//!
//! ```rust,ignore
//! use fashion_shop_client::api::{ApiClient, CartService};
//!
//! let api = ApiClient::new(&config.api)?;
//! let carts = CartService::new(api);
//!
//! let snapshot = carts.add_to_cart(product_id, variant_id, Quantity::ONE).await?;
//! store.set_items(snapshot.to_line_items()?);
//! ```

mod cart;
mod client;
mod conversions;
pub mod types;

pub use cart::CartService;
pub use client::{ApiClient, REQUEST_ID_HEADER};
pub use conversions::convert_cart_item;
pub use types::*;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response payload was missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success response.
    #[error("Remote error ({status}): {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message reported by the backend.
        message: String,
    },
}

impl ApiError {
    /// Classify a non-success status.
    #[must_use]
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            _ => Self::Remote {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// HTTP status associated with the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound(_) => Some(StatusCode::NOT_FOUND.as_u16()),
            Self::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::RateLimited(_) => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::Remote { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Validation(_) => None,
        }
    }
}
