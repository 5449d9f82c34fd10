//! Integration tests for Fashion Shop.
//!
//! Provides [`MockBackend`], an in-process stand-in for the shop's cart API
//! served by axum on an ephemeral port, and [`TestContext`] to wire a client
//! session against it.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fashion-shop-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use fashion_shop_client::api::REQUEST_ID_HEADER;
use fashion_shop_client::config::{ApiConfig, ClientConfig};
use fashion_shop_client::state::AppState;
use fashion_shop_core::CurrencyCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Bearer token the mock backend accepts.
pub const TEST_TOKEN: &str = "test-session-token";

/// Cart ID of the single cart the mock backend serves.
pub const TEST_CART_ID: u32 = 1;

/// User ID owning the mock cart.
pub const TEST_USER_ID: u32 = 7;

/// A sellable variant in the mock catalog.
#[derive(Debug, Clone)]
pub struct CatalogVariant {
    pub product_id: u32,
    pub variant_id: u32,
    pub name: &'static str,
    pub slug: &'static str,
    pub size: &'static str,
    pub color: &'static str,
    pub stock: u32,
    pub price: Decimal,
}

/// Catalog served by [`MockBackend::spawn`].
#[must_use]
pub fn default_catalog() -> Vec<CatalogVariant> {
    vec![
        CatalogVariant {
            product_id: 3,
            variant_id: 12,
            name: "Linen Shirt",
            slug: "linen-shirt",
            size: "M",
            color: "White",
            stock: 10,
            price: Decimal::new(250_000, 0),
        },
        CatalogVariant {
            product_id: 3,
            variant_id: 13,
            name: "Linen Shirt",
            slug: "linen-shirt",
            size: "L",
            color: "White",
            stock: 2,
            price: Decimal::new(250_000, 0),
        },
        CatalogVariant {
            product_id: 5,
            variant_id: 20,
            name: "Canvas Tote",
            slug: "canvas-tote",
            size: "One Size",
            color: "Natural",
            stock: 50,
            price: Decimal::new(99_500, 1),
        },
    ]
}

#[derive(Debug, Clone)]
struct MockLine {
    id: u32,
    variant: CatalogVariant,
    quantity: u32,
}

#[derive(Debug)]
struct MockState {
    catalog: Vec<CatalogVariant>,
    lines: Vec<MockLine>,
    next_id: u32,
    omit_data: bool,
    retry_after: Option<u64>,
    requests: u32,
    request_ids: Vec<String>,
}

impl MockState {
    fn cart_json(&self) -> Value {
        let items: Vec<Value> = self
            .lines
            .iter()
            .map(|line| {
                let v = &line.variant;
                json!({
                    "id": line.id,
                    "cart_id": TEST_CART_ID,
                    "product_id": v.product_id,
                    "variant_id": v.variant_id,
                    "quantity": line.quantity,
                    "price": money(v.price),
                    "subtotal": money(v.price * Decimal::from(line.quantity)),
                    "product": {
                        "id": v.product_id,
                        "name": v.name,
                        "slug": v.slug,
                        "images": [
                            { "image_url": format!("/img/{}-alt.jpg", v.slug), "is_primary": false },
                            { "image_url": format!("/img/{}.jpg", v.slug), "is_primary": true }
                        ]
                    },
                    "variant": {
                        "id": v.variant_id,
                        "size": v.size,
                        "color": v.color,
                        "stock_quantity": v.stock
                    }
                })
            })
            .collect();
        let subtotal: Decimal = self
            .lines
            .iter()
            .map(|l| l.variant.price * Decimal::from(l.quantity))
            .sum();
        let item_count: u64 = self.lines.iter().map(|l| u64::from(l.quantity)).sum();

        json!({
            "id": TEST_CART_ID,
            "user_id": TEST_USER_ID,
            "items": items,
            "subtotal": money(subtotal),
            "total": money(subtotal),
            "item_count": item_count,
            "created_at": "2026-10-01T08:00:00Z",
            "updated_at": "2026-10-01T08:00:00Z"
        })
    }

    fn respond(&self) -> Response {
        if self.omit_data {
            return Json(json!({ "success": true })).into_response();
        }
        Json(json!({ "data": self.cart_json() })).into_response()
    }
}

/// Money travels as a JSON number on the wire.
fn money(amount: Decimal) -> Value {
    json!(amount.to_f64().unwrap_or_default())
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Shared request checks: rate limit, request ID, then bearer token.
///
/// Returns the rejection to send, or records the request and returns `None`.
fn admit(s: &mut MockState, headers: &HeaderMap) -> Option<Response> {
    if let Some(seconds) = s.retry_after {
        return Some(
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("retry-after", seconds.to_string())],
                Json(json!({ "error": "too many requests" })),
            )
                .into_response(),
        );
    }

    let Some(request_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        return Some(error(StatusCode::BAD_REQUEST, "missing x-request-id"));
    };

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"));
    if !authorized {
        return Some(error(StatusCode::UNAUTHORIZED, "unauthorized"));
    }

    s.requests += 1;
    s.request_ids.push(request_id.to_string());
    None
}

#[derive(Deserialize)]
struct AddItemBody {
    product_id: u32,
    variant_id: u32,
    quantity: u32,
}

#[derive(Deserialize)]
struct UpdateItemBody {
    quantity: u32,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = lock(&state);
    if let Some(rejection) = admit(&mut s, &headers) {
        return rejection;
    }
    s.respond()
}

async fn add_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddItemBody>,
) -> Response {
    let mut s = lock(&state);
    if let Some(rejection) = admit(&mut s, &headers) {
        return rejection;
    }
    if body.quantity == 0 {
        return error(StatusCode::BAD_REQUEST, "quantity must be at least 1");
    }
    let Some(variant) = s
        .catalog
        .iter()
        .find(|v| v.product_id == body.product_id && v.variant_id == body.variant_id)
        .cloned()
    else {
        return error(StatusCode::NOT_FOUND, "product variant not found");
    };

    let existing = s
        .lines
        .iter()
        .position(|l| l.variant.variant_id == variant.variant_id);
    let current = existing.and_then(|i| s.lines.get(i)).map_or(0, |l| l.quantity);
    let wanted = current + body.quantity;
    if wanted > variant.stock {
        return error(
            StatusCode::BAD_REQUEST,
            &format!("not enough stock (available: {})", variant.stock),
        );
    }

    if let Some(line) = existing.and_then(|i| s.lines.get_mut(i)) {
        line.quantity = wanted;
    } else {
        let id = s.next_id;
        s.next_id += 1;
        s.lines.push(MockLine {
            id,
            variant,
            quantity: wanted,
        });
    }
    s.respond()
}

async fn update_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<u32>,
    Json(body): Json<UpdateItemBody>,
) -> Response {
    let mut s = lock(&state);
    if let Some(rejection) = admit(&mut s, &headers) {
        return rejection;
    }
    if body.quantity == 0 {
        return error(StatusCode::BAD_REQUEST, "quantity must be at least 1");
    }
    let Some(line) = s.lines.iter_mut().find(|l| l.id == id) else {
        return error(StatusCode::NOT_FOUND, "cart item not found");
    };
    if body.quantity > line.variant.stock {
        let stock = line.variant.stock;
        return error(
            StatusCode::BAD_REQUEST,
            &format!("not enough stock (available: {stock})"),
        );
    }
    line.quantity = body.quantity;
    s.respond()
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<u32>,
) -> Response {
    let mut s = lock(&state);
    if let Some(rejection) = admit(&mut s, &headers) {
        return rejection;
    }
    let before = s.lines.len();
    s.lines.retain(|l| l.id != id);
    if s.lines.len() == before {
        return error(StatusCode::NOT_FOUND, "cart item not found");
    }
    s.respond()
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = lock(&state);
    if let Some(rejection) = admit(&mut s, &headers) {
        return rejection;
    }
    s.lines.clear();
    s.respond()
}

/// In-process cart backend speaking the shop API's JSON envelope.
///
/// The server task runs until the test's runtime shuts down.
#[derive(Debug, Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    state: Shared,
}

impl MockBackend {
    /// Bind an ephemeral port on localhost and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState {
            catalog: default_catalog(),
            lines: Vec::new(),
            next_id: 100,
            omit_data: false,
            retry_after: None,
            requests: 0,
            request_ids: Vec::new(),
        }));

        let api = Router::new()
            .route("/cart", get(get_cart))
            .route("/cart/items", post(add_item))
            .route("/cart/items/{id}", put(update_item).delete(remove_item))
            .route("/cart/clear", post(clear_cart))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api/v1", api);

        #[allow(clippy::expect_used)]
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        #[allow(clippy::expect_used)]
        let addr = listener.local_addr().expect("mock backend address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// Base URL clients should be configured with.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Respond to every cart call with a success envelope lacking `data`.
    pub fn set_omit_data(&self, omit: bool) {
        lock(&self.state).omit_data = omit;
    }

    /// Reject every call with `429 Too Many Requests` and this `Retry-After`.
    pub fn set_retry_after(&self, seconds: Option<u64>) {
        lock(&self.state).retry_after = seconds;
    }

    /// `x-request-id` values of the admitted requests, in arrival order.
    #[must_use]
    pub fn request_ids(&self) -> Vec<String> {
        lock(&self.state).request_ids.clone()
    }

    /// Number of authorized requests handled so far.
    #[must_use]
    pub fn request_count(&self) -> u32 {
        lock(&self.state).requests
    }

    /// Quantity of the server line holding `variant_id`, if any.
    #[must_use]
    pub fn server_quantity(&self, variant_id: u32) -> Option<u32> {
        lock(&self.state)
            .lines
            .iter()
            .find(|l| l.variant.variant_id == variant_id)
            .map(|l| l.quantity)
    }
}

/// Client-side configuration pointing at a [`MockBackend`].
///
/// # Panics
///
/// Panics if `base_url` is not a valid URL.
#[must_use]
pub fn client_config(base_url: &str, token: Option<&str>, storage_dir: &Path) -> ClientConfig {
    #[allow(clippy::expect_used)]
    let base_url = Url::parse(base_url).expect("valid base URL");
    ClientConfig {
        api: ApiConfig {
            base_url,
            token: token.map(SecretString::from),
            timeout: Duration::from_secs(5),
        },
        storage_dir: storage_dir.to_path_buf(),
        currency: CurrencyCode::VND,
        sentry_dsn: None,
    }
}

/// A running mock backend plus a signed-in client session with its own
/// storage directory.
pub struct TestContext {
    pub backend: MockBackend,
    pub state: AppState,
    pub storage_dir: tempfile::TempDir,
}

impl TestContext {
    /// Start a backend and build an authenticated session against it.
    ///
    /// # Panics
    ///
    /// Panics if the temp dir or client cannot be created.
    pub async fn new() -> Self {
        Self::with_token(Some(TEST_TOKEN)).await
    }

    /// Start a backend and build a session using `token`.
    ///
    /// # Panics
    ///
    /// Panics if the temp dir or client cannot be created.
    #[allow(clippy::expect_used)]
    pub async fn with_token(token: Option<&str>) -> Self {
        let backend = MockBackend::spawn().await;
        let storage_dir = tempfile::tempdir().expect("create temp dir");
        let state = AppState::new(client_config(&backend.base_url(), token, storage_dir.path()))
            .expect("build client state");
        Self {
            backend,
            state,
            storage_dir,
        }
    }

    /// Re-open the session from the same storage directory, as after an app
    /// restart.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn restart(&self) -> AppState {
        AppState::new(client_config(
            &self.backend.base_url(),
            Some(TEST_TOKEN),
            self.storage_dir.path(),
        ))
        .expect("rebuild client state")
    }
}
