//! Integration test support for the storefront client.
//!
//! [`FakeBackend`] serves the subset of the product backend's REST API the
//! client uses, from an in-memory catalog, on an ephemeral local port. It
//! counts requests per `METHOD /path` so tests can assert cache behavior.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storefront-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog_cache` - Caching, de-duplication and invalidation
//! - `auth` - Login, logout and token-gated mutations
//! - `errors` - Error envelope mapping
//! - `cart_persistence` - Cart and token survive a restart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use storefront_client::{ClientConfig, MemoryStorage, Storefront};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Token the fake backend issues and accepts.
pub const TEST_JWT: &str = "test-jwt";
/// Accepted login identifier.
pub const TEST_IDENTIFIER: &str = "admin@example.com";
/// Accepted login password.
pub const TEST_PASSWORD: &str = "secret123";

/// One catalog record as the backend stores it.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub id: i32,
    pub document_id: String,
    pub title: String,
    /// Price in cents.
    pub price_cents: i64,
    pub stock: i64,
    pub category: Option<usize>,
}

impl FakeProduct {
    /// A product with ID `id`, document ID `doc-{id}` and price `id` dollars.
    #[must_use]
    pub fn numbered(id: i32) -> Self {
        Self {
            id,
            document_id: format!("doc-{id}"),
            title: format!("Product {id}"),
            price_cents: i64::from(id) * 100,
            stock: 5,
            category: None,
        }
    }

    fn price(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let cents = self.price_cents as f64;
        cents / 100.0
    }

    fn to_json(&self, categories: &[(i32, String, String)]) -> Value {
        let category = self
            .category
            .and_then(|i| categories.get(i))
            .map(|(id, doc, title)| json!({"id": id, "documentId": doc, "title": title}));
        json!({
            "id": self.id,
            "documentId": self.document_id,
            "title": self.title,
            "description": format!("About {}", self.title),
            "price": self.price(),
            "stock": self.stock,
            "thumbnail": {"url": format!("/uploads/{}.png", self.document_id)},
            "category": category,
        })
    }
}

#[derive(Default)]
struct BackendState {
    products: Mutex<Vec<FakeProduct>>,
    categories: Mutex<Vec<(i32, String, String)>>,
    hits: Mutex<HashMap<String, usize>>,
    latency: Mutex<Duration>,
    failing: Mutex<Option<StatusCode>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process stand-in for the product backend.
///
/// The server task is aborted when the value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    /// Start a backend serving `products` and two categories.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start(products: Vec<FakeProduct>) -> std::io::Result<Self> {
        let state = Arc::new(BackendState {
            products: Mutex::new(products),
            categories: Mutex::new(vec![
                (1, "cat-1".to_string(), "Candles".to_string()),
                (2, "cat-2".to_string(), "Mugs".to_string()),
            ]),
            ..BackendState::default()
        });

        let router = Router::new()
            .route("/api/products", get(list_products).post(create_product))
            .route(
                "/api/products/{document_id}",
                get(get_product).put(update_product).delete(delete_product),
            )
            .route("/api/categories", get(list_categories))
            .route("/api/auth/local", post(login))
            .route("/api/users/me", get(current_user))
            .layer(middleware::from_fn_with_state(Arc::clone(&state), count_and_delay))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Start a backend with products `1..=count`.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn with_numbered_products(count: i32) -> std::io::Result<Self> {
        Self::start((1..=count).map(FakeProduct::numbered).collect()).await
    }

    /// API base URL, e.g. `http://127.0.0.1:41234/api`.
    ///
    /// # Panics
    ///
    /// Never; the address always forms a valid URL.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn api_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).unwrap()
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url())
    }

    /// A fresh client context over in-memory storage.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn storefront(&self) -> Storefront {
        Storefront::new(self.config(), Arc::new(MemoryStorage::new())).unwrap()
    }

    /// Requests received for `METHOD /path` (query string excluded).
    #[must_use]
    pub fn hits(&self, route: &str) -> usize {
        lock(&self.state.hits).get(route).copied().unwrap_or(0)
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.state.latency) = latency;
    }

    /// Answer every request with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *lock(&self.state.failing) = status;
    }

    /// Change a product's title behind the client's back.
    pub fn rename(&self, id: i32, title: &str) {
        if let Some(product) = lock(&self.state.products).iter_mut().find(|p| p.id == id) {
            product.title = title.to_string();
        }
    }

    /// Document IDs currently in the catalog.
    #[must_use]
    pub fn document_ids(&self) -> Vec<String> {
        lock(&self.state.products)
            .iter()
            .map(|p| p.document_id.clone())
            .collect()
    }
}

async fn count_and_delay(
    State(state): State<Arc<BackendState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = format!("{} {}", request.method(), request.uri().path());
    *lock(&state.hits).entry(route).or_default() += 1;

    let latency = *lock(&state.latency);
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    let failing = *lock(&state.failing);
    if let Some(status) = failing {
        return error(status, "Internal Server Error");
    }
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    let name = match status {
        StatusCode::BAD_REQUEST => "ValidationError",
        StatusCode::UNAUTHORIZED => "UnauthorizedError",
        StatusCode::FORBIDDEN => "ForbiddenError",
        StatusCode::NOT_FOUND => "NotFoundError",
        _ => "ApplicationError",
    };
    (
        status,
        Json(json!({
            "data": null,
            "error": {"status": status.as_u16(), "name": name, "message": message, "details": {}}
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TEST_JWT}"))
}

fn param<T: std::str::FromStr>(params: &HashMap<String, String>, key: &str) -> Option<T> {
    params.get(key).and_then(|v| v.parse().ok())
}

async fn list_products(
    State(state): State<Arc<BackendState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let page: usize = param(&params, "pagination[page]").unwrap_or(1).max(1);
    let page_size: usize = param(&params, "pagination[pageSize]").unwrap_or(25).max(1);
    let category = params.get("filters[category][documentId][$eq]");
    let min: Option<f64> = param(&params, "filters[price][$gte]");
    let max: Option<f64> = param(&params, "filters[price][$lte]");
    let search = params
        .get("filters[title][$containsi]")
        .map(|s| s.to_lowercase());

    let categories = lock(&state.categories).clone();
    let matching: Vec<FakeProduct> = lock(&state.products)
        .iter()
        .filter(|p| {
            category.is_none_or(|doc| {
                p.category
                    .and_then(|i| categories.get(i))
                    .is_some_and(|(_, d, _)| d == doc)
            })
        })
        .filter(|p| min.is_none_or(|m| p.price() >= m))
        .filter(|p| max.is_none_or(|m| p.price() <= m))
        .filter(|p| {
            search
                .as_ref()
                .is_none_or(|s| p.title.to_lowercase().contains(s))
        })
        .cloned()
        .collect();

    let total = matching.len();
    let data: Vec<Value> = matching
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|p| p.to_json(&categories))
        .collect();

    Json(json!({
        "data": data,
        "meta": {"pagination": {
            "page": page,
            "pageSize": page_size,
            "pageCount": total.div_ceil(page_size),
            "total": total,
        }}
    }))
    .into_response()
}

async fn get_product(
    State(state): State<Arc<BackendState>>,
    Path(document_id): Path<String>,
) -> Response {
    let categories = lock(&state.categories).clone();
    let found = lock(&state.products)
        .iter()
        .find(|p| p.document_id == document_id)
        .map(|p| p.to_json(&categories));
    match found {
        Some(data) => Json(json!({"data": data, "meta": {}})).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn delete_product(
    State(state): State<Arc<BackendState>>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Missing or invalid credentials");
    }
    let mut products = lock(&state.products);
    let before = products.len();
    products.retain(|p| p.document_id != document_id);
    if products.len() == before {
        return error(StatusCode::NOT_FOUND, "Not Found");
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Create/update body: `{ "data": { ... } }`.
#[derive(Deserialize)]
struct ProductBody {
    data: ProductFields,
}

#[derive(Deserialize)]
struct ProductFields {
    title: String,
    price: f64,
    stock: i64,
    category: Option<String>,
}

fn category_index(state: &BackendState, document_id: Option<&str>) -> Option<usize> {
    let document_id = document_id?;
    lock(&state.categories)
        .iter()
        .position(|(_, doc, _)| doc == document_id)
}

#[allow(clippy::cast_possible_truncation)]
fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

async fn create_product(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Missing or invalid credentials");
    }
    let fields = body.data;
    let category = category_index(&state, fields.category.as_deref());
    let categories = lock(&state.categories).clone();

    let mut products = lock(&state.products);
    let id = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    let product = FakeProduct {
        id,
        document_id: format!("doc-{id}"),
        title: fields.title,
        price_cents: to_cents(fields.price),
        stock: fields.stock,
        category,
    };
    let data = product.to_json(&categories);
    products.push(product);
    Json(json!({"data": data, "meta": {}})).into_response()
}

async fn update_product(
    State(state): State<Arc<BackendState>>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ProductBody>,
) -> Response {
    if !authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Missing or invalid credentials");
    }
    let fields = body.data;
    let category = category_index(&state, fields.category.as_deref());
    let categories = lock(&state.categories).clone();

    let mut products = lock(&state.products);
    let Some(product) = products.iter_mut().find(|p| p.document_id == document_id) else {
        return error(StatusCode::NOT_FOUND, "Not Found");
    };
    product.title = fields.title;
    product.price_cents = to_cents(fields.price);
    product.stock = fields.stock;
    product.category = category;
    Json(json!({"data": product.to_json(&categories), "meta": {}})).into_response()
}

async fn list_categories(State(state): State<Arc<BackendState>>) -> Response {
    let data: Vec<Value> = lock(&state.categories)
        .iter()
        .map(|(id, doc, title)| json!({"id": id, "documentId": doc, "title": title}))
        .collect();
    Json(json!({"data": data, "meta": {}})).into_response()
}

#[derive(Deserialize)]
struct LoginBody {
    identifier: String,
    password: String,
}

fn test_user() -> Value {
    json!({"id": 1, "username": "admin", "email": TEST_IDENTIFIER})
}

async fn login(Json(body): Json<LoginBody>) -> Response {
    if body.identifier == TEST_IDENTIFIER && body.password == TEST_PASSWORD {
        Json(json!({"jwt": TEST_JWT, "user": test_user()})).into_response()
    } else {
        error(StatusCode::BAD_REQUEST, "Invalid identifier or password")
    }
}

async fn current_user(headers: HeaderMap) -> Response {
    if authorized(&headers) {
        Json(test_user()).into_response()
    } else {
        error(StatusCode::UNAUTHORIZED, "Missing or invalid credentials")
    }
}
