//! Backend failures map to `ApiError` and are never cached.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use storefront_client::{ApiError, ClientConfig, MemoryStorage, Storefront};
use storefront_core::DocumentId;
use storefront_integration_tests::FakeBackend;

#[tokio::test]
async fn test_missing_product_is_not_found_and_not_cached() {
    let backend = FakeBackend::with_numbered_products(2).await.unwrap();
    let app = backend.storefront();
    let missing = DocumentId::new("doc-404");

    let err = app.catalog().get_product(&missing).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "HTTP 404 Not Found: Not Found");

    app.catalog().get_product(&missing).await.unwrap_err();
    assert_eq!(backend.hits("GET /api/products/doc-404"), 2);
}

#[tokio::test]
async fn test_server_error_then_recovery() {
    let backend = FakeBackend::with_numbered_products(2).await.unwrap();
    let app = backend.storefront();
    let query = app.catalog().default_query();

    backend.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let err = app.catalog().list_products(&query).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Http { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
    ));

    backend.fail_with(None);
    let page = app.catalog().list_products(&query).await.unwrap();
    assert_eq!(page.products.len(), 2);
    assert_eq!(backend.hits("GET /api/products"), 2);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = url::Url::parse(&format!("http://127.0.0.1:{port}/api")).unwrap();
    let app = Storefront::new(ClientConfig::new(url), std::sync::Arc::new(MemoryStorage::new()))
        .unwrap();

    let err = app.catalog().list_categories().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
