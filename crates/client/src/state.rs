//! Application-root context owning every client service.

use std::sync::Arc;

use crate::auth::AuthClient;
use crate::cart::CartStore;
use crate::catalog::{CatalogClient, QueryCache};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::storage::{FileStorage, Storage};
use crate::token::TokenStore;
use crate::toggles::UiToggles;

/// Services shared by every view.
///
/// This struct is cheaply cloneable via `Arc`. Construct one at start-up and
/// pass it down; there are no module-level singletons.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    api: ApiClient,
    catalog: CatalogClient,
    auth: AuthClient,
    cart: CartStore,
    toggles: UiToggles,
}

impl Storefront {
    /// Build every service over `storage`.
    ///
    /// The cart is restored from `storage` immediately.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, storage: Arc<dyn Storage>) -> Result<Self, ApiError> {
        let tokens = TokenStore::new(Arc::clone(&storage), config.token_ttl);
        let api = ApiClient::new(&config, tokens)?;
        let catalog = CatalogClient::new(api.clone(), QueryCache::new(config.cache), config.page_size);
        let auth = AuthClient::new(api.clone());
        let cart = CartStore::restore(storage);

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                catalog,
                auth,
                cart,
                toggles: UiToggles::new(),
            }),
        })
    }

    /// Build every service over the file at `config.storage_path()`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn with_file_storage(config: ClientConfig) -> Result<Self, ApiError> {
        let storage = Arc::new(FileStorage::new(config.storage_path()));
        Self::new(config, storage)
    }

    /// Get a reference to the client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the REST adapter.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the catalog client.
    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    /// Get a reference to the auth client.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.inner.auth
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get a reference to the UI toggles.
    #[must_use]
    pub fn toggles(&self) -> &UiToggles {
        &self.inner.toggles
    }

    /// Get a reference to the token store.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        self.inner.api.tokens()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;

    use secrecy::SecretString;
    use storefront_core::{DocumentId, Price, Product, ProductId};
    use url::Url;

    use super::*;
    use crate::storage::MemoryStorage;
    use crate::toggles::Toggle;

    fn config() -> ClientConfig {
        ClientConfig::new(Url::parse("http://127.0.0.1:9/api").unwrap())
    }

    #[test]
    fn test_services_share_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let app = Storefront::new(config(), Arc::clone(&storage)).unwrap();

        app.tokens()
            .set_with_default_expiry(&SecretString::from("t"))
            .unwrap();
        assert!(app.auth().is_authenticated().unwrap());

        app.cart()
            .add_to_cart(
                Product {
                    id: ProductId::new(1),
                    document_id: DocumentId::new("doc-1"),
                    title: "Candle".to_string(),
                    description: None,
                    price: Price::from_cents(900).unwrap(),
                    stock: 1,
                    thumbnail: None,
                    category: None,
                },
                NonZeroU32::MIN,
            )
            .unwrap();

        let reloaded = Storefront::new(config(), storage).unwrap();
        assert_eq!(reloaded.cart().total_count(), 1);
        assert!(reloaded.auth().is_authenticated().unwrap());
        // Toggles are process-lifetime only.
        app.toggles().open(Toggle::CartDrawer);
        assert!(!reloaded.toggles().is_open(Toggle::CartDrawer));
    }

    #[test]
    fn test_isolated_contexts_do_not_share_state() {
        let a = Storefront::new(config(), Arc::new(MemoryStorage::new())).unwrap();
        let b = Storefront::new(config(), Arc::new(MemoryStorage::new())).unwrap();
        a.toggles().open(Toggle::MobileMenu);
        assert!(!b.toggles().is_open(Toggle::MobileMenu));
    }
}
