//! Storefront client library.
//!
//! The state layer behind the storefront: a REST adapter for the product
//! backend, a descriptor-keyed query cache with tag invalidation, a
//! persisted cart, UI toggles, and the auth token store.
//!
//! # Architecture
//!
//! - The backend is the source of truth; reads are cached in memory via
//!   `moka` and expired by tag when a mutation succeeds
//! - The cart and token survive restarts through [`storage::Storage`]
//! - [`Storefront`] owns one instance of every service
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_client::{ClientConfig, Storefront};
//!
//! let app = Storefront::with_file_storage(ClientConfig::from_env()?)?;
//!
//! let page = app.catalog().list_products(&app.catalog().default_query()).await?;
//! app.cart().add_to_cart(page.products[0].clone(), NonZeroU32::MIN)?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod scope;
pub mod state;
pub mod storage;
pub mod toggles;
pub mod token;

pub use auth::AuthClient;
pub use cart::{CartError, CartStore};
pub use catalog::{CatalogClient, Descriptor, ProductQuery, ProductSort, QueryCache, Tag};
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use http::{ApiClient, AuthMode};
pub use scope::ViewScope;
pub use state::Storefront;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use toggles::{Toggle, UiToggles};
pub use token::TokenStore;
