//! Storefront Core - Shared types library.
//!
//! This crate provides the types used across all storefront components:
//! - `client` - REST client, query cache, cart and token stores
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no storage,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, and catalog records
//! - [`cart`] - Cart state and its add/remove rules
//! - [`pagination`] - Page-number windowing
//! - [`validation`] - Form field rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod pagination;
pub mod types;
pub mod validation;

pub use cart::{CartEntry, CartState, QuantityOverflow};
pub use pagination::{PageItem, page_window};
pub use types::*;
pub use validation::{Credentials, FieldError, ProductInput, ValidationErrors};
