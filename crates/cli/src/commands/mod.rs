//! Command implementations.
//!
//! Commands print their results to stdout; logs and errors go to stderr.

#[allow(clippy::print_stdout)]
pub mod admin;
#[allow(clippy::print_stdout)]
pub mod auth;
#[allow(clippy::print_stdout)]
pub mod cart;
#[allow(clippy::print_stdout)]
pub mod catalog;

use storefront_client::{ApiError, CartError, ConfigError, StorageError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart change rejected or not persisted.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Invalid command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
