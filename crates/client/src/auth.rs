//! Login and logout against the backend's local auth provider.

use secrecy::SecretString;
use serde_json::json;
use storefront_core::{Credentials, User};
use tracing::{info, instrument};

use crate::catalog::conversions::{LoginResponse, UserData, convert_user};
use crate::error::ApiError;
use crate::http::{ApiClient, AuthMode};
use crate::token::TokenStore;

/// Session operations.
#[derive(Clone)]
pub struct AuthClient {
    api: ApiClient,
    tokens: TokenStore,
}

impl AuthClient {
    /// Create an auth client sharing `api`'s token store.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let tokens = api.tokens().clone();
        Self { api, tokens }
    }

    /// Log in and store the returned token.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for blank or short input (no request is sent),
    /// `Http` 400 for bad credentials, or `Storage` if the token cannot be
    /// persisted.
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier))]
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApiError> {
        credentials.validate()?;

        let body = json!({
            "identifier": credentials.identifier.trim(),
            "password": credentials.password,
        });
        let response: LoginResponse = self
            .api
            .post("/auth/local", &[], &body, AuthMode::Anonymous)
            .await?;

        self.tokens
            .set_with_default_expiry(&SecretString::from(response.jwt))?;
        let user = convert_user(response.user);
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Forget the stored token.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the token cannot be removed.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.tokens.remove()?;
        info!("Logged out");
        Ok(())
    }

    /// Whether a usable token is stored.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if storage cannot be read.
    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.tokens.is_authenticated()?)
    }

    /// Fetch the user the stored token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` without a token, or `Http` 401 if the backend
    /// rejects it.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let data: UserData = self.api.get("/users/me", &[], AuthMode::Required).await?;
        Ok(convert_user(data))
    }
}
