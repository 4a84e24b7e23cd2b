//! Sign-in and token refresh
//!
//! Credential verification against the stored Argon2 hash, then token
//! issuance. The error for a wrong password and for an unknown email is the
//! same on purpose.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::auth::token::{TokenPair, TokenService};
use crate::error::CoreError;
use crate::user::{UserRepository, password};

const BAD_CREDENTIALS: &str = "Email or Password is not correct";

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Authenticate credentials and issue a token pair.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<TokenPair, CoreError> {
        let user = self
            .users
            .find_by_email(&credentials.email)
            .await
            .map_err(|_| CoreError::AccessDenied(BAD_CREDENTIALS.to_string()))?;

        if !password::verify_password(&credentials.password, &user.password_hash) {
            return Err(CoreError::AccessDenied(BAD_CREDENTIALS.to_string()));
        }

        info!(email = %user.email, "User signed in");
        self.tokens.issue_pair(&user.email, &user.roles)
    }

    /// Exchange a valid refresh token for a new access token. Roles are
    /// re-resolved so a grant or revocation since issue is honored; the
    /// refresh token itself is returned unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, CoreError> {
        if !self.tokens.validate(refresh_token) {
            return Err(CoreError::AccessDenied("Invalid refresh token".to_string()));
        }

        let email = self.tokens.subject(refresh_token)?;
        let user = self
            .users
            .find_by_email(&email)
            .await
            .map_err(|_| CoreError::AccessDenied("Invalid refresh token".to_string()))?;

        self.tokens
            .refresh_pair(&user.email, &user.roles, refresh_token)
    }
}
