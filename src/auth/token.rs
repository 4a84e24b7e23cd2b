//! Session token service
//!
//! HS256 JWT pairs: a short-lived access token carrying subject + roles and a
//! long-lived refresh token carrying the subject only. Tokens are not
//! persisted; validity is purely signature + embedded expiry. The signing key
//! and both expiry windows are process-wide configuration loaded once - a new
//! key invalidates every outstanding token.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ulid::Ulid;

use crate::config::JwtConfig;
use crate::error::CoreError;
use crate::user::Role;

/// JWT claims structure
///
/// `roles` and `jti` are present on access tokens only. Role decoding is
/// fail-closed: an unknown role string fails deserialization and the token
/// reads as invalid.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    /// Unique per issue, so back-to-back refreshes within one second still
    /// produce distinct access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

/// Access + refresh token pair as returned to the boundary.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenService {
    /// Build the service from configuration. The secret is base64-encoded
    /// HS256 key material; a malformed secret fails at startup.
    pub fn new(config: &JwtConfig) -> Result<Self, CoreError> {
        let encoding_key = EncodingKey::from_base64_secret(&config.secret)
            .map_err(|e| CoreError::Crypto(format!("Invalid jwt secret: {}", e)))?;
        let decoding_key = DecodingKey::from_base64_secret(&config.secret)
            .map_err(|e| CoreError::Crypto(format!("Invalid jwt secret: {}", e)))?;
        Ok(Self {
            encoding_key,
            decoding_key,
            access_ttl: chrono::Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: chrono::Duration::days(config.refresh_ttl_days),
        })
    }

    /// Issue a fresh access + refresh pair for an authenticated subject.
    pub fn issue_pair(&self, email: &str, roles: &[Role]) -> Result<TokenPair, CoreError> {
        Ok(TokenPair {
            access_token: self.generate_access(email, roles)?,
            refresh_token: self.generate_refresh(email)?,
        })
    }

    /// Re-issue the access token against current roles while reusing the
    /// caller's refresh token string unchanged.
    pub fn refresh_pair(
        &self,
        email: &str,
        roles: &[Role],
        refresh_token: &str,
    ) -> Result<TokenPair, CoreError> {
        Ok(TokenPair {
            access_token: self.generate_access(email, roles)?,
            refresh_token: refresh_token.to_string(),
        })
    }

    /// True iff the signature verifies and the token has not expired. Every
    /// parse, signature or expiry failure maps to `false`; nothing escapes
    /// this boundary for a malformed token.
    pub fn validate(&self, token: &str) -> bool {
        match decode::<Claims>(token, &self.decoding_key, &self.validation()) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Token rejected");
                false
            }
        }
    }

    /// Extract the subject. The signature is still verified but expiry is
    /// not; callers that care about expiry call [`validate`](Self::validate)
    /// first.
    pub fn subject(&self, token: &str) -> Result<String, CoreError> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.sub)
            .map_err(|_| CoreError::AccessDenied("Invalid token".to_string()))
    }

    /// Role claims of a valid token; empty for refresh tokens.
    pub fn roles(&self, token: &str) -> Result<Vec<Role>, CoreError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation())
            .map(|data| data.claims.roles.unwrap_or_default())
            .map_err(|_| CoreError::AccessDenied("Invalid token".to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }

    fn generate_access(&self, email: &str, roles: &[Role]) -> Result<String, CoreError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.access_ttl)
            .expect("valid timestamp");
        let claims = Claims {
            sub: email.to_string(),
            roles: Some(roles.to_vec()),
            jti: Some(Ulid::new().to_string()),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| CoreError::Crypto(format!("Failed to generate token: {}", e)))
    }

    fn generate_refresh(&self, email: &str) -> Result<String, CoreError> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(self.refresh_ttl)
            .expect("valid timestamp");
        let claims = Claims {
            sub: email.to_string(),
            roles: None,
            jti: None,
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| CoreError::Crypto(format!("Failed to generate token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "dGVzdC1zaWduaW5nLWtleS0wMTIzNDU2Nzg5YWJjZGVm";

    fn service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        })
        .unwrap()
    }

    fn expired_service() -> TokenService {
        TokenService::new(&JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_ttl_minutes: -1,
            refresh_ttl_days: -1,
        })
        .unwrap()
    }

    #[test]
    fn test_fresh_pair_validates() {
        let svc = service();
        let pair = svc.issue_pair("alice@example.com", &[Role::User]).unwrap();
        assert!(svc.validate(&pair.access_token));
        assert!(svc.validate(&pair.refresh_token));
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let svc = service();
        let pair = expired_service()
            .issue_pair("alice@example.com", &[Role::User])
            .unwrap();
        assert!(!svc.validate(&pair.access_token));
        assert!(!svc.validate(&pair.refresh_token));
    }

    #[test]
    fn test_garbage_and_tampered_tokens_are_invalid() {
        let svc = service();
        assert!(!svc.validate("not-a-jwt"));
        assert!(!svc.validate(""));

        let pair = svc.issue_pair("alice@example.com", &[Role::User]).unwrap();
        let mut tampered = pair.access_token.clone();
        tampered.pop();
        assert!(!svc.validate(&tampered));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let svc = service();
        let other = TokenService::new(&JwtConfig {
            secret: "b3RoZXIta2V5LW90aGVyLWtleS1vdGhlci1rZXkh".to_string(),
            access_ttl_minutes: 30,
            refresh_ttl_days: 7,
        })
        .unwrap();
        let pair = other.issue_pair("alice@example.com", &[Role::User]).unwrap();
        assert!(!svc.validate(&pair.access_token));
    }

    #[test]
    fn test_subject_skips_expiry_but_not_signature() {
        let svc = service();
        let pair = expired_service()
            .issue_pair("alice@example.com", &[Role::User])
            .unwrap();
        assert_eq!(svc.subject(&pair.access_token).unwrap(), "alice@example.com");
        assert!(svc.subject("not-a-jwt").is_err());
    }

    #[test]
    fn test_roles_round_trip() {
        let svc = service();
        let pair = svc
            .issue_pair("alice@example.com", &[Role::Admin, Role::User])
            .unwrap();
        assert_eq!(
            svc.roles(&pair.access_token).unwrap(),
            vec![Role::Admin, Role::User]
        );
        // Refresh tokens carry no role claims.
        assert_eq!(svc.roles(&pair.refresh_token).unwrap(), Vec::<Role>::new());
    }

    #[test]
    fn test_unknown_role_string_rejects_token() {
        let svc = service();
        let now = Utc::now().timestamp() as usize;
        let claims = serde_json::json!({
            "sub": "alice@example.com",
            "roles": ["ROLE_SUPERUSER"],
            "exp": now + 600,
            "iat": now,
        });
        let key = EncodingKey::from_base64_secret(TEST_SECRET).unwrap();
        let token = encode(&Header::default(), &claims, &key).unwrap();

        assert!(!svc.validate(&token));
        assert!(svc.roles(&token).is_err());
    }

    #[test]
    fn test_refresh_pair_reuses_refresh_token() {
        let svc = service();
        let pair = svc.issue_pair("alice@example.com", &[Role::User]).unwrap();
        let refreshed = svc
            .refresh_pair("alice@example.com", &[Role::User], &pair.refresh_token)
            .unwrap();

        assert_ne!(refreshed.access_token, pair.access_token);
        assert_eq!(refreshed.refresh_token, pair.refresh_token);
        assert!(svc.validate(&refreshed.access_token));
    }
}
