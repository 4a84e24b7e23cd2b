//! User identity and roles
//!
//! The card core does not own user CRUD; it consumes an identity lookup by
//! email or id returning the role set. [`UserRepository`] is that seam, with
//! an in-memory reference implementation for tests and embedding.

pub mod password;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core_types::UserId;
use crate::error::CoreError;

/// Authorization role, a closed set.
///
/// Serialized to the fixed wire strings below. Decoding is fail-closed: an
/// unknown role string fails claim deserialization and the carrying token is
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
    #[serde(rename = "ROLE_USER")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROLE_ADMIN" => Ok(Role::Admin),
            "ROLE_USER" => Ok(Role::User),
            other => Err(CoreError::validation(format!("Unknown role: {}", other))),
        }
    }
}

/// A user account as seen by the card core.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never returned in clear, never logged.
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Payload for creating a user through the repository seam.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

/// Identity lookup seam consumed by the core services.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. Fails `Duplicate` on an already-registered email and
    /// `Validation` on an empty role set.
    async fn create(&self, new_user: NewUser) -> Result<User, CoreError>;

    async fn find_by_email(&self, email: &str) -> Result<User, CoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, CoreError>;
}

/// In-memory reference implementation of [`UserRepository`].
pub struct InMemoryUsers {
    users: RwLock<HashMap<UserId, User>>,
    next_id: AtomicU64,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryUsers {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUsers {
    /// Replace a user's role set (admin role management lives outside the
    /// core; this hook exists for embedding and tests).
    pub fn set_roles(&self, id: UserId, roles: Vec<Role>) -> Result<(), CoreError> {
        if roles.is_empty() {
            return Err(CoreError::validation("User must have at least one role"));
        }
        let mut users = self.users.write().expect("user store lock poisoned");
        let user = users
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("UserId: {} not found", id)))?;
        user.roles = roles;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn create(&self, new_user: NewUser) -> Result<User, CoreError> {
        if new_user.roles.is_empty() {
            return Err(CoreError::validation("User must have at least one role"));
        }

        let mut users = self.users.write().expect("user store lock poisoned");
        if users.values().any(|u| u.email == new_user.email) {
            return Err(CoreError::Duplicate(format!(
                "Email already registered: {}",
                new_user.email
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let user = User {
            id,
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            roles: new_user.roles,
        };
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, CoreError> {
        self.users
            .read()
            .expect("user store lock poisoned")
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("User not found: {}", email)))
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, CoreError> {
        self.users
            .read()
            .expect("user store lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(format!("UserId: {} not found", id)))
    }
}
