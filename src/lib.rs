//! card-core - Bank Card Management Core
//!
//! Card issuance and lifecycle, balance transfers between a user's own
//! cards, PAN encryption at rest, and bearer-token authentication.
//!
//! # Modules
//!
//! - [`core_types`] - Core identifier aliases (CardId, UserId)
//! - [`error`] - Typed error taxonomy with boundary codes
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing setup
//! - [`vault`] - PAN encryption at rest
//! - [`card`] - Card model, lifecycle, store, masking, block requests
//! - [`transfer`] - Two-card atomic transfer engine
//! - [`user`] - Identity seam and roles
//! - [`auth`] - Session tokens and sign-in

// Core types - must be first!
pub mod core_types;

pub mod config;
pub mod error;
pub mod logging;

pub mod auth;
pub mod card;
pub mod transfer;
pub mod user;
pub mod vault;

// Convenient re-exports at crate root
pub use auth::{AuthService, Credentials, TokenPair, TokenService};
pub use card::{BlockIntake, BlockRequest, Card, CardLifecycle, CardQueries, CardStatus, CardStore};
pub use core_types::{CardId, UserId};
pub use error::CoreError;
pub use transfer::{TransferEngine, TransferRecord, TransferRequest};
pub use user::{InMemoryUsers, NewUser, Role, User, UserRepository};
pub use vault::PanVault;
