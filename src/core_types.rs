//! Core types used throughout the system
//!
//! Fundamental identifier aliases shared by all modules. They provide
//! semantic meaning and enable future type evolution.

/// Card ID - globally unique identifier for a card record.
///
/// # Constraints:
/// - **Immutable**: Once assigned, NEVER changes
/// - **Ordered**: Two-card operations acquire locks in ascending id order
pub type CardId = u64;

/// User ID - globally unique, immutable after assignment.
///
/// # Usage:
/// - Primary key for user accounts
/// - Card ownership reference
pub type UserId = u64;
