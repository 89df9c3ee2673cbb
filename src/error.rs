//! Error types for the Gridt core.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and keeps the user-visible
//! messages in one place.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AnnouncementId, MovementId, UserId};

/// Validation errors that occur before any row is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("Field '{field}' cannot be empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },

    /// Field exceeds its column length.
    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        /// Field name.
        field: &'static str,
        /// Maximum allowed.
        max_length: usize,
    },

    /// The email address is already registered.
    #[error("Email '{email}' is already registered")]
    EmailTaken {
        /// The offending address.
        email: String,
    },

    /// The user already holds an active relation of this kind.
    #[error("User '{user_id}' already has an active {kind} for movement '{movement_id}'")]
    DuplicateRelation {
        /// Relation discriminator (`subscription` or `creation`).
        kind: &'static str,
        /// The user.
        user_id: UserId,
        /// The movement.
        movement_id: MovementId,
    },
}

/// Domain failures surfaced to callers, one per documented precondition of
/// the public operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// User not found.
    #[error("No user with id '{id}' found")]
    UserNotFound {
        /// Missing user id.
        id: UserId,
    },

    /// Movement not found (by id or name).
    #[error("No movement '{identifier}' found")]
    MovementNotFound {
        /// The id or name that failed to resolve.
        identifier: String,
    },

    /// No active subscription between the user and the movement.
    #[error("User '{user_id}' is not subscribed to movement '{movement_id}'")]
    SubscriptionNotFound {
        /// The user.
        user_id: UserId,
        /// The movement.
        movement_id: MovementId,
    },

    /// Announcement not found or already removed.
    #[error("No announcement with id '{id}' found")]
    AnnouncementNotFound {
        /// Missing announcement id.
        id: AnnouncementId,
    },

    /// The user did not create the movement.
    #[error("User '{user_id}' has not created movement '{movement_id}'")]
    UserIsNotCreator {
        /// The user.
        user_id: UserId,
        /// The movement.
        movement_id: MovementId,
    },

    /// The operation requires administrator rights.
    #[error("User '{user_id}' is not an administrator")]
    UserNotAdmin {
        /// The user.
        user_id: UserId,
    },

    /// No active link between follower and leader.
    #[error("User '{follower_id}' does not follow '{leader_id}' in movement '{movement_id}'")]
    NotFollowing {
        /// The follower.
        follower_id: UserId,
        /// The leader.
        leader_id: UserId,
        /// The movement.
        movement_id: MovementId,
    },

    /// The user has no active subscription required for this operation.
    #[error("User '{user_id}' is not subscribed to movement '{movement_id}' and cannot signal")]
    NotSubscribed {
        /// The user.
        user_id: UserId,
        /// The movement.
        movement_id: MovementId,
    },

    /// Unknown email or password mismatch.
    #[error("Invalid email or password")]
    BadCredentials,

    /// The operation deadline elapsed; the session was rolled back.
    #[error("Operation deadline {deadline} exceeded")]
    Timeout {
        /// The deadline that was missed.
        deadline: DateTime<Utc>,
    },
}

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique constraint was violated.
    #[error("Duplicate key: {constraint}")]
    Duplicate {
        /// Name of the violated constraint.
        constraint: &'static str,
    },

    /// A referenced row does not exist.
    #[error("Missing row: {description}")]
    MissingRow {
        /// What was being looked up.
        description: String,
    },

    /// A check constraint was violated.
    #[error("Constraint violated: {constraint}")]
    CheckViolation {
        /// Name of the violated constraint.
        constraint: &'static str,
    },

    /// Backend failure (lock poisoning, connection loss).
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The configured connection URL names an unknown backend.
    #[error("Unsupported database url: {0}")]
    UnsupportedUrl(String),
}

impl StorageError {
    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors raised while encoding or verifying HS256 tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token string is not a well-formed compact token.
    #[error("Malformed token: {reason}")]
    Malformed {
        /// What failed to parse.
        reason: String,
    },

    /// The signature does not match the payload.
    #[error("Token signature mismatch")]
    BadSignature,

    /// The token expired.
    #[error("Token expired at {expired_at}")]
    Expired {
        /// Expiry instant.
        expired_at: DateTime<Utc>,
    },
}

/// Top-level error type for the Gridt core.
#[derive(Debug, Error)]
pub enum GridtError {
    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A documented precondition failed.
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// The store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A token could not be decoded or verified.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Outbound email failed where the operation is the send.
    #[error("Email error: {message}")]
    Email {
        /// Error details.
        message: String,
    },

    /// Internal system error.
    #[error("Internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

impl GridtError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an email error.
    #[must_use]
    pub fn email(message: impl Into<String>) -> Self {
        Self::Email {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a domain error.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Returns true if retrying the operation may succeed.
    ///
    /// Only transient backend failures qualify; validation and domain
    /// failures will not change on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Backend(_)))
    }
}

/// Result type alias for Gridt operations.
pub type GridtResult<T> = Result<T, GridtError>;
