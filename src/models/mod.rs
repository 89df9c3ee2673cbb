//! Row types of the relational model.
//!
//! Every row is owned by the store; controllers only see borrowed handles
//! inside a session. Rows are retired by setting their end column
//! (`time_removed`, `destroyed`, `removed_time`), never by deletion.

mod announcement;
mod link;
mod movement;
mod relation;
mod signal;
mod user;

pub use announcement::Announcement;
pub use link::UserToUserLink;
pub use movement::Movement;
pub use relation::{MovementUserRelation, RelationKind};
pub use signal::Signal;
pub use user::{hash_password, verify_password, User, PASSWORD_HASH_ITERATIONS};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Column length of signal and announcement messages.
pub const MESSAGE_MAX_LEN: usize = 140;

macro_rules! row_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Returns the raw integer id.
            #[must_use]
            pub const fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id! {
    /// Store-assigned identifier of a [`User`].
    UserId
}

row_id! {
    /// Store-assigned identifier of a [`Movement`].
    MovementId
}

row_id! {
    /// Store-assigned identifier of a [`MovementUserRelation`] row.
    RelationId
}

row_id! {
    /// Store-assigned identifier of a [`UserToUserLink`] edge.
    LinkId
}

row_id! {
    /// Store-assigned identifier of a [`Signal`].
    SignalId
}

row_id! {
    /// Store-assigned identifier of an [`Announcement`].
    AnnouncementId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversion() {
        let id = UserId::from(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = MovementId::from(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        let back: MovementId = serde_json::from_str("7").unwrap();
        assert_eq!(back, id);
    }
}
