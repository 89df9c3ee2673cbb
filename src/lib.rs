//! # Gridt core
//!
//! The graph-maintenance and relationship engine behind the Gridt
//! habit-accountability network. Users subscribe to *movements* and are
//! automatically wired into a bounded peer graph: every subscriber observes
//! up to four *leaders* and may in turn lead others. Leaders emit *signals*,
//! administrators broadcast *announcements*, and the engine keeps the graph
//! consistent across every subscribe, unsubscribe and leader swap.
//!
//! This crate is the core only: no HTTP surface, no SMTP transport, no
//! schema migrations. It consumes a relational store with scoped sessions,
//! an injectable clock, an injectable random source and a pluggable mailer.
//!
//! ## Usage
//!
//! ```rust
//! use gridt::{Gridt, GridtConfig};
//!
//! let gridt = Gridt::open(GridtConfig::default()).unwrap();
//!
//! let admin = gridt.register("antonin", "antonin@gridt.org", "pw", true).unwrap();
//! gridt
//!     .new_movement_by_user(admin, "Meditate everyday", "daily", None, None, true)
//!     .unwrap();
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod email;
pub mod error;
pub mod events;
pub mod models;
pub mod rng;
pub mod storage;
pub mod token;

mod controllers;
mod engine;
mod timefmt;
mod views;

// Re-export primary types at crate root for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GridtConfig;
pub use email::{DiscardMailer, FailingMailer, Mailer, RecordedEmail, RecordingMailer};
pub use engine::{Gridt, GridtBuilder};
pub use error::{
    DomainError, GridtError, GridtResult, StorageError, TokenError, ValidationError,
};
pub use events::EventKind;
pub use models::{
    Announcement, AnnouncementId, LinkId, Movement, MovementId, MovementUserRelation, RelationId,
    RelationKind, Signal, SignalId, User, UserId, UserToUserLink,
};
pub use rng::{RandomSource, SeededRandom, ThreadRandom};
pub use storage::{Database, Session};
pub use timefmt::format_timestamp;
pub use token::TokenClaims;
