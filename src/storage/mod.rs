//! The relational store.
//!
//! The core consumes a store that hands out **exclusive scoped sessions**:
//! an operation body runs against the whole row set; returning `Ok` commits,
//! returning `Err` rolls the session back to its pre-session state, and the
//! session is always released. Hooks never nest scopes; they open fresh
//! ones after the primary commit.
//!
//! The in-memory engine below is the reference backend (and the test
//! backend, selected by `memory://`). Exclusivity of the session is what
//! serializes the graph-wiring read-then-write sequences; a SQL backend
//! would provide the same surface with serializable transactions.

mod session;

pub use session::Session;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;
use crate::error::{GridtResult, StorageError};
use crate::models::{
    Announcement, AnnouncementId, LinkId, Movement, MovementId, MovementUserRelation, RelationId,
    Signal, SignalId, User, UserId, UserToUserLink,
};

use std::collections::BTreeMap;

/// How often a wiring routine is attempted before a transient failure is
/// surfaced.
pub(crate) const WIRING_RETRY_ATTEMPTS: u32 = 3;

const RETRY_BASE_DELAY: StdDuration = StdDuration::from_millis(10);

/// All rows, keyed by their store-assigned ids.
///
/// `BTreeMap` keeps iteration in id order, which makes the reference
/// backend deterministic under a seeded random source.
#[derive(Debug, Clone, Default)]
pub(crate) struct DbState {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) movements: BTreeMap<MovementId, Movement>,
    pub(crate) relations: BTreeMap<RelationId, MovementUserRelation>,
    pub(crate) links: BTreeMap<LinkId, UserToUserLink>,
    pub(crate) signals: BTreeMap<SignalId, Signal>,
    pub(crate) announcements: BTreeMap<AnnouncementId, Announcement>,
    pub(crate) next_user: i64,
    pub(crate) next_movement: i64,
    pub(crate) next_relation: i64,
    pub(crate) next_link: i64,
    pub(crate) next_signal: i64,
    pub(crate) next_announcement: i64,
}

/// The relational store with scoped sessions.
pub struct Database {
    state: Mutex<DbState>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens a store from a connection URL.
    ///
    /// `memory://` selects the in-memory engine; anything else is refused
    /// with [`StorageError::UnsupportedUrl`].
    pub fn open(url: &str, clock: Arc<dyn Clock>) -> Result<Self, StorageError> {
        if url == "memory://" || url == "memory" {
            Ok(Self::in_memory(clock))
        } else {
            Err(StorageError::UnsupportedUrl(url.to_string()))
        }
    }

    /// Creates an empty in-memory store.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(DbState::default()),
            clock,
        }
    }

    /// Runs `f` in an exclusive write session without a deadline.
    pub fn write<T>(&self, f: impl FnOnce(&mut Session<'_>) -> GridtResult<T>) -> GridtResult<T> {
        self.write_with_deadline(None, f)
    }

    /// Runs `f` in an exclusive write session.
    ///
    /// On `Ok` the session commits (after a final deadline check); on `Err`
    /// every change made inside the session is rolled back.
    pub fn write_with_deadline<T>(
        &self,
        deadline: Option<DateTime<Utc>>,
        f: impl FnOnce(&mut Session<'_>) -> GridtResult<T>,
    ) -> GridtResult<T> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StorageError::backend("session lock poisoned"))?;
        let snapshot = guard.clone();

        let result = {
            let mut session = Session::new(&mut guard, self.clock.as_ref(), deadline);
            match f(&mut session) {
                Ok(value) => session.check_deadline().map(|()| value),
                Err(err) => Err(err),
            }
        };

        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                *guard = snapshot;
                Err(err)
            }
        }
    }

    /// Runs `f` against a read-only view of the current state.
    pub fn read<T>(&self, f: impl FnOnce(&Session<'_>) -> GridtResult<T>) -> GridtResult<T> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StorageError::backend("session lock poisoned"))?;
        let session = Session::new(&mut guard, self.clock.as_ref(), None);
        f(&session)
    }
}

/// Retries `f` on transient storage failures with doubling backoff.
///
/// Validation and domain failures are surfaced on the first attempt; only
/// [`GridtError::is_retryable`](crate::GridtError::is_retryable) errors are
/// retried, at most `attempts` times in total.
pub(crate) fn retry_transient<T>(
    attempts: u32,
    mut f: impl FnMut() -> GridtResult<T>,
) -> GridtResult<T> {
    let mut delay = RETRY_BASE_DELAY;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f() {
            Err(err) if err.is_retryable() && attempt < attempts => {
                tracing::warn!(error = %err, attempt, "transient storage failure, retrying");
                thread::sleep(delay);
                delay *= 2;
            }
            other => return other,
        }
    }
}
