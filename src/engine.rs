//! Composition root.
//!
//! [`Gridt`] owns the store, the event bus and the injected collaborators
//! (clock, random source, mailer). Constructing it wires the graph-
//! maintenance hooks onto the bus; the public operations live in the
//! controller modules as `impl Gridt` blocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::GridtConfig;
use crate::controllers::follower;
use crate::email::{DiscardMailer, Mailer};
use crate::error::GridtResult;
use crate::events::{EventBus, EventKind};
use crate::models::{MovementId, UserId};
use crate::rng::{RandomSource, ThreadRandom};
use crate::storage::{retry_transient, Database, WIRING_RETRY_ATTEMPTS};

/// The Gridt core engine.
pub struct Gridt {
    db: Arc<Database>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    mailer: Arc<dyn Mailer>,
    config: GridtConfig,
}

impl Gridt {
    /// Opens an engine with the given configuration and default
    /// collaborators (system clock, thread randomness, discarding mailer).
    pub fn open(config: GridtConfig) -> GridtResult<Self> {
        Self::builder().config(config).build()
    }

    /// Starts a builder for injecting collaborators.
    #[must_use]
    pub fn builder() -> GridtBuilder {
        GridtBuilder::default()
    }

    /// Registers an additional listener on the event bus. Listeners are
    /// expected to be registered at startup, before traffic.
    pub fn on_event(
        &self,
        kind: EventKind,
        name: impl Into<String>,
        listener: impl Fn(UserId, MovementId) -> GridtResult<()> + Send + Sync + 'static,
    ) {
        self.bus.register(kind, name, listener);
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &GridtConfig {
        &self.config
    }

    /// Direct access to the underlying store, for fixtures and
    /// introspection. Regular traffic goes through the operations.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn rng(&self) -> &dyn RandomSource {
        self.rng.as_ref()
    }

    pub(crate) fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The absolute deadline for an operation starting now, when the
    /// configuration carries an operation timeout.
    pub(crate) fn deadline(&self) -> Option<DateTime<Utc>> {
        self.config
            .operation_timeout
            .map(|timeout| self.clock.now() + timeout)
    }
}

/// Builder for [`Gridt`].
pub struct GridtBuilder {
    config: GridtConfig,
    clock: Arc<dyn Clock>,
    rng: Arc<dyn RandomSource>,
    mailer: Arc<dyn Mailer>,
}

impl Default for GridtBuilder {
    fn default() -> Self {
        Self {
            config: GridtConfig::default(),
            clock: Arc::new(SystemClock),
            rng: Arc::new(ThreadRandom),
            mailer: Arc::new(DiscardMailer),
        }
    }
}

impl GridtBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: GridtConfig) -> Self {
        self.config = config;
        self
    }

    /// Injects the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Injects the random source.
    #[must_use]
    pub fn random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Injects the outbound mailer.
    #[must_use]
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    /// Opens the store and wires the graph hooks.
    pub fn build(self) -> GridtResult<Gridt> {
        let db = Arc::new(Database::open(
            &self.config.database_url,
            Arc::clone(&self.clock),
        )?);
        let bus = EventBus::new();
        wire_graph_hooks(
            &bus,
            &db,
            &self.clock,
            &self.rng,
            self.config.fanout_target,
        );

        Ok(Gridt {
            db,
            bus,
            clock: self.clock,
            rng: self.rng,
            mailer: self.mailer,
            config: self.config,
        })
    }
}

/// Registers the four graph-maintenance listeners.
///
/// Each listener opens its own session and is retried on transient store
/// failures; the bus isolates any terminal failure from the primary caller.
fn wire_graph_hooks(
    bus: &EventBus,
    db: &Arc<Database>,
    clock: &Arc<dyn Clock>,
    rng: &Arc<dyn RandomSource>,
    fanout_target: usize,
) {
    {
        let (db, clock, rng) = (Arc::clone(db), Arc::clone(clock), Arc::clone(rng));
        bus.register(EventKind::Subscribe, "add_initial_leaders", move |user, movement| {
            retry_transient(WIRING_RETRY_ATTEMPTS, || {
                follower::add_initial_leaders(
                    &db,
                    clock.as_ref(),
                    rng.as_ref(),
                    fanout_target,
                    user,
                    movement,
                )
            })
        });
    }
    {
        let (db, clock) = (Arc::clone(db), Arc::clone(clock));
        bus.register(EventKind::Subscribe, "add_initial_followers", move |user, movement| {
            retry_transient(WIRING_RETRY_ATTEMPTS, || {
                follower::add_initial_followers(&db, clock.as_ref(), fanout_target, user, movement)
            })
        });
    }
    {
        let (db, clock, rng) = (Arc::clone(db), Arc::clone(clock), Arc::clone(rng));
        bus.register(EventKind::Unsubscribe, "remove_all_leaders", move |user, movement| {
            retry_transient(WIRING_RETRY_ATTEMPTS, || {
                follower::remove_all_leaders(
                    &db,
                    clock.as_ref(),
                    rng.as_ref(),
                    fanout_target,
                    user,
                    movement,
                )
            })
        });
    }
    {
        let (db, clock, rng) = (Arc::clone(db), Arc::clone(clock), Arc::clone(rng));
        bus.register(EventKind::Unsubscribe, "remove_all_followers", move |user, movement| {
            retry_transient(WIRING_RETRY_ATTEMPTS, || {
                follower::remove_all_followers(&db, clock.as_ref(), rng.as_ref(), user, movement)
            })
        });
    }
}
