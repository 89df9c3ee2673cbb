//! Shared fixtures for the end-to-end suites.

// Not every suite exercises every helper.
#![allow(dead_code)]

use std::sync::Arc;

use gridt::{
    Clock, FixedClock, Gridt, GridtConfig, MovementId, RecordingMailer, RelationKind,
    SeededRandom, UserId,
};

/// An engine with pinned clock, seeded randomness and a recording mailer.
pub struct Harness {
    pub gridt: Gridt,
    pub clock: Arc<FixedClock>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn harness() -> Harness {
    harness_with_seed(42)
}

pub fn harness_with_seed(seed: u64) -> Harness {
    let clock = Arc::new(FixedClock::at_ymd_hms(2023, 2, 25, 16, 30, 0));
    let mailer = Arc::new(RecordingMailer::new());
    let gridt = Gridt::builder()
        .config(GridtConfig::default().with_secret_key("e2e-secret"))
        .clock(clock.clone())
        .random(Arc::new(SeededRandom::new(seed)))
        .mailer(mailer.clone())
        .build()
        .expect("engine");
    Harness {
        gridt,
        clock,
        mailer,
    }
}

impl Harness {
    /// Registers a regular user named `name` with `<name>@gridt.org`.
    pub fn user(&self, name: &str) -> UserId {
        self.gridt
            .register(name, &format!("{name}@gridt.org"), "password", false)
            .expect("register user")
    }

    /// Registers an administrator.
    pub fn admin(&self, name: &str) -> UserId {
        self.gridt
            .register(name, &format!("{name}@gridt.org"), "password", true)
            .expect("register admin")
    }

    /// Creates a daily movement through the registry.
    pub fn movement(&self, name: &str) -> MovementId {
        let json = self
            .gridt
            .create_movement(name, "daily", None, None)
            .expect("create movement");
        MovementId::from(json["id"].as_i64().expect("movement id"))
    }

    /// Inserts a subscription row directly, without firing the wiring
    /// hooks. For building hand-rolled graph fixtures.
    pub fn subscribe_silently(&self, user_id: UserId, movement_id: MovementId) {
        let now = self.clock.now();
        self.gridt
            .database()
            .write(|s| {
                s.insert_relation(RelationKind::Subscription, user_id, movement_id, now)?;
                Ok(())
            })
            .expect("insert subscription");
    }

    /// Inserts an active link directly, bypassing the wiring routines.
    pub fn link_silently(&self, follower: UserId, leader: UserId, movement_id: MovementId) {
        let now = self.clock.now();
        self.gridt
            .database()
            .write(|s| {
                s.insert_link(follower, leader, movement_id, now)?;
                Ok(())
            })
            .expect("insert link");
    }

    /// Destroys the active (follower, leader) link directly.
    pub fn destroy_link_silently(&self, follower: UserId, leader: UserId, movement_id: MovementId) {
        let now = self.clock.now();
        self.gridt
            .database()
            .write(|s| {
                let link_id = s
                    .active_link(follower, leader, movement_id)
                    .map(|link| link.id)
                    .expect("active link");
                s.link_mut(link_id)?.destroy(now);
                Ok(())
            })
            .expect("destroy link");
    }

    /// The active edges of a movement as (follower, leader) pairs.
    pub fn active_edges(&self, movement_id: MovementId) -> Vec<(UserId, UserId)> {
        self.gridt
            .database()
            .read(|s| {
                Ok(s.active_links_in(movement_id)
                    .into_iter()
                    .map(|link| (link.follower_id, link.leader_id))
                    .collect())
            })
            .expect("read edges")
    }
}
