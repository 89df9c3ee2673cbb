//! Graph snapshot for a movement.

use serde_json::{json, Value};

use crate::engine::Gridt;
use crate::error::GridtResult;
use crate::models::MovementId;

impl Gridt {
    /// A snapshot of the movement's peer graph.
    ///
    /// `nodes` holds `[user_id, last_signal | null]` for every active
    /// subscriber; `edges` holds `[follower_id, leader_id]` for every
    /// active link.
    pub fn get_network_data(&self, movement_id: MovementId) -> GridtResult<Value> {
        self.db().read(|s| {
            s.movement(movement_id)?;

            let edges: Vec<Value> = s
                .active_links_in(movement_id)
                .into_iter()
                .map(|link| json!([link.follower_id, link.leader_id]))
                .collect();

            let nodes: Vec<Value> = s
                .active_subscriber_ids(movement_id)
                .into_iter()
                .map(|user_id| {
                    let last_signal = s
                        .last_signal(user_id, movement_id)
                        .map_or(Value::Null, |signal| signal.to_json());
                    json!([user_id, last_signal])
                })
                .collect();

            Ok(json!({ "nodes": nodes, "edges": edges }))
        })
    }
}
