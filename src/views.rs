//! Composed JSON projections.
//!
//! A movement view is always composed for a viewer: the base movement JSON
//! plus `subscribed`, the latest active announcement and, only for
//! subscribers, the viewer's own last signal and their current leaders.

use serde_json::{json, Value};

use crate::error::GridtResult;
use crate::models::{Movement, MovementId, UserId};
use crate::storage::Session;

/// Composes the movement view for one viewer.
pub(crate) fn extend_movement_json(
    session: &Session<'_>,
    movement: &Movement,
    viewer_id: UserId,
) -> GridtResult<Value> {
    let mut view = movement.to_json();

    let subscribed = session.is_subscribed(viewer_id, movement.id);
    view["subscribed"] = json!(subscribed);
    add_last_announcement(session, &mut view, movement.id)?;

    if subscribed {
        view["last_signal_sent"] = session
            .last_signal(viewer_id, movement.id)
            .map_or(Value::Null, |signal| signal.to_json());

        let mut leaders = Vec::new();
        for leader_id in session.current_leaders(viewer_id, movement.id) {
            let leader = session.user(leader_id)?;
            let mut leader_json = leader.to_json(false);
            if let Some(signal) = session.last_signal(leader_id, movement.id) {
                leader_json["last_signal"] = signal.to_json();
            }
            leaders.push(leader_json);
        }
        view["leaders"] = Value::Array(leaders);
    }

    Ok(view)
}

/// Enriches a movement view with its single latest active announcement
/// (or an explicit null).
pub(crate) fn add_last_announcement(
    session: &Session<'_>,
    view: &mut Value,
    movement_id: MovementId,
) -> GridtResult<()> {
    view["last_announcement"] = match session.latest_announcement(movement_id) {
        Some(announcement) => {
            let poster = session.user(announcement.poster_id)?;
            announcement.to_json(poster)
        }
        None => Value::Null,
    };
    Ok(())
}
