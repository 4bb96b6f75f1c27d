//! Failure penalties: context-specific lock strategies and the delayed
//! position-reveal attempt.
//!
//! Locks are written eagerly on failure and expire lazily: nothing clears a
//! stamp until the next read asks about it.

use tracing::{debug, info};

use crate::config::PolicyConfig;
use crate::session::{BreachContext, BreachSession, EffectSink, PlayerState};
use crate::spatial::radius_includes;
use crate::store::{NodeStateStore, SimTime};
use crate::world::{ActorFlags, DeviceKind, NodeId, PlayerId, WorldIndex};

/// Apply the full failure path for a resolved session.
pub fn apply_failure(
    session: &BreachSession,
    world: &WorldIndex,
    store: &mut NodeStateStore,
    config: &PolicyConfig,
    sink: &mut dyn EffectSink,
    player: &PlayerState,
    now: SimTime,
) {
    sink.failure_feedback(session.target);

    if config.locks.enabled {
        match session.context {
            BreachContext::Gateway if config.locks.gateway_lock => {
                store.stamp_lock(session.target, now);
                sink.disable_primary_interaction(session.target);
                info!(target = session.target.0, "gateway breach failed; target locked");
            }
            BreachContext::IncapacitatedTarget if config.locks.incapacitated_lock => {
                store.stamp_lock(session.target, now);
                sink.refresh_interaction_menu(session.target);
                info!(target = session.target.0, "target breach failed; actor locked");
            }
            BreachContext::Remote if config.locks.remote_lock => {
                // Hybrid lock: the failed node and its whole connected
                // network get direct stamps; the log entry covers standalone
                // nodes and vehicles inside the radius.
                store.stamp_lock(session.target, now);
                for node in world.connected_network(session.target) {
                    store.stamp_lock(node, now);
                }
                let position = world
                    .get(session.target)
                    .map(|record| record.position)
                    .unwrap_or(session.origin);
                store.remote_log_mut(session.player).append(position, now);
                info!(
                    target = session.target.0,
                    player = session.player.0,
                    "remote breach failed; network and radius locked"
                );
            }
            _ => {}
        }
    }

    attempt_position_reveal(world, config, sink, player);
}

/// Try to schedule the delayed position reveal. Silently does not apply when
/// no qualifying revealer exists or the player is already exposed.
pub fn attempt_position_reveal(
    world: &WorldIndex,
    config: &PolicyConfig,
    sink: &mut dyn EffectSink,
    player: &PlayerState,
) -> bool {
    if !config.reveal.enabled {
        return false;
    }
    if player.revealed || player.in_combat {
        debug!(player = player.id.0, "player already exposed; skipping reveal");
        return false;
    }
    let required = ActorFlags::HOSTILE | ActorFlags::REVEAL_CAPABLE;
    let revealer = world
        .iter()
        .filter(|record| {
            record.kind == DeviceKind::Actor
                && record.actor_flags.contains(required)
                && !record.actor_flags.contains(ActorFlags::INCAPACITATED)
                && radius_includes(player.position, record.position, config.reveal.search_radius)
        })
        .min_by(|a, b| {
            let da = a.position.distance_squared(player.position);
            let db = b.position.distance_squared(player.position);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
    match revealer {
        Some(record) => {
            sink.request_position_reveal(record.id, player.id);
            true
        }
        None => {
            debug!(player = player.id.0, "no qualifying revealer in range");
            false
        }
    }
}

/// Menu-facing lock query. Prunes the player's remote log, lazily clears an
/// expired direct stamp, then checks the direct stamp and radius coverage.
pub fn is_locked(
    node: NodeId,
    player: PlayerId,
    world: &WorldIndex,
    store: &mut NodeStateStore,
    config: &PolicyConfig,
    now: SimTime,
) -> bool {
    if !config.locks.enabled {
        return false;
    }
    let duration = config.locks.duration_secs;
    if store.clear_expired_lock(node, now, duration) {
        return true;
    }
    if config.locks.remote_lock {
        if let Some(record) = world.get(node) {
            let position = record.position;
            let log = store.remote_log_mut(player);
            log.prune(now, duration);
            if log.covers(position, config.locks.remote_radius, now, duration) {
                return true;
            }
        }
    }
    false
}
