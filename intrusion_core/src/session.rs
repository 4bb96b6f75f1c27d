//! Breach sessions and the synchronous two-phase API.
//!
//! A session is created by [`BreachDirector::begin_session`], resolved
//! externally (the minigame itself is not this crate's concern), and consumed
//! by [`BreachDirector::resolve_session`]. All persisted-state mutation
//! happens inside resolution; beginning a session never mutates anything.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;
use thiserror::Error;
use tracing::{info, warn};

use crate::bonus;
use crate::config::PolicyConfig;
use crate::filter::{self, FilterContext};
use crate::grants::{GrantCatalog, GrantId, UnlockFlags};
use crate::inject;
use crate::penalty;
use crate::propagate;
use crate::store::{NodeStateStore, SimTime};
use crate::world::{NodeId, PlayerId, WorldIndex};

/// The three breach entry points. They share the core pipeline but diverge
/// in initial candidates and lock strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreachContext {
    Gateway,
    IncapacitatedTarget,
    Remote,
}

/// External resolution of the minigame for one session.
#[derive(Debug, Clone)]
pub enum BreachOutcome {
    Success { executed: Vec<GrantId> },
    Failure,
}

/// Player snapshot consulted by the failure path.
#[derive(Debug, Clone, Copy)]
pub struct PlayerState {
    pub id: PlayerId,
    pub position: Vec3,
    pub revealed: bool,
    pub in_combat: bool,
}

/// Ephemeral context for one breach attempt. Never persisted.
#[derive(Debug, Clone)]
pub struct BreachSession {
    pub context: BreachContext,
    pub target: NodeId,
    pub player: PlayerId,
    /// Network centroid for gateway sessions, target position otherwise.
    pub origin: Vec3,
    pub started_at: SimTime,
    pub candidates: Vec<GrantId>,
    pub traps: Vec<GrantId>,
}

/// Fire-and-forget outcome summary handed to the host.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub success: bool,
    pub executed_grants: u32,
    pub unlock_flags: UnlockFlags,
    pub network_nodes: u32,
    pub newly_unlocked: u32,
    pub rolled_back: u32,
    pub standalone_unlocked: u32,
    pub executions: u32,
    pub reward_tier: Option<u8>,
    pub reconnaissance_added: bool,
}

/// Host boundary for every immediate effect the core triggers. Return values
/// are never consulted; every method defaults to a no-op so hosts implement
/// only what they render.
pub trait EffectSink {
    /// Apply a granted capability's transient effect to one node.
    fn execute_capability(&mut self, _node: NodeId, _grant: &GrantId) {}
    /// Transient audio/visual failure feedback.
    fn failure_feedback(&mut self, _node: NodeId) {}
    /// Gateway lock: the target's primary interaction goes dark immediately.
    fn disable_primary_interaction(&mut self, _node: NodeId) {}
    /// Incapacitated-target lock: the interaction menu must refresh.
    fn refresh_interaction_menu(&mut self, _node: NodeId) {}
    /// Delayed position reveal performed by a nearby hostile actor.
    fn request_position_reveal(&mut self, _revealer: NodeId, _of: PlayerId) {}
    /// Session outcome statistics.
    fn report_outcome(&mut self, _report: &SessionReport) {}
}

/// Sink that drops every effect. Useful for headless evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EffectSink for NoopSink {}

#[derive(Debug, Error)]
pub enum BreachError {
    #[error("breach target node {0} does not exist")]
    MissingTarget(u32),
    #[error("breach target node {0} is locked out")]
    TargetLocked(u32),
}

#[derive(Debug, Clone, Copy)]
pub struct BeginSessionParams {
    pub context: BreachContext,
    pub target: NodeId,
    pub player: PlayerId,
}

/// Entry point owned by the host. Remembers the last breach origin per
/// player for later radius-based systems.
#[derive(Resource, Debug, Default, Clone)]
pub struct BreachDirector {
    last_origins: HashMap<PlayerId, Vec3>,
}

impl BreachDirector {
    /// Open a session: validate the target, compute its network and origin,
    /// inject candidates, and run the filter pipeline. Read-only with
    /// respect to persisted state apart from lazy lock expiry.
    pub fn begin_session(
        &mut self,
        params: BeginSessionParams,
        world: &WorldIndex,
        store: &mut NodeStateStore,
        catalog: &GrantCatalog,
        config: &PolicyConfig,
        now: SimTime,
    ) -> Result<BreachSession, BreachError> {
        let Some(record) = world.get(params.target) else {
            warn!(target = params.target.0, "breach target missing; aborting");
            return Err(BreachError::MissingTarget(params.target.0));
        };
        if penalty::is_locked(params.target, params.player, world, store, config, now) {
            return Err(BreachError::TargetLocked(params.target.0));
        }

        let network = world.connected_network(params.target);
        let origin = match params.context {
            BreachContext::Gateway => world.network_centroid(&network),
            BreachContext::IncapacitatedTarget | BreachContext::Remote => record.position,
        };

        let injected = inject::initial_candidates(params.context, record, catalog, config);
        let cx = FilterContext::for_session(params.context, &network, world, store, config);
        let candidates = filter::run_pipeline(injected, catalog, &cx);

        let traps = if params.context == BreachContext::Gateway {
            catalog
                .trap_grants()
                .map(|template| template.id.clone())
                .collect()
        } else {
            Vec::new()
        };

        info!(
            target = params.target.0,
            context = ?params.context,
            candidates = candidates.len(),
            network = network.len(),
            "breach session opened"
        );

        Ok(BreachSession {
            context: params.context,
            target: params.target,
            player: params.player,
            origin,
            started_at: now,
            candidates,
            traps,
        })
    }

    /// Resolve and consume a session. All mutation happens here,
    /// synchronously; the failure path touches lock state only.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_session(
        &mut self,
        session: BreachSession,
        outcome: BreachOutcome,
        world: &WorldIndex,
        store: &mut NodeStateStore,
        catalog: &GrantCatalog,
        config: &PolicyConfig,
        sink: &mut dyn EffectSink,
        player: &PlayerState,
        now: SimTime,
    ) -> SessionReport {
        let report = match outcome {
            BreachOutcome::Success { executed } => {
                let mut executed = executed;
                executed.retain(|id| {
                    let offered = session.candidates.contains(id);
                    if !offered {
                        warn!(
                            grant = %id,
                            "ignoring executed grant that was never a candidate"
                        );
                    }
                    offered
                });
                let prop = propagate::apply_success(
                    &session, &executed, world, store, catalog, config, sink, now,
                );
                let extra =
                    bonus::derive_bonus_grants(&session, &mut executed, catalog, config, sink);
                self.last_origins.insert(session.player, session.origin);
                SessionReport {
                    success: true,
                    executed_grants: executed.len() as u32,
                    unlock_flags: UnlockFlags::from_grants(
                        executed.iter().filter_map(|id| catalog.get(id)),
                    ),
                    network_nodes: prop.network_nodes,
                    newly_unlocked: prop.newly_unlocked,
                    rolled_back: prop.rolled_back,
                    standalone_unlocked: prop.standalone_unlocked,
                    executions: prop.executions,
                    reward_tier: extra.reward_tier,
                    reconnaissance_added: extra.reconnaissance_added,
                }
            }
            BreachOutcome::Failure => {
                penalty::apply_failure(&session, world, store, config, sink, player, now);
                SessionReport {
                    success: false,
                    ..SessionReport::default()
                }
            }
        };
        sink.report_outcome(&report);
        report
    }

    /// Menu-facing lock query; see [`penalty::is_locked`].
    pub fn is_locked(
        &self,
        node: NodeId,
        player: PlayerId,
        world: &WorldIndex,
        store: &mut NodeStateStore,
        config: &PolicyConfig,
        now: SimTime,
    ) -> bool {
        penalty::is_locked(node, player, world, store, config, now)
    }

    pub fn last_breach_origin(&self, player: PlayerId) -> Option<Vec3> {
        self.last_origins.get(&player).copied()
    }
}
