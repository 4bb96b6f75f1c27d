//! Execution and unlock propagation for successful sessions.
//!
//! Per node, the four category sub-states only ever move locked → unlocked.
//! The single exception is the bounded same-session rollback in step two,
//! which corrects an over-broad default unlock written while the minigame
//! was still resolving; stamps from strictly earlier sessions are never
//! touched.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::config::PolicyConfig;
use crate::grants::{GrantCatalog, GrantId, GrantTarget, UnlockFlags};
use crate::session::{BreachSession, EffectSink};
use crate::spatial;
use crate::store::{NodeStateStore, SimTime};
use crate::world::{NodeCategory, WorldIndex};

/// Counters summarising one propagation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    pub network_nodes: u32,
    pub rolled_back: u32,
    pub newly_unlocked: u32,
    pub executions: u32,
    pub standalone_unlocked: u32,
}

/// Apply every consequence of a successful breach. The failure path never
/// reaches this function.
pub fn apply_success(
    session: &BreachSession,
    executed: &[GrantId],
    world: &WorldIndex,
    store: &mut NodeStateStore,
    catalog: &GrantCatalog,
    config: &PolicyConfig,
    sink: &mut dyn EffectSink,
    now: SimTime,
) -> PropagationReport {
    let mut report = PropagationReport::default();
    let network = world.connected_network(session.target);
    report.network_nodes = network.len() as u32;

    let flags = UnlockFlags::from_grants(executed.iter().filter_map(|id| catalog.get(id)));

    // Step 2: roll back this-session default unlocks for categories the
    // player did not actually earn. The stamp comparison is the guard:
    // anything stamped before the session began survives untouched.
    for &node in &network {
        for category in NodeCategory::ALL {
            if flags.covers(category) {
                continue;
            }
            if let Some(stamp) = store.unlocked_since(node, category) {
                if stamp >= session.started_at {
                    store.rollback(node, category);
                    report.rolled_back += 1;
                    debug!(
                        node = node.0,
                        ?category,
                        "rolled back default unlock not covered by executed grants"
                    );
                }
            }
        }
    }

    // Step 3: stamp every earned category across the network. Idempotent on
    // nodes that were already unlocked.
    for &node in &network {
        for category in NodeCategory::ALL {
            if !flags.covers(category) {
                continue;
            }
            if !store.is_unlocked(node, category) {
                report.newly_unlocked += 1;
            }
            store.unlock(node, category, now);
        }
    }

    // Step 4: run each executed grant against its matching nodes. This is
    // the transient effect hook, independent of the persistent unlock.
    for id in executed {
        let Some(template) = catalog.get(id) else {
            warn!(grant = %id, "executed grant missing from catalog; skipping effects");
            continue;
        };
        match template.target {
            GrantTarget::Universal => {
                sink.execute_capability(session.target, id);
                report.executions += 1;
            }
            target => {
                for &node in &network {
                    let matches = world
                        .get(node)
                        .map(|record| target.matches(record.category()))
                        .unwrap_or(false);
                    if matches {
                        sink.execute_capability(node, id);
                        report.executions += 1;
                    }
                }
            }
        }
    }

    // Step 5: pull nearby nodes outside the formal network into the unlock.
    // Physical-range gating widens this to any matching node in range;
    // otherwise only standalone nodes within the standalone radius qualify.
    let target_record = world.get(session.target);
    let gating = target_record
        .map(|record| spatial::spatial_gating_active(session.context, record, config))
        .unwrap_or(false);
    let extra = if gating {
        spatial::range_targets(world, session.origin, config.gating.range_radius, flags)
    } else {
        spatial::standalone_targets(world, session.origin, config.gating.standalone_radius, flags)
    };
    let members: HashSet<_> = network.iter().copied().collect();
    for node in extra {
        if members.contains(&node) {
            continue;
        }
        let mut touched = false;
        for category in NodeCategory::ALL {
            if flags.covers(category) {
                if !store.is_unlocked(node, category) {
                    touched = true;
                }
                store.unlock(node, category, now);
            }
        }
        if touched {
            report.standalone_unlocked += 1;
        }
        for id in executed {
            let Some(template) = catalog.get(id) else {
                continue;
            };
            if template.target == GrantTarget::Universal {
                continue;
            }
            let matches = world
                .get(node)
                .map(|record| template.target.matches(record.category()))
                .unwrap_or(false);
            if matches {
                sink.execute_capability(node, id);
                report.executions += 1;
            }
        }
    }

    info!(
        target = session.target.0,
        flags = ?flags,
        network = report.network_nodes,
        unlocked = report.newly_unlocked,
        rolled_back = report.rolled_back,
        "breach success propagated"
    );
    report
}
