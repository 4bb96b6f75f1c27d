//! Program injection engine: the initial candidate set for a breach session.
//!
//! Pure function of the breach context, the target record, and the catalog.
//! The filter pipeline is responsible for everything removed afterwards;
//! injection only decides what is on the table at all.

use std::collections::HashSet;

use tracing::warn;

use crate::config::PolicyConfig;
use crate::grants::{GrantCatalog, GrantId, GrantSource};
use crate::session::BreachContext;
use crate::world::{ActorFlags, NodeCategory, NodeRecord};

/// Category unlock grants offered for one context/target combination.
fn injected_categories(context: BreachContext, target: &NodeRecord) -> Vec<NodeCategory> {
    match context {
        // The gateway is the hub of its network: full privilege.
        BreachContext::Gateway => NodeCategory::ALL.to_vec(),
        // Privileged operators escalate an incapacitated-target breach to
        // full privilege; anyone else yields actor plus generic access.
        BreachContext::IncapacitatedTarget => {
            if target.actor_flags.contains(ActorFlags::PRIVILEGED_OPERATOR) {
                NodeCategory::ALL.to_vec()
            } else {
                vec![NodeCategory::Actor, NodeCategory::Generic]
            }
        }
        // Remote injection depends on the target node alone, never on the
        // composition of the network behind it.
        BreachContext::Remote => match target.category() {
            NodeCategory::VisualSensor => {
                vec![NodeCategory::VisualSensor, NodeCategory::Generic]
            }
            NodeCategory::DefenseTurret => {
                vec![NodeCategory::DefenseTurret, NodeCategory::Generic]
            }
            NodeCategory::Actor => vec![NodeCategory::Actor, NodeCategory::Generic],
            NodeCategory::Generic => vec![NodeCategory::Generic],
        },
    }
}

/// Build the initial candidate grant list for a session. No side effects.
///
/// Point-reward and quest-specific (non-trap) grants are always injected;
/// pipeline stages three and four decide whether they survive.
pub fn initial_candidates(
    context: BreachContext,
    target: &NodeRecord,
    catalog: &GrantCatalog,
    _config: &PolicyConfig,
) -> Vec<GrantId> {
    let mut candidates = Vec::new();

    for category in injected_categories(context, target) {
        match catalog.unlock_grant_for(category) {
            Some(template) => candidates.push(template.id.clone()),
            None => warn!(?category, "catalog ships no unlock grant for category"),
        }
    }

    for template in catalog.iter() {
        match template.source {
            GrantSource::PointReward => candidates.push(template.id.clone()),
            GrantSource::QuestSpecific if !template.trap => candidates.push(template.id.clone()),
            _ => {}
        }
    }

    let mut seen = HashSet::new();
    candidates.retain(|id| seen.insert(id.clone()));
    candidates
}
