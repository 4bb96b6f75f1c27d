//! Post-success bonus grant derivation.
//!
//! Runs exactly once per successful session, after propagation. Appended
//! grants join the session's executed list and fire through the same
//! execution hook as everything else.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::PolicyConfig;
use crate::grants::{GrantCatalog, GrantId, GrantSource};
use crate::session::{BreachSession, EffectSink};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BonusReport {
    pub reconnaissance_added: bool,
    pub reward_tier: Option<u8>,
}

fn reward_tier_for(distinct_non_reward: usize) -> Option<u8> {
    match distinct_non_reward {
        0 => None,
        1 => Some(1),
        2 => Some(2),
        _ => Some(3),
    }
}

/// Derive and execute bonus grants for a successful session.
///
/// The reward tier counts the grants the minigame itself resolved: it is
/// computed from the executed list as it stood on entry, so the auto-added
/// reconnaissance sweep never inflates the tier.
pub fn derive_bonus_grants(
    session: &BreachSession,
    executed: &mut Vec<GrantId>,
    catalog: &GrantCatalog,
    config: &PolicyConfig,
    sink: &mut dyn EffectSink,
) -> BonusReport {
    let mut report = BonusReport::default();

    let distinct_non_reward: HashSet<&GrantId> = executed
        .iter()
        .filter(|id| {
            catalog
                .get(id)
                .map(|template| template.source != GrantSource::PointReward)
                .unwrap_or(false)
        })
        .collect();
    let resolved_count = distinct_non_reward.len();
    let reward_present = executed.iter().any(|id| {
        catalog
            .get(id)
            .map(|template| template.source == GrantSource::PointReward)
            .unwrap_or(false)
    });

    if config.bonus.auto_reconnaissance {
        let recon = config.bonus.reconnaissance_grant_id();
        if catalog.get(&recon).is_none() {
            warn!(grant = %recon, "configured reconnaissance grant is not in the catalog");
        } else if !executed.contains(&recon) {
            sink.execute_capability(session.target, &recon);
            executed.push(recon);
            report.reconnaissance_added = true;
        }
    }

    if config.bonus.auto_point_rewards && !reward_present {
        if let Some(tier) = reward_tier_for(resolved_count) {
            match catalog.reward_grant_for_tier(tier) {
                Some(template) => {
                    sink.execute_capability(session.target, &template.id);
                    executed.push(template.id.clone());
                    report.reward_tier = Some(tier);
                    debug!(tier, resolved = resolved_count, "derived point reward tier");
                }
                None => warn!(tier, "catalog ships no reward grant for tier"),
            }
        }
    }

    report
}
