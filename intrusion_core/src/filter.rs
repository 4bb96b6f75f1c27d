//! Ordered candidate filter pipeline.
//!
//! Four stages, each a pure retain-predicate over one candidate plus the
//! session snapshot captured in [`FilterContext`]. Stages compose left to
//! right and never re-add a candidate a prior stage removed, which makes the
//! whole pipeline idempotent.

use tracing::warn;

use crate::config::PolicyConfig;
use crate::grants::{GrantCatalog, GrantId, GrantSource, GrantTemplate, UnlockFlags};
use crate::session::BreachContext;
use crate::store::NodeStateStore;
use crate::world::{NodeId, WorldIndex};

/// Immutable snapshot of everything the stages need to decide.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub context: BreachContext,
    /// Categories present anywhere in the breached network.
    pub presence: UnlockFlags,
    /// Categories already fully unlocked across their network nodes.
    pub unlocked: UnlockFlags,
    pub config: &'a PolicyConfig,
}

impl<'a> FilterContext<'a> {
    pub fn for_session(
        context: BreachContext,
        network: &[NodeId],
        world: &WorldIndex,
        store: &NodeStateStore,
        config: &'a PolicyConfig,
    ) -> Self {
        let presence = world.category_presence(network);
        let mut unlocked = UnlockFlags::empty();
        for category in crate::world::NodeCategory::ALL {
            let flag = UnlockFlags::from_category(category);
            if !presence.contains(flag) {
                continue;
            }
            let all_unlocked = network.iter().all(|&id| {
                world
                    .get(id)
                    .map(|record| {
                        record.category() != category || store.is_unlocked(id, category)
                    })
                    .unwrap_or(true)
            });
            if all_unlocked {
                unlocked |= flag;
            }
        }
        Self {
            context,
            presence,
            unlocked,
            config,
        }
    }
}

/// Stage 1: drop grants whose category is already unlocked on this network.
pub fn retain_not_already_unlocked(template: &GrantTemplate, cx: &FilterContext) -> bool {
    match template.target.category() {
        Some(category) => !cx.unlocked.covers(category),
        None => true,
    }
}

/// Stage 2: drop category grants with no matching node downstream.
pub fn retain_connected(template: &GrantTemplate, cx: &FilterContext) -> bool {
    if template.source != GrantSource::GraphScoped {
        return true;
    }
    match template.target.category() {
        Some(category) => cx.presence.covers(category),
        None => true,
    }
}

/// Stage 3: when the remap policy is on, point-reward variants are hidden
/// during resolution (the bonus deriver re-adds one tier after success).
pub fn retain_reward_policy(template: &GrantTemplate, cx: &FilterContext) -> bool {
    !(cx.config.bonus.auto_point_rewards && template.source == GrantSource::PointReward)
}

/// Stage 4: remote and incapacitated-target sessions never see grants
/// reserved for gateway use.
pub fn retain_context_allowed(template: &GrantTemplate, cx: &FilterContext) -> bool {
    match cx.context {
        BreachContext::Gateway => true,
        BreachContext::IncapacitatedTarget | BreachContext::Remote => !template.gateway_only,
    }
}

/// Run the full pipeline over `candidates`, in stage order. Candidate ids
/// unknown to the catalog are dropped up front.
pub fn run_pipeline(
    candidates: Vec<GrantId>,
    catalog: &GrantCatalog,
    cx: &FilterContext,
) -> Vec<GrantId> {
    let mut list = candidates;
    list.retain(|id| {
        let known = catalog.get(id).is_some();
        if !known {
            warn!(grant = %id, "dropping candidate unknown to the grant catalog");
        }
        known
    });

    let stages: [fn(&GrantTemplate, &FilterContext) -> bool; 4] = [
        retain_not_already_unlocked,
        retain_connected,
        retain_reward_policy,
        retain_context_allowed,
    ];
    for stage in stages {
        list.retain(|id| catalog.get(id).map(|template| stage(template, cx)).unwrap_or(false));
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_math::Vec3;
    use crate::store::SimTime;
    use crate::world::{DeviceKind, NodeCategory, NodeId};

    fn catalog() -> GrantCatalog {
        GrantCatalog::load_builtin().expect("builtin catalog parses")
    }

    /// Gateway network: terminal root with a camera and a turret below it.
    fn network_world() -> (WorldIndex, Vec<NodeId>) {
        let mut world = WorldIndex::default();
        world.spawn(1, DeviceKind::Terminal, Vec3::ZERO);
        world.spawn(2, DeviceKind::Camera, Vec3::new(3.0, 0.0, 0.0));
        world.spawn(3, DeviceKind::Turret, Vec3::new(6.0, 0.0, 0.0));
        world.link(NodeId(1), NodeId(2));
        world.link(NodeId(1), NodeId(3));
        let network = world.connected_network(NodeId(1));
        (world, network)
    }

    fn all_candidates(catalog: &GrantCatalog) -> Vec<GrantId> {
        catalog
            .iter()
            .filter(|template| !template.trap)
            .map(|template| template.id.clone())
            .collect()
    }

    #[test]
    fn pipeline_is_idempotent() {
        let catalog = catalog();
        let (world, network) = network_world();
        let store = NodeStateStore::default();
        let config = PolicyConfig::default();
        let cx = FilterContext::for_session(
            BreachContext::Gateway,
            &network,
            &world,
            &store,
            &config,
        );
        let once = run_pipeline(all_candidates(&catalog), &catalog, &cx);
        let twice = run_pipeline(once.clone(), &catalog, &cx);
        assert_eq!(once, twice);
    }

    #[test]
    fn connectivity_drops_categories_absent_from_the_graph() {
        let catalog = catalog();
        let (world, network) = network_world();
        let store = NodeStateStore::default();
        let config = PolicyConfig::default();
        let cx = FilterContext::for_session(
            BreachContext::Gateway,
            &network,
            &world,
            &store,
            &config,
        );
        let result = run_pipeline(all_candidates(&catalog), &catalog, &cx);
        let actor_unlock = catalog.unlock_grant_for(NodeCategory::Actor).unwrap();
        let sensor_unlock = catalog.unlock_grant_for(NodeCategory::VisualSensor).unwrap();
        assert!(
            !result.contains(&actor_unlock.id),
            "no actor node exists downstream"
        );
        assert!(result.contains(&sensor_unlock.id));
    }

    #[test]
    fn already_unlocked_categories_are_removed() {
        let catalog = catalog();
        let (world, network) = network_world();
        let mut store = NodeStateStore::default();
        store.unlock(NodeId(2), NodeCategory::VisualSensor, SimTime(1.0));
        let config = PolicyConfig::default();
        let cx = FilterContext::for_session(
            BreachContext::Gateway,
            &network,
            &world,
            &store,
            &config,
        );
        let result = run_pipeline(all_candidates(&catalog), &catalog, &cx);
        let sensor_unlock = catalog.unlock_grant_for(NodeCategory::VisualSensor).unwrap();
        assert!(!result.contains(&sensor_unlock.id));
    }

    #[test]
    fn reward_variants_are_hidden_when_remap_is_on() {
        let catalog = catalog();
        let (world, network) = network_world();
        let store = NodeStateStore::default();

        let mut config = PolicyConfig::default();
        config.bonus.auto_point_rewards = true;
        let cx =
            FilterContext::for_session(BreachContext::Gateway, &network, &world, &store, &config);
        let hidden = run_pipeline(all_candidates(&catalog), &catalog, &cx);
        assert!(hidden
            .iter()
            .all(|id| catalog.get(id).unwrap().source != GrantSource::PointReward));

        config.bonus.auto_point_rewards = false;
        let cx =
            FilterContext::for_session(BreachContext::Gateway, &network, &world, &store, &config);
        let visible = run_pipeline(all_candidates(&catalog), &catalog, &cx);
        assert!(visible
            .iter()
            .any(|id| catalog.get(id).unwrap().source == GrantSource::PointReward));
    }

    #[test]
    fn gateway_only_grants_are_suppressed_for_remote_sessions() {
        let catalog = catalog();
        let (world, network) = network_world();
        let store = NodeStateStore::default();
        let config = PolicyConfig::default();
        let recon = GrantId::new(config.bonus.reconnaissance_grant.clone());

        let remote =
            FilterContext::for_session(BreachContext::Remote, &network, &world, &store, &config);
        let result = run_pipeline(vec![recon.clone()], &catalog, &remote);
        assert!(result.is_empty());

        let gateway =
            FilterContext::for_session(BreachContext::Gateway, &network, &world, &store, &config);
        let result = run_pipeline(vec![recon.clone()], &catalog, &gateway);
        assert_eq!(result, vec![recon]);
    }

    #[test]
    fn unknown_candidates_are_dropped() {
        let catalog = catalog();
        let (world, network) = network_world();
        let store = NodeStateStore::default();
        let config = PolicyConfig::default();
        let cx = FilterContext::for_session(
            BreachContext::Gateway,
            &network,
            &world,
            &store,
            &config,
        );
        let result = run_pipeline(vec![GrantId::new("not_a_grant")], &catalog, &cx);
        assert!(result.is_empty());
    }
}
