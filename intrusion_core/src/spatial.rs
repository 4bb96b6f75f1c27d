//! Spatial range filter: physical-radius gating as an alternative to pure
//! graph gating.

use bevy_math::Vec3;

use crate::config::PolicyConfig;
use crate::grants::UnlockFlags;
use crate::session::BreachContext;
use crate::world::{NodeCategory, NodeId, NodeRecord, WorldIndex};

/// Inclusive radius check; a point exactly at the radius is inside.
#[inline]
pub fn radius_includes(origin: Vec3, position: Vec3, radius: f32) -> bool {
    position.distance_squared(origin) <= radius * radius
}

/// Whether physical-range gating applies to this session at all. Remote
/// sessions skip it unless the remote target is itself an actor.
pub fn spatial_gating_active(
    context: BreachContext,
    target: &NodeRecord,
    config: &PolicyConfig,
) -> bool {
    if !config.gating.physical_range {
        return false;
    }
    match context {
        BreachContext::Gateway | BreachContext::IncapacitatedTarget => true,
        BreachContext::Remote => target.category() == NodeCategory::Actor,
    }
}

/// Nodes re-admitted into the successful-outcome set by physical range:
/// anything within `radius` of the breach origin whose category is covered
/// by the executed unlock flags, regardless of graph membership.
pub fn range_targets(
    world: &WorldIndex,
    origin: Vec3,
    radius: f32,
    flags: UnlockFlags,
) -> Vec<NodeId> {
    world
        .iter()
        .filter(|record| {
            flags.covers(record.category()) && radius_includes(origin, record.position, radius)
        })
        .map(|record| record.id)
        .collect()
}

/// Standalone nodes near the breach origin, category-matched the same way.
pub fn standalone_targets(
    world: &WorldIndex,
    origin: Vec3,
    radius: f32,
    flags: UnlockFlags,
) -> Vec<NodeId> {
    world
        .standalone_nodes()
        .filter(|record| {
            flags.covers(record.category()) && radius_includes(origin, record.position, radius)
        })
        .map(|record| record.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::DeviceKind;

    #[test]
    fn radius_boundary_is_inclusive() {
        let origin = Vec3::ZERO;
        assert!(radius_includes(origin, Vec3::new(10.0, 0.0, 0.0), 10.0));
        assert!(!radius_includes(origin, Vec3::new(10.001, 0.0, 0.0), 10.0));
    }

    #[test]
    fn range_targets_match_category_flags() {
        let mut world = WorldIndex::default();
        world.spawn(1, DeviceKind::Camera, Vec3::new(5.0, 0.0, 0.0));
        world.spawn(2, DeviceKind::Door, Vec3::new(5.0, 0.0, 0.0));
        world.spawn(3, DeviceKind::Camera, Vec3::new(50.0, 0.0, 0.0));

        let hits = range_targets(&world, Vec3::ZERO, 10.0, UnlockFlags::VISUAL_SENSOR);
        assert_eq!(hits, vec![NodeId(1)]);
    }

    #[test]
    fn standalone_targets_ignore_graph_members() {
        let mut world = WorldIndex::default();
        world.spawn(1, DeviceKind::Terminal, Vec3::ZERO);
        world.spawn(2, DeviceKind::Door, Vec3::new(2.0, 0.0, 0.0));
        world.link(NodeId(1), NodeId(2));
        world.spawn(3, DeviceKind::Vehicle, Vec3::new(3.0, 0.0, 0.0));

        let hits = standalone_targets(&world, Vec3::ZERO, 10.0, UnlockFlags::GENERIC);
        assert_eq!(hits, vec![NodeId(3)]);
    }

    #[test]
    fn remote_sessions_skip_gating_unless_target_is_an_actor() {
        let mut config = PolicyConfig::default();
        config.gating.physical_range = true;

        let camera = NodeRecord::new(NodeId(1), DeviceKind::Camera, Vec3::ZERO);
        assert!(!spatial_gating_active(BreachContext::Remote, &camera, &config));

        let actor = NodeRecord::new(NodeId(2), DeviceKind::Actor, Vec3::ZERO);
        assert!(spatial_gating_active(BreachContext::Remote, &actor, &config));
        assert!(spatial_gating_active(BreachContext::Gateway, &camera, &config));

        config.gating.physical_range = false;
        assert!(!spatial_gating_active(BreachContext::Gateway, &camera, &config));
    }
}
