//! Device world index and network graph traversal.
//!
//! Nodes are owned by the host simulation; the index stores lightweight
//! records with weak parent/child links. A "network" is never persisted as a
//! structure — it is recomputed from the current links on every query, so a
//! node that ends up reachable from more than one root simply resolves
//! through whichever parent chain is current.

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::Resource;
use bevy_math::Vec3;
use bitflags::bitflags;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::grants::UnlockFlags;

/// Identifier assigned to each breachable node in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

/// Identifier for a player-controlled actor initiating breach attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlayerId(pub u32);

/// Concrete device kind as reported by the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Camera,
    MotionSensor,
    Turret,
    Door,
    Terminal,
    Radio,
    Vehicle,
    Actor,
}

/// Closed category set used for grant-to-node matching.
///
/// Classification happens once, at record construction, rather than through
/// scattered runtime type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Generic,
    VisualSensor,
    DefenseTurret,
    Actor,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Generic,
        NodeCategory::VisualSensor,
        NodeCategory::DefenseTurret,
        NodeCategory::Actor,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            NodeCategory::Generic => 0,
            NodeCategory::VisualSensor => 1,
            NodeCategory::DefenseTurret => 2,
            NodeCategory::Actor => 3,
        }
    }

    pub fn classify(kind: DeviceKind) -> NodeCategory {
        match kind {
            DeviceKind::Camera | DeviceKind::MotionSensor => NodeCategory::VisualSensor,
            DeviceKind::Turret => NodeCategory::DefenseTurret,
            DeviceKind::Actor => NodeCategory::Actor,
            DeviceKind::Door | DeviceKind::Terminal | DeviceKind::Radio | DeviceKind::Vehicle => {
                NodeCategory::Generic
            }
        }
    }
}

bitflags! {
    /// Traits of actor nodes consulted by injection and the reveal penalty.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActorFlags: u8 {
        const HOSTILE = 1 << 0;
        const REVEAL_CAPABLE = 1 << 1;
        const INCAPACITATED = 1 << 2;
        const PRIVILEGED_OPERATOR = 1 << 3;
    }
}

impl Default for ActorFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// One breachable device or actor tracked by the index.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: DeviceKind,
    pub position: Vec3,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub actor_flags: ActorFlags,
}

impl NodeRecord {
    pub fn new(id: NodeId, kind: DeviceKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            parent: None,
            children: Vec::new(),
            actor_flags: ActorFlags::empty(),
        }
    }

    #[inline]
    pub fn category(&self) -> NodeCategory {
        NodeCategory::classify(self.kind)
    }

    /// A standalone node has no graph membership at all.
    #[inline]
    pub fn is_standalone(&self) -> bool {
        self.parent.is_none() && self.children.is_empty()
    }
}

/// Index of every node the breach core may touch.
#[derive(Resource, Debug, Default, Clone)]
pub struct WorldIndex {
    nodes: HashMap<NodeId, NodeRecord>,
}

impl WorldIndex {
    pub fn insert(&mut self, record: NodeRecord) {
        self.nodes.insert(record.id, record);
    }

    /// Register a plain device node and return its id.
    pub fn spawn(&mut self, id: u32, kind: DeviceKind, position: Vec3) -> NodeId {
        let node = NodeId(id);
        self.insert(NodeRecord::new(node, kind, position));
        node
    }

    /// Register an actor node with the given trait flags.
    pub fn spawn_actor(&mut self, id: u32, position: Vec3, flags: ActorFlags) -> NodeId {
        let node = NodeId(id);
        let mut record = NodeRecord::new(node, DeviceKind::Actor, position);
        record.actor_flags = flags;
        self.insert(record);
        node
    }

    /// Connect `child` under `parent`. Missing endpoints are logged and
    /// ignored rather than creating dangling links.
    pub fn link(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes.contains_key(&parent) || !self.nodes.contains_key(&child) {
            warn!(
                parent = parent.0,
                child = child.0,
                "refusing to link nodes that are not both registered"
            );
            return;
        }
        if let Some(record) = self.nodes.get_mut(&child) {
            record.parent = Some(parent);
        }
        if let Some(record) = self.nodes.get_mut(&parent) {
            if !record.children.contains(&child) {
                record.children.push(child);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    /// Walk parent links to the topmost ancestor. A visited set guarantees
    /// termination even if the host hands us a cyclic parent chain.
    pub fn find_root(&self, node: NodeId) -> NodeId {
        let mut visited = HashSet::new();
        let mut current = node;
        loop {
            if !visited.insert(current) {
                debug!(node = current.0, "parent chain loops back on itself");
                break;
            }
            match self.nodes.get(&current).and_then(|record| record.parent) {
                Some(parent) if self.nodes.contains_key(&parent) => current = parent,
                Some(parent) => {
                    warn!(
                        node = current.0,
                        parent = parent.0,
                        "dangling parent link; treating node as root"
                    );
                    break;
                }
                None => break,
            }
        }
        current
    }

    /// Transitive closure of child links below `root`, root included.
    /// Returns an empty list for an unknown root.
    pub fn collect_network(&self, root: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(&root) {
            warn!(root = root.0, "network root does not exist");
            return Vec::new();
        }
        let mut visited = HashSet::new();
        let mut ordered = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(record) = self.nodes.get(&current) else {
                debug!(node = current.0, "skipping dangling child link");
                continue;
            };
            ordered.push(current);
            for &child in &record.children {
                stack.push(child);
            }
        }
        ordered
    }

    /// The network a node currently belongs to, computed fresh from its
    /// parent chain. Membership is never cached.
    pub fn connected_network(&self, node: NodeId) -> Vec<NodeId> {
        self.collect_network(self.find_root(node))
    }

    pub fn network_centroid(&self, nodes: &[NodeId]) -> Vec3 {
        let mut sum = Vec3::ZERO;
        let mut count = 0u32;
        for &id in nodes {
            if let Some(record) = self.nodes.get(&id) {
                sum += record.position;
                count += 1;
            }
        }
        if count == 0 {
            Vec3::ZERO
        } else {
            sum / count as f32
        }
    }

    /// Which categories exist among the given nodes.
    pub fn category_presence(&self, nodes: &[NodeId]) -> UnlockFlags {
        let mut flags = UnlockFlags::empty();
        for &id in nodes {
            if let Some(record) = self.nodes.get(&id) {
                flags |= UnlockFlags::from_category(record.category());
            }
        }
        flags
    }

    pub fn standalone_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values().filter(|record| record.is_standalone())
    }

    /// Every node within `radius` of `origin`, inclusive at exactly the
    /// radius.
    pub fn nodes_within(&self, origin: Vec3, radius: f32) -> Vec<NodeId> {
        let limit = radius * radius;
        self.nodes
            .values()
            .filter(|record| record.position.distance_squared(origin) <= limit)
            .map(|record| record.id)
            .collect()
    }
}
