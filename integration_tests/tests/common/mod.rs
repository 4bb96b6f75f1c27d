use intrusion_core::{
    ActorFlags, BeginSessionParams, BreachContext, BreachDirector, BreachSession, DeviceKind,
    EffectSink, GrantCatalog, GrantId, NodeId, NodeStateStore, PlayerId, PlayerState,
    PolicyConfig, SessionReport, SimTime, WorldIndex,
};

/// Sink that records every effect for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub executions: Vec<(NodeId, GrantId)>,
    pub feedback: Vec<NodeId>,
    pub disabled: Vec<NodeId>,
    pub reveals: Vec<(NodeId, PlayerId)>,
    pub reports: Vec<SessionReport>,
}

impl EffectSink for RecordingSink {
    fn execute_capability(&mut self, node: NodeId, grant: &GrantId) {
        self.executions.push((node, grant.clone()));
    }

    fn failure_feedback(&mut self, node: NodeId) {
        self.feedback.push(node);
    }

    fn disable_primary_interaction(&mut self, node: NodeId) {
        self.disabled.push(node);
    }

    fn request_position_reveal(&mut self, revealer: NodeId, of: PlayerId) {
        self.reveals.push((revealer, of));
    }

    fn report_outcome(&mut self, report: &SessionReport) {
        self.reports.push(report.clone());
    }
}

/// Everything a scenario needs, wired the way a host would wire it.
pub struct Scenario {
    pub world: WorldIndex,
    pub store: NodeStateStore,
    pub catalog: GrantCatalog,
    pub config: PolicyConfig,
    pub director: BreachDirector,
    pub sink: RecordingSink,
}

impl Scenario {
    pub fn new() -> Self {
        Self {
            world: WorldIndex::default(),
            store: NodeStateStore::default(),
            catalog: GrantCatalog::load_builtin().expect("builtin catalog parses"),
            config: PolicyConfig::default(),
            director: BreachDirector::default(),
            sink: RecordingSink::default(),
        }
    }

    /// Office network: gateway terminal with two cameras, a turret, a door,
    /// and a guard actor below it, plus a standalone vehicle near the
    /// centroid and another far away.
    pub fn office_network(&mut self) -> NodeId {
        let gateway = self.world.spawn(1, DeviceKind::Terminal, vec3(0.0, 0.0, 0.0));
        let cam_a = self.world.spawn(2, DeviceKind::Camera, vec3(4.0, 0.0, 0.0));
        let cam_b = self.world.spawn(3, DeviceKind::Camera, vec3(-4.0, 0.0, 0.0));
        let turret = self.world.spawn(4, DeviceKind::Turret, vec3(0.0, 4.0, 0.0));
        let door = self.world.spawn(5, DeviceKind::Door, vec3(0.0, -4.0, 0.0));
        let guard = self
            .world
            .spawn_actor(6, vec3(2.0, 2.0, 0.0), ActorFlags::HOSTILE);
        self.world.link(gateway, cam_a);
        self.world.link(gateway, cam_b);
        self.world.link(gateway, turret);
        self.world.link(gateway, door);
        self.world.link(gateway, guard);
        self.world.spawn(20, DeviceKind::Vehicle, vec3(3.0, 0.0, 0.0));
        self.world.spawn(21, DeviceKind::Vehicle, vec3(400.0, 0.0, 0.0));
        gateway
    }

    pub fn begin(
        &mut self,
        context: BreachContext,
        target: NodeId,
        now: f64,
    ) -> anyhow::Result<BreachSession> {
        Ok(self.director.begin_session(
            BeginSessionParams {
                context,
                target,
                player: PlayerId(0),
            },
            &self.world,
            &mut self.store,
            &self.catalog,
            &self.config,
            SimTime(now),
        )?)
    }

    pub fn player(&self) -> PlayerState {
        PlayerState {
            id: PlayerId(0),
            position: vec3(0.0, 0.0, 0.0),
            revealed: false,
            in_combat: false,
        }
    }

    pub fn is_locked(&mut self, node: NodeId, now: f64) -> bool {
        self.director.is_locked(
            node,
            PlayerId(0),
            &self.world,
            &mut self.store,
            &self.config,
            SimTime(now),
        )
    }
}

pub fn vec3(x: f32, y: f32, z: f32) -> intrusion_core::Vec3 {
    intrusion_core::Vec3::new(x, y, z)
}
