//! Core crate for the network-intrusion minigame layer.
//!
//! Decides which capability grants a breach attempt offers, filters them
//! through topology and policy, propagates unlocks across the breached
//! network on success, derives bonus grants from the session outcome, and
//! applies context-specific lock penalties on failure. The minigame itself,
//! its presentation, and reward value tables are host concerns reached
//! through [`EffectSink`].

pub mod bonus;
pub mod config;
pub mod filter;
pub mod grants;
pub mod inject;
pub mod penalty;
pub mod propagate;
pub mod session;
pub mod spatial;
pub mod store;
pub mod world;

pub use bevy_math::Vec3;
pub use config::{BonusPolicy, GatingPolicy, LockPolicy, PolicyConfig, RevealPolicy};
pub use grants::{
    GrantCatalog, GrantCatalogError, GrantId, GrantSource, GrantTarget, GrantTemplate,
    UnlockFlags,
};
pub use propagate::PropagationReport;
pub use session::{
    BeginSessionParams, BreachContext, BreachDirector, BreachError, BreachOutcome, BreachSession,
    EffectSink, NoopSink, PlayerState, SessionReport,
};
pub use store::{lock_is_live, LockEntry, NodeStateStore, RemoteLockLog, SimTime};
pub use world::{
    ActorFlags, DeviceKind, NodeCategory, NodeId, NodeRecord, PlayerId, WorldIndex,
};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::grants::GrantId;
    use crate::session::{EffectSink, SessionReport};
    use crate::world::{NodeId, PlayerId};

    /// Sink that records every effect for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub executions: Vec<(NodeId, GrantId)>,
        pub feedback: Vec<NodeId>,
        pub disabled: Vec<NodeId>,
        pub menu_refreshes: Vec<NodeId>,
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

        fn refresh_interaction_menu(&mut self, node: NodeId) {
            self.menu_refreshes.push(node);
        }

        fn request_position_reveal(&mut self, revealer: NodeId, of: PlayerId) {
            self.reveals.push((revealer, of));
        }

        fn report_outcome(&mut self, report: &SessionReport) {
            self.reports.push(report.clone());
        }
    }
}
