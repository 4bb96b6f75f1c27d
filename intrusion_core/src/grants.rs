//! Static capability-grant registry.
//!
//! Grants are immutable value objects loaded once from the built-in catalog
//! (or a host-supplied JSON document) and looked up by id for the rest of the
//! process lifetime.

use std::collections::HashMap;
use std::fmt;

use bevy_ecs::prelude::Resource;
use bitflags::bitflags;
use serde::Deserialize;
use thiserror::Error;

use crate::world::NodeCategory;

pub const BUILTIN_GRANT_CATALOG: &str = include_str!("data/grant_catalog.json");

/// Tagged identifier of one capability grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub String);

impl GrantId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a grant applies to: one node category, or any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantTarget {
    Generic,
    VisualSensor,
    DefenseTurret,
    Actor,
    Universal,
}

impl GrantTarget {
    pub fn category(self) -> Option<NodeCategory> {
        match self {
            GrantTarget::Generic => Some(NodeCategory::Generic),
            GrantTarget::VisualSensor => Some(NodeCategory::VisualSensor),
            GrantTarget::DefenseTurret => Some(NodeCategory::DefenseTurret),
            GrantTarget::Actor => Some(NodeCategory::Actor),
            GrantTarget::Universal => None,
        }
    }

    pub fn matches(self, category: NodeCategory) -> bool {
        match self.category() {
            Some(own) => own == category,
            None => true,
        }
    }
}

/// Source classification of a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantSource {
    /// Unlocks a node category across the breached network.
    GraphScoped,
    /// Point-value reward tier, auto-derived post-success when remapped.
    PointReward,
    /// Scenario-owned extras such as the reconnaissance sweep.
    QuestSpecific,
}

/// Immutable metadata for one grant, as shipped in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantTemplate {
    pub id: GrantId,
    pub name: String,
    pub target: GrantTarget,
    pub source: GrantSource,
    #[serde(default)]
    pub reward_tier: Option<u8>,
    /// Reserved for gateway sessions; suppressed for the other contexts.
    #[serde(default)]
    pub gateway_only: bool,
    /// Hostile counter-program surfaced during resolution, never a candidate.
    #[serde(default)]
    pub trap: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GrantCatalogDoc {
    grants: Vec<GrantTemplate>,
}

#[derive(Debug, Error)]
pub enum GrantCatalogError {
    #[error("failed to parse capability grant catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate capability grant id '{0}'")]
    DuplicateGrant(String),
    #[error("point reward grant '{0}' is missing a reward tier")]
    MissingRewardTier(String),
}

/// Read-only registry of every grant the breach core can offer.
#[derive(Resource, Debug, Clone)]
pub struct GrantCatalog {
    grants: HashMap<GrantId, GrantTemplate>,
    order: Vec<GrantId>,
}

impl GrantCatalog {
    pub fn load_builtin() -> Result<Self, GrantCatalogError> {
        Self::from_json_str(BUILTIN_GRANT_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self, GrantCatalogError> {
        let doc: GrantCatalogDoc = serde_json::from_str(json)?;
        let mut grants = HashMap::new();
        let mut order = Vec::new();
        for template in doc.grants {
            if template.source == GrantSource::PointReward && template.reward_tier.is_none() {
                return Err(GrantCatalogError::MissingRewardTier(template.id.0.clone()));
            }
            if grants.contains_key(&template.id) {
                return Err(GrantCatalogError::DuplicateGrant(template.id.0.clone()));
            }
            order.push(template.id.clone());
            grants.insert(template.id.clone(), template);
        }
        Ok(Self { grants, order })
    }

    pub fn get(&self, id: &GrantId) -> Option<&GrantTemplate> {
        self.grants.get(id)
    }

    /// Templates in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &GrantTemplate> {
        self.order.iter().filter_map(|id| self.grants.get(id))
    }

    /// The graph-scoped unlock grant for one category, if the catalog ships
    /// one.
    pub fn unlock_grant_for(&self, category: NodeCategory) -> Option<&GrantTemplate> {
        self.iter().find(|template| {
            template.source == GrantSource::GraphScoped
                && template.target.category() == Some(category)
        })
    }

    pub fn reward_grant_for_tier(&self, tier: u8) -> Option<&GrantTemplate> {
        self.iter().find(|template| {
            template.source == GrantSource::PointReward && template.reward_tier == Some(tier)
        })
    }

    pub fn trap_grants(&self) -> impl Iterator<Item = &GrantTemplate> {
        self.iter().filter(|template| template.trap)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

bitflags! {
    /// Per-category unlock switches derived once per session from the set of
    /// successfully executed grants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UnlockFlags: u8 {
        const GENERIC = 1 << 0;
        const VISUAL_SENSOR = 1 << 1;
        const DEFENSE_TURRET = 1 << 2;
        const ACTOR = 1 << 3;
    }
}

impl Default for UnlockFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl UnlockFlags {
    pub fn from_category(category: NodeCategory) -> Self {
        match category {
            NodeCategory::Generic => Self::GENERIC,
            NodeCategory::VisualSensor => Self::VISUAL_SENSOR,
            NodeCategory::DefenseTurret => Self::DEFENSE_TURRET,
            NodeCategory::Actor => Self::ACTOR,
        }
    }

    #[inline]
    pub fn covers(self, category: NodeCategory) -> bool {
        self.contains(Self::from_category(category))
    }

    /// Universal-target grants contribute no category flag.
    pub fn from_grants<'a, I>(grants: I) -> Self
    where
        I: IntoIterator<Item = &'a GrantTemplate>,
    {
        let mut flags = Self::empty();
        for template in grants {
            if let Some(category) = template.target.category() {
                flags |= Self::from_category(category);
            }
        }
        flags
    }
}
