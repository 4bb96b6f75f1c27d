//! Policy configuration for the breach core.
//!
//! Loaded from `policy_config.json` with an environment-variable path
//! override. Every toggle and numeric parameter the pipeline, propagator,
//! bonus deriver, and penalty system consult lives here; values are queried
//! by value with no caching contract.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use bevy_ecs::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::grants::GrantId;

pub const BUILTIN_POLICY_CONFIG: &str = include_str!("data/policy_config.json");

/// Environment variable naming an override config file.
pub const POLICY_CONFIG_ENV: &str = "INTRUSION_CONFIG_PATH";

/// Root policy configuration.
#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub locks: LockPolicy,
    pub gating: GatingPolicy,
    pub bonus: BonusPolicy,
    pub reveal: RevealPolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            locks: LockPolicy::default(),
            gating: GatingPolicy::default(),
            bonus: BonusPolicy::default(),
            reveal: RevealPolicy::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyConfigError {
    #[error("failed to read policy config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse policy config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl PolicyConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_POLICY_CONFIG).expect("builtin policy config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, PolicyConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| PolicyConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        Ok(config)
    }

    /// Load from the `INTRUSION_CONFIG_PATH` override if set and readable,
    /// otherwise fall back to the built-in defaults.
    pub fn load_from_env_or_builtin() -> Self {
        match std::env::var(POLICY_CONFIG_ENV) {
            Ok(path) => match Self::from_file(Path::new(&path)) {
                Ok(config) => config,
                Err(err) => {
                    warn!(%err, %path, "policy config override unusable; using builtin");
                    Self::builtin()
                }
            },
            Err(_) => Self::builtin(),
        }
    }
}

/// Failure-lock tuning shared by the three breach contexts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    /// Global switch over all three lock strategies.
    pub enabled: bool,
    /// Shared lock window in seconds.
    pub duration_secs: f32,
    pub gateway_lock: bool,
    pub incapacitated_lock: bool,
    pub remote_lock: bool,
    /// Radius around a remote failure entry that reads as locked.
    pub remote_radius: f32,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_secs: 45.0,
            gateway_lock: true,
            incapacitated_lock: true,
            remote_lock: true,
            remote_radius: 12.0,
        }
    }
}

/// Chooses between graph-based and physical-range unlock gating.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatingPolicy {
    /// When set, the spatial range filter re-admits nodes near the breach
    /// origin instead of relying purely on graph membership.
    pub physical_range: bool,
    pub range_radius: f32,
    /// Radius used to pull standalone nodes into a successful unlock.
    pub standalone_radius: f32,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self {
            physical_range: false,
            range_radius: 20.0,
            standalone_radius: 10.0,
        }
    }
}

/// Post-success bonus grant behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BonusPolicy {
    pub auto_reconnaissance: bool,
    pub reconnaissance_grant: String,
    /// When set, point-reward candidates are hidden during resolution and
    /// exactly one tier is derived after success.
    pub auto_point_rewards: bool,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        Self {
            auto_reconnaissance: true,
            reconnaissance_grant: "recon_sweep".to_string(),
            auto_point_rewards: true,
        }
    }
}

impl BonusPolicy {
    pub fn reconnaissance_grant_id(&self) -> GrantId {
        GrantId::new(self.reconnaissance_grant.clone())
    }
}

/// Delayed position-reveal penalty tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RevealPolicy {
    pub enabled: bool,
    /// Radius searched for a qualifying hostile revealer around the player.
    pub search_radius: f32,
}

impl Default for RevealPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            search_radius: 35.0,
        }
    }
}
