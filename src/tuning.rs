//! Data-driven game balance
//!
//! Every field has a default, so a partial JSON document only overrides
//! what it names.

use serde::{Deserialize, Serialize};

use crate::consts::{BULLET_POOL_PREALLOCATE, ENEMY_POOL_PREALLOCATE, MAX_POOL_PREALLOCATE};
use crate::sim::physics::KinematicsTuning;
use crate::sim::round::VersusRules;
use crate::sim::score::ScoreRules;

/// Instances built up front so spawning mid-tick rarely allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSizes {
    pub enemies: usize,
    pub bullets: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            enemies: ENEMY_POOL_PREALLOCATE,
            bullets: BULLET_POOL_PREALLOCATE,
        }
    }
}

impl PoolSizes {
    /// Each size capped at `MAX_POOL_PREALLOCATE`
    pub fn clamped(self) -> Self {
        Self {
            enemies: self.enemies.min(MAX_POOL_PREALLOCATE),
            bullets: self.bullets.min(MAX_POOL_PREALLOCATE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub kinematics: KinematicsTuning,
    pub score: ScoreRules,
    pub versus: VersusRules,
    pub pools: PoolSizes,
}

impl Tuning {
    /// Parse a tuning document, falling back to defaults if it is malformed
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Tuning>(json) {
            Ok(mut tuning) => {
                let pools = tuning.pools.clamped();
                if pools != tuning.pools {
                    log::warn!("Pool sizes {:?} capped to {:?}", tuning.pools, pools);
                    tuning.pools = pools;
                }
                tuning
            }
            Err(e) => {
                log::warn!("Invalid tuning document, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
