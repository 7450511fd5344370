//! Mission plan context
//!
//! Previously stored mission parameters: which map to operate on, which
//! partitioning algorithm to request, and the fleet-size exponent chosen
//! during planning. The planner stores `drone_count_exponent`, so a fleet of
//! 2^x drones travels the wire as `x`.

use anyhow::{Context, Result};
use serde::Deserialize;
use skygrid_shared::PartitionAlgorithm;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct MissionPlan {
    pub map_id: i64,
    pub drone_count_exponent: u32,
    pub algorithm: PartitionAlgorithm,
    /// Which no-fly dataset the map was built from; informational only
    #[serde(default)]
    pub no_fly_dataset: Option<String>,
}

impl Default for MissionPlan {
    fn default() -> Self {
        Self {
            map_id: 1,
            drone_count_exponent: 2,
            algorithm: PartitionAlgorithm::NoKd,
            no_fly_dataset: None,
        }
    }
}

impl MissionPlan {
    pub fn from_document(document: &str) -> Result<Self> {
        serde_json::from_str(document).context("invalid mission plan document")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("reading mission plan {}", path.display()))?;
        Self::from_document(&document)
    }
}

/// Engine-level configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the compute service
    pub compute_url: String,
    /// Path to the mission plan document
    pub plan_file: String,
    /// Path to the target queue document
    pub targets_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compute_url: "http://127.0.0.1:8000/db".into(),
            plan_file: "data/mission_plan.json".into(),
            targets_file: "data/targets.json".into(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SKYGRID_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("SKYGRID_COMPUTE_URL") {
            config.compute_url = url;
        }
        if let Ok(path) = std::env::var("SKYGRID_PLAN_FILE") {
            config.plan_file = path;
        }
        if let Ok(path) = std::env::var("SKYGRID_TARGETS_FILE") {
            config.targets_file = path;
        }
        config
    }
}
