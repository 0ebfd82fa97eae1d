//! Engine configuration
//!
//! Policy inputs the engine consumes but does not own: the learner
//! baseline capability set, masking feature flags, and the hierarchy
//! traversal bound.


use crate::model::CapabilityKey;
use crate::utils::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_learner_baseline() -> Vec<String> {
    vec![
        "course:view".to_string(),
        "module:view".to_string(),
        "question:view".to_string(),
    ]
}

fn default_max_hierarchy_depth() -> usize {
    32
}

/// Masking feature flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Mask email local parts for attenuated viewers
    #[serde(default)]
    pub mask_email: bool,
    /// Mask phone numbers down to the last four digits
    #[serde(default)]
    pub mask_phone: bool,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthzConfig {
    /// Baseline capability keys granted to learner principals, who hold
    /// no role memberships
    #[serde(default = "default_learner_baseline")]
    pub learner_baseline: Vec<String>,
    /// Masking feature flags
    #[serde(default)]
    pub masking: MaskingConfig,
    /// Depth bound for department hierarchy traversal; traversal past
    /// this depth is treated as malformed data
    #[serde(default = "default_max_hierarchy_depth")]
    pub max_hierarchy_depth: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            learner_baseline: default_learner_baseline(),
            masking: MaskingConfig::default(),
            max_hierarchy_depth: default_max_hierarchy_depth(),
        }
    }
}

impl AuthzConfig {
    /// Load configuration from a YAML file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| AuthzError::validation(format!("failed to read config file: {e}")))?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| AuthzError::validation(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Merge another configuration over this one
    pub fn merge(mut self, other: Self) -> Self {
        if other.learner_baseline != default_learner_baseline() {
            self.learner_baseline = other.learner_baseline;
        }
        if other.max_hierarchy_depth != default_max_hierarchy_depth() {
            self.max_hierarchy_depth = other.max_hierarchy_depth;
        }
        self.masking.mask_email |= other.masking.mask_email;
        self.masking.mask_phone |= other.masking.mask_phone;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_hierarchy_depth == 0 {
            return Err(AuthzError::validation(
                "max_hierarchy_depth must be at least 1",
            ));
        }
        for key in &self.learner_baseline {
            CapabilityKey::new(key.clone())?;
        }
        Ok(())
    }

    /// The learner baseline as parsed capability keys.
    /// Call `validate` first; invalid keys are skipped here.
    pub fn learner_baseline_keys(&self) -> Vec<CapabilityKey> {
        self.learner_baseline
            .iter()
            .filter_map(|k| CapabilityKey::new(k.clone()).ok())
            .collect()
    }
}
