use crate::chain::ChainPolicy;
use align_core::{Error, RansacConfig, Result};
use align_features::{MatcherConfig, SiftConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every tunable of the alignment pipeline. Missing TOML fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    pub chain_policy: ChainPolicy,
    /// Frames are resampled by this factor before feature work; transforms
    /// are lifted back before warping the originals.
    pub working_scale: f32,
    pub fill: u8,
    pub sift: SiftConfig,
    pub matcher: MatcherConfig,
    pub estimator: RansacConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            chain_policy: ChainPolicy::default(),
            working_scale: 1.0,
            fill: 0,
            sift: SiftConfig::default(),
            matcher: MatcherConfig::default(),
            estimator: RansacConfig::default(),
        }
    }
}

impl AlignConfig {
    pub fn validate(&self) -> Result<()> {
        self.sift.validate()?;
        self.matcher.validate()?;
        self.estimator.validate()?;
        if !(self.working_scale > 0.0 && self.working_scale <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "working_scale must be in (0, 1], got {}",
                self.working_scale
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AlignConfig = toml::from_str(contents)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::info!(?path, "loaded alignment config");
        Ok(config)
    }
}
