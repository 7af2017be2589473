//! Pipeline configuration.
//!
//! Everything a batch run needs, loadable from a JSON file. Missing keys
//! take their defaults, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ReconError, Result};
use crate::lob::ReplayConfig;
use crate::output::OutputConfig;

/// Replay plus output settings for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub replay: ReplayConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot depth for both replay and output.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.replay.depth = depth;
        self.output.depth = depth;
        self
    }

    pub fn with_replay(mut self, replay: ReplayConfig) -> Self {
        self.replay = replay;
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        self.replay.validate()?;

        if self.output.depth != self.replay.depth {
            return Err(ReconError::Config(format!(
                "output depth {} does not match replay depth {}",
                self.output.depth, self.replay.depth
            )));
        }

        if let Some(target) = &self.output.target_company_id {
            if target.trim().is_empty() {
                return Err(ReconError::Config("target_company_id is empty".into()));
            }
        }

        Ok(())
    }

    /// Save to JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lob::CarryForwardPolicy;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.replay.depth, 10);
        assert_eq!(config.output.target_company_id.as_deref(), Some("99"));
    }

    #[test]
    fn test_depth_mismatch() {
        let mut config = PipelineConfig::new();
        config.output.depth = 5;
        assert!(matches!(config.validate(), Err(ReconError::Config(_))));

        assert!(PipelineConfig::new().with_depth(5).validate().is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let config =
            PipelineConfig::new().with_output(OutputConfig::default().with_target_company(" "));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");

        let config = PipelineConfig::new()
            .with_depth(5)
            .with_replay(
                ReplayConfig::new(5).with_carry_forward(CarryForwardPolicy::SameInstrument),
            );
        config.save_json(&path).unwrap();

        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"replay": {"carry_forward": "same_instrument"}}"#).unwrap();

        let loaded = PipelineConfig::load_json(&path).unwrap();
        assert_eq!(loaded.replay.carry_forward, CarryForwardPolicy::SameInstrument);
        assert_eq!(loaded.replay.depth, 10);
        assert_eq!(loaded.output, OutputConfig::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            PipelineConfig::load_json(&path),
            Err(ReconError::Json(_))
        ));
    }
}
