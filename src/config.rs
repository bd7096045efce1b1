//! Pipeline configuration shared by the session and the CLI

use serde::{Deserialize, Serialize};

use crate::error::SegmentError;
use crate::model::Feature;

pub const DEFAULT_RECORDS: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of synthetic customers to generate
    pub records: usize,
    /// Seed for the synthetic data generator
    pub seed: u64,
    /// Seed for the train/test shuffle
    pub split_seed: u64,
    /// Fraction of records held out for evaluation
    pub test_ratio: f64,
    /// Feature columns fed to the classifier, in order
    pub features: Vec<Feature>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            seed: DEFAULT_SEED,
            split_seed: DEFAULT_SEED,
            test_ratio: DEFAULT_TEST_RATIO,
            features: vec![Feature::Income, Feature::Investment],
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> crate::Result<()> {
        if self.records == 0 {
            return Err(SegmentError::InvalidInput(
                "record count must be positive".to_string(),
            ));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(SegmentError::InvalidInput(format!(
                "test ratio must lie in (0, 1), got {}",
                self.test_ratio
            )));
        }
        if self.features.is_empty() {
            return Err(SegmentError::InvalidInput(
                "at least one feature column is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.records, 1000);
        assert_eq!(config.features, vec![Feature::Income, Feature::Investment]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.records = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.test_ratio = 1.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.features.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
