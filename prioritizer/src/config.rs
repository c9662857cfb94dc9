// src/config.rs

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PrioritizerError, Result};

pub const DEFAULT_DEPTH_WEIGHT: f64 = 2.0;
pub const DEFAULT_AA_WEIGHT: f64 = 1.0;
pub const DEFAULT_DOMAIN_WEIGHT: f64 = 1.0;
pub const DEFAULT_UNIPROT_TOLERANCE: u32 = 50;

/// Parameters consumed by the scoring core.
///
/// Every field has a default, so a JSON config file may set any subset:
/// `{"uniprot_tolerance": 25, "depth_weight": 1.5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Max |candidate length - expected length| for a UniProt entry to be eligible.
    pub uniprot_tolerance: u32,
    pub depth_weight: f64,
    pub aa_weight: f64,
    pub domain_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            uniprot_tolerance: DEFAULT_UNIPROT_TOLERANCE,
            depth_weight: DEFAULT_DEPTH_WEIGHT,
            aa_weight: DEFAULT_AA_WEIGHT,
            domain_weight: DEFAULT_DOMAIN_WEIGHT,
        }
    }
}

impl ScoringConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        info!("Reading scoring configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        let config: ScoringConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn weight_sum(&self) -> f64 {
        self.depth_weight + self.aa_weight + self.domain_weight
    }

    /// Weights must be finite, non-negative and not all zero.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("depth_weight", self.depth_weight),
            ("aa_weight", self.aa_weight),
            ("domain_weight", self.domain_weight),
        ];
        for (name, w) in weights {
            if !w.is_finite() || w < 0.0 {
                return Err(PrioritizerError::InvalidWeightConfiguration(format!(
                    "{name} must be a finite non-negative number, got {w}"
                )));
            }
        }
        if self.weight_sum() <= 0.0 {
            return Err(PrioritizerError::InvalidWeightConfiguration(
                "sum of depth_weight, aa_weight and domain_weight must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_published_weights() {
        let c = ScoringConfig::default();
        assert_eq!(c.uniprot_tolerance, 50);
        assert_eq!(c.weight_sum(), 4.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_weights_are_rejected() {
        let c = ScoringConfig {
            depth_weight: 0.0,
            aa_weight: 0.0,
            domain_weight: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(PrioritizerError::InvalidWeightConfiguration(_))
        ));
    }

    #[test]
    fn negative_or_nan_weight_is_rejected() {
        let neg = ScoringConfig {
            aa_weight: -1.0,
            ..Default::default()
        };
        assert!(neg.validate().is_err());

        let nan = ScoringConfig {
            domain_weight: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c: ScoringConfig = serde_json::from_str(r#"{"uniprot_tolerance": 10}"#).unwrap();
        assert_eq!(c.uniprot_tolerance, 10);
        assert_eq!(c.depth_weight, DEFAULT_DEPTH_WEIGHT);
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"aa_weight": 3.0}"#).unwrap();
        let c = ScoringConfig::from_json_file(&path).unwrap();
        assert_eq!(c.aa_weight, 3.0);
        assert_eq!(c.domain_weight, DEFAULT_DOMAIN_WEIGHT);
    }
}
