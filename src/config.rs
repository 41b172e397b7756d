//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};
use crate::ranker::AggregationPolicy;
use crate::similarity::Metric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of neighbors consulted per request.
    pub k: usize,
    /// Maximum number of recommendations returned.
    pub max_results: usize,
    pub metric: Metric,
    pub policy: AggregationPolicy,
    /// Threshold policy only counts neighbor ratings strictly above this.
    pub min_rating: f32,
    /// Songs handed out for cold-start rating.
    pub sample_size: usize,
    /// Answer empty ratings with the most popular songs instead of rejecting
    /// them. Only honored under the weighted policy.
    pub allow_empty_input: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_results: 5,
            metric: Metric::Euclidean,
            policy: AggregationPolicy::Threshold,
            min_rating: 3.0,
            sample_size: 15,
            allow_empty_input: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RecError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| RecError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RecError::InvalidConfig("k must be at least 1".to_string()));
        }
        if self.max_results == 0 {
            return Err(RecError::InvalidConfig(
                "max_results must be at least 1".to_string(),
            ));
        }
        if !self.min_rating.is_finite() {
            return Err(RecError::InvalidConfig(
                "min_rating must be a finite number".to_string(),
            ));
        }
        if self.allow_empty_input && self.policy == AggregationPolicy::Threshold {
            tracing::warn!("allow_empty_input has no effect under the threshold policy");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.k, 5);
        assert_eq!(config.max_results, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"k": 3, "metric": "cosine", "policy": "weighted"}}"#)?;

        let config = EngineConfig::from_json_file(file.path())?;
        assert_eq!(config.k, 3);
        assert_eq!(config.metric, Metric::Cosine);
        assert_eq!(config.policy, AggregationPolicy::Weighted);
        assert_eq!(config.sample_size, 15);
        Ok(())
    }

    #[test]
    fn test_unknown_metric_is_rejected() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"metric": "jaccard"}}"#)?;

        let err = EngineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, RecError::InvalidConfig(_)));
        Ok(())
    }

    #[test]
    fn test_zero_k_is_rejected() {
        let config = EngineConfig {
            k: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RecError::InvalidConfig(_))));
    }
}
