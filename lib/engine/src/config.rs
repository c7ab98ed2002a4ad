use matchx_cluster::IndexConfig;
use matchx_core::{Error, Result, ScoringCalculator, ScoringOptions, SimilarityMetric, Transformer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub score_to_be_match: f32,
    pub metric: SimilarityMetric,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            score_to_be_match: ScoringOptions::default().score_to_be_match,
            metric: SimilarityMetric::default(),
        }
    }
}

impl ScoringConfig {
    pub fn calculator(&self) -> ScoringCalculator {
        ScoringCalculator::new(
            ScoringOptions {
                score_to_be_match: self.score_to_be_match,
            },
            self.metric,
        )
    }
}

/// Engine configuration, usually read from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub cluster_index: IndexConfig,
    pub transformers: BTreeMap<String, Transformer>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut transformers = BTreeMap::new();
        transformers.insert("vector".to_string(), Transformer::Vector);
        transformers.insert("identity".to_string(), Transformer::Identity);
        Self {
            scoring: ScoringConfig::default(),
            cluster_index: IndexConfig::default(),
            transformers,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scoring.score_to_be_match.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "score_to_be_match must be finite, got {}",
                self.scoring.score_to_be_match
            )));
        }
        self.cluster_index.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = EngineConfig::from_json_str(r#"{"scoring": {"score_to_be_match": 0.8}}"#)
            .unwrap();
        assert_eq!(config.scoring.score_to_be_match, 0.8);
        assert_eq!(config.scoring.metric, SimilarityMetric::Cosine);
        assert_eq!(config.cluster_index, IndexConfig::default());
        assert_eq!(config.transformers.len(), 2);
    }

    #[test]
    fn test_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "scoring": {{"metric": "euclidean"}},
                "cluster_index": {{"kind": "flat"}},
                "transformers": {{"precomputed": "identity"}}
            }}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.scoring.metric, SimilarityMetric::Euclidean);
        assert_eq!(config.cluster_index, IndexConfig::Flat);
        assert_eq!(
            config.transformers.get("precomputed"),
            Some(&Transformer::Identity)
        );
        assert_eq!(config.scoring.calculator().threshold(), 0.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = EngineConfig::from_json_str(
            r#"{"cluster_index": {"kind": "ecm", "distance_threshold": -1.0}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = EngineConfig::from_json_str(r#"{"cluster_index": {"kind": "kmeans"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
