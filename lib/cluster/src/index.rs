use matchx_core::{Embedding, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type ClusterId = u64;

/// Point-in-time description of one cluster
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterSummary {
    pub id: ClusterId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<Embedding>,
    pub radius: f32,
    pub tags: Vec<String>,
}

/// Groups tagged embeddings into clusters and predicts which cluster a new
/// embedding would join.
///
/// Every mutator is all-or-nothing: when it returns an error the index is
/// left exactly as it was before the call.
pub trait ClusterIndex: Send + Sync {
    /// Add a new tag. Fails if the tag is already indexed.
    fn ingest(&mut self, tag: &str, embedding: &Embedding) -> Result<()>;

    /// Re-place an indexed tag with a new embedding.
    fn update(&mut self, tag: &str, embedding: &Embedding) -> Result<()>;

    fn remove(&mut self, tag: &str) -> Result<()>;

    /// Cluster the embedding would join, without adding it. May name a
    /// cluster that does not exist yet, in which case it has no tags.
    fn predict(&self, embedding: &Embedding) -> Result<ClusterId>;

    fn tags_in_cluster(&self, cluster: ClusterId) -> Result<Vec<String>>;

    fn contains(&self, tag: &str) -> bool;

    /// Every indexed tag, in iteration order
    fn tags(&self) -> Vec<String>;

    fn clusters(&self) -> Vec<ClusterSummary>;

    fn describe(&self) -> Value;

    fn len(&self) -> usize {
        self.tags().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn check_embedding(expected: Option<usize>, embedding: &Embedding) -> Result<()> {
    match expected {
        Some(expected) if expected != embedding.dim() => Err(Error::InvalidDimension {
            expected,
            actual: embedding.dim(),
        }),
        _ if embedding.is_empty() => Err(Error::ClusterIndex(
            "cannot index an empty embedding".to_string(),
        )),
        _ if !embedding.is_finite() => Err(Error::ClusterIndex(
            "cannot index an embedding with non-finite components".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Selects and parameterizes the index an engine is built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndexConfig {
    Ecm(crate::EcmConfig),
    Flat,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::Ecm(crate::EcmConfig::default())
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            IndexConfig::Ecm(config)
                if !(config.distance_threshold.is_finite() && config.distance_threshold > 0.0) =>
            {
                Err(Error::InvalidConfig(format!(
                    "distance_threshold must be a positive number, got {}",
                    config.distance_threshold
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn ClusterIndex> {
        match self {
            IndexConfig::Ecm(config) => Box::new(crate::EcmIndex::new(*config)),
            IndexConfig::Flat => Box::new(crate::FlatIndex::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_index_config_decoding() {
        let ecm: IndexConfig =
            serde_json::from_value(json!({"kind": "ecm", "distance_threshold": 0.5})).unwrap();
        assert_eq!(
            ecm,
            IndexConfig::Ecm(crate::EcmConfig { distance_threshold: 0.5 })
        );

        let defaulted: IndexConfig = serde_json::from_value(json!({"kind": "ecm"})).unwrap();
        assert_eq!(defaulted, IndexConfig::default());

        let flat: IndexConfig = serde_json::from_value(json!({"kind": "flat"})).unwrap();
        assert!(flat.build().describe()["kind"] == "flat");
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = IndexConfig::Ecm(crate::EcmConfig { distance_threshold: 0.0 });
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_non_finite_embeddings_never_reach_a_cluster() {
        for mut index in [IndexConfig::default().build(), IndexConfig::Flat.build()] {
            index.ingest("a", &Embedding::new(vec![0.0, 0.0])).unwrap();

            let nan = Embedding::new(vec![f32::NAN, 0.0]);
            let inf = Embedding::new(vec![f32::INFINITY, 1.0]);
            assert!(matches!(index.ingest("b", &nan), Err(Error::ClusterIndex(_))));
            assert!(matches!(index.update("a", &inf), Err(Error::ClusterIndex(_))));
            assert!(index.predict(&nan).is_err());

            assert_eq!(index.tags(), vec!["a".to_string()]);
            assert!(index.clusters().iter().all(|c| c.radius.is_finite()));
        }
    }
}
