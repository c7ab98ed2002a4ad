use crate::index::{check_embedding, ClusterId, ClusterIndex, ClusterSummary};
use ahash::AHashSet;
use matchx_core::{Embedding, Error, Result};
use serde_json::{json, Value};

/// Every tag lives in cluster 0, so queries score against the whole store.
/// Useful as an exhaustive baseline.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    tags: Vec<String>,
    members: AHashSet<String>,
    dim: Option<usize>,
}

impl FlatIndex {
    pub const CLUSTER: ClusterId = 0;

    pub fn new() -> Self {
        Self::default()
    }
}

impl ClusterIndex for FlatIndex {
    fn ingest(&mut self, tag: &str, embedding: &Embedding) -> Result<()> {
        check_embedding(self.dim, embedding)?;
        if !self.members.insert(tag.to_string()) {
            return Err(Error::ClusterIndex(format!("tag already indexed: {}", tag)));
        }
        self.tags.push(tag.to_string());
        self.dim = Some(embedding.dim());
        Ok(())
    }

    fn update(&mut self, tag: &str, embedding: &Embedding) -> Result<()> {
        check_embedding(self.dim, embedding)?;
        if !self.members.contains(tag) {
            return Err(Error::TagNotFound(tag.to_string()));
        }
        Ok(())
    }

    fn remove(&mut self, tag: &str) -> Result<()> {
        if !self.members.remove(tag) {
            return Err(Error::TagNotFound(tag.to_string()));
        }
        self.tags.retain(|t| t != tag);
        if self.tags.is_empty() {
            self.dim = None;
        }
        Ok(())
    }

    fn predict(&self, embedding: &Embedding) -> Result<ClusterId> {
        check_embedding(self.dim, embedding)?;
        Ok(Self::CLUSTER)
    }

    fn tags_in_cluster(&self, cluster: ClusterId) -> Result<Vec<String>> {
        if cluster == Self::CLUSTER {
            Ok(self.tags.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn contains(&self, tag: &str) -> bool {
        self.members.contains(tag)
    }

    fn tags(&self) -> Vec<String> {
        self.tags.clone()
    }

    fn clusters(&self) -> Vec<ClusterSummary> {
        if self.tags.is_empty() {
            return Vec::new();
        }
        vec![ClusterSummary {
            id: Self::CLUSTER,
            center: None,
            radius: f32::INFINITY,
            tags: self.tags.clone(),
        }]
    }

    fn describe(&self) -> Value {
        json!({
            "kind": "flat",
            "tags": self.tags.len(),
        })
    }

    fn len(&self) -> usize {
        self.tags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tags_share_one_cluster() {
        let mut index = FlatIndex::new();
        index.ingest("a", &Embedding::new(vec![0.0, 1.0])).unwrap();
        index.ingest("b", &Embedding::new(vec![100.0, -3.0])).unwrap();

        let cluster = index.predict(&Embedding::new(vec![5.0, 5.0])).unwrap();
        assert_eq!(
            index.tags_in_cluster(cluster).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_remove_and_missing_tags() {
        let mut index = FlatIndex::new();
        index.ingest("a", &Embedding::new(vec![0.0])).unwrap();
        assert!(index.ingest("a", &Embedding::new(vec![1.0])).is_err());
        index.remove("a").unwrap();
        assert!(index.is_empty());
        assert!(index.clusters().is_empty());
        assert!(matches!(index.remove("a"), Err(Error::TagNotFound(_))));
        assert!(matches!(
            index.update("a", &Embedding::new(vec![1.0])),
            Err(Error::TagNotFound(_))
        ));
    }
}
