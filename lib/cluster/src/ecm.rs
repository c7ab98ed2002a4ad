//! Evolving Clustering Method.
//!
//! An online, single-pass clustering: each cluster is a hypersphere
//! (center + radius). A sample inside some sphere joins it unchanged; a
//! sample outside every sphere either grows the cheapest sphere to cover it
//! or, when that sphere would exceed the distance threshold, founds a new
//! cluster of radius zero.

use crate::index::{check_embedding, ClusterId, ClusterIndex, ClusterSummary};
use ahash::AHashMap;
use matchx_core::{Embedding, Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcmConfig {
    /// Upper bound on a cluster's radius, compared as `2 * threshold`
    /// against the grown diameter
    pub distance_threshold: f32,
}

impl Default for EcmConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Cluster {
    id: ClusterId,
    center: Embedding,
    radius: f32,
    members: Vec<String>,
}

/// Where a sample lands
#[derive(Debug)]
enum Placement {
    Inside(usize),
    Grow {
        idx: usize,
        center: Embedding,
        radius: f32,
    },
    Spawn,
}

#[derive(Debug, Clone, Default)]
pub struct EcmIndex {
    config: EcmConfig,
    clusters: Vec<Cluster>,
    assignments: AHashMap<String, ClusterId>,
    next_id: ClusterId,
    dim: Option<usize>,
}

impl EcmIndex {
    pub fn new(config: EcmConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn with_threshold(distance_threshold: f32) -> Self {
        Self::new(EcmConfig { distance_threshold })
    }

    pub fn config(&self) -> &EcmConfig {
        &self.config
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    /// Cluster currently holding `tag`
    pub fn cluster_of(&self, tag: &str) -> Option<ClusterId> {
        self.assignments.get(tag).copied()
    }

    fn position(&self, id: ClusterId) -> Option<usize> {
        self.clusters.iter().position(|c| c.id == id)
    }

    fn place(&self, x: &Embedding) -> Placement {
        if self.clusters.is_empty() {
            return Placement::Spawn;
        }

        let distances: Vec<f32> = self
            .clusters
            .iter()
            .map(|c| x.l2_distance(&c.center))
            .collect();

        let containing = distances
            .iter()
            .enumerate()
            .filter(|(i, d)| **d <= self.clusters[*i].radius)
            .min_by_key(|(_, d)| OrderedFloat(**d));
        if let Some((idx, _)) = containing {
            return Placement::Inside(idx);
        }

        let cheapest = distances
            .iter()
            .enumerate()
            .map(|(i, d)| (i, *d, d + self.clusters[i].radius))
            .min_by_key(|(_, _, s)| OrderedFloat(*s));
        let Some((idx, dist, s)) = cheapest else {
            return Placement::Spawn;
        };

        if s > 2.0 * self.config.distance_threshold {
            return Placement::Spawn;
        }

        // dist > radius >= 0 here, so the division is safe
        let radius = s / 2.0;
        let center = x.lerp(&self.clusters[idx].center, radius / dist);
        Placement::Grow { idx, center, radius }
    }

    fn insert_unchecked(&mut self, tag: &str, embedding: &Embedding) -> ClusterId {
        let id = match self.place(embedding) {
            Placement::Inside(idx) => {
                self.clusters[idx].members.push(tag.to_string());
                self.clusters[idx].id
            }
            Placement::Grow { idx, center, radius } => {
                let cluster = &mut self.clusters[idx];
                cluster.center = center;
                cluster.radius = radius;
                cluster.members.push(tag.to_string());
                cluster.id
            }
            Placement::Spawn => {
                let id = self.next_id;
                self.next_id += 1;
                self.clusters.push(Cluster {
                    id,
                    center: embedding.clone(),
                    radius: 0.0,
                    members: vec![tag.to_string()],
                });
                id
            }
        };

        self.assignments.insert(tag.to_string(), id);
        self.dim = Some(embedding.dim());
        trace!(tag, cluster = id, "ecm placed tag");
        id
    }

    fn remove_unchecked(&mut self, tag: &str, cluster: ClusterId) {
        self.assignments.remove(tag);
        if let Some(pos) = self.position(cluster) {
            self.clusters[pos].members.retain(|m| m != tag);
            if self.clusters[pos].members.is_empty() {
                self.clusters.remove(pos);
            }
        }
        if self.assignments.is_empty() {
            self.dim = None;
        }
    }
}

impl ClusterIndex for EcmIndex {
    fn ingest(&mut self, tag: &str, embedding: &Embedding) -> Result<()> {
        check_embedding(self.dim, embedding)?;
        if self.assignments.contains_key(tag) {
            return Err(Error::ClusterIndex(format!("tag already indexed: {}", tag)));
        }
        self.insert_unchecked(tag, embedding);
        Ok(())
    }

    fn update(&mut self, tag: &str, embedding: &Embedding) -> Result<()> {
        check_embedding(self.dim, embedding)?;
        let cluster = self
            .cluster_of(tag)
            .ok_or_else(|| Error::TagNotFound(tag.to_string()))?;
        self.remove_unchecked(tag, cluster);
        self.insert_unchecked(tag, embedding);
        Ok(())
    }

    fn remove(&mut self, tag: &str) -> Result<()> {
        let cluster = self
            .cluster_of(tag)
            .ok_or_else(|| Error::TagNotFound(tag.to_string()))?;
        self.remove_unchecked(tag, cluster);
        Ok(())
    }

    fn predict(&self, embedding: &Embedding) -> Result<ClusterId> {
        check_embedding(self.dim, embedding)?;
        let id = match self.place(embedding) {
            Placement::Inside(idx) | Placement::Grow { idx, .. } => self.clusters[idx].id,
            Placement::Spawn => self.next_id,
        };
        Ok(id)
    }

    fn tags_in_cluster(&self, cluster: ClusterId) -> Result<Vec<String>> {
        Ok(self
            .position(cluster)
            .map(|pos| self.clusters[pos].members.clone())
            .unwrap_or_default())
    }

    fn contains(&self, tag: &str) -> bool {
        self.assignments.contains_key(tag)
    }

    fn tags(&self) -> Vec<String> {
        self.clusters
            .iter()
            .flat_map(|c| c.members.iter().cloned())
            .collect()
    }

    fn clusters(&self) -> Vec<ClusterSummary> {
        self.clusters
            .iter()
            .map(|c| ClusterSummary {
                id: c.id,
                center: Some(c.center.clone()),
                radius: c.radius,
                tags: c.members.clone(),
            })
            .collect()
    }

    fn describe(&self) -> Value {
        json!({
            "kind": "ecm",
            "distance_threshold": self.config.distance_threshold,
            "clusters": self.clusters.len(),
            "tags": self.assignments.len(),
        })
    }

    fn len(&self) -> usize {
        self.assignments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(data: &[f32]) -> Embedding {
        Embedding::from_slice(data)
    }

    #[test]
    fn test_first_sample_founds_cluster() {
        let mut index = EcmIndex::default();
        index.ingest("a", &emb(&[1.0, 1.0])).unwrap();
        assert_eq!(index.cluster_count(), 1);
        assert_eq!(index.tags_in_cluster(0).unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_nearby_sample_grows_cluster() {
        let mut index = EcmIndex::with_threshold(2.0);
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        index.ingest("b", &emb(&[2.0, 0.0])).unwrap();

        let clusters = index.clusters();
        assert_eq!(clusters.len(), 1);
        assert!((clusters[0].radius - 1.0).abs() < 1e-6);
        assert_eq!(clusters[0].center.as_ref().unwrap().as_slice(), &[1.0, 0.0]);
        assert_eq!(clusters[0].tags, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_distant_sample_spawns_cluster() {
        let mut index = EcmIndex::with_threshold(1.0);
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        index.ingest("b", &emb(&[10.0, 0.0])).unwrap();
        assert_eq!(index.cluster_count(), 2);
        assert_eq!(index.cluster_of("b"), Some(1));
    }

    #[test]
    fn test_predict_does_not_mutate() {
        let mut index = EcmIndex::with_threshold(2.0);
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        let before = index.clusters();

        assert_eq!(index.predict(&emb(&[1.0, 0.0])).unwrap(), 0);
        assert_eq!(index.clusters(), before);

        let fresh = index.predict(&emb(&[50.0, 50.0])).unwrap();
        assert_eq!(fresh, 1);
        assert!(index.tags_in_cluster(fresh).unwrap().is_empty());
    }

    #[test]
    fn test_remove_drops_empty_cluster() {
        let mut index = EcmIndex::with_threshold(1.0);
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        index.ingest("b", &emb(&[10.0, 0.0])).unwrap();
        index.remove("b").unwrap();
        assert_eq!(index.cluster_count(), 1);
        assert!(!index.contains("b"));
        assert!(matches!(index.remove("b"), Err(Error::TagNotFound(_))));
    }

    #[test]
    fn test_update_moves_tag() {
        let mut index = EcmIndex::with_threshold(1.0);
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        index.ingest("b", &emb(&[10.0, 0.0])).unwrap();
        index.update("a", &emb(&[10.5, 0.0])).unwrap();
        assert_eq!(index.cluster_of("a"), index.cluster_of("b"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_failed_calls_leave_index_untouched() {
        let mut index = EcmIndex::default();
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        let before = index.clusters();

        assert!(matches!(
            index.ingest("b", &emb(&[1.0, 2.0, 3.0])),
            Err(Error::InvalidDimension { expected: 2, actual: 3 })
        ));
        assert!(index.ingest("a", &emb(&[5.0, 5.0])).is_err());
        assert!(index.update("a", &emb(&[1.0])).is_err());
        assert!(matches!(
            index.update("zzz", &emb(&[1.0, 1.0])),
            Err(Error::TagNotFound(_))
        ));

        assert_eq!(index.clusters(), before);
        assert_eq!(index.tags(), vec!["a".to_string()]);
    }

    #[test]
    fn test_dimension_resets_when_emptied() {
        let mut index = EcmIndex::default();
        index.ingest("a", &emb(&[0.0, 0.0])).unwrap();
        index.remove("a").unwrap();
        assert!(index.is_empty());
        index.ingest("b", &emb(&[1.0, 2.0, 3.0])).unwrap();
        assert!(index.contains("b"));
    }

    #[test]
    fn test_random_stream_keeps_radii_bounded() {
        use rand::Rng;
        let mut rng = rand::rng();
        let mut index = EcmIndex::with_threshold(0.8);

        for i in 0..300 {
            let point: Vec<f32> = (0..3).map(|_| rng.random_range(-5.0f32..5.0)).collect();
            index.ingest(&format!("p{}", i), &emb(&point)).unwrap();
        }

        let clusters = index.clusters();
        let mut seen = 0;
        for cluster in &clusters {
            assert!(cluster.radius <= 0.8 + 1e-4);
            assert!(!cluster.tags.is_empty());
            for tag in &cluster.tags {
                assert_eq!(index.cluster_of(tag), Some(cluster.id));
            }
            seen += cluster.tags.len();
        }
        assert_eq!(seen, 300);
        assert_eq!(index.len(), 300);
    }
}
