//! Similarity scoring between two instances.
//!
//! A [`ScoringCalculator`] pairs a [`SimilarityMetric`] with a match
//! threshold. It is pure: the same pair of instances always yields the
//! same [`Scoring`].

use crate::{Embedding, Error, Instance, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// Similarity function applied to two embeddings.
/// Higher is always more similar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// `a·b / (|a||b|)`, 0 when either norm is 0
    #[default]
    Cosine,
    /// `1 / (1 + |a - b|)`
    Euclidean,
    /// `a·b`
    Dot,
}

impl SimilarityMetric {
    pub fn similarity(&self, a: &Embedding, b: &Embedding) -> Result<f32> {
        if a.dim() != b.dim() {
            return Err(Error::InvalidDimension {
                expected: a.dim(),
                actual: b.dim(),
            });
        }

        let score = match self {
            SimilarityMetric::Cosine => a.cosine_similarity(b),
            SimilarityMetric::Euclidean => 1.0 / (1.0 + a.l2_distance(b)),
            SimilarityMetric::Dot => a.dot(b),
        };
        Ok(score)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
            SimilarityMetric::Dot => "dot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringOptions {
    /// Minimum similarity for a scoring to count as a match
    pub score_to_be_match: f32,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            score_to_be_match: 0.5,
        }
    }
}

/// Result of comparing a query instance against one stored entity
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Scoring {
    pub scored_tag: String,
    pub scored_instance: Instance,
    pub similarity_score: f32,
    pub is_match: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScoringCalculator {
    options: ScoringOptions,
    metric: SimilarityMetric,
}

impl ScoringCalculator {
    pub fn new(options: ScoringOptions, metric: SimilarityMetric) -> Self {
        Self { options, metric }
    }

    pub fn with_threshold(score_to_be_match: f32) -> Self {
        Self::new(ScoringOptions { score_to_be_match }, SimilarityMetric::default())
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn threshold(&self) -> f32 {
        self.options.score_to_be_match
    }

    /// Score `query` against the stored instance `scored` known as `tag`
    pub fn score(&self, query: &Instance, tag: &str, scored: &Instance) -> Result<Scoring> {
        let similarity_score = self
            .metric
            .similarity(query.embedding(), scored.embedding())?;

        Ok(Scoring {
            scored_tag: tag.to_string(),
            scored_instance: scored.clone(),
            similarity_score,
            is_match: similarity_score >= self.options.score_to_be_match,
        })
    }

    /// Structural summary for diagnostics; never consulted when scoring
    pub fn describe(&self) -> Value {
        json!({
            "scoring_options": self.options,
            "scoring": [
                format!("{}(instance1.embedding, instance2.embedding)", self.metric.name())
            ]
        })
    }
}

impl Serialize for ScoringCalculator {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.describe().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_identical_vectors_match() {
        let calc = ScoringCalculator::default();
        let a = Instance::from_vector(vec![1.0, 1.0]);
        let b = Instance::from_vector(vec![2.0, 2.0]);
        let scoring = calc.score(&a, "b", &b).unwrap();
        assert_eq!(scoring.scored_tag, "b");
        assert!((scoring.similarity_score - 1.0).abs() < 1e-6);
        assert!(scoring.is_match);
        assert_eq!(scoring.scored_instance, b);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let calc = ScoringCalculator::new(
            ScoringOptions { score_to_be_match: 0.0 },
            SimilarityMetric::Cosine,
        );
        let a = Instance::from_vector(vec![1.0, 0.0]);
        let b = Instance::from_vector(vec![0.0, 1.0]);
        let scoring = calc.score(&a, "b", &b).unwrap();
        assert_eq!(scoring.similarity_score, 0.0);
        assert!(scoring.is_match);
    }

    #[test]
    fn test_is_match_agrees_with_threshold() {
        let mut rng = rand::rng();
        let calc = ScoringCalculator::new(ScoringOptions::default(), SimilarityMetric::Euclidean);
        for _ in 0..200 {
            let a: Vec<f32> = (0..4).map(|_| rng.random_range(-2.0f32..2.0)).collect();
            let b: Vec<f32> = (0..4).map(|_| rng.random_range(-2.0f32..2.0)).collect();
            let scoring = calc
                .score(&Instance::from_vector(a), "t", &Instance::from_vector(b))
                .unwrap();
            assert_eq!(scoring.is_match, scoring.similarity_score >= calc.threshold());
        }
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let calc = ScoringCalculator::default();
        let a = Instance::from_vector(vec![1.0, 0.0]);
        let b = Instance::from_vector(vec![1.0, 0.0, 0.0]);
        let err = calc.score(&a, "b", &b).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_euclidean_similarity_decays_with_distance() {
        let near = SimilarityMetric::Euclidean
            .similarity(&Embedding::new(vec![0.0]), &Embedding::new(vec![1.0]))
            .unwrap();
        let far = SimilarityMetric::Euclidean
            .similarity(&Embedding::new(vec![0.0]), &Embedding::new(vec![3.0]))
            .unwrap();
        assert!((near - 0.5).abs() < 1e-6);
        assert!((far - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_serializes_through_describe() {
        let calc = ScoringCalculator::with_threshold(0.75);
        let rendered = serde_json::to_value(&calc).unwrap();
        assert_eq!(rendered, calc.describe());
        assert_eq!(rendered["scoring_options"]["score_to_be_match"], 0.75);
        assert_eq!(
            rendered["scoring"][0],
            "cosine(instance1.embedding, instance2.embedding)"
        );
    }
}
