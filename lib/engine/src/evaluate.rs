//! Cluster and match quality reports.
//!
//! The orchestrator only delegates here; the report contents belong to the
//! evaluator. The defaults, [`ClusterStats`] and [`MatchStats`], aggregate
//! simple statistics over the current store.

use crate::operation::QueryInfo;
use crate::view::EngineView;
use matchx_core::{Result, Scoring};
use rayon::prelude::*;
use serde_json::{json, Map, Value};

pub type Report = Map<String, Value>;

/// Key of the per-value breakdown inside a match report
pub const BY_VALUE_KEY: &str = "by_value";

/// Key under which a match report is nested inside a cluster report
pub const MATCHES_RESULTS_KEY: &str = "matches_results";

pub trait ClusterEvaluator: Send + Sync {
    fn evaluate_clusters(&self, view: &EngineView<'_>) -> Result<Report>;
}

pub trait MatchEvaluator: Send + Sync {
    /// Reports must place any per-value detail under [`BY_VALUE_KEY`]
    fn evaluate_matches(&self, view: &EngineView<'_>, values: &[QueryInfo]) -> Result<Report>;
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Cluster sizes plus mean pairwise similarity inside each cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterStats;

impl ClusterStats {
    fn intra_similarity(view: &EngineView<'_>, tags: &[String]) -> Result<Option<f64>> {
        let members: Vec<_> = tags
            .iter()
            .filter_map(|tag| view.instance(tag).map(|instance| (tag, instance)))
            .collect();

        let calculator = view.scoring_calculator();
        let mut scores = Vec::new();
        for (i, (_, a)) in members.iter().enumerate() {
            for (tag_b, b) in &members[i + 1..] {
                scores.push(calculator.score(a, tag_b, b)?.similarity_score as f64);
            }
        }
        Ok(mean(&scores))
    }
}

impl ClusterEvaluator for ClusterStats {
    fn evaluate_clusters(&self, view: &EngineView<'_>) -> Result<Report> {
        let clusters = view.clusters();
        let sizes: Vec<f64> = clusters.iter().map(|c| c.tags.len() as f64).collect();

        let mut intra = Vec::new();
        let mut per_cluster = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let similarity = Self::intra_similarity(view, &cluster.tags)?;
            if let Some(s) = similarity {
                intra.push(s);
            }
            per_cluster.push(json!({
                "id": cluster.id,
                "size": cluster.tags.len(),
                "radius": cluster.radius,
                "mean_similarity": similarity,
            }));
        }

        let mut report = Report::new();
        report.insert("num_entities".into(), json!(view.entity_count()));
        report.insert("num_clusters".into(), json!(clusters.len()));
        report.insert(
            "cluster_sizes".into(),
            json!({
                "min": sizes.iter().copied().reduce(f64::min).unwrap_or(0.0),
                "max": sizes.iter().copied().reduce(f64::max).unwrap_or(0.0),
                "mean": mean(&sizes).unwrap_or(0.0),
            }),
        );
        report.insert("mean_intra_cluster_similarity".into(), json!(mean(&intra)));
        report.insert("clusters".into(), Value::Array(per_cluster));
        Ok(report)
    }
}

/// Candidate and match counts for a batch of query values
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchStats;

struct ValueStats {
    candidates: usize,
    matched_tags: Vec<String>,
    best_score: Option<f32>,
}

impl ValueStats {
    fn from_scorings(scorings: &[Scoring]) -> Self {
        Self {
            candidates: scorings.len(),
            matched_tags: scorings
                .iter()
                .filter(|s| s.is_match)
                .map(|s| s.scored_tag.clone())
                .collect(),
            best_score: scorings
                .iter()
                .map(|s| s.similarity_score)
                .reduce(f32::max),
        }
    }
}

impl MatchEvaluator for MatchStats {
    fn evaluate_matches(&self, view: &EngineView<'_>, values: &[QueryInfo]) -> Result<Report> {
        let stats = values
            .par_iter()
            .map(|query| view.scorings_for(query).map(|s| ValueStats::from_scorings(&s)))
            .collect::<Result<Vec<_>>>()?;

        let candidates: Vec<f64> = stats.iter().map(|s| s.candidates as f64).collect();
        let matches: Vec<f64> = stats.iter().map(|s| s.matched_tags.len() as f64).collect();
        let best: Vec<f64> = stats
            .iter()
            .filter_map(|s| s.best_score.map(f64::from))
            .collect();

        let by_value: Vec<Value> = stats
            .iter()
            .enumerate()
            .map(|(index, s)| {
                json!({
                    "index": index,
                    "candidates": s.candidates,
                    "matches": s.matched_tags.len(),
                    "best_score": s.best_score,
                    "matched_tags": s.matched_tags,
                })
            })
            .collect();

        let mut report = Report::new();
        report.insert("num_values".into(), json!(values.len()));
        report.insert(
            "values_with_matches".into(),
            json!(stats.iter().filter(|s| !s.matched_tags.is_empty()).count()),
        );
        report.insert("mean_candidates".into(), json!(mean(&candidates).unwrap_or(0.0)));
        report.insert("mean_matches".into(), json!(mean(&matches).unwrap_or(0.0)));
        report.insert("mean_best_score".into(), json!(mean(&best)));
        report.insert("scoring_calculator".into(), view.scoring_calculator().describe());
        report.insert(BY_VALUE_KEY.into(), Value::Array(by_value));
        Ok(report)
    }
}
