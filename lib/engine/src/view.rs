use crate::operation::QueryInfo;
use crate::store::EntityStore;
use matchx_cluster::ClusterSummary;
use matchx_core::{
    Error, Instance, RawValue, Result, Scoring, ScoringCalculator, TransformerRegistry,
};
use tracing::warn;

/// Read-only view over the engine for one operation.
///
/// The orchestrator builds a view while holding the store's read lock, so
/// everything read through it comes from a single consistent state.
#[derive(Clone, Copy)]
pub struct EngineView<'a> {
    store: &'a EntityStore,
    transformers: &'a TransformerRegistry,
    scoring: &'a ScoringCalculator,
}

impl<'a> EngineView<'a> {
    pub(crate) fn new(
        store: &'a EntityStore,
        transformers: &'a TransformerRegistry,
        scoring: &'a ScoringCalculator,
    ) -> Self {
        Self {
            store,
            transformers,
            scoring,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    pub fn tags(&self) -> Vec<String> {
        self.store.tags()
    }

    pub fn instance(&self, tag: &str) -> Option<&'a Instance> {
        self.store.get(tag)
    }

    pub fn clusters(&self) -> Vec<ClusterSummary> {
        self.store.clusters()
    }

    pub fn scoring_calculator(&self) -> &'a ScoringCalculator {
        self.scoring
    }

    /// Build the query instance. An unregistered transformer key is logged
    /// and yields `None`.
    pub fn build_query(
        &self,
        transformer_key: Option<&str>,
        value: RawValue,
    ) -> Result<Option<Instance>> {
        match self.transformers.transform(transformer_key, value) {
            Ok(instance) => Ok(Some(instance)),
            Err(Error::UnknownTransformer(key)) => {
                warn!(transformer_key = %key, "no transformer registered, query dropped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Score `instance` against every stored entity of its predicted cluster
    pub fn scorings_for_instance(&self, instance: &Instance) -> Result<Vec<Scoring>> {
        self.store
            .candidates(instance.embedding())?
            .into_iter()
            .map(|(tag, stored)| self.scoring.score(instance, &tag, stored))
            .collect()
    }

    pub fn scorings_for(&self, query: &QueryInfo) -> Result<Vec<Scoring>> {
        match self.build_query(query.transformer_key.as_deref(), query.value.clone())? {
            Some(instance) => self.scorings_for_instance(&instance),
            None => Ok(Vec::new()),
        }
    }

    pub fn matches_for(&self, query: &QueryInfo) -> Result<Vec<Scoring>> {
        let mut scorings = self.scorings_for(query)?;
        scorings.retain(|s| s.is_match);
        Ok(scorings)
    }

    /// Score a query against an explicit list of tags; tags not in the
    /// store are skipped
    pub fn score_against_tags(&self, query: &QueryInfo, tags: &[String]) -> Result<Vec<Scoring>> {
        let Some(instance) =
            self.build_query(query.transformer_key.as_deref(), query.value.clone())?
        else {
            return Ok(Vec::new());
        };

        tags.iter()
            .filter_map(|tag| self.store.get(tag).map(|stored| (tag, stored)))
            .map(|(tag, stored)| self.scoring.score(&instance, tag, stored))
            .collect()
    }
}
