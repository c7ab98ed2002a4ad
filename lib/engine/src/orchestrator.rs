use crate::config::EngineConfig;
use crate::evaluate::{
    ClusterEvaluator, ClusterStats, MatchEvaluator, MatchStats, Report, BY_VALUE_KEY,
    MATCHES_RESULTS_KEY,
};
use crate::operation::{
    EntityInfo, EvaluateMatchesInfo, ItemOutcome, Operation, OperationOutput, QueryInfo,
    SkipReason,
};
use crate::store::{EntityStore, StoreSnapshot};
use crate::view::EngineView;
use matchx_cluster::ClusterIndex;
use matchx_core::{
    Error, Instance, Result, Scoring, ScoringCalculator, Transformer, TransformerRegistry,
};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Span};

/// Item after transformation, before it touches the store
enum Prepared {
    Ready(String, Instance),
    Skipped(String, SkipReason),
}

/// Dispatches [`Operation`]s against an entity store.
///
/// Mutating operations hold the store's write lock for their whole batch;
/// queries and evaluations hold one read lock, so they see either all or
/// none of a concurrent mutation.
pub struct Orchestrator {
    transformers: TransformerRegistry,
    scoring: ScoringCalculator,
    store: RwLock<EntityStore>,
    cluster_evaluator: Box<dyn ClusterEvaluator>,
    match_evaluator: Box<dyn MatchEvaluator>,
    span: Span,
}

pub struct OrchestratorBuilder {
    index: Box<dyn ClusterIndex>,
    transformers: TransformerRegistry,
    scoring: ScoringCalculator,
    cluster_evaluator: Box<dyn ClusterEvaluator>,
    match_evaluator: Box<dyn MatchEvaluator>,
    span: Option<Span>,
}

impl OrchestratorBuilder {
    pub fn transformer(mut self, key: impl Into<String>, transformer: Transformer) -> Self {
        self.transformers.register(key, transformer);
        self
    }

    pub fn transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = transformers;
        self
    }

    pub fn scoring(mut self, scoring: ScoringCalculator) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn cluster_evaluator(mut self, evaluator: impl ClusterEvaluator + 'static) -> Self {
        self.cluster_evaluator = Box::new(evaluator);
        self
    }

    pub fn match_evaluator(mut self, evaluator: impl MatchEvaluator + 'static) -> Self {
        self.match_evaluator = Box::new(evaluator);
        self
    }

    /// Span every operation's events are recorded under
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Orchestrator {
        let span = self.span.unwrap_or_else(|| info_span!("orchestrator"));
        span.in_scope(|| {
            info!(
                transformers = self.transformers.len(),
                threshold = self.scoring.threshold(),
                metric = self.scoring.metric().name(),
                "orchestrator ready"
            );
        });

        Orchestrator {
            transformers: self.transformers,
            scoring: self.scoring,
            store: RwLock::new(EntityStore::new(self.index)),
            cluster_evaluator: self.cluster_evaluator,
            match_evaluator: self.match_evaluator,
            span,
        }
    }
}

impl Orchestrator {
    pub fn builder(index: Box<dyn ClusterIndex>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            index,
            transformers: TransformerRegistry::new(),
            scoring: ScoringCalculator::default(),
            cluster_evaluator: Box::new(ClusterStats),
            match_evaluator: Box::new(MatchStats),
            span: None,
        }
    }

    pub fn new(index: Box<dyn ClusterIndex>) -> Self {
        Self::builder(index).build()
    }

    /// Builder preloaded with the configured index, transformers and scoring
    pub fn builder_from_config(config: &EngineConfig) -> Result<OrchestratorBuilder> {
        config.validate()?;
        let transformers = config
            .transformers
            .iter()
            .map(|(key, transformer)| (key.clone(), *transformer))
            .collect();

        Ok(Self::builder(config.cluster_index.build())
            .transformers(transformers)
            .scoring(config.scoring.calculator()))
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::builder_from_config(config)?.build())
    }

    /// Execute one operation
    pub fn on_operation(&self, operation: Operation) -> Result<OperationOutput> {
        self.span.in_scope(|| {
            let kind = operation.kind();
            debug!(operation = %kind, "dispatching operation");

            let output = match operation {
                Operation::Add(items) => self.add(items).map(OperationOutput::Added),
                Operation::Update(items) => self.update(items).map(OperationOutput::Updated),
                Operation::Remove(tags) => self.remove(tags).map(OperationOutput::Removed),
                Operation::CalculateScores(query) => {
                    self.calculate_scores(&query).map(OperationOutput::Scores)
                }
                Operation::CalculateMatches(query) => {
                    self.calculate_matches(&query).map(OperationOutput::Matches)
                }
                Operation::EvaluateClusters => {
                    self.evaluate_clusters().map(OperationOutput::Report)
                }
                Operation::EvaluateMatches(info) => {
                    self.evaluate_matches(&info).map(OperationOutput::Report)
                }
                Operation::EvaluateClustersAndMatches(info) => self
                    .evaluate_clusters_and_matches(&info)
                    .map(OperationOutput::Report),
            };

            if let Err(e) = &output {
                warn!(operation = %kind, error = %e, "operation failed");
            }
            output
        })
    }

    /// Transform every item before the first write, so a precondition
    /// violation aborts the batch with nothing applied
    fn prepare(&self, items: Vec<EntityInfo>) -> Result<Vec<Prepared>> {
        items
            .into_iter()
            .map(|item| {
                match self
                    .transformers
                    .transform(item.transformer_key.as_deref(), item.value)
                {
                    Ok(instance) => Ok(Prepared::Ready(item.tag, instance)),
                    Err(Error::UnknownTransformer(key)) => {
                        warn!(
                            tag = %item.tag,
                            transformer_key = %key,
                            "no transformer registered, item dropped"
                        );
                        Ok(Prepared::Skipped(item.tag, SkipReason::UnknownTransformer(key)))
                    }
                    Err(e) => Err(e),
                }
            })
            .collect()
    }

    /// Insert or replace entities. If any write fails, the writes already
    /// made by this batch are undone and the error is returned.
    pub fn add(&self, items: Vec<EntityInfo>) -> Result<Vec<ItemOutcome>> {
        let prepared = self.prepare(items)?;
        let mut store = self.store.write();

        store.batch(|batch| {
            let mut outcomes = Vec::with_capacity(prepared.len());
            for item in prepared {
                match item {
                    Prepared::Ready(tag, instance) => {
                        batch.upsert(&tag, instance)?;
                        outcomes.push(ItemOutcome::applied(tag));
                    }
                    Prepared::Skipped(tag, reason) => {
                        outcomes.push(ItemOutcome::skipped(tag, reason));
                    }
                }
            }
            Ok(outcomes)
        })
    }

    /// Replace existing entities in order. Stops at the first tag that is
    /// not stored and returns `false`; items before it stay applied. A
    /// failed write undoes the whole batch.
    pub fn update(&self, items: Vec<EntityInfo>) -> Result<bool> {
        let prepared = self.prepare(items)?;
        let mut store = self.store.write();

        store.batch(|batch| {
            for item in prepared {
                if let Prepared::Ready(tag, instance) = item {
                    if !batch.replace(&tag, instance)? {
                        warn!(tag = %tag, "update of unknown tag, batch stopped");
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        })
    }

    /// Remove entities. Tags that are not stored are reported as skipped.
    /// A failed write undoes the whole batch.
    pub fn remove(&self, tags: Vec<String>) -> Result<Vec<ItemOutcome>> {
        let mut store = self.store.write();

        store.batch(|batch| {
            let mut outcomes = Vec::with_capacity(tags.len());
            for tag in tags {
                if batch.remove(&tag)? {
                    outcomes.push(ItemOutcome::applied(tag));
                } else {
                    warn!(tag = %tag, "remove of unknown tag skipped");
                    outcomes.push(ItemOutcome::skipped(tag, SkipReason::UnknownTag));
                }
            }
            Ok(outcomes)
        })
    }

    fn view<'a>(&'a self, store: &'a EntityStore) -> EngineView<'a> {
        EngineView::new(store, &self.transformers, &self.scoring)
    }

    pub fn calculate_scores(&self, query: &QueryInfo) -> Result<Vec<Scoring>> {
        let store = self.store.read();
        self.view(&store).scorings_for(query)
    }

    pub fn calculate_matches(&self, query: &QueryInfo) -> Result<Vec<Scoring>> {
        let store = self.store.read();
        self.view(&store).matches_for(query)
    }

    /// Score a query against explicitly named tags, bypassing the index
    pub fn score_against_tags(&self, query: &QueryInfo, tags: &[String]) -> Result<Vec<Scoring>> {
        let store = self.store.read();
        self.view(&store).score_against_tags(query, tags)
    }

    pub fn evaluate_clusters(&self) -> Result<Report> {
        let store = self.store.read();
        self.cluster_evaluator.evaluate_clusters(&self.view(&store))
    }

    pub fn evaluate_matches(&self, info: &EvaluateMatchesInfo) -> Result<Report> {
        let store = self.store.read();
        self.match_report(&self.view(&store), info)
    }

    pub fn evaluate_clusters_and_matches(&self, info: &EvaluateMatchesInfo) -> Result<Report> {
        let store = self.store.read();
        let view = self.view(&store);

        let mut report = self.cluster_evaluator.evaluate_clusters(&view)?;
        let matches = self.match_report(&view, info)?;
        report.insert(MATCHES_RESULTS_KEY.to_string(), Value::Object(matches));
        Ok(report)
    }

    fn match_report(&self, view: &EngineView<'_>, info: &EvaluateMatchesInfo) -> Result<Report> {
        let mut report = self.match_evaluator.evaluate_matches(view, &info.values)?;
        if !info.fetch_instance {
            report.remove(BY_VALUE_KEY);
        }
        Ok(report)
    }

    pub fn get(&self, tag: &str) -> Option<Instance> {
        self.store.read().get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.store.read().contains(tag)
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    pub fn tags(&self) -> Vec<String> {
        self.store.read().tags()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.read().snapshot()
    }

    pub fn scoring_calculator(&self) -> &ScoringCalculator {
        &self.scoring
    }

    pub fn describe(&self) -> Value {
        let transformers: serde_json::Map<String, Value> = self
            .transformers
            .keys()
            .into_iter()
            .filter_map(|key| {
                self.transformers
                    .get(key)
                    .map(|t| (key.to_string(), json!(t.name())))
            })
            .collect();

        json!({
            "transformers": transformers,
            "scoring_calculator": self.scoring,
            "cluster_index": self.store.read().index().describe(),
        })
    }
}
