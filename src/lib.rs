//! # matchx
//!
//! An incremental, embedding-based entity matching engine.
//!
//! matchx keeps a live collection of tagged entities, each represented by a
//! numeric embedding. New values are matched against existing entities by
//! similarity, restricted to the cluster the value would join instead of a
//! full scan.
//!
//! ## Quick Start
//!
//! ### As a Library
//!
//! ```rust
//! use matchx::prelude::*;
//!
//! let engine = Orchestrator::builder(Box::new(EcmIndex::with_threshold(2.0)))
//!     .scoring(ScoringCalculator::with_threshold(0.5))
//!     .build();
//!
//! for (tag, y) in [("1", 1.0), ("2", 2.0), ("3", 3.0), ("4", 4.0)] {
//!     engine.on_operation(Operation::add(tag, vec![1.0, y])).unwrap();
//! }
//!
//! let scores = engine
//!     .on_operation(Operation::calculate_scores(vec![2.0, 2.0]))
//!     .unwrap()
//!     .into_scorings()
//!     .unwrap();
//! assert!(!scores.is_empty());
//! ```
//!
//! ### Replaying an Operation Log
//!
//! ```bash
//! matchx --config engine.json --operations ops.json
//! ```
//!
//! ## Crate Structure
//!
//! - [`matchx-core`](https://docs.rs/matchx-core) - Embeddings, instances, transformers, scoring
//! - [`matchx-cluster`](https://docs.rs/matchx-cluster) - Cluster indexes (ECM, flat)
//! - [`matchx-engine`](https://docs.rs/matchx-engine) - Operation protocol and orchestrator

// Re-export core types
pub use matchx_core::{
    Embedding, Instance, RawValue, Transformer, TransformerRegistry,
    Scoring, ScoringCalculator, ScoringOptions, SimilarityMetric,
    Error, Result,
};

// Re-export cluster indexes
pub use matchx_cluster::{
    ClusterId, ClusterIndex, ClusterSummary, EcmConfig, EcmIndex, FlatIndex, IndexConfig,
};

// Re-export engine
pub use matchx_engine::{
    Orchestrator, OrchestratorBuilder, EngineConfig, EngineView,
    Operation, OperationType, OperationOutput, EntityInfo, QueryInfo, EvaluateMatchesInfo,
    ItemOutcome, ItemStatus, SkipReason,
    ClusterEvaluator, MatchEvaluator, ClusterStats, MatchStats, Report,
    Batch, EntityStore, StoreSnapshot, BY_VALUE_KEY, MATCHES_RESULTS_KEY,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Embedding, Instance, RawValue, Transformer,
        Scoring, ScoringCalculator, ScoringOptions, SimilarityMetric,
        Error, Result,
        ClusterIndex, EcmIndex, FlatIndex,
        Orchestrator, EngineConfig,
        Operation, OperationOutput, EntityInfo, QueryInfo, EvaluateMatchesInfo,
    };
}
