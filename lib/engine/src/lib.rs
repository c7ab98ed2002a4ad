//! # matchx Engine
//!
//! The operation dispatcher of matchx. An [`Orchestrator`] owns the entity
//! store (tag → [`Instance`](matchx_core::Instance)) together with its cluster
//! index, and answers a closed set of [`Operation`]s:
//!
//! - `ADD` / `UPDATE` / `REMOVE` mutate the store and the index together
//! - `CALCULATE_SCORES` / `CALCULATE_MATCHES` score a value against the
//!   entities of its predicted cluster
//! - `EVALUATE_*` delegate to pluggable quality reports
//!
//! ## Example
//!
//! ```rust
//! use matchx_cluster::EcmIndex;
//! use matchx_engine::{Operation, Orchestrator};
//!
//! let engine = Orchestrator::new(Box::new(EcmIndex::with_threshold(2.0)));
//! engine.on_operation(Operation::add("1", vec![1.0, 1.0])).unwrap();
//! engine.on_operation(Operation::add("2", vec![1.0, 2.0])).unwrap();
//!
//! let matches = engine
//!     .on_operation(Operation::calculate_matches(vec![2.0, 2.0]))
//!     .unwrap()
//!     .into_scorings()
//!     .unwrap();
//! assert_eq!(matches.len(), 2);
//! ```

pub mod config;
pub mod evaluate;
pub mod operation;
pub mod orchestrator;
pub mod store;
pub mod view;

pub use config::{EngineConfig, ScoringConfig};
pub use evaluate::{
    ClusterEvaluator, ClusterStats, MatchEvaluator, MatchStats, Report, BY_VALUE_KEY,
    MATCHES_RESULTS_KEY,
};
pub use operation::{
    EntityInfo, EvaluateMatchesInfo, ItemOutcome, ItemStatus, Operation, OperationOutput,
    OperationType, QueryInfo, SkipReason,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use store::{Batch, EntityStore, StoreSnapshot};
pub use view::EngineView;
