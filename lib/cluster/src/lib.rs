//! # matchx Cluster
//!
//! Cluster indexes bound the candidate set of a match query: instead of
//! scoring against every stored entity, the engine asks the index which
//! cluster a query embedding would join and scores only that cluster's tags.
//!
//! - [`ClusterIndex`] - The capability the engine depends on
//! - [`EcmIndex`] - Evolving Clustering Method with a distance threshold
//! - [`FlatIndex`] - A single cluster holding every tag
//!
//! ## Example
//!
//! ```rust
//! use matchx_cluster::{ClusterIndex, EcmIndex};
//! use matchx_core::Embedding;
//!
//! let mut index = EcmIndex::with_threshold(2.0);
//! index.ingest("1", &Embedding::new(vec![1.0, 1.0])).unwrap();
//! index.ingest("2", &Embedding::new(vec![1.0, 2.0])).unwrap();
//!
//! let cluster = index.predict(&Embedding::new(vec![2.0, 2.0])).unwrap();
//! assert_eq!(index.tags_in_cluster(cluster).unwrap().len(), 2);
//! ```

pub mod ecm;
pub mod flat;
pub mod index;

pub use ecm::{EcmConfig, EcmIndex};
pub use flat::FlatIndex;
pub use index::{ClusterId, ClusterIndex, ClusterSummary, IndexConfig};
pub use matchx_core::{Error, Result};
