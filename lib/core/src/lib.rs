//! # matchx Core
//!
//! Core library for the matchx entity-matching engine.
//!
//! This crate provides the value types every other matchx crate builds on:
//!
//! - [`Embedding`] - Dense vector with similarity kernels
//! - [`Instance`] - A domain value paired with its embedding
//! - [`Transformer`] - Turns a [`RawValue`] into an [`Instance`]
//! - [`ScoringCalculator`] - Similarity score plus match decision
//!
//! ## Example
//!
//! ```rust
//! use matchx_core::{ScoringCalculator, Transformer};
//!
//! let stored = Transformer::Vector.transform(vec![1.0, 1.0].into()).unwrap();
//! let query = Transformer::Vector.transform(vec![2.0, 2.0].into()).unwrap();
//!
//! let calculator = ScoringCalculator::with_threshold(0.5);
//! let scoring = calculator.score(&query, "stored", &stored).unwrap();
//! assert!(scoring.is_match);
//! ```

pub mod embedding;
pub mod error;
pub mod instance;
pub mod scoring;
pub mod transformer;

pub use embedding::Embedding;
pub use error::{Error, Result};
pub use instance::Instance;
pub use scoring::{Scoring, ScoringCalculator, ScoringOptions, SimilarityMetric};
pub use transformer::{RawValue, Transformer, TransformerRegistry};
