//! The command protocol accepted by [`Orchestrator::on_operation`].
//!
//! On the wire an operation is `{"type": "<OPERATION_TYPE>", "info": <payload>}`.
//!
//! [`Orchestrator::on_operation`]: crate::Orchestrator::on_operation

use crate::evaluate::Report;
use matchx_core::{RawValue, Scoring};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Add,
    Remove,
    Update,
    CalculateScores,
    CalculateMatches,
    EvaluateClusters,
    EvaluateMatches,
    EvaluateClustersAndMatches,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Add => "ADD",
            OperationType::Remove => "REMOVE",
            OperationType::Update => "UPDATE",
            OperationType::CalculateScores => "CALCULATE_SCORES",
            OperationType::CalculateMatches => "CALCULATE_MATCHES",
            OperationType::EvaluateClusters => "EVALUATE_CLUSTERS",
            OperationType::EvaluateMatches => "EVALUATE_MATCHES",
            OperationType::EvaluateClustersAndMatches => "EVALUATE_CLUSTERS_AND_MATCHES",
        }
    }

    /// ADD, UPDATE and REMOVE change the store; everything else only reads it
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            OperationType::Add | OperationType::Remove | OperationType::Update
        )
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entity to add or update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityInfo {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer_key: Option<String>,
    pub value: RawValue,
}

impl EntityInfo {
    pub fn new(tag: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self {
            tag: tag.into(),
            transformer_key: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, key: impl Into<String>) -> Self {
        self.transformer_key = Some(key.into());
        self
    }
}

/// A value to score against the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer_key: Option<String>,
    pub value: RawValue,
}

impl QueryInfo {
    pub fn new(value: impl Into<RawValue>) -> Self {
        Self {
            transformer_key: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, key: impl Into<String>) -> Self {
        self.transformer_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluateMatchesInfo {
    pub values: Vec<QueryInfo>,
    /// Keep the per-value breakdown in the report
    #[serde(default)]
    pub fetch_instance: bool,
}

impl EvaluateMatchesInfo {
    pub fn new(values: Vec<QueryInfo>, fetch_instance: bool) -> Self {
        Self {
            values,
            fetch_instance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "info", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add(Vec<EntityInfo>),
    Remove(Vec<String>),
    Update(Vec<EntityInfo>),
    CalculateScores(QueryInfo),
    CalculateMatches(QueryInfo),
    EvaluateClusters,
    EvaluateMatches(EvaluateMatchesInfo),
    EvaluateClustersAndMatches(EvaluateMatchesInfo),
}

impl Operation {
    pub fn add(tag: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Operation::Add(vec![EntityInfo::new(tag, value)])
    }

    pub fn update(tag: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Operation::Update(vec![EntityInfo::new(tag, value)])
    }

    pub fn remove(tag: impl Into<String>) -> Self {
        Operation::Remove(vec![tag.into()])
    }

    pub fn calculate_scores(value: impl Into<RawValue>) -> Self {
        Operation::CalculateScores(QueryInfo::new(value))
    }

    pub fn calculate_matches(value: impl Into<RawValue>) -> Self {
        Operation::CalculateMatches(QueryInfo::new(value))
    }

    pub fn kind(&self) -> OperationType {
        match self {
            Operation::Add(_) => OperationType::Add,
            Operation::Remove(_) => OperationType::Remove,
            Operation::Update(_) => OperationType::Update,
            Operation::CalculateScores(_) => OperationType::CalculateScores,
            Operation::CalculateMatches(_) => OperationType::CalculateMatches,
            Operation::EvaluateClusters => OperationType::EvaluateClusters,
            Operation::EvaluateMatches(_) => OperationType::EvaluateMatches,
            Operation::EvaluateClustersAndMatches(_) => OperationType::EvaluateClustersAndMatches,
        }
    }
}

/// Why a batch item was not applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownTransformer(String),
    UnknownTag,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Applied,
    Skipped(SkipReason),
}

/// Per-item result of a batch mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemOutcome {
    pub tag: String,
    pub status: ItemStatus,
}

impl ItemOutcome {
    pub fn applied(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            status: ItemStatus::Applied,
        }
    }

    pub fn skipped(tag: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            tag: tag.into(),
            status: ItemStatus::Skipped(reason),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.status == ItemStatus::Applied
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum OperationOutput {
    Added(Vec<ItemOutcome>),
    Updated(bool),
    Removed(Vec<ItemOutcome>),
    Scores(Vec<Scoring>),
    Matches(Vec<Scoring>),
    Report(Report),
}

impl OperationOutput {
    pub fn outcomes(&self) -> Option<&[ItemOutcome]> {
        match self {
            OperationOutput::Added(outcomes) | OperationOutput::Removed(outcomes) => {
                Some(outcomes)
            }
            _ => None,
        }
    }

    pub fn updated(&self) -> Option<bool> {
        match self {
            OperationOutput::Updated(success) => Some(*success),
            _ => None,
        }
    }

    pub fn into_scorings(self) -> Option<Vec<Scoring>> {
        match self {
            OperationOutput::Scores(scorings) | OperationOutput::Matches(scorings) => {
                Some(scorings)
            }
            _ => None,
        }
    }

    pub fn into_report(self) -> Option<Report> {
        match self {
            OperationOutput::Report(report) => Some(report),
            _ => None,
        }
    }
}
