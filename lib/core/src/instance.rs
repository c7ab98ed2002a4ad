use crate::embedding::Embedding;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A domain value paired with the embedding derived from it.
///
/// Instances are immutable: replacing an entity means building a new
/// `Instance` and swapping it in wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance<T = Value> {
    value: T,
    embedding: Embedding,
}

impl<T> Instance<T> {
    #[inline]
    #[must_use]
    pub fn new(value: T, embedding: Embedding) -> Self {
        Self { value, embedding }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }
}

impl Instance<Value> {
    /// Instance whose value is the embedding itself, rendered as a JSON array
    #[must_use]
    pub fn from_vector(data: Vec<f32>) -> Self {
        let value = Value::from(data.clone());
        Self::new(value, Embedding::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_vector_mirrors_value() {
        let instance = Instance::from_vector(vec![1.0, 2.0]);
        assert_eq!(instance.value(), &json!([1.0, 2.0]));
        assert_eq!(instance.embedding().as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_deserialize_from_object() {
        let instance: Instance = serde_json::from_value(json!({
            "value": {"name": "alice"},
            "embedding": [0.5, 0.25]
        }))
        .unwrap();
        assert_eq!(instance.value()["name"], "alice");
        assert_eq!(instance.embedding().dim(), 2);
    }
}
