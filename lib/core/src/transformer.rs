//! Conversion of raw values into [`Instance`]s.
//!
//! The set of transformers is closed: callers either hand over a ready
//! numeric vector, or an instance whose embedding was computed upstream.

use crate::{Error, Instance, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw value submitted with an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    /// Plain numeric vector
    Vector(Vec<f32>),
    /// Pre-built instance (value + embedding)
    Instance(Instance),
}

impl From<Vec<f32>> for RawValue {
    fn from(v: Vec<f32>) -> Self {
        RawValue::Vector(v)
    }
}

impl From<Instance> for RawValue {
    fn from(instance: Instance) -> Self {
        RawValue::Instance(instance)
    }
}

impl RawValue {
    fn shape(&self) -> &'static str {
        match self {
            RawValue::Vector(_) => "vector",
            RawValue::Instance(_) => "instance",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transformer {
    /// Embedding equals the raw vector
    #[default]
    Vector,
    /// Validates and passes through an existing instance
    Identity,
}

impl Transformer {
    pub fn transform(&self, raw: RawValue) -> Result<Instance> {
        match (self, raw) {
            (Transformer::Vector, RawValue::Vector(data)) => {
                if data.is_empty() {
                    return Err(Error::PreconditionViolation(
                        "vector transformer received an empty vector".to_string(),
                    ));
                }
                if data.iter().any(|x| !x.is_finite()) {
                    return Err(Error::PreconditionViolation(
                        "vector transformer received non-finite components".to_string(),
                    ));
                }
                Ok(Instance::from_vector(data))
            }
            (Transformer::Identity, RawValue::Instance(instance)) => {
                if instance.value() == &Value::Null && instance.embedding().is_empty() {
                    return Err(Error::PreconditionViolation(
                        "identity transformer received an instance without value or embedding"
                            .to_string(),
                    ));
                }
                if !instance.embedding().is_finite() {
                    return Err(Error::PreconditionViolation(
                        "identity transformer received non-finite embedding components"
                            .to_string(),
                    ));
                }
                Ok(instance)
            }
            (transformer, raw) => Err(Error::PreconditionViolation(format!(
                "{} transformer cannot accept a raw {}",
                transformer.name(),
                raw.shape()
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transformer::Vector => "vector",
            Transformer::Identity => "identity",
        }
    }
}

/// Transformers addressable by key.
///
/// An item submitted without a key uses [`Transformer::Vector`]; an item
/// naming a key that was never registered fails with
/// [`Error::UnknownTransformer`].
#[derive(Debug, Clone, Default)]
pub struct TransformerRegistry {
    transformers: AHashMap<String, Transformer>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, transformer: Transformer) {
        self.transformers.insert(key.into(), transformer);
    }

    pub fn get(&self, key: &str) -> Option<Transformer> {
        self.transformers.get(key).copied()
    }

    pub fn resolve(&self, key: Option<&str>) -> Result<Transformer> {
        match key {
            None => Ok(Transformer::Vector),
            Some(key) => self
                .get(key)
                .ok_or_else(|| Error::UnknownTransformer(key.to_string())),
        }
    }

    pub fn transform(&self, key: Option<&str>, raw: RawValue) -> Result<Instance> {
        self.resolve(key)?.transform(raw)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.transformers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl FromIterator<(String, Transformer)> for TransformerRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Transformer)>>(iter: I) -> Self {
        Self {
            transformers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Embedding;
    use serde_json::json;

    #[test]
    fn test_vector_transformer_mirrors_input() {
        let instance = Transformer::Vector.transform(vec![1.0, 3.0].into()).unwrap();
        assert_eq!(instance.embedding().as_slice(), &[1.0, 3.0]);
        assert_eq!(instance.value(), &json!([1.0, 3.0]));
    }

    #[test]
    fn test_identity_transformer_rejects_non_finite_embedding() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let instance = Instance::new(json!({"name": "x"}), Embedding::new(vec![bad, 0.0]));
            assert!(matches!(
                Transformer::Identity.transform(instance.into()),
                Err(Error::PreconditionViolation(_))
            ));
        }
    }

    #[test]
    fn test_overflowing_json_vector_is_rejected() {
        let raw: RawValue = serde_json::from_str("[1e39, 0]").unwrap();
        assert!(matches!(
            Transformer::Vector.transform(raw),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_vector_transformer_rejects_instance() {
        let raw = RawValue::Instance(Instance::from_vector(vec![1.0]));
        let err = Transformer::Vector.transform(raw).unwrap_err();
        assert!(matches!(err, Error::PreconditionViolation(_)));
    }

    #[test]
    fn test_vector_transformer_rejects_empty_and_nan() {
        assert!(Transformer::Vector.transform(RawValue::Vector(vec![])).is_err());
        assert!(Transformer::Vector
            .transform(RawValue::Vector(vec![1.0, f32::NAN]))
            .is_err());
    }

    #[test]
    fn test_identity_passes_instance_through() {
        let original = Instance::new(json!({"id": 7}), Embedding::new(vec![0.1, 0.2]));
        let out = Transformer::Identity
            .transform(RawValue::Instance(original.clone()))
            .unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn test_identity_rejects_hollow_instance() {
        let hollow = Instance::new(Value::Null, Embedding::new(vec![]));
        assert!(Transformer::Identity.transform(hollow.into()).is_err());
        assert!(Transformer::Identity.transform(vec![1.0].into()).is_err());
    }

    #[test]
    fn test_raw_value_untagged_decoding() {
        let v: RawValue = serde_json::from_value(json!([1, 2])).unwrap();
        assert_eq!(v, RawValue::Vector(vec![1.0, 2.0]));

        let i: RawValue =
            serde_json::from_value(json!({"value": "x", "embedding": [1.0]})).unwrap();
        assert!(matches!(i, RawValue::Instance(_)));
    }

    #[test]
    fn test_registry_resolution() {
        let mut registry = TransformerRegistry::new();
        registry.register("precomputed", Transformer::Identity);

        assert_eq!(registry.resolve(None).unwrap(), Transformer::Vector);
        assert_eq!(
            registry.resolve(Some("precomputed")).unwrap(),
            Transformer::Identity
        );
        assert!(matches!(
            registry.resolve(Some("missing")),
            Err(Error::UnknownTransformer(key)) if key == "missing"
        ));
        assert_eq!(registry.keys(), vec!["precomputed"]);
    }
}
