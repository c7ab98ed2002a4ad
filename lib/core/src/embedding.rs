use serde::{Deserialize, Serialize};

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Embedding {
    data: Vec<f32>,
}

impl Embedding {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// True when every component is a finite number
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Dot product; callers check dimensions first
    #[inline]
    pub fn dot(&self, other: &Embedding) -> f32 {
        dot_product(&self.data, &other.data)
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        dot_product(&self.data, &self.data).sqrt()
    }

    /// Compute cosine similarity with another embedding.
    /// Returns 0.0 for mismatched dimensions or zero-norm inputs.
    #[inline]
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.dim() != other.dim() {
            return 0.0;
        }

        let norm_a = self.norm();
        let norm_b = other.norm();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        self.dot(other) / (norm_a * norm_b)
    }

    /// Compute L2 (Euclidean) distance
    #[inline]
    pub fn l2_distance(&self, other: &Embedding) -> f32 {
        if self.dim() != other.dim() {
            return f32::INFINITY;
        }

        let mut sum0 = 0.0f32;
        let mut sum1 = 0.0f32;
        let chunks = self.data.len() / 2;
        for i in 0..chunks {
            let d0 = self.data[2 * i] - other.data[2 * i];
            let d1 = self.data[2 * i + 1] - other.data[2 * i + 1];
            sum0 += d0 * d0;
            sum1 += d1 * d1;
        }
        if self.data.len() % 2 == 1 {
            let last = self.data.len() - 1;
            let d = self.data[last] - other.data[last];
            sum0 += d * d;
        }
        (sum0 + sum1).sqrt()
    }

    /// Point on the segment from `self` towards `target`, `t` in [0, 1]
    #[must_use]
    pub fn lerp(&self, target: &Embedding, t: f32) -> Embedding {
        Embedding::new(
            self.data
                .iter()
                .zip(target.data.iter())
                .map(|(a, b)| a + (b - a) * t)
                .collect(),
        )
    }
}

/// Scalar dot product with two accumulators for better pipelining
#[inline]
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len().min(b.len());
    let mut sum0 = 0.0f32;
    let mut sum1 = 0.0f32;
    let mut i = 0;
    while i + 1 < len {
        sum0 += a[i] * b[i];
        sum1 += a[i + 1] * b[i + 1];
        i += 2;
    }
    if i < len {
        sum0 += a[i] * b[i];
    }
    sum0 + sum1
}

impl From<Vec<f32>> for Embedding {
    fn from(data: Vec<f32>) -> Self {
        Embedding::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let v1 = Embedding::new(vec![1.0, 0.0]);
        let v2 = Embedding::new(vec![1.0, 0.0]);
        assert!((v1.cosine_similarity(&v2) - 1.0).abs() < 1e-6);

        let v3 = Embedding::new(vec![1.0, 0.0]);
        let v4 = Embedding::new(vec![0.0, 1.0]);
        assert!((v3.cosine_similarity(&v4) - 0.0).abs() < 1e-6);

        let zero = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(zero.cosine_similarity(&v1), 0.0);
    }

    #[test]
    fn test_l2_distance() {
        let v1 = Embedding::new(vec![0.0, 0.0]);
        let v2 = Embedding::new(vec![3.0, 4.0]);
        assert!((v1.l2_distance(&v2) - 5.0).abs() < 1e-6);

        let odd_a = Embedding::new(vec![1.0, 2.0, 3.0]);
        let odd_b = Embedding::new(vec![1.0, 2.0, 5.0]);
        assert!((odd_a.l2_distance(&odd_b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_moves_along_segment() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![4.0, 2.0]);
        assert_eq!(a.lerp(&b, 0.5).as_slice(), &[2.0, 1.0]);
        assert_eq!(a.lerp(&b, 0.0), a);
    }

    #[test]
    fn test_serializes_as_flat_sequence() {
        let v = Embedding::new(vec![1.0, 2.5]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,2.5]");
    }
}
