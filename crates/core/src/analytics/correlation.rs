//! Pairwise correlation across metric series

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Unordered pair of metric ids, stored in sorted order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricPair {
    first: String,
    second: String,
}

impl MetricPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Key used when the matrix is serialized, e.g. "cpu_memory"
    pub fn key(&self) -> String {
        format!("{}_{}", self.first, self.second)
    }
}

/// Correlation coefficients keyed by unordered metric pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    coefficients: BTreeMap<MetricPair, f64>,
}

impl CorrelationMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: MetricPair, coefficient: f64) {
        self.coefficients.insert(pair, coefficient);
    }

    /// Coefficient for `a` and `b` in either order
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.coefficients.get(&MetricPair::new(a, b)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricPair, f64)> {
        self.coefficients.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.coefficients.len()))?;
        for (pair, coefficient) in &self.coefficients {
            map.serialize_entry(&pair.key(), coefficient)?;
        }
        map.end()
    }
}

/// Every unordered pair of distinct ids from an already deduplicated list
pub fn unordered_pairs(ids: &[String]) -> Vec<MetricPair> {
    let mut pairs = Vec::new();
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            pairs.push(MetricPair::new(a.clone(), b.clone()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(MetricPair::new("b", "a"), MetricPair::new("a", "b"));
        assert_eq!(MetricPair::new("b", "a").key(), "a_b");
    }

    #[test]
    fn test_matrix_lookup_either_order() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert(MetricPair::new("memory", "cpu"), 0.75);
        assert_eq!(matrix.get("cpu", "memory"), Some(0.75));
        assert_eq!(matrix.get("memory", "cpu"), Some(0.75));
        assert_eq!(matrix.get("cpu", "disk"), None);
    }

    #[test]
    fn test_unordered_pairs_count() {
        let ids: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let pairs = unordered_pairs(&ids);
        assert_eq!(pairs.len(), 6);
        assert!(unordered_pairs(&ids[..1]).is_empty());
    }

    #[test]
    fn test_matrix_serializes_as_map() {
        let mut matrix = CorrelationMatrix::new();
        matrix.insert(MetricPair::new("cpu", "memory"), -0.5);
        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["cpu_memory"], -0.5);
    }
}
