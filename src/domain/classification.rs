// ============================================================
// Layer 3 — Classifications
// ============================================================
// Result of one prediction: a probability per class, stored in
// label-set order. Ranking is a view (best / top_k) and never
// reorders the stored vectors.
//
// JSON form returned to clients:
//   {"classNames": ["apple", "banana"], "probabilities": [0.9, 0.1]}

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classifications {
    class_names:   Vec<String>,
    probabilities: Vec<f32>,
}

/// One (label, probability) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification<'a> {
    pub label:       &'a str,
    pub probability: f32,
}

impl Classifications {
    /// Callers guarantee equal lengths; the postprocessor checks it.
    pub(crate) fn new(class_names: Vec<String>, probabilities: Vec<f32>) -> Self {
        debug_assert_eq!(class_names.len(), probabilities.len());
        Self { class_names, probabilities }
    }

    pub fn len(&self) -> usize {
        self.class_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_names.is_empty()
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// Pairs in label-set order.
    pub fn items(&self) -> impl Iterator<Item = Classification<'_>> {
        self.class_names
            .iter()
            .zip(&self.probabilities)
            .map(|(label, &probability)| Classification { label, probability })
    }

    /// The k most probable pairs, highest first. Ties keep label order.
    pub fn top_k(&self, k: usize) -> Vec<Classification<'_>> {
        let mut ranked: Vec<_> = self.items().collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        ranked.truncate(k);
        ranked
    }

    pub fn best(&self) -> Option<Classification<'_>> {
        self.top_k(1).into_iter().next()
    }

    pub fn to_json(&self) -> String {
        // Vec<String>/Vec<f32> serialisation cannot fail; NaN becomes null.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Classifications {
    /// `[apple: 0.91230, banana: 0.08770]`, top five, highest first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let top: Vec<String> = self
            .top_k(5)
            .iter()
            .map(|c| format!("{}: {:.5}", c.label, c.probability))
            .collect();
        write!(f, "[{}]", top.join(", "))
    }
}
