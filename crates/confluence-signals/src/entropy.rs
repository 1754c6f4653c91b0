//! Structural entropy over graph topology.
//!
//! H(G) is the Shannon entropy of the degree distribution p_i = deg_i / Σdeg,
//! normalized by ln(N) so a regular graph scores 1 and a graph whose edges all
//! touch one hub scores low. Counts are sorted before summation so the result
//! is independent of the order a topology reports them in.

use serde::{Deserialize, Serialize};

/// A topology that can report its degree and label distributions.
pub trait Topology {
    /// Degree of every node (isolated nodes report 0), in any order.
    fn degree_sequence(&self) -> Vec<u64>;

    /// Node count per category label, in any order.
    fn category_counts(&self) -> Vec<u64>;
}

/// Entropy breakdown for one topology.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntropyReport {
    /// Number of nodes
    pub nodes: usize,
    /// Degree entropy in nats
    pub degree_entropy: f64,
    /// Degree entropy normalized to [0, 1]
    pub structural: f64,
    /// Category entropy in nats
    pub category_entropy: f64,
    /// Category entropy normalized to [0, 1]
    pub category: f64,
}

/// Shannon entropy in nats of a histogram. Zero bins contribute nothing.
pub fn shannon_entropy(counts: &[u64]) -> f64 {
    let mut sorted: Vec<u64> = counts.iter().copied().filter(|&c| c > 0).collect();
    sorted.sort_unstable();

    let total: u64 = sorted.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let h = sorted.iter().fold(0.0, |acc, &c| {
        let p = c as f64 / total;
        acc - p * p.ln()
    });
    // -0.0 and rounding below zero are both "no uncertainty"
    h.max(0.0)
}

/// Entropy normalized by ln(bins); 0 when there are fewer than two bins.
pub fn normalized_entropy(counts: &[u64], bins: usize) -> f64 {
    if bins < 2 {
        return 0.0;
    }
    (shannon_entropy(counts) / (bins as f64).ln()).clamp(0.0, 1.0)
}

/// Normalized degree entropy H(G) ∈ [0, 1].
pub fn structural_entropy<T: Topology + ?Sized>(graph: &T) -> f64 {
    let degrees = graph.degree_sequence();
    normalized_entropy(&degrees, degrees.len())
}

/// Degree and category entropy together.
pub fn entropy_report<T: Topology + ?Sized>(graph: &T) -> EntropyReport {
    let degrees = graph.degree_sequence();
    let categories = graph.category_counts();
    let occupied = categories.iter().filter(|&&c| c > 0).count();

    EntropyReport {
        nodes: degrees.len(),
        degree_entropy: shannon_entropy(&degrees),
        structural: normalized_entropy(&degrees, degrees.len()),
        category_entropy: shannon_entropy(&categories),
        category: normalized_entropy(&categories, occupied),
    }
}
