//! Defuzzification methods
//!
//! Reduces a per-output inference result to one crisp value. Mamdani
//! results arrive as an [`AggregatedSet`] sampled at a fixed resolution
//! across the output domain; Sugeno and Tsukamoto results arrive as
//! (firing strength, crisp value) pairs.
//!
//! All functions here are pure; they return `None` when the result
//! carries no activation (zero area / zero weight sum), which the
//! inference layer maps to the domain-midpoint fallback and a
//! `NoRuleFired` warning.
//!
//! Tie-break conventions when the aggregated set has multiple maxima of
//! equal height (within tolerance):
//! - mean-of-maximum averages *all* maximizing sample abscissae,
//!   disjoint plateaus included;
//! - smallest/largest-of-maximum take the leftmost/rightmost
//!   maximizing sample;
//! - bisector returns the leftmost sample at which the running area
//!   first reaches half of the total area.

use serde::{Deserialize, Serialize};

use crate::membership::TOLERANCE;

/// Defuzzification method selection.
///
/// Compatibility with the inference type is validated when the model is
/// built: sampled methods need a Mamdani aggregated set, weighted
/// methods need (w, z) pairs (or singleton-like Mamdani consequents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefuzzMethod {
    /// Center of area: sum(x*mu) / sum(mu)
    Centroid,
    /// The x splitting the area under mu into equal halves
    Bisector,
    /// Mean of the maximizing abscissae
    #[serde(rename = "mom", alias = "mean_of_maximum")]
    MeanOfMaximum,
    /// Leftmost maximizing abscissa
    #[serde(rename = "som", alias = "smallest_of_maximum")]
    SmallestOfMaximum,
    /// Rightmost maximizing abscissa
    #[serde(rename = "lom", alias = "largest_of_maximum")]
    LargestOfMaximum,
    /// sum(w*z) / sum(w) over rule pairs
    WeightedAverage,
    /// sum(w*z) over rule pairs
    WeightedSum,
}

impl DefuzzMethod {
    /// Whether this method consumes (w, z) pairs rather than a sampled
    /// aggregated set.
    pub fn is_weighted(&self) -> bool {
        matches!(self, DefuzzMethod::WeightedAverage | DefuzzMethod::WeightedSum)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DefuzzMethod::Centroid => "centroid",
            DefuzzMethod::Bisector => "bisector",
            DefuzzMethod::MeanOfMaximum => "mom",
            DefuzzMethod::SmallestOfMaximum => "som",
            DefuzzMethod::LargestOfMaximum => "lom",
            DefuzzMethod::WeightedAverage => "weighted_average",
            DefuzzMethod::WeightedSum => "weighted_sum",
        }
    }
}

/// An aggregated output fuzzy set, sampled at midpoints across the
/// output domain: x_i = min + (i + 0.5) * (max - min) / n.
#[derive(Debug, Clone)]
pub struct AggregatedSet {
    min: f64,
    max: f64,
    ys: Vec<f64>,
}

impl AggregatedSet {
    pub fn new(min: f64, max: f64, resolution: usize) -> Self {
        Self {
            min,
            max,
            ys: vec![0.0; resolution],
        }
    }

    pub fn resolution(&self) -> usize {
        self.ys.len()
    }

    pub fn step(&self) -> f64 {
        (self.max - self.min) / (self.ys.len() as f64)
    }

    /// Midpoint abscissa of sample `i`.
    pub fn x_at(&self, i: usize) -> f64 {
        self.min + ((i as f64) + 0.5) * self.step()
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn ys_mut(&mut self) -> &mut [f64] {
        &mut self.ys
    }

    /// Sample points as (x, mu) pairs, for diagnostics and plotting.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ys.iter().enumerate().map(|(i, y)| (self.x_at(i), *y))
    }

    pub fn max_membership(&self) -> f64 {
        self.ys.iter().fold(0.0, |m, y| y.max(m))
    }
}

/// Defuzzify a sampled aggregated set. `None` means the set carries no
/// activation and the caller should fall back to the domain midpoint.
pub fn defuzzify_sampled(method: DefuzzMethod, set: &AggregatedSet) -> Option<f64> {
    match method {
        DefuzzMethod::Centroid => {
            let mut num = 0.0;
            let mut den = 0.0;
            for (x, y) in set.points() {
                num += x * y;
                den += y;
            }
            (den > TOLERANCE).then(|| num / den)
        }
        DefuzzMethod::Bisector => {
            let total: f64 = set.ys().iter().sum();
            if total <= TOLERANCE {
                return None;
            }
            let half = 0.5 * total;
            let mut cumulative = 0.0;
            for (x, y) in set.points() {
                cumulative += y;
                if cumulative >= half {
                    return Some(x);
                }
            }
            Some(set.x_at(set.resolution() - 1))
        }
        DefuzzMethod::MeanOfMaximum
        | DefuzzMethod::SmallestOfMaximum
        | DefuzzMethod::LargestOfMaximum => {
            let peak = set.max_membership();
            if peak <= TOLERANCE {
                return None;
            }
            let maxima: Vec<f64> = set
                .points()
                .filter(|(_, y)| (peak - y).abs() <= TOLERANCE)
                .map(|(x, _)| x)
                .collect();
            match method {
                DefuzzMethod::MeanOfMaximum => {
                    Some(maxima.iter().sum::<f64>() / maxima.len() as f64)
                }
                DefuzzMethod::SmallestOfMaximum => maxima.first().copied(),
                _ => maxima.last().copied(),
            }
        }
        // Weighted methods never see a sampled set: under Mamdani they
        // are restricted to singleton-like consequents and routed to
        // defuzzify_pairs by the engine.
        DefuzzMethod::WeightedAverage | DefuzzMethod::WeightedSum => None,
    }
}

/// Defuzzify (firing strength, crisp value) pairs. Zero-strength pairs
/// must already be excluded; an empty slice means no rule fired.
pub fn defuzzify_pairs(method: DefuzzMethod, pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let wz: f64 = pairs.iter().map(|(w, z)| w * z).sum();
    match method {
        DefuzzMethod::WeightedSum => Some(wz),
        _ => {
            let ws: f64 = pairs.iter().map(|(w, _)| w).sum();
            (ws > TOLERANCE).then(|| wz / ws)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{MembershipFunction, Shape};

    fn sampled(mf: &MembershipFunction, min: f64, max: f64, n: usize) -> AggregatedSet {
        let mut set = AggregatedSet::new(min, max, n);
        for i in 0..n {
            let x = set.x_at(i);
            set.ys_mut()[i] = mf.evaluate(x);
        }
        set
    }

    #[test]
    fn test_centroid_symmetric_triangle_hits_peak() {
        let tri = MembershipFunction::new(Shape::Triangular, &[20.0, 50.0, 80.0]).unwrap();
        let set = sampled(&tri, 0.0, 100.0, 100);
        let c = defuzzify_sampled(DefuzzMethod::Centroid, &set).unwrap();
        assert!((c - 50.0).abs() < 1e-9, "centroid {}", c);
    }

    #[test]
    fn test_bisector_symmetric_triangle() {
        let tri = MembershipFunction::new(Shape::Triangular, &[20.0, 50.0, 80.0]).unwrap();
        let set = sampled(&tri, 0.0, 100.0, 100);
        let b = defuzzify_sampled(DefuzzMethod::Bisector, &set).unwrap();
        assert!((b - 50.0).abs() <= set.step());
    }

    #[test]
    fn test_maximum_statistics_on_plateau() {
        let trap = MembershipFunction::new(Shape::Trapezoidal, &[10.0, 40.0, 60.0, 90.0]).unwrap();
        let set = sampled(&trap, 0.0, 100.0, 200);
        let mom = defuzzify_sampled(DefuzzMethod::MeanOfMaximum, &set).unwrap();
        let som = defuzzify_sampled(DefuzzMethod::SmallestOfMaximum, &set).unwrap();
        let lom = defuzzify_sampled(DefuzzMethod::LargestOfMaximum, &set).unwrap();
        assert!((mom - 50.0).abs() < 1.0);
        assert!((som - 40.0).abs() <= set.step());
        assert!((lom - 60.0).abs() <= set.step());
        assert!(som < mom && mom < lom);
    }

    #[test]
    fn test_disjoint_maxima_convention() {
        // two clipped triangles at the same height
        let mut set = AggregatedSet::new(0.0, 10.0, 10);
        set.ys_mut()[2] = 0.5; // x = 2.5
        set.ys_mut()[7] = 0.5; // x = 7.5
        let mom = defuzzify_sampled(DefuzzMethod::MeanOfMaximum, &set).unwrap();
        assert!((mom - 5.0).abs() < 1e-9);
        let som = defuzzify_sampled(DefuzzMethod::SmallestOfMaximum, &set).unwrap();
        assert!((som - 2.5).abs() < 1e-9);
        let lom = defuzzify_sampled(DefuzzMethod::LargestOfMaximum, &set).unwrap();
        assert!((lom - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_set_reports_no_activation() {
        let set = AggregatedSet::new(0.0, 10.0, 50);
        for m in [
            DefuzzMethod::Centroid,
            DefuzzMethod::Bisector,
            DefuzzMethod::MeanOfMaximum,
            DefuzzMethod::SmallestOfMaximum,
            DefuzzMethod::LargestOfMaximum,
        ] {
            assert!(defuzzify_sampled(m, &set).is_none(), "{:?}", m);
        }
    }

    #[test]
    fn test_weighted_average_pairs() {
        let pairs = [(0.2, 10.0), (0.8, 30.0)];
        let v = defuzzify_pairs(DefuzzMethod::WeightedAverage, &pairs).unwrap();
        assert!((v - 26.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_average_equal_weights_is_mean() {
        let pairs = [(0.5, 12.0), (0.5, 28.0)];
        let v = defuzzify_pairs(DefuzzMethod::WeightedAverage, &pairs).unwrap();
        assert!((v - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_sum_pairs() {
        let pairs = [(0.5, 10.0), (0.25, 20.0)];
        let v = defuzzify_pairs(DefuzzMethod::WeightedSum, &pairs).unwrap();
        assert!((v - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_pairs_means_no_rule_fired() {
        assert!(defuzzify_pairs(DefuzzMethod::WeightedAverage, &[]).is_none());
        assert!(defuzzify_pairs(DefuzzMethod::WeightedSum, &[]).is_none());
    }

    #[test]
    fn test_midpoint_sampling_positions() {
        let set = AggregatedSet::new(0.0, 10.0, 10);
        assert!((set.x_at(0) - 0.5).abs() < 1e-9);
        assert!((set.x_at(9) - 9.5).abs() < 1e-9);
        assert!((set.step() - 1.0).abs() < 1e-9);
    }
}
