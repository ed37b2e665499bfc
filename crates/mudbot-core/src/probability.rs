//! Piecewise-linear weights keyed by a population count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Interpolate a weight for `count` over sparse `(count, weight)` breakpoints.
///
/// Counts at or below the smallest breakpoint take its weight, counts above the
/// largest breakpoint take the largest one's weight (no extrapolation), and
/// anything in between is linearly interpolated between its neighbours. An
/// empty map yields `0.0`.
pub fn interpolate(count: u32, points: &BTreeMap<u32, f64>) -> f64 {
    let mut iter = points.iter();
    let Some((&first_count, &first_weight)) = iter.next() else {
        return 0.0;
    };

    if count <= first_count {
        return first_weight;
    }

    let (mut lo_count, mut lo_weight) = (first_count, first_weight);
    for (&hi_count, &hi_weight) in iter {
        if count <= hi_count {
            let progress = f64::from(count - lo_count) / f64::from(hi_count - lo_count);
            return lo_weight * (1.0 - progress) + hi_weight * progress;
        }
        lo_count = hi_count;
        lo_weight = hi_weight;
    }

    lo_weight
}

/// A weight curve over room population, as written in bot configuration.
///
/// ```yaml
/// population_weight:
///   1: 0    # nobody to talk to
///   2: 20
///   3: 40
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationCurve {
    points: BTreeMap<u32, f64>,
}

impl PopulationCurve {
    pub fn new(points: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &BTreeMap<u32, f64> {
        &self.points
    }

    pub fn weight_at(&self, population: u32) -> f64 {
        interpolate(population, &self.points)
    }
}
