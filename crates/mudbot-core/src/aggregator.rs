use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{ActionRegistry, DeterministicRng, Outcome, SplitMix64};

/// An outcome chosen for a specific action.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub action_id: String,
    pub outcome: Outcome,
}

/// Pick the candidate whose cumulative weight first exceeds `r`.
///
/// The comparison is strict, so a draw landing exactly on a boundary belongs to the next
/// candidate and excluded (non-positive) weights can never be chosen.
pub fn draw(candidates: &[Selection], r: f64) -> Option<usize> {
    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| c.outcome.effective_weight().unwrap_or(0.0))
        .collect();
    pick(&weights, r)
}

fn pick(weights: &[f64], r: f64) -> Option<usize> {
    let mut summed = 0.0;
    for (i, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        summed += weight;
        if summed > r {
            return Some(i);
        }
    }
    None
}

/// Sum of `weights`, rescaling them first if the sum would overflow to infinity.
///
/// Rescaling divides by the largest weight, which keeps every ratio intact.
fn normalize(weights: &mut [f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total.is_finite() {
        return total;
    }

    let max = weights.iter().copied().fold(0.0, f64::max);
    for weight in weights.iter_mut() {
        *weight /= max;
    }
    weights.iter().sum()
}

/// Weighted random selection over every registered action's outcomes.
#[derive(Debug, Clone)]
pub struct Aggregator<R = SplitMix64> {
    rng: R,
    last_total_weight: f64,
    last_candidates: usize,
}

impl<R: DeterministicRng> Aggregator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            last_total_weight: 0.0,
            last_candidates: 0,
        }
    }

    /// Total weight seen by the most recent [`Aggregator::select_next`], after any rescaling.
    pub fn last_total_weight(&self) -> f64 {
        self.last_total_weight
    }

    pub fn last_candidates(&self) -> usize {
        self.last_candidates
    }

    /// Poll every action for candidates and draw one.
    ///
    /// Returns `None` when no candidate carries any weight; the caller should then idle until
    /// something external changes. An action that panics while listing outcomes is skipped.
    pub fn select_next<C>(&mut self, registry: &ActionRegistry<C>, ctx: &C) -> Option<Selection>
    where
        C: Send + Sync + 'static,
    {
        let mut candidates = Vec::new();
        let mut weights = Vec::new();

        for action in registry.iter() {
            let outcomes = match catch_unwind(AssertUnwindSafe(|| action.outcomes(ctx))) {
                Ok(outcomes) => outcomes,
                Err(_) => {
                    tracing::error!(action = %action.id(), "Action panicked listing outcomes");
                    continue;
                }
            };
            for outcome in outcomes {
                let Some(weight) = outcome.effective_weight() else {
                    continue;
                };
                weights.push(weight);
                candidates.push(Selection {
                    action_id: action.id().to_string(),
                    outcome,
                });
            }
        }

        let total = normalize(&mut weights);
        self.last_total_weight = total;
        self.last_candidates = candidates.len();

        if candidates.is_empty() || total <= 0.0 {
            return None;
        }

        let r = self.rng.next_f64_unit() * total;
        // Floating point summation may land a hair under `r` on the last candidate.
        let index = pick(&weights, r).unwrap_or(candidates.len() - 1);
        Some(candidates.swap_remove(index))
    }
}

impl Default for Aggregator<SplitMix64> {
    fn default() -> Self {
        Self::new(SplitMix64::new(0))
    }
}
