//! Weighted random selection.
//!
//! Every candidate draws its own key `-ln(U) / weight` from the stream and the
//! smallest key wins, which selects each candidate with probability
//! proportional to its weight. One uniform is consumed per candidate, in
//! declaration order, so the stream advances identically whatever is picked.

use thiserror::Error;

use crate::seed::RandomSource;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("no candidates to select from")]
pub struct NoCandidates;

/// A weight that is not a positive finite number.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("weight must be positive and finite, got {0}")]
pub struct InvalidWeight(pub f64);

/// Checks that `weight` can take part in a selection.
pub fn validate_weight(weight: f64) -> Result<f64, InvalidWeight> {
    if weight.is_finite() && weight > 0.0 {
        Ok(weight)
    } else {
        Err(InvalidWeight(weight))
    }
}

/// Index of the selected weight.
///
/// # Errors
///
/// Returns [`NoCandidates`] when `weights` is empty.
pub fn select_index<I>(weights: I, rng: &mut RandomSource) -> Result<usize, NoCandidates>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, weight) in weights.into_iter().enumerate() {
        let key = -libm::log(rng.next_f64()) / weight;
        if best.is_none_or(|(_, best_key)| key < best_key) {
            best = Some((index, key));
        }
    }
    best.map(|(index, _)| index).ok_or(NoCandidates)
}

/// An ordered list of candidates with validated weights.
#[derive(Clone, Debug)]
pub struct WeightedList<T> {
    entries: Vec<(T, f64)>,
}

impl<T> WeightedList<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a candidate.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWeight`] for zero, negative, or non-finite weights.
    pub fn push(&mut self, item: T, weight: f64) -> Result<(), InvalidWeight> {
        let weight = validate_weight(weight)?;
        self.entries.push((item, weight));
        Ok(())
    }

    /// Selects one candidate with probability proportional to its weight.
    pub fn pick(&self, rng: &mut RandomSource) -> Result<&T, NoCandidates> {
        let index = select_index(self.entries.iter().map(|(_, w)| *w), rng)?;
        Ok(&self.entries[index].0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, f64)> {
        self.entries.iter().map(|(item, w)| (item, *w))
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }
}

impl<T> Default for WeightedList<T> {
    fn default() -> Self {
        Self::new()
    }
}
