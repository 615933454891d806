//! Applying a competition to a score map.
//!
//! Each method owns a group of score keys. Attenuating a group by its
//! multiplier shrinks the total score mass, so the attenuated keys are
//! rescaled afterwards to the pre-attenuation total: competition moves
//! mass between methods instead of removing it.

use crate::competition::Competition;
use std::collections::{BTreeMap, BTreeSet};

/// Totals after attenuation at or below this are treated as empty.
const SCALE_EPSILON: f64 = 1e-12;

/// Factor that restores `total_before` from `total_after`.
///
/// Returns `1.0` unless both totals are finite, `total_before > 0`, and
/// `total_after > 1e-12`.
pub fn renormalize_scale(total_before: f64, total_after: f64) -> f64 {
    if total_before.is_finite()
        && total_after.is_finite()
        && total_before > 0.0
        && total_after > SCALE_EPSILON
    {
        total_before / total_after
    } else {
        1.0
    }
}

/// Score keys of each method that take part in the competition.
pub type MethodKeys = BTreeMap<String, Vec<String>>;

/// Attenuate `scores` by the competition and rescale the competing keys
/// to their original total. Returns a new map; `scores` is untouched.
///
/// A key listed under several methods is governed by the first of them in
/// `competition.methods` order. Keys of no competing method, and
/// competing keys missing from `scores`, are left as they are.
pub fn apply_competition(
    scores: &BTreeMap<String, f64>,
    method_keys: &MethodKeys,
    competition: &Competition,
) -> BTreeMap<String, f64> {
    let mut out = scores.clone();
    apply_competition_in_place(&mut out, method_keys, competition);
    out
}

/// In-place form of [`apply_competition`].
///
/// Opt-in for hot paths that own their score map. Callers must not hold
/// other views of `scores` that expect the pre-competition values.
pub fn apply_competition_in_place(
    scores: &mut BTreeMap<String, f64>,
    method_keys: &MethodKeys,
    competition: &Competition,
) {
    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    let mut assignments: Vec<(&str, f64)> = Vec::new();
    for method in &competition.methods {
        let multiplier = competition.multiplier(method);
        for key in method_keys.get(method).into_iter().flatten() {
            if scores.contains_key(key) && claimed.insert(key.as_str()) {
                assignments.push((key.as_str(), multiplier));
            }
        }
    }

    let total_before: f64 = assignments.iter().map(|(key, _)| scores[*key]).sum();
    let total_after: f64 = assignments.iter().map(|(key, m)| scores[*key] * m).sum();
    let scale = renormalize_scale(total_before, total_after);
    if scale == 1.0 && total_before > 0.0 && total_after <= SCALE_EPSILON {
        tracing::debug!(total_before, "competition left no mass to renormalize");
    }

    for (key, multiplier) in assignments {
        if let Some(score) = scores.get_mut(key) {
            *score *= multiplier * scale;
        }
    }
}
