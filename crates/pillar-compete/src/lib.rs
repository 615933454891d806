//! Signal competition for score post-processing.
//!
//! When several methods (hypotheses, classifiers, pattern detectors) all
//! contribute to one score map, [`compete`] turns their confidence
//! signals into multipliers that favour the best-supported method while
//! keeping a floor of every method's weight. [`apply_competition`] applies
//! those multipliers to the keys each method owns and uses
//! [`renormalize_scale`] so the competing keys keep their original total.
//!
//! # Example
//!
//! ```
//! use pillar_compete::{CompeteOptions, compete, renormalize_scale};
//! use std::collections::BTreeMap;
//!
//! let signals = BTreeMap::from([("a".to_string(), 1.0), ("b".to_string(), 0.0)]);
//! let out = compete(&["a", "b"], &signals, CompeteOptions::default());
//! assert_eq!(out.multiplier("a"), 1.0);
//! assert_eq!(out.multiplier("b"), 0.2);
//! assert_eq!(renormalize_scale(10.0, 5.0), 2.0);
//! ```

mod apply;
mod competition;

pub use apply::{MethodKeys, apply_competition, apply_competition_in_place, renormalize_scale};
pub use competition::{
    CompeteOptions, Competition, DEFAULT_MIN_KEEP, DEFAULT_POWER, MIN_POWER, compete,
};
