//! Signal competition.
//!
//! Several methods each report a confidence signal in `[0, 1]`. Raising
//! signals to `power` sharpens the contrast, normalizing gives each method
//! a share of the total, and the multiplier floors every method at
//! `min_keep` of its original weight:
//!
//! ```text
//! w_i          = signal_i ^ power
//! share_i      = w_i / Σw          (uniform 1/n when Σw ≤ 1e-9)
//! multiplier_i = min_keep + (1 - min_keep) · share_i
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_POWER: f64 = 2.0;
pub const DEFAULT_MIN_KEEP: f64 = 0.2;
pub const MIN_POWER: f64 = 0.01;

/// Weight totals at or below this fall back to a uniform split.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Tuning for [`compete`]. Unset fields take the defaults; out-of-range
/// or non-finite values are clamped, never rejected.
///
/// ```
/// use pillar_compete::CompeteOptions;
///
/// let options = CompeteOptions::default().with_power(3.0).with_min_keep(0.1);
/// assert_eq!(options.resolved_power(), 3.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompeteOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_keep: Option<f64>,
}

impl CompeteOptions {
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = Some(power);
        self
    }

    pub fn with_min_keep(mut self, min_keep: f64) -> Self {
        self.min_keep = Some(min_keep);
        self
    }

    /// `power`, defaulted and clamped to at least [`MIN_POWER`].
    pub fn resolved_power(&self) -> f64 {
        let resolved = match self.power {
            Some(p) if p.is_finite() => p.max(MIN_POWER),
            _ => DEFAULT_POWER,
        };
        log_clamped("power", self.power, resolved);
        resolved
    }

    /// `min_keep`, defaulted and clamped to `[0, 1]`.
    pub fn resolved_min_keep(&self) -> f64 {
        let resolved = match self.min_keep {
            Some(k) if k.is_finite() => k.clamp(0.0, 1.0),
            _ => DEFAULT_MIN_KEEP,
        };
        log_clamped("min_keep", self.min_keep, resolved);
        resolved
    }
}

fn log_clamped(field: &'static str, supplied: Option<f64>, resolved: f64) {
    if let Some(value) = supplied.filter(|value| *value != resolved) {
        tracing::debug!(field, supplied = value, resolved, "competition tuning clamped");
    }
}

/// Result of one competition pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub methods: Vec<String>,
    pub power: f64,
    pub min_keep: f64,
    /// Input signals after clamping, one per method.
    pub signals: BTreeMap<String, f64>,
    /// Sums to 1 over `methods` when `methods` is nonempty.
    pub shares: BTreeMap<String, f64>,
    pub multipliers: BTreeMap<String, f64>,
}

impl Competition {
    pub fn multiplier(&self, method: &str) -> f64 {
        self.multipliers.get(method).copied().unwrap_or(1.0)
    }

    pub fn share(&self, method: &str) -> f64 {
        self.shares.get(method).copied().unwrap_or(0.0)
    }
}

fn clamp_signal(signal: Option<f64>) -> f64 {
    match signal {
        Some(s) if s.is_finite() => s.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Convert per-method confidence signals into shares and multipliers.
///
/// Duplicate method names are kept once, at their first position. Signals
/// for names outside `methods` are ignored. Never fails.
pub fn compete<S: AsRef<str>>(
    methods: &[S],
    signals: &BTreeMap<String, f64>,
    options: CompeteOptions,
) -> Competition {
    let power = options.resolved_power();
    let min_keep = options.resolved_min_keep();

    let mut ordered: Vec<String> = Vec::with_capacity(methods.len());
    for method in methods {
        let method = method.as_ref();
        if !ordered.iter().any(|seen| seen == method) {
            ordered.push(method.to_string());
        }
    }

    let clamped: BTreeMap<String, f64> = ordered
        .iter()
        .map(|m| (m.clone(), clamp_signal(signals.get(m).copied())))
        .collect();
    let weights: Vec<f64> = ordered.iter().map(|m| clamped[m].powf(power)).collect();
    let total: f64 = weights.iter().sum();

    let shares: BTreeMap<String, f64> = if total > WEIGHT_EPSILON {
        ordered
            .iter()
            .zip(&weights)
            .map(|(m, w)| (m.clone(), w / total))
            .collect()
    } else {
        if !ordered.is_empty() {
            tracing::debug!(methods = ordered.len(), "no competing signal, splitting uniformly");
        }
        let uniform = 1.0 / ordered.len() as f64;
        ordered.iter().map(|m| (m.clone(), uniform)).collect()
    };

    let multipliers = shares
        .iter()
        .map(|(m, share)| (m.clone(), min_keep + (1.0 - min_keep) * share))
        .collect();

    Competition {
        methods: ordered,
        power,
        min_keep,
        signals: clamped,
        shares,
        multipliers,
    }
}
