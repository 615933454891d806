//! Error types for Pillar kernel operations.
//!
//! Only configuration errors are represented here. Data problems (type
//! mismatches, absent paths, failed assertions) never become errors; they
//! degrade to NaN, `Absent`, or a diagnostic entry in the evaluation result.

/// Errors arising from a broken expression or rule-set configuration.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// An `OpCall` names an operator outside the fixed operator set.
    #[error("unknown operator: {op}")]
    UnknownOperator { op: String },

    /// A JSON value could not be read as an expression or rule set.
    #[error("malformed expression: {reason}")]
    MalformedExpression { reason: String },

    /// Expression or template nesting exceeded the configured limit.
    #[error("nesting depth exceeded limit of {limit}")]
    DepthExceeded { limit: usize },

    /// A rule set document failed to deserialize.
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(#[from] serde_json::Error),
}

impl EvalError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        EvalError::MalformedExpression {
            reason: reason.into(),
        }
    }
}

/// Errors arising from engine configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration field holds a value outside its admissible range.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
