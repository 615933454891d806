//! Engine configuration.
//!
//! Loaded from TOML or JSON; every field has a default so an empty
//! document is a valid configuration.
//!
//! ```toml
//! maxExprDepth = 64
//! maxTemplateDepth = 32
//!
//! [competition]
//! power = 2.0
//! minKeep = 0.2
//! ```

use crate::error::ConfigError;
use pillar_compete::CompeteOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_EXPR_DEPTH: usize = 64;
pub const DEFAULT_MAX_TEMPLATE_DEPTH: usize = 32;
pub const DEFAULT_COMPETITION_POWER: f64 = 2.0;
pub const DEFAULT_COMPETITION_MIN_KEEP: f64 = 0.2;

/// Default tuning for signal competition post-passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompetitionDefaults {
    pub power: f64,
    pub min_keep: f64,
}

impl Default for CompetitionDefaults {
    fn default() -> Self {
        Self {
            power: DEFAULT_COMPETITION_POWER,
            min_keep: DEFAULT_COMPETITION_MIN_KEEP,
        }
    }
}

impl CompetitionDefaults {
    /// Fill the fields `options` leaves unset. Explicit values win.
    pub fn fill(&self, options: CompeteOptions) -> CompeteOptions {
        CompeteOptions {
            power: options.power.or(Some(self.power)),
            min_keep: options.min_keep.or(Some(self.min_keep)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum expression nesting evaluated before failing.
    pub max_expr_depth: usize,

    /// Maximum emit-template nesting walked before failing.
    pub max_template_depth: usize,

    pub competition: CompetitionDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expr_depth: DEFAULT_MAX_EXPR_DEPTH,
            max_template_depth: DEFAULT_MAX_TEMPLATE_DEPTH,
            competition: CompetitionDefaults::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_value(value: Value) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_expr_depth(mut self, depth: usize) -> Self {
        self.max_expr_depth = depth;
        self
    }

    pub fn with_max_template_depth(mut self, depth: usize) -> Self {
        self.max_template_depth = depth;
        self
    }

    pub fn with_competition(mut self, power: f64, min_keep: f64) -> Self {
        self.competition = CompetitionDefaults { power, min_keep };
        self
    }

    /// Reject settings that would make every evaluation fail.
    ///
    /// Competition tuning is not checked here: the competition pass clamps
    /// out-of-range values itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_expr_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "maxExprDepth",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_template_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "maxTemplateDepth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn toml_overrides_nested_fields() {
        let config = EngineConfig::from_toml_str(
            r#"
maxExprDepth = 16

[competition]
minKeep = 0.5
"#,
        )
        .expect("valid config");
        assert_eq!(config.max_expr_depth, 16);
        assert_eq!(config.max_template_depth, DEFAULT_MAX_TEMPLATE_DEPTH);
        assert_eq!(config.competition.power, DEFAULT_COMPETITION_POWER);
        assert_eq!(config.competition.min_keep, 0.5);
    }

    #[test]
    fn competition_defaults_fill_only_unset_options() {
        let defaults = CompetitionDefaults {
            power: 5.0,
            min_keep: 0.4,
        };
        let filled = defaults.fill(CompeteOptions::default().with_min_keep(0.1));
        assert_eq!(filled.power, Some(5.0));
        assert_eq!(filled.min_keep, Some(0.1));
    }

    #[test]
    fn json_rejects_zero_depth() {
        let err = EngineConfig::from_json_value(json!({"maxTemplateDepth": 0})).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "maxTemplateDepth",
                ..
            }
        ));
    }
}
