//! Engine: configuration, evaluators, a compiled rule-set cache, and
//! configured signal competition.
//!
//! An [`Engine`] owns its [`PolicyCache`]; there is no global cache. Each
//! evaluation call still builds its own score map and result, so one
//! engine can be shared across threads.

use crate::config::EngineConfig;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::expr::Expr;
use crate::policy::{PolicyCache, PolicyKey};
use crate::rules::{EvaluationResult, RuleSet, RuleSetEvaluator};
use crate::value::FactValue;
use pillar_compete::{CompeteOptions, Competition, compete};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    rules: RuleSetEvaluator,
    policies: PolicyCache<RuleSet>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            rules: RuleSetEvaluator::from_config(&config),
            config,
            policies: PolicyCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policies(&self) -> &PolicyCache<RuleSet> {
        &self.policies
    }

    pub fn evaluate_expr(&self, expr: &Expr, facts: &Value) -> Result<FactValue, EvalError> {
        Evaluator::from_config(&self.config).evaluate(expr, facts)
    }

    pub fn evaluate(
        &self,
        rule_set: &RuleSet,
        facts: &Value,
        initial_scores: Option<&BTreeMap<String, f64>>,
    ) -> Result<EvaluationResult, EvalError> {
        self.rules.evaluate(rule_set, facts, initial_scores)
    }

    /// Parse a rule-set document, reusing an earlier parse of identical
    /// content.
    pub fn compile(&self, config: &Value) -> Result<Arc<RuleSet>, EvalError> {
        let key = PolicyKey::of(config)?;
        self.policies
            .get_or_compile(key, || RuleSet::from_json_value(config.clone()))
    }

    /// Cache a rule set produced by an external builder (for example a
    /// macro expander) under a caller-chosen key.
    pub fn compile_with(
        &self,
        key: PolicyKey,
        build: impl FnOnce() -> Result<RuleSet, EvalError>,
    ) -> Result<Arc<RuleSet>, EvalError> {
        self.policies.get_or_compile(key, build)
    }

    /// Competition options carrying the configured defaults.
    pub fn compete_options(&self) -> CompeteOptions {
        self.config.competition.fill(CompeteOptions::default())
    }

    /// Run [`compete`] with unset options taken from the configuration.
    pub fn compete<S: AsRef<str>>(
        &self,
        methods: &[S],
        signals: &BTreeMap<String, f64>,
        options: CompeteOptions,
    ) -> Competition {
        compete(methods, signals, self.config.competition.fill(options))
    }

    /// Compile (or reuse) a rule-set document and evaluate it.
    pub fn evaluate_config(
        &self,
        config: &Value,
        facts: &Value,
        initial_scores: Option<&BTreeMap<String, f64>>,
    ) -> Result<EvaluationResult, EvalError> {
        let rule_set = self.compile(config)?;
        self.evaluate(&rule_set, facts, initial_scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Value {
        json!({
            "id": "elements",
            "version": "1",
            "rules": [{"id": "wood", "score": {"wood": {"var": "counts.wood"}}}],
        })
    }

    #[test]
    fn identical_documents_share_one_compile() {
        let engine = Engine::default();
        let first = engine.compile(&config()).expect("compile");
        let second = engine.compile(&config()).expect("compile");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.policies().len(), 1);
    }

    #[test]
    fn evaluate_config_runs_cached_rule_set() {
        let engine = Engine::default();
        let result = engine
            .evaluate_config(&config(), &json!({"counts": {"wood": 3}}), None)
            .expect("evaluate");
        assert_eq!(result.score("wood"), 3.0);
    }

    #[test]
    fn configured_competition_tuning_reaches_compete() {
        let config = EngineConfig::from_toml_str("[competition]\npower = 5.0\n").expect("config");
        let engine = Engine::new(config);
        assert_eq!(engine.compete_options().power, Some(5.0));

        let signals = BTreeMap::from([("a".to_string(), 0.5), ("b".to_string(), 0.25)]);
        let out = engine.compete(&["a", "b"], &signals, CompeteOptions::default());
        assert_eq!(out.power, 5.0);
        assert_eq!(out.min_keep, 0.2);

        let out = engine.compete(&["a", "b"], &signals, CompeteOptions::default().with_power(1.0));
        assert_eq!(out.power, 1.0);
    }

    #[test]
    fn configured_depth_applies_to_expressions() {
        let engine = Engine::new(EngineConfig::default().with_max_expr_depth(1));
        let expr = Expr::from_json(&json!({"op": "not", "args": [true]})).expect("parse");
        assert!(matches!(
            engine.evaluate_expr(&expr, &json!({})),
            Err(EvalError::DepthExceeded { limit: 1 })
        ));
    }
}
