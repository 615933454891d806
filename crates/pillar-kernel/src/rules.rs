//! Rule sets and their evaluation.
//!
//! A [`RuleSet`] is an ordered list of declarative rules. Each rule may
//! gate itself on a `when` condition, check an `assert`, add to named
//! scores, and emit a templated record. Rules run strictly in declaration
//! order; nothing is reordered by priority or specificity.
//!
//! Scores are additive: for every key `K`,
//!
//! ```text
//! scores[K] = initial[K] (or 0) + Σ finite score[K] over matching rules
//! ```

use crate::config::{DEFAULT_MAX_TEMPLATE_DEPTH, EngineConfig};
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::expr::{Expr, MAX_PARSE_DEPTH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Emission template: arbitrary data in which any node may be an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Template {
    Expr(Expr),
    List(Vec<Template>),
    Map(BTreeMap<String, Template>),
    Literal(Value),
}

impl Template {
    pub fn from_json(value: &Value) -> Result<Template, EvalError> {
        parse_template(value, 0)
    }

    pub fn to_json(&self) -> Value {
        match self {
            Template::Expr(expr) => expr.to_json(),
            Template::List(items) => Value::Array(items.iter().map(Template::to_json).collect()),
            Template::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Template::Literal(value) => value.clone(),
        }
    }
}

fn parse_template(value: &Value, depth: usize) -> Result<Template, EvalError> {
    if depth > MAX_PARSE_DEPTH {
        return Err(EvalError::DepthExceeded {
            limit: MAX_PARSE_DEPTH,
        });
    }

    match value {
        Value::Object(entries) if Expr::is_expression_object(entries) => {
            Expr::from_json(value).map(Template::Expr)
        }
        Value::Object(entries) => entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), parse_template(v, depth + 1)?)))
            .collect::<Result<BTreeMap<_, _>, EvalError>>()
            .map(Template::Map),
        Value::Array(items) => items
            .iter()
            .map(|item| parse_template(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Template::List),
        scalar => Ok(Template::Literal(scalar.clone())),
    }
}

impl TryFrom<Value> for Template {
    type Error = EvalError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Template::from_json(&value)
    }
}

impl From<Template> for Value {
    fn from(template: Template) -> Self {
        template.to_json()
    }
}

/// A single declarative rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    /// Gate; an absent condition always matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<BTreeMap<String, Expr>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<Template>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assert: Option<Expr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            when: None,
            score: None,
            emit: None,
            assert: None,
            explain: None,
            tags: Vec::new(),
        }
    }

    pub fn when(mut self, expr: Expr) -> Self {
        self.when = Some(expr);
        self
    }

    pub fn score(mut self, key: impl Into<String>, expr: Expr) -> Self {
        self.score
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), expr);
        self
    }

    pub fn emit(mut self, template: Template) -> Self {
        self.emit = Some(template);
        self
    }

    pub fn assert(mut self, expr: Expr) -> Self {
        self.assert = Some(expr);
        self
    }

    pub fn explain(mut self, text: impl Into<String>) -> Self {
        self.explain = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// The unit of external rule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(id: impl Into<String>, version: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            description: None,
            rules,
        }
    }

    /// Parse a rule set document. Unknown operators anywhere in the
    /// document fail the whole parse.
    pub fn from_json_str(raw: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_value(value: Value) -> Result<Self, EvalError> {
        Ok(serde_json::from_value(value)?)
    }
}

/// An `assert` that evaluated falsy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAssertion {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
}

/// Trace record for a rule that contributed scores or an emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMatch {
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emit: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub scores: BTreeMap<String, f64>,
    pub emits: Vec<Value>,
    pub assertions_failed: Vec<FailedAssertion>,
    pub matches: Vec<RuleMatch>,
}

impl EvaluationResult {
    pub fn score(&self, key: &str) -> f64 {
        self.scores.get(key).copied().unwrap_or(0.0)
    }

    pub fn passed_assertions(&self) -> bool {
        self.assertions_failed.is_empty()
    }
}

/// Runs rule sets with configured expression and template limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSetEvaluator {
    exprs: Evaluator,
    max_template_depth: usize,
}

impl Default for RuleSetEvaluator {
    fn default() -> Self {
        Self {
            exprs: Evaluator::default(),
            max_template_depth: DEFAULT_MAX_TEMPLATE_DEPTH,
        }
    }
}

impl RuleSetEvaluator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            exprs: Evaluator::from_config(config),
            max_template_depth: config.max_template_depth,
        }
    }

    pub fn evaluate(
        &self,
        rule_set: &RuleSet,
        facts: &Value,
        initial_scores: Option<&BTreeMap<String, f64>>,
    ) -> Result<EvaluationResult, EvalError> {
        let mut result = EvaluationResult {
            scores: initial_scores.cloned().unwrap_or_default(),
            ..EvaluationResult::default()
        };

        for rule in &rule_set.rules {
            let matched = match &rule.when {
                Some(when) => self.exprs.evaluate(when, facts)?.is_truthy(),
                None => true,
            };
            if !matched {
                tracing::trace!(rule_set = %rule_set.id, rule_id = %rule.id, "rule skipped");
                continue;
            }

            if let Some(assert) = &rule.assert {
                if !self.exprs.evaluate(assert, facts)?.is_truthy() {
                    tracing::debug!(rule_set = %rule_set.id, rule_id = %rule.id, "assertion failed");
                    result.assertions_failed.push(FailedAssertion {
                        rule_id: rule.id.clone(),
                        explain: rule.explain.clone(),
                    });
                }
            }

            let mut contribution = BTreeMap::new();
            if let Some(score) = &rule.score {
                for (key, expr) in score {
                    let delta = self.exprs.evaluate(expr, facts)?.to_number();
                    if !delta.is_finite() {
                        tracing::trace!(rule_id = %rule.id, key = %key, "non-finite score discarded");
                        continue;
                    }
                    *result.scores.entry(key.clone()).or_insert(0.0) += delta;
                    contribution.insert(key.clone(), delta);
                }
            }

            let emitted = match &rule.emit {
                Some(template) => {
                    let value = self.render(template, facts, 1)?;
                    result.emits.push(value.clone());
                    Some(value)
                }
                None => None,
            };

            if !contribution.is_empty() || emitted.is_some() {
                tracing::debug!(
                    rule_set = %rule_set.id,
                    rule_id = %rule.id,
                    scored = contribution.len(),
                    emitted = emitted.is_some(),
                    "rule matched"
                );
                result.matches.push(RuleMatch {
                    rule_id: rule.id.clone(),
                    explain: rule.explain.clone(),
                    tags: rule.tags.clone(),
                    scores: (!contribution.is_empty()).then_some(contribution),
                    emit: emitted,
                });
            }
        }

        Ok(result)
    }

    fn render(&self, template: &Template, facts: &Value, depth: usize) -> Result<Value, EvalError> {
        if depth > self.max_template_depth {
            tracing::warn!(limit = self.max_template_depth, "template nesting limit exceeded");
            return Err(EvalError::DepthExceeded {
                limit: self.max_template_depth,
            });
        }

        match template {
            Template::Expr(expr) => Ok(self.exprs.evaluate(expr, facts)?.to_json()),
            Template::List(items) => items
                .iter()
                .map(|item| self.render(item, facts, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Template::Map(entries) => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.render(v, facts, depth + 1)?)))
                .collect::<Result<Map<_, _>, EvalError>>()
                .map(Value::Object),
            Template::Literal(value) => Ok(value.clone()),
        }
    }
}

/// Evaluate a rule set with default limits.
pub fn evaluate_rule_set(
    rule_set: &RuleSet,
    facts: &Value,
    initial_scores: Option<&BTreeMap<String, f64>>,
) -> Result<EvaluationResult, EvalError> {
    RuleSetEvaluator::default().evaluate(rule_set, facts, initial_scores)
}
