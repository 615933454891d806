//! # Pillar Kernel
//!
//! A small declarative evaluation substrate: expressions over read-only
//! fact contexts, and ordered rule sets that accumulate scores, emit
//! records, and collect failed assertions.
//!
//! This crate is **domain-agnostic**: facts are plain JSON and rule sets
//! are data. Whatever populates them (calendar tables, catalogs, macro
//! compilers) lives outside.
//!
//! ## Architecture
//!
//! ```text
//! FactValue / lookup_path   ← Values with an explicit Absent, dot-path reads
//!     │
//! Expr / Evaluator          ← Closed operator set, total + pure evaluation
//!     │
//! RuleSet / RuleSetEvaluator← Ordered rules: when → assert → score → emit
//!     │
//! Engine + PolicyCache      ← Config limits, compiled rule-set reuse,
//!                             configured competition defaults
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod expr;
pub mod hash;
pub mod policy;
pub mod rules;
pub mod value;

pub use config::{CompetitionDefaults, EngineConfig};
pub use engine::Engine;
pub use error::{ConfigError, EvalError};
pub use eval::{Evaluator, evaluate, evaluate_json};
pub use expr::{Expr, Literal, Op};
pub use hash::ContentHash;
pub use policy::{PolicyCache, PolicyKey};
pub use rules::{
    EvaluationResult, FailedAssertion, Rule, RuleMatch, RuleSet, RuleSetEvaluator, Template,
    evaluate_rule_set,
};
pub use value::{FactValue, lookup_path};
