//! Expression tree.
//!
//! Expressions are plain data. On the wire they take one of four shapes:
//!
//! ```text
//! {"op": "add", "args": [1, {"var": "x.y"}]}   ← OpCall
//! {"var": "chart.day.stem"}                    ← VarRef
//! 42 | "wood" | true | null                    ← Literal
//! [expr, expr, ...]                            ← List, evaluated element-wise
//! ```
//!
//! The operator set is closed: [`Op`] enumerates it, and parsing rejects
//! any other name with [`EvalError::UnknownOperator`].

use crate::error::EvalError;
use crate::value::number_to_json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Hard ceiling on nesting accepted while reading an expression from JSON.
pub const MAX_PARSE_DEPTH: usize = 256;

/// The fixed operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Op {
    // logic
    And,
    Or,
    Not,
    // comparison
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    // collection
    In,
    Overlap,
    Intersect,
    Len,
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Abs,
    Min,
    Max,
    Sum,
    Clamp,
    // conditional
    If,
}

impl Op {
    pub const ALL: [Op; 24] = [
        Op::And,
        Op::Or,
        Op::Not,
        Op::Eq,
        Op::Ne,
        Op::Lt,
        Op::Lte,
        Op::Gt,
        Op::Gte,
        Op::In,
        Op::Overlap,
        Op::Intersect,
        Op::Len,
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Neg,
        Op::Abs,
        Op::Min,
        Op::Max,
        Op::Sum,
        Op::Clamp,
        Op::If,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Eq => "eq",
            Op::Ne => "ne",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::In => "in",
            Op::Overlap => "overlap",
            Op::Intersect => "intersect",
            Op::Len => "len",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Neg => "neg",
            Op::Abs => "abs",
            Op::Min => "min",
            Op::Max => "max",
            Op::Sum => "sum",
            Op::Clamp => "clamp",
            Op::If => "if",
        }
    }

    pub fn from_name(name: &str) -> Result<Op, EvalError> {
        Op::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| EvalError::UnknownOperator {
                op: name.to_string(),
            })
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scalar literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// An immutable expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Expr {
    Literal(Literal),
    List(Vec<Expr>),
    Var(String),
    Call { op: Op, args: Vec<Expr> },
}

impl Expr {
    pub fn var(path: impl Into<String>) -> Self {
        Expr::Var(path.into())
    }

    pub fn number(n: f64) -> Self {
        Expr::Literal(Literal::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(s.into()))
    }

    pub fn bool(b: bool) -> Self {
        Expr::Literal(Literal::Bool(b))
    }

    pub fn call(op: Op, args: Vec<Expr>) -> Self {
        Expr::Call { op, args }
    }

    /// Read an expression from its JSON shape.
    pub fn from_json(value: &Value) -> Result<Expr, EvalError> {
        parse(value, 0)
    }

    /// Whether a JSON object has the shape of an expression node
    /// (`{"op": ...}` or `{"var": ...}`) rather than plain data.
    pub fn is_expression_object(entries: &Map<String, Value>) -> bool {
        entries.contains_key("op") || entries.contains_key("var")
    }

    pub fn to_json(&self) -> Value {
        match self {
            Expr::Literal(Literal::Null) => Value::Null,
            Expr::Literal(Literal::Bool(b)) => Value::Bool(*b),
            Expr::Literal(Literal::Number(n)) => number_to_json(*n),
            Expr::Literal(Literal::String(s)) => Value::String(s.clone()),
            Expr::List(items) => Value::Array(items.iter().map(Expr::to_json).collect()),
            Expr::Var(path) => serde_json::json!({ "var": path }),
            Expr::Call { op, args } => serde_json::json!({
                "op": op.name(),
                "args": args.iter().map(Expr::to_json).collect::<Vec<_>>(),
            }),
        }
    }
}

fn parse(value: &Value, depth: usize) -> Result<Expr, EvalError> {
    if depth > MAX_PARSE_DEPTH {
        return Err(EvalError::DepthExceeded {
            limit: MAX_PARSE_DEPTH,
        });
    }

    match value {
        Value::Null => Ok(Expr::Literal(Literal::Null)),
        Value::Bool(b) => Ok(Expr::Literal(Literal::Bool(*b))),
        Value::Number(n) => Ok(Expr::Literal(Literal::Number(
            n.as_f64().unwrap_or(f64::NAN),
        ))),
        Value::String(s) => Ok(Expr::Literal(Literal::String(s.clone()))),
        Value::Array(items) => items
            .iter()
            .map(|item| parse(item, depth + 1))
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::List),
        Value::Object(entries) => parse_object(entries, depth),
    }
}

fn parse_object(entries: &Map<String, Value>, depth: usize) -> Result<Expr, EvalError> {
    if let Some(op) = entries.get("op") {
        let name = op
            .as_str()
            .ok_or_else(|| EvalError::malformed("`op` must be a string"))?;
        let op = Op::from_name(name)?;
        let args = match entries.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| parse(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(EvalError::malformed(format!(
                    "`args` of `{name}` must be an array"
                )));
            }
        };
        return Ok(Expr::Call { op, args });
    }

    if let Some(path) = entries.get("var") {
        return path
            .as_str()
            .map(Expr::var)
            .ok_or_else(|| EvalError::malformed("`var` must be a string path"));
    }

    Err(EvalError::malformed(
        "object is neither an operator call nor a variable reference",
    ))
}

impl TryFrom<Value> for Expr {
    type Error = EvalError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Expr::from_json(&value)
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        expr.to_json()
    }
}
