//! Expression evaluator.
//!
//! Evaluation is total and pure over well-formed expressions: operand type
//! mismatches coerce to NaN (and from there to `false` in comparisons),
//! absent paths resolve to [`FactValue::Absent`], and nothing reads or
//! writes state outside the arguments. The only failure past parsing is
//! exceeding the configured nesting depth.

use crate::config::{DEFAULT_MAX_EXPR_DEPTH, EngineConfig};
use crate::error::EvalError;
use crate::expr::{Expr, Literal, Op};
use crate::value::{FactValue, lookup_path};
use serde_json::Value;

/// Evaluates expressions under a nesting limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }
}

impl Evaluator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_expr_depth)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn evaluate(&self, expr: &Expr, facts: &Value) -> Result<FactValue, EvalError> {
        self.eval(expr, facts, 1)
    }

    fn eval(&self, expr: &Expr, facts: &Value, depth: usize) -> Result<FactValue, EvalError> {
        if depth > self.max_depth {
            tracing::warn!(limit = self.max_depth, "expression nesting limit exceeded");
            return Err(EvalError::DepthExceeded {
                limit: self.max_depth,
            });
        }

        match expr {
            Expr::Literal(Literal::Null) => Ok(FactValue::Null),
            Expr::Literal(Literal::Bool(b)) => Ok(FactValue::Bool(*b)),
            Expr::Literal(Literal::Number(n)) => Ok(FactValue::Number(*n)),
            Expr::Literal(Literal::String(s)) => Ok(FactValue::String(s.clone())),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item, facts, depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(FactValue::List),
            Expr::Var(path) => Ok(lookup_path(facts, path)),
            Expr::Call { op, args } => self.apply(*op, args, facts, depth),
        }
    }

    /// Evaluate positional argument `i`; a missing argument is `Absent`.
    fn arg(
        &self,
        args: &[Expr],
        i: usize,
        facts: &Value,
        depth: usize,
    ) -> Result<FactValue, EvalError> {
        match args.get(i) {
            Some(expr) => self.eval(expr, facts, depth + 1),
            None => Ok(FactValue::Absent),
        }
    }

    fn num(&self, args: &[Expr], i: usize, facts: &Value, depth: usize) -> Result<f64, EvalError> {
        Ok(self.arg(args, i, facts, depth)?.to_number())
    }

    /// Every argument coerced to a number, in order.
    fn nums(&self, args: &[Expr], facts: &Value, depth: usize) -> Result<Vec<f64>, EvalError> {
        args.iter()
            .map(|expr| Ok(self.eval(expr, facts, depth + 1)?.to_number()))
            .collect()
    }

    /// Like [`Self::nums`], but list-valued arguments contribute their
    /// elements instead of a single NaN.
    fn flat_nums(&self, args: &[Expr], facts: &Value, depth: usize) -> Result<Vec<f64>, EvalError> {
        let mut out = Vec::new();
        for expr in args {
            match self.eval(expr, facts, depth + 1)? {
                FactValue::List(items) => out.extend(items.iter().map(FactValue::to_number)),
                other => out.push(other.to_number()),
            }
        }
        Ok(out)
    }

    fn apply(
        &self,
        op: Op,
        args: &[Expr],
        facts: &Value,
        depth: usize,
    ) -> Result<FactValue, EvalError> {
        let value = match op {
            Op::And => {
                for expr in args {
                    if !self.eval(expr, facts, depth + 1)?.is_truthy() {
                        return Ok(FactValue::Bool(false));
                    }
                }
                FactValue::Bool(true)
            }
            Op::Or => {
                for expr in args {
                    if self.eval(expr, facts, depth + 1)?.is_truthy() {
                        return Ok(FactValue::Bool(true));
                    }
                }
                FactValue::Bool(false)
            }
            Op::Not => FactValue::Bool(!self.arg(args, 0, facts, depth)?.is_truthy()),

            Op::Eq | Op::Ne => {
                let a = self.arg(args, 0, facts, depth)?;
                let b = self.arg(args, 1, facts, depth)?;
                FactValue::Bool(a.loose_eq(&b) == (op == Op::Eq))
            }
            Op::Lt | Op::Lte | Op::Gt | Op::Gte => {
                let a = self.num(args, 0, facts, depth)?;
                let b = self.num(args, 1, facts, depth)?;
                // NaN operands make every ordering comparison false.
                FactValue::Bool(match op {
                    Op::Lt => a < b,
                    Op::Lte => a <= b,
                    Op::Gt => a > b,
                    _ => a >= b,
                })
            }

            Op::In => {
                let needle = self.arg(args, 0, facts, depth)?;
                let haystack = self.arg(args, 1, facts, depth)?;
                FactValue::Bool(contains(&haystack, &needle))
            }
            Op::Overlap => {
                let a = self.arg(args, 0, facts, depth)?;
                let b = self.arg(args, 1, facts, depth)?;
                FactValue::Bool(match (a.as_list(), b.as_list()) {
                    (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
                        a.iter().any(|x| b.iter().any(|y| x.loose_eq(y)))
                    }
                    _ => false,
                })
            }
            Op::Intersect => {
                let a = self.arg(args, 0, facts, depth)?;
                let b = self.arg(args, 1, facts, depth)?;
                FactValue::List(intersect(
                    a.as_list().unwrap_or_default(),
                    b.as_list().unwrap_or_default(),
                ))
            }
            Op::Len => {
                let len = match self.arg(args, 0, facts, depth)? {
                    FactValue::String(s) => s.chars().count(),
                    FactValue::List(items) => items.len(),
                    FactValue::Map(entries) => entries.len(),
                    _ => 0,
                };
                FactValue::Number(len as f64)
            }

            Op::Add => FactValue::Number(self.nums(args, facts, depth)?.into_iter().sum()),
            Op::Mul => FactValue::Number(self.nums(args, facts, depth)?.into_iter().product()),
            Op::Sub | Op::Div => {
                let values = self.nums(args, facts, depth)?;
                let result = match values.split_first() {
                    None => f64::NAN,
                    Some((first, [])) if op == Op::Sub => -first,
                    Some((first, rest)) => rest.iter().fold(*first, |acc, x| {
                        if op == Op::Sub { acc - x } else { acc / x }
                    }),
                };
                FactValue::Number(result)
            }
            Op::Neg => FactValue::Number(-self.num(args, 0, facts, depth)?),
            Op::Abs => FactValue::Number(self.num(args, 0, facts, depth)?.abs()),
            Op::Min | Op::Max => {
                let values = self.flat_nums(args, facts, depth)?;
                FactValue::Number(extremum(&values, op == Op::Min))
            }
            Op::Sum => FactValue::Number(self.flat_nums(args, facts, depth)?.into_iter().sum()),
            Op::Clamp => {
                let x = self.num(args, 0, facts, depth)?;
                let lo = self.num(args, 1, facts, depth)?;
                let hi = self.num(args, 2, facts, depth)?;
                FactValue::Number(if x.is_nan() || lo.is_nan() || hi.is_nan() {
                    f64::NAN
                } else {
                    x.max(lo).min(hi)
                })
            }

            Op::If => {
                let branch = if self.arg(args, 0, facts, depth)?.is_truthy() {
                    args.get(1)
                } else {
                    args.get(2)
                };
                match branch {
                    Some(expr) => self.eval(expr, facts, depth + 1)?,
                    None => FactValue::Null,
                }
            }
        };
        Ok(value)
    }
}

fn contains(haystack: &FactValue, needle: &FactValue) -> bool {
    match haystack {
        FactValue::List(items) => items.iter().any(|item| item.loose_eq(needle)),
        FactValue::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        FactValue::Map(entries) => needle.as_str().is_some_and(|k| entries.contains_key(k)),
        _ => false,
    }
}

fn intersect(a: &[FactValue], b: &[FactValue]) -> Vec<FactValue> {
    let mut out: Vec<FactValue> = Vec::new();
    for item in a {
        if b.iter().any(|other| other.loose_eq(item)) && !out.iter().any(|seen| seen.loose_eq(item))
        {
            out.push(item.clone());
        }
    }
    out
}

/// Minimum or maximum; NaN if the input is empty or contains NaN.
fn extremum(values: &[f64], min: bool) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    values.iter().copied().fold(
        if min { f64::INFINITY } else { f64::NEG_INFINITY },
        |acc, v| if min { acc.min(v) } else { acc.max(v) },
    )
}

/// Evaluate with the default nesting limit.
pub fn evaluate(expr: &Expr, facts: &Value) -> Result<FactValue, EvalError> {
    Evaluator::default().evaluate(expr, facts)
}

/// Parse an expression from its JSON shape and evaluate it.
///
/// Fails with [`EvalError::UnknownOperator`] if any `op` names an operator
/// outside the fixed set.
pub fn evaluate_json(expr: &Value, facts: &Value) -> Result<FactValue, EvalError> {
    evaluate(&Expr::from_json(expr)?, facts)
}
