//! Integration tests: resolution laws of the fact graph.
//!
//! - diamond fan-in computes the shared upstream exactly once
//! - mutual recursion fails with a cycle error from either entry point
//! - undeclared ids fail with node-not-found
//! - compute functions can run rule sets over upstream facts

use pillar_graph::{FactGraph, GraphError, Node};
use pillar_kernel::{RuleSet, evaluate_rule_set};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn number(get: &mut pillar_graph::Resolver<'_, Value>, id: &str) -> Result<f64, GraphError> {
    Ok(get.get(id)?.as_f64().unwrap_or(0.0))
}

fn diamond(counter: Arc<AtomicUsize>) -> FactGraph<Value> {
    FactGraph::from_nodes([
        Node::new("d", move |ctx: &Value, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ctx["seed"].clone())
        }),
        Node::new("a", |_, get| Ok(json!(number(get, "d")? + 1.0))).deps(["d"]),
        Node::new("b", |_, get| Ok(json!(number(get, "d")? * 2.0))).deps(["d"]),
        Node::new("c", |_, get| Ok(json!(number(get, "a")? + number(get, "b")?)))
            .deps(["a", "b"])
            .formula("a + b"),
    ])
    .expect("diamond graph")
}

#[test]
fn diamond_computes_shared_upstream_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let graph = diamond(Arc::clone(&counter));

    let out = graph.resolve(&json!({"seed": 5.0}), ["c"]).expect("resolve");
    assert_eq!(out["c"], json!(16.0));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn each_run_has_its_own_memo() {
    let counter = Arc::new(AtomicUsize::new(0));
    let graph = diamond(Arc::clone(&counter));

    graph.resolve(&json!({"seed": 1.0}), ["c", "a", "b"]).expect("first run");
    let second = graph.resolve(&json!({"seed": 2.0}), ["c"]).expect("second run");

    assert_eq!(second["c"], json!(7.0));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn compute_order_follows_pulls_not_declaration() {
    let graph = diamond(Arc::new(AtomicUsize::new(0)));
    let ctx = json!({"seed": 1.0});
    let mut resolver = graph.resolver(&ctx);
    resolver.get("c").expect("c");
    assert_eq!(resolver.compute_order(), ["d", "a", "b", "c"].map(String::from));
}

fn mutual() -> FactGraph<Value> {
    FactGraph::from_nodes([
        Node::new("x", |_: &Value, get| get.get("y")),
        Node::new("y", |_: &Value, get| get.get("x")),
    ])
    .expect("mutual graph")
}

#[test]
fn mutual_recursion_is_a_cycle_from_either_side() {
    let graph = mutual();

    let err = graph.resolve(&Value::Null, ["x"]).unwrap_err();
    assert!(matches!(err, GraphError::CyclicDependency { ref path } if path == &["x", "y", "x"]));

    let err = graph.resolve(&Value::Null, ["y"]).unwrap_err();
    assert_eq!(err.to_string(), "cyclic dependency: y -> x -> y");
}

#[test]
fn undeclared_root_is_not_found() {
    let graph = mutual();
    let err = graph.resolve(&Value::Null, ["z"]).unwrap_err();
    assert!(matches!(
        err,
        GraphError::NodeNotFound { ref id, requested_by: None } if id == "z"
    ));
}

fn element_rules() -> RuleSet {
    RuleSet::from_json_value(json!({
        "id": "elements.adjust",
        "version": "1",
        "rules": [
            {"id": "summer", "when": {"op": "eq", "args": [{"var": "season"}, "summer"]}, "score": {"fire": 2}},
            {"id": "wet", "when": {"op": "in", "args": ["water", {"var": "elements"}]}, "score": {"water": 1}},
        ],
    }))
    .expect("rule set")
}

#[test]
fn compute_functions_run_rule_sets_over_upstream_facts() {
    let rules = Arc::new(element_rules());
    let graph = FactGraph::from_nodes([
        Node::new("season", |ctx: &Value, _| Ok(ctx["season"].clone())),
        Node::new("baseScores", |_: &Value, _| Ok(json!({"fire": 1.0, "water": 1.0}))),
        Node::new("elementScores", move |ctx: &Value, get| {
            let base: BTreeMap<String, f64> =
                serde_json::from_value(get.get("baseScores")?).map_err(|e| get.fail(e))?;
            let facts = json!({"season": get.get("season")?, "elements": ctx["elements"]});
            let result = evaluate_rule_set(&rules, &facts, Some(&base)).map_err(|e| get.fail(e))?;
            serde_json::to_value(result.scores).map_err(|e| get.fail(e))
        })
        .deps(["season", "baseScores"]),
    ])
    .expect("graph");

    let out = graph
        .resolve(&json!({"season": "summer", "elements": ["fire", "water"]}), ["elementScores"])
        .expect("resolve");
    assert_eq!(out["elementScores"], json!({"fire": 3.0, "water": 2.0}));
}

#[test]
fn compute_failures_are_attributed_to_their_node() {
    let graph = FactGraph::from_nodes([
        Node::new("broken", |_: &Value, get| {
            let parsed: Result<Vec<u8>, _> = serde_json::from_value(json!("not a list"));
            parsed.map(|_| Value::Null).map_err(|e| get.fail(e))
        }),
        Node::new("summary", |_: &Value, get| get.get("broken")),
    ])
    .expect("graph");

    let err = graph.resolve(&Value::Null, ["summary"]).unwrap_err();
    assert!(matches!(err, GraphError::Compute { ref node, .. } if node == "broken"));
}
