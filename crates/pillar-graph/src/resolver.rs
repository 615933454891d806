//! Fact graph and its memoized pull resolver.
//!
//! Resolution is demand-driven: asking for a node runs its compute
//! function, which pulls upstream values through [`Resolver::get`]. Each
//! run owns one memo table, so every node computes at most once per run
//! regardless of fan-in, and an in-progress stack turns accidental cycles
//! into [`GraphError::CyclicDependency`] instead of unbounded recursion.

use crate::error::{BoxError, GraphError};
use crate::node::{Node, NodeInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A declared dependency that names no node in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepFinding {
    pub node: String,
    pub missing_dep: String,
}

/// A set of named computation nodes.
#[derive(Debug)]
pub struct FactGraph<C> {
    nodes: BTreeMap<String, Node<C>>,
}

impl<C> Default for FactGraph<C> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<C> FactGraph<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node<C>>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert(node)?;
        }
        Ok(graph)
    }

    pub fn insert(&mut self, node: Node<C>) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateNode { id: node.id });
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn explain(&self, id: &str) -> Result<NodeInfo, GraphError> {
        self.nodes
            .get(id)
            .map(Node::info)
            .ok_or_else(|| GraphError::NodeNotFound {
                id: id.to_string(),
                requested_by: None,
            })
    }

    /// Declared deps that name undeclared nodes, in node-id order.
    ///
    /// Advisory only: resolution ignores declared deps entirely.
    pub fn lint_declared_deps(&self) -> Vec<DepFinding> {
        self.nodes
            .values()
            .flat_map(|node| {
                node.deps
                    .iter()
                    .filter(|dep| !self.nodes.contains_key(dep.as_str()))
                    .map(|dep| DepFinding {
                        node: node.id.clone(),
                        missing_dep: dep.clone(),
                    })
            })
            .collect()
    }

    /// Start a resolution run over `context` with an empty memo table.
    pub fn resolver<'g>(&'g self, context: &'g C) -> Resolver<'g, C> {
        Resolver {
            graph: self,
            context,
            memo: BTreeMap::new(),
            in_progress: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Resolve `roots` in one run and return their values keyed by id.
    pub fn resolve<I, S>(&self, context: &C, roots: I) -> Result<BTreeMap<String, Value>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolver = self.resolver(context);
        let mut out = BTreeMap::new();
        for root in roots {
            let id = root.as_ref();
            let value = resolver.get(id)?;
            out.insert(id.to_string(), value);
        }
        Ok(out)
    }
}

/// One resolution run: a memo table plus the stack of nodes being computed.
pub struct Resolver<'g, C> {
    graph: &'g FactGraph<C>,
    context: &'g C,
    memo: BTreeMap<String, Value>,
    in_progress: Vec<String>,
    order: Vec<String>,
}

impl<'g, C> Resolver<'g, C> {
    pub fn context(&self) -> &'g C {
        self.context
    }

    /// The memoized value of `id`, computing it on first request.
    pub fn get(&mut self, id: &str) -> Result<Value, GraphError> {
        if let Some(value) = self.memo.get(id) {
            tracing::trace!(node = id, "fact graph memo hit");
            return Ok(value.clone());
        }

        let graph = self.graph;
        let node = graph
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound {
                id: id.to_string(),
                requested_by: self.in_progress.last().cloned(),
            })?;

        if let Some(start) = self.in_progress.iter().position(|active| active == id) {
            let mut path = self.in_progress[start..].to_vec();
            path.push(id.to_string());
            tracing::warn!(cycle = %path.join(" -> "), "cyclic fact dependency");
            return Err(GraphError::CyclicDependency { path });
        }

        let context = self.context;
        self.in_progress.push(id.to_string());
        let computed = (node.compute)(context, self);
        self.in_progress.pop();
        let value = computed?;

        tracing::debug!(node = id, depth = self.in_progress.len(), "fact computed");
        self.order.push(id.to_string());
        self.memo.insert(id.to_string(), value.clone());
        Ok(value)
    }

    /// Pre-populate the memo so `id` resolves to `value` without running
    /// a compute function. The id need not be declared in the graph.
    pub fn seed(&mut self, id: impl Into<String>, value: Value) {
        self.memo.insert(id.into(), value);
    }

    /// Wrap an error raised inside a compute function, attributing it to
    /// the node currently being computed.
    ///
    /// Only meaningful from inside a compute function. Called between
    /// `get`s, no node is in progress and the error's `node` is empty.
    pub fn fail(&self, source: impl Into<BoxError>) -> GraphError {
        GraphError::compute(
            self.in_progress.last().cloned().unwrap_or_default(),
            source,
        )
    }

    /// Node ids whose compute functions ran, in completion order.
    pub fn compute_order(&self) -> &[String] {
        &self.order
    }

    pub fn memo(&self) -> &BTreeMap<String, Value> {
        &self.memo
    }

    pub fn into_memo(self) -> BTreeMap<String, Value> {
        self.memo
    }
}
