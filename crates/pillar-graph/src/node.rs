//! Fact-graph nodes.
//!
//! A node pairs an id with a compute function. Declared `deps`, `explain`,
//! and `formula` are documentation: the resolver never consults them, it
//! follows whatever ids the compute function actually requests.

use crate::error::GraphError;
use crate::resolver::Resolver;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Signature of a node's compute function.
///
/// Receives the run's context and the resolver, through which upstream
/// node values are pulled with [`Resolver::get`].
pub type ComputeFn<C> =
    dyn Fn(&C, &mut Resolver<'_, C>) -> Result<Value, GraphError> + Send + Sync;

pub struct Node<C> {
    pub id: String,
    pub deps: Vec<String>,
    pub explain: Option<String>,
    pub formula: Option<String>,
    pub(crate) compute: Box<ComputeFn<C>>,
}

impl<C> Node<C> {
    pub fn new<F>(id: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&C, &mut Resolver<'_, C>) -> Result<Value, GraphError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            deps: Vec::new(),
            explain: None,
            formula: None,
            compute: Box::new(compute),
        }
    }

    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn explain(mut self, text: impl Into<String>) -> Self {
        self.explain = Some(text.into());
        self
    }

    pub fn formula(mut self, text: impl Into<String>) -> Self {
        self.formula = Some(text.into());
        self
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            id: self.id.clone(),
            deps: self.deps.clone(),
            explain: self.explain.clone(),
            formula: self.formula.clone(),
        }
    }
}

impl<C> fmt::Debug for Node<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("deps", &self.deps)
            .field("explain", &self.explain)
            .field("formula", &self.formula)
            .finish_non_exhaustive()
    }
}

/// Serializable description of a node, without its compute function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub id: String,
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}
