//! # Pillar Graph
//!
//! Generic, memoized, pull-based dataflow over named computation nodes.
//!
//! A driver builds a [`FactGraph`], hands it a context, and asks for one or
//! more summary nodes. Each node's compute function pulls what it needs
//! from upstream through [`Resolver::get`]; what a compute function does
//! internally (project a field, do arithmetic, run a rule set) is opaque
//! to the resolver.
//!
//! ```
//! use pillar_graph::{FactGraph, Node};
//! use serde_json::{Value, json};
//!
//! let graph = FactGraph::from_nodes([
//!     Node::new("base", |ctx: &Value, _| Ok(ctx["base"].clone())),
//!     Node::new("doubled", |_: &Value, get| {
//!         let base = get.get("base")?.as_f64().unwrap_or(0.0);
//!         Ok(json!(base * 2.0))
//!     })
//!     .deps(["base"]),
//! ])
//! .unwrap();
//!
//! let out = graph.resolve(&json!({"base": 21.0}), ["doubled"]).unwrap();
//! assert_eq!(out["doubled"], json!(42.0));
//! ```

pub mod error;
pub mod node;
pub mod resolver;

pub use error::{BoxError, GraphError};
pub use node::{ComputeFn, Node, NodeInfo};
pub use resolver::{DepFinding, FactGraph, Resolver};
