//! The resolved package graph.
//!
//! Every distinct variant is exactly one node. Parents refer to it through
//! edges that say whether the dependency is declared by the parent itself
//! (`direct`) or was handed to it by another package (`origin`).

mod query;
mod walk;

pub use query::*;
pub use walk::*;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::PathBuf,
};

use petgraph::{
    algo::toposort,
    graph::{DiGraph, EdgeReference},
    visit::{EdgeFiltered, EdgeRef},
};

pub use petgraph::graph::NodeIndex;

use crate::{env::Env, error::GraphError, scm::ScmSpec, variant::VariantId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Name of the recipe this package was made from
    pub name: String,
    pub variant_id: VariantId,
    /// Fixed per recipe, never variant dependent
    pub meta_env: Env,
    pub checkout: CheckoutStep,
    /// Files the recipe was assembled from
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStep {
    /// Only covers what the checkout depends on, so variants that differ
    /// in build settings alone share it.
    pub variant_id: VariantId,
    pub scms: Vec<ScmSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub direct: bool,
    /// Why an indirect edge exists
    pub origin: Option<String>,
}

impl DepEdge {
    #[must_use]
    pub const fn direct() -> Self {
        Self {
            direct: true,
            origin: None,
        }
    }

    pub fn indirect(origin: impl Into<String>) -> Self {
        Self {
            direct: false,
            origin: Some(origin.into()),
        }
    }
}

/// An outgoing edge, seen from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Child<'g> {
    pub name: &'g str,
    pub node: NodeIndex,
    pub direct: bool,
    pub origin: Option<&'g str>,
}

#[derive(Debug, Clone)]
pub struct PackageGraph {
    graph: DiGraph<PackageNode, DepEdge>,
    roots: BTreeMap<String, NodeIndex>,
}

impl PackageGraph {
    #[must_use]
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    /// Root aliases, sorted by name.
    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeIndex)> {
        self.roots.iter().map(|(alias, node)| (alias.as_str(), *node))
    }

    #[must_use]
    pub fn root(&self, alias: &str) -> Option<NodeIndex> {
        self.roots.get(alias).copied()
    }

    /// # Panics
    ///
    /// - If `node` is not from this graph
    #[must_use]
    pub fn node(&self, node: NodeIndex) -> &PackageNode {
        &self.graph[node]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Children of `node` sorted by name, then origin.
    #[must_use]
    pub fn children(&self, node: NodeIndex, include_indirect: bool) -> Vec<Child<'_>> {
        let mut children: Vec<Child<'_>> = self
            .graph
            .edges(node)
            .filter(|edge| include_indirect || edge.weight().direct)
            .map(|edge| Child {
                name: &self.graph[edge.target()].name,
                node: edge.target(),
                direct: edge.weight().direct,
                origin: edge.weight().origin.as_deref(),
            })
            .collect();

        children.sort_by(|a, b| a.name.cmp(b.name).then_with(|| a.origin.cmp(&b.origin)));
        children
    }

    /// Checks the invariants every graph has to uphold.
    fn validate(&self) -> Result<(), GraphError> {
        let mut variants = HashMap::new();

        for node in self.graph.node_indices() {
            let package = &self.graph[node];

            if let Some(other) = variants.insert(package.variant_id, node) {
                return Err(GraphError::Integrity(format!(
                    "variant {} of {} appears twice (also as {})",
                    package.variant_id.short(),
                    package.name,
                    self.graph[other].name
                )));
            }

            let mut names = HashSet::new();
            for edge in self.graph.edges(node) {
                let child = &self.graph[edge.target()].name;
                if !names.insert(child) {
                    return Err(GraphError::Integrity(format!(
                        "{} has more than one dependency named {child}",
                        package.name
                    )));
                }
            }
        }

        let direct_only = EdgeFiltered::from_fn(&self.graph, |edge: EdgeReference<'_, DepEdge>| {
            edge.weight().direct
        });
        if let Err(cycle) = toposort(&direct_only, None) {
            return Err(GraphError::Integrity(format!(
                "direct dependencies of {} are cyclic",
                self.graph[cycle.node_id()].name
            )));
        }

        Ok(())
    }
}

/// Assembles a [`PackageGraph`] bottom-up. Nodes can't be changed once added.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<PackageNode, DepEdge>,
    roots: BTreeMap<String, NodeIndex>,
}

impl GraphBuilder {
    pub fn add_node(&mut self, package: PackageNode) -> NodeIndex {
        self.graph.add_node(package)
    }

    #[must_use]
    pub fn node(&self, node: NodeIndex) -> &PackageNode {
        &self.graph[node]
    }

    pub fn add_edge(&mut self, parent: NodeIndex, child: NodeIndex, edge: DepEdge) {
        self.graph.add_edge(parent, child, edge);
    }

    /// Outgoing edges of `node` as `(child, edge)` pairs, in insertion order.
    #[must_use]
    pub fn edges(&self, node: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges(node)
            .map(|edge| (edge.id(), edge.target(), edge.weight()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);

        edges
            .into_iter()
            .map(|(_, target, weight)| (target, weight))
            .collect()
    }

    pub fn add_root(&mut self, alias: impl Into<String>, node: NodeIndex) {
        self.roots.insert(alias.into(), node);
    }

    /// # Errors
    ///
    /// - A root points to a node that doesn't exist
    /// - Any graph invariant is violated (duplicate variants, duplicate child
    ///   names, cyclic direct dependencies)
    pub fn build(self) -> Result<PackageGraph, GraphError> {
        if let Some((alias, _)) = self
            .roots
            .iter()
            .find(|(_, node)| self.graph.node_weight(**node).is_none())
        {
            return Err(GraphError::Integrity(format!("root {alias} is dangling")));
        }

        let graph = PackageGraph {
            graph: self.graph,
            roots: self.roots,
        };
        graph.validate()?;

        Ok(graph)
    }
}
