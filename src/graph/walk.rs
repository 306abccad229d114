use std::collections::HashSet;

use super::{Child, NodeIndex, PackageGraph, PackageNode};
use crate::error::GraphError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Descend to the leaves instead of stopping at the first level
    pub recursive: bool,
    /// Follow edges that were handed down by another package
    pub include_indirect: bool,
    /// Visit every node at most once. Shared subtrees are entered only the
    /// first time they are reached.
    pub once: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry<'g> {
    /// Path from the walk's start to this node, inclusive
    pub stack: Vec<String>,
    pub node: NodeIndex,
    pub package: &'g PackageNode,
    pub direct: bool,
    pub origin: Option<&'g str>,
    /// 1 for children of the start node
    pub depth: usize,
    /// Whether this is the last sibling
    pub last: bool,
}

struct Frame<'g> {
    stack: Vec<String>,
    children: Vec<Child<'g>>,
    next: usize,
}

/// Lazy depth-first, pre-order walk below one node.
///
/// Children come in name order. Each call to [`PackageGraph::walk`] starts
/// from scratch; nothing is shared between walks.
pub struct Walk<'g> {
    graph: &'g PackageGraph,
    options: WalkOptions,
    frames: Vec<Frame<'g>>,
    /// Nodes of the frames, for cycle detection
    path: Vec<NodeIndex>,
    visited: HashSet<NodeIndex>,
}

impl PackageGraph {
    /// Walk the dependencies of `start`. `stack` is the path that led to
    /// `start` and prefixes every yielded stack.
    #[must_use]
    pub fn walk(&self, start: NodeIndex, stack: Vec<String>, options: WalkOptions) -> Walk<'_> {
        let mut visited = HashSet::new();
        if options.once {
            visited.insert(start);
        }

        Walk {
            graph: self,
            options,
            frames: vec![Frame {
                stack,
                children: self.children(start, options.include_indirect),
                next: 0,
            }],
            path: vec![start],
            visited,
        }
    }
}

impl<'g> Iterator for Walk<'g> {
    type Item = Result<WalkEntry<'g>, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.frames.len();
            let frame = self.frames.last_mut()?;

            let Some(child) = frame.children.get(frame.next).copied() else {
                self.frames.pop();
                self.path.pop();
                continue;
            };
            frame.next += 1;
            let last = frame.next == frame.children.len();

            if self.path.contains(&child.node) {
                let cycle = self
                    .path
                    .iter()
                    .map(|node| self.graph.node(*node).name.as_str())
                    .chain([child.name])
                    .collect::<Vec<_>>()
                    .join(" -> ");
                self.frames.clear();
                return Some(Err(GraphError::Integrity(format!("cycle: {cycle}"))));
            }

            if self.options.once && !self.visited.insert(child.node) {
                log::trace!("{} already visited", child.name);
                continue;
            }

            let mut stack = frame.stack.clone();
            stack.push(child.name.to_string());

            if self.options.recursive {
                self.frames.push(Frame {
                    stack: stack.clone(),
                    children: self.graph.children(child.node, self.options.include_indirect),
                    next: 0,
                });
                self.path.push(child.node);
            }

            return Some(Ok(WalkEntry {
                stack,
                node: child.node,
                package: self.graph.node(child.node),
                direct: child.direct,
                origin: child.origin,
                depth,
                last,
            }));
        }
    }
}
