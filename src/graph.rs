//! Dependency graph module.
//!
//! Provides the `DependencyGraph` type, which records which attributes
//! were read while computing which other attributes. Edges are discovered
//! during resolution (derived modifiers and conditional comparisons), not
//! declared up front. Invalidation stays coarse; the graph is cleared
//! together with the attribute store and serves introspection.

use crate::error::RuleError;
use crate::ids::AttributeId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// A directed graph of discovered attribute dependencies.
///
/// An edge runs from a dependency to its dependent: if Armor Class reads
/// Dexterity, the edge is `Dexterity -> Armor Class`.
///
/// # Examples
///
/// ```rust
/// use ruleforge::graph::DependencyGraph;
/// use ruleforge::AttributeId;
///
/// let mut graph = DependencyGraph::new();
/// let dex = AttributeId::from_str("Dexterity");
/// let ac = AttributeId::from_str("Armor Class");
///
/// graph.add_dependency(ac.clone(), dex.clone());
///
/// assert_eq!(graph.dependencies_of(&ac), vec![dex.clone()]);
/// assert_eq!(graph.dependents_of(&dex), vec![ac]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<AttributeId, ()>,
    node_map: HashMap<AttributeId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph if it doesn't exist.
    pub fn add_node(&mut self, id: AttributeId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            idx
        } else {
            let idx = self.graph.add_node(id.clone());
            self.node_map.insert(id, idx);
            idx
        }
    }

    /// Record that `dependent` read `dependency`. Repeated edges are ignored.
    pub fn add_dependency(&mut self, dependent: AttributeId, dependency: AttributeId) {
        let from_idx = self.add_node(dependency);
        let to_idx = self.add_node(dependent);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn contains_node(&self, id: &AttributeId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Attributes `id` read directly, in discovery order.
    pub fn dependencies_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        self.direct(id, Direction::Incoming)
    }

    /// Every attribute that transitively read `id`, excluding `id` itself.
    pub fn dependents_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                found.push(self.graph[idx].clone());
            }
        }
        found
    }

    /// Every attribute `id` transitively read, excluding `id` itself.
    pub fn transitive_dependencies_of(&self, id: &AttributeId) -> Vec<AttributeId> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.graph);
        let mut dfs = Dfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(idx) = dfs.next(reversed) {
            if idx != start {
                found.push(self.graph[idx].clone());
            }
        }
        found
    }

    fn direct(&self, id: &AttributeId, direction: Direction) -> Vec<AttributeId> {
        let Some(&idx) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut found: Vec<_> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        // petgraph walks neighbours newest-first
        found.reverse();
        found
    }

    /// Order in which the recorded attributes can be computed, dependencies first.
    pub fn resolution_order(&self) -> Result<Vec<AttributeId>, RuleError> {
        if let Some(path) = self.find_cycle() {
            return Err(RuleError::Cycle { path });
        }
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|idx| self.graph[idx].clone()).collect())
            .map_err(|cycle| RuleError::Cycle {
                path: vec![self.graph[cycle.node_id()].clone()],
            })
    }

    /// Find a cycle, returned as a closed path `[A, B, A]`.
    pub fn find_cycle(&self) -> Option<Vec<AttributeId>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        for node in self.graph.node_indices() {
            if !visited.contains(&node) {
                let mut path = Vec::new();
                if let Some(cycle) = self.dfs_cycle(node, &mut visited, &mut on_stack, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<AttributeId>> {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&next) {
                if let Some(cycle) = self.dfs_cycle(next, visited, on_stack, path) {
                    return Some(cycle);
                }
            } else if on_stack.contains(&next) {
                let start = path.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<_> = path[start..].iter().map(|&n| self.graph[n].clone()).collect();
                cycle.push(self.graph[next].clone());
                return Some(cycle);
            }
        }

        on_stack.remove(&node);
        path.pop();
        None
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.node_map.clear();
    }
}
