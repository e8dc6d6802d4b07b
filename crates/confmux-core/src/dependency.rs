//! Dependency graph and topological ordering for providers.
//!
//! Providers declare the names of the providers they depend on; the
//! repository sets them up in an order where every dependency finishes before
//! its dependents start. Edges point from dependent to dependency: if `yaml`
//! depends on `env`, the edge is `yaml -> env` and `env` sorts first.
//!
//! # Example
//!
//! ```
//! use confmux_core::dependency::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("yaml");
//! graph.add_node("env");
//! graph.add_edge("yaml", "env");
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["env", "yaml"]);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Error, Result};

/// Directed acyclic graph of provider names.
///
/// Nodes keep their insertion order, which breaks ties between providers that
/// do not depend on each other.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    /// Adjacency list: key depends on each value.
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing name again is a no-op.
    pub fn add_node(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.nodes.contains(&id) {
            self.edges.entry(id.clone()).or_default();
            self.nodes.push(id);
        }
    }

    /// Declare that `from` depends on `to`.
    ///
    /// `to` does not have to be a node yet; a dangling edge surfaces as
    /// [`Error::UnknownDependency`] when sorting.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let deps = self.edges.entry(from.to_string()).or_default();
        if !deps.iter().any(|d| d == to) {
            deps.push(to.to_string());
        }
    }

    /// Return the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Get the direct dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.edges
            .get(id)
            .map(|deps| deps.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Perform a topological sort using Kahn's algorithm.
    ///
    /// Returns names in dependency-first order. Among nodes that become ready
    /// at the same time, insertion order wins.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownDependency` if an edge targets a name that is not a node.
    /// - `Error::DependencyCycle` if the graph contains a cycle.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let known: HashSet<&str> = self.nodes.iter().map(String::as_str).collect();

        // In-degree here counts unmet dependencies of each node
        let mut pending: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for id in &self.nodes {
            let deps = self.dependencies_of(id);
            for dep in &deps {
                if !known.contains(dep) {
                    return Err(Error::UnknownDependency {
                        provider: id.clone(),
                        dependency: dep.to_string(),
                    });
                }
                dependents.entry(*dep).or_default().push(id.as_str());
            }
            pending.insert(id.as_str(), deps.len());
        }

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|id| pending[id] == 0)
            .collect();

        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(current) = queue.pop_front() {
            result.push(current.to_string());
            let Some(waiting) = dependents.get(current) else {
                continue;
            };
            for &dependent in waiting {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            let sorted: HashSet<&str> = result.iter().map(String::as_str).collect();
            let mut participants: Vec<String> = self
                .nodes
                .iter()
                .filter(|id| !sorted.contains(id.as_str()))
                .cloned()
                .collect();
            participants.sort();
            return Err(Error::DependencyCycle { participants });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.topological_sort().unwrap().is_empty());
    }

    #[test]
    fn test_linear_chain() {
        let mut graph = DependencyGraph::new();
        graph.add_node("yaml");
        graph.add_node("env");
        graph.add_node("default");
        graph.add_edge("yaml", "env");
        graph.add_edge("env", "default");

        assert_eq!(
            graph.topological_sort().unwrap(),
            vec!["default", "env", "yaml"]
        );
    }

    #[test]
    fn test_diamond_dependency() {
        let mut graph = DependencyGraph::new();
        for id in ["yaml", "cli", "env", "default"] {
            graph.add_node(id);
        }
        graph.add_edge("yaml", "cli");
        graph.add_edge("yaml", "env");
        graph.add_edge("cli", "default");
        graph.add_edge("env", "default");

        let sorted = graph.topological_sort().unwrap();
        assert_eq!(sorted.first().map(String::as_str), Some("default"));
        assert_eq!(sorted.last().map(String::as_str), Some("yaml"));
        // cli and env are independent, so insertion order decides
        assert_eq!(sorted[1], "cli");
        assert_eq!(sorted[2], "env");
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        let mut graph = DependencyGraph::new();
        graph.add_node("zebra");
        graph.add_node("alpha");
        graph.add_node("mid");
        assert_eq!(
            graph.topological_sort().unwrap(),
            vec!["zebra", "alpha", "mid"]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.add_node("c");
        graph.add_edge("a", "b");
        graph.add_edge("b", "a");

        match graph.topological_sort() {
            Err(Error::DependencyCycle { participants }) => {
                assert_eq!(participants, vec!["a", "b"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_node("yaml");
        graph.add_edge("yaml", "cli");

        assert!(matches!(
            graph.topological_sort(),
            Err(Error::UnknownDependency { ref provider, ref dependency })
                if provider == "yaml" && dependency == "cli"
        ));
    }

    #[test]
    fn test_duplicate_edges_are_collapsed() {
        let mut graph = DependencyGraph::new();
        graph.add_node("a");
        graph.add_node("b");
        graph.add_edge("a", "b");
        graph.add_edge("a", "b");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependencies_of("a"), vec!["b"]);
        assert!(graph.dependencies_of("b").is_empty());
    }
}
