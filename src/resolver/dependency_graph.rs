//! Whole-store dependency graph.
//!
//! The composer discovers dependencies lazily, one top-level call at a time.
//! This graph instead indexes every declared function up front; `validate`
//! uses it to report dangling references and cycles across the whole store,
//! `tree` uses it to print dependency hierarchies and `list` to show which
//! functions reference each one.
//!
//! Only the raw `code` field is read, so building the graph needs no
//! parameters.

use anyhow::Result;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::definition::DefinitionStore;
use crate::references;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// A reference to a name no definition file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Function whose code contains the reference
    pub from: String,
    /// Undeclared name
    pub to: String,
}

/// Directed graph of function names; an edge `a → b` means `a` references `b`.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
    dangling: Vec<DanglingReference>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every definition in `store` and the references in its code.
    ///
    /// References to undeclared names are not added as nodes; they are kept
    /// as [`DanglingReference`]s.
    ///
    /// # Errors
    ///
    /// Returns an error if a definition file cannot be read or parsed.
    pub fn from_store(store: &DefinitionStore) -> Result<Self> {
        let mut graph = Self::new();
        for name in store.names() {
            graph.ensure_node(&name);
        }

        for name in store.names() {
            let value = store.load_value(&name)?;
            let code = value.get("code").and_then(serde_yaml::Value::as_str).unwrap_or_default();
            for dependency in references::extract(code) {
                if store.contains(&dependency) {
                    graph.add_dependency(&name, &dependency);
                } else {
                    graph.dangling.push(DanglingReference {
                        from: name.clone(),
                        to: dependency,
                    });
                }
            }
        }

        tracing::debug!(
            "Built dependency graph: {} functions, {} references",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `from` references `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// References to undeclared names found while building from a store.
    #[must_use]
    pub fn dangling_references(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Every cycle reachable by the DFS, one per back edge, each closed by
    /// repeating its first name.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|node| (node, Color::White)).collect();
        let mut path = Vec::new();
        let mut cycles = Vec::new();

        for node in self.graph.node_indices() {
            if matches!(colors.get(&node), Some(Color::White)) {
                self.dfs_visit(node, &mut colors, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.ordered_neighbors(node, Direction::Outgoing) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|n| *n == neighbor).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|idx| self.graph[*idx].clone()).collect();
                    cycle.push(self.graph[neighbor].clone());
                    cycles.push(cycle);
                }
                Some(Color::White) => self.dfs_visit(neighbor, colors, path, cycles),
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
    }

    /// Neighbors in edge insertion order (petgraph yields newest first).
    fn ordered_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<_> = self.graph.neighbors_directed(node, direction).collect();
        neighbors.reverse();
        neighbors
    }

    /// Functions whose code references `name` directly.
    #[must_use]
    pub fn direct_dependents(&self, name: &str) -> Vec<String> {
        self.related(name, Direction::Incoming)
    }

    fn related(&self, name: &str, direction: Direction) -> Vec<String> {
        self.node_map
            .get(name)
            .map(|&idx| {
                self.ordered_neighbors(idx, direction)
                    .into_iter()
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of functions.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct references between declared functions.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Functions nothing else references.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors_directed(idx, Direction::Incoming).next().is_none())
            .map(|idx| self.graph[idx].clone())
            .collect();
        roots.sort();
        roots
    }

    /// Human-readable tree rooted at `root`.
    ///
    /// With `invert`, children are the functions that reference their parent
    /// instead of the functions it references.
    #[must_use]
    pub fn to_tree_string(&self, root: &str, invert: bool) -> String {
        let direction = if invert {
            Direction::Incoming
        } else {
            Direction::Outgoing
        };
        let mut result = format!("{root}\n");
        let mut path = vec![root.to_string()];
        let children = self.related(root, direction);
        for (i, child) in children.iter().enumerate() {
            self.build_tree_string(
                child,
                direction,
                &mut result,
                "",
                i == children.len() - 1,
                &mut path,
            );
        }
        result
    }

    fn build_tree_string(
        &self,
        name: &str,
        direction: Direction,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        path: &mut Vec<String>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        if path.iter().any(|seen| seen == name) {
            result.push_str(&format!("{prefix}{connector}{name} (circular reference)\n"));
            return;
        }
        result.push_str(&format!("{prefix}{connector}{name}\n"));

        path.push(name.to_string());
        let children = self.related(name, direction);
        for (i, child) in children.iter().enumerate() {
            self.build_tree_string(
                child,
                direction,
                result,
                &child_prefix,
                i == children.len() - 1,
                path,
            );
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::DefinitionFixture;

    #[test]
    fn test_simple_dependency_chain() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("B", "C");

        assert!(graph.find_cycles().is_empty());
        assert_eq!(graph.roots(), vec!["A"]);
        assert_eq!(graph.direct_dependents("C"), vec!["B"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("B", "C");
        graph.add_dependency("C", "A");

        assert_eq!(graph.find_cycles(), vec![vec!["A", "B", "C", "A"]]);
        assert!(graph.roots().is_empty());
    }

    #[test]
    fn test_diamond_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("A", "C");
        graph.add_dependency("B", "D");
        graph.add_dependency("C", "D");

        assert!(graph.find_cycles().is_empty());
        assert_eq!(graph.roots(), vec!["A"]);
        assert_eq!(graph.direct_dependents("D"), vec!["B", "C"]);
        assert!(graph.direct_dependents("A").is_empty());
    }

    #[test]
    fn test_self_dependency() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "A");
        assert_eq!(graph.find_cycles(), vec![vec!["A".to_string(), "A".to_string()]]);
    }

    #[test]
    fn test_duplicate_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("A", "B");
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_tree_string() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("A", "C");
        graph.add_dependency("B", "D");

        assert_eq!(graph.to_tree_string("A", false), "A\n├── B\n│   └── D\n└── C\n");
        assert_eq!(graph.to_tree_string("D", true), "D\n└── B\n    └── A\n");
    }

    #[test]
    fn test_tree_marks_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("B", "A");
        assert_eq!(graph.to_tree_string("A", false), "A\n└── B\n    └── A (circular reference)\n");
    }

    #[test]
    fn test_from_store_records_dangling_references() {
        let fixture = DefinitionFixture::new();
        fixture.add_sql("c", "x");
        fixture.add_sql("b", r#"{{ ref("c") }}(x) + {{ ref("ghost") }}(x)"#);
        fixture.add_sql("a", r#"{{ ref("b") }}(x)"#);

        let graph = DependencyGraph::from_store(&fixture.store()).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.roots(), vec!["a"]);
        assert_eq!(
            graph.dangling_references(),
            &[DanglingReference {
                from: "b".to_string(),
                to: "ghost".to_string(),
            }]
        );
    }
}
