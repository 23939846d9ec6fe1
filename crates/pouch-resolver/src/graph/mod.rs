//! Resolved dependency graph using petgraph
//!
//! The analysis walk tolerates cycles by deduplicating names; this graph is
//! the after-the-fact view of what it found, used to report cycles and
//! graph size once a phase has drained.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use pouch_core::types::{Analysis, PackageIdentity};

/// Directed graph of resolved packages, one node per package name
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    /// Edge weights are the declared ranges
    graph: DiGraph<PackageIdentity, String>,
    node_map: HashMap<String, NodeIndex>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from analysis results; edges to names that were never resolved
    /// (excluded or failed packages) are left out
    pub fn from_analyses<'a>(analyses: impl IntoIterator<Item = &'a Analysis>) -> Self {
        let analyses: Vec<&Analysis> = analyses.into_iter().collect();
        let mut graph = Self::new();

        for analysis in &analyses {
            graph.add_package(analysis.identity());
        }
        for analysis in &analyses {
            for (name, range) in &analysis.package.dependencies {
                graph.add_dependency(&analysis.package.name, name, range);
            }
        }
        graph
    }

    /// Add a package, returning the existing node if the name is known
    pub fn add_package(&mut self, identity: PackageIdentity) -> NodeIndex {
        if let Some(existing) = self.node_map.get(&identity.name) {
            return *existing;
        }
        let name = identity.name.clone();
        let index = self.graph.add_node(identity);
        self.node_map.insert(name, index);
        index
    }

    /// Add `from -> to`; returns false when either end is unknown
    pub fn add_dependency(&mut self, from: &str, to: &str, range: &str) -> bool {
        match (self.node_map.get(from), self.node_map.get(to)) {
            (Some(&from_index), Some(&to_index)) => {
                self.graph.add_edge(from_index, to_index, range.to_string());
                true
            },
            _ => false,
        }
    }

    pub fn get_package(&self, name: &str) -> Option<&PackageIdentity> {
        let index = self.node_map.get(name)?;
        self.graph.node_weight(*index)
    }

    pub fn packages(&self) -> impl Iterator<Item = &PackageIdentity> {
        self.graph.node_weights()
    }

    pub fn package_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Every cycle as the sorted names of its strongly connected component,
    /// including packages that depend on themselves
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.contains_edge(*single, *single),
                _ => true,
            })
            .map(|component| {
                let mut names: Vec<String> = component
                    .into_iter()
                    .filter_map(|index| self.graph.node_weight(index))
                    .map(|identity| identity.name.clone())
                    .collect();
                names.sort();
                names
            })
            .collect();
        cycles.sort();
        cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }

    /// Format cycle as "a -> b -> a"
    pub fn format_cycle(cycle: &[String]) -> String {
        match cycle.first() {
            Some(first) => {
                let mut names: Vec<&str> = cycle.iter().map(String::as_str).collect();
                names.push(first);
                names.join(" -> ")
            },
            None => "No cycle".to_string(),
        }
    }
}
