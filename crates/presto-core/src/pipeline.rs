//! The pipeline DAG: a pure in-memory graph over node names, rooted at
//! a synthetic `root`. Construction from YAML documents lives in
//! `presto-runbook`; this module only knows about graph algorithms:
//! cycle enumeration, transitive reduction ("thinning"), and the
//! topological walk, grounded on `PipelineOrchestrator::topological_sort`/
//! `topo_visit`'s recursive visited-map pattern, generalized to also
//! detect cycles and thin redundant edges.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::node::{Node, ROOT_NAME};

/// A directed acyclic graph of [`Node`]s, transitively reduced.
#[derive(Debug, Clone)]
pub struct Pipeline {
    nodes: HashMap<String, Node>,
    /// child -> set of immediate parents, after thinning.
    edges: HashMap<String, HashSet<String>>,
}

impl Pipeline {
    /// Build a pipeline from an already-assembled node map (including
    /// `root`) and its declared parent edges (pre-thinning). Runs
    /// cycle detection, then transitive reduction.
    pub fn new(nodes: HashMap<String, Node>, declared_edges: HashMap<String, HashSet<String>>) -> Result<Self> {
        let mut pipeline = Self {
            nodes,
            edges: declared_edges,
        };
        let cycles = pipeline.simple_cycles();
        if !cycles.is_empty() {
            return Err(Error::CyclicPipeline(cycles));
        }
        pipeline.thin();
        Ok(pipeline)
    }

    pub fn root(&self) -> &Node {
        self.nodes.get(ROOT_NAME).expect("root node always present")
    }

    pub fn nodes(&self) -> &HashMap<String, Node> {
        &self.nodes
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Immediate parents of `name` after thinning.
    pub fn parents_of(&self, name: &str) -> &HashSet<String> {
        static EMPTY: std::sync::OnceLock<HashSet<String>> = std::sync::OnceLock::new();
        self.edges.get(name).unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    fn children_of<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> {
        self.edges
            .iter()
            .filter(move |(_, parents)| parents.contains(name))
            .map(|(child, _)| child.as_str())
    }

    /// All nodes reachable from `name` by following edges forward
    /// (excluding `name` itself).
    fn descendants(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(cur) = stack.pop() {
            for child in self.children_of(&cur) {
                if seen.insert(child.to_string()) {
                    stack.push(child.to_string());
                }
            }
        }
        seen
    }

    /// All nodes that can reach `name` by following edges backward
    /// (excluding `name` itself).
    pub fn ancestors(&self, name: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(cur) = stack.pop() {
            for parent in self.parents_of(&cur).clone() {
                if seen.insert(parent.clone()) {
                    stack.push(parent);
                }
            }
        }
        seen
    }

    /// Enumerate all simple cycles in the graph (empty if acyclic).
    fn simple_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut stack: Vec<String> = Vec::new();
        let mut on_stack: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();

        let mut names: Vec<&String> = self.nodes.keys().collect();
        names.sort();
        for start in names {
            if !visited.contains(start) {
                self.visit_for_cycles(start, &mut stack, &mut on_stack, &mut visited, &mut cycles);
            }
        }
        cycles
    }

    fn visit_for_cycles(
        &self,
        name: &str,
        stack: &mut Vec<String>,
        on_stack: &mut HashSet<String>,
        visited: &mut HashSet<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(name.to_string());
        stack.push(name.to_string());
        on_stack.insert(name.to_string());

        let mut children: Vec<String> = self.children_of(name).map(String::from).collect();
        children.sort();
        for child in children {
            if on_stack.contains(&child) {
                let start = stack.iter().position(|n| n == &child).unwrap();
                cycles.push(stack[start..].to_vec());
            } else if !visited.contains(&child) {
                self.visit_for_cycles(&child, stack, on_stack, visited, cycles);
            }
        }

        stack.pop();
        on_stack.remove(name);
    }

    /// Transitive reduction: drop `parent -> n` whenever some other
    /// parent of `n` already has `parent` as an ancestor.
    fn thin(&mut self) {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        for n in &names {
            let parents: Vec<String> = {
                let mut p: Vec<String> = self.edges.get(n).cloned().unwrap_or_default().into_iter().collect();
                p.sort();
                p
            };
            let mut to_remove = Vec::new();
            for cur_p in &parents {
                for other_p in &parents {
                    if cur_p == other_p {
                        continue;
                    }
                    if self.ancestors(other_p).contains(cur_p) {
                        to_remove.push(cur_p.clone());
                        break;
                    }
                }
            }
            if let Some(set) = self.edges.get_mut(n) {
                for r in to_remove {
                    set.remove(&r);
                }
            }
        }
    }

    /// Descendants of `start` in topological order (not including
    /// `start` itself). Ties are broken by lexicographic node name so
    /// a walk is deterministic from run to run.
    pub fn walk(&self, start: &str) -> Vec<&Node> {
        let descendants = self.descendants(start);
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for d in &descendants {
            let count = self
                .parents_of(d)
                .iter()
                .filter(|p| descendants.contains(*p) || p.as_str() == start)
                .count();
            in_degree.insert(d.as_str(), count);
        }

        let mut ready: Vec<&str> = in_degree
            .iter()
            .filter(|(_, c)| **c == 0)
            .map(|(n, _)| *n)
            .collect();
        ready.sort();

        let mut order = Vec::new();
        let mut remaining = in_degree;
        while let Some(next) = {
            ready.sort();
            if ready.is_empty() { None } else { Some(ready.remove(0)) }
        } {
            order.push(next);
            for child in self.children_of(next) {
                if let Some(c) = remaining.get_mut(child) {
                    *c -= 1;
                    if *c == 0 {
                        ready.push(child);
                    }
                }
            }
        }

        order.into_iter().filter_map(|n| self.nodes.get(n)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            description: name.to_string(),
            scope: crate::scope::Scope::new("s", "s", vec![]),
            cmd: vec![],
            parents: Default::default(),
            workers_modifier: 1.0,
            precomputed_argvs: Default::default(),
        }
    }

    fn edges(pairs: &[(&str, &str)]) -> (HashMap<String, Node>, HashMap<String, HashSet<String>>) {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_NAME.to_string(), Node::root());
        let mut edge_map: HashMap<String, HashSet<String>> = HashMap::new();
        for (parent, child) in pairs {
            nodes.entry(child.to_string()).or_insert_with(|| node(child));
            nodes.entry(parent.to_string()).or_insert_with(|| node(parent));
            edge_map.entry(child.to_string()).or_default().insert(parent.to_string());
        }
        (nodes, edge_map)
    }

    #[test]
    fn detects_cycle() {
        let (nodes, edge_map) = edges(&[("A", "B"), ("B", "A")]);
        let err = Pipeline::new(nodes, edge_map).unwrap_err();
        assert!(matches!(err, Error::CyclicPipeline(_)));
    }

    #[test]
    fn thinning_removes_redundant_edges() {
        // A->B, A->C, B->C, A->D, C->D, B->D
        let (nodes, edge_map) = edges(&[
            ("A", "B"),
            ("A", "C"),
            ("B", "C"),
            ("A", "D"),
            ("C", "D"),
            ("B", "D"),
        ]);
        let pipeline = Pipeline::new(nodes, edge_map).unwrap();
        assert_eq!(pipeline.parents_of("B"), &HashSet::from(["A".to_string()]));
        assert_eq!(pipeline.parents_of("C"), &HashSet::from(["B".to_string()]));
        assert_eq!(pipeline.parents_of("D"), &HashSet::from(["C".to_string()]));
    }

    #[test]
    fn topological_walk_respects_ancestors() {
        let (nodes, edge_map) = edges(&[(ROOT_NAME, "A"), ("A", "B"), ("B", "C")]);
        let pipeline = Pipeline::new(nodes, edge_map).unwrap();
        let order: Vec<&str> = pipeline.walk(ROOT_NAME).iter().map(|n| n.name.as_str()).collect();
        let pos_a = order.iter().position(|n| *n == "A").unwrap();
        let pos_b = order.iter().position(|n| *n == "B").unwrap();
        let pos_c = order.iter().position(|n| *n == "C").unwrap();
        assert!(pos_a < pos_b);
        assert!(pos_b < pos_c);
    }
}
