//! Generic dependency graph: creation/deletion orderings with cycle
//! detection.
//!
//! The graph is parametrized over any node kind that can enumerate its
//! dependencies and compare by identity ([`DependencyNode`]). Registration
//! order is preserved, duplicates are dropped, and when a dependency of a
//! registered node is itself equal to a registered node, the *registered
//! instance* is substituted before the edge is added — a registered instance
//! may carry caller-attached attributes (a captured wildcard-match value,
//! for example) that a freshly derived dependency reference would lack.
//!
//! Construction is explicit: [`DependencyGraph::build`] creates the vertex
//! and edge sets and runs cycle detection; [`DependencyGraph::invalidate`]
//! drops the cached build after the node set is mutated. Cycle detection is
//! fatal — no partial or best-effort ordering is ever produced.

use indexmap::IndexSet;
use std::fmt;
use std::hash::Hash;

use crate::error::{Result, TabflowError};

/// A node that can participate in the dependency graph.
///
/// Equality and hashing must be identity-like: two handles to the same
/// logical entity compare equal, and nothing else does.
pub trait DependencyNode: Clone + Eq + Hash {
    /// The nodes this node depends on (its parents).
    fn dependencies(&self) -> Vec<Self>;

    /// A human-readable name, used in cycle reports and diagnostics.
    fn node_name(&self) -> String;
}

/// Directed dependency graph over registered nodes.
pub struct DependencyGraph<N: DependencyNode> {
    registered: IndexSet<N>,
    include_external: bool,
    built: Option<BuiltGraph<N>>,
}

/// The vertex/edge sets produced by a build, exposed for diagnostics.
pub struct BuiltGraph<N: DependencyNode> {
    /// Vertices in insertion order.
    vertices: IndexSet<N>,
    /// Edges as (dependency, dependent) index pairs into `vertices`.
    edges: Vec<(usize, usize)>,
}

impl<N: DependencyNode> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: DependencyNode> DependencyGraph<N> {
    pub fn new() -> Self {
        Self {
            registered: IndexSet::new(),
            include_external: false,
            built: None,
        }
    }

    /// Register one node. A no-op when an equal node is already present.
    pub fn add_node(&mut self, node: N) -> &mut Self {
        self.registered.insert(node);
        self
    }

    /// Register several nodes, preserving their order.
    pub fn add_nodes(&mut self, nodes: impl IntoIterator<Item = N>) -> &mut Self {
        for node in nodes {
            self.add_node(node);
        }
        self
    }

    /// When true, dependencies of registered nodes are pulled into the graph
    /// (and expanded recursively) even if they are not themselves registered.
    /// When false, a dependency is only linked in when it also appears in the
    /// registered list.
    pub fn set_include_external_dependencies(&mut self, include: bool) -> &mut Self {
        self.include_external = include;
        self
    }

    /// Drop the cached build. Required after mutating the node set once a
    /// build has happened; orderings otherwise keep reflecting the old set.
    pub fn invalidate(&mut self) {
        self.built = None;
    }

    /// Build the vertex and edge sets and run cycle detection.
    ///
    /// Idempotent until [`invalidate`](Self::invalidate) is called.
    pub fn build(&mut self) -> Result<()> {
        if self.built.is_some() {
            return Ok(());
        }

        let mut vertices: IndexSet<N> = IndexSet::new();
        let mut edges: Vec<(usize, usize)> = Vec::new();

        for node in self.registered.clone() {
            self.insert_vertex(node, &mut vertices, &mut edges);
        }

        let built = BuiltGraph { vertices, edges };
        if let Some(node) = built.find_cycle_representative() {
            return Err(TabflowError::CycleDetected {
                node: node.node_name(),
            });
        }
        self.built = Some(built);
        Ok(())
    }

    /// Recursively insert `node` and its accepted dependencies, adding one
    /// dependency -> dependent edge per accepted dependency.
    fn insert_vertex(&self, node: N, vertices: &mut IndexSet<N>, edges: &mut Vec<(usize, usize)>) {
        let (node_idx, newly_inserted) = match vertices.get_index_of(&node) {
            Some(idx) => (idx, false),
            None => (vertices.insert_full(node.clone()).0, true),
        };
        if !newly_inserted {
            return;
        }
        for dependency in node.dependencies() {
            // Substitute the registered instance when one exists: it may
            // carry attributes the derived reference lacks.
            let dependency = match self.registered.get(&dependency) {
                Some(registered) => registered.clone(),
                None if !self.include_external => continue,
                None => dependency,
            };
            self.insert_vertex(dependency.clone(), vertices, edges);
            let dep_idx = vertices
                .get_index_of(&dependency)
                .expect("dependency was just inserted");
            edges.push((dep_idx, node_idx));
        }
    }

    /// The creation order: every node appears after all of its dependencies.
    ///
    /// Builds the graph first if needed.
    pub fn creation_order(&mut self) -> Result<Vec<N>> {
        self.build()?;
        let built = self.built.as_ref().expect("graph was just built");
        Ok(stabilize(built, built.topological_order()))
    }

    /// The deletion order: the exact reverse of the creation order.
    pub fn deletion_order(&mut self) -> Result<Vec<N>> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }

    /// The built graph, for diagnostics and visualization. Builds first if
    /// needed.
    pub fn snapshot(&mut self) -> Result<&BuiltGraph<N>> {
        self.build()?;
        Ok(self.built.as_ref().expect("graph was just built"))
    }
}

impl<N: DependencyNode> BuiltGraph<N> {
    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &N> {
        self.vertices.iter()
    }

    /// Edges as (dependency, dependent) node pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N)> {
        self.edges
            .iter()
            .map(|&(dep, node)| (&self.vertices[dep], &self.vertices[node]))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.vertices.len()];
        for &(_, dependent) in &self.edges {
            degrees[dependent] += 1;
        }
        degrees
    }

    /// Kahn's algorithm. Returns vertex indices, dependencies first; the
    /// ready queue is seeded and drained in insertion order so the result is
    /// deterministic.
    fn topological_order(&self) -> Vec<usize> {
        let mut in_degree = self.in_degrees();
        let mut ready: Vec<usize> = (0..self.vertices.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.vertices.len());
        let mut cursor = 0;
        while cursor < ready.len() {
            let current = ready[cursor];
            cursor += 1;
            order.push(current);
            for &(dep, dependent) in &self.edges {
                if dep == current {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }
        order
    }

    /// One node left with unresolved in-edges after a full Kahn pass, if the
    /// graph has a cycle.
    fn find_cycle_representative(&self) -> Option<&N> {
        let processed = self.topological_order();
        if processed.len() == self.vertices.len() {
            return None;
        }
        let mut remaining = self.in_degrees();
        for idx in processed {
            remaining[idx] = 0;
        }
        remaining
            .iter()
            .position(|&d| d > 0)
            .map(|idx| &self.vertices[idx])
    }
}

/// The inherited stabilization pass over the raw topological sequence.
///
/// A node with zero dependencies is appended directly. A node with at least
/// one dependency is held in a single-slot buffer: when the buffer is already
/// occupied, the buffered node and the current node are emitted as a pair, in
/// that order, and the buffer is cleared. Any node still buffered after the
/// walk is flushed. Client ordering assumptions depend on this literal
/// behavior; a plain topological order is not a drop-in replacement.
fn stabilize<N: DependencyNode>(built: &BuiltGraph<N>, raw: Vec<usize>) -> Vec<N> {
    let in_degree = built.in_degrees();
    let mut out: Vec<N> = Vec::with_capacity(raw.len());
    let mut buffer: Option<usize> = None;
    for idx in raw {
        if in_degree[idx] == 0 {
            out.push(built.vertices[idx].clone());
        } else if let Some(held) = buffer.take() {
            out.push(built.vertices[held].clone());
            out.push(built.vertices[idx].clone());
        } else {
            buffer = Some(idx);
        }
    }
    if let Some(held) = buffer {
        out.push(built.vertices[held].clone());
    }
    out
}

impl<N: DependencyNode> fmt::Display for BuiltGraph<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dependency graph: {} vertices, {} edges",
            self.vertices.len(),
            self.edges.len()
        )?;
        for (dep, node) in self.edges() {
            writeln!(f, "  {} -> {}", dep.node_name(), node.node_name())?;
        }
        Ok(())
    }
}
