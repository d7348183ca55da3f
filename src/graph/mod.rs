//! Graph representation and algorithms module

pub mod builder;
pub mod compressed;
pub mod projection;

pub use compressed::CompressedGraph;

use crate::error::{NetworkError, Result};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Genre marker recorded for books absent from the metadata store
pub const UNKNOWN_GENRE: &str = "Not in metadata store";

/// Sales rank exported for books absent from the metadata store
pub const UNKNOWN_SALES_RANK: i64 = -1;

/// The two sides of the reader/book network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    Reader,
    Book,
}

impl NodeClass {
    pub fn opposite(self) -> Self {
        match self {
            NodeClass::Reader => NodeClass::Book,
            NodeClass::Book => NodeClass::Reader,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeClass::Reader => "reader",
            NodeClass::Book => "book",
        }
    }
}

/// Book attributes filled from the metadata lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookAttrs {
    pub book_id: String,
    pub title: String,
    pub genres: Vec<String>,
    /// `None` when the metadata store has no entry for the book
    pub sales_rank: Option<i64>,
}

impl BookAttrs {
    /// Whether the genres and sales rank came from the metadata store
    pub fn has_metadata(&self) -> bool {
        self.sales_rank.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Reader {
        /// Dense sequential id assigned by the builder
        reader_id: u64,
        /// Id reported by the source platform
        source_id: String,
    },
    Book(BookAttrs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique key, e.g. `reader_3` or `book_1234`
    pub key: String,
    pub kind: NodeKind,
    /// Community id written by the labeler
    pub community: Option<usize>,
}

impl Node {
    pub fn reader(reader_id: u64, source_id: &str) -> Self {
        Self {
            key: format!("reader_{}", reader_id),
            kind: NodeKind::Reader {
                reader_id,
                source_id: source_id.to_string(),
            },
            community: None,
        }
    }

    pub fn book(attrs: BookAttrs) -> Self {
        Self {
            key: format!("book_{}", attrs.book_id),
            kind: NodeKind::Book(attrs),
            community: None,
        }
    }

    pub fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Reader { .. } => NodeClass::Reader,
            NodeKind::Book(_) => NodeClass::Book,
        }
    }

    /// Human-readable label: the title for books, the key otherwise
    pub fn label(&self) -> &str {
        match &self.kind {
            NodeKind::Book(attrs) if !attrs.title.is_empty() => &attrs.title,
            _ => &self.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub weight: f64,
    /// Reader rating, present on bipartite edges only
    pub rating: Option<u8>,
    /// Times the reader read the book, present on bipartite edges only
    pub read_count: Option<u32>,
}

impl Edge {
    pub fn weighted(weight: f64) -> Self {
        Self {
            weight,
            rating: None,
            read_count: None,
        }
    }

    pub fn rating(rating: u8, read_count: u32) -> Self {
        Self {
            weight: f64::from(rating),
            rating: Some(rating),
            read_count: Some(read_count),
        }
    }
}

/// Flat, order-preserving form of a graph used for persistence and comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<SnapshotEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEdge {
    pub source: String,
    pub target: String,
    pub edge: Edge,
}

/// Undirected attributed graph with nodes addressable by key
#[derive(Debug, Clone, Default)]
pub struct NetworkGraph {
    inner: StableUnGraph<Node, Edge>,
    index: HashMap<String, NodeIndex>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Insert a node, or return the existing index if the key is already present
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.key) {
            return idx;
        }
        let key = node.key.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Add an edge, replacing the attributes of an existing edge between the same nodes
    pub fn add_edge(&mut self, a: NodeIndex, b: NodeIndex, edge: Edge) -> EdgeIndex {
        self.inner.update_edge(a, b, edge)
    }

    pub fn node_index(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.inner.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.inner.node_weight_mut(idx)
    }

    pub fn node_by_key(&self, key: &str) -> Option<&Node> {
        self.node_index(key).and_then(|idx| self.node(idx))
    }

    /// Edge between two keyed nodes, if any
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&Edge> {
        let a = self.node_index(a)?;
        let b = self.node_index(b)?;
        let e = self.inner.find_edge(a, b)?;
        self.inner.edge_weight(e)
    }

    /// Nodes in ascending index order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> + '_ {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx).map(|node| (idx, node)))
    }

    /// Edges in ascending index order as `(source, target, edge)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Edge)> + '_ {
        self.inner.edge_indices().filter_map(move |e| {
            let (a, b) = self.inner.edge_endpoints(e)?;
            self.inner.edge_weight(e).map(|edge| (a, b, edge))
        })
    }

    /// Neighbors of a node together with the connecting edge
    pub fn incident(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Edge)> + '_ {
        self.inner.edges(idx).map(move |e| {
            let other = if e.source() == idx { e.target() } else { e.source() };
            (other, e.weight())
        })
    }

    /// Number of incident edges
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.inner.edges(idx).count()
    }

    /// Remove a node and all of its incident edges
    pub fn remove_node(&mut self, idx: NodeIndex) -> Option<Node> {
        let node = self.inner.remove_node(idx)?;
        self.index.remove(&node.key);
        Some(node)
    }

    /// Keep only the edges for which `keep` returns true; returns the number removed
    pub fn retain_edges<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Edge) -> bool,
    {
        let doomed: Vec<EdgeIndex> = self
            .inner
            .edge_indices()
            .filter(|&e| self.inner.edge_weight(e).map_or(false, |edge| !keep(edge)))
            .collect();
        for &e in &doomed {
            self.inner.remove_edge(e);
        }
        doomed.len()
    }

    /// Check that every edge joins a reader and a book
    pub fn validate_bipartite(&self) -> Result<()> {
        for (a, b, _) in self.edges() {
            let (na, nb) = match (self.node(a), self.node(b)) {
                (Some(na), Some(nb)) => (na, nb),
                _ => {
                    return Err(NetworkError::Structural(
                        "edge refers to a missing node".to_string(),
                    ))
                }
            };
            if na.class() == nb.class() {
                return Err(NetworkError::Structural(format!(
                    "edge {} -- {} joins two {} nodes; graph is not bipartite",
                    na.key,
                    nb.key,
                    na.class().name()
                )));
            }
        }
        Ok(())
    }

    pub fn to_snapshot(&self) -> GraphSnapshot {
        let nodes = self.nodes().map(|(_, node)| node.clone()).collect();
        let edges = self
            .edges()
            .map(|(a, b, edge)| SnapshotEdge {
                source: self.inner[a].key.clone(),
                target: self.inner[b].key.clone(),
                edge: edge.clone(),
            })
            .collect();
        GraphSnapshot { nodes, edges }
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = NetworkGraph::new();
        for node in snapshot.nodes {
            if graph.index.contains_key(&node.key) {
                return Err(NetworkError::Structural(format!(
                    "duplicate node key {} in snapshot",
                    node.key
                )));
            }
            graph.add_node(node);
        }
        for SnapshotEdge { source, target, edge } in snapshot.edges {
            match (graph.node_index(&source), graph.node_index(&target)) {
                (Some(a), Some(b)) => {
                    graph.inner.add_edge(a, b, edge);
                }
                _ => {
                    return Err(NetworkError::Structural(format!(
                        "snapshot edge {} -- {} refers to an unknown node",
                        source, target
                    )))
                }
            }
        }
        Ok(graph)
    }
}

impl PartialEq for NetworkGraph {
    fn eq(&self, other: &Self) -> bool {
        self.to_snapshot() == other.to_snapshot()
    }
}
