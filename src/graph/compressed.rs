//! Compact weighted adjacency used by community detection

use crate::graph::NetworkGraph;
use std::collections::{BTreeMap, HashMap};

/// Compressed sparse representation of an undirected weighted graph.
///
/// Every edge is stored in both endpoint rows. Self-loops are kept apart in
/// `loops` because aggregated graphs fold intra-community weight into them.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] defines the neighbor range for node i
    pub offsets: Vec<u32>,

    /// Concatenated neighbor lists
    pub edges: Vec<u32>,

    /// Weight of each entry in `edges`
    pub weights: Vec<f64>,

    /// Self-loop weight per node
    pub loops: Vec<f64>,

    /// Node keys when built from a `NetworkGraph`
    pub node_ids: Option<Vec<String>>,
}

impl CompressedGraph {
    /// Build from per-node neighbor maps (must be symmetric)
    fn from_adjacency(adjacency: Vec<BTreeMap<u32, f64>>, loops: Vec<f64>) -> Self {
        let node_count = adjacency.len();
        let edge_count: usize = adjacency.iter().map(|list| list.len()).sum();

        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut edges = Vec::with_capacity(edge_count);
        let mut weights = Vec::with_capacity(edge_count);
        offsets.push(0);

        let mut offset = 0;
        for list in adjacency {
            offset += list.len() as u32;
            offsets.push(offset);
            for (target, weight) in list {
                edges.push(target);
                weights.push(weight);
            }
        }

        Self {
            node_count,
            offsets,
            edges,
            weights,
            loops,
            node_ids: None,
        }
    }

    /// Compress a network graph; node order follows the graph's index order
    pub fn from_network(graph: &NetworkGraph) -> Self {
        let mut position = HashMap::with_capacity(graph.node_count());
        let mut node_ids = Vec::with_capacity(graph.node_count());
        for (pos, (idx, node)) in graph.nodes().enumerate() {
            position.insert(idx, pos as u32);
            node_ids.push(node.key.clone());
        }

        let mut adjacency = vec![BTreeMap::new(); node_ids.len()];
        let mut loops = vec![0.0; node_ids.len()];
        for (a, b, edge) in graph.edges() {
            let (pa, pb) = (position[&a], position[&b]);
            if pa == pb {
                loops[pa as usize] += edge.weight;
            } else {
                *adjacency[pa as usize].entry(pb).or_insert(0.0) += edge.weight;
                *adjacency[pb as usize].entry(pa).or_insert(0.0) += edge.weight;
            }
        }

        let mut compressed = Self::from_adjacency(adjacency, loops);
        compressed.node_ids = Some(node_ids);
        compressed
    }

    /// Collapse each community into one node; intra-community weight becomes a self-loop
    pub fn aggregate(&self, membership: &[usize], community_count: usize) -> Self {
        let mut adjacency = vec![BTreeMap::new(); community_count];
        let mut loops = vec![0.0; community_count];

        for node in 0..self.node_count {
            let cu = membership[node];
            loops[cu] += self.loops[node];
            for (target, weight) in self.neighbors(node) {
                let cv = membership[target as usize];
                if cu == cv {
                    // seen once from each endpoint
                    loops[cu] += weight / 2.0;
                } else {
                    *adjacency[cu].entry(cv as u32).or_insert(0.0) += weight;
                }
            }
        }

        Self::from_adjacency(adjacency, loops)
    }

    /// Neighbors of a node with edge weights, excluding the self-loop
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (u32, f64)> + '_ {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        self.edges[start..end]
            .iter()
            .copied()
            .zip(self.weights[start..end].iter().copied())
    }

    /// Get number of distinct neighbors of a node
    pub fn out_degree(&self, node: usize) -> usize {
        (self.offsets[node + 1] - self.offsets[node]) as usize
    }

    /// Weighted degree; a self-loop counts twice
    pub fn weighted_degree(&self, node: usize) -> f64 {
        self.neighbors(node).map(|(_, w)| w).sum::<f64>() + 2.0 * self.loops[node]
    }

    /// Sum of all edge weights, each edge counted once
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum::<f64>() / 2.0 + self.loops.iter().sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::book;
    use crate::graph::Edge;

    fn triangle_with_tail() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        let n: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| graph.add_node(book(id))).collect();
        graph.add_edge(n[0], n[1], Edge::weighted(1.0));
        graph.add_edge(n[1], n[2], Edge::weighted(2.0));
        graph.add_edge(n[0], n[2], Edge::weighted(3.0));
        graph.add_edge(n[2], n[3], Edge::weighted(0.5));
        graph
    }

    #[test]
    fn compression_keeps_symmetric_weights() {
        let csr = CompressedGraph::from_network(&triangle_with_tail());
        assert_eq!(csr.node_count, 4);
        assert_eq!(csr.edges.len(), 8);
        assert_eq!(csr.out_degree(2), 3);
        assert_eq!(csr.weighted_degree(2), 5.5);
        assert_eq!(csr.total_weight(), 6.5);
        assert_eq!(csr.node_ids.as_ref().unwrap()[3], "book_d");
    }

    #[test]
    fn aggregation_preserves_total_weight() {
        let csr = CompressedGraph::from_network(&triangle_with_tail());
        let coarse = csr.aggregate(&[0, 0, 0, 1], 2);

        assert_eq!(coarse.node_count, 2);
        assert_eq!(coarse.loops, vec![6.0, 0.0]);
        assert_eq!(coarse.neighbors(0).collect::<Vec<_>>(), vec![(1, 0.5)]);
        assert_eq!(coarse.total_weight(), csr.total_weight());
        assert_eq!(coarse.weighted_degree(0), 12.5);
    }
}
