//! Projection of the bipartite network onto one node class

use crate::config::ProjectionMethod;
use crate::error::Result;
use crate::graph::{Edge, NetworkGraph, NodeClass};
use itertools::Itertools;
use petgraph::stable_graph::NodeIndex;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Co-occurrence totals for one pair of projected nodes
#[derive(Debug, Clone, Copy, Default)]
struct PairTally {
    shared: usize,
    collaboration: f64,
}

/// Project a bipartite graph onto the nodes of `target`.
///
/// Two target nodes are linked only when they share at least one neighbor;
/// the edge weight follows `method`. Every target node is kept, including
/// those left without edges.
pub fn project_graph(
    graph: &NetworkGraph,
    target: NodeClass,
    method: ProjectionMethod,
) -> Result<NetworkGraph> {
    log::info!("Projecting graph onto {} nodes with {} method", target.name(), method);

    graph.validate_bipartite()?;

    let mut projected = NetworkGraph::new();
    let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for (idx, node) in graph.nodes().filter(|(_, node)| node.class() == target) {
        let mut node = node.clone();
        node.community = None;
        mapping.insert(idx, projected.add_node(node));
    }

    let mut tallies: BTreeMap<(NodeIndex, NodeIndex), PairTally> = BTreeMap::new();
    for (pivot, _) in graph.nodes().filter(|(_, node)| node.class() != target) {
        let members: Vec<NodeIndex> = graph
            .incident(pivot)
            .map(|(other, _)| other)
            .sorted()
            .dedup()
            .collect();
        if members.len() < 2 {
            continue;
        }

        let share = 1.0 / (members.len() - 1) as f64;
        for (u, v) in members.iter().copied().tuple_combinations() {
            let tally = tallies.entry((u, v)).or_default();
            tally.shared += 1;
            tally.collaboration += share;
        }
    }

    let neighborhood: HashMap<NodeIndex, usize> = mapping
        .keys()
        .map(|&idx| (idx, graph.incident(idx).map(|(other, _)| other).unique().count()))
        .collect();

    let weighted: Vec<(NodeIndex, NodeIndex, f64)> = tallies
        .into_par_iter()
        .map(|((u, v), tally)| {
            let weight = match method {
                ProjectionMethod::Count => tally.shared as f64,
                ProjectionMethod::Collaboration => tally.collaboration,
                ProjectionMethod::Overlap => {
                    let smaller = neighborhood[&u].min(neighborhood[&v]);
                    tally.shared as f64 / smaller as f64
                }
            };
            (u, v, weight)
        })
        .collect();

    for (u, v, weight) in weighted {
        projected.add_edge(mapping[&u], mapping[&v], Edge::weighted(weight));
    }

    log::info!(
        "Projected graph has {} nodes and {} edges",
        projected.node_count(),
        projected.edge_count()
    );
    Ok(projected)
}
