//! Community labeling and edge pruning

use crate::cluster::Dendrogram;
use crate::error::{NetworkError, Result};
use crate::graph::NetworkGraph;

/// Label every node with its community at `level` and drop edges lighter than `edge_threshold`.
///
/// The threshold is exclusive: an edge is kept when `weight >= edge_threshold`.
pub fn label_graph(
    mut graph: NetworkGraph,
    dendrogram: &Dendrogram,
    level: usize,
    edge_threshold: f64,
) -> Result<NetworkGraph> {
    let partition = dendrogram.level(level)?;
    log::info!(
        "Labeling {} nodes with level {} ({} communities)",
        graph.node_count(),
        level,
        partition.community_count
    );

    let indices: Vec<_> = graph.nodes().map(|(idx, _)| idx).collect();
    for idx in indices {
        let Some(node) = graph.node_mut(idx) else {
            continue;
        };
        let community = partition.community_of(&node.key).ok_or_else(|| {
            NetworkError::Structural(format!("node {} has no community at level {}", node.key, level))
        })?;
        node.community = Some(community);
    }

    let removed = graph.retain_edges(|edge| edge.weight >= edge_threshold);
    log::info!(
        "Removed {} edges with weight below {}; {} edges remain",
        removed,
        edge_threshold,
        graph.edge_count()
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::PartitionLevel;
    use crate::graph::tests::book;
    use crate::graph::Edge;
    use std::collections::BTreeMap;

    fn weighted_path() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        let n: Vec<_> = ["a", "b", "c", "d"].iter().map(|id| graph.add_node(book(id))).collect();
        graph.add_edge(n[0], n[1], Edge::weighted(1.0));
        graph.add_edge(n[1], n[2], Edge::weighted(2.0));
        graph.add_edge(n[2], n[3], Edge::weighted(3.5));
        graph
    }

    fn dendrogram() -> Dendrogram {
        let fine: BTreeMap<String, usize> = [("book_a", 0), ("book_b", 0), ("book_c", 1), ("book_d", 2)]
            .iter()
            .map(|&(k, c)| (k.to_string(), c))
            .collect();
        let mut coarse = fine.clone();
        coarse.insert("book_d".to_string(), 1);
        Dendrogram {
            levels: vec![
                PartitionLevel { membership: fine, modularity: 0.1, community_count: 3 },
                PartitionLevel { membership: coarse, modularity: 0.2, community_count: 2 },
            ],
        }
    }

    #[test]
    fn threshold_is_exclusive_lower_bound() {
        let labeled = label_graph(weighted_path(), &dendrogram(), 0, 2.0).unwrap();
        assert_eq!(labeled.edge_count(), 2);
        assert!(labeled.edge_between("book_a", "book_b").is_none());
        assert!(labeled.edge_between("book_b", "book_c").is_some());
        assert!(labeled.edge_between("book_c", "book_d").is_some());
        assert_eq!(labeled.node_count(), 4);
    }

    #[test]
    fn nodes_get_level_communities() {
        let labeled = label_graph(weighted_path(), &dendrogram(), 1, 0.0).unwrap();
        assert_eq!(labeled.node_by_key("book_a").unwrap().community, Some(0));
        assert_eq!(labeled.node_by_key("book_d").unwrap().community, Some(1));
        assert_eq!(labeled.node_by_key("book_d").unwrap().label(), "Title d");
        assert_eq!(labeled.edge_count(), 3);
    }

    #[test]
    fn labeling_twice_is_idempotent() {
        let once = label_graph(weighted_path(), &dendrogram(), 0, 2.0).unwrap();
        let again = label_graph(weighted_path(), &dendrogram(), 0, 2.0).unwrap();
        let relabeled = label_graph(once.clone(), &dendrogram(), 0, 2.0).unwrap();
        assert_eq!(once, again);
        assert_eq!(once, relabeled);
    }

    #[test]
    fn out_of_range_level_is_config_error() {
        let result = label_graph(weighted_path(), &dendrogram(), 2, 2.0);
        assert!(matches!(result, Err(NetworkError::Config(_))));
    }

    #[test]
    fn unknown_node_is_structural_error() {
        let mut graph = weighted_path();
        graph.add_node(book("z"));
        let result = label_graph(graph, &dendrogram(), 0, 2.0);
        assert!(matches!(result, Err(NetworkError::Structural(_))));
    }
}
