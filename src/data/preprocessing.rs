//! Data preprocessing module for graph analysis

use crate::graph::NetworkGraph;
use petgraph::stable_graph::NodeIndex;

/// Select the records in `[start, end)`; `end == 0` means "to the end"
pub fn select_record_range<T>(records: &[T], start: usize, end: usize) -> &[T] {
    let start = start.min(records.len());
    let end = if end == 0 { records.len() } else { end.min(records.len()) };
    if end <= start {
        return &[];
    }
    &records[start..end]
}

/// Remove nodes with low degree, returning how many were removed.
///
/// A negative threshold disables filtering and a threshold of 1 strips
/// isolated nodes only. Any other threshold removes nodes whose degree is
/// at or below it. Degrees are measured once, before anything is removed.
pub fn filter_by_degree(graph: &mut NetworkGraph, threshold: i64) -> usize {
    if threshold < 0 {
        return 0;
    }

    let doomed: Vec<NodeIndex> = if threshold == 1 {
        log::info!("Removing isolated nodes");
        graph
            .nodes()
            .filter(|&(idx, _)| graph.degree(idx) == 0)
            .map(|(idx, _)| idx)
            .collect()
    } else {
        log::info!("Removing nodes with degree less than or equal to {}", threshold);
        let limit = threshold as usize;
        graph
            .nodes()
            .filter(|&(idx, _)| graph.degree(idx) <= limit)
            .map(|(idx, _)| idx)
            .collect()
    };

    for &idx in &doomed {
        graph.remove_node(idx);
    }

    log::info!(
        "Removed {} nodes; {} nodes and {} edges remain",
        doomed.len(),
        graph.node_count(),
        graph.edge_count()
    );
    doomed.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::book;
    use crate::graph::{Edge, Node};

    /// Degrees: reader_0 = 3, reader_1 = 2, book_a = 2, book_b = 2, book_c = 1, book_d = 0
    fn mixed_degrees() -> NetworkGraph {
        let mut graph = NetworkGraph::new();
        let r0 = graph.add_node(Node::reader(0, "0"));
        let r1 = graph.add_node(Node::reader(1, "1"));
        let a = graph.add_node(book("a"));
        let b = graph.add_node(book("b"));
        let c = graph.add_node(book("c"));
        graph.add_node(book("d"));
        graph.add_edge(r0, a, Edge::rating(5, 1));
        graph.add_edge(r0, b, Edge::rating(4, 1));
        graph.add_edge(r0, c, Edge::rating(3, 1));
        graph.add_edge(r1, a, Edge::rating(2, 1));
        graph.add_edge(r1, b, Edge::rating(1, 1));
        graph
    }

    #[test]
    fn threshold_one_removes_only_isolates() {
        let mut graph = mixed_degrees();
        let before = graph.to_snapshot();

        assert_eq!(filter_by_degree(&mut graph, 1), 1);
        assert!(graph.node_by_key("book_d").is_none());
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 5);

        let after = graph.to_snapshot();
        assert_eq!(after.edges, before.edges);
        assert_eq!(graph.edge_between("reader_0", "book_a").unwrap().weight, 5.0);
    }

    #[test]
    fn negative_threshold_is_a_no_op() {
        let mut graph = mixed_degrees();
        assert_eq!(filter_by_degree(&mut graph, -1), 0);
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn general_threshold_is_inclusive() {
        let mut graph = mixed_degrees();
        assert_eq!(filter_by_degree(&mut graph, 2), 5);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node_by_key("reader_0").is_some());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn threshold_zero_removes_isolates() {
        let mut graph = mixed_degrees();
        assert_eq!(filter_by_degree(&mut graph, 0), 1);
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn record_range_selection() {
        let records: Vec<u32> = (0..10).collect();
        assert_eq!(select_record_range(&records, 0, 0).len(), 10);
        assert_eq!(select_record_range(&records, 3, 0), &records[3..]);
        assert_eq!(select_record_range(&records, 2, 5), &[2, 3, 4]);
        assert_eq!(select_record_range(&records, 8, 50), &[8, 9]);
        assert!(select_record_range(&records, 12, 0).is_empty());
    }
}
