//! Community statistics and metrics

use crate::cluster::Dendrogram;
use crate::graph::{CompressedGraph, NetworkGraph, NodeKind, UNKNOWN_GENRE};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of genres listed per community profile
const TOP_GENRES: usize = 5;

/// Modularity of `membership` (community id per node) on a weighted graph
pub fn modularity(graph: &CompressedGraph, membership: &[usize], resolution: f64) -> f64 {
    let m = graph.total_weight();
    if m <= 0.0 {
        return 0.0;
    }

    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut degree: HashMap<usize, f64> = HashMap::new();
    for node in 0..graph.node_count {
        let com = membership[node];
        *degree.entry(com).or_insert(0.0) += graph.weighted_degree(node);
        *internal.entry(com).or_insert(0.0) += graph.loops[node];
        for (target, weight) in graph.neighbors(node) {
            if membership[target as usize] == com {
                // each internal edge is visited from both ends
                *internal.entry(com).or_insert(0.0) += weight / 2.0;
            }
        }
    }

    degree
        .iter()
        .map(|(com, &deg)| {
            let inside = internal.get(com).copied().unwrap_or(0.0);
            resolution * inside / m - (deg / (2.0 * m)).powi(2)
        })
        .sum()
}

/// Log per-level community counts and modularity
pub fn log_dendrogram_info(dendrogram: &Dendrogram) {
    log::info!("Dendrogram has {} levels", dendrogram.len());
    for (k, level) in dendrogram.levels.iter().enumerate() {
        let sizes = level.communities();
        let largest = sizes.values().map(|members| members.len()).max().unwrap_or(0);
        log::info!(
            "Level {}: {} communities (largest {}), modularity {:.4}",
            k,
            level.community_count,
            largest,
            level.modularity
        );
    }
}

/// Summary of one labeled community
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityProfile {
    pub community: usize,
    pub size: usize,
    /// Books whose metadata was found
    pub books_with_metadata: usize,
    /// Most frequent genres, most common first
    pub top_genres: Vec<(String, usize)>,
    /// Mean sales rank over books with a known rank
    pub mean_sales_rank: Option<f64>,
}

/// Profile every community of a labeled graph, largest first
pub fn community_profiles(graph: &NetworkGraph) -> Vec<CommunityProfile> {
    struct Tally {
        size: usize,
        with_metadata: usize,
        genres: HashMap<String, usize>,
        rank_sum: f64,
    }

    let mut tallies: BTreeMap<usize, Tally> = BTreeMap::new();
    for (_, node) in graph.nodes() {
        let Some(community) = node.community else {
            continue;
        };
        let tally = tallies.entry(community).or_insert_with(|| Tally {
            size: 0,
            with_metadata: 0,
            genres: HashMap::new(),
            rank_sum: 0.0,
        });
        tally.size += 1;

        if let NodeKind::Book(attrs) = &node.kind {
            if let Some(rank) = attrs.sales_rank {
                tally.with_metadata += 1;
                tally.rank_sum += rank as f64;
                for genre in attrs.genres.iter().filter(|g| g.as_str() != UNKNOWN_GENRE) {
                    *tally.genres.entry(genre.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    let mut profiles: Vec<CommunityProfile> = tallies
        .into_iter()
        .map(|(community, tally)| {
            let mut genres: Vec<(String, usize)> = tally.genres.into_iter().collect();
            genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            genres.truncate(TOP_GENRES);
            CommunityProfile {
                community,
                size: tally.size,
                books_with_metadata: tally.with_metadata,
                top_genres: genres,
                mean_sales_rank: (tally.with_metadata > 0)
                    .then(|| tally.rank_sum / tally.with_metadata as f64),
            }
        })
        .collect();

    profiles.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.community.cmp(&b.community)));
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{BookAttrs, Edge, Node};

    fn book(id: &str, genres: &[&str], sales_rank: Option<i64>, community: usize) -> Node {
        let mut node = Node::book(BookAttrs {
            book_id: id.to_string(),
            title: id.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            sales_rank,
        });
        node.community = Some(community);
        node
    }

    #[test]
    fn modularity_of_two_disconnected_edges() {
        let mut graph = NetworkGraph::new();
        let n: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|id| graph.add_node(crate::graph::tests::book(id)))
            .collect();
        graph.add_edge(n[0], n[1], Edge::weighted(1.0));
        graph.add_edge(n[2], n[3], Edge::weighted(1.0));
        let csr = CompressedGraph::from_network(&graph);

        assert!((modularity(&csr, &[0, 0, 1, 1], 1.0) - 0.5).abs() < 1e-12);
        assert!((modularity(&csr, &[0, 0, 0, 0], 1.0)).abs() < 1e-12);
        assert!((modularity(&csr, &[0, 1, 2, 3], 1.0) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn profiles_count_known_genres_only() {
        let mut graph = NetworkGraph::new();
        graph.add_node(book("1", &["Fantasy", "Epic"], Some(10), 0));
        graph.add_node(book("2", &["Fantasy"], Some(30), 0));
        graph.add_node(book("3", &[UNKNOWN_GENRE], None, 0));
        graph.add_node(book("4", &["Romance"], Some(5), 1));

        let profiles = community_profiles(&graph);
        assert_eq!(profiles.len(), 2);

        let first = &profiles[0];
        assert_eq!(first.community, 0);
        assert_eq!(first.size, 3);
        assert_eq!(first.books_with_metadata, 2);
        assert_eq!(first.top_genres[0], ("Fantasy".to_string(), 2));
        assert_eq!(first.top_genres[1], ("Epic".to_string(), 1));
        assert_eq!(first.mean_sales_rank, Some(20.0));

        assert_eq!(profiles[1].top_genres, vec![("Romance".to_string(), 1)]);
    }
}
