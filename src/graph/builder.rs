//! Bipartite reader/book network construction

use crate::data::metadata::MetadataLookup;
use crate::data::records::{BookInteraction, ProfileType, ReaderRecord};
use crate::error::Result;
use crate::graph::{BookAttrs, Edge, NetworkGraph, Node, UNKNOWN_GENRE};
use petgraph::stable_graph::NodeIndex;

/// Counters collected while building the network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub readers: usize,
    pub skipped_profiles: usize,
    pub books: usize,
    pub edges: usize,
    pub unrated: usize,
    pub malformed: usize,
    pub metadata_misses: usize,
}

/// Builder for incrementally constructing the bipartite reader/book graph
pub struct BipartiteBuilder<'a, L: MetadataLookup> {
    lookup: &'a L,

    graph: NetworkGraph,

    /// Next sequential reader id
    next_reader: u64,

    stats: BuildStats,
}

impl<'a, L: MetadataLookup> BipartiteBuilder<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self {
            lookup,
            graph: NetworkGraph::new(),
            next_reader: 0,
            stats: BuildStats::default(),
        }
    }

    /// Add one reader and their rated books; non-normal profiles are ignored
    pub fn add_reader(&mut self, record: &ReaderRecord) {
        if record.profile_type != ProfileType::Normal || record.books.is_empty() {
            self.stats.skipped_profiles += 1;
            return;
        }

        // Source ids collide (some are 0), so readers get fresh sequential ids
        let reader_id = self.next_reader;
        self.next_reader += 1;
        let reader = self.graph.add_node(Node::reader(reader_id, &record.reader_id));
        self.stats.readers += 1;

        for interaction in &record.books {
            if let Err(e) = self.add_interaction(reader, interaction) {
                self.stats.malformed += 1;
                log::debug!("Reader {} ({}): skipping interaction: {}", reader_id, record.reader_id, e);
            }
        }
    }

    fn add_interaction(&mut self, reader: NodeIndex, interaction: &BookInteraction) -> Result<()> {
        let book_id = interaction.valid_book_id()?;
        let book = self.get_or_create_book(book_id, interaction.title.as_deref());

        if interaction.rating == 0 {
            self.stats.unrated += 1;
            return Ok(());
        }

        self.graph
            .add_edge(reader, book, Edge::rating(interaction.rating, interaction.read_count));
        Ok(())
    }

    fn get_or_create_book(&mut self, book_id: &str, title: Option<&str>) -> NodeIndex {
        if let Some(idx) = self.graph.node_index(&format!("book_{}", book_id)) {
            return idx;
        }

        let (genres, sales_rank) = match self.lookup.lookup(book_id) {
            Some(metadata) => (metadata.genres, Some(metadata.sales_rank)),
            None => {
                self.stats.metadata_misses += 1;
                log::debug!("Book {} is not in the metadata store", book_id);
                (vec![UNKNOWN_GENRE.to_string()], None)
            }
        };

        self.stats.books += 1;
        self.graph.add_node(Node::book(BookAttrs {
            book_id: book_id.to_string(),
            title: title.unwrap_or_default().to_string(),
            genres,
            sales_rank,
        }))
    }

    /// Finish construction, checking the bipartite invariant
    pub fn build(mut self) -> Result<(NetworkGraph, BuildStats)> {
        self.graph.validate_bipartite()?;
        self.stats.edges = self.graph.edge_count();
        Ok((self.graph, self.stats))
    }
}

/// Build the bipartite reader/book network from a record stream
pub fn build_bipartite_graph<'r, I, L>(records: I, lookup: &L) -> Result<(NetworkGraph, BuildStats)>
where
    I: IntoIterator<Item = &'r ReaderRecord>,
    L: MetadataLookup,
{
    log::info!("Building bipartite reader/book network");

    let mut builder = BipartiteBuilder::new(lookup);
    for (i, record) in records.into_iter().enumerate() {
        builder.add_reader(record);
        if (i + 1) % 10_000 == 0 {
            log::info!("Building bipartite graph: {} records processed", i + 1);
        }
    }

    let (graph, stats) = builder.build()?;
    log::info!(
        "Bipartite graph: {} readers, {} books, {} rating edges ({} profiles skipped, {} malformed interactions, {} books without metadata)",
        stats.readers,
        stats.books,
        stats.edges,
        stats.skipped_profiles,
        stats.malformed,
        stats.metadata_misses
    );
    Ok((graph, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::metadata::{BookMetadata, MetadataStore};
    use crate::graph::{NodeClass, NodeKind};

    fn store() -> MetadataStore {
        let mut store = MetadataStore::new();
        store.insert(
            "10",
            BookMetadata {
                genres: vec!["Fantasy".to_string()],
                sales_rank: 55,
            },
        );
        store
    }

    #[test]
    fn reindexes_colliding_reader_ids() {
        let records = vec![
            ReaderRecord::normal("0", vec![BookInteraction::new("10", 4)]),
            ReaderRecord::normal("0", vec![BookInteraction::new("11", 3)]),
        ];
        let (graph, stats) = build_bipartite_graph(&records, &store()).unwrap();

        assert_eq!(stats.readers, 2);
        for (key, expected) in [("reader_0", 0u64), ("reader_1", 1u64)] {
            match &graph.node_by_key(key).unwrap().kind {
                NodeKind::Reader { reader_id, source_id } => {
                    assert_eq!(*reader_id, expected);
                    assert_eq!(source_id, "0");
                }
                other => panic!("unexpected node kind {:?}", other),
            }
        }
    }

    #[test]
    fn skips_non_normal_profiles() {
        let mut private = ReaderRecord::normal("5", vec![BookInteraction::new("10", 4)]);
        private.profile_type = ProfileType::Private;
        let records = vec![private, ReaderRecord::normal("6", vec![BookInteraction::new("10", 2)])];

        let (graph, stats) = build_bipartite_graph(&records, &store()).unwrap();
        assert_eq!(stats.skipped_profiles, 1);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node_by_key("reader_0").is_some());
        assert!(graph.node_by_key("reader_1").is_none());
    }

    #[test]
    fn unrated_books_become_nodes_without_edges() {
        let mut read = BookInteraction::new("11", 5);
        read.read_count = 3;
        let records = vec![ReaderRecord::normal(
            "1",
            vec![BookInteraction::new("10", 0), read],
        )];
        let (graph, stats) = build_bipartite_graph(&records, &store()).unwrap();

        assert_eq!(stats.unrated, 1);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.node_by_key("book_10").is_some());
        assert!(graph.edge_between("reader_0", "book_10").is_none());

        let edge = graph.edge_between("reader_0", "book_11").unwrap();
        assert_eq!(edge.weight, 5.0);
        assert_eq!(edge.rating, Some(5));
        assert_eq!(edge.read_count, Some(3));
    }

    #[test]
    fn missing_metadata_is_marked_explicitly() {
        let records = vec![ReaderRecord::normal(
            "1",
            vec![BookInteraction::new("10", 4), BookInteraction::new("11", 4)],
        )];
        let (graph, stats) = build_bipartite_graph(&records, &store()).unwrap();
        assert_eq!(stats.metadata_misses, 1);

        match &graph.node_by_key("book_10").unwrap().kind {
            NodeKind::Book(attrs) => {
                assert_eq!(attrs.genres, vec!["Fantasy"]);
                assert_eq!(attrs.sales_rank, Some(55));
                assert!(attrs.has_metadata());
            }
            _ => panic!("expected a book"),
        }
        match &graph.node_by_key("book_11").unwrap().kind {
            NodeKind::Book(attrs) => {
                assert_eq!(attrs.genres, vec![UNKNOWN_GENRE]);
                assert_eq!(attrs.sales_rank, None);
                assert!(!attrs.has_metadata());
            }
            _ => panic!("expected a book"),
        }
    }

    #[test]
    fn stored_rank_of_minus_one_still_counts_as_metadata() {
        let mut store = store();
        store.insert(
            "12",
            BookMetadata {
                genres: vec!["Poetry".to_string()],
                sales_rank: -1,
            },
        );
        let records = vec![ReaderRecord::normal("1", vec![BookInteraction::new("12", 3)])];
        let (graph, stats) = build_bipartite_graph(&records, &store).unwrap();
        assert_eq!(stats.metadata_misses, 0);

        match &graph.node_by_key("book_12").unwrap().kind {
            NodeKind::Book(attrs) => {
                assert_eq!(attrs.sales_rank, Some(-1));
                assert!(attrs.has_metadata());
            }
            _ => panic!("expected a book"),
        }
    }

    #[test]
    fn malformed_interaction_keeps_rest_of_reader() {
        let mut broken = BookInteraction::new("No gid", 5);
        broken.title = Some("Mystery".to_string());
        let records = vec![ReaderRecord::normal(
            "1",
            vec![BookInteraction::new("10", 4), broken, BookInteraction::new("12", 2)],
        )];
        let (graph, stats) = build_bipartite_graph(&records, &store()).unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edge_between("reader_0", "book_12").is_some());
        assert!(graph.node_by_key("book_No gid").is_none());
    }

    #[test]
    fn every_edge_joins_reader_and_book() {
        let records: Vec<ReaderRecord> = (0..6)
            .map(|r| {
                ReaderRecord::normal(
                    &r.to_string(),
                    (0..4).map(|b| BookInteraction::new(&((r + b) % 5).to_string(), 3)).collect(),
                )
            })
            .collect();
        let (graph, _) = build_bipartite_graph(&records, &store()).unwrap();

        for (a, b, _) in graph.edges() {
            let classes = (graph.node(a).unwrap().class(), graph.node(b).unwrap().class());
            assert_ne!(classes.0, classes.1);
            assert!(classes.0 == NodeClass::Reader || classes.1 == NodeClass::Reader);
        }
    }
}
