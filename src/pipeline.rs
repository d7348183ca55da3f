//! End-to-end pipeline: records to labeled book graph

use crate::cluster::detection::{generate_dendrogram, DetectorConfig};
use crate::cluster::labeling::label_graph;
use crate::cluster::metrics::{community_profiles, log_dendrogram_info, CommunityProfile};
use crate::cluster::Dendrogram;
use crate::config::Config;
use crate::data::metadata::MetadataLookup;
use crate::data::preprocessing::{filter_by_degree, select_record_range};
use crate::data::records::ReaderRecord;
use crate::error::{NetworkError, Result};
use crate::graph::builder::build_bipartite_graph;
use crate::graph::projection::project_graph;
use crate::graph::{NetworkGraph, NodeClass};
use crate::storage::{load_graph, ArtifactStore, SavedGraph};
use std::path::{Path, PathBuf};

pub const BIPARTITE_ARTIFACT: &str = "bipartite_reader_network";

/// Artifact name of the projection for a config
pub fn projection_artifact(config: &Config) -> String {
    format!("projection_graph_{}", config.projection)
}

/// Artifact name of the dendrogram detected on that projection
pub fn dendrogram_artifact(config: &Config) -> String {
    format!("partition_dendrogram_{}", config.projection)
}

/// Artifact name of the projection labeled from `level` and pruned at the
/// configured edge-weight threshold
pub fn labeled_artifact(config: &Config, level: usize) -> String {
    format!(
        "{}_labeled_level{}_threshold{}",
        projection_artifact(config),
        level,
        config.edge_weight_threshold
    )
}

/// Files written by a pipeline run; `None` for stages restored from a checkpoint
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    pub bipartite: Option<SavedGraph>,
    pub projection: Option<SavedGraph>,
    pub dendrogram: Option<PathBuf>,
    pub labeled: SavedGraph,
    pub summary: PathBuf,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub labeled: NetworkGraph,
    pub dendrogram: Dendrogram,
    pub level: usize,
    pub profiles: Vec<CommunityProfile>,
    pub artifacts: RunArtifacts,
}

/// Build the bipartite graph from the configured record range, filter it and persist it
pub fn build_stage<L: MetadataLookup>(
    records: &[ReaderRecord],
    lookup: &L,
    config: &Config,
    store: &ArtifactStore,
) -> Result<(NetworkGraph, SavedGraph)> {
    let selected = select_record_range(records, config.record_start, config.record_end);
    log::info!("Processing {} of {} reader records", selected.len(), records.len());

    let (mut graph, _) = build_bipartite_graph(selected, lookup)?;
    filter_by_degree(&mut graph, config.degree_threshold);
    let saved = store.save_graph(BIPARTITE_ARTIFACT, &graph)?;
    Ok((graph, saved))
}

/// Project the bipartite graph onto books and persist the projection
pub fn project_stage(
    bipartite: &NetworkGraph,
    config: &Config,
    store: &ArtifactStore,
) -> Result<(NetworkGraph, SavedGraph)> {
    let projected = project_graph(bipartite, NodeClass::Book, config.projection)?;
    let saved = store.save_graph(&projection_artifact(config), &projected)?;
    Ok((projected, saved))
}

/// Detect communities and persist the dendrogram
pub fn detect_stage(
    projected: &NetworkGraph,
    config: &Config,
    store: &ArtifactStore,
) -> Result<(Dendrogram, PathBuf)> {
    let detector = DetectorConfig {
        resolution: config.resolution,
        shuffle_seed: config.shuffle_seed,
    };
    let dendrogram = generate_dendrogram(projected, &detector)?;
    log_dendrogram_info(&dendrogram);
    let path = store.save_dendrogram(&dendrogram_artifact(config), &dendrogram)?;
    Ok((dendrogram, path))
}

/// Label the projection from the configured level and persist the result
pub fn label_stage(
    projected: NetworkGraph,
    dendrogram: &Dendrogram,
    config: &Config,
    store: &ArtifactStore,
) -> Result<(NetworkGraph, SavedGraph, usize)> {
    let level = match config.partition_level {
        Some(level) => level,
        None => dendrogram
            .coarsest_level()
            .ok_or_else(|| NetworkError::Config("dendrogram has no levels".to_string()))?,
    };
    let labeled = label_graph(projected, dendrogram, level, config.edge_weight_threshold)?;
    let saved = store.save_graph(&labeled_artifact(config, level), &labeled)?;
    Ok((labeled, saved, level))
}

/// Check that a reloaded dendrogram was computed on this graph
fn ensure_dendrogram_matches(dendrogram: &Dendrogram, graph: &NetworkGraph) -> Result<()> {
    let Some(level) = dendrogram.levels.first() else {
        return Err(NetworkError::Structural("stored dendrogram is empty".to_string()));
    };
    let covered = level.membership.len() == graph.node_count()
        && graph.nodes().all(|(_, node)| level.membership.contains_key(&node.key));
    if !covered {
        return Err(NetworkError::Structural(
            "stored dendrogram does not match the projected graph".to_string(),
        ));
    }
    Ok(())
}

/// Load a checkpoint, or `None` if it is absent or unreadable
fn restore<T, F>(path: &Path, load: F) -> Option<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    if !path.exists() {
        return None;
    }
    match load(path) {
        Ok(value) => {
            log::info!("Resuming from {}", path.display());
            Some(value)
        }
        Err(e) => {
            log::warn!("Ignoring checkpoint {}: {}", path.display(), e);
            None
        }
    }
}

/// Run every stage in order, reusing checkpoints when `config.resume` is set
pub fn run_pipeline<L: MetadataLookup>(
    records: &[ReaderRecord],
    lookup: &L,
    config: &Config,
    store: &ArtifactStore,
) -> Result<PipelineOutput> {
    config.validate()?;

    let restored_projection = config
        .resume
        .then(|| restore(&store.graph_path(&projection_artifact(config)), |path| load_graph(path)))
        .flatten();
    let (projected, bipartite_saved, projection_saved) = match restored_projection {
        Some(projected) => (projected, None, None),
        None => {
            let (bipartite, bipartite_saved) = build_stage(records, lookup, config, store)?;
            let (projected, projection_saved) = project_stage(&bipartite, config, store)?;
            (projected, Some(bipartite_saved), Some(projection_saved))
        }
    };

    // A stored dendrogram only describes a projection that was itself restored
    let dendrogram_path = store.dendrogram_path(&dendrogram_artifact(config));
    let restored_dendrogram = if projection_saved.is_none() {
        restore(&dendrogram_path, |path| Dendrogram::load(path))
    } else {
        None
    };
    let (dendrogram, dendrogram_saved) = match restored_dendrogram {
        Some(dendrogram) => {
            ensure_dendrogram_matches(&dendrogram, &projected)?;
            (dendrogram, None)
        }
        None => {
            let (dendrogram, path) = detect_stage(&projected, config, store)?;
            (dendrogram, Some(path))
        }
    };

    let (labeled, labeled_saved, level) = label_stage(projected, &dendrogram, config, store)?;
    let profiles = community_profiles(&labeled);
    let summary = store.save_summary(&labeled, &dendrogram, level, &profiles)?;

    log::info!(
        "Labeled graph: {} books, {} edges, {} communities at level {}",
        labeled.node_count(),
        labeled.edge_count(),
        profiles.len(),
        level
    );

    Ok(PipelineOutput {
        labeled,
        dendrogram,
        level,
        profiles,
        artifacts: RunArtifacts {
            bipartite: bipartite_saved,
            projection: projection_saved,
            dendrogram: dendrogram_saved,
            labeled: labeled_saved,
            summary,
        },
    })
}
