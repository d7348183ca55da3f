//! Artifact persistence module

pub mod graphml;

use crate::cluster::metrics::CommunityProfile;
use crate::cluster::Dendrogram;
use crate::error::{NetworkError, Result};
use crate::graph::{GraphSnapshot, NetworkGraph};
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Paths written by one graph save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedGraph {
    /// Exact binary snapshot, reloadable with `load_graph`
    pub binary: PathBuf,
    /// GraphML export for external tools
    pub graphml: PathBuf,
}

/// Directory holding the artifacts of one pipeline run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    overwrite: bool,
}

impl ArtifactStore {
    /// Open (and create if needed) an artifact directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        fs::create_dir_all(root.as_ref())?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            overwrite: false,
        })
    }

    /// Allow replacing artifacts with smaller ones
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.bin", name))
    }

    pub fn dendrogram_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }

    /// Fail if the artifact at `path` is larger than `new_size`.
    ///
    /// An artifact that cannot be read back is treated as absent.
    fn guard_checkpoint<F>(&self, path: &Path, new_size: usize, stored_size: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<usize>,
    {
        if self.overwrite || !path.exists() {
            return Ok(());
        }
        match stored_size(path) {
            Ok(old_size) if new_size < old_size => Err(NetworkError::Checkpoint(format!(
                "refusing to replace {} (size {}) with a smaller result (size {})",
                path.display(),
                old_size,
                new_size
            ))),
            Ok(_) => Ok(()),
            Err(e) => {
                log::warn!("Replacing unreadable artifact {}: {}", path.display(), e);
                Ok(())
            }
        }
    }

    /// Save a graph as a binary snapshot plus a GraphML export.
    ///
    /// Fails if an artifact with the same name already holds more nodes and
    /// edges, unless the store was opened with overwrite enabled.
    pub fn save_graph(&self, name: &str, graph: &NetworkGraph) -> Result<SavedGraph> {
        let binary = self.graph_path(name);
        let graphml = self.root.join(format!("{}.graphml", name));

        self.guard_checkpoint(&binary, graph.node_count() + graph.edge_count(), |path| {
            let previous = load_graph(path)?;
            Ok(previous.node_count() + previous.edge_count())
        })?;

        log::info!("Saving graph as {}", binary.display());
        write_atomically(&binary, |writer| {
            bincode::serialize_into(writer, &graph.to_snapshot())?;
            Ok(())
        })?;

        log::info!("Saving graph as {}", graphml.display());
        write_atomically(&graphml, |writer| graphml::write_graphml(graph, writer))?;

        Ok(SavedGraph { binary, graphml })
    }

    /// Save a dendrogram as JSON, guarded like `save_graph` by the number of
    /// nodes it covers
    pub fn save_dendrogram(&self, name: &str, dendrogram: &Dendrogram) -> Result<PathBuf> {
        let path = self.dendrogram_path(name);
        self.guard_checkpoint(&path, dendrogram.node_count(), |path| {
            Ok(Dendrogram::load(path)?.node_count())
        })?;

        log::info!("Saving partition dendrogram as {}", path.display());
        dendrogram.save(&path)?;
        Ok(path)
    }

    /// Write `summary.json` and `nodes.csv` for a labeled graph
    pub fn save_summary(
        &self,
        labeled: &NetworkGraph,
        dendrogram: &Dendrogram,
        level: usize,
        profiles: &[CommunityProfile],
    ) -> Result<PathBuf> {
        log::info!("Saving summary information");

        let path = self.root.join("summary.json");
        let mut file = File::create(&path)?;

        let node_count = labeled.node_count();
        let avg_degree = if node_count == 0 {
            0.0
        } else {
            2.0 * labeled.edge_count() as f64 / node_count as f64
        };
        let levels: Vec<_> = dendrogram
            .levels
            .iter()
            .enumerate()
            .map(|(k, l)| {
                json!({
                    "level": k,
                    "community_count": l.community_count,
                    "modularity": l.modularity,
                })
            })
            .collect();

        let summary = json!({
            "graph_stats": {
                "node_count": node_count,
                "edge_count": labeled.edge_count(),
                "avg_degree": avg_degree,
            },
            "dendrogram": levels,
            "labeled_level": level,
            "communities": profiles,
        });
        file.write_all(to_string_pretty(&summary)?.as_bytes())?;

        let nodes_path = self.root.join("nodes.csv");
        let mut nodes_file = BufWriter::new(File::create(nodes_path)?);
        writeln!(nodes_file, "key,label,community")?;
        for (_, node) in labeled.nodes() {
            let community = node.community.map(|c| c.to_string()).unwrap_or_default();
            writeln!(
                nodes_file,
                "{},\"{}\",{}",
                node.key,
                node.label().replace('"', "\"\""),
                community
            )?;
        }
        nodes_file.flush()?;

        Ok(path)
    }
}

/// Write `path` through a sibling `.tmp` file that is renamed into place
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    write(&mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reload a graph saved by `ArtifactStore::save_graph`
pub fn load_graph<P: AsRef<Path>>(path: P) -> Result<NetworkGraph> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let snapshot: GraphSnapshot = bincode::deserialize_from(reader)?;
    NetworkGraph::from_snapshot(snapshot)
}
