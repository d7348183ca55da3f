//! Hierarchical community analysis module

pub mod detection;
pub mod labeling;
pub mod metrics;

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use crate::storage::write_atomically;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One level of the dendrogram: every node mapped to exactly one community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionLevel {
    /// Node key -> community id
    pub membership: BTreeMap<String, usize>,

    /// Modularity of this partition on the detected graph
    pub modularity: f64,

    /// Number of distinct communities
    pub community_count: usize,
}

impl PartitionLevel {
    pub fn community_of(&self, key: &str) -> Option<usize> {
        self.membership.get(key).copied()
    }

    /// Community id -> member keys
    pub fn communities(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut groups: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (key, &community) in &self.membership {
            groups.entry(community).or_default().push(key);
        }
        groups
    }
}

/// Partitions ordered from finest (level 0) to coarsest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    pub levels: Vec<PartitionLevel>,
}

impl Dendrogram {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The partition at `level`, or a configuration error if it does not exist
    pub fn level(&self, level: usize) -> Result<&PartitionLevel> {
        self.levels.get(level).ok_or_else(|| {
            NetworkError::Config(format!(
                "partition level {} is out of range (dendrogram has {} levels)",
                level,
                self.levels.len()
            ))
        })
    }

    /// Number of nodes the partitions cover
    pub fn node_count(&self) -> usize {
        self.levels.first().map_or(0, |level| level.membership.len())
    }

    pub fn coarsest_level(&self) -> Option<usize> {
        self.levels.len().checked_sub(1)
    }

    /// Check that all levels cover the same nodes and each level only merges
    /// communities of the level below
    pub fn validate(&self) -> Result<()> {
        for (k, pair) in self.levels.windows(2).enumerate() {
            let (fine, coarse) = (&pair[0], &pair[1]);
            if fine.membership.len() != coarse.membership.len() {
                return Err(NetworkError::Structural(format!(
                    "levels {} and {} cover {} and {} nodes",
                    k,
                    k + 1,
                    fine.membership.len(),
                    coarse.membership.len()
                )));
            }

            let mut parent: HashMap<usize, usize> = HashMap::new();
            for (key, &community) in &fine.membership {
                let Some(merged) = coarse.community_of(key) else {
                    return Err(NetworkError::Structural(format!(
                        "node {} missing from level {}",
                        key,
                        k + 1
                    )));
                };
                if *parent.entry(community).or_insert(merged) != merged {
                    return Err(NetworkError::Structural(format!(
                        "community {} at level {} is split across level {}",
                        community,
                        k,
                        k + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Persist as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_atomically(path.as_ref(), |writer| {
            serde_json::to_writer(writer, self)?;
            Ok(())
        })
    }

    /// Load a persisted dendrogram and check its consistency
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let dendrogram: Dendrogram = serde_json::from_reader(std::io::BufReader::new(file))?;
        dendrogram.validate()?;
        Ok(dendrogram)
    }
}
