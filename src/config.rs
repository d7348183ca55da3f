//! Configuration management for the reader network analyzer

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Edge weighting used when projecting the bipartite graph onto one node class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProjectionMethod {
    /// Number of shared neighbors
    Count,
    /// Shared neighbors weighted by 1 / (degree - 1)
    Collaboration,
    /// Shared neighbors over the smaller neighborhood
    Overlap,
}

impl ProjectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ProjectionMethod::Count => "Count",
            ProjectionMethod::Collaboration => "Collaboration",
            ProjectionMethod::Overlap => "Overlap",
        }
    }
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProjectionMethod {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(ProjectionMethod::Count),
            "collaboration" => Ok(ProjectionMethod::Collaboration),
            "overlap" => Ok(ProjectionMethod::Overlap),
            _ => Err(NetworkError::Config(format!(
                "{} is not a valid projection method (expected Count, Collaboration or Overlap)",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ProjectionMethod {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProjectionMethod> for String {
    fn from(method: ProjectionMethod) -> Self {
        method.name().to_string()
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Weighting policy for the book projection
    pub projection: ProjectionMethod,

    /// Remove nodes with degree at or below this value (1 = isolates only, negative = disabled)
    pub degree_threshold: i64,

    /// Dendrogram level used for labeling; `None` selects the coarsest level
    pub partition_level: Option<usize>,

    /// Edges lighter than this are pruned from the labeled graph
    pub edge_weight_threshold: f64,

    /// First record to process
    pub record_start: usize,

    /// One past the last record to process (0 = until the end)
    pub record_end: usize,

    /// Modularity resolution
    pub resolution: f64,

    /// Seed for shuffling the node visiting order during detection
    pub shuffle_seed: Option<u64>,

    /// Reuse projection and dendrogram artifacts already present in the output directory
    pub resume: bool,

    /// Allow replacing a persisted artifact with a smaller one
    pub overwrite: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projection: ProjectionMethod::Count,
            degree_threshold: 1,
            partition_level: None,
            edge_weight_threshold: 2.0,
            record_start: 0,
            record_end: 0,
            resolution: 1.0,
            shuffle_seed: None,
            resume: false,
            overwrite: false,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values before any work starts
    pub fn validate(&self) -> Result<()> {
        if !self.edge_weight_threshold.is_finite() {
            return Err(NetworkError::Config(format!(
                "edge weight threshold must be finite, got {}",
                self.edge_weight_threshold
            )));
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(NetworkError::Config(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if self.record_end != 0 && self.record_end < self.record_start {
            return Err(NetworkError::Config(format!(
                "record range end {} precedes start {}",
                self.record_end, self.record_start
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_names_case_insensitively() {
        assert_eq!("count".parse::<ProjectionMethod>().unwrap(), ProjectionMethod::Count);
        assert_eq!(
            "Collaboration".parse::<ProjectionMethod>().unwrap(),
            ProjectionMethod::Collaboration
        );
        assert_eq!(" OVERLAP ".parse::<ProjectionMethod>().unwrap(), ProjectionMethod::Overlap);
    }

    #[test]
    fn rejects_unimplemented_methods() {
        for name in ["Average Weight", "Divergence", ""] {
            let err = name.parse::<ProjectionMethod>().unwrap_err();
            assert!(matches!(err, NetworkError::Config(_)));
        }
    }

    #[test]
    fn unknown_method_fails_at_config_parse() {
        let err = serde_json::from_str::<Config>(r#"{"projection": "Divergence"}"#);
        assert!(err.is_err());

        let config: Config = serde_json::from_str(r#"{"projection": "overlap"}"#).unwrap();
        assert_eq!(config.projection, ProjectionMethod::Overlap);
        assert_eq!(config.degree_threshold, 1);
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let config = Config { record_start: 10, record_end: 5, ..Config::default() };
        assert!(matches!(config.validate(), Err(NetworkError::Config(_))));

        let config = Config { resolution: 0.0, ..Config::default() };
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }
}
