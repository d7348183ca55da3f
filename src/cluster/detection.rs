//! Hierarchical community detection by greedy modularity optimization
//!
//! Each level moves nodes between neighboring communities while modularity
//! improves, then collapses the communities into a smaller graph and repeats.
//! The result depends on the order nodes are visited, so two runs with
//! different shuffle seeds may find different (equally valid) hierarchies.

use crate::cluster::{Dendrogram, PartitionLevel};
use crate::error::{NetworkError, Result};
use crate::graph::{CompressedGraph, NetworkGraph};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashMap};

/// Smallest modularity gain that still counts as an improvement
const MIN_GAIN: f64 = 1e-7;

/// Detection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Modularity resolution (1.0 = standard modularity)
    pub resolution: f64,

    /// Shuffle the visiting order with this seed; ascending node order otherwise
    pub shuffle_seed: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            shuffle_seed: None,
        }
    }
}

/// Community bookkeeping for one level
struct Status {
    node2com: Vec<usize>,
    total_weight: f64,
    /// Internal edge weight per community
    internals: Vec<f64>,
    /// Summed weighted degree per community
    degrees: Vec<f64>,
    /// Weighted degree per node
    node_degrees: Vec<f64>,
    loops: Vec<f64>,
}

impl Status {
    fn singletons(graph: &CompressedGraph) -> Self {
        let n = graph.node_count;
        let node_degrees: Vec<f64> = (0..n).map(|node| graph.weighted_degree(node)).collect();
        Self {
            node2com: (0..n).collect(),
            total_weight: graph.total_weight(),
            internals: graph.loops.clone(),
            degrees: node_degrees.clone(),
            node_degrees,
            loops: graph.loops.clone(),
        }
    }

    fn modularity(&self, resolution: f64) -> f64 {
        let m = self.total_weight;
        let mut seen = vec![false; self.degrees.len()];
        let mut q = 0.0;
        for &com in &self.node2com {
            if std::mem::replace(&mut seen[com], true) {
                continue;
            }
            q += resolution * self.internals[com] / m - (self.degrees[com] / (2.0 * m)).powi(2);
        }
        q
    }

    fn remove(&mut self, node: usize, com: usize, weight_to_com: f64) {
        self.degrees[com] -= self.node_degrees[node];
        self.internals[com] -= weight_to_com + self.loops[node];
    }

    fn insert(&mut self, node: usize, com: usize, weight_to_com: f64) {
        self.node2com[node] = com;
        self.degrees[com] += self.node_degrees[node];
        self.internals[com] += weight_to_com + self.loops[node];
    }
}

/// Weight from `node` to each neighboring community, in first-seen order
fn neighbor_communities(graph: &CompressedGraph, status: &Status, node: usize) -> Vec<(usize, f64)> {
    let mut slots: HashMap<usize, usize> = HashMap::new();
    let mut weights: Vec<(usize, f64)> = Vec::new();
    for (target, weight) in graph.neighbors(node) {
        let com = status.node2com[target as usize];
        match slots.get(&com) {
            Some(&slot) => weights[slot].1 += weight,
            None => {
                slots.insert(com, weights.len());
                weights.push((com, weight));
            }
        }
    }
    weights
}

/// Move nodes until no move improves modularity by at least `MIN_GAIN`
fn one_level(graph: &CompressedGraph, status: &mut Status, resolution: f64, order: &[usize]) {
    let two_m = 2.0 * status.total_weight;
    let mut current = status.modularity(resolution);

    loop {
        let mut moved = false;

        for &node in order {
            let old_com = status.node2com[node];
            let degc_totw = status.node_degrees[node] / two_m;
            let neighbors = neighbor_communities(graph, status, node);
            let weight_to_old = neighbors
                .iter()
                .find(|&&(com, _)| com == old_com)
                .map_or(0.0, |&(_, w)| w);

            let remove_cost = -weight_to_old
                + resolution * (status.degrees[old_com] - status.node_degrees[node]) * degc_totw;
            status.remove(node, old_com, weight_to_old);

            let mut best_com = old_com;
            let mut best_weight = weight_to_old;
            let mut best_gain = 0.0;
            for &(com, weight) in &neighbors {
                let gain = remove_cost + weight - resolution * status.degrees[com] * degc_totw;
                if gain > best_gain {
                    best_gain = gain;
                    best_com = com;
                    best_weight = weight;
                }
            }

            status.insert(node, best_com, best_weight);
            if best_com != old_com {
                moved = true;
            }
        }

        let updated = status.modularity(resolution);
        if !moved || updated - current < MIN_GAIN {
            break;
        }
        current = updated;
    }
}

/// Relabel communities as 0..k in order of first appearance
fn renumber(node2com: &[usize]) -> (Vec<usize>, usize) {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    let membership = node2com
        .iter()
        .map(|&com| {
            let next = ids.len();
            *ids.entry(com).or_insert(next)
        })
        .collect();
    (membership, ids.len())
}

fn visiting_order(node_count: usize, rng: &mut Option<StdRng>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..node_count).collect();
    if let Some(rng) = rng.as_mut() {
        order.shuffle(rng);
    }
    order
}

/// Expand an assignment over original nodes into a keyed partition level
fn expand_level(node_ids: &[String], assignment: &[usize], community_count: usize, modularity: f64) -> PartitionLevel {
    let membership: BTreeMap<String, usize> = node_ids
        .iter()
        .cloned()
        .zip(assignment.iter().copied())
        .collect();
    PartitionLevel {
        membership,
        modularity,
        community_count,
    }
}

/// Compute the community dendrogram of a weighted graph
pub fn generate_dendrogram(graph: &NetworkGraph, config: &DetectorConfig) -> Result<Dendrogram> {
    log::info!("Generating partition dendrogram");

    if !(config.resolution.is_finite() && config.resolution > 0.0) {
        return Err(NetworkError::Config(format!(
            "resolution must be positive, got {}",
            config.resolution
        )));
    }
    if let Some((_, _, edge)) = graph.edges().find(|(_, _, e)| !(e.weight.is_finite() && e.weight >= 0.0)) {
        return Err(NetworkError::Structural(format!(
            "community detection needs finite non-negative weights, found {}",
            edge.weight
        )));
    }

    let mut current = CompressedGraph::from_network(graph);
    let node_ids = current.node_ids.clone().unwrap_or_default();
    let mut rng = config.shuffle_seed.map(StdRng::seed_from_u64);

    if current.total_weight() <= 0.0 {
        log::info!("Graph has no edge weight; every node is its own community");
        let assignment: Vec<usize> = (0..node_ids.len()).collect();
        return Ok(Dendrogram {
            levels: vec![expand_level(&node_ids, &assignment, node_ids.len(), 0.0)],
        });
    }

    // assignment[i] = node of `current` that original node i belongs to
    let mut assignment: Vec<usize> = (0..node_ids.len()).collect();
    let mut levels = Vec::new();
    let mut best_modularity = f64::NEG_INFINITY;

    loop {
        let mut status = Status::singletons(&current);
        let order = visiting_order(current.node_count, &mut rng);
        one_level(&current, &mut status, config.resolution, &order);
        let modularity = status.modularity(config.resolution);

        if !levels.is_empty() && modularity - best_modularity < MIN_GAIN {
            break;
        }

        let (membership, community_count) = renumber(&status.node2com);
        for slot in assignment.iter_mut() {
            *slot = membership[*slot];
        }
        log::debug!(
            "Level {}: {} communities, modularity {:.6}",
            levels.len(),
            community_count,
            modularity
        );
        levels.push(expand_level(&node_ids, &assignment, community_count, modularity));
        best_modularity = modularity;

        if community_count == current.node_count {
            // nothing merged, so another level would be identical
            break;
        }
        current = current.aggregate(&membership, community_count);
    }

    log::info!("Dendrogram has {} levels", levels.len());
    Ok(Dendrogram { levels })
}
