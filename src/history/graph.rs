use std::collections::{BTreeMap, HashMap};

use eframe::egui::Color32;

use super::model::{ClusterAggregate, ClusterId, UNCLUSTERED};
use super::similarity::centroid_similarity;

const GOLDEN_ANGLE_DEGREES: f32 = 137.508;
const UNCLUSTERED_COLOR: Color32 = Color32::from_rgb(0x6c, 0x75, 0x7d);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphConfig {
    /// Edges are kept only when similarity is strictly above this value.
    pub similarity_threshold: f32,
    pub size_scale: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub min_link_distance: f32,
    pub max_link_distance: f32,
    /// When false the unclustered bucket is left out of the graph.
    pub include_unclustered: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            size_scale: 6.0,
            min_size: 8.0,
            max_size: 72.0,
            min_link_distance: 60.0,
            max_link_distance: 260.0,
            include_unclustered: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GraphNode {
    pub cluster_id: ClusterId,
    pub member_count: usize,
    /// Visual diameter in world units.
    pub size: f32,
    pub color: Color32,
    pub has_centroid: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphEdge {
    /// Node indices with `source < target`.
    pub source: usize,
    pub target: usize,
    pub similarity: f32,
    /// Similarity rescaled to `[0, 1]` above the threshold.
    pub strength: f32,
    /// Preferred layout distance; shorter for more similar clusters.
    pub distance: f32,
}

#[derive(Clone, Debug, Default)]
pub struct ClusterGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    index_by_id: HashMap<ClusterId, usize>,
    incident: Vec<Vec<usize>>,
}

impl ClusterGraph {
    pub fn build(clusters: &BTreeMap<ClusterId, ClusterAggregate>, config: GraphConfig) -> Self {
        let aggregates = clusters
            .values()
            .filter(|aggregate| config.include_unclustered || aggregate.id != UNCLUSTERED)
            .collect::<Vec<_>>();

        let nodes = aggregates
            .iter()
            .map(|aggregate| GraphNode {
                cluster_id: aggregate.id,
                member_count: aggregate.member_count(),
                size: node_size(aggregate.member_count(), config),
                color: cluster_color(aggregate.id),
                has_centroid: aggregate.centroid.is_some(),
            })
            .collect::<Vec<_>>();

        let mut edges = Vec::new();
        for (source, source_aggregate) in aggregates.iter().enumerate() {
            let Some(source_centroid) = source_aggregate.centroid.as_deref() else {
                continue;
            };

            for (offset, target_aggregate) in aggregates[source + 1..].iter().enumerate() {
                let Some(target_centroid) = target_aggregate.centroid.as_deref() else {
                    continue;
                };

                let similarity =
                    centroid_similarity(Some(source_centroid), Some(target_centroid));
                if similarity > config.similarity_threshold {
                    edges.push(GraphEdge {
                        source,
                        target: source + 1 + offset,
                        similarity,
                        strength: link_strength(similarity, config),
                        distance: link_distance(similarity, config),
                    });
                }
            }
        }

        let mut incident = vec![Vec::new(); nodes.len()];
        for (edge_index, edge) in edges.iter().enumerate() {
            incident[edge.source].push(edge_index);
            incident[edge.target].push(edge_index);
        }

        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.cluster_id, index))
            .collect();

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            threshold = config.similarity_threshold,
            "built cluster graph"
        );

        Self {
            nodes,
            edges,
            index_by_id,
            incident,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn index_of(&self, cluster_id: ClusterId) -> Option<usize> {
        self.index_by_id.get(&cluster_id).copied()
    }

    pub fn edge_between(&self, a: ClusterId, b: ClusterId) -> Option<&GraphEdge> {
        let (a, b) = (self.index_of(a)?, self.index_of(b)?);
        let (source, target) = if a < b { (a, b) } else { (b, a) };
        self.incident
            .get(source)?
            .iter()
            .map(|&edge_index| &self.edges[edge_index])
            .find(|edge| edge.source == source && edge.target == target)
    }

    /// Neighbouring node indices with their similarity, most similar first.
    pub fn neighbors(&self, index: usize) -> Vec<(usize, f32)> {
        let Some(incident) = self.incident.get(index) else {
            return Vec::new();
        };

        let mut neighbors = incident
            .iter()
            .map(|&edge_index| {
                let edge = &self.edges[edge_index];
                let other = if edge.source == index {
                    edge.target
                } else {
                    edge.source
                };
                (other, edge.similarity)
            })
            .collect::<Vec<_>>();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        neighbors
    }
}

pub fn node_size(member_count: usize, config: GraphConfig) -> f32 {
    ((member_count as f32).sqrt() * config.size_scale).clamp(config.min_size, config.max_size)
}

pub fn link_strength(similarity: f32, config: GraphConfig) -> f32 {
    let span = (1.0 - config.similarity_threshold).max(f32::EPSILON);
    ((similarity - config.similarity_threshold) / span).clamp(0.0, 1.0)
}

pub fn link_distance(similarity: f32, config: GraphConfig) -> f32 {
    let strength = link_strength(similarity, config);
    config.max_link_distance - (config.max_link_distance - config.min_link_distance) * strength
}

/// Golden-angle hue stepping; the unclustered bucket is neutral gray.
pub fn cluster_color(cluster_id: ClusterId) -> Color32 {
    if cluster_id == UNCLUSTERED {
        return UNCLUSTERED_COLOR;
    }

    let hue = ((cluster_id as f64 * f64::from(GOLDEN_ANGLE_DEGREES)).rem_euclid(360.0)) as f32;
    hsl_to_rgb(hue, 0.7, 0.6)
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - chroma / 2.0;

    let (r, g, b) = match hue {
        h if h < 60.0 => (chroma, x, 0.0),
        h if h < 120.0 => (x, chroma, 0.0),
        h if h < 180.0 => (0.0, chroma, x),
        h if h < 240.0 => (0.0, x, chroma),
        h if h < 300.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Color32::from_rgb(
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::history::collect::{TOP_CHANNEL_LIMIT, aggregate_clusters};
    use crate::history::model::{VideoId, WatchRecord};

    fn clusters(fixture: &[(ClusterId, Vec<Vec<f32>>)]) -> BTreeMap<ClusterId, ClusterAggregate> {
        let mut records = Vec::new();
        for (cluster_id, vectors) in fixture {
            for (index, vector) in vectors.iter().enumerate() {
                records.push(WatchRecord {
                    video_id: VideoId::Known(format!("{cluster_id}-{index}")),
                    title: String::new(),
                    channel_name: String::new(),
                    timestamp: String::new(),
                    watched_at: None,
                    cluster_id: *cluster_id,
                    vector: (!vector.is_empty()).then(|| vector.clone()),
                });
            }
        }
        aggregate_clusters(records, TOP_CHANNEL_LIMIT)
    }

    #[test]
    fn connects_only_similar_clusters() {
        let data = clusters(&[
            (0, vec![vec![1.0, 0.0]]),
            (1, vec![vec![1.0, 0.0]]),
            (2, vec![vec![0.0, 1.0]]),
        ]);
        let graph = ClusterGraph::build(&data, GraphConfig::default());

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 1);

        let edge = graph.edge_between(0, 1).expect("edge between identical clusters");
        assert_eq!(edge.similarity, 1.0);
        assert!(graph.edge_between(1, 0).is_some());
        assert!(graph.edge_between(0, 2).is_none());
        assert!(graph.edge_between(1, 2).is_none());
    }

    #[test]
    fn identical_centroids_get_minimal_distance() {
        let config = GraphConfig::default();
        let data = clusters(&[(4, vec![vec![0.2, 0.4, 0.1]]), (9, vec![vec![0.2, 0.4, 0.1]])]);
        let graph = ClusterGraph::build(&data, config);

        let edge = graph.edge_between(4, 9).expect("edge");
        assert_abs_diff_eq!(edge.similarity, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(edge.strength, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(edge.distance, config.min_link_distance, epsilon = 1e-3);
    }

    #[test]
    fn edges_are_irreflexive_unique_and_above_threshold() {
        let data = clusters(&[
            (0, vec![vec![1.0, 0.2, 0.0], vec![0.8, 0.1, 0.1]]),
            (1, vec![vec![0.9, 0.3, 0.0]]),
            (2, vec![vec![0.1, 1.0, 0.0]]),
            (3, vec![vec![0.5, 0.5, 0.5]]),
            (UNCLUSTERED, vec![vec![0.0, 0.0, 1.0]]),
        ]);
        let config = GraphConfig::default();
        let graph = ClusterGraph::build(&data, config);

        let mut seen = std::collections::HashSet::new();
        for edge in &graph.edges {
            assert!(edge.source < edge.target);
            assert!(edge.similarity > config.similarity_threshold);
            assert!(seen.insert((edge.source, edge.target)));
        }
    }

    #[test]
    fn clusters_without_centroid_stay_isolated() {
        let data = clusters(&[
            (0, vec![vec![1.0, 0.0]]),
            (1, vec![vec![]]),
            (2, vec![vec![1.0, 0.0]]),
        ]);
        let graph = ClusterGraph::build(&data, GraphConfig::default());

        let isolated = graph.index_of(1).expect("node for cluster 1");
        assert!(!graph.nodes[isolated].has_centroid);
        assert!(graph.neighbors(isolated).is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn unclustered_bucket_can_be_left_out() {
        let data = clusters(&[
            (UNCLUSTERED, vec![vec![1.0, 0.0]]),
            (0, vec![vec![1.0, 0.0]]),
            (1, vec![vec![1.0, 0.1]]),
        ]);
        let config = GraphConfig {
            include_unclustered: false,
            ..GraphConfig::default()
        };
        let graph = ClusterGraph::build(&data, config);

        assert_eq!(graph.node_count(), 2);
        assert!(graph.index_of(UNCLUSTERED).is_none());
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(ClusterGraph::build(&data, GraphConfig::default()).node_count(), 3);
    }

    #[test]
    fn neighbors_are_sorted_by_similarity() {
        let data = clusters(&[
            (0, vec![vec![1.0, 0.0]]),
            (1, vec![vec![1.0, 0.1]]),
            (2, vec![vec![1.0, 0.9]]),
        ]);
        let graph = ClusterGraph::build(&data, GraphConfig::default());

        let neighbors = graph.neighbors(0);
        let order = neighbors.iter().map(|(index, _)| *index).collect::<Vec<_>>();
        assert_eq!(order, vec![1, 2]);
        assert!(neighbors[0].1 >= neighbors[1].1);
    }

    #[test]
    fn node_size_is_monotonic_and_clamped() {
        let config = GraphConfig::default();
        assert_eq!(node_size(0, config), config.min_size);
        assert_eq!(node_size(1, config), config.min_size);
        assert!(node_size(10, config) < node_size(40, config));
        assert_eq!(node_size(1_000_000, config), config.max_size);
    }

    #[test]
    fn link_distance_shrinks_with_similarity() {
        let config = GraphConfig::default();
        assert!(link_distance(0.9, config) < link_distance(0.5, config));
        assert!(link_strength(0.9, config) > link_strength(0.5, config));
        assert_abs_diff_eq!(link_distance(0.3, config), config.max_link_distance);
    }

    #[test]
    fn cluster_colors_are_deterministic() {
        assert_eq!(cluster_color(UNCLUSTERED), Color32::from_rgb(108, 117, 125));
        assert_eq!(cluster_color(5), cluster_color(5));
        assert_ne!(cluster_color(1), cluster_color(2));
        // Hue 0 at 70% saturation, 60% lightness.
        assert_eq!(cluster_color(0), Color32::from_rgb(224, 82, 82));
    }
}
