use std::collections::HashSet;

use crate::history::{ClusterGraph, ClusterId, WatchHistory};

use super::{HighlightState, SimilarClusterEntry};

/// Selected node plus every node and edge one similarity link away.
pub(super) fn build_highlight_state(
    graph: &ClusterGraph,
    selected: ClusterId,
) -> Option<HighlightState> {
    let selected_index = graph.index_of(selected)?;

    let mut related_nodes = HashSet::new();
    let mut related_edges = HashSet::new();
    related_nodes.insert(selected_index);

    for (edge_index, edge) in graph.edges.iter().enumerate() {
        if edge.source == selected_index || edge.target == selected_index {
            related_edges.insert(edge_index);
            related_nodes.insert(edge.source);
            related_nodes.insert(edge.target);
        }
    }

    Some(HighlightState {
        related_nodes,
        related_edges,
    })
}

pub(super) fn similar_clusters(
    graph: &ClusterGraph,
    history: &WatchHistory,
    selected: ClusterId,
) -> Vec<SimilarClusterEntry> {
    let Some(selected_index) = graph.index_of(selected) else {
        return Vec::new();
    };

    graph
        .neighbors(selected_index)
        .into_iter()
        .filter_map(|(index, similarity)| {
            let node = graph.nodes.get(index)?;
            Some(SimilarClusterEntry {
                cluster_id: node.cluster_id,
                similarity,
                member_count: history
                    .clusters
                    .get(&node.cluster_id)
                    .map_or(node.member_count, |cluster| cluster.member_count()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{GraphConfig, history_from_json};

    fn history() -> WatchHistory {
        let raw = r#"[
            {"video_url": "https://www.youtube.com/watch?v=a1", "cluster": 0, "vector": [1.0, 0.0]},
            {"video_url": "https://www.youtube.com/watch?v=a2", "cluster": 0, "vector": [1.0, 0.0]},
            {"video_url": "https://www.youtube.com/watch?v=b1", "cluster": 1, "vector": [1.0, 0.2]},
            {"video_url": "https://www.youtube.com/watch?v=c1", "cluster": 2, "vector": [0.0, 1.0]},
            {"video_url": "https://www.youtube.com/watch?v=d1", "cluster": 3, "vector": [0.9, 0.1]}
        ]"#;
        history_from_json(raw, "test".to_owned()).expect("history")
    }

    #[test]
    fn highlight_covers_direct_neighbors_only() {
        let history = history();
        let graph = ClusterGraph::build(&history.clusters, GraphConfig::default());
        let state = build_highlight_state(&graph, 2).expect("cluster 2 is in the graph");

        assert_eq!(state.related_nodes.len(), 1);
        assert!(state.related_edges.is_empty());

        let state = build_highlight_state(&graph, 0).expect("cluster 0 is in the graph");
        let ids = state
            .related_nodes
            .iter()
            .map(|&index| graph.nodes[index].cluster_id)
            .collect::<HashSet<_>>();
        assert_eq!(ids, HashSet::from([0, 1, 3]));
        assert_eq!(state.related_edges.len(), 2);
        assert!(build_highlight_state(&graph, 42).is_none());
    }

    #[test]
    fn similar_clusters_are_ranked_with_member_counts() {
        let history = history();
        let graph = ClusterGraph::build(&history.clusters, GraphConfig::default());
        let entries = similar_clusters(&graph, &history, 1);

        let ids = entries.iter().map(|entry| entry.cluster_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 0]);
        assert_eq!(entries[1].member_count, 2);
        assert!(entries[0].similarity >= entries[1].similarity);
    }
}
