use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::{ChannelCount, ClusterAggregate, ClusterId, WatchHistory, WatchRecord};
use super::parse::{ParsedRecord, RecordIssue, parse_watch_history};
use super::similarity::{average_vector, dominant_dimension};

pub const TOP_CHANNEL_LIMIT: usize = 5;

pub fn load_watch_history(path: &Path) -> Result<WatchHistory> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read watch history from {}", path.display()))?;

    history_from_json(&raw, path.display().to_string())
        .with_context(|| format!("failed to parse watch history in {}", path.display()))
}

pub fn history_from_json(raw: &str, source: String) -> Result<WatchHistory> {
    let mut parsed = parse_watch_history(raw)?;
    let dimension = enforce_dimension(&mut parsed.records);

    let issue_count = parsed
        .records
        .iter()
        .filter(|record| !record.issues.is_empty())
        .count();
    let records = parsed
        .records
        .into_iter()
        .map(|parsed| parsed.record)
        .collect::<Vec<_>>();
    let record_count = records.len();
    let clusters = aggregate_clusters(records, TOP_CHANNEL_LIMIT);

    tracing::info!(
        source = %source,
        records = record_count,
        clusters = clusters.len(),
        dimension = ?dimension,
        with_issues = issue_count,
        skipped = parsed.skipped,
        "loaded watch history"
    );

    Ok(WatchHistory {
        source,
        record_count,
        skipped_count: parsed.skipped,
        issue_count,
        clusters,
    })
}

/// Partitions records by cluster id. Member order follows input order.
pub fn aggregate_clusters(
    records: Vec<WatchRecord>,
    top_channel_limit: usize,
) -> BTreeMap<ClusterId, ClusterAggregate> {
    let mut members_by_cluster: BTreeMap<ClusterId, Vec<WatchRecord>> = BTreeMap::new();
    for record in records {
        members_by_cluster
            .entry(record.cluster_id)
            .or_default()
            .push(record);
    }

    members_by_cluster
        .into_iter()
        .map(|(id, members)| {
            let centroid = cluster_centroid(id, &members);
            let top_channels = top_channels(&members, top_channel_limit);
            (
                id,
                ClusterAggregate {
                    id,
                    members,
                    centroid,
                    top_channels,
                },
            )
        })
        .collect()
}

/// Drops every vector whose length differs from the most common one in the
/// dataset, flagging its record. Returns the dimension that was kept.
fn enforce_dimension(records: &mut [ParsedRecord]) -> Option<usize> {
    let dimension = dominant_dimension(
        records
            .iter()
            .filter_map(|parsed| parsed.record.vector.as_deref()),
    )?;

    let mut dropped = 0;
    for parsed in records.iter_mut() {
        if parsed
            .record
            .vector
            .as_ref()
            .is_some_and(|vector| vector.len() != dimension)
        {
            parsed.record.vector = None;
            if !parsed.issues.contains(&RecordIssue::MalformedVector) {
                parsed.issues.push(RecordIssue::MalformedVector);
            }
            dropped += 1;
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, dimension, "dropping vectors with mismatched dimensionality");
    }

    Some(dimension)
}

fn cluster_centroid(id: ClusterId, members: &[WatchRecord]) -> Option<Vec<f32>> {
    let mut vectors = members
        .iter()
        .filter_map(|member| member.vector.as_deref())
        .collect::<Vec<_>>();
    let dimension = dominant_dimension(vectors.iter().copied())?;

    let before = vectors.len();
    vectors.retain(|vector| vector.len() == dimension);
    if vectors.len() != before {
        tracing::warn!(
            cluster = id,
            dropped = before - vectors.len(),
            dimension,
            "ignoring member vectors with mismatched dimensionality"
        );
    }

    average_vector(&vectors)
}

fn top_channels(members: &[WatchRecord], limit: usize) -> Vec<ChannelCount> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<ChannelCount> = Vec::new();

    for member in members {
        let name = member.channel_name.as_str();
        match first_seen.get(name) {
            Some(&slot) => counts[slot].count += 1,
            None => {
                first_seen.insert(name, counts.len());
                counts.push(ChannelCount {
                    name: name.to_owned(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::history::model::{UNCLUSTERED, VideoId};
    use crate::history::{ClusterGraph, GraphConfig};

    fn record(cluster_id: ClusterId, channel: &str, vector: Option<Vec<f32>>) -> WatchRecord {
        WatchRecord {
            video_id: VideoId::Known(format!("{channel}-{cluster_id}")),
            title: format!("video by {channel}"),
            channel_name: channel.to_owned(),
            timestamp: String::new(),
            watched_at: None,
            cluster_id,
            vector,
        }
    }

    #[test]
    fn grouping_is_a_partition() {
        let records = vec![
            record(0, "a", None),
            record(1, "b", None),
            record(0, "c", None),
            record(UNCLUSTERED, "d", None),
            record(2, "e", None),
            record(1, "f", None),
        ];
        let input_len = records.len();

        let clusters = aggregate_clusters(records, TOP_CHANNEL_LIMIT);
        assert_eq!(clusters.keys().copied().collect::<Vec<_>>(), vec![-1, 0, 1, 2]);

        let total = clusters
            .values()
            .map(ClusterAggregate::member_count)
            .sum::<usize>();
        assert_eq!(total, input_len);

        for (id, aggregate) in &clusters {
            assert!(aggregate.members.iter().all(|member| member.cluster_id == *id));
        }
        let zero_channels = clusters[&0]
            .members
            .iter()
            .map(|member| member.channel_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(zero_channels, vec!["a", "c"]);
    }

    #[test]
    fn top_channels_break_ties_by_first_occurrence() {
        let mut records = Vec::new();
        for channel in ["B", "A", "A", "B", "C", "A", "B", "A", "B", "A", "B"] {
            records.push(record(0, channel, None));
        }

        let clusters = aggregate_clusters(records, TOP_CHANNEL_LIMIT);
        assert_eq!(
            clusters[&0].top_channels,
            vec![
                ChannelCount {
                    name: "B".to_owned(),
                    count: 5
                },
                ChannelCount {
                    name: "A".to_owned(),
                    count: 5
                },
                ChannelCount {
                    name: "C".to_owned(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn top_channels_are_truncated() {
        let records = ["a", "b", "c", "d", "e", "f", "g", "a"]
            .into_iter()
            .map(|channel| record(0, channel, None))
            .collect::<Vec<_>>();

        let clusters = aggregate_clusters(records, TOP_CHANNEL_LIMIT);
        let top = &clusters[&0].top_channels;
        assert_eq!(top.len(), TOP_CHANNEL_LIMIT);
        assert_eq!(top[0].name, "a");
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn centroid_averages_present_vectors() {
        let records = vec![
            record(0, "a", Some(vec![1.0, 0.0])),
            record(0, "b", None),
            record(0, "c", Some(vec![0.0, 1.0])),
            record(0, "d", Some(vec![5.0, 5.0, 5.0])),
            record(1, "e", Some(vec![0.5, 0.25])),
            record(2, "f", None),
        ];

        let clusters = aggregate_clusters(records, TOP_CHANNEL_LIMIT);
        assert_eq!(clusters[&0].centroid, Some(vec![0.5, 0.5]));
        assert_eq!(clusters[&1].centroid, Some(vec![0.5, 0.25]));
        assert_eq!(clusters[&2].centroid, None);
    }

    #[test]
    fn loads_history_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[
                {{"video_url": "https://youtube.com/watch?v=one", "video_title": "One",
                  "channel_name": "X", "timestamp": "2024-01-01T00:00:00Z",
                  "cluster": 0, "vector": [1, 0]}},
                {{"video_url": "bad url", "video_title": "Two",
                  "channel_name": "Y", "timestamp": "2024-01-02T00:00:00Z",
                  "cluster": 0, "vector": [0, 1]}},
                {{"video_url": "https://youtube.com/watch?v=three", "video_title": "Three",
                  "channel_name": "X", "timestamp": "2024-01-03T00:00:00Z",
                  "cluster": -1, "vector": [1, 1]}}
            ]"#
        )
        .expect("write fixture");

        let history = load_watch_history(file.path()).expect("history loads");
        assert_eq!(history.record_count, 3);
        assert_eq!(history.issue_count, 1);
        assert_eq!(history.skipped_count, 0);
        assert_eq!(history.cluster_count(), 2);
        assert_eq!(history.largest_clusters(1), vec![0]);
        assert_eq!(history.clusters[&0].members[1].video_id, VideoId::Invalid);
    }

    #[test]
    fn odd_length_vector_is_dropped_and_counted() {
        let mut entries = vec![
            r#"{"video_url": "https://youtube.com/watch?v=odd", "timestamp": "2024-01-01",
                "cluster": 0, "vector": [1, 0, 0]}"#
                .to_owned(),
        ];
        for index in 0..50 {
            entries.push(format!(
                r#"{{"video_url": "https://youtube.com/watch?v=a{index}",
                    "timestamp": "2024-01-01", "cluster": 0, "vector": [1, 0]}}"#
            ));
        }
        entries.push(
            r#"{"video_url": "https://youtube.com/watch?v=b", "timestamp": "2024-01-01",
                "cluster": 1, "vector": [1, 0]}"#
                .to_owned(),
        );
        let raw = format!("[{}]", entries.join(","));

        let history = history_from_json(&raw, "fixture".to_owned()).expect("history");
        assert_eq!(history.issue_count, 1);
        assert_eq!(history.clusters[&0].members[0].vector, None);
        assert_eq!(history.clusters[&0].centroid, Some(vec![1.0, 0.0]));

        let graph = ClusterGraph::build(&history.clusters, GraphConfig::default());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].similarity, 1.0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let directory = tempfile::tempdir().expect("temp dir");
        let result = load_watch_history(&directory.path().join("missing.json"));
        assert!(result.is_err());
    }
}
