use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::model::{ClusterId, UNCLUSTERED, VideoId, WatchRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RecordIssue {
    #[error("video_url is missing or not a valid URL")]
    InvalidUrl,
    #[error("video_url has no `v` query parameter")]
    MissingVideoId,
    #[error("vector is not a numeric array of the dataset's dimension")]
    MalformedVector,
    #[error("timestamp is not an ISO-8601 date")]
    InvalidTimestamp,
    #[error("cluster is missing or not an integer")]
    InvalidCluster,
}

#[derive(Clone, Debug, Deserialize)]
struct RawWatchEntry {
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    video_title: Option<String>,
    #[serde(default)]
    channel_name: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    cluster: Option<Value>,
    #[serde(default)]
    vector: Option<Value>,
}

#[derive(Clone, Debug)]
pub(super) struct ParsedRecord {
    pub(super) record: WatchRecord,
    pub(super) issues: Vec<RecordIssue>,
}

#[derive(Clone, Debug, Default)]
pub(super) struct ParsedHistory {
    pub(super) records: Vec<ParsedRecord>,
    pub(super) skipped: usize,
}

pub(super) fn parse_watch_history(raw: &str) -> Result<ParsedHistory> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON in watch history")?;
    let entries = parsed
        .as_array()
        .ok_or_else(|| anyhow!("watch history must be a JSON array of records"))?;

    let mut history = ParsedHistory {
        records: Vec::with_capacity(entries.len()),
        skipped: 0,
    };

    for (index, value) in entries.iter().enumerate() {
        match RawWatchEntry::deserialize(value) {
            Ok(entry) => {
                let parsed = parse_entry(entry);
                for issue in &parsed.issues {
                    tracing::warn!(record = index, %issue, "tolerating malformed watch record");
                }
                history.records.push(parsed);
            }
            Err(error) => {
                tracing::warn!(record = index, %error, "skipping unreadable watch record");
                history.skipped += 1;
            }
        }
    }

    Ok(history)
}

fn parse_entry(entry: RawWatchEntry) -> ParsedRecord {
    let mut issues = Vec::new();

    let video_id = match entry.video_url.as_deref().map(video_id_from_url) {
        Some(Ok(id)) => id,
        Some(Err(issue)) => {
            issues.push(issue);
            VideoId::Invalid
        }
        None => {
            issues.push(RecordIssue::InvalidUrl);
            VideoId::Invalid
        }
    };

    let timestamp = entry.timestamp.unwrap_or_default();
    let watched_at = parse_timestamp(&timestamp);
    if watched_at.is_none() {
        issues.push(RecordIssue::InvalidTimestamp);
    }

    let cluster_id = match entry.cluster.as_ref().map(cluster_from_value) {
        Some(Some(id)) => id,
        _ => {
            issues.push(RecordIssue::InvalidCluster);
            UNCLUSTERED
        }
    };

    let vector = match entry.vector {
        None | Some(Value::Null) => None,
        Some(value) => {
            let vector = vector_from_value(&value);
            if vector.is_none() {
                issues.push(RecordIssue::MalformedVector);
            }
            vector
        }
    };

    ParsedRecord {
        record: WatchRecord {
            video_id,
            title: entry.video_title.unwrap_or_default(),
            channel_name: entry.channel_name.unwrap_or_default(),
            timestamp,
            watched_at,
            cluster_id,
            vector,
        },
        issues,
    }
}

pub(super) fn video_id_from_url(raw: &str) -> Result<VideoId, RecordIssue> {
    let url = Url::parse(raw.trim()).map_err(|_| RecordIssue::InvalidUrl)?;
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(VideoId::Known)
        .ok_or(RecordIssue::MissingVideoId)
}

pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp);
    }

    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

fn cluster_from_value(value: &Value) -> Option<ClusterId> {
    if let Some(id) = value.as_i64() {
        return Some(id);
    }

    match value {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number
            .as_f64()
            .filter(|id| id.fract() == 0.0 && id.is_finite())
            .map(|id| id as ClusterId),
        _ => None,
    }
}

fn vector_from_value(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }

    items
        .iter()
        .map(|item| item.as_f64().map(|component| component as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_video_id_from_query() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Ok(VideoId::Known("dQw4w9WgXcQ".to_owned()))
        );
    }

    #[test]
    fn malformed_urls_fall_back_to_sentinel() {
        assert_eq!(video_id_from_url("not a url"), Err(RecordIssue::InvalidUrl));
        assert_eq!(
            video_id_from_url("https://www.youtube.com/post/123"),
            Err(RecordIssue::MissingVideoId)
        );
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v="),
            Err(RecordIssue::MissingVideoId)
        );
    }

    #[test]
    fn parses_iso_timestamp_variants() {
        assert!(parse_timestamp("2024-03-05T10:15:30Z").is_some());
        assert!(parse_timestamp("2024-03-05T10:15:30+02:00").is_some());
        assert!(parse_timestamp("2024-03-05T10:15:30.250").is_some());
        assert!(parse_timestamp("2024-03-05").is_some());
        assert!(parse_timestamp("Mar 5, 2024, 10:15:30 AM").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn parses_well_formed_record_without_issues() {
        let raw = r#"[{
            "video_url": "https://www.youtube.com/watch?v=abc",
            "video_title": "Rust in production",
            "channel_name": "Ferris",
            "timestamp": "2024-01-02T03:04:05Z",
            "cluster": 4,
            "vector": [0.5, -1.0, 2]
        }]"#;

        let history = parse_watch_history(raw).expect("valid history");
        assert_eq!(history.skipped, 0);
        assert_eq!(history.records.len(), 1);

        let parsed = &history.records[0];
        assert!(parsed.issues.is_empty());
        assert_eq!(parsed.record.video_id, VideoId::Known("abc".to_owned()));
        assert_eq!(parsed.record.cluster_id, 4);
        assert_eq!(parsed.record.vector, Some(vec![0.5, -1.0, 2.0]));
        assert!(parsed.record.watched_at.is_some());
    }

    #[test]
    fn malformed_fields_are_tolerated_per_record() {
        let raw = r#"[
            {"video_url": "::", "video_title": "t", "channel_name": "c",
             "timestamp": "yesterday", "cluster": 1, "vector": [1, "x"]},
            {"video_title": "no url", "cluster": "2", "vector": []},
            42
        ]"#;

        let history = parse_watch_history(raw).expect("array parses");
        assert_eq!(history.records.len(), 2);
        assert_eq!(history.skipped, 1);

        let first = &history.records[0];
        assert_eq!(first.record.video_id, VideoId::Invalid);
        assert_eq!(first.record.vector, None);
        assert_eq!(first.record.cluster_id, 1);
        assert!(first.issues.contains(&RecordIssue::InvalidUrl));
        assert!(first.issues.contains(&RecordIssue::InvalidTimestamp));
        assert!(first.issues.contains(&RecordIssue::MalformedVector));

        let second = &history.records[1];
        assert_eq!(second.record.video_id.as_str(), "invalid");
        assert_eq!(second.record.cluster_id, 2);
        assert!(second.issues.contains(&RecordIssue::MalformedVector));
    }

    #[test]
    fn missing_cluster_is_unclustered() {
        let raw = r#"[{"video_url": "https://youtube.com/watch?v=a", "timestamp": "2024-01-01"}]"#;
        let history = parse_watch_history(raw).expect("array parses");
        let parsed = &history.records[0];
        assert_eq!(parsed.record.cluster_id, UNCLUSTERED);
        assert_eq!(parsed.record.vector, None);
        assert_eq!(parsed.issues, vec![RecordIssue::InvalidCluster]);
    }

    #[test]
    fn rejects_non_array_documents() {
        assert!(parse_watch_history("{}").is_err());
        assert!(parse_watch_history("not json").is_err());
    }
}
