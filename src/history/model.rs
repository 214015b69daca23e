use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

pub type ClusterId = i64;

pub const UNCLUSTERED: ClusterId = -1;

/// Video identifier taken from the `v` query parameter of a watch URL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VideoId {
    Known(String),
    Invalid,
}

impl VideoId {
    pub const INVALID_MARKER: &'static str = "invalid";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(id) => id,
            Self::Invalid => Self::INVALID_MARKER,
        }
    }

    pub fn thumbnail_url(&self) -> Option<String> {
        match self {
            Self::Known(id) => Some(format!("https://img.youtube.com/vi/{id}/default.jpg")),
            Self::Invalid => None,
        }
    }

    pub fn watch_url(&self) -> Option<String> {
        match self {
            Self::Known(id) => Some(format!("https://youtube.com/watch?v={id}")),
            Self::Invalid => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WatchRecord {
    pub video_id: VideoId,
    pub title: String,
    pub channel_name: String,
    pub timestamp: String,
    pub watched_at: Option<DateTime<FixedOffset>>,
    pub cluster_id: ClusterId,
    pub vector: Option<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelCount {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug)]
pub struct ClusterAggregate {
    pub id: ClusterId,
    pub members: Vec<WatchRecord>,
    /// Component-wise mean of the member vectors; `None` when no member carries one.
    pub centroid: Option<Vec<f32>>,
    /// Most frequent channels, highest count first, ties in first-seen order.
    pub top_channels: Vec<ChannelCount>,
}

impl ClusterAggregate {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn display_name(&self) -> String {
        cluster_display_name(self.id)
    }

    /// Members ordered most recent first. Records without a parseable
    /// timestamp keep their input order after all dated records.
    pub fn recent_members(&self, limit: usize) -> Vec<&WatchRecord> {
        let mut members = self.members.iter().collect::<Vec<_>>();
        members.sort_by(|a, b| match (&a.watched_at, &b.watched_at) {
            (Some(a_time), Some(b_time)) => b_time.cmp(a_time),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        members.truncate(limit);
        members
    }
}

pub fn cluster_display_name(id: ClusterId) -> String {
    if id == UNCLUSTERED {
        "Unclustered".to_owned()
    } else {
        format!("Cluster {id}")
    }
}

#[derive(Clone, Debug)]
pub struct WatchHistory {
    pub source: String,
    pub record_count: usize,
    pub skipped_count: usize,
    pub issue_count: usize,
    pub clusters: BTreeMap<ClusterId, ClusterAggregate>,
}

impl WatchHistory {
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn largest_clusters(&self, limit: usize) -> Vec<ClusterId> {
        let mut ids = self.clusters.keys().copied().collect::<Vec<_>>();
        ids.sort_by(|a, b| {
            let a_count = self.clusters.get(a).map_or(0, ClusterAggregate::member_count);
            let b_count = self.clusters.get(b).map_or(0, ClusterAggregate::member_count);
            b_count.cmp(&a_count).then_with(|| a.cmp(b))
        });
        ids.truncate(limit);
        ids
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn record(title: &str, timestamp: Option<&str>) -> WatchRecord {
        WatchRecord {
            video_id: VideoId::Known(title.to_owned()),
            title: title.to_owned(),
            channel_name: "channel".to_owned(),
            timestamp: timestamp.unwrap_or_default().to_owned(),
            watched_at: timestamp.and_then(|value| DateTime::parse_from_rfc3339(value).ok()),
            cluster_id: 0,
            vector: None,
        }
    }

    #[test]
    fn invalid_video_id_has_no_links() {
        assert_eq!(VideoId::Invalid.as_str(), "invalid");
        assert_eq!(VideoId::Invalid.thumbnail_url(), None);
        assert_eq!(VideoId::Invalid.watch_url(), None);
    }

    #[test]
    fn known_video_id_builds_links() {
        let id = VideoId::Known("abc123".to_owned());
        assert_eq!(
            id.thumbnail_url().as_deref(),
            Some("https://img.youtube.com/vi/abc123/default.jpg")
        );
        assert_eq!(
            id.watch_url().as_deref(),
            Some("https://youtube.com/watch?v=abc123")
        );
    }

    #[test]
    fn recent_members_sorts_newest_first_with_undated_last() {
        let aggregate = ClusterAggregate {
            id: 3,
            members: vec![
                record("old", Some("2023-01-01T00:00:00Z")),
                record("undated", None),
                record("new", Some("2024-06-01T12:00:00Z")),
            ],
            centroid: None,
            top_channels: Vec::new(),
        };

        let titles = aggregate
            .recent_members(10)
            .into_iter()
            .map(|member| member.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["new", "old", "undated"]);
        assert_eq!(aggregate.recent_members(1).len(), 1);
    }

    #[test]
    fn display_names() {
        assert_eq!(cluster_display_name(UNCLUSTERED), "Unclustered");
        assert_eq!(cluster_display_name(7), "Cluster 7");
    }
}
