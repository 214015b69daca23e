mod collect;
mod graph;
mod model;
mod parse;
mod similarity;

pub use collect::load_watch_history;
pub use graph::{ClusterGraph, GraphConfig};
pub use model::{ClusterAggregate, ClusterId, WatchHistory, WatchRecord, cluster_display_name};

#[cfg(test)]
pub use collect::history_from_json;
#[cfg(test)]
pub use model::VideoId;
