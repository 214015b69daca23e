mod app;
mod history;
mod layout;
mod physics;
mod util;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "watch_graph=info";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Pre-clustered watch history (JSON array of records).
    #[arg(long, default_value = "data/youtube_watch_history_clustered.json")]
    data: PathBuf,

    /// Tracing filter directives; falls back to RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,
}

fn init_tracing(directives: Option<&str>) {
    let filter = directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> eframe::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_filter.as_deref());

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "watch-graph",
        options,
        Box::new(move |cc| Ok(Box::new(app::WatchGraphApp::new(cc, args.data.clone())))),
    )
}
