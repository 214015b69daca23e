use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Pos2, Vec2};

use crate::history::{ClusterGraph, ClusterId, GraphConfig, WatchHistory, load_watch_history};
use crate::physics::{LayoutConfig, QuadtreeCell, Simulation};

mod graph;
mod highlight;
mod render_utils;
mod ui;

type LoadResult = Result<WatchHistory, String>;

pub struct WatchGraphApp {
    data_path: PathBuf,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    history: WatchHistory,
    graph: ClusterGraph,
    graph_config: GraphConfig,
    layout_config: LayoutConfig,
    simulation: Simulation,
    search: String,
    selected: Option<ClusterId>,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    show_quadtree_overlay: bool,
    graph_dirty: bool,
    graph_revision: u64,
    search_match_cache: Option<SearchMatchCache>,
    largest_clusters: Vec<ClusterId>,
    cluster_rows_visible: usize,
    video_rows_visible: usize,
    view_scratch: ViewScratch,
    visible_node_count: usize,
    visible_edge_count: usize,
}

struct SearchMatchCache {
    query: String,
    graph_revision: u64,
    matches: Arc<HashSet<usize>>,
}

#[derive(Default)]
struct ViewScratch {
    screen_positions: Vec<Pos2>,
    screen_radii: Vec<f32>,
    visible_indices: Vec<usize>,
    visible_mask: Vec<bool>,
    draw_order: Vec<usize>,
    draw_order_dirty: bool,
    quadtree_cells: Vec<QuadtreeCell>,
}

struct HighlightState {
    related_nodes: HashSet<usize>,
    related_edges: HashSet<usize>,
}

#[derive(Clone)]
struct SimilarClusterEntry {
    cluster_id: ClusterId,
    similarity: f32,
    member_count: usize,
}

impl WatchGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, data_path: PathBuf) -> Self {
        let state = Self::start_load(data_path.clone());
        Self {
            data_path,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(data_path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_watch_history(&data_path).map_err(|error| {
                tracing::error!(path = %data_path.display(), "{error:#}");
                format!("{error:#}")
            });
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(data_path: PathBuf) -> AppState {
        tracing::info!(path = %data_path.display(), "loading watch history");
        AppState::Loading {
            rx: Self::spawn_load(data_path),
        }
    }

    fn ready(history: WatchHistory) -> AppState {
        AppState::Ready(Box::new(ViewModel::new(history)))
    }
}

impl eframe::App for WatchGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(result) => {
                        transition = Some(match result {
                            Ok(history) => Self::ready(history),
                            Err(error) => AppState::Error(error),
                        });
                    }
                    Err(TryRecvError::Empty) => ctx.request_repaint(),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error(
                            "Background load worker disconnected".to_owned(),
                        ));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading watch history...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load watch history");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(6.0);
                    ui.small(format!("data file: {}", self.data_path.display()));
                });
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                model.show(ctx, &mut reload_requested, is_reloading);

                if reload_requested && self.reload_rx.is_none() {
                    self.reload_rx = Some(Self::spawn_load(self.data_path.clone()));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(result) => {
                            // The replaced view model drops its simulation with it.
                            model.simulation.stop();
                            transition = Some(match result {
                                Ok(history) => Self::ready(history),
                                Err(error) => AppState::Error(error),
                            });
                        }
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition = Some(AppState::Error(
                                "Background load worker disconnected".to_owned(),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
