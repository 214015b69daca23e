use eframe::egui::{self, Align, Context, Layout, Vec2};

use crate::history::{ClusterGraph, ClusterId, GraphConfig, WatchHistory};
use crate::physics::{LayoutConfig, Simulation, SimulationState};
use crate::util::format_count;

use super::super::{ViewModel, ViewScratch};

impl ViewModel {
    pub(in crate::app) const INITIAL_RANKING_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PAGE_ROWS: usize = 20;
    pub(in crate::app) const RANKING_PREFETCH_MARGIN: usize = 4;
    pub(in crate::app) const INITIAL_VIDEO_ROWS: usize = 25;
    pub(in crate::app) const VIDEO_PAGE_ROWS: usize = 25;
    pub(in crate::app) const VIDEO_PREFETCH_MARGIN: usize = 4;
    /// Members listed for the selected cluster, most recent first.
    pub(in crate::app) const DISPLAYED_MEMBER_LIMIT: usize = 100;

    pub(in crate::app) fn new(history: WatchHistory) -> Self {
        let largest_clusters = history.largest_clusters(history.cluster_count());
        let layout_config = LayoutConfig::default();

        Self {
            history,
            graph: ClusterGraph::default(),
            graph_config: GraphConfig::default(),
            layout_config,
            simulation: Simulation::new(layout_config),
            search: String::new(),
            selected: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            live_physics: true,
            show_quadtree_overlay: false,
            graph_dirty: true,
            graph_revision: 0,
            search_match_cache: None,
            largest_clusters,
            cluster_rows_visible: Self::INITIAL_RANKING_ROWS,
            video_rows_visible: Self::INITIAL_VIDEO_ROWS,
            view_scratch: ViewScratch::default(),
            visible_node_count: 0,
            visible_edge_count: 0,
        }
    }

    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        if self.graph_dirty {
            self.rebuild_cluster_graph();
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("watch-graph");
                    ui.separator();
                    ui.label(format!(
                        "{} videos analyzed",
                        format_count(self.history.record_count)
                    ))
                    .on_hover_text(self.history.source.as_str());
                    ui.label(format!("clusters: {}", self.history.cluster_count()));
                    ui.label(format!("links: {}", self.graph.edge_count()));
                    if self.history.issue_count > 0 || self.history.skipped_count > 0 {
                        ui.label(format!(
                            "issues: {} (skipped {})",
                            self.history.issue_count, self.history.skipped_count
                        ))
                        .on_hover_text(
                            "Records with a malformed URL, timestamp or vector are kept with \
                             fallback values. Unreadable records are skipped.",
                        );
                    }
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload data"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    if ui.button("Rebuild graph").clicked() {
                        self.graph_dirty = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(self.visible_graph_text());
                        ui.label(self.simulation_status_text());
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading watch history...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    pub(in crate::app) fn set_selected(&mut self, selected: Option<ClusterId>) {
        if self.selected == selected {
            return;
        }

        tracing::debug!(?selected, "cluster selection changed");
        self.selected = selected;
        self.video_rows_visible = Self::INITIAL_VIDEO_ROWS;
    }

    fn visible_graph_text(&self) -> String {
        format!(
            "visible: {} / {} clusters, {} links",
            self.visible_node_count,
            self.graph.node_count(),
            self.visible_edge_count
        )
    }

    fn simulation_status_text(&self) -> String {
        match self.simulation.state() {
            SimulationState::Idle => "layout idle".to_owned(),
            SimulationState::Running => format!(
                "layout tick {} / {}",
                self.simulation.tick(),
                self.layout_config.cooldown_ticks
            ),
            SimulationState::Settled => format!("layout settled after {}", self.simulation.tick()),
            SimulationState::Stopped => "layout stopped".to_owned(),
        }
    }
}
