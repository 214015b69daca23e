use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{self, Align2, Color32, FontId, Rect, Sense, Stroke, Ui, Vec2, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::history::{ClusterAggregate, ClusterGraph, WatchHistory};
use crate::util::format_count;

use super::super::highlight::build_highlight_state;
use super::super::render_utils::{
    blend_color, dim_color, draw_background, edge_color, edge_visible, label_color,
    world_to_screen,
};
use super::super::{SearchMatchCache, ViewModel, ViewScratch};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

fn cluster_matches(matcher: &SkimMatcherV2, cluster: &ClusterAggregate, query: &str) -> bool {
    fuzzy_match_score(matcher, &cluster.display_name(), query).is_some()
        || cluster.members.iter().any(|member| {
            fuzzy_match_score(matcher, &member.title, query).is_some()
                || fuzzy_match_score(matcher, &member.channel_name, query).is_some()
        })
}

/// Node indices whose cluster name, member titles or channels match `query`.
fn search_matches(graph: &ClusterGraph, history: &WatchHistory, query: &str) -> HashSet<usize> {
    let matcher = SkimMatcherV2::default();
    graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| {
            history
                .clusters
                .get(&node.cluster_id)
                .is_some_and(|cluster| cluster_matches(&matcher, cluster, query))
        })
        .map(|(index, _)| index)
        .collect()
}

impl ViewModel {
    fn update_screen_space(&mut self, rect: Rect) {
        let scratch = &mut self.view_scratch;
        scratch.screen_positions.clear();
        scratch.screen_radii.clear();
        for (index, node) in self.graph.nodes.iter().enumerate() {
            let world = self.simulation.position(index).unwrap_or(Vec2::ZERO);
            scratch
                .screen_positions
                .push(world_to_screen(rect, self.pan, self.zoom, world));
            scratch
                .screen_radii
                .push((node.size * 0.5 * self.zoom).max(2.0));
        }
    }

    /// Small clusters are painted last so they stay clickable on top of big ones.
    fn ensure_draw_order(graph: &ClusterGraph, scratch: &mut ViewScratch) {
        if !scratch.draw_order_dirty && scratch.draw_order.len() == graph.node_count() {
            return;
        }

        scratch.draw_order.clear();
        scratch.draw_order.extend(0..graph.node_count());
        scratch.draw_order.sort_by(|a, b| {
            graph.nodes[*b]
                .member_count
                .cmp(&graph.nodes[*a].member_count)
        });
        scratch.draw_order_dirty = false;
    }

    pub(in crate::app) fn cached_search_matches(&mut self) -> Option<Arc<HashSet<usize>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.graph_revision == self.graph_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matches = Arc::new(search_matches(&self.graph, &self.history, query));
        tracing::debug!(query, matches = matches.len(), "search matches refreshed");

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            graph_revision: self.graph_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        if self.graph_dirty {
            self.rebuild_cluster_graph();
        }

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.pan, self.zoom);

        if self.graph.node_count() == 0 {
            self.visible_node_count = 0;
            self.visible_edge_count = 0;
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No clusters to display.",
                FontId::proportional(15.0),
                Color32::from_gray(200),
            );
            return;
        }

        self.handle_graph_zoom(ui, rect, &response);
        self.handle_graph_pan(&response);

        // One tick per frame; the host loop is the scheduler.
        let physics_moving = self.live_physics && self.simulation.step();
        if physics_moving || response.dragged() {
            ui.ctx().request_repaint();
        }

        let search_matches = self.cached_search_matches();
        self.update_screen_space(rect);

        let scratch = &mut self.view_scratch;
        Self::visible_indices_into(
            rect,
            &scratch.screen_positions,
            &scratch.screen_radii,
            &mut scratch.visible_indices,
        );
        scratch.visible_mask.clear();
        scratch.visible_mask.resize(self.graph.node_count(), false);
        for &index in &scratch.visible_indices {
            if let Some(entry) = scratch.visible_mask.get_mut(index) {
                *entry = true;
            }
        }
        self.visible_node_count = scratch.visible_indices.len();

        if self.show_quadtree_overlay {
            self.simulation.quadtree_cells(&mut scratch.quadtree_cells);
            for cell in &scratch.quadtree_cells {
                let min = cell.center - vec2(cell.half_extent, cell.half_extent);
                let max = cell.center + vec2(cell.half_extent, cell.half_extent);
                let top_left = world_to_screen(rect, self.pan, self.zoom, vec2(min.x, min.y));
                let top_right = world_to_screen(rect, self.pan, self.zoom, vec2(max.x, min.y));
                let bottom_right = world_to_screen(rect, self.pan, self.zoom, vec2(max.x, max.y));
                let bottom_left = world_to_screen(rect, self.pan, self.zoom, vec2(min.x, max.y));

                let alpha = if cell.is_leaf { 110 } else { 55 };
                let line_width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
                let stroke = Stroke::new(
                    line_width,
                    Color32::from_rgba_unmultiplied(106, 198, 255, alpha),
                );

                painter.line_segment([top_left, top_right], stroke);
                painter.line_segment([top_right, bottom_right], stroke);
                painter.line_segment([bottom_right, bottom_left], stroke);
                painter.line_segment([bottom_left, top_left], stroke);
            }
        }

        let hovered = Self::hovered_index(
            ui,
            &scratch.visible_indices,
            &scratch.screen_positions,
            &scratch.screen_radii,
        );
        if hovered.is_some() {
            ui.output_mut(|output| {
                output.cursor_icon = egui::CursorIcon::PointingHand;
            });
        }

        let pending_selection = response
            .clicked_by(egui::PointerButton::Primary)
            .then(|| hovered.map(|(index, _)| self.graph.nodes[index].cluster_id));

        let hovered_index = hovered.map(|(index, _)| index);
        let highlight = self
            .selected
            .and_then(|selected| build_highlight_state(&self.graph, selected));
        let selection_active = highlight.is_some();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());

        let zoom_sqrt = self.zoom.sqrt();
        let mut visible_edge_count = 0usize;
        for (edge_index, edge) in self.graph.edges.iter().enumerate() {
            let start = scratch.screen_positions[edge.source];
            let end = scratch.screen_positions[edge.target];
            let any_end_visible =
                scratch.visible_mask[edge.source] || scratch.visible_mask[edge.target];
            if !any_end_visible && !edge_visible(rect, start, end, 2.5) {
                continue;
            }

            let is_related_edge = highlight
                .as_ref()
                .is_some_and(|state| state.related_edges.contains(&edge_index));

            let base = edge_color(edge.strength);
            let (line_width, line_color) = if is_related_edge {
                (
                    ((1.2 + edge.strength * 2.4) * zoom_sqrt).clamp(1.2, 5.0),
                    Color32::from_rgb(245, 206, 93),
                )
            } else if selection_active {
                ((0.8 * zoom_sqrt).clamp(0.4, 1.6), dim_color(base, 0.45))
            } else {
                (((0.6 + edge.strength * 2.2) * zoom_sqrt).clamp(0.5, 4.0), base)
            };

            painter.line_segment([start, end], Stroke::new(line_width, line_color));
            visible_edge_count += 1;
        }
        self.visible_edge_count = visible_edge_count;

        let selected_color = Color32::WHITE;
        let mut selection_animating = false;

        Self::ensure_draw_order(&self.graph, scratch);
        for &index in &scratch.draw_order {
            if !scratch.visible_mask[index] {
                continue;
            }

            let node = &self.graph.nodes[index];
            let position = scratch.screen_positions[index];
            let radius = scratch.screen_radii[index];

            let is_selected = self.selected == Some(node.cluster_id);
            let is_hovered = hovered_index == Some(index);
            let is_related = highlight
                .as_ref()
                .is_some_and(|state| state.related_nodes.contains(&index));
            let is_search_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&index));

            let fill = if is_hovered {
                blend_color(node.color, Color32::WHITE, 0.25)
            } else if is_related || is_search_match {
                node.color
            } else if selection_active {
                dim_color(node.color, 0.45)
            } else if search_active {
                dim_color(node.color, 0.35)
            } else {
                node.color
            };

            let selection_mix = ui.ctx().animate_bool(
                ui.make_persistent_id(("cluster-selection", node.cluster_id)),
                is_selected,
            );
            if selection_mix > 0.0 && selection_mix < 1.0 {
                selection_animating = true;
            }

            painter.circle_filled(position, radius, fill);

            let (stroke_width, stroke_color) = if is_search_match && !is_selected {
                (2.0, Color32::from_rgb(103, 196, 255))
            } else {
                (1.0, Color32::from_rgba_unmultiplied(15, 15, 15, 190))
            };
            painter.circle_stroke(position, radius, Stroke::new(stroke_width, stroke_color));

            if selection_mix > 0.0 {
                let halo = blend_color(fill, selected_color, selection_mix);
                painter.circle_stroke(
                    position,
                    radius + 2.0 + (1.0 - selection_mix) * 6.0,
                    Stroke::new(1.5 + selection_mix * 1.5, halo),
                );
            }

            if radius >= 9.0 {
                painter.text(
                    position,
                    Align2::CENTER_CENTER,
                    format_count(node.member_count),
                    FontId::proportional((radius * 0.7).clamp(9.0, 16.0)),
                    label_color(fill),
                );
            }
        }

        if selection_animating {
            ui.ctx().request_repaint();
        }

        if let Some((index, _)) = hovered
            && let Some(node) = self.graph.nodes.get(index)
        {
            let name = self
                .history
                .clusters
                .get(&node.cluster_id)
                .map(ClusterAggregate::display_name)
                .unwrap_or_default();
            let mut panel_text = format!("{name}  |  {} videos", format_count(node.member_count));
            if !node.has_centroid {
                panel_text.push_str("  |  no embedding");
            } else if let Some(selected) = self.selected
                && selected != node.cluster_id
                && let Some(edge) = self.graph.edge_between(selected, node.cluster_id)
            {
                panel_text.push_str(&format!(
                    "  |  {:.0}% similar to selection",
                    edge.similarity * 100.0
                ));
            }
            painter.text(
                rect.left_top() + vec2(10.0, 10.0),
                Align2::LEFT_TOP,
                panel_text,
                FontId::proportional(13.0),
                Color32::from_gray(240),
            );
        }

        if let Some(selected) = pending_selection {
            self.apply_graph_selection(selected);
        }
    }
}
