use std::ops::RangeInclusive;

use eframe::egui::{self, Align, Key, Layout, Response, RichText, Ui};

use crate::history::cluster_display_name;
use crate::util::format_count;

use super::super::ViewModel;

const ARROW_BASE_RATE: f32 = 10.0;
const ARROW_RAMP_PER_SEC: f32 = 9.0;
const ARROW_MAX_MULTIPLIER: f32 = 40.0;

/// Arrow key held on a focused slider and for how long.
#[derive(Clone, Copy, Default)]
struct ArrowHold {
    direction: i8,
    held_secs: f32,
}

/// Steps per second after holding an arrow key for `held_secs`.
fn arrow_hold_speed(held_secs: f32) -> f32 {
    let ramp = held_secs * ARROW_RAMP_PER_SEC;
    ARROW_BASE_RATE * (1.0 + ramp + 0.15 * ramp * ramp).min(ARROW_MAX_MULTIPLIER)
}

/// Signed travel for this frame, in slider steps, from a held arrow key.
fn arrow_key_travel(ui: &Ui, response: &Response) -> f32 {
    let id = response.id.with("arrow_hold");
    if !response.has_focus() {
        ui.ctx().data_mut(|data| data.remove::<ArrowHold>(id));
        return 0.0;
    }

    let (delta_time, direction) = ui.input(|input| {
        let up = input.key_down(Key::ArrowRight) || input.key_down(Key::ArrowUp);
        let down = input.key_down(Key::ArrowLeft) || input.key_down(Key::ArrowDown);
        (input.stable_dt.min(0.1), i8::from(up) - i8::from(down))
    });

    let mut hold = ui
        .ctx()
        .data(|data| data.get_temp::<ArrowHold>(id))
        .unwrap_or_default();
    if hold.direction != direction {
        hold = ArrowHold {
            direction,
            held_secs: 0.0,
        };
    }

    let travel = if direction == 0 {
        0.0
    } else {
        hold.held_secs += delta_time;
        ui.ctx().request_repaint();
        f32::from(direction) * arrow_hold_speed(hold.held_secs) * delta_time
    };
    ui.ctx().data_mut(|data| data.insert_temp(id, hold));
    travel
}

/// Slider that grabs focus on hover so held arrow keys accelerate it.
fn tuning_slider(
    ui: &mut Ui,
    value: &mut f32,
    range: RangeInclusive<f32>,
    label: &str,
    hover: &str,
) -> bool {
    let (min, max) = (*range.start(), *range.end());
    let step = ((max - min) / 200.0).max(0.0005);
    let slider = ui
        .add(
            egui::Slider::new(value, range)
                .text(label)
                .clamping(egui::SliderClamping::Always),
        )
        .on_hover_text(hover);
    if slider.hovered() {
        slider.request_focus();
    }

    let before = *value;
    *value = (*value + arrow_key_travel(ui, &slider) * step).clamp(min, max);
    slider.changed() || (*value - before).abs() > f32::EPSILON
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Graph Controls");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Search (video title or channel)")
            .on_hover_text("Fuzzy-highlight clusters containing a matching video.");
        ui.text_edit_singleline(&mut self.search)
            .on_hover_text("Matching clusters keep their color; the rest are dimmed.");
        if let Some(matches) = self.cached_search_matches() {
            ui.small(format!("{} matching clusters", matches.len()));
        }

        ui.separator();

        let mut graph_changed = tuning_slider(
            ui,
            &mut self.graph_config.similarity_threshold,
            0.0..=0.95,
            "Similarity threshold",
            "Clusters are linked only when their centroid similarity exceeds this value \
             (default 0.3).",
        );
        graph_changed |= ui
            .checkbox(&mut self.graph_config.include_unclustered, "Include unclustered")
            .on_hover_text("Show the bucket of videos that were not assigned a cluster.")
            .changed();
        if graph_changed {
            self.graph_dirty = true;
        }

        ui.separator();

        ui.checkbox(&mut self.live_physics, "Live physics simulation")
            .on_hover_text("Advance the layout one tick per frame until it settles.");
        ui.checkbox(&mut self.show_quadtree_overlay, "Show quadtree overlay")
            .on_hover_text("Draw the quadtree used for repulsion and collision checks.");

        ui.horizontal(|ui| {
            if ui.button("Restart layout").clicked() {
                self.restart_layout();
            }
            if ui
                .add_enabled(self.simulation.is_running(), egui::Button::new("Stop"))
                .clicked()
            {
                self.simulation.stop();
            }
            if ui
                .add_enabled(self.simulation.is_running(), egui::Button::new("Settle"))
                .on_hover_text("Run the remaining ticks now instead of one per frame.")
                .clicked()
            {
                let ticks = self.simulation.run_to_completion();
                tracing::debug!(ticks, "layout run to completion");
            }
            if ui.button("Reset view").clicked() {
                self.pan = egui::Vec2::ZERO;
                self.zoom = 1.0;
            }
        });

        ui.collapsing("Physics tuning", |ui| {
            let config = &mut self.layout_config;
            let mut changed = tuning_slider(
                ui,
                &mut config.charge_strength,
                0.0..=80_000.0,
                "Repulsion",
                "How strongly clusters push away from each other.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.link_strength,
                0.0..=0.4,
                "Link spring",
                "How strongly similar clusters pull toward their preferred distance.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.center_strength,
                0.0..=0.1,
                "Center pull",
                "Pull toward the middle of the canvas.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.collision_padding,
                0.0..=30.0,
                "Collision padding",
                "Extra space kept around each node.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.collision_strength,
                0.0..=1.0,
                "Collision",
                "How hard overlapping nodes are pushed apart.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.velocity_damping,
                0.5..=0.98,
                "Velocity damping",
                "Fraction of velocity kept between ticks.",
            );
            changed |= tuning_slider(
                ui,
                &mut config.alpha_decay,
                0.001..=0.1,
                "Cooling rate",
                "How quickly forces fade over the course of a run.",
            );

            changed |= ui
                .add(
                    egui::Slider::new(&mut config.cooldown_ticks, 10..=1000)
                        .text("Cooldown ticks")
                        .clamping(egui::SliderClamping::Always),
                )
                .on_hover_text("Upper bound on ticks per layout run.")
                .changed();

            if ui.button("Defaults").clicked() {
                *config = Default::default();
                changed = true;
            }

            if changed {
                self.apply_layout_config();
            }
        });

        ui.separator();

        egui::CollapsingHeader::new("Largest clusters")
            .default_open(true)
            .show(ui, |ui| self.draw_cluster_ranking(ui));
    }

    fn draw_cluster_ranking(&mut self, ui: &mut Ui) {
        let ids_len = self.largest_clusters.len();
        let row_count = ids_len.min(self.cluster_rows_visible);
        let mut should_load_more = false;
        let mut selected_id = None;

        egui::ScrollArea::vertical()
            .id_salt("cluster_ranking_scroll")
            .max_height(260.0)
            .auto_shrink([false, false])
            .show_rows(ui, 22.0, row_count, |ui, row_range| {
                if row_range.end + Self::RANKING_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for index in row_range {
                    let Some(&id) = self.largest_clusters.get(index) else {
                        continue;
                    };
                    let Some(cluster) = self.history.clusters.get(&id) else {
                        continue;
                    };

                    let is_selected = self.selected == Some(id);
                    let in_graph = self.graph.index_of(id).is_some();
                    let mut name = RichText::new(cluster_display_name(id));
                    if !in_graph {
                        name = name.weak();
                    }
                    let value_label = format!("{} videos", format_count(cluster.member_count()));

                    let clicked = ui
                        .horizontal(|ui| {
                            let clicked = ui.selectable_label(is_selected, name).clicked();
                            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                ui.label(value_label);
                            });
                            clicked
                        })
                        .inner;

                    if clicked && in_graph {
                        selected_id = Some(id);
                    }
                }
            });

        if let Some(id) = selected_id {
            self.set_selected(Some(id));
        }

        if should_load_more && row_count < ids_len {
            self.cluster_rows_visible = (row_count + Self::RANKING_PAGE_ROWS).min(ids_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn arrow_hold_speed_ramps_then_caps() {
        assert_abs_diff_eq!(arrow_hold_speed(0.0), ARROW_BASE_RATE);
        assert!(arrow_hold_speed(0.5) > arrow_hold_speed(0.1));
        assert_abs_diff_eq!(
            arrow_hold_speed(60.0),
            ARROW_BASE_RATE * ARROW_MAX_MULTIPLIER
        );
    }
}
