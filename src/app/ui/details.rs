use eframe::egui::{self, Color32, RichText, Sense, Stroke, Ui, vec2};

use crate::history::{WatchRecord, cluster_display_name};
use crate::util::{format_count, format_watch_date};

use super::super::ViewModel;
use super::super::highlight::similar_clusters;

const THUMBNAIL_SIZE: egui::Vec2 = vec2(64.0, 36.0);
const VIDEO_ROW_HEIGHT: f32 = 44.0;

/// Placeholder frame standing in for the video thumbnail.
fn draw_thumbnail_placeholder(ui: &mut Ui, record: &WatchRecord) {
    let (rect, response) = ui.allocate_exact_size(THUMBNAIL_SIZE, Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 3.0, Color32::from_rgb(38, 44, 52));
    painter.rect_stroke(
        rect,
        3.0,
        Stroke::new(1.0, Color32::from_rgb(70, 80, 92)),
        egui::StrokeKind::Inside,
    );
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "▶",
        egui::FontId::proportional(14.0),
        Color32::from_gray(150),
    );

    match record.video_id.thumbnail_url() {
        Some(url) => response.on_hover_text(url),
        None => response.on_hover_text("No thumbnail for this video"),
    };
}

fn draw_video_row(ui: &mut Ui, record: &WatchRecord) {
    ui.horizontal(|ui| {
        draw_thumbnail_placeholder(ui, record);
        ui.vertical(|ui| {
            let title = if record.title.trim().is_empty() {
                "(untitled)"
            } else {
                record.title.as_str()
            };
            match record.video_id.watch_url() {
                Some(url) => {
                    ui.add(egui::Hyperlink::from_label_and_url(title, url).open_in_new_tab(true));
                }
                None => {
                    ui.label(title)
                        .on_hover_text(format!("video id: {}", record.video_id.as_str()));
                }
            }

            let channel = if record.channel_name.trim().is_empty() {
                "unknown channel"
            } else {
                record.channel_name.as_str()
            };
            ui.small(format!(
                "{channel}  ·  {}",
                format_watch_date(record.watched_at.as_ref(), &record.timestamp)
            ));
        });
    });
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Cluster Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.selected else {
            ui.label("Select a cluster from the graph or the ranking list.");
            return;
        };

        let Some(cluster) = self.history.clusters.get(&selected_id) else {
            ui.label("Selected cluster no longer exists in the loaded data.");
            return;
        };

        let color = self
            .graph
            .index_of(selected_id)
            .and_then(|index| self.graph.nodes.get(index))
            .map_or(Color32::GRAY, |node| node.color);

        ui.horizontal(|ui| {
            let (swatch, _) = ui.allocate_exact_size(vec2(14.0, 14.0), Sense::hover());
            ui.painter().circle_filled(swatch.center(), 7.0, color);
            ui.label(
                RichText::new(format!("{} Videos", format_count(cluster.member_count())))
                    .strong()
                    .size(18.0),
            );
        });
        ui.label(cluster.display_name());
        match cluster.centroid.as_ref() {
            Some(centroid) => ui.small(format!("centroid: {} dimensions", centroid.len())),
            None => ui.small("no embedding vectors; not linked to other clusters"),
        };

        ui.separator();
        ui.label(RichText::new("Top channels").strong());
        if cluster.top_channels.is_empty() {
            ui.label("No channel names recorded.");
        }
        for channel in &cluster.top_channels {
            ui.horizontal(|ui| {
                ui.label(channel.name.as_str());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format_count(channel.count));
                });
            });
        }

        ui.separator();
        ui.label(RichText::new("Similar clusters").strong());
        let similar = similar_clusters(&self.graph, &self.history, selected_id);
        let mut next_selection = None;
        if similar.is_empty() {
            ui.label("No cluster is similar enough at the current threshold.");
        }
        for entry in &similar {
            let label = format!(
                "{}  ({} videos, {:.0}% similar)",
                cluster_display_name(entry.cluster_id),
                format_count(entry.member_count),
                entry.similarity * 100.0
            );
            if ui.link(label).clicked() {
                next_selection = Some(entry.cluster_id);
            }
        }

        ui.separator();
        let members = cluster.recent_members(Self::DISPLAYED_MEMBER_LIMIT);
        ui.label(RichText::new("Recently watched").strong());
        if cluster.member_count() > members.len() {
            ui.small(format!(
                "showing the {} most recent of {}",
                members.len(),
                format_count(cluster.member_count())
            ));
        }

        let row_count = members.len().min(self.video_rows_visible);
        let mut should_load_more = false;
        egui::ScrollArea::vertical()
            .id_salt("cluster_videos_scroll")
            .auto_shrink([false, false])
            .show_rows(ui, VIDEO_ROW_HEIGHT, row_count, |ui, row_range| {
                if row_range.end + Self::VIDEO_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }

                for index in row_range {
                    if let Some(record) = members.get(index) {
                        draw_video_row(ui, record);
                    }
                }
            });

        if should_load_more && row_count < members.len() {
            self.video_rows_visible = (row_count + Self::VIDEO_PAGE_ROWS).min(members.len());
        }

        if let Some(cluster_id) = next_selection {
            self.set_selected(Some(cluster_id));
        }
    }
}
