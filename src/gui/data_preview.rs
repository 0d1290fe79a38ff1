//! Data Preview Widget
//! Head rows of the loaded dataset and its column list.

use crate::data::DataPreview;
use egui::{Color32, RichText};

const MAX_CELL_CHARS: usize = 40;

/// Collapsible raw data table shown above the chart.
#[derive(Default)]
pub struct DataPreviewPanel {
    preview: Option<DataPreview>,
}

impl DataPreviewPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_preview(&mut self, preview: Option<DataPreview>) {
        self.preview = preview;
    }

    pub fn show(&self, ui: &mut egui::Ui) {
        let Some(preview) = &self.preview else {
            return;
        };

        egui::CollapsingHeader::new(RichText::new("🗂 Raw data").size(14.0).strong())
            .id_salt("data_preview")
            .default_open(true)
            .show(ui, |ui| {
                ui.label(
                    RichText::new(format!(
                        "First {} of {} rows",
                        preview.rows.len(),
                        preview.total_rows
                    ))
                    .size(11.0)
                    .color(Color32::GRAY),
                );
                ui.add_space(4.0);

                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(5.0)
                    .inner_margin(8.0)
                    .show(ui, |ui| {
                        egui::ScrollArea::horizontal()
                            .id_salt("data_preview_scroll")
                            .show(ui, |ui| Self::draw_table(ui, preview));
                    });

                ui.add_space(6.0);
                ui.label(RichText::new(column_summary(preview)).size(12.0));
            });

        ui.add_space(8.0);
        ui.separator();
        ui.add_space(8.0);
    }

    fn draw_table(ui: &mut egui::Ui, preview: &DataPreview) {
        egui::Grid::new(ui.make_persistent_id("data_preview_table"))
            .striped(true)
            .min_col_width(55.0)
            .spacing([8.0, 4.0])
            .show(ui, |ui| {
                for name in &preview.columns {
                    ui.label(RichText::new(name).strong().size(11.0));
                }
                ui.end_row();

                for row in &preview.rows {
                    for cell in row {
                        ui.label(RichText::new(truncate(cell)).size(11.0));
                    }
                    ui.end_row();
                }
            });
    }
}

/// `Total columns N ➡ a, b, c`
pub fn column_summary(preview: &DataPreview) -> String {
    format!(
        "Total columns {} ➡ {}",
        preview.columns.len(),
        preview.columns.join(", ")
    )
}

fn truncate(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_CHARS {
        cell.to_string()
    } else {
        let head: String = cell.chars().take(MAX_CELL_CHARS - 1).collect();
        format!("{head}…")
    }
}
