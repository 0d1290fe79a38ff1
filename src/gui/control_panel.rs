//! Control Panel Widget
//! Left side panel with the data source, chart kind and per-slot column pickers.

use crate::charts::{
    Cardinality, ChartKind, ChartRequest, ChartResolver, ColumnOrder, Projection, SlotSpec,
};
use crate::config::DashboardConfig;
use crate::data::{ColumnDescriptor, DatasetSchema};
use egui::{Color32, ComboBox, RichText, ScrollArea};
use std::collections::BTreeMap;
use std::path::PathBuf;

const LABEL_WIDTH: f32 = 110.0;
const COMBO_WIDTH: f32 = 160.0;
const NONE_LABEL: &str = "(none)";

/// Left side control panel. Keeps one request per chart kind, so switching
/// kinds keeps earlier selections.
pub struct ControlPanel {
    pub title: String,
    pub icon: String,
    pub csv_path: Option<PathBuf>,
    pub charts: Vec<ChartKind>,
    pub selected: ChartKind,
    pub is_loading: bool,
    pub status: String,
    schema: DatasetSchema,
    requests: BTreeMap<ChartKind, ChartRequest>,
}

impl ControlPanel {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            title: config.title.clone(),
            icon: config.icon.clone(),
            csv_path: None,
            charts: config.charts.clone(),
            selected: config.charts.first().copied().unwrap_or(ChartKind::Bar),
            is_loading: false,
            status: "Ready".to_string(),
            schema: DatasetSchema::default(),
            requests: BTreeMap::new(),
        }
    }

    /// Replace the schema after a CSV load. Old selections refer to old columns.
    pub fn set_schema(&mut self, schema: DatasetSchema) {
        self.schema = schema;
        self.requests.clear();
    }

    /// The request for the selected chart kind.
    pub fn current_request(&self) -> ChartRequest {
        self.requests
            .get(&self.selected)
            .cloned()
            .unwrap_or_else(|| ChartRequest::new(self.selected))
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new(format!("{} {}", self.icon, self.title))
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== CSV File Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0).color(
                        if self.csv_path.is_some() {
                            ui.visuals().text_color()
                        } else {
                            Color32::GRAY
                        },
                    ));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_enabled_ui(!self.is_loading, |ui| {
                            if ui.button("📂 Browse").clicked() {
                                action = ControlPanelAction::BrowseCsv;
                            }
                        });
                    });
                });
                if !self.schema.is_empty() {
                    ui.label(
                        RichText::new(format!(
                            "{} columns: {} numeric, {} categorical",
                            self.schema.len(),
                            self.schema.names_of_kind(crate::data::ColumnKind::Numeric).len(),
                            self.schema
                                .names_of_kind(crate::data::ColumnKind::Categorical)
                                .len(),
                        ))
                        .size(11.0)
                        .color(Color32::GRAY),
                    );
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Chart Section =====
        ui.label(RichText::new("📈 Chart").size(14.0).strong());
        ui.add_space(8.0);

        let before = self.selected;
        ui.horizontal(|ui| {
            ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new("Chart Type:"));
            ComboBox::from_id_salt("chart_kind")
                .width(COMBO_WIDTH)
                .selected_text(self.selected.label())
                .show_ui(ui, |ui| {
                    for kind in &self.charts {
                        ui.selectable_value(&mut self.selected, *kind, kind.label());
                    }
                });
        });
        if self.selected != before {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(10.0);

        let kind = self.selected;
        let columns = self.schema.columns();
        let request = self
            .requests
            .entry(kind)
            .or_insert_with(|| ChartRequest::new(kind));

        let mut changed = false;
        for spec in ChartResolver::slots_for(kind) {
            changed |= if spec.is_multi() {
                Self::multi_slot_ui(ui, kind, spec, columns, request)
            } else {
                Self::single_slot_ui(ui, kind, spec, columns, request)
            };
            ui.add_space(5.0);
        }

        if kind.uses_projection() {
            let current = request.projection();
            let mut choice = current;
            ui.horizontal(|ui| {
                ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new("Projection:"));
                ComboBox::from_id_salt("projection")
                    .width(COMBO_WIDTH)
                    .selected_text(current.name())
                    .show_ui(ui, |ui| {
                        for projection in Projection::ALL {
                            ui.selectable_value(&mut choice, projection, projection.name());
                        }
                    });
            });
            if choice != current {
                request.set_projection(choice.name());
                changed = true;
            }
            ui.add_space(5.0);
        }

        let mut title = request.settings.title.clone().unwrap_or_default();
        ui.horizontal(|ui| {
            ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new("Title:"));
            let edit = egui::TextEdit::singleline(&mut title)
                .hint_text(request.display_title())
                .desired_width(COMBO_WIDTH);
            if ui.add(edit).changed() {
                changed = true;
            }
        });
        request.set_title(title);

        if changed {
            action = ControlPanelAction::SelectionChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.horizontal(|ui| {
            if self.is_loading {
                ui.spinner();
            }
            let status_color = if self.status.contains("Error") {
                Color32::from_rgb(220, 53, 69)
            } else if self.status.starts_with("Loaded") {
                Color32::from_rgb(40, 167, 69)
            } else {
                Color32::GRAY
            };
            ui.label(RichText::new(&self.status).size(11.0).color(status_color));
        });

        action
    }

    fn single_slot_ui(
        ui: &mut egui::Ui,
        kind: ChartKind,
        spec: &SlotSpec,
        columns: &[ColumnDescriptor],
        request: &mut ChartRequest,
    ) -> bool {
        let current = request.column(spec.name).map(str::to_string);
        let mut choice = current.clone();

        ui.horizontal(|ui| {
            ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new(slot_label(spec)));
            ComboBox::from_id_salt(format!("{}_{}", kind.id(), spec.name))
                .width(COMBO_WIDTH)
                .selected_text(current.as_deref().unwrap_or(NONE_LABEL))
                .show_ui(ui, |ui| {
                    if !spec.required {
                        ui.selectable_value(&mut choice, None, NONE_LABEL);
                    }
                    for column in eligible(spec, columns) {
                        ui.selectable_value(
                            &mut choice,
                            Some(column.name.clone()),
                            format!("{} ({})", column.name, column.kind),
                        );
                    }
                });
        });

        if choice == current {
            return false;
        }
        match choice {
            Some(column) => request.bind_column(spec.name, column),
            None => {
                request.unbind(spec.name);
            }
        }
        true
    }

    fn multi_slot_ui(
        ui: &mut egui::Ui,
        kind: ChartKind,
        spec: &SlotSpec,
        columns: &[ColumnDescriptor],
        request: &mut ChartRequest,
    ) -> bool {
        let before = request.columns(spec.name).to_vec();
        let mut selected = before.clone();
        let ordered = matches!(
            spec.cardinality,
            Cardinality::Many {
                order: ColumnOrder::Hierarchy,
                ..
            }
        );

        ui.label(slot_label(spec));
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ScrollArea::vertical()
                    .id_salt(format!("{}_{}", kind.id(), spec.name))
                    .max_height(120.0)
                    .show(ui, |ui| {
                        for column in eligible(spec, columns) {
                            let mut on = selected.contains(&column.name);
                            if ui.checkbox(&mut on, &column.name).changed() {
                                selected = toggle_column(&selected, &column.name, on);
                            }
                        }
                    });
            });

        ui.horizontal(|ui| {
            if !ordered && ui.small_button("Select All").clicked() {
                selected = eligible(spec, columns).map(|c| c.name.clone()).collect();
            }
            if ui.small_button("Clear All").clicked() {
                selected.clear();
            }
        });
        if ordered && !selected.is_empty() {
            ui.label(
                RichText::new(selected.join(" > "))
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        }

        if selected == before {
            return false;
        }
        if selected.is_empty() {
            request.unbind(spec.name);
        } else {
            request.bind_columns(spec.name, selected);
        }
        true
    }
}

fn slot_label(spec: &SlotSpec) -> String {
    if spec.required {
        format!("{}:", spec.label)
    } else {
        format!("{} (optional):", spec.label)
    }
}

fn eligible<'a>(
    spec: &'a SlotSpec,
    columns: &'a [ColumnDescriptor],
) -> impl Iterator<Item = &'a ColumnDescriptor> {
    columns
        .iter()
        .filter(move |c| spec.constraint.accepts(c.kind))
}

/// Checking appends to the end so hierarchy paths follow click order.
pub fn toggle_column(selected: &[String], column: &str, on: bool) -> Vec<String> {
    let mut next: Vec<String> = selected.iter().filter(|c| *c != column).cloned().collect();
    if on {
        next.push(column.to_string());
    }
    next
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    SelectionChanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;

    #[test]
    fn toggling_keeps_click_order() {
        let path = toggle_column(&[], "brand", true);
        let path = toggle_column(&path, "category", true);
        assert_eq!(path, ["brand", "category"]);
        let path = toggle_column(&path, "brand", false);
        let path = toggle_column(&path, "brand", true);
        assert_eq!(path, ["category", "brand"]);
    }

    #[test]
    fn requests_are_kept_per_kind_until_schema_changes() {
        let mut panel = ControlPanel::new(&DashboardConfig::default());
        assert_eq!(panel.selected, ChartKind::Bar);
        panel
            .requests
            .insert(ChartKind::Bar, ChartRequest::new(ChartKind::Bar).with_column("x", "brand"));

        panel.selected = ChartKind::Pie;
        assert!(panel.current_request().bindings.is_empty());
        panel.selected = ChartKind::Bar;
        assert_eq!(panel.current_request().column("x"), Some("brand"));

        panel.set_schema(DatasetSchema::new([("brand", ColumnKind::Categorical)]));
        assert!(panel.current_request().bindings.is_empty());
    }

    #[test]
    fn eligible_columns_follow_constraint() {
        let schema = DatasetSchema::new([
            ("brand", ColumnKind::Categorical),
            ("price", ColumnKind::Numeric),
        ]);
        let spec = ChartResolver::slots_for(ChartKind::Histogram)[0];
        let names: Vec<&str> = eligible(&spec, schema.columns())
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["price"]);
    }
}
