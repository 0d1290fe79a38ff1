//! Chart Deck Main Application
//! Main window with control panel and chart viewer.

use crate::charts::{ChartResolver, FigureBuilder};
use crate::config::DashboardConfig;
use crate::data::{DataLoader, PREVIEW_ROWS};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction, DataPreviewPanel};
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use tracing::{debug, info, warn};

/// CSV loading result from background thread
enum LoadResult {
    Progress(String),
    Complete(DataLoader),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    config: DashboardConfig,
    loader: DataLoader,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    data_preview: DataPreviewPanel,

    // Async CSV loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let mut app = Self {
            control_panel: ControlPanel::new(&config),
            config,
            loader: DataLoader::new(),
            chart_viewer: ChartViewer::new(),
            data_preview: DataPreviewPanel::new(),
            load_rx: None,
            is_loading: false,
        };

        let dataset = app.config.dataset_path.clone();
        if dataset.exists() {
            app.start_load(dataset);
        } else {
            warn!(path = %dataset.display(), "configured dataset not found");
            app.control_panel
                .set_status(&format!("{} not found, browse for a CSV", dataset.display()));
        }
        app
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            self.start_load(path);
        }
    }

    /// Load a CSV in a background thread
    fn start_load(&mut self, path: PathBuf) {
        self.chart_viewer.clear();
        self.data_preview.set_preview(None);
        self.control_panel.csv_path = Some(path.clone());
        self.control_panel.set_status("Loading CSV file...");
        self.is_loading = true;
        self.control_panel.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        let index_column = self.config.index_column.clone();

        thread::spawn(move || {
            let _ = tx.send(LoadResult::Progress("Reading CSV file...".to_string()));

            let mut loader = DataLoader::new();
            match loader.load_csv(&path, index_column.as_deref()) {
                Ok(_) => {
                    let _ = tx.send(LoadResult::Complete(loader));
                }
                Err(e) => {
                    let _ = tx.send(LoadResult::Error(e.to_string()));
                }
            }
        });
    }

    /// Check for CSV loading results
    fn check_load_results(&mut self) {
        let rx = self.load_rx.take();
        if let Some(rx) = rx {
            let mut should_keep_receiver = true;

            while let Ok(result) = rx.try_recv() {
                match result {
                    LoadResult::Progress(status) => {
                        self.control_panel.set_status(&status);
                    }
                    LoadResult::Complete(loader) => {
                        self.loader = loader;
                        debug!(columns = ?self.loader.schema().names(), "dataset schema");
                        self.update_preview();
                        self.control_panel.set_schema(self.loader.schema().clone());
                        self.control_panel.csv_path = self.loader.get_file_path().cloned();
                        self.control_panel.set_status(&format!(
                            "Loaded {} rows, {} columns",
                            self.loader.get_row_count(),
                            self.loader.schema().len()
                        ));
                        self.finish_loading();
                        should_keep_receiver = false;
                        self.refresh();
                    }
                    LoadResult::Error(error) => {
                        warn!(%error, "CSV load failed");
                        self.control_panel.set_status(&format!("Error: {}", error));
                        self.finish_loading();
                        should_keep_receiver = false;
                    }
                }
            }

            if should_keep_receiver {
                self.load_rx = Some(rx);
            }
        }
    }

    fn update_preview(&mut self) {
        let preview = self
            .loader
            .get_dataframe()
            .map(|df| DataLoader::preview(df, PREVIEW_ROWS))
            .transpose();
        match preview {
            Ok(preview) => self.data_preview.set_preview(preview),
            Err(error) => {
                warn!(%error, "data preview unavailable");
                self.data_preview.set_preview(None);
            }
        }
    }

    fn finish_loading(&mut self) {
        self.is_loading = false;
        self.control_panel.is_loading = false;
    }

    /// One resolve, build and display cycle for the current selection.
    fn refresh(&mut self) {
        let Some(df) = self.loader.get_dataframe() else {
            self.chart_viewer.clear();
            return;
        };
        let request = self.control_panel.current_request();

        let resolved = match ChartResolver::resolve(&request, self.loader.schema()) {
            Ok(resolved) => resolved,
            Err(e) if e.is_incomplete() => {
                debug!(kind = request.kind.id(), slot = %e.slot, "selection incomplete");
                self.chart_viewer.set_hint(e.to_string());
                return;
            }
            Err(e) => {
                warn!(kind = request.kind.id(), error = %e, "chart request rejected");
                self.chart_viewer.set_error(e.to_string());
                return;
            }
        };

        match FigureBuilder::build(&resolved, df) {
            Ok(figure) => {
                info!(kind = figure.kind.id(), title = %figure.title, "figure ready");
                self.chart_viewer.set_figure(figure);
            }
            Err(e) => {
                warn!(kind = request.kind.id(), error = %e, "figure build failed");
                self.chart_viewer.set_error(e.to_string());
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::SelectionChanged => self.refresh(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().auto_shrink([false, false]).show(ui, |ui| {
                self.data_preview.show(ui);
                self.chart_viewer.show(ctx, ui);
            });
        });
    }
}
