//! Chart Deck - CSV Dataset Explorer & Interactive Chart Dashboard
//!
//! Pick a chart kind, bind dataset columns to its inputs and view the figure.

mod charts;
mod config;
mod data;
mod gui;
mod stats;

use anyhow::Context;
use config::DashboardConfig;
use eframe::egui;
use gui::DashboardApp;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = DashboardConfig::from_env().context("failed to load dashboard config")?;
    info!(
        title = %config.title,
        dataset = %config.dataset_path.display(),
        charts = config.charts.len(),
        "starting dashboard"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title(config.window_title()),
        ..Default::default()
    };

    eframe::run_native(
        "Chart Deck",
        options,
        Box::new(move |cc| Ok(Box::new(DashboardApp::new(cc, config)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
