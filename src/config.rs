//! Dashboard Configuration Module
//! Dashboard presets and JSON configuration files.

use crate::charts::ChartKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CONFIG_ENV: &str = "CHARTDECK_CONFIG";
pub const PRESET_ENV: &str = "CHARTDECK_DASHBOARD";
pub const DEFAULT_PRESET: &str = "products";
pub const PRESETS: [&str; 4] = ["products", "catalog", "vgsales", "vgsales3d"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown dashboard preset '{0}'")]
    UnknownPreset(String),
    #[error("A dashboard must offer at least one chart kind")]
    NoCharts,
}

/// One dashboard: which dataset to load and which chart kinds to offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub title: String,
    pub icon: String,
    pub dataset_path: PathBuf,
    pub index_column: Option<String>,
    pub charts: Vec<ChartKind>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Product Details".to_string(),
            icon: "🧥".to_string(),
            dataset_path: PathBuf::from("data/products_all_brands.csv"),
            index_column: Some("product_id".to_string()),
            charts: vec![
                ChartKind::Bar,
                ChartKind::Pie,
                ChartKind::Histogram,
                ChartKind::Box,
                ChartKind::Violin,
                ChartKind::Scatter,
                ChartKind::Area,
                ChartKind::Line,
                ChartKind::Bubble,
                ChartKind::Heatmap,
                ChartKind::Funnel,
                ChartKind::Treemap,
                ChartKind::Sunburst,
            ],
        }
    }
}

impl DashboardConfig {
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let config = match name {
            "products" => Self::default(),
            "catalog" => Self {
                title: "Sociolla Products Catalog".to_string(),
                icon: "🌟".to_string(),
                dataset_path: PathBuf::from("data/products_all_brands.csv"),
                index_column: None,
                charts: vec![
                    ChartKind::Bar,
                    ChartKind::Line,
                    ChartKind::Pie,
                    ChartKind::Histogram,
                    ChartKind::Box,
                    ChartKind::Violin,
                    ChartKind::ScatterMatrix,
                    ChartKind::Area,
                    ChartKind::Pair,
                ],
            },
            "vgsales" => Self {
                title: "Video Game Sales".to_string(),
                icon: "🎮".to_string(),
                dataset_path: PathBuf::from("data/vgsales.csv"),
                index_column: Some("Rank".to_string()),
                charts: vec![
                    ChartKind::Bar,
                    ChartKind::Pie,
                    ChartKind::Histogram,
                    ChartKind::Box,
                    ChartKind::Scatter,
                    ChartKind::Line,
                    ChartKind::Heatmap,
                    ChartKind::Treemap,
                    ChartKind::Sunburst,
                    ChartKind::Choropleth,
                ],
            },
            "vgsales3d" => Self {
                title: "Video Game Sales 3D".to_string(),
                icon: "🎮".to_string(),
                dataset_path: PathBuf::from("data/vgsales.csv"),
                index_column: Some("Rank".to_string()),
                charts: ChartKind::ALL.iter().copied().filter(|k| k.is_3d()).collect(),
            },
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// A config file wins over a preset name; neither means the default preset.
    pub fn select(config_path: Option<&str>, preset: Option<&str>) -> Result<Self, ConfigError> {
        match (config_path, preset) {
            (Some(path), _) => {
                info!(path, "loading dashboard config");
                Self::from_json_file(Path::new(path))
            }
            (None, Some(name)) => {
                info!(preset = name, "using dashboard preset");
                Self::preset(name)
            }
            (None, None) => Self::preset(DEFAULT_PRESET),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).ok();
        let preset = std::env::var(PRESET_ENV).ok();
        Self::select(path.as_deref(), preset.as_deref())
    }

    pub fn window_title(&self) -> String {
        if self.icon.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.icon, self.title)
        }
    }

    /// Drops repeated chart kinds, keeping the first occurrence.
    fn validated(mut self) -> Result<Self, ConfigError> {
        let mut seen = Vec::with_capacity(self.charts.len());
        self.charts.retain(|kind| {
            if seen.contains(kind) {
                false
            } else {
                seen.push(*kind);
                true
            }
        });
        if self.charts.is_empty() {
            return Err(ConfigError::NoCharts);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn every_preset_loads() {
        for name in PRESETS {
            let config = DashboardConfig::preset(name).unwrap();
            assert!(!config.charts.is_empty(), "{name}");
        }
        assert!(matches!(
            DashboardConfig::preset("sales"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn three_d_preset_only_offers_3d_kinds() {
        let config = DashboardConfig::preset("vgsales3d").unwrap();
        assert_eq!(config.charts.len(), 9);
        assert!(config.charts.iter().all(|k| k.is_3d()));
    }

    #[test]
    fn json_fills_missing_fields_from_default() {
        let config = DashboardConfig::from_json_str(
            r#"{"title": "Games", "charts": ["bar", "scatter3d", "bar"], "index_column": null}"#,
        )
        .unwrap();
        assert_eq!(config.title, "Games");
        assert_eq!(config.charts, vec![ChartKind::Bar, ChartKind::Scatter3D]);
        assert_eq!(config.index_column, None);
        assert_eq!(config.dataset_path, PathBuf::from("data/products_all_brands.csv"));
    }

    #[test]
    fn json_rejects_bad_input() {
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{"charts": []}"#),
            Err(ConfigError::NoCharts)
        ));
        assert!(matches!(
            DashboardConfig::from_json_str(r#"{"charts": ["radar"]}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn config_file_wins_over_preset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"title": "From file", "charts": ["pie"]}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = DashboardConfig::select(Some(&path), Some("vgsales")).unwrap();
        assert_eq!(config.title, "From file");

        let config = DashboardConfig::select(None, Some("vgsales")).unwrap();
        assert_eq!(config.title, "Video Game Sales");

        let config = DashboardConfig::select(None, None).unwrap();
        assert_eq!(config, DashboardConfig::default());

        assert!(matches!(
            DashboardConfig::select(Some("/nonexistent/chartdeck.json"), None),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn window_title_includes_icon() {
        let mut config = DashboardConfig::default();
        assert_eq!(config.window_title(), "🧥 Product Details");
        config.icon.clear();
        assert_eq!(config.window_title(), "Product Details");
    }
}
