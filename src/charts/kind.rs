//! Chart kinds, render shapes and map projections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::resolver::ResolveError;

/// The closed set of charts the dashboard can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ChartKind {
    Bar,
    Pie,
    Histogram,
    Box,
    Violin,
    Scatter,
    Area,
    Pair,
    ScatterMatrix,
    Bubble,
    Heatmap,
    Funnel,
    Treemap,
    Line,
    Sunburst,
    Choropleth,
    Scatter3D,
    Line3D,
    Surface3D,
    Bar3D,
    ScatterMatrix3D,
    Bubble3D,
    Cone3D,
    Mesh3D,
    ScatterPolar3D,
}

/// How a kind's columns are handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderShape {
    SingleColumn,
    TwoColumn,
    ThreeColumn,
    ColumnList,
}

impl ChartKind {
    pub const ALL: [ChartKind; 25] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Violin,
        ChartKind::Scatter,
        ChartKind::Area,
        ChartKind::Pair,
        ChartKind::ScatterMatrix,
        ChartKind::Bubble,
        ChartKind::Heatmap,
        ChartKind::Funnel,
        ChartKind::Treemap,
        ChartKind::Line,
        ChartKind::Sunburst,
        ChartKind::Choropleth,
        ChartKind::Scatter3D,
        ChartKind::Line3D,
        ChartKind::Surface3D,
        ChartKind::Bar3D,
        ChartKind::ScatterMatrix3D,
        ChartKind::Bubble3D,
        ChartKind::Cone3D,
        ChartKind::Mesh3D,
        ChartKind::ScatterPolar3D,
    ];

    /// Stable lowercase identifier, as used in config files.
    pub fn id(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
            ChartKind::Pair => "pair",
            ChartKind::ScatterMatrix => "scattermatrix",
            ChartKind::Bubble => "bubble",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Funnel => "funnel",
            ChartKind::Treemap => "treemap",
            ChartKind::Line => "line",
            ChartKind::Sunburst => "sunburst",
            ChartKind::Choropleth => "choropleth",
            ChartKind::Scatter3D => "scatter3d",
            ChartKind::Line3D => "line3d",
            ChartKind::Surface3D => "surface3d",
            ChartKind::Bar3D => "bar3d",
            ChartKind::ScatterMatrix3D => "scattermatrix3d",
            ChartKind::Bubble3D => "bubble3d",
            ChartKind::Cone3D => "cone3d",
            ChartKind::Mesh3D => "mesh3d",
            ChartKind::ScatterPolar3D => "scatterpolar3d",
        }
    }

    /// Tab label shown in the control panel.
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar Plot",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Box => "Box Plot",
            ChartKind::Violin => "Violin Plot",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Area => "Area Plot",
            ChartKind::Pair => "Pair Plot",
            ChartKind::ScatterMatrix => "Scatter Matrix",
            ChartKind::Bubble => "Bubble Chart",
            ChartKind::Heatmap => "Correlation Heatmap",
            ChartKind::Funnel => "Funnel Chart",
            ChartKind::Treemap => "Treemap",
            ChartKind::Line => "Line Plot",
            ChartKind::Sunburst => "Sunburst",
            ChartKind::Choropleth => "Choropleth Map",
            ChartKind::Scatter3D => "3D Scatter",
            ChartKind::Line3D => "3D Line",
            ChartKind::Surface3D => "3D Surface",
            ChartKind::Bar3D => "3D Bar",
            ChartKind::ScatterMatrix3D => "3D Scatter Matrix",
            ChartKind::Bubble3D => "3D Bubble",
            ChartKind::Cone3D => "3D Cone",
            ChartKind::Mesh3D => "3D Mesh",
            ChartKind::ScatterPolar3D => "3D Polar Scatter",
        }
    }

    pub fn is_3d(self) -> bool {
        matches!(
            self,
            ChartKind::Scatter3D
                | ChartKind::Line3D
                | ChartKind::Surface3D
                | ChartKind::Bar3D
                | ChartKind::ScatterMatrix3D
                | ChartKind::Bubble3D
                | ChartKind::Cone3D
                | ChartKind::Mesh3D
                | ChartKind::ScatterPolar3D
        )
    }

    /// Whether the chart is drawn on a map and takes a projection.
    pub fn uses_projection(self) -> bool {
        matches!(self, ChartKind::Choropleth)
    }

    pub fn render_shape(self) -> RenderShape {
        match self {
            ChartKind::Bar
            | ChartKind::Pie
            | ChartKind::Histogram
            | ChartKind::Box
            | ChartKind::Violin
            | ChartKind::Area => RenderShape::SingleColumn,
            ChartKind::Scatter
            | ChartKind::Bubble
            | ChartKind::Funnel
            | ChartKind::Choropleth => RenderShape::TwoColumn,
            ChartKind::Pair
            | ChartKind::ScatterMatrix
            | ChartKind::Heatmap
            | ChartKind::Treemap
            | ChartKind::Sunburst
            | ChartKind::Line => RenderShape::ColumnList,
            _ => RenderShape::ThreeColumn,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for ChartKind {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for ChartKind {
    type Err = ResolveError;

    /// Accepts the stable id, case-insensitively, ignoring spaces, `-` and `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        ChartKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.id() == key)
            .ok_or_else(|| ResolveError::InvalidChartKind(s.to_string()))
    }
}

/// Map projections accepted by map-based charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    #[default]
    Equirectangular,
    Mercator,
    Orthographic,
    NaturalEarth,
    Kavrayskiy7,
    Miller,
    Robinson,
    Eckert4,
    AzimuthalEqualArea,
    AzimuthalEquidistant,
    ConicEqualArea,
    ConicConformal,
    ConicEquidistant,
    Gnomonic,
    Stereographic,
    Mollweide,
    Hammer,
    TransverseMercator,
    AlbersUsa,
    WinkelTripel,
    Aitoff,
    Sinusoidal,
}

impl Projection {
    pub const ALL: [Projection; 22] = [
        Projection::Equirectangular,
        Projection::Mercator,
        Projection::Orthographic,
        Projection::NaturalEarth,
        Projection::Kavrayskiy7,
        Projection::Miller,
        Projection::Robinson,
        Projection::Eckert4,
        Projection::AzimuthalEqualArea,
        Projection::AzimuthalEquidistant,
        Projection::ConicEqualArea,
        Projection::ConicConformal,
        Projection::ConicEquidistant,
        Projection::Gnomonic,
        Projection::Stereographic,
        Projection::Mollweide,
        Projection::Hammer,
        Projection::TransverseMercator,
        Projection::AlbersUsa,
        Projection::WinkelTripel,
        Projection::Aitoff,
        Projection::Sinusoidal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Projection::Equirectangular => "equirectangular",
            Projection::Mercator => "mercator",
            Projection::Orthographic => "orthographic",
            Projection::NaturalEarth => "natural earth",
            Projection::Kavrayskiy7 => "kavrayskiy7",
            Projection::Miller => "miller",
            Projection::Robinson => "robinson",
            Projection::Eckert4 => "eckert4",
            Projection::AzimuthalEqualArea => "azimuthal equal area",
            Projection::AzimuthalEquidistant => "azimuthal equidistant",
            Projection::ConicEqualArea => "conic equal area",
            Projection::ConicConformal => "conic conformal",
            Projection::ConicEquidistant => "conic equidistant",
            Projection::Gnomonic => "gnomonic",
            Projection::Stereographic => "stereographic",
            Projection::Mollweide => "mollweide",
            Projection::Hammer => "hammer",
            Projection::TransverseMercator => "transverse mercator",
            Projection::AlbersUsa => "albers usa",
            Projection::WinkelTripel => "winkel tripel",
            Projection::Aitoff => "aitoff",
            Projection::Sinusoidal => "sinusoidal",
        }
    }

    /// Exact lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Projection::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_back() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.id().parse::<ChartKind>().unwrap(), kind);
        }
        assert_eq!("Scatter 3D".parse::<ChartKind>().unwrap(), ChartKind::Scatter3D);
        assert_eq!("scatter_matrix".parse::<ChartKind>().unwrap(), ChartKind::ScatterMatrix);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = "radar".parse::<ChartKind>().unwrap_err();
        assert!(matches!(err, ResolveError::InvalidChartKind(ref s) if s == "radar"));
    }

    #[test]
    fn serde_uses_ids() {
        let json = serde_json::to_string(&ChartKind::Bubble3D).unwrap();
        assert_eq!(json, "\"bubble3d\"");
        let kinds: Vec<ChartKind> = serde_json::from_str(r#"["pie","scattermatrix"]"#).unwrap();
        assert_eq!(kinds, vec![ChartKind::Pie, ChartKind::ScatterMatrix]);

        let kinds: Vec<ChartKind> = serde_json::from_str(r#"["Scatter 3D","bar_3d"]"#).unwrap();
        assert_eq!(kinds, vec![ChartKind::Scatter3D, ChartKind::Bar3D]);
        let err = serde_json::from_str::<ChartKind>(r#""radar""#).unwrap_err();
        assert!(err.to_string().contains("Unknown chart kind 'radar'"));
    }

    #[test]
    fn projection_names_are_exact() {
        assert_eq!(Projection::default().name(), "equirectangular");
        assert_eq!(Projection::from_name("natural earth"), Some(Projection::NaturalEarth));
        assert_eq!(Projection::from_name("flat-earth"), None);
        assert_eq!(Projection::from_name("Mercator"), None);
    }
}
