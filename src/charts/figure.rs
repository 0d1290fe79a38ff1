//! Figure Builder Module
//! Turns a resolved chart request and the loaded DataFrame into the
//! backend-agnostic data that the plotter and the bitmap renderer draw.

use super::kind::{ChartKind, Projection, RenderShape};
use super::layout::HierarchyNode;
use super::palette::ColorKey;
use super::resolver::ResolvedChart;
use crate::data::{ColumnKind, DataLoader, LoaderError};
use crate::stats::{Bin, BoxSummary, StatsCalculator};
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Number of buckets a numeric color or size column is split into.
const COLOR_BUCKETS: usize = 6;
const SIZE_BUCKETS: usize = 5;
const KDE_POINTS: usize = 64;
const SURFACE_CELLS: usize = 30;

#[derive(Error, Debug)]
pub enum FigureError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error("No column bound to '{0}'")]
    Unbound(String),
    #[error("No rows have values for every selected column")]
    NoData,
    #[error("Correlation needs at least 2 numeric columns, found {0}")]
    NotEnoughNumeric(usize),
    #[error("{kind} needs at least {needed} points, found {found}")]
    TooFewPoints {
        kind: ChartKind,
        needed: usize,
        found: usize,
    },
}

/// Axis description. Categorical axes carry the category names for codes 0..n.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Axis {
    pub label: String,
    pub categories: Option<Vec<String>>,
}

impl Axis {
    pub fn numeric(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            categories: None,
        }
    }

    pub fn categorical(label: impl Into<String>, categories: Vec<String>) -> Self {
        Self {
            label: label.into(),
            categories: Some(categories),
        }
    }

    /// Tick text for a value on this axis.
    pub fn format(&self, value: f64) -> String {
        match &self.categories {
            Some(categories) => {
                let idx = value.round();
                if (value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                categories.get(idx as usize).cloned().unwrap_or_default()
            }
            None => format_number(value),
        }
    }
}

/// Compact number formatting for ticks and labels.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if !(1e-3..1e6).contains(&magnitude) {
        return format!("{value:.2e}");
    }
    let text = format!("{value:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub color: ColorKey,
    pub radius: f32,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series3 {
    pub name: String,
    pub color: ColorKey,
    pub radius: f32,
    pub points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub name: String,
    pub color: ColorKey,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDistribution {
    pub name: String,
    pub summary: BoxSummary,
    /// Kernel density `[value, density]` pairs; empty for box plots.
    pub density: Vec<[f64; 2]>,
}

/// Mean height per grid cell; `z[row][col]` with rows along y.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub z: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Scatter {
        series: Vec<Series3>,
        /// Also draw the x/y, x/z and y/z projections.
        projections: bool,
    },
    Path(Vec<[f64; 3]>),
    Surface(SurfaceGrid),
    Bars(Vec<[f64; 3]>),
    Cones {
        origins: Vec<[f64; 3]>,
        vectors: Vec<[f64; 3]>,
    },
    Mesh {
        vertices: Vec<[f64; 3]>,
        triangles: Vec<[usize; 3]>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub axes: [Axis; 3],
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FigureBody {
    Bars {
        axis: Axis,
        value_label: String,
        values: Vec<f64>,
    },
    Funnel {
        stages: Vec<String>,
        values: Vec<f64>,
    },
    Pie {
        slices: Vec<(String, f64)>,
    },
    Histogram {
        label: String,
        series: Vec<HistogramSeries>,
    },
    Distribution {
        value_label: String,
        groups: Vec<GroupDistribution>,
        violin: bool,
    },
    Points {
        x: Axis,
        y: Axis,
        series: Vec<Series>,
    },
    Lines {
        x: Axis,
        series: Vec<Series>,
        filled: bool,
    },
    Matrix {
        columns: Vec<String>,
        cells: Vec<Vec<f64>>,
        skipped: Vec<String>,
    },
    Panels {
        dimensions: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
        legend: Vec<(String, ColorKey)>,
        row_groups: Vec<Option<usize>>,
        diagonal_histograms: bool,
    },
    Hierarchy {
        root: HierarchyNode,
        radial: bool,
    },
    Regions {
        projection: Projection,
        value_label: String,
        regions: Vec<(String, f64)>,
    },
    Volume(Volume),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub kind: ChartKind,
    pub body: FigureBody,
}

/// Distinct values of a column, with each row's index into `labels`.
struct Groups {
    labels: Vec<String>,
    rows: Vec<Option<usize>>,
}

/// Rows grouped for coloring, with a color per group.
struct ColorGroups {
    legend: Vec<(String, ColorKey)>,
    rows: Vec<Option<usize>>,
}

impl ColorGroups {
    fn single(name: &str, rows: usize) -> Self {
        Self {
            legend: vec![(name.to_string(), ColorKey::Default)],
            rows: vec![Some(0); rows],
        }
    }
}

#[derive(Clone, Copy)]
enum Aggregate {
    Sum,
    Mean,
}

/// Builds figures from resolved requests.
pub struct FigureBuilder;

impl FigureBuilder {
    pub fn build(chart: &ResolvedChart, df: &DataFrame) -> Result<Figure, FigureError> {
        let kind = chart.kind();
        let body = match kind.render_shape() {
            RenderShape::SingleColumn => Self::single_column(chart, df)?,
            RenderShape::TwoColumn => Self::two_column(chart, df)?,
            RenderShape::ColumnList => Self::column_list(chart, df)?,
            RenderShape::ThreeColumn => FigureBody::Volume(Self::volume(chart, df)?),
        };
        debug!(kind = kind.id(), rows = df.height(), "built figure");
        Ok(Figure {
            title: chart.title(),
            kind,
            body,
        })
    }

    fn single_column(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        match chart.kind() {
            ChartKind::Bar => {
                let x = required(chart, "x")?;
                let groups = Self::groups(df, x)?;
                let (value_label, values) = match chart.column("y") {
                    Some(y) => {
                        let ys = DataLoader::numeric_column(df, y)?;
                        (y.to_string(), aggregate(&groups, Some(&ys), Aggregate::Sum))
                    }
                    None => ("count".to_string(), aggregate(&groups, None, Aggregate::Sum)),
                };
                if values.is_empty() {
                    return Err(FigureError::NoData);
                }
                Ok(FigureBody::Bars {
                    axis: Axis::categorical(x, groups.labels),
                    value_label,
                    values,
                })
            }
            ChartKind::Pie => {
                let names = required(chart, "names")?;
                let groups = Self::groups(df, names)?;
                let values = match chart.column("values") {
                    Some(v) => {
                        let vs = DataLoader::numeric_column(df, v)?;
                        aggregate(&groups, Some(&vs), Aggregate::Sum)
                    }
                    None => aggregate(&groups, None, Aggregate::Sum),
                };
                let slices = sorted_desc(groups.labels.into_iter().zip(values).collect());
                if slices.iter().all(|(_, v)| *v <= 0.0) {
                    return Err(FigureError::NoData);
                }
                Ok(FigureBody::Pie { slices })
            }
            ChartKind::Histogram => Self::histogram(chart, df),
            ChartKind::Box | ChartKind::Violin => Self::distribution(chart, df),
            _ => Self::lines(chart, df),
        }
    }

    fn two_column(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        match chart.kind() {
            ChartKind::Funnel => {
                let stage = required(chart, "stage")?;
                let value = required(chart, "value")?;
                let groups = Self::groups(df, stage)?;
                let vs = DataLoader::numeric_column(df, value)?;
                let values = aggregate(&groups, Some(&vs), Aggregate::Sum);
                let (stages, values) = sorted_desc(groups.labels.into_iter().zip(values).collect())
                    .into_iter()
                    .unzip();
                Ok(FigureBody::Funnel { stages, values })
            }
            ChartKind::Choropleth => {
                let locations = required(chart, "locations")?;
                let color = required(chart, "color")?;
                let groups = Self::groups(df, locations)?;
                let vs = DataLoader::numeric_column(df, color)?;
                let values = aggregate(&groups, Some(&vs), Aggregate::Mean);
                let regions: Vec<(String, f64)> = groups
                    .labels
                    .into_iter()
                    .zip(values)
                    .filter(|(_, v)| v.is_finite())
                    .collect();
                if regions.is_empty() {
                    return Err(FigureError::NoData);
                }
                Ok(FigureBody::Regions {
                    projection: chart.projection(),
                    value_label: color.to_string(),
                    regions,
                })
            }
            _ => Self::points(chart, df),
        }
    }

    fn column_list(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        match chart.kind() {
            ChartKind::Heatmap => Self::correlation(chart, df),
            ChartKind::Treemap | ChartKind::Sunburst => Self::hierarchy(chart, df),
            ChartKind::Pair | ChartKind::ScatterMatrix => Self::panels(chart, df),
            _ => Self::lines(chart, df),
        }
    }

    fn histogram(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let x = required(chart, "x")?;
        let values = DataLoader::numeric_column(df, x)?;
        let colors = match chart.column("color") {
            Some(c) => Self::color_groups(df, c)?,
            None => ColorGroups::single(x, values.len()),
        };

        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let (Some(min), Some(max)) = (
            present.iter().copied().reduce(f64::min),
            present.iter().copied().reduce(f64::max),
        ) else {
            return Err(FigureError::NoData);
        };
        let bins = StatsCalculator::default_bin_count(present.len());

        let mut per_group: Vec<Vec<f64>> = vec![Vec::new(); colors.legend.len()];
        for (value, group) in values.iter().zip(&colors.rows) {
            if let (Some(v), Some(g)) = (value, group) {
                per_group[*g].push(*v);
            }
        }

        let series = colors
            .legend
            .into_iter()
            .zip(per_group)
            .filter(|(_, vs)| !vs.is_empty())
            .map(|((name, color), vs)| HistogramSeries {
                name,
                color,
                bins: StatsCalculator::histogram_in_range(&vs, min, max, bins),
            })
            .collect();

        Ok(FigureBody::Histogram {
            label: x.to_string(),
            series,
        })
    }

    fn distribution(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let y = required(chart, "y")?;
        let values = DataLoader::numeric_column(df, y)?;
        let groups = match chart.column("x") {
            Some(x) => Self::groups(df, x)?,
            None => Groups {
                labels: vec![y.to_string()],
                rows: vec![Some(0); values.len()],
            },
        };

        let mut per_group: Vec<Vec<f64>> = vec![Vec::new(); groups.labels.len()];
        for (value, group) in values.iter().zip(&groups.rows) {
            if let (Some(v), Some(g)) = (value, group) {
                per_group[*g].push(*v);
            }
        }

        let violin = chart.kind() == ChartKind::Violin;
        let groups: Vec<GroupDistribution> = groups
            .labels
            .into_iter()
            .zip(per_group)
            .filter_map(|(name, vs)| {
                let summary = StatsCalculator::box_summary(&vs)?;
                let density = if violin {
                    StatsCalculator::kde(&vs, KDE_POINTS)
                } else {
                    Vec::new()
                };
                Some(GroupDistribution {
                    name,
                    summary,
                    density,
                })
            })
            .collect();

        if groups.is_empty() {
            return Err(FigureError::NoData);
        }
        Ok(FigureBody::Distribution {
            value_label: y.to_string(),
            groups,
            violin,
        })
    }

    fn points(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let x = required(chart, "x")?;
        let y = required(chart, "y")?;
        let (x_axis, xs) = Self::axis_column(df, x)?;
        let (y_axis, ys) = Self::axis_column(df, y)?;
        let colors = match chart.column("color") {
            Some(c) => Self::color_groups(df, c)?,
            None => ColorGroups::single(y, xs.len()),
        };
        let sizes = match chart.column("size") {
            Some(s) => Some(size_buckets(&DataLoader::numeric_column(df, s)?)),
            None => None,
        };

        let mut series: Vec<Series> = Vec::new();
        let mut index: HashMap<(usize, usize), usize> = HashMap::new();
        for row in 0..xs.len() {
            let (Some(px), Some(py), Some(group)) = (xs[row], ys[row], colors.rows[row]) else {
                continue;
            };
            let size = match &sizes {
                Some(buckets) => match buckets[row] {
                    Some(b) => b,
                    None => continue,
                },
                None => 0,
            };
            let slot = *index.entry((group, size)).or_insert_with(|| {
                let (name, color) = colors.legend[group].clone();
                series.push(Series {
                    name,
                    color,
                    radius: if sizes.is_some() { bubble_radius(size) } else { 2.5 },
                    points: Vec::new(),
                });
                series.len() - 1
            });
            series[slot].points.push([px, py]);
        }

        if series.is_empty() {
            return Err(FigureError::NoData);
        }
        Ok(FigureBody::Points {
            x: x_axis,
            y: y_axis,
            series,
        })
    }

    fn lines(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let filled = chart.kind() == ChartKind::Area;
        let columns: Vec<String> = if filled {
            vec![required(chart, "y")?.to_string()]
        } else {
            chart.columns("y").to_vec()
        };

        let (x_axis, xs) = match chart.column("x") {
            Some(x) => Self::axis_column(df, x)?,
            None => (
                Axis::numeric("index"),
                (0..df.height()).map(|i| Some(i as f64)).collect(),
            ),
        };

        let mut series = Vec::new();
        for (i, column) in columns.iter().enumerate() {
            let ys = DataLoader::numeric_column(df, column)?;
            let points: Vec<[f64; 2]> = xs
                .iter()
                .zip(&ys)
                .filter_map(|(x, y)| Some([(*x)?, (*y)?]))
                .collect();
            if points.is_empty() {
                continue;
            }
            series.push(Series {
                name: column.clone(),
                color: ColorKey::Category(i),
                radius: 0.0,
                points,
            });
        }

        if series.is_empty() {
            return Err(FigureError::NoData);
        }
        Ok(FigureBody::Lines {
            x: x_axis,
            series,
            filled,
        })
    }

    fn correlation(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let mut columns = Vec::new();
        let mut skipped = Vec::new();
        let mut values = Vec::new();
        for name in chart.columns("columns") {
            if column_kind(df, name)? == ColumnKind::Numeric {
                values.push(DataLoader::numeric_column(df, name)?);
                columns.push(name.clone());
            } else {
                skipped.push(name.clone());
            }
        }
        if columns.len() < 2 {
            return Err(FigureError::NotEnoughNumeric(columns.len()));
        }
        let cells = StatsCalculator::correlation_matrix(&values);
        Ok(FigureBody::Matrix {
            columns,
            cells,
            skipped,
        })
    }

    fn panels(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let dimensions = chart.columns("dimensions").to_vec();
        let values = dimensions
            .iter()
            .map(|d| DataLoader::numeric_column(df, d))
            .collect::<Result<Vec<_>, _>>()?;
        let colors = match chart.column("color") {
            Some(c) => Self::color_groups(df, c)?,
            None => ColorGroups::single("rows", df.height()),
        };
        if values.iter().all(|col| col.iter().all(Option::is_none)) {
            return Err(FigureError::NoData);
        }
        Ok(FigureBody::Panels {
            dimensions,
            values,
            legend: colors.legend,
            row_groups: colors.rows,
            diagonal_histograms: chart.kind() == ChartKind::Pair,
        })
    }

    fn hierarchy(chart: &ResolvedChart, df: &DataFrame) -> Result<FigureBody, FigureError> {
        let levels = chart
            .columns("path")
            .iter()
            .map(|p| DataLoader::text_column(df, p))
            .collect::<Result<Vec<_>, _>>()?;
        let weights = match chart.column("values") {
            Some(v) => Some(DataLoader::numeric_column(df, v)?),
            None => None,
        };

        let mut root = HierarchyNode::root();
        for row in 0..df.height() {
            let path: Option<Vec<String>> = levels.iter().map(|l| l[row].clone()).collect();
            let Some(path) = path else {
                continue;
            };
            let weight = match &weights {
                Some(ws) => match ws[row] {
                    Some(w) if w > 0.0 => w,
                    _ => continue,
                },
                None => 1.0,
            };
            root.insert(&path, weight);
        }

        if root.value <= 0.0 {
            return Err(FigureError::NoData);
        }
        root.sort_by_value();
        Ok(FigureBody::Hierarchy {
            root,
            radial: chart.kind() == ChartKind::Sunburst,
        })
    }

    fn volume(chart: &ResolvedChart, df: &DataFrame) -> Result<Volume, FigureError> {
        let kind = chart.kind();
        let x = required(chart, "x")?;
        let y = required(chart, "y")?;
        let z = required(chart, "z")?;
        let (ax, xs) = Self::axis_column(df, x)?;
        let (ay, ys) = Self::axis_column(df, y)?;
        let (az, zs) = Self::axis_column(df, z)?;

        let rows: Vec<(usize, [f64; 3])> = (0..xs.len())
            .filter_map(|row| Some((row, [xs[row]?, ys[row]?, zs[row]?])))
            .collect();
        if rows.is_empty() {
            return Err(FigureError::NoData);
        }

        let volume = match kind {
            ChartKind::Line3D => Volume {
                axes: [ax, ay, az],
                geometry: Geometry::Path(rows.into_iter().map(|(_, p)| p).collect()),
            },
            ChartKind::Surface3D => Volume {
                axes: [ax, ay, az],
                geometry: Geometry::Surface(surface_grid(
                    &rows.iter().map(|(_, p)| *p).collect::<Vec<_>>(),
                    SURFACE_CELLS,
                )),
            },
            ChartKind::Bar3D => Volume {
                axes: [ax, ay, az],
                geometry: Geometry::Bars(stack_bars(rows.into_iter().map(|(_, p)| p))),
            },
            ChartKind::Mesh3D => {
                let points: Vec<[f64; 3]> = rows.into_iter().map(|(_, p)| p).collect();
                if points.len() < 3 {
                    return Err(FigureError::TooFewPoints {
                        kind,
                        needed: 3,
                        found: points.len(),
                    });
                }
                let (vertices, triangles) = fan_triangulate(&points);
                Volume {
                    axes: [ax, ay, az],
                    geometry: Geometry::Mesh {
                        vertices,
                        triangles,
                    },
                }
            }
            ChartKind::Cone3D => {
                let components = ["u", "v", "w"]
                    .iter()
                    .map(|slot| -> Result<Vec<Option<f64>>, FigureError> {
                        Ok(DataLoader::numeric_column(df, required(chart, slot)?)?)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let mut origins = Vec::new();
                let mut vectors = Vec::new();
                for (row, origin) in rows {
                    let (Some(u), Some(v), Some(w)) =
                        (components[0][row], components[1][row], components[2][row])
                    else {
                        continue;
                    };
                    origins.push(origin);
                    vectors.push([u, v, w]);
                }
                if origins.is_empty() {
                    return Err(FigureError::NoData);
                }
                Volume {
                    axes: [ax, ay, az],
                    geometry: Geometry::Cones { origins, vectors },
                }
            }
            ChartKind::ScatterPolar3D => {
                let points = rows
                    .into_iter()
                    .map(|(_, [r, theta, h])| {
                        let a = theta.to_radians();
                        [r * a.cos(), r * a.sin(), h]
                    })
                    .collect();
                Volume {
                    axes: [
                        Axis::numeric(format!("{x} cos({y})")),
                        Axis::numeric(format!("{x} sin({y})")),
                        az,
                    ],
                    geometry: Geometry::Scatter {
                        series: vec![Series3 {
                            name: z.to_string(),
                            color: ColorKey::Default,
                            radius: 3.0,
                            points,
                        }],
                        projections: false,
                    },
                }
            }
            _ => {
                let colors = match chart.column("color") {
                    Some(c) => Self::color_groups(df, c)?,
                    None => ColorGroups::single(z, xs.len()),
                };
                let sizes = match chart.column("size") {
                    Some(s) => Some(size_buckets(&DataLoader::numeric_column(df, s)?)),
                    None => None,
                };
                let mut series: Vec<Series3> = Vec::new();
                let mut index: HashMap<(usize, usize), usize> = HashMap::new();
                for (row, point) in rows {
                    let Some(group) = colors.rows[row] else {
                        continue;
                    };
                    let size = match &sizes {
                        Some(buckets) => match buckets[row] {
                            Some(b) => b,
                            None => continue,
                        },
                        None => 0,
                    };
                    let slot = *index.entry((group, size)).or_insert_with(|| {
                        let (name, color) = colors.legend[group].clone();
                        series.push(Series3 {
                            name,
                            color,
                            radius: if sizes.is_some() { bubble_radius(size) } else { 3.0 },
                            points: Vec::new(),
                        });
                        series.len() - 1
                    });
                    series[slot].points.push(point);
                }
                if series.is_empty() {
                    return Err(FigureError::NoData);
                }
                Volume {
                    axes: [ax, ay, az],
                    geometry: Geometry::Scatter {
                        series,
                        projections: kind == ChartKind::ScatterMatrix3D,
                    },
                }
            }
        };
        Ok(volume)
    }

    /// Distinct values of a column in first-seen order; numeric columns sort by value.
    fn groups(df: &DataFrame, name: &str) -> Result<Groups, FigureError> {
        let numeric = column_kind(df, name)? == ColumnKind::Numeric;
        let text = DataLoader::text_column(df, name)?;

        let mut labels: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut rows = Vec::with_capacity(text.len());
        for value in text {
            rows.push(value.map(|label| {
                let next = labels.len();
                *index.entry(label.clone()).or_insert_with(|| {
                    labels.push(label);
                    next
                })
            }));
        }

        if numeric {
            let key = |s: &String| s.parse::<f64>().unwrap_or(f64::NAN);
            let mut order: Vec<usize> = (0..labels.len()).collect();
            order.sort_by(|&a, &b| {
                key(&labels[a])
                    .partial_cmp(&key(&labels[b]))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut remap = vec![0; labels.len()];
            for (new, &old) in order.iter().enumerate() {
                remap[old] = new;
            }
            labels = order.iter().map(|&i| labels[i].clone()).collect();
            rows = rows.into_iter().map(|r| r.map(|i| remap[i])).collect();
        }

        Ok(Groups { labels, rows })
    }

    /// Values for a positional axis; categorical columns become category codes.
    fn axis_column(df: &DataFrame, name: &str) -> Result<(Axis, Vec<Option<f64>>), FigureError> {
        match column_kind(df, name)? {
            ColumnKind::Numeric => Ok((Axis::numeric(name), DataLoader::numeric_column(df, name)?)),
            ColumnKind::Categorical => {
                let groups = Self::groups(df, name)?;
                let codes = groups.rows.iter().map(|r| r.map(|i| i as f64)).collect();
                Ok((Axis::categorical(name, groups.labels), codes))
            }
        }
    }

    /// Categorical colors get one palette entry per value; numeric colors
    /// are split into equal-width buckets on the sequential scale.
    fn color_groups(df: &DataFrame, name: &str) -> Result<ColorGroups, FigureError> {
        if column_kind(df, name)? == ColumnKind::Categorical {
            let groups = Self::groups(df, name)?;
            let legend = groups
                .labels
                .into_iter()
                .enumerate()
                .map(|(i, label)| (label, ColorKey::Category(i)))
                .collect();
            return Ok(ColorGroups {
                legend,
                rows: groups.rows,
            });
        }

        let values = DataLoader::numeric_column(df, name)?;
        let present = values.iter().flatten().copied();
        let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return Ok(ColorGroups {
                legend: Vec::new(),
                rows: vec![None; values.len()],
            });
        }

        let buckets = if max > min { COLOR_BUCKETS } else { 1 };
        let width = (max - min) / buckets as f64;
        let legend = (0..buckets)
            .map(|i| {
                let lo = min + i as f64 * width;
                let hi = if i + 1 == buckets { max } else { lo + width };
                let t = if buckets > 1 {
                    i as f64 / (buckets - 1) as f64
                } else {
                    0.5
                };
                (
                    format!("{name} {} - {}", format_number(lo), format_number(hi)),
                    ColorKey::Scale(t),
                )
            })
            .collect();
        let rows = values
            .iter()
            .map(|v| {
                v.map(|v| {
                    if buckets == 1 {
                        0
                    } else {
                        (((v - min) / width).floor() as usize).min(buckets - 1)
                    }
                })
            })
            .collect();
        Ok(ColorGroups { legend, rows })
    }
}

fn required<'a>(chart: &'a ResolvedChart, slot: &str) -> Result<&'a str, FigureError> {
    chart
        .column(slot)
        .ok_or_else(|| FigureError::Unbound(slot.to_string()))
}

fn column_kind(df: &DataFrame, name: &str) -> Result<ColumnKind, FigureError> {
    let column = df
        .column(name)
        .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
    Ok(ColumnKind::from_dtype(column.dtype()))
}

/// Per-group sum (row counts when `values` is `None`) or mean.
fn aggregate(groups: &Groups, values: Option<&[Option<f64>]>, mode: Aggregate) -> Vec<f64> {
    let mut sums = vec![0.0; groups.labels.len()];
    let mut counts = vec![0usize; groups.labels.len()];
    for (row, group) in groups.rows.iter().enumerate() {
        let Some(g) = group else {
            continue;
        };
        let value = match values {
            Some(vs) => match vs[row] {
                Some(v) => v,
                None => continue,
            },
            None => 1.0,
        };
        sums[*g] += value;
        counts[*g] += 1;
    }
    match mode {
        Aggregate::Sum => sums,
        Aggregate::Mean => sums
            .into_iter()
            .zip(counts)
            .map(|(s, c)| if c == 0 { f64::NAN } else { s / c as f64 })
            .collect(),
    }
}

fn sorted_desc(mut pairs: Vec<(String, f64)>) -> Vec<(String, f64)> {
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    pairs
}

fn size_buckets(values: &[Option<f64>]) -> Vec<Option<usize>> {
    let present = values.iter().flatten().copied();
    let (min, max) = present.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    values
        .iter()
        .map(|v| {
            v.map(|v| {
                if max > min {
                    (((v - min) / (max - min)) * (SIZE_BUCKETS - 1) as f64).round() as usize
                } else {
                    SIZE_BUCKETS / 2
                }
            })
        })
        .collect()
}

fn bubble_radius(bucket: usize) -> f32 {
    3.0 + bucket as f32 * 3.0
}

/// Bucket scattered points onto at most `max_cells` columns and rows,
/// averaging z within each cell.
pub fn surface_grid(points: &[[f64; 3]], max_cells: usize) -> SurfaceGrid {
    let axis = |i: usize| -> (f64, f64, usize) {
        let mut values: Vec<f64> = points.iter().map(|p| p[i]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        let min = values.first().copied().unwrap_or(0.0);
        let max = values.last().copied().unwrap_or(0.0);
        (min, max, values.len().clamp(1, max_cells.max(1)))
    };
    let (x_min, x_max, nx) = axis(0);
    let (y_min, y_max, ny) = axis(1);
    let cell = |v: f64, min: f64, max: f64, n: usize| -> usize {
        if max > min {
            (((v - min) / (max - min)) * n as f64).floor().min((n - 1) as f64) as usize
        } else {
            0
        }
    };

    let mut sums = vec![vec![0.0; nx]; ny];
    let mut counts = vec![vec![0usize; nx]; ny];
    for p in points {
        let (ix, iy) = (cell(p[0], x_min, x_max, nx), cell(p[1], y_min, y_max, ny));
        sums[iy][ix] += p[2];
        counts[iy][ix] += 1;
    }

    let centers = |min: f64, max: f64, n: usize| -> Vec<f64> {
        let width = (max - min) / n as f64;
        (0..n).map(|i| min + (i as f64 + 0.5) * width).collect()
    };
    let z = sums
        .into_iter()
        .zip(counts)
        .map(|(row, count)| {
            row.into_iter()
                .zip(count)
                .map(|(s, c)| (c > 0).then(|| s / c as f64))
                .collect()
        })
        .collect();

    SurfaceGrid {
        xs: centers(x_min, x_max, nx),
        ys: centers(y_min, y_max, ny),
        z,
    }
}

/// Sum z for each distinct (x, y) pair, in first-seen order.
fn stack_bars(points: impl Iterator<Item = [f64; 3]>) -> Vec<[f64; 3]> {
    let mut bars: Vec<[f64; 3]> = Vec::new();
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    for [x, y, z] in points {
        match index.get(&(x.to_bits(), y.to_bits())) {
            Some(&i) => bars[i][2] += z,
            None => {
                index.insert((x.to_bits(), y.to_bits()), bars.len());
                bars.push([x, y, z]);
            }
        }
    }
    bars
}

/// Triangle fan around the x/y centroid. The centroid is appended as the last vertex.
pub fn fan_triangulate(points: &[[f64; 3]]) -> (Vec<[f64; 3]>, Vec<[usize; 3]>) {
    let n = points.len();
    if n < 3 {
        return (points.to_vec(), Vec::new());
    }
    let mut centroid = [0.0; 3];
    for p in points {
        for (c, v) in centroid.iter_mut().zip(p) {
            *c += v / n as f64;
        }
    }

    let angle = |p: &[f64; 3]| (p[1] - centroid[1]).atan2(p[0] - centroid[0]);
    let mut vertices = points.to_vec();
    vertices.sort_by(|a, b| {
        angle(a)
            .partial_cmp(&angle(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    vertices.push(centroid);

    let triangles = (0..n).map(|i| [n, i, (i + 1) % n]).collect();
    (vertices, triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::request::ChartRequest;
    use crate::charts::resolver::ChartResolver;
    use crate::data::DatasetSchema;

    fn catalog() -> DataFrame {
        df!(
            "brand" => ["acme", "zeta", "acme", "nova", "zeta", "acme"],
            "category" => ["shoes", "hats", "hats", "shoes", "hats", "shoes"],
            "country" => ["FR", "DE", "FR", "US", "DE", "US"],
            "price" => [Some(10.0), Some(20.0), Some(30.0), None, Some(50.0), Some(60.0)],
            "rating" => [4.0, 3.0, 5.0, 2.0, 4.5, 1.0],
            "year" => [2010i64, 2008, 2010, 2012, 2008, 2011],
        )
        .unwrap()
    }

    fn build(request: ChartRequest) -> Result<Figure, FigureError> {
        let df = catalog();
        let schema = DatasetSchema::from_dataframe(&df);
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        FigureBuilder::build(&resolved, &df)
    }

    #[test]
    fn bar_counts_per_category() {
        let figure = build(ChartRequest::new(ChartKind::Bar).with_column("x", "brand")).unwrap();
        let FigureBody::Bars { axis, values, value_label } = figure.body else {
            panic!("expected bars");
        };
        assert_eq!(axis.categories.unwrap(), vec!["acme", "zeta", "nova"]);
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
        assert_eq!(value_label, "count");
        assert_eq!(figure.title, "Bar Plot - brand");
    }

    #[test]
    fn bar_sums_values_and_sorts_numeric_categories() {
        let figure = build(
            ChartRequest::new(ChartKind::Bar)
                .with_column("x", "year")
                .with_column("y", "rating"),
        )
        .unwrap();
        let FigureBody::Bars { axis, values, .. } = figure.body else {
            panic!("expected bars");
        };
        assert_eq!(axis.categories.unwrap(), vec!["2008", "2010", "2011", "2012"]);
        assert_eq!(values, vec![7.5, 9.0, 1.0, 2.0]);
    }

    #[test]
    fn pie_slices_largest_first() {
        let figure = build(
            ChartRequest::new(ChartKind::Pie)
                .with_column("names", "brand")
                .with_column("values", "price"),
        )
        .unwrap();
        let FigureBody::Pie { slices } = figure.body else {
            panic!("expected pie");
        };
        assert_eq!(slices[0], ("acme".to_string(), 100.0));
        assert_eq!(slices[1], ("zeta".to_string(), 70.0));
        assert_eq!(slices[2], ("nova".to_string(), 0.0));
    }

    #[test]
    fn histogram_groups_by_color() {
        let figure = build(
            ChartRequest::new(ChartKind::Histogram)
                .with_column("x", "rating")
                .with_column("color", "category"),
        )
        .unwrap();
        let FigureBody::Histogram { series, .. } = figure.body else {
            panic!("expected histogram");
        };
        assert_eq!(series.len(), 2);
        let total: usize = series.iter().flat_map(|s| &s.bins).map(|b| b.count).sum();
        assert_eq!(total, 6);
        assert_eq!(series[0].bins.len(), series[1].bins.len());
    }

    #[test]
    fn violin_has_density_per_group() {
        let figure = build(
            ChartRequest::new(ChartKind::Violin)
                .with_column("y", "rating")
                .with_column("x", "category"),
        )
        .unwrap();
        let FigureBody::Distribution { groups, violin, .. } = figure.body else {
            panic!("expected distribution");
        };
        assert!(violin);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "shoes");
        assert_eq!(groups[0].summary.count, 3);
        assert_eq!(groups[0].density.len(), KDE_POINTS);
    }

    #[test]
    fn scatter_skips_incomplete_rows_and_codes_categories() {
        let figure = build(
            ChartRequest::new(ChartKind::Scatter)
                .with_column("x", "price")
                .with_column("y", "brand"),
        )
        .unwrap();
        let FigureBody::Points { y, series, .. } = figure.body else {
            panic!("expected points");
        };
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points.len(), 5);
        assert_eq!(series[0].points[1], [20.0, 1.0]);
        assert_eq!(y.format(1.0), "zeta");
        assert_eq!(y.format(1.5), "");
    }

    #[test]
    fn bubble_splits_series_by_size() {
        let figure = build(
            ChartRequest::new(ChartKind::Bubble)
                .with_column("x", "rating")
                .with_column("y", "year")
                .with_column("size", "price")
                .with_column("color", "brand"),
        )
        .unwrap();
        let FigureBody::Points { series, .. } = figure.body else {
            panic!("expected points");
        };
        let points: usize = series.iter().map(|s| s.points.len()).sum();
        assert_eq!(points, 5);
        let smallest = series.iter().map(|s| s.radius).fold(f32::MAX, f32::min);
        let largest = series.iter().map(|s| s.radius).fold(0.0, f32::max);
        assert_eq!(smallest, bubble_radius(0));
        assert_eq!(largest, bubble_radius(SIZE_BUCKETS - 1));
    }

    #[test]
    fn line_defaults_to_row_index() {
        let figure = build(ChartRequest::new(ChartKind::Line).with_columns("y", ["rating", "price"]))
            .unwrap();
        let FigureBody::Lines { x, series, filled } = figure.body else {
            panic!("expected lines");
        };
        assert!(!filled);
        assert_eq!(x.label, "index");
        assert_eq!(series[0].name, "price");
        assert_eq!(series[0].points.len(), 5);
        assert_eq!(series[1].points[3], [3.0, 2.0]);
    }

    #[test]
    fn heatmap_skips_categorical_columns() {
        let figure = build(
            ChartRequest::new(ChartKind::Heatmap)
                .with_columns("columns", ["rating", "brand", "price"]),
        )
        .unwrap();
        let FigureBody::Matrix { columns, cells, skipped } = figure.body else {
            panic!("expected matrix");
        };
        assert_eq!(columns, vec!["price", "rating"]);
        assert_eq!(skipped, vec!["brand"]);
        assert_eq!(cells[0][0], 1.0);
        assert_eq!(cells[0][1], cells[1][0]);

        let err = build(
            ChartRequest::new(ChartKind::Heatmap).with_columns("columns", ["rating", "brand"]),
        )
        .unwrap_err();
        assert!(matches!(err, FigureError::NotEnoughNumeric(1)));
    }

    #[test]
    fn treemap_builds_weighted_hierarchy() {
        let figure = build(
            ChartRequest::new(ChartKind::Treemap)
                .with_columns("path", ["category", "brand"])
                .with_column("values", "price"),
        )
        .unwrap();
        let FigureBody::Hierarchy { root, radial } = figure.body else {
            panic!("expected hierarchy");
        };
        assert!(!radial);
        assert_eq!(root.value, 170.0);
        assert_eq!(root.children[0].label, "hats");
        assert_eq!(root.children[0].value, 100.0);
        assert_eq!(root.children[0].children[0].label, "zeta");
    }

    #[test]
    fn choropleth_averages_per_location() {
        let figure = build(
            ChartRequest::new(ChartKind::Choropleth)
                .with_column("locations", "country")
                .with_column("color", "rating")
                .with_projection("robinson"),
        )
        .unwrap();
        let FigureBody::Regions { projection, regions, .. } = figure.body else {
            panic!("expected regions");
        };
        assert_eq!(projection, Projection::Robinson);
        assert_eq!(regions[0], ("FR".to_string(), 4.5));
        assert_eq!(regions.len(), 3);
    }

    #[test]
    fn funnel_orders_stages() {
        let figure = build(
            ChartRequest::new(ChartKind::Funnel)
                .with_column("stage", "category")
                .with_column("value", "rating"),
        )
        .unwrap();
        let FigureBody::Funnel { stages, values } = figure.body else {
            panic!("expected funnel");
        };
        assert_eq!(stages, vec!["hats", "shoes"]);
        assert_eq!(values, vec![12.5, 7.0]);
    }

    #[test]
    fn scatter3d_colors_by_category() {
        let figure = build(
            ChartRequest::new(ChartKind::Scatter3D)
                .with_column("x", "price")
                .with_column("y", "rating")
                .with_column("z", "brand")
                .with_column("color", "category"),
        )
        .unwrap();
        let FigureBody::Volume(volume) = figure.body else {
            panic!("expected volume");
        };
        assert!(volume.axes[2].categories.is_some());
        let Geometry::Scatter { series, projections } = volume.geometry else {
            panic!("expected scatter geometry");
        };
        assert!(!projections);
        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().map(|s| s.points.len()).sum::<usize>(), 5);
    }

    #[test]
    fn bar3d_sums_repeated_cells() {
        let figure = build(
            ChartRequest::new(ChartKind::Bar3D)
                .with_column("x", "brand")
                .with_column("y", "category")
                .with_column("z", "rating"),
        )
        .unwrap();
        let FigureBody::Volume(Volume { geometry: Geometry::Bars(bars), .. }) = figure.body else {
            panic!("expected bars");
        };
        // zeta/hats and acme/shoes appear twice
        assert!(bars.contains(&[1.0, 1.0, 7.5]));
        assert!(bars.contains(&[0.0, 0.0, 5.0]));
        assert_eq!(bars.len(), 4);
    }

    #[test]
    fn polar_points_are_cartesian() {
        let df = df!("r" => [1.0, 2.0], "theta" => [0.0, 90.0], "h" => [5.0, 6.0]).unwrap();
        let schema = DatasetSchema::from_dataframe(&df);
        let request = ChartRequest::new(ChartKind::ScatterPolar3D)
            .with_column("x", "r")
            .with_column("y", "theta")
            .with_column("z", "h");
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        let figure = FigureBuilder::build(&resolved, &df).unwrap();
        let FigureBody::Volume(Volume { geometry: Geometry::Scatter { series, .. }, .. }) =
            figure.body
        else {
            panic!("expected scatter");
        };
        let p = series[0].points[1];
        assert!(p[0].abs() < 1e-9);
        assert!((p[1] - 2.0).abs() < 1e-9);
        assert_eq!(p[2], 6.0);
    }

    #[test]
    fn surface_grid_averages_cells() {
        let points = [
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 3.0],
            [1.0, 0.0, 5.0],
            [0.0, 1.0, 7.0],
        ];
        let grid = surface_grid(&points, 10);
        assert_eq!(grid.xs.len(), 2);
        assert_eq!(grid.ys.len(), 2);
        assert_eq!(grid.z[0][0], Some(2.0));
        assert_eq!(grid.z[0][1], Some(5.0));
        assert_eq!(grid.z[1][0], Some(7.0));
        assert_eq!(grid.z[1][1], None);
    }

    #[test]
    fn fan_covers_every_vertex() {
        let points = [[0.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 2.0], [0.0, 1.0, 3.0]];
        let (vertices, triangles) = fan_triangulate(&points);
        assert_eq!(vertices.len(), 5);
        assert_eq!(vertices[4], [0.5, 0.5, 1.5]);
        assert_eq!(triangles.len(), 4);
        assert!(triangles.iter().all(|t| t[0] == 4));
        assert!(fan_triangulate(&points[..2]).1.is_empty());
    }

    #[test]
    fn mesh_needs_three_points() {
        let df = df!("a" => [1.0, 2.0], "b" => [1.0, 2.0], "c" => [1.0, 2.0]).unwrap();
        let schema = DatasetSchema::from_dataframe(&df);
        let request = ChartRequest::new(ChartKind::Mesh3D)
            .with_column("x", "a")
            .with_column("y", "b")
            .with_column("z", "c");
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        let err = FigureBuilder::build(&resolved, &df).unwrap_err();
        assert!(matches!(err, FigureError::TooFewPoints { needed: 3, found: 2, .. }));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(1234567.0), "1.23e6");
    }
}
