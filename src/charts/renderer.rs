//! Static Chart Renderer
//! Draws 3D figures into an RGB bitmap with plotters.
//!
//! Plot coordinates are (x, z, y) so the data z axis is vertical.
//! The bitmap is uploaded as an egui texture by the chart viewer.

use super::figure::{Axis, Figure, FigureBody, Geometry, Series3, SurfaceGrid, Volume};
use super::palette::{self, ColorKey};
use plotters::coord::ranged3d::Cartesian3d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

const PITCH: f64 = 0.45;
const YAW: f64 = 0.65;
const SCALE: f64 = 0.85;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Only 3D figures are rendered to a bitmap")]
    NotVolume,
    #[error("Rendering failed: {0}")]
    Backend(String),
}

fn backend<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

/// Packed RGB pixels, row-major.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn rgb(key: ColorKey) -> RGBColor {
    let (r, g, b) = palette::rgb(key);
    RGBColor(r, g, b)
}

/// Range covering all values with 5% padding; degenerate ranges widen by 1.
pub fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return 0.0..1.0;
    }
    if max - min < f64::EPSILON {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

/// Data point to plot coordinates.
fn to_plot(p: [f64; 3]) -> (f64, f64, f64) {
    (p[0], p[2], p[1])
}

/// Half the footprint of a 3D bar: 40% of the smallest gap between distinct values.
pub fn bar_half_width(values: &[f64]) -> f64 {
    let mut distinct: Vec<f64> = values.to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();
    let gap = distinct
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    if gap.is_finite() {
        gap * 0.4
    } else {
        0.4
    }
}

/// Factor that makes the longest vector 10% of `span`.
pub fn vector_scale(vectors: &[[f64; 3]], span: f64) -> f64 {
    let longest = vectors
        .iter()
        .map(|v| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt())
        .fold(0.0, f64::max);
    if longest > 0.0 {
        span * 0.1 / longest
    } else {
        0.0
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a 3D figure to an RGB bitmap.
    pub fn render(figure: &Figure, width: u32, height: u32) -> Result<RenderedImage, RenderError> {
        let FigureBody::Volume(volume) = &figure.body else {
            return Err(RenderError::NotVolume);
        };

        let mut pixels = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(backend)?;

            match &volume.geometry {
                Geometry::Scatter {
                    series,
                    projections: true,
                } => {
                    let (top, bottom) = root.split_vertically((height * 3 / 5) as i32);
                    Self::draw_volume(&top, &figure.title, volume)?;
                    Self::draw_projections(&bottom, &volume.axes, series)?;
                }
                _ => Self::draw_volume(&root, &figure.title, volume)?,
            }
            root.present().map_err(backend)?;
        }

        debug!(kind = figure.kind.id(), width, height, "rendered bitmap");
        Ok(RenderedImage {
            width,
            height,
            pixels,
        })
    }

    fn draw_volume<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        title: &str,
        volume: &Volume,
    ) -> Result<(), RenderError> {
        let points = Self::all_points(&volume.geometry);
        let x_range = padded_range(points.iter().map(|p| p[0]));
        let y_range = padded_range(points.iter().map(|p| p[1]));
        let mut z_range = padded_range(points.iter().map(|p| p[2]));
        if matches!(volume.geometry, Geometry::Bars(_)) {
            z_range = z_range.start.min(0.0)..z_range.end.max(0.0);
        }

        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 18))
            .margin(10)
            .build_cartesian_3d(x_range.clone(), z_range.clone(), y_range.clone())
            .map_err(backend)?;
        chart.with_projection(|mut pb| {
            pb.pitch = PITCH;
            pb.yaw = YAW;
            pb.scale = SCALE;
            pb.into_matrix()
        });

        let [ax, ay, az] = &volume.axes;
        let fx = |v: &f64| ax.format(*v);
        let fy = |v: &f64| az.format(*v);
        let fz = |v: &f64| ay.format(*v);
        chart
            .configure_axes()
            .light_grid_style(BLACK.mix(0.15))
            .max_light_lines(3)
            .x_formatter(&fx)
            .y_formatter(&fy)
            .z_formatter(&fz)
            .draw()
            .map_err(backend)?;

        match &volume.geometry {
            Geometry::Scatter { series, .. } => {
                for s in series {
                    let color = rgb(s.color);
                    let radius = s.radius.round() as i32;
                    chart
                        .draw_series(
                            s.points
                                .iter()
                                .map(|p| Circle::new(to_plot(*p), radius, color.mix(0.8).filled())),
                        )
                        .map_err(backend)?
                        .label(s.name.clone())
                        .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
                }
                if series.len() > 1 {
                    chart
                        .configure_series_labels()
                        .border_style(&BLACK)
                        .background_style(&WHITE.mix(0.8))
                        .draw()
                        .map_err(backend)?;
                }
            }
            Geometry::Path(path) => {
                let color = rgb(ColorKey::Default);
                chart
                    .draw_series(LineSeries::new(path.iter().map(|p| to_plot(*p)), &color))
                    .map_err(backend)?;
                chart
                    .draw_series(path.iter().map(|p| Circle::new(to_plot(*p), 2, color.filled())))
                    .map_err(backend)?;
            }
            Geometry::Surface(grid) => Self::draw_surface(&mut chart, grid, &z_range)?,
            Geometry::Bars(bars) => {
                let hx = bar_half_width(&bars.iter().map(|b| b[0]).collect::<Vec<_>>());
                let hy = bar_half_width(&bars.iter().map(|b| b[1]).collect::<Vec<_>>());
                let span = z_range.end - z_range.start;
                chart
                    .draw_series(bars.iter().map(|&[x, y, z]| {
                        let t = if span > 0.0 { (z - z_range.start) / span } else { 0.5 };
                        Cubiod::new(
                            [(x - hx, 0.0, y - hy), (x + hx, z, y + hy)],
                            rgb(ColorKey::Scale(t)).mix(0.9).filled(),
                            &BLACK.mix(0.6),
                        )
                    }))
                    .map_err(backend)?;
            }
            Geometry::Cones { origins, vectors } => {
                let span = (x_range.end - x_range.start)
                    .max(y_range.end - y_range.start)
                    .max(z_range.end - z_range.start);
                let scale = vector_scale(vectors, span);
                let color = rgb(ColorKey::Category(0));
                for (o, v) in origins.iter().zip(vectors) {
                    let tip = [o[0] + v[0] * scale, o[1] + v[1] * scale, o[2] + v[2] * scale];
                    chart
                        .draw_series(std::iter::once(PathElement::new(
                            vec![to_plot(*o), to_plot(tip)],
                            color.stroke_width(2),
                        )))
                        .map_err(backend)?;
                    chart
                        .draw_series(std::iter::once(Circle::new(to_plot(tip), 3, color.filled())))
                        .map_err(backend)?;
                }
            }
            Geometry::Mesh {
                vertices,
                triangles,
            } => {
                let span = z_range.end - z_range.start;
                chart
                    .draw_series(triangles.iter().map(|t| {
                        let corners: Vec<(f64, f64, f64)> =
                            t.iter().map(|&i| to_plot(vertices[i])).collect();
                        let mean = t.iter().map(|&i| vertices[i][2]).sum::<f64>() / 3.0;
                        let shade = if span > 0.0 { (mean - z_range.start) / span } else { 0.5 };
                        Polygon::new(corners, rgb(ColorKey::Scale(shade)).mix(0.85).filled())
                    }))
                    .map_err(backend)?;
            }
        }
        Ok(())
    }

    fn draw_surface<DB: DrawingBackend>(
        chart: &mut ChartContext<'_, DB, Cartesian3d<RangedCoordf64, RangedCoordf64, RangedCoordf64>>,
        grid: &SurfaceGrid,
        z_range: &Range<f64>,
    ) -> Result<(), RenderError> {
        let span = z_range.end - z_range.start;
        let shade = |z: f64| if span > 0.0 { (z - z_range.start) / span } else { 0.5 };
        let mut quads = Vec::new();
        for j in 0..grid.ys.len().saturating_sub(1) {
            for i in 0..grid.xs.len().saturating_sub(1) {
                let (Some(a), Some(b), Some(c), Some(d)) = (
                    grid.z[j][i],
                    grid.z[j][i + 1],
                    grid.z[j + 1][i + 1],
                    grid.z[j + 1][i],
                ) else {
                    continue;
                };
                let mean = (a + b + c + d) / 4.0;
                quads.push(Polygon::new(
                    vec![
                        (grid.xs[i], a, grid.ys[j]),
                        (grid.xs[i + 1], b, grid.ys[j]),
                        (grid.xs[i + 1], c, grid.ys[j + 1]),
                        (grid.xs[i], d, grid.ys[j + 1]),
                    ],
                    rgb(ColorKey::Scale(shade(mean))).mix(0.85).filled(),
                ));
            }
        }

        if quads.is_empty() {
            // Too sparse for a surface: show the cell means instead.
            let cells = grid.z.iter().enumerate().flat_map(|(j, row)| {
                row.iter().enumerate().filter_map(move |(i, z)| {
                    z.map(|z| (grid.xs[i], z, grid.ys[j]))
                })
            });
            chart
                .draw_series(cells.map(|p| Circle::new(p, 4, rgb(ColorKey::Scale(shade(p.1))).filled())))
                .map_err(backend)?;
            return Ok(());
        }
        chart.draw_series(quads).map_err(backend)?;
        Ok(())
    }

    fn draw_projections<DB: DrawingBackend>(
        area: &DrawingArea<DB, Shift>,
        axes: &[Axis; 3],
        series: &[Series3],
    ) -> Result<(), RenderError> {
        let panels = area.split_evenly((1, 3));
        let pairs = [(0usize, 1usize), (0, 2), (1, 2)];

        for (panel, (a, b)) in panels.iter().zip(pairs) {
            let points: Vec<[f64; 3]> = series.iter().flat_map(|s| s.points.iter().copied()).collect();
            let ar = padded_range(points.iter().map(|p| p[a]));
            let br = padded_range(points.iter().map(|p| p[b]));
            let (fa, fb) = (&axes[a], &axes[b]);
            let mut chart = ChartBuilder::on(panel)
                .margin(8)
                .x_label_area_size(24)
                .y_label_area_size(36)
                .build_cartesian_2d(ar, br)
                .map_err(backend)?;
            chart
                .configure_mesh()
                .x_desc(fa.label.as_str())
                .y_desc(fb.label.as_str())
                .x_label_formatter(&|v| fa.format(*v))
                .y_label_formatter(&|v| fb.format(*v))
                .x_labels(5)
                .y_labels(5)
                .draw()
                .map_err(backend)?;
            for s in series {
                let color = rgb(s.color);
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|p| Circle::new((p[a], p[b]), 2, color.mix(0.8).filled())),
                    )
                    .map_err(backend)?;
            }
        }
        Ok(())
    }

    /// Every position the geometry occupies, used for axis ranges.
    fn all_points(geometry: &Geometry) -> Vec<[f64; 3]> {
        match geometry {
            Geometry::Scatter { series, .. } => series
                .iter()
                .flat_map(|s| s.points.iter().copied())
                .collect(),
            Geometry::Path(points) | Geometry::Bars(points) => points.clone(),
            Geometry::Surface(grid) => grid
                .z
                .iter()
                .enumerate()
                .flat_map(|(j, row)| {
                    row.iter()
                        .enumerate()
                        .filter_map(move |(i, z)| z.map(|z| [grid.xs[i], grid.ys[j], z]))
                })
                .collect(),
            Geometry::Cones { origins, .. } => origins.clone(),
            Geometry::Mesh { vertices, .. } => vertices.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::kind::ChartKind;

    #[test]
    fn ranges_are_padded() {
        let r = padded_range([0.0, 10.0].into_iter());
        assert!((r.start + 0.5).abs() < 1e-9);
        assert!((r.end - 10.5).abs() < 1e-9);
        assert_eq!(padded_range([3.0, 3.0].into_iter()), 2.0..4.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        assert_eq!(padded_range([f64::NAN, 1.0].into_iter()), 0.0..2.0);
    }

    #[test]
    fn bar_footprint_follows_spacing() {
        assert!((bar_half_width(&[0.0, 1.0, 2.0, 1.0]) - 0.4).abs() < 1e-9);
        assert!((bar_half_width(&[0.0, 10.0]) - 4.0).abs() < 1e-9);
        assert!((bar_half_width(&[5.0]) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn longest_vector_is_a_tenth_of_span() {
        let scale = vector_scale(&[[3.0, 4.0, 0.0], [1.0, 0.0, 0.0]], 100.0);
        assert!((scale * 5.0 - 10.0).abs() < 1e-9);
        assert_eq!(vector_scale(&[[0.0; 3]], 10.0), 0.0);
    }

    #[test]
    fn z_is_vertical() {
        assert_eq!(to_plot([1.0, 2.0, 3.0]), (1.0, 3.0, 2.0));
    }

    #[test]
    fn surface_quads_are_drawn() {
        let grid = SurfaceGrid {
            xs: vec![0.0, 1.0],
            ys: vec![0.0, 1.0],
            z: vec![vec![Some(0.0), Some(1.0)], vec![Some(1.0), Some(2.0)]],
        };
        let mut pixels = vec![255u8; 64 * 64 * 3];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (64, 64)).into_drawing_area();
            let mut chart = ChartBuilder::on(&root)
                .build_cartesian_3d(0.0..1.0, 0.0..2.0, 0.0..1.0)
                .unwrap();
            StaticChartRenderer::draw_surface(&mut chart, &grid, &(0.0..2.0)).unwrap();
            root.present().unwrap();
        }
        assert!(pixels.iter().any(|&p| p != 255));
    }

    #[test]
    fn flat_figures_are_rejected() {
        let figure = Figure {
            title: "Pie".into(),
            kind: ChartKind::Pie,
            body: FigureBody::Pie { slices: Vec::new() },
        };
        assert!(matches!(
            StaticChartRenderer::render(&figure, 64, 64),
            Err(RenderError::NotVolume)
        ));
    }
}
