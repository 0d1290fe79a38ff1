//! Chart Plotter Module
//! Draws 2D figures interactively using egui_plot.

use super::figure::{Axis, Figure, FigureBody, GroupDistribution, HistogramSeries, Series};
use super::layout::{self, HierarchyNode, Rect, Sector};
use super::palette::{self, ColorKey};
use egui::{Color32, RichText, Stroke};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoint, PlotPoints, PlotUi,
    Points, Polygon, Text,
};

const MISSING_COLOR: Color32 = Color32::from_rgb(200, 200, 200);
const ARC_STEPS: usize = 48;

/// Convert a palette key to an egui color.
pub fn color(key: ColorKey) -> Color32 {
    let (r, g, b) = palette::rgb(key);
    Color32::from_rgb(r, g, b)
}

/// Creates interactive charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Draw any 2D figure. Volume figures are drawn by the bitmap renderer.
    pub fn draw(ui: &mut egui::Ui, figure: &Figure, height: f32) {
        let id = figure.kind.id();
        match &figure.body {
            FigureBody::Bars {
                axis,
                value_label,
                values,
            } => Self::draw_bars(ui, id, axis, value_label, values, height),
            FigureBody::Funnel { stages, values } => Self::draw_funnel(ui, id, stages, values, height),
            FigureBody::Pie { slices } => {
                Self::draw_sectors(ui, id, &layout::pie(slices), height);
            }
            FigureBody::Histogram { label, series } => {
                Self::draw_histogram(ui, id, label, series, height)
            }
            FigureBody::Distribution {
                value_label,
                groups,
                violin,
            } => Self::draw_distribution(ui, id, value_label, groups, *violin, height),
            FigureBody::Points { x, y, series } => {
                Self::show_xy(ui, id, x, y, height, |plot_ui| {
                    Self::plot_points(plot_ui, series);
                });
            }
            FigureBody::Lines { x, series, filled } => {
                let y = Axis::numeric(if series.len() == 1 { series[0].name.as_str() } else { "value" });
                Self::show_xy(ui, id, x, &y, height, |plot_ui| {
                    for s in series {
                        let mut line = Line::new(PlotPoints::new(s.points.clone()))
                            .color(color(s.color))
                            .width(1.5)
                            .name(&s.name);
                        if *filled {
                            line = line.fill(0.0);
                        }
                        plot_ui.line(line);
                    }
                });
            }
            FigureBody::Matrix {
                columns,
                cells,
                skipped,
            } => {
                if !skipped.is_empty() {
                    ui.label(
                        RichText::new(format!("Skipped non-numeric: {}", skipped.join(", ")))
                            .size(11.0)
                            .color(Color32::GRAY),
                    );
                }
                Self::draw_matrix(ui, id, columns, cells, height);
            }
            FigureBody::Panels {
                dimensions,
                values,
                legend,
                row_groups,
                diagonal_histograms,
            } => Self::draw_panels(
                ui,
                dimensions,
                values,
                legend,
                row_groups,
                *diagonal_histograms,
                height,
            ),
            FigureBody::Hierarchy { root, radial } => {
                if *radial {
                    Self::draw_sectors(ui, id, &layout::sunburst(root), height);
                } else {
                    Self::draw_treemap(ui, id, root, height);
                }
            }
            FigureBody::Regions {
                projection,
                value_label,
                regions,
            } => {
                ui.label(
                    RichText::new(format!("Projection: {projection}"))
                        .size(11.0)
                        .color(Color32::GRAY),
                );
                Self::draw_regions(ui, id, value_label, regions, height);
            }
            FigureBody::Volume(_) => {}
        }
    }

    fn show_xy(
        ui: &mut egui::Ui,
        id: &str,
        x: &Axis,
        y: &Axis,
        height: f32,
        add: impl FnOnce(&mut PlotUi),
    ) {
        let x_axis = x.clone();
        let y_axis = y.clone();
        Plot::new(format!("plot_{id}"))
            .height(height)
            .legend(Legend::default())
            .x_axis_label(x.label.clone())
            .y_axis_label(y.label.clone())
            .x_axis_formatter(move |mark, _range| x_axis.format(mark.value))
            .y_axis_formatter(move |mark, _range| y_axis.format(mark.value))
            .show(ui, add);
    }

    fn plot_points(plot_ui: &mut PlotUi, series: &[Series]) {
        for s in series {
            plot_ui.points(
                Points::new(PlotPoints::new(s.points.clone()))
                    .radius(s.radius)
                    .color(color(s.color).gamma_multiply(0.8))
                    .name(&s.name),
            );
        }
    }

    fn draw_bars(
        ui: &mut egui::Ui,
        id: &str,
        axis: &Axis,
        value_label: &str,
        values: &[f64],
        height: f32,
    ) {
        let labels = axis.categories.clone().unwrap_or_default();
        let bars: Vec<Bar> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let name = labels.get(i).cloned().unwrap_or_default();
                Bar::new(i as f64, v)
                    .width(0.7)
                    .name(name)
                    .fill(color(ColorKey::Category(i)))
            })
            .collect();
        let x_axis = axis.clone();

        Plot::new(format!("plot_{id}"))
            .height(height)
            .x_axis_label(axis.label.clone())
            .y_axis_label(value_label.to_string())
            .x_axis_formatter(move |mark, _range| x_axis.format(mark.value))
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).name(value_label));
            });
    }

    fn draw_funnel(ui: &mut egui::Ui, id: &str, stages: &[String], values: &[f64], height: f32) {
        let n = stages.len();
        let widest = values.iter().copied().fold(0.0, f64::max);
        let labels = stages.to_vec();

        Plot::new(format!("plot_{id}"))
            .height(height)
            .show_grid(false)
            .x_axis_formatter(|_mark, _range| String::new())
            .y_axis_formatter(move |mark, _range| {
                // stages are drawn top to bottom
                let idx = (n as f64 - 1.0 - mark.value).round();
                if (mark.value.fract()).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                for (i, (stage, &value)) in stages.iter().zip(values).enumerate() {
                    let y = (n - 1 - i) as f64;
                    let rect = Rect {
                        x0: -value / 2.0,
                        y0: y - 0.4,
                        x1: value / 2.0,
                        y1: y + 0.4,
                    };
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(rect_outline(rect)))
                            .fill_color(color(ColorKey::Category(i)))
                            .stroke(Stroke::new(1.0, Color32::WHITE))
                            .name(stage),
                    );
                    let share = if widest > 0.0 { value / widest * 100.0 } else { 0.0 };
                    plot_ui.text(Text::new(
                        PlotPoint::new(0.0, y),
                        RichText::new(format!("{} ({share:.0}%)", super::figure::format_number(value)))
                            .size(11.0)
                            .strong(),
                    ));
                }
            });
    }

    fn draw_sectors(ui: &mut egui::Ui, id: &str, sectors: &[Sector], height: f32) {
        Plot::new(format!("plot_{id}"))
            .height(height)
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for sector in sectors {
                    let fill = color(ColorKey::Category(sector.branch));
                    let fill = if sector.depth > 1 {
                        fill.gamma_multiply(1.0 / sector.depth as f32 + 0.2)
                    } else {
                        fill
                    };
                    let mut polygon = Polygon::new(PlotPoints::new(sector.outline(ARC_STEPS)))
                        .fill_color(fill)
                        .stroke(Stroke::new(1.0, Color32::WHITE));
                    if sector.depth == 1 {
                        polygon = polygon.name(&sector.label);
                    }
                    plot_ui.polygon(polygon);

                    if sector.end - sector.start > 0.15 {
                        let [x, y] = sector.label_position();
                        plot_ui.text(Text::new(
                            PlotPoint::new(x, y),
                            RichText::new(&sector.label).size(10.0),
                        ));
                    }
                }
            });
    }

    fn draw_histogram(
        ui: &mut egui::Ui,
        id: &str,
        label: &str,
        series: &[HistogramSeries],
        height: f32,
    ) {
        let overlaid = series.len() > 1;
        Plot::new(format!("plot_{id}"))
            .height(height)
            .legend(Legend::default())
            .x_axis_label(label.to_string())
            .y_axis_label("count")
            .show(ui, |plot_ui| {
                for s in series {
                    let fill = color(s.color);
                    let fill = if overlaid { fill.gamma_multiply(0.6) } else { fill };
                    let bars: Vec<Bar> = s
                        .bins
                        .iter()
                        .map(|bin| {
                            Bar::new((bin.start + bin.end) / 2.0, bin.count as f64)
                                .width(bin.end - bin.start)
                                .fill(fill)
                        })
                        .collect();
                    plot_ui.bar_chart(BarChart::new(bars).color(fill).name(&s.name));
                }
            });
    }

    fn draw_distribution(
        ui: &mut egui::Ui,
        id: &str,
        value_label: &str,
        groups: &[GroupDistribution],
        violin: bool,
        height: f32,
    ) {
        let labels: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        Plot::new(format!("plot_{id}"))
            .height(height)
            .legend(Legend::default())
            .y_axis_label(value_label.to_string())
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round() as usize;
                if (mark.value - idx as f64).abs() < 1e-6 && idx < labels.len() {
                    labels[idx].clone()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                for (i, group) in groups.iter().enumerate() {
                    let c = color(ColorKey::Category(i));
                    let center = i as f64;
                    if violin {
                        let outline = violin_outline(center, &group.density, 0.4);
                        if !outline.is_empty() {
                            plot_ui.polygon(
                                Polygon::new(PlotPoints::new(outline))
                                    .fill_color(c.gamma_multiply(0.3))
                                    .stroke(Stroke::new(1.5, c))
                                    .name(&group.name),
                            );
                        }
                    }

                    let s = group.summary;
                    let elem = BoxElem::new(
                        center,
                        BoxSpread::new(s.whisker_low, s.q1, s.median, s.q3, s.whisker_high),
                    )
                    .name(&group.name)
                    .box_width(if violin { 0.1 } else { 0.5 })
                    .fill(c.gamma_multiply(0.3))
                    .stroke(Stroke::new(1.5, c));
                    plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&group.name));
                }
            });
    }

    fn draw_matrix(ui: &mut egui::Ui, id: &str, columns: &[String], cells: &[Vec<f64>], height: f32) {
        let n = columns.len();
        let x_labels = columns.to_vec();
        let y_labels = columns.to_vec();

        Plot::new(format!("plot_{id}"))
            .height(height)
            .data_aspect(1.0)
            .show_grid(false)
            .x_axis_formatter(move |mark, _range| category_tick(&x_labels, mark.value))
            .y_axis_formatter(move |mark, _range| {
                // first column on top
                category_tick(&y_labels, n as f64 - 1.0 - mark.value)
            })
            .show(ui, |plot_ui| {
                for (i, row) in cells.iter().enumerate() {
                    for (j, &r) in row.iter().enumerate() {
                        let cx = j as f64;
                        let cy = (n - 1 - i) as f64;
                        let fill = if r.is_nan() {
                            MISSING_COLOR
                        } else {
                            color(ColorKey::Diverging(r))
                        };
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::new(rect_outline(Rect {
                                x0: cx - 0.5,
                                y0: cy - 0.5,
                                x1: cx + 0.5,
                                y1: cy + 0.5,
                            })))
                            .fill_color(fill)
                            .stroke(Stroke::new(0.5, Color32::WHITE)),
                        );
                        let text = if r.is_nan() { "-".to_string() } else { format!("{r:.2}") };
                        plot_ui.text(
                            Text::new(PlotPoint::new(cx, cy), RichText::new(text).size(11.0))
                                .color(Color32::BLACK),
                        );
                    }
                }
            });
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_panels(
        ui: &mut egui::Ui,
        dimensions: &[String],
        values: &[Vec<Option<f64>>],
        legend: &[(String, ColorKey)],
        row_groups: &[Option<usize>],
        diagonal_histograms: bool,
        height: f32,
    ) {
        let n = dimensions.len();
        if n == 0 {
            return;
        }
        let cell = (height / n as f32).clamp(90.0, 220.0);

        ui.horizontal_wrapped(|ui| {
            for (name, key) in legend {
                ui.label(RichText::new("●").color(color(*key)));
                ui.label(RichText::new(name).size(11.0));
            }
        });

        egui::Grid::new("panel_grid")
            .spacing([4.0, 4.0])
            .show(ui, |ui| {
                for (i, row_dim) in dimensions.iter().enumerate() {
                    for (j, col_dim) in dimensions.iter().enumerate() {
                        let plot = Plot::new(format!("panel_{i}_{j}"))
                            .width(cell)
                            .height(cell)
                            .allow_zoom(false)
                            .allow_drag(false)
                            .allow_scroll(false)
                            .x_axis_label(if i + 1 == n { col_dim.clone() } else { String::new() })
                            .y_axis_label(if j == 0 { row_dim.clone() } else { String::new() });

                        plot.show(ui, |plot_ui| {
                            if i == j && diagonal_histograms {
                                let present: Vec<f64> = values[i].iter().flatten().copied().collect();
                                let bins = crate::stats::StatsCalculator::histogram(
                                    &present,
                                    crate::stats::StatsCalculator::default_bin_count(present.len()),
                                );
                                let bars: Vec<Bar> = bins
                                    .iter()
                                    .map(|b| {
                                        Bar::new((b.start + b.end) / 2.0, b.count as f64)
                                            .width(b.end - b.start)
                                    })
                                    .collect();
                                plot_ui.bar_chart(
                                    BarChart::new(bars).color(color(ColorKey::Default)),
                                );
                                return;
                            }
                            for (g, (_, key)) in legend.iter().enumerate() {
                                let points: Vec<[f64; 2]> = (0..row_groups.len())
                                    .filter(|&r| row_groups[r] == Some(g))
                                    .filter_map(|r| Some([values[j][r]?, values[i][r]?]))
                                    .collect();
                                plot_ui.points(
                                    Points::new(PlotPoints::new(points))
                                        .radius(1.5)
                                        .color(color(*key)),
                                );
                            }
                        });
                    }
                    ui.end_row();
                }
            });
    }

    fn draw_treemap(ui: &mut egui::Ui, id: &str, root: &HierarchyNode, height: f32) {
        let bounds = Rect {
            x0: 0.0,
            y0: 0.0,
            x1: 16.0,
            y1: 10.0,
        };
        let tiles = layout::treemap(root, bounds);
        let total_area = bounds.width() * bounds.height();

        Plot::new(format!("plot_{id}"))
            .height(height)
            .show_axes(false)
            .show_grid(false)
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                for tile in &tiles {
                    let base = color(ColorKey::Category(tile.branch));
                    let fill = if tile.depth > 1 {
                        base.gamma_multiply(1.0 / tile.depth as f32 + 0.3)
                    } else {
                        base
                    };
                    let mut polygon = Polygon::new(PlotPoints::new(rect_outline(tile.rect)))
                        .fill_color(fill)
                        .stroke(Stroke::new(tile.depth as f32 * 0.5 + 0.5, Color32::WHITE));
                    if tile.depth == 1 {
                        polygon = polygon.name(&tile.label);
                    }
                    plot_ui.polygon(polygon);

                    let area = tile.rect.width() * tile.rect.height();
                    if area / total_area > 0.01 {
                        let [x, y] = tile.rect.center();
                        plot_ui.text(Text::new(
                            PlotPoint::new(x, y),
                            RichText::new(&tile.label).size(10.0),
                        ));
                    }
                }
            });
    }

    fn draw_regions(
        ui: &mut egui::Ui,
        id: &str,
        value_label: &str,
        regions: &[(String, f64)],
        height: f32,
    ) {
        let (cols, _) = layout::grid_dimensions(regions.len());
        let (min, max) = regions
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
                (lo.min(*v), hi.max(*v))
            });

        Plot::new(format!("plot_{id}"))
            .height(height)
            .data_aspect(1.0)
            .show_axes(false)
            .show_grid(false)
            .show(ui, |plot_ui| {
                for (i, (name, value)) in regions.iter().enumerate() {
                    let cx = (i % cols.max(1)) as f64;
                    let cy = -((i / cols.max(1)) as f64);
                    let t = if max > min { (value - min) / (max - min) } else { 0.5 };
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(rect_outline(Rect {
                            x0: cx - 0.48,
                            y0: cy - 0.48,
                            x1: cx + 0.48,
                            y1: cy + 0.48,
                        })))
                        .fill_color(color(ColorKey::Scale(t)))
                        .stroke(Stroke::new(1.0, Color32::WHITE)),
                    );
                    plot_ui.text(Text::new(
                        PlotPoint::new(cx, cy),
                        RichText::new(format!(
                            "{name}\n{}",
                            super::figure::format_number(*value)
                        ))
                        .size(10.0)
                        .color(if t > 0.6 { Color32::BLACK } else { Color32::WHITE }),
                    ));
                }
            });
        ui.label(
            RichText::new(format!(
                "{value_label}: {} to {}",
                super::figure::format_number(min),
                super::figure::format_number(max)
            ))
            .size(11.0),
        );
    }
}

fn category_tick(labels: &[String], value: f64) -> String {
    let idx = value.round();
    if (value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn rect_outline(rect: Rect) -> Vec<[f64; 2]> {
    vec![
        [rect.x0, rect.y0],
        [rect.x1, rect.y0],
        [rect.x1, rect.y1],
        [rect.x0, rect.y1],
    ]
}

/// Mirrored density outline around `center`, scaled so the widest point spans `half_width`.
pub fn violin_outline(center: f64, density: &[[f64; 2]], half_width: f64) -> Vec<[f64; 2]> {
    let peak = density.iter().map(|p| p[1]).fold(0.0, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let scale = half_width / peak;
    let right = density.iter().map(|&[v, d]| [center + d * scale, v]);
    let left = density.iter().rev().map(|&[v, d]| [center - d * scale, v]);
    right.chain(left).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violin_is_symmetric() {
        let density = [[0.0, 0.1], [1.0, 0.4], [2.0, 0.2]];
        let outline = violin_outline(3.0, &density, 0.4);
        assert_eq!(outline.len(), 6);
        assert!((outline[1][0] - 3.4).abs() < 1e-9);
        assert!((outline[4][0] - 2.6).abs() < 1e-9);
        assert_eq!(outline[1][1], outline[4][1]);
        assert!(violin_outline(0.0, &[], 0.4).is_empty());
    }

    #[test]
    fn category_ticks_only_on_integers() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert_eq!(category_tick(&labels, 1.0), "b");
        assert_eq!(category_tick(&labels, 0.5), "");
        assert_eq!(category_tick(&labels, -1.0), "");
        assert_eq!(category_tick(&labels, 5.0), "");
    }

    #[test]
    fn palette_colors_convert() {
        assert_eq!(color(ColorKey::Default), Color32::from_rgb(52, 152, 219));
    }
}
