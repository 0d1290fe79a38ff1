//! Geometry for hierarchical and tiled figures.

use std::f64::consts::TAU;

/// A node of a grouped hierarchy. `value` is the sum of its leaves.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode {
    pub label: String,
    pub value: f64,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn root() -> Self {
        Self {
            label: String::new(),
            value: 0.0,
            children: Vec::new(),
        }
    }

    /// Add `value` along `path`, creating nodes as needed.
    pub fn insert(&mut self, path: &[String], value: f64) {
        self.value += value;
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        let idx = match self.children.iter().position(|c| &c.label == head) {
            Some(idx) => idx,
            None => {
                self.children.push(HierarchyNode {
                    label: head.clone(),
                    value: 0.0,
                    children: Vec::new(),
                });
                self.children.len() - 1
            }
        };
        self.children[idx].insert(rest, value);
    }

    /// Sort children largest first, recursively.
    pub fn sort_by_value(&mut self) {
        self.children
            .sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
        for child in &mut self.children {
            child.sort_by_value();
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> [f64; 2] {
        [(self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub rect: Rect,
    pub label: String,
    pub value: f64,
    /// 1 for top-level children of the root.
    pub depth: usize,
    /// Index of the top-level ancestor, used for coloring.
    pub branch: usize,
}

/// Slice-and-dice treemap: levels alternate between vertical and horizontal cuts.
pub fn treemap(root: &HierarchyNode, bounds: Rect) -> Vec<Tile> {
    let mut tiles = Vec::new();
    slice(root, bounds, 1, None, &mut tiles);
    tiles
}

fn slice(node: &HierarchyNode, bounds: Rect, depth: usize, branch: Option<usize>, out: &mut Vec<Tile>) {
    if node.value <= 0.0 {
        return;
    }
    let vertical_cuts = depth % 2 == 1;
    let mut offset = 0.0;
    for (i, child) in node.children.iter().enumerate() {
        if child.value <= 0.0 {
            continue;
        }
        let share = child.value / node.value;
        let rect = if vertical_cuts {
            let x0 = bounds.x0 + offset * bounds.width();
            Rect {
                x0,
                y0: bounds.y0,
                x1: x0 + share * bounds.width(),
                y1: bounds.y1,
            }
        } else {
            let y0 = bounds.y0 + offset * bounds.height();
            Rect {
                x0: bounds.x0,
                y0,
                x1: bounds.x1,
                y1: y0 + share * bounds.height(),
            }
        };
        offset += share;
        let branch = branch.unwrap_or(i);
        out.push(Tile {
            rect,
            label: child.label.clone(),
            value: child.value,
            depth,
            branch,
        });
        slice(child, rect, depth + 1, Some(branch), out);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sector {
    /// Radians, counter-clockwise from the positive x axis.
    pub start: f64,
    pub end: f64,
    pub inner: f64,
    pub outer: f64,
    pub label: String,
    pub value: f64,
    pub depth: usize,
    pub branch: usize,
}

impl Sector {
    /// Polygon outline with `steps` segments per arc.
    pub fn outline(&self, steps: usize) -> Vec<[f64; 2]> {
        let steps = steps.max(1);
        let arc = |radius: f64, from: f64, to: f64| {
            (0..=steps).map(move |i| {
                let a = from + (to - from) * i as f64 / steps as f64;
                [radius * a.cos(), radius * a.sin()]
            })
        };
        let mut points: Vec<[f64; 2]> = arc(self.outer, self.start, self.end).collect();
        if self.inner > 0.0 {
            points.extend(arc(self.inner, self.end, self.start));
        } else {
            points.push([0.0, 0.0]);
        }
        points
    }

    pub fn label_position(&self) -> [f64; 2] {
        let a = (self.start + self.end) / 2.0;
        let r = (self.inner + self.outer) / 2.0;
        [r * a.cos(), r * a.sin()]
    }
}

/// Concentric rings, one per depth; the root is an empty center of radius 1.
pub fn sunburst(root: &HierarchyNode) -> Vec<Sector> {
    let mut sectors = Vec::new();
    ring(root, 0.0, TAU, 1, None, &mut sectors);
    sectors
}

fn ring(
    node: &HierarchyNode,
    start: f64,
    span: f64,
    depth: usize,
    branch: Option<usize>,
    out: &mut Vec<Sector>,
) {
    if node.value <= 0.0 {
        return;
    }
    let mut angle = start;
    for (i, child) in node.children.iter().enumerate() {
        if child.value <= 0.0 {
            continue;
        }
        let sweep = span * child.value / node.value;
        let branch = branch.unwrap_or(i);
        out.push(Sector {
            start: angle,
            end: angle + sweep,
            inner: depth as f64,
            outer: depth as f64 + 1.0,
            label: child.label.clone(),
            value: child.value,
            depth,
            branch,
        });
        ring(child, angle, sweep, depth + 1, Some(branch), out);
        angle += sweep;
    }
}

/// Pie wedges: a single ring starting at the center.
pub fn pie(slices: &[(String, f64)]) -> Vec<Sector> {
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut angle = 0.0;
    slices
        .iter()
        .enumerate()
        .filter(|(_, (_, v))| *v > 0.0)
        .map(|(i, (label, value))| {
            let sweep = TAU * value / total;
            let sector = Sector {
                start: angle,
                end: angle + sweep,
                inner: 0.0,
                outer: 1.0,
                label: label.clone(),
                value: *value,
                depth: 1,
                branch: i,
            };
            angle += sweep;
            sector
        })
        .collect()
}

/// Near-square grid with `n` cells: (columns, rows).
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f64).sqrt().ceil() as usize;
    (cols, n.div_ceil(cols))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> HierarchyNode {
        let mut root = HierarchyNode::root();
        root.insert(&labels(&["acme", "shoes"]), 3.0);
        root.insert(&labels(&["acme", "hats"]), 1.0);
        root.insert(&labels(&["zeta", "shoes"]), 4.0);
        root.sort_by_value();
        root
    }

    #[test]
    fn insert_accumulates() {
        let root = sample();
        assert_eq!(root.value, 8.0);
        assert_eq!(root.depth(), 3);
        assert_eq!(root.children[0].label, "acme");
        assert_eq!(root.children[0].value, 4.0);
        assert_eq!(root.children[0].children[0].label, "shoes");
    }

    #[test]
    fn treemap_tiles_partition_bounds() {
        let bounds = Rect { x0: 0.0, y0: 0.0, x1: 10.0, y1: 5.0 };
        let tiles = treemap(&sample(), bounds);
        assert_eq!(tiles.len(), 5);

        let top_area: f64 = tiles
            .iter()
            .filter(|t| t.depth == 1)
            .map(|t| t.rect.width() * t.rect.height())
            .sum();
        assert!((top_area - 50.0).abs() < 1e-9);

        let hats = tiles.iter().find(|t| t.label == "hats").unwrap();
        assert_eq!(hats.depth, 2);
        assert_eq!(hats.branch, 0);
        assert!((hats.rect.height() - 1.25).abs() < 1e-9);
    }

    #[test]
    fn sunburst_rings_cover_full_circle() {
        let sectors = sunburst(&sample());
        let sweep: f64 = sectors
            .iter()
            .filter(|s| s.depth == 1)
            .map(|s| s.end - s.start)
            .sum();
        assert!((sweep - TAU).abs() < 1e-9);
        assert!(sectors.iter().filter(|s| s.depth == 2).all(|s| s.inner == 2.0));
    }

    #[test]
    fn pie_skips_empty_slices() {
        let wedges = pie(&[("a".into(), 1.0), ("b".into(), 0.0), ("c".into(), 3.0)]);
        assert_eq!(wedges.len(), 2);
        assert!((wedges[1].end - TAU).abs() < 1e-9);
        assert!(pie(&[]).is_empty());
    }

    #[test]
    fn grid_is_near_square() {
        assert_eq!(grid_dimensions(0), (0, 0));
        assert_eq!(grid_dimensions(1), (1, 1));
        assert_eq!(grid_dimensions(5), (3, 2));
        assert_eq!(grid_dimensions(9), (3, 3));
    }
}
