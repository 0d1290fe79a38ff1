//! Parameter slot table: which columns each chart kind needs.

use super::kind::ChartKind;
use crate::data::ColumnKind;

/// Column-kind constraint of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    Any,
    Numeric,
    Categorical,
}

impl ColumnConstraint {
    pub fn accepts(self, kind: ColumnKind) -> bool {
        match self {
            ColumnConstraint::Any => true,
            ColumnConstraint::Numeric => kind == ColumnKind::Numeric,
            ColumnConstraint::Categorical => kind == ColumnKind::Categorical,
        }
    }
}

/// How the values of a multi-column slot are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOrder {
    /// Order defines levels of a hierarchy (treemap/sunburst path).
    Hierarchy,
    /// Order carries no meaning and duplicates are redundant.
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many { min: usize, order: ColumnOrder },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub constraint: ColumnConstraint,
    pub cardinality: Cardinality,
    pub required: bool,
}

impl SlotSpec {
    const fn one(name: &'static str, label: &'static str, constraint: ColumnConstraint) -> Self {
        Self {
            name,
            label,
            constraint,
            cardinality: Cardinality::One,
            required: true,
        }
    }

    const fn many(
        name: &'static str,
        label: &'static str,
        constraint: ColumnConstraint,
        min: usize,
        order: ColumnOrder,
    ) -> Self {
        Self {
            name,
            label,
            constraint,
            cardinality: Cardinality::Many { min, order },
            required: true,
        }
    }

    const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.cardinality, Cardinality::Many { .. })
    }
}

use ColumnConstraint::{Any, Categorical, Numeric};

const X_ANY: SlotSpec = SlotSpec::one("x", "X Axis", Any);
const Y_ANY: SlotSpec = SlotSpec::one("y", "Y Axis", Any);
const Z_ANY: SlotSpec = SlotSpec::one("z", "Z Axis", Any);
const COLOR: SlotSpec = SlotSpec::one("color", "Color", Any).optional();
const SIZE: SlotSpec = SlotSpec::one("size", "Size", Numeric);
const GROUP_X: SlotSpec = SlotSpec::one("x", "Group By", Any).optional();
const VALUE_Y: SlotSpec = SlotSpec::one("y", "Value", Numeric);
const DIMENSIONS: SlotSpec =
    SlotSpec::many("dimensions", "Dimensions", Numeric, 1, ColumnOrder::Set);
const PATH: SlotSpec = SlotSpec::many("path", "Hierarchy Path", Any, 1, ColumnOrder::Hierarchy);
const PATH_VALUES: SlotSpec = SlotSpec::one("values", "Values", Numeric).optional();

const BAR: &[SlotSpec] = &[
    SlotSpec::one("x", "Category", Any),
    SlotSpec::one("y", "Value", Numeric).optional(),
];
const PIE: &[SlotSpec] = &[
    SlotSpec::one("names", "Names", Any),
    SlotSpec::one("values", "Values", Numeric).optional(),
];
const HISTOGRAM: &[SlotSpec] = &[SlotSpec::one("x", "Column", Numeric), COLOR];
const DISTRIBUTION: &[SlotSpec] = &[VALUE_Y, GROUP_X];
const SCATTER: &[SlotSpec] = &[X_ANY, Y_ANY, COLOR];
const AREA: &[SlotSpec] = &[VALUE_Y, SlotSpec::one("x", "X Axis", Any).optional()];
const MATRIX: &[SlotSpec] = &[DIMENSIONS, COLOR];
const BUBBLE: &[SlotSpec] = &[X_ANY, Y_ANY, SIZE, COLOR];
const HEATMAP: &[SlotSpec] = &[SlotSpec::many("columns", "Columns", Any, 2, ColumnOrder::Set)];
const FUNNEL: &[SlotSpec] = &[
    SlotSpec::one("stage", "Stage", Any),
    SlotSpec::one("value", "Value", Numeric),
];
const HIERARCHY: &[SlotSpec] = &[PATH, PATH_VALUES];
const LINE: &[SlotSpec] = &[
    SlotSpec::many("y", "Series", Numeric, 1, ColumnOrder::Set),
    SlotSpec::one("x", "X Axis", Any).optional(),
];
const CHOROPLETH: &[SlotSpec] = &[
    SlotSpec::one("locations", "Locations", Categorical),
    SlotSpec::one("color", "Color Value", Numeric),
];
const XYZ: &[SlotSpec] = &[X_ANY, Y_ANY, Z_ANY];
const XYZ_COLOR: &[SlotSpec] = &[X_ANY, Y_ANY, Z_ANY, COLOR];
const BUBBLE_3D: &[SlotSpec] = &[X_ANY, Y_ANY, Z_ANY, SIZE, COLOR];
const CONE_3D: &[SlotSpec] = &[
    X_ANY,
    Y_ANY,
    Z_ANY,
    SlotSpec::one("u", "U Component", Numeric),
    SlotSpec::one("v", "V Component", Numeric),
    SlotSpec::one("w", "W Component", Numeric),
];
const POLAR_3D: &[SlotSpec] = &[
    SlotSpec::one("x", "Radius", Any),
    SlotSpec::one("y", "Angle (deg)", Any),
    Z_ANY,
];

/// Fixed slot list for a chart kind.
pub fn slots_for(kind: ChartKind) -> &'static [SlotSpec] {
    match kind {
        ChartKind::Bar => BAR,
        ChartKind::Pie => PIE,
        ChartKind::Histogram => HISTOGRAM,
        ChartKind::Box | ChartKind::Violin => DISTRIBUTION,
        ChartKind::Scatter => SCATTER,
        ChartKind::Area => AREA,
        ChartKind::Pair | ChartKind::ScatterMatrix => MATRIX,
        ChartKind::Bubble => BUBBLE,
        ChartKind::Heatmap => HEATMAP,
        ChartKind::Funnel => FUNNEL,
        ChartKind::Treemap | ChartKind::Sunburst => HIERARCHY,
        ChartKind::Line => LINE,
        ChartKind::Choropleth => CHOROPLETH,
        ChartKind::Line3D | ChartKind::Surface3D | ChartKind::Bar3D | ChartKind::Mesh3D => XYZ,
        ChartKind::Scatter3D | ChartKind::ScatterMatrix3D => XYZ_COLOR,
        ChartKind::Bubble3D => BUBBLE_3D,
        ChartKind::Cone3D => CONE_3D,
        ChartKind::ScatterPolar3D => POLAR_3D,
    }
}

/// Look up a single slot of a kind by name.
pub fn slot(kind: ChartKind, name: &str) -> Option<&'static SlotSpec> {
    slots_for(kind).iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_kind_has_unique_slots() {
        for kind in ChartKind::ALL {
            let slots = slots_for(kind);
            assert!(!slots.is_empty(), "{kind:?} has no slots");
            assert!(slots.iter().any(|s| s.required), "{kind:?} has no required slot");
            let names: HashSet<_> = slots.iter().map(|s| s.name).collect();
            assert_eq!(names.len(), slots.len(), "{kind:?} repeats a slot name");
            assert_eq!(slots_for(kind), slots);
        }
    }

    #[test]
    fn three_dimensional_kinds_need_xyz() {
        for kind in ChartKind::ALL.into_iter().filter(|k| k.is_3d()) {
            for axis in ["x", "y", "z"] {
                let spec = slot(kind, axis).unwrap();
                assert!(spec.required, "{kind:?}.{axis} should be required");
                assert_eq!(spec.cardinality, Cardinality::One);
            }
        }
    }

    #[test]
    fn multi_column_minimums() {
        let heatmap = slot(ChartKind::Heatmap, "columns").unwrap();
        assert_eq!(
            heatmap.cardinality,
            Cardinality::Many { min: 2, order: ColumnOrder::Set }
        );
        for kind in [ChartKind::Treemap, ChartKind::Sunburst] {
            let path = slot(kind, "path").unwrap();
            assert_eq!(
                path.cardinality,
                Cardinality::Many { min: 1, order: ColumnOrder::Hierarchy }
            );
        }
    }

    #[test]
    fn choropleth_constraints() {
        let locations = slot(ChartKind::Choropleth, "locations").unwrap();
        assert!(locations.constraint.accepts(ColumnKind::Categorical));
        assert!(!locations.constraint.accepts(ColumnKind::Numeric));
        let color = slot(ChartKind::Choropleth, "color").unwrap();
        assert!(!color.constraint.accepts(ColumnKind::Categorical));
    }
}
