//! Chart Request Resolver
//! Validates a chart request against the dataset schema and normalizes it
//! into the descriptor handed to the figure builder.

use super::kind::{ChartKind, Projection};
use super::request::{ChartRequest, SlotValue};
use super::slots::{slot, slots_for, Cardinality, ColumnConstraint, ColumnOrder, SlotSpec};
use crate::data::DatasetSchema;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown chart kind '{0}'")]
    InvalidChartKind(String),
}

/// Why a slot failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    MissingSlot,
    UnknownColumn(String),
    WrongColumnKind {
        column: String,
        expected: ColumnConstraint,
    },
    MinimumCardinality {
        min: usize,
        found: usize,
    },
    InvalidOption(String),
    UnexpectedSlot,
    WrongCardinality,
}

/// First violated slot of a rejected request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", describe(.slot, .kind))]
pub struct ValidationError {
    pub slot: String,
    pub kind: ValidationErrorKind,
}

fn describe(slot: &str, kind: &ValidationErrorKind) -> String {
    match kind {
        ValidationErrorKind::MissingSlot => format!("Make a selection for '{slot}'"),
        ValidationErrorKind::UnknownColumn(column) => {
            format!("Column '{column}' selected for '{slot}' is not in the dataset")
        }
        ValidationErrorKind::WrongColumnKind { column, expected } => {
            let expected = match expected {
                ColumnConstraint::Numeric => "a numeric",
                ColumnConstraint::Categorical => "a categorical",
                ColumnConstraint::Any => "any",
            };
            format!("'{slot}' needs {expected} column, '{column}' is not")
        }
        ValidationErrorKind::MinimumCardinality { min, found } => {
            format!("'{slot}' needs at least {min} distinct columns, got {found}")
        }
        ValidationErrorKind::InvalidOption(value) => {
            format!("'{value}' is not a valid choice for '{slot}'")
        }
        ValidationErrorKind::UnexpectedSlot => {
            format!("'{slot}' is not an input of this chart")
        }
        ValidationErrorKind::WrongCardinality => {
            format!("'{slot}' takes a single column")
        }
    }
}

impl ValidationError {
    fn new(slot: &str, kind: ValidationErrorKind) -> Self {
        Self {
            slot: slot.to_string(),
            kind,
        }
    }

    /// The request is incomplete rather than wrong; the UI shows a hint.
    pub fn is_incomplete(&self) -> bool {
        self.kind == ValidationErrorKind::MissingSlot
    }
}

/// A request that passed validation and has been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChart {
    request: ChartRequest,
}

impl ResolvedChart {
    pub fn kind(&self) -> ChartKind {
        self.request.kind
    }

    pub fn request(&self) -> &ChartRequest {
        &self.request
    }

    pub fn column(&self, slot: &str) -> Option<&str> {
        self.request.column(slot)
    }

    pub fn columns(&self, slot: &str) -> &[String] {
        self.request.columns(slot)
    }

    pub fn title(&self) -> String {
        self.request.display_title()
    }

    pub fn projection(&self) -> Projection {
        self.request.projection()
    }
}

/// Stateless resolver over the static slot table.
pub struct ChartResolver;

impl ChartResolver {
    pub fn slots_for(kind: ChartKind) -> &'static [SlotSpec] {
        slots_for(kind)
    }

    /// Check a request against its kind's slots and the schema, fail-fast in slot order.
    pub fn validate(request: &ChartRequest, schema: &DatasetSchema) -> Result<(), ValidationError> {
        let slots = slots_for(request.kind);

        for name in request.bindings.keys() {
            if slot(request.kind, name).is_none() {
                return Err(ValidationError::new(name, ValidationErrorKind::UnexpectedSlot));
            }
        }

        for spec in slots {
            let value = request.binding(spec.name).filter(|v| !v.is_empty());
            let Some(value) = value else {
                if spec.required {
                    return Err(ValidationError::new(spec.name, ValidationErrorKind::MissingSlot));
                }
                continue;
            };

            if spec.cardinality == Cardinality::One && matches!(value, SlotValue::Columns(_)) {
                return Err(ValidationError::new(
                    spec.name,
                    ValidationErrorKind::WrongCardinality,
                ));
            }

            for column in value.names() {
                let Some(kind) = schema.kind_of(column) else {
                    return Err(ValidationError::new(
                        spec.name,
                        ValidationErrorKind::UnknownColumn(column.to_string()),
                    ));
                };
                if !spec.constraint.accepts(kind) {
                    return Err(ValidationError::new(
                        spec.name,
                        ValidationErrorKind::WrongColumnKind {
                            column: column.to_string(),
                            expected: spec.constraint,
                        },
                    ));
                }
            }

            if let Cardinality::Many { min, order } = spec.cardinality {
                let names = value.names();
                let found = match order {
                    ColumnOrder::Set => names.iter().collect::<BTreeSet<_>>().len(),
                    ColumnOrder::Hierarchy => names.len(),
                };
                if found < min {
                    return Err(ValidationError::new(
                        spec.name,
                        ValidationErrorKind::MinimumCardinality { min, found },
                    ));
                }
            }
        }

        if request.kind.uses_projection() {
            if let Some(projection) = request.settings.projection.as_deref() {
                if Projection::from_name(projection).is_none() {
                    return Err(ValidationError::new(
                        "projection",
                        ValidationErrorKind::InvalidOption(projection.to_string()),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Deterministic form of a request: list slots always hold a column list,
    /// set slots sorted and de-duplicated, hierarchy slots with consecutive
    /// repeats collapsed, map projection defaulted.
    pub fn normalize(request: &ChartRequest) -> ChartRequest {
        let mut normalized = request.clone();
        for (name, value) in normalized.bindings.iter_mut() {
            let Some(spec) = slot(request.kind, name) else {
                continue;
            };
            let Cardinality::Many { order, .. } = spec.cardinality else {
                continue;
            };
            // A lone column on a list slot becomes a one-element list.
            if let SlotValue::Column(column) = value {
                let column = std::mem::take(column);
                *value = SlotValue::Columns(vec![column]);
            }
            if let SlotValue::Columns(columns) = value {
                match order {
                    ColumnOrder::Set => {
                        columns.sort();
                        columns.dedup();
                    }
                    ColumnOrder::Hierarchy => columns.dedup(),
                }
            }
        }

        if request.kind.uses_projection() && normalized.settings.projection.is_none() {
            normalized.settings.projection = Some(Projection::default().name().to_string());
        }

        normalized
    }

    /// Validate then normalize.
    pub fn resolve(
        request: &ChartRequest,
        schema: &DatasetSchema,
    ) -> Result<ResolvedChart, ValidationError> {
        Self::validate(request, schema)?;
        Ok(ResolvedChart {
            request: Self::normalize(request),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;

    fn catalog_schema() -> DatasetSchema {
        DatasetSchema::new([
            ("price", ColumnKind::Numeric),
            ("brand", ColumnKind::Categorical),
            ("rating", ColumnKind::Numeric),
            ("category", ColumnKind::Categorical),
            ("country", ColumnKind::Categorical),
        ])
    }

    fn kind_of(err: ValidationError) -> (String, ValidationErrorKind) {
        (err.slot, err.kind)
    }

    #[test]
    fn scatter_accepts_any_columns() {
        let request = ChartRequest::new(ChartKind::Scatter)
            .with_column("x", "price")
            .with_column("y", "brand");

        assert_eq!(ChartResolver::validate(&request, &catalog_schema()), Ok(()));
        assert_eq!(ChartResolver::normalize(&request), request);
    }

    #[test]
    fn missing_slot_names_the_slot() {
        let request = ChartRequest::new(ChartKind::Scatter).with_column("x", "price");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert!(err.is_incomplete());
        assert_eq!(kind_of(err), ("y".to_string(), ValidationErrorKind::MissingSlot));
    }

    #[test]
    fn optional_slot_may_stay_unbound() {
        let request = ChartRequest::new(ChartKind::Box).with_column("y", "price");
        assert!(ChartResolver::validate(&request, &catalog_schema()).is_ok());
    }

    #[test]
    fn numeric_slot_rejects_categorical() {
        let request = ChartRequest::new(ChartKind::Histogram).with_column("x", "brand");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert!(!err.is_incomplete());
        assert_eq!(
            kind_of(err),
            (
                "x".to_string(),
                ValidationErrorKind::WrongColumnKind {
                    column: "brand".to_string(),
                    expected: ColumnConstraint::Numeric,
                }
            )
        );
    }

    #[test]
    fn categorical_slot_rejects_numeric() {
        let request = ChartRequest::new(ChartKind::Choropleth)
            .with_column("locations", "price")
            .with_column("color", "rating");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(err.slot, "locations");
        assert!(matches!(err.kind, ValidationErrorKind::WrongColumnKind { .. }));
    }

    #[test]
    fn unknown_column_is_reported() {
        let request = ChartRequest::new(ChartKind::Pie).with_column("names", "colour");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(
            kind_of(err),
            (
                "names".to_string(),
                ValidationErrorKind::UnknownColumn("colour".to_string())
            )
        );
    }

    #[test]
    fn heatmap_needs_two_columns() {
        let request = ChartRequest::new(ChartKind::Heatmap).with_columns("columns", ["price"]);
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(
            kind_of(err),
            (
                "columns".to_string(),
                ValidationErrorKind::MinimumCardinality { min: 2, found: 1 }
            )
        );

        // The same column twice is still a single column.
        let request =
            ChartRequest::new(ChartKind::Heatmap).with_columns("columns", ["price", "price"]);
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::MinimumCardinality { min: 2, found: 1 }
        );
    }

    #[test]
    fn empty_required_list_is_missing() {
        let request =
            ChartRequest::new(ChartKind::Treemap).with_columns("path", Vec::<String>::new());
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(kind_of(err), ("path".to_string(), ValidationErrorKind::MissingSlot));
    }

    #[test]
    fn heatmap_columns_are_sorted_and_deduplicated() {
        let request = ChartRequest::new(ChartKind::Heatmap)
            .with_columns("columns", ["rating", "price", "rating"]);
        let resolved = ChartResolver::resolve(&request, &catalog_schema()).unwrap();
        assert_eq!(resolved.columns("columns"), ["price", "rating"]);
    }

    #[test]
    fn treemap_path_keeps_hierarchy_order() {
        let request = ChartRequest::new(ChartKind::Treemap)
            .with_columns("path", ["brand", "category", "brand"]);
        let resolved = ChartResolver::resolve(&request, &catalog_schema()).unwrap();
        assert_eq!(resolved.columns("path"), ["brand", "category", "brand"]);

        let request = ChartRequest::new(ChartKind::Sunburst)
            .with_columns("path", ["category", "category", "brand"]);
        let normalized = ChartResolver::normalize(&request);
        assert_eq!(normalized.columns("path"), ["category", "brand"]);
    }

    #[test]
    fn choropleth_projection() {
        let request = ChartRequest::new(ChartKind::Choropleth)
            .with_column("locations", "country")
            .with_column("color", "rating")
            .with_projection("equirectangular");
        assert!(ChartResolver::validate(&request, &catalog_schema()).is_ok());

        let bad = request.clone().with_projection("flat-earth");
        let err = ChartResolver::validate(&bad, &catalog_schema()).unwrap_err();
        assert_eq!(
            kind_of(err),
            (
                "projection".to_string(),
                ValidationErrorKind::InvalidOption("flat-earth".to_string())
            )
        );
    }

    #[test]
    fn choropleth_projection_defaults() {
        let request = ChartRequest::new(ChartKind::Choropleth)
            .with_column("locations", "country")
            .with_column("color", "rating");
        let resolved = ChartResolver::resolve(&request, &catalog_schema()).unwrap();
        assert_eq!(
            resolved.request().settings.projection.as_deref(),
            Some("equirectangular")
        );
    }

    #[test]
    fn incomplete_3d_selection_is_rejected() {
        let request = ChartRequest::new(ChartKind::Scatter3D)
            .with_column("x", "price")
            .with_column("z", "rating");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(kind_of(err), ("y".to_string(), ValidationErrorKind::MissingSlot));
    }

    #[test]
    fn unexpected_and_mis_shaped_bindings() {
        let request = ChartRequest::new(ChartKind::Pie)
            .with_column("names", "brand")
            .with_column("z", "price");
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(kind_of(err), ("z".to_string(), ValidationErrorKind::UnexpectedSlot));

        let request = ChartRequest::new(ChartKind::Pie).with_columns("names", ["brand"]);
        let err = ChartResolver::validate(&request, &catalog_schema()).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::WrongCardinality);
    }

    #[test]
    fn lone_column_on_list_slot_becomes_a_list() {
        let schema = catalog_schema();

        let request = ChartRequest::new(ChartKind::Treemap).with_column("path", "brand");
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        assert_eq!(resolved.columns("path"), ["brand"]);

        let request = ChartRequest::new(ChartKind::Pair).with_column("dimensions", "price");
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        assert_eq!(resolved.columns("dimensions"), ["price"]);

        let request = ChartRequest::new(ChartKind::Line).with_column("y", "rating");
        let resolved = ChartResolver::resolve(&request, &schema).unwrap();
        assert_eq!(resolved.columns("y"), ["rating"]);
        assert_eq!(ChartResolver::normalize(resolved.request()), *resolved.request());

        // Heatmap still needs two distinct columns.
        let request = ChartRequest::new(ChartKind::Heatmap).with_column("columns", "price");
        let err = ChartResolver::validate(&request, &schema).unwrap_err();
        assert_eq!(
            err.kind,
            ValidationErrorKind::MinimumCardinality { min: 2, found: 1 }
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let schema = catalog_schema();
        let requests = [
            ChartRequest::new(ChartKind::Pair).with_columns("dimensions", ["rating", "price"]),
            ChartRequest::new(ChartKind::Line)
                .with_columns("y", ["rating", "price", "price"])
                .with_column("x", "brand"),
            ChartRequest::new(ChartKind::Sunburst)
                .with_columns("path", ["brand", "brand", "category"]),
            ChartRequest::new(ChartKind::Choropleth)
                .with_column("locations", "country")
                .with_column("color", "price"),
        ];
        for request in requests {
            assert!(ChartResolver::validate(&request, &schema).is_ok());
            let once = ChartResolver::normalize(&request);
            assert_eq!(ChartResolver::normalize(&once), once);
            assert!(ChartResolver::validate(&once, &schema).is_ok());
        }
    }

    #[test]
    fn error_messages() {
        let err = ValidationError::new("x", ValidationErrorKind::MissingSlot);
        assert_eq!(err.to_string(), "Make a selection for 'x'");
        let err = ValidationError::new(
            "columns",
            ValidationErrorKind::MinimumCardinality { min: 2, found: 1 },
        );
        assert_eq!(err.to_string(), "'columns' needs at least 2 distinct columns, got 1");
    }
}
