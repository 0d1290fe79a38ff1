//! Chart request: a chart kind plus the user's slot bindings and settings.

use super::kind::{ChartKind, Projection};
use std::collections::BTreeMap;

/// Value bound to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Column(String),
    Columns(Vec<String>),
}

impl SlotValue {
    /// Column names in binding order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            SlotValue::Column(name) => vec![name.as_str()],
            SlotValue::Columns(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SlotValue::Column(_) => false,
            SlotValue::Columns(names) => names.is_empty(),
        }
    }
}

/// Free-form settings that do not bind columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSettings {
    pub title: Option<String>,
    /// Projection name for map-based charts, checked against [`Projection`].
    pub projection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub bindings: BTreeMap<String, SlotValue>,
    pub settings: ChartSettings,
}

impl ChartRequest {
    pub fn new(kind: ChartKind) -> Self {
        Self {
            kind,
            bindings: BTreeMap::new(),
            settings: ChartSettings::default(),
        }
    }

    /// Blank titles clear the setting so the generated title is used.
    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.settings.title = (!title.trim().is_empty()).then_some(title);
    }

    pub fn set_projection(&mut self, projection: impl Into<String>) {
        self.settings.projection = Some(projection.into());
    }

    pub fn bind_column(&mut self, slot: &str, column: impl Into<String>) {
        self.bindings
            .insert(slot.to_string(), SlotValue::Column(column.into()));
    }

    pub fn bind_columns<I, S>(&mut self, slot: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = columns.into_iter().map(Into::into).collect();
        self.bindings
            .insert(slot.to_string(), SlotValue::Columns(columns));
    }

    pub fn unbind(&mut self, slot: &str) -> Option<SlotValue> {
        self.bindings.remove(slot)
    }

    pub fn binding(&self, slot: &str) -> Option<&SlotValue> {
        self.bindings.get(slot)
    }

    /// Single column bound to `slot`, if any.
    pub fn column(&self, slot: &str) -> Option<&str> {
        match self.bindings.get(slot)? {
            SlotValue::Column(name) => Some(name),
            SlotValue::Columns(_) => None,
        }
    }

    /// Columns bound to a multi-column `slot`; empty when unbound.
    pub fn columns(&self, slot: &str) -> &[String] {
        match self.bindings.get(slot) {
            Some(SlotValue::Columns(names)) => names,
            _ => &[],
        }
    }

    /// Parsed projection, falling back to the default when unset or unknown.
    pub fn projection(&self) -> Projection {
        self.settings
            .projection
            .as_deref()
            .and_then(Projection::from_name)
            .unwrap_or_default()
    }

    /// Title for the figure: the user's text, or one derived from the bindings.
    pub fn display_title(&self) -> String {
        if let Some(title) = self.settings.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                return title.to_string();
            }
        }
        let columns: Vec<&str> = self.bindings.values().flat_map(|v| v.names()).collect();
        if columns.is_empty() {
            self.kind.label().to_string()
        } else {
            format!("{} - {}", self.kind.label(), columns.join(", "))
        }
    }
}

#[cfg(test)]
impl ChartRequest {
    pub fn with_column(mut self, slot: &str, column: impl Into<String>) -> Self {
        self.bind_column(slot, column);
        self
    }

    pub fn with_columns<I, S>(mut self, slot: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bind_columns(slot, columns);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    pub fn with_projection(mut self, projection: impl Into<String>) -> Self {
        self.set_projection(projection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_binds_slots() {
        let request = ChartRequest::new(ChartKind::Treemap)
            .with_columns("path", ["brand", "category"])
            .with_column("values", "price");

        assert_eq!(request.columns("path"), ["brand", "category"]);
        assert_eq!(request.column("values"), Some("price"));
        assert_eq!(request.column("path"), None);
        assert!(request.columns("values").is_empty());

        let mut request = request;
        assert!(request.unbind("values").is_some());
        assert_eq!(request.column("values"), None);
        assert!(request.unbind("values").is_none());
    }

    #[test]
    fn titles() {
        let request = ChartRequest::new(ChartKind::Histogram).with_column("x", "price");
        assert_eq!(request.display_title(), "Histogram - price");
        assert_eq!(request.clone().with_title("  ").display_title(), "Histogram - price");
        assert_eq!(request.clone().with_title("Prices").display_title(), "Prices");

        let mut request = request.with_title("Prices");
        request.set_title("   ");
        assert_eq!(request.settings.title, None);
        assert_eq!(request.display_title(), "Histogram - price");
        assert_eq!(ChartRequest::new(ChartKind::Pie).display_title(), "Pie Chart");
    }

    #[test]
    fn projection_falls_back_to_default() {
        let request = ChartRequest::new(ChartKind::Choropleth);
        assert_eq!(request.projection(), Projection::Equirectangular);
        let request = request.with_projection("robinson");
        assert_eq!(request.projection(), Projection::Robinson);
    }
}
