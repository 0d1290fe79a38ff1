//! Dataset Schema Module
//! Column names and coarse kind tags derived once from a loaded DataFrame.

use polars::prelude::*;
use std::fmt;

/// Coarse column type used for slot constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl ColumnKind {
    /// Map a Polars dtype onto the coarse kind. Integers and floats are numeric.
    pub fn from_dtype(dtype: &DataType) -> Self {
        if matches!(
            dtype,
            DataType::Float32
                | DataType::Float64
                | DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        ) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered, read-only list of the dataset's columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSchema {
    columns: Vec<ColumnDescriptor>,
}

impl DatasetSchema {
    /// Build a schema from (name, kind) pairs. Later duplicates of a name are ignored.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnKind)>,
        S: Into<String>,
    {
        let mut out: Vec<ColumnDescriptor> = Vec::new();
        for (name, kind) in columns {
            let name = name.into();
            if out.iter().all(|c| c.name != name) {
                out.push(ColumnDescriptor { name, kind });
            }
        }
        Self { columns: out }
    }

    pub fn from_dataframe(df: &DataFrame) -> Self {
        Self::new(
            df.get_columns()
                .iter()
                .map(|col| (col.name().to_string(), ColumnKind::from_dtype(col.dtype()))),
        )
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.get(name).map(|c| c.kind)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn names_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
