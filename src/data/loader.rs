//! CSV Data Loader Module
//! Handles CSV file loading, schema derivation and column extraction using Polars.

use crate::data::DatasetSchema;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("No data loaded")]
    NoData,
    #[error("Column '{0}' not found")]
    MissingColumn(String),
}

/// Number of leading rows shown in the raw data preview.
pub const PREVIEW_ROWS: usize = 5;

/// First rows of a dataset rendered as text, one `Vec` per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

/// Handles CSV file loading with Polars for high performance.
pub struct DataLoader {
    df: Option<DataFrame>,
    schema: DatasetSchema,
    file_path: Option<PathBuf>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            schema: DatasetSchema::default(),
            file_path: None,
        }
    }

    /// Read a CSV file into a DataFrame. The index column, when present, is dropped.
    pub fn read_csv(path: &Path, index_column: Option<&str>) -> Result<DataFrame, LoaderError> {
        // Use lazy evaluation for memory efficiency, then collect
        let mut df = LazyCsvReader::new(path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        if let Some(index) = index_column {
            if df.get_column_index(index).is_some() {
                df = df.drop(index)?;
                debug!(index, "dropped index column");
            }
        }

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded dataset"
        );
        Ok(df)
    }

    /// Load a CSV file and derive its schema.
    pub fn load_csv(
        &mut self,
        file_path: &Path,
        index_column: Option<&str>,
    ) -> Result<&DataFrame, LoaderError> {
        let df = Self::read_csv(file_path, index_column)?;
        self.file_path = Some(file_path.to_path_buf());
        self.set_dataframe(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Set DataFrame directly (used for async loading)
    pub fn set_dataframe(&mut self, df: DataFrame) {
        self.schema = DatasetSchema::from_dataframe(&df);
        self.df = Some(df);
    }

    /// Schema of the loaded DataFrame (empty when nothing is loaded).
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    /// Get file path.
    pub fn get_file_path(&self) -> Option<&PathBuf> {
        self.file_path.as_ref()
    }

    /// Values of a column cast to f64. Nulls and unparsable cells become `None`.
    pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
        let column = df
            .column(name)
            .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
        let value_f64 = column.cast(&DataType::Float64)?;
        let value_ca = value_f64.f64()?;
        Ok(value_ca
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect())
    }

    /// Head rows of `df` as text. Nulls are shown as empty cells.
    pub fn preview(df: &DataFrame, rows: usize) -> Result<DataPreview, LoaderError> {
        let head = df.head(Some(rows));
        let columns: Vec<String> = head
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut cells = vec![Vec::with_capacity(columns.len()); head.height()];
        for name in &columns {
            for (row, value) in Self::text_column(&head, name)?.into_iter().enumerate() {
                cells[row].push(value.unwrap_or_default());
            }
        }

        Ok(DataPreview {
            columns,
            rows: cells,
            total_rows: df.height(),
        })
    }

    /// Values of a column rendered as text.
    pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, LoaderError> {
        let column = df
            .column(name)
            .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
        let value_str = column.cast(&DataType::String)?;
        let value_ca = value_str.str()?;
        Ok(value_ca
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnKind;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_drops_index_and_derives_schema() {
        let file = write_csv("product_id,brand,price\n1,acme,9.5\n2,zeta,12\n3,acme,7.25\n");
        let mut loader = DataLoader::new();
        loader.load_csv(file.path(), Some("product_id")).unwrap();

        let schema = loader.schema();
        assert_eq!(schema.names(), vec!["brand", "price"]);
        assert_eq!(schema.kind_of("price"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("brand"), Some(ColumnKind::Categorical));
        assert_eq!(loader.get_row_count(), 3);
        assert_eq!(loader.get_file_path().map(|p| p.as_path()), Some(file.path()));
    }

    #[test]
    fn missing_index_column_is_ignored() {
        let file = write_csv("a,b\n1,x\n");
        let df = DataLoader::read_csv(file.path(), Some("product_id")).unwrap();
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn column_extraction() {
        let df = df!(
            "price" => [Some(1.5), None, Some(3.0)],
            "brand" => [Some("a"), Some("b"), None],
        )
        .unwrap();

        let prices = DataLoader::numeric_column(&df, "price").unwrap();
        assert_eq!(prices, vec![Some(1.5), None, Some(3.0)]);

        let brands = DataLoader::text_column(&df, "brand").unwrap();
        assert_eq!(brands, vec![Some("a".to_string()), Some("b".to_string()), None]);

        assert!(matches!(
            DataLoader::numeric_column(&df, "nope"),
            Err(LoaderError::MissingColumn(name)) if name == "nope"
        ));
    }

    #[test]
    fn preview_keeps_head_rows_in_column_order() {
        let df = df!(
            "brand" => [Some("acme"), None, Some("zeta"), Some("acme")],
            "rank" => [1i64, 2, 3, 4],
        )
        .unwrap();

        let preview = DataLoader::preview(&df, 3).unwrap();
        assert_eq!(preview.columns, vec!["brand", "rank"]);
        assert_eq!(preview.total_rows, 4);
        assert_eq!(
            preview.rows,
            vec![
                vec!["acme".to_string(), "1".to_string()],
                vec![String::new(), "2".to_string()],
                vec!["zeta".to_string(), "3".to_string()],
            ]
        );

        let short = DataLoader::preview(&df.head(Some(2)), PREVIEW_ROWS).unwrap();
        assert_eq!(short.rows.len(), 2);
    }
}
