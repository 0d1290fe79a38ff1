//! Data module - CSV loading and schema derivation

mod loader;
mod schema;

pub use loader::{DataLoader, DataPreview, LoaderError, PREVIEW_ROWS};
pub use schema::{ColumnDescriptor, ColumnKind, DatasetSchema};
