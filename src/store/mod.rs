use arrow::{array::ArrayRef, array::RecordBatch, error::ArrowError};
use ::parquet::errors::ParquetError;

use schema::ArraySchema;

pub mod parquet;
pub mod schema;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("Missing tile array schema metadata")]
    MissingSchemaMetadata,
    #[error("Invalid tile array schema metadata: {0}")]
    InvalidSchemaMetadata(String),
    #[error("Unsupported tile array format version: {0}")]
    UnsupportedVersion(String),
    #[error("Invalid tile array schema: {0}")]
    InvalidSchema(String),
    #[error("Unknown attribute '{0}'")]
    UnknownAttribute(String),
    #[error("Query selects {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Index {index} is out of bounds for dimension '{dimension}' with extent {extent}")]
    IndexOutOfBounds {
        dimension: String,
        index: usize,
        extent: usize,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data returned by a single multi-index query.
#[derive(Debug, Clone)]
pub enum QueryResult {
    /// Attribute values of every requested cell, row-major over the cartesian product
    /// of the per-dimension selections.
    Dense { values: ArrayRef },
    /// Populated cells inside the selection: one `UInt64` column per dimension holding
    /// global coordinates, named after the dimension, followed by the attribute column.
    Sparse { batch: RecordBatch },
}

/// Entry point of a storage engine: reads schemas and hands out read handles.
pub trait TileStore: Send + Sync {
    type Reader: TileReader;

    fn load_schema(&self, path: &str) -> StoreResult<ArraySchema>;

    /// Opens a read handle. The handle is released when dropped.
    fn open(&self, path: &str) -> StoreResult<Self::Reader>;
}

/// An open read handle on a single tile array.
pub trait TileReader {
    fn schema(&self) -> &ArraySchema;

    /// Reads `attribute` for the cells selected by `selections`, one explicit index list
    /// per dimension in declared order.
    fn multi_index(&self, attribute: &str, selections: &[Vec<usize>]) -> StoreResult<QueryResult>;
}

/// Checks a query against the schema's domain before any data is read.
pub fn validate_selections(schema: &ArraySchema, selections: &[Vec<usize>]) -> StoreResult<()> {
    if selections.len() != schema.ndim() {
        return Err(StoreError::DimensionMismatch {
            expected: schema.ndim(),
            got: selections.len(),
        });
    }

    for (dim, selection) in schema.dimensions().iter().zip(selections) {
        if let Some(&index) = selection.iter().find(|&&i| i >= dim.extent) {
            return Err(StoreError::IndexOutOfBounds {
                dimension: dim.name.clone(),
                index,
                extent: dim.extent,
            });
        }
    }

    Ok(())
}
