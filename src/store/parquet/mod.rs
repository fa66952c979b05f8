//! A tile array store backed by a single Parquet file.
//!
//! The domain (dimension names, extents, tile sizes) and the layout are stored as JSON
//! under the [`TILE_ARRAY_SCHEMA_KEY`](crate::consts::TILE_ARRAY_SCHEMA_KEY) key-value
//! metadata entry. Dense arrays keep one row per cell in row-major order with one column
//! per attribute. Sparse arrays keep one row per populated cell, with a `UInt64`
//! coordinate column per dimension (named after the dimension) next to the attribute
//! columns.
use arrow::datatypes::{DataType, Schema};
use indexmap::IndexMap;

use crate::consts;

use super::{
    schema::{ArraySchema, Layout, SchemaMetadata},
    StoreError, StoreResult, TileStore,
};

pub mod reader;
#[cfg(test)]
pub(crate) mod writer;

pub use reader::ParquetTileReader;

/// Read-path configuration of a [`ParquetTileStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of rows decoded per record batch.
    pub batch_size: usize,
    /// Restrict dense reads to the rows covering the requested cells.
    pub use_row_selection: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            batch_size: consts::DEFAULT_BATCH_SIZE,
            use_row_selection: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParquetTileStore {
    options: ReadOptions,
}

impl ParquetTileStore {
    pub fn new(options: Option<ReadOptions>) -> Self {
        Self {
            options: options.unwrap_or_default(),
        }
    }
}

impl TileStore for ParquetTileStore {
    type Reader = ParquetTileReader;

    fn load_schema(&self, path: &str) -> StoreResult<ArraySchema> {
        let reader = ParquetTileReader::try_new(path, self.options.clone())?;
        Ok(reader.into_schema())
    }

    fn open(&self, path: &str) -> StoreResult<ParquetTileReader> {
        ParquetTileReader::try_new(path, self.options.clone())
    }
}

pub(crate) fn validate_version_compatibility(version: &str) -> StoreResult<()> {
    let major = |v: &str| v.split('.').next().map(str::to_string);
    match (major(version), major(consts::TILE_ARRAY_FORMAT_VERSION)) {
        (Some(found), Some(supported)) if !found.is_empty() && found == supported => Ok(()),
        _ => Err(StoreError::UnsupportedVersion(version.to_string())),
    }
}

/// Derives the array schema from the Arrow schema of a tile array file.
pub(crate) fn parse_schema(arrow_schema: &Schema, num_rows: usize) -> StoreResult<ArraySchema> {
    let json = arrow_schema
        .metadata()
        .get(consts::TILE_ARRAY_SCHEMA_KEY)
        .ok_or(StoreError::MissingSchemaMetadata)?;
    let metadata = SchemaMetadata::from_json(json)?;
    validate_version_compatibility(&metadata.version)?;

    let is_coordinate = |name: &str| {
        metadata.layout == Layout::Sparse && metadata.dimensions.iter().any(|d| d.name == name)
    };

    if metadata.layout == Layout::Sparse {
        for dim in &metadata.dimensions {
            let field = arrow_schema.field_with_name(&dim.name).map_err(|_| {
                StoreError::InvalidSchema(format!("Missing coordinate column '{}'", dim.name))
            })?;
            if field.data_type() != &DataType::UInt64 {
                return Err(StoreError::InvalidSchema(format!(
                    "Coordinate column '{}' has type {}, expected UInt64",
                    dim.name,
                    field.data_type()
                )));
            }
        }
    }

    let attributes = arrow_schema
        .fields()
        .iter()
        .filter(|field| !is_coordinate(field.name()))
        .map(|field| (field.name().to_string(), field.data_type().clone()))
        .collect::<IndexMap<_, _>>();

    let schema = ArraySchema::try_new(metadata.layout, metadata.dimensions, attributes)?;

    if schema.layout() == Layout::Dense {
        match schema.num_cells() {
            None => {
                return Err(StoreError::InvalidSchema(format!(
                    "Dense domain {:?} has more cells than can be addressed",
                    schema.shape()
                )))
            }
            Some(cells) if cells != num_rows => {
                return Err(StoreError::InvalidSchema(format!(
                    "Dense array holds {} cells but its domain {:?} has {}",
                    num_rows,
                    schema.shape(),
                    cells
                )))
            }
            Some(_) => {}
        }
    }

    Ok(schema)
}
