//! Array schema model shared by every store implementation.
//!
//! An [`ArraySchema`] describes the domain (ordered dimensions with their extents and
//! tile sizes), the storage layout and the named attributes with their element types.
//! The Parquet tile store persists the domain part as JSON under
//! [`consts::TILE_ARRAY_SCHEMA_KEY`](crate::consts::TILE_ARRAY_SCHEMA_KEY); attribute
//! types come from the Arrow fields themselves.
use arrow::datatypes::DataType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Dense,
    Sparse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionSchema {
    pub name: String,
    pub extent: usize,
    pub tile: usize,
}

impl DimensionSchema {
    pub fn new(name: &str, extent: usize, tile: usize) -> Self {
        Self {
            name: name.to_string(),
            extent,
            tile,
        }
    }
}

/// On-disk form of the domain description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub version: String,
    pub layout: Layout,
    pub dimensions: Vec<DimensionSchema>,
}

impl SchemaMetadata {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::InvalidSchemaMetadata(e.to_string()))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string(self).map_err(|e| StoreError::InvalidSchemaMetadata(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    layout: Layout,
    dimensions: Vec<DimensionSchema>,
    attributes: IndexMap<String, DataType>,
}

impl ArraySchema {
    pub fn try_new(
        layout: Layout,
        dimensions: Vec<DimensionSchema>,
        attributes: IndexMap<String, DataType>,
    ) -> StoreResult<Self> {
        if dimensions.is_empty() {
            return Err(StoreError::InvalidSchema(
                "A tile array needs at least one dimension".to_string(),
            ));
        }
        for (i, dim) in dimensions.iter().enumerate() {
            if dim.tile == 0 {
                return Err(StoreError::InvalidSchema(format!(
                    "Dimension '{}' has a tile extent of 0",
                    dim.name
                )));
            }
            if dimensions[..i].iter().any(|other| other.name == dim.name) {
                return Err(StoreError::InvalidSchema(format!(
                    "Duplicate dimension name '{}'",
                    dim.name
                )));
            }
            if attributes.contains_key(&dim.name) {
                return Err(StoreError::InvalidSchema(format!(
                    "Name '{}' is used by both a dimension and an attribute",
                    dim.name
                )));
            }
        }
        if attributes.is_empty() {
            return Err(StoreError::InvalidSchema(
                "A tile array needs at least one attribute".to_string(),
            ));
        }

        Ok(Self {
            layout,
            dimensions,
            attributes,
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_sparse(&self) -> bool {
        self.layout == Layout::Sparse
    }

    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[DimensionSchema] {
        &self.dimensions
    }

    /// Full domain extent per dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.extent).collect()
    }

    pub fn tile_shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.tile).collect()
    }

    /// Number of cells in the full domain, or `None` if it does not fit in `usize`.
    pub fn num_cells(&self) -> Option<usize> {
        self.dimensions
            .iter()
            .try_fold(1usize, |acc, d| acc.checked_mul(d.extent))
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|k| k.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&DataType> {
        self.attributes.get(name)
    }
}
