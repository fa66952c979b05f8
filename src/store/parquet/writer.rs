//! Writers used by the test-suite to lay out tile arrays on disk.
use std::{collections::HashMap, fs::File, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, RecordBatch, UInt64Array},
    datatypes::{DataType, Field, Schema},
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{
    consts,
    store::{
        schema::{DimensionSchema, Layout, SchemaMetadata},
        StoreResult,
    },
};

/// Small row groups so that row selection spans several of them.
const ROW_GROUP_SIZE: usize = 5;

pub(crate) fn write_batch(path: &Path, batch: &RecordBatch) -> StoreResult<()> {
    let properties = WriterProperties::builder()
        .set_max_row_group_size(ROW_GROUP_SIZE)
        .build();
    let mut writer = ArrowWriter::try_new(File::create(path)?, batch.schema(), Some(properties))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn write_tile_array(
    path: &Path,
    layout: Layout,
    dimensions: Vec<DimensionSchema>,
    mut fields: Vec<Field>,
    mut columns: Vec<ArrayRef>,
    attributes: Vec<(&str, ArrayRef)>,
) -> StoreResult<()> {
    for (name, array) in attributes {
        fields.push(Field::new(name, array.data_type().clone(), true));
        columns.push(array);
    }

    let metadata = SchemaMetadata {
        version: consts::TILE_ARRAY_FORMAT_VERSION.to_string(),
        layout,
        dimensions,
    };
    let schema = Schema::new_with_metadata(
        fields,
        HashMap::from([(consts::TILE_ARRAY_SCHEMA_KEY.to_string(), metadata.to_json()?)]),
    );
    let batch = RecordBatch::try_new(Arc::new(schema), columns)?;
    write_batch(path, &batch)
}

/// Writes a dense array. Every attribute holds one value per cell in row-major order.
pub(crate) fn write_dense(
    path: &Path,
    dimensions: Vec<DimensionSchema>,
    attributes: Vec<(&str, ArrayRef)>,
) -> StoreResult<()> {
    write_tile_array(path, Layout::Dense, dimensions, vec![], vec![], attributes)
}

/// Writes a sparse array. `coords[d]` holds the coordinate along dimension `d` of every
/// populated cell.
pub(crate) fn write_sparse(
    path: &Path,
    dimensions: Vec<DimensionSchema>,
    coords: Vec<Vec<u64>>,
    attributes: Vec<(&str, ArrayRef)>,
) -> StoreResult<()> {
    let fields = dimensions
        .iter()
        .map(|d| Field::new(&d.name, DataType::UInt64, false))
        .collect();
    let columns = coords
        .into_iter()
        .map(|c| Arc::new(UInt64Array::from(c)) as ArrayRef)
        .collect();
    write_tile_array(path, Layout::Sparse, dimensions, fields, columns, attributes)
}
