use std::{collections::HashSet, fs::File, ops::Range, sync::Arc};

use arrow::{
    array::{new_empty_array, Array, ArrayRef, AsArray, BooleanArray, RecordBatch, UInt64Array},
    compute::{concat_batches, filter_record_batch, take},
    datatypes::UInt64Type,
    record_batch::RecordBatchReader,
};
use parquet::arrow::{
    arrow_reader::{
        ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder, RowSelection,
    },
    ProjectionMask,
};

use crate::{
    nd_array::{row_major_strides, RowMajorCoords},
    store::{
        schema::{ArraySchema, Layout},
        validate_selections, QueryResult, StoreError, StoreResult, TileReader,
    },
};

use super::{parse_schema, ReadOptions};

/// Open read handle on a Parquet tile array. The file is closed when the reader is dropped.
#[derive(Debug)]
pub struct ParquetTileReader {
    path: String,
    file: File,
    metadata: ArrowReaderMetadata,
    schema: ArraySchema,
    options: ReadOptions,
}

impl ParquetTileReader {
    pub fn try_new(path: &str, options: ReadOptions) -> StoreResult<Self> {
        let file = File::open(path)?;
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::new())?;
        let num_rows = usize::try_from(metadata.metadata().file_metadata().num_rows())
            .map_err(|_| StoreError::InvalidSchema("Negative row count".to_string()))?;
        let schema = parse_schema(metadata.schema(), num_rows)?;

        tracing::debug!(path, layout = ?schema.layout(), shape = ?schema.shape(), "opened tile array");

        Ok(Self {
            path: path.to_string(),
            file,
            metadata,
            schema,
            options,
        })
    }

    pub fn into_schema(self) -> ArraySchema {
        self.schema
    }

    fn num_rows(&self) -> usize {
        usize::try_from(self.metadata.metadata().file_metadata().num_rows()).unwrap_or(0)
    }

    fn builder(&self, columns: Vec<usize>) -> StoreResult<ParquetRecordBatchReaderBuilder<File>> {
        let builder = ParquetRecordBatchReaderBuilder::new_with_metadata(
            self.file.try_clone()?,
            self.metadata.clone(),
        );
        let mask = ProjectionMask::roots(builder.parquet_schema(), columns);
        Ok(builder
            .with_projection(mask)
            .with_batch_size(self.options.batch_size))
    }

    fn column_index(&self, name: &str) -> StoreResult<usize> {
        self.metadata
            .schema()
            .index_of(name)
            .map_err(|_| StoreError::UnknownAttribute(name.to_string()))
    }

    /// Values of every selected cell, row-major over the cartesian product of `selections`.
    fn read_dense(&self, attribute: &str, selections: &[Vec<usize>]) -> StoreResult<ArrayRef> {
        let column = self.column_index(attribute)?;
        let strides = row_major_strides(&self.schema.shape());
        let extents = selections.iter().map(Vec::len).collect::<Vec<_>>();

        let positions = RowMajorCoords::new(&extents)
            .map(|coords| {
                coords
                    .iter()
                    .enumerate()
                    .map(|(d, &c)| selections[d][c] * strides[d])
                    .sum::<usize>()
            })
            .collect::<Vec<_>>();

        if positions.is_empty() {
            let dtype = self.metadata.schema().field(column).data_type();
            return Ok(new_empty_array(dtype));
        }

        let mut builder = self.builder(vec![column])?;
        let indices = if self.options.use_row_selection {
            let mut rows = positions.clone();
            rows.sort_unstable();
            rows.dedup();

            let ranges = consecutive_ranges(&rows);
            tracing::trace!(rows = rows.len(), runs = ranges.len(), "dense row selection");
            builder = builder.with_row_selection(RowSelection::from_consecutive_ranges(
                ranges.into_iter(),
                self.num_rows(),
            ));
            positions
                .iter()
                .map(|p| rows.partition_point(|r| r < p) as u64)
                .collect::<UInt64Array>()
        } else {
            positions.iter().map(|&p| p as u64).collect::<UInt64Array>()
        };

        let reader = builder.build()?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let values = concat_batches(&schema, &batches)?;

        Ok(take(values.column(0).as_ref(), &indices, None)?)
    }

    /// Populated cells whose coordinates are selected on every dimension.
    fn read_sparse(&self, attribute: &str, selections: &[Vec<usize>]) -> StoreResult<RecordBatch> {
        let attribute_index = self.column_index(attribute)?;
        let names = self
            .schema
            .dimensions()
            .iter()
            .map(|d| d.name.as_str())
            .chain(std::iter::once(attribute))
            .collect::<Vec<_>>();

        let file_schema = self.metadata.schema();
        let mut columns = names[..names.len() - 1]
            .iter()
            .map(|name| file_schema.index_of(name))
            .collect::<Result<Vec<_>, _>>()?;
        columns.push(attribute_index);
        let output_schema = Arc::new(file_schema.project(&columns)?);

        if selections.iter().any(Vec::is_empty) {
            return Ok(RecordBatch::new_empty(output_schema));
        }

        // Sized by the selection, never by the domain extent.
        let members = selections
            .iter()
            .map(|selection| selection.iter().map(|&i| i as u64).collect::<HashSet<u64>>())
            .collect::<Vec<_>>();

        let reader = self.builder(columns)?.build()?;
        let mut filtered = vec![];
        for batch in reader {
            let batch = batch?;
            let order = names
                .iter()
                .map(|name| batch.schema().index_of(name))
                .collect::<Result<Vec<_>, _>>()?;
            let batch = batch.project(&order)?;
            let mask = membership_mask(&batch, &members)?;
            filtered.push(filter_record_batch(&batch, &mask)?);
        }

        Ok(concat_batches(&output_schema, &filtered)?)
    }
}

impl TileReader for ParquetTileReader {
    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn multi_index(&self, attribute: &str, selections: &[Vec<usize>]) -> StoreResult<QueryResult> {
        validate_selections(&self.schema, selections)?;
        if self.schema.attribute(attribute).is_none() {
            return Err(StoreError::UnknownAttribute(attribute.to_string()));
        }

        tracing::debug!(
            path = %self.path,
            attribute,
            extents = ?selections.iter().map(Vec::len).collect::<Vec<_>>(),
            "multi-index query"
        );

        match self.schema.layout() {
            Layout::Dense => Ok(QueryResult::Dense {
                values: self.read_dense(attribute, selections)?,
            }),
            Layout::Sparse => Ok(QueryResult::Sparse {
                batch: self.read_sparse(attribute, selections)?,
            }),
        }
    }
}

/// Merges sorted, deduplicated row numbers into half-open runs.
fn consecutive_ranges(rows: &[usize]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = vec![];
    for &row in rows {
        match ranges.last_mut() {
            Some(last) if last.end == row => last.end += 1,
            _ => ranges.push(row..row + 1),
        }
    }
    ranges
}

fn membership_mask(batch: &RecordBatch, members: &[HashSet<u64>]) -> StoreResult<BooleanArray> {
    let coords = (0..members.len())
        .map(|d| {
            batch
                .column(d)
                .as_primitive_opt::<UInt64Type>()
                .ok_or_else(|| {
                    StoreError::InvalidSchema(format!(
                        "Coordinate column '{}' is not UInt64",
                        batch.schema().field(d).name()
                    ))
                })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok((0..batch.num_rows())
        .map(|row| {
            Some(coords.iter().zip(members).all(|(column, member)| {
                column.is_valid(row) && member.contains(&column.value(row))
            }))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use arrow::{
        array::{Float32Array, Float64Array, Int32Array},
        datatypes::{Float32Type, Float64Type, Int32Type},
    };
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::store::{
        parquet::writer::{write_dense, write_sparse},
        schema::DimensionSchema,
    };

    fn dense_fixture() -> anyhow::Result<(TempDir, String)> {
        let dir = tempdir()?;
        let path = dir.path().join("dense.tileparquet");
        write_dense(
            &path,
            vec![
                DimensionSchema::new("rows", 4, 2),
                DimensionSchema::new("cols", 4, 2),
            ],
            vec![(
                "x",
                Arc::new(Float32Array::from_iter_values((0..16).map(|v| v as f32))) as ArrayRef,
            )],
        )?;
        let path = path.to_string_lossy().to_string();
        Ok((dir, path))
    }

    fn sparse_fixture() -> anyhow::Result<(TempDir, String)> {
        let dir = tempdir()?;
        let path = dir.path().join("sparse.tileparquet");
        write_sparse(
            &path,
            vec![
                DimensionSchema::new("i", 5, 5),
                DimensionSchema::new("j", 5, 5),
            ],
            vec![vec![0, 2, 4, 1], vec![0, 3, 4, 1]],
            vec![
                (
                    "value",
                    Arc::new(Float64Array::from(vec![1.0, 2.5, 9.0, 4.0])) as ArrayRef,
                ),
                ("tag", Arc::new(Int32Array::from(vec![10, 20, 30, 40])) as ArrayRef),
            ],
        )?;
        let path = path.to_string_lossy().to_string();
        Ok((dir, path))
    }

    fn dense_values(result: QueryResult) -> ArrayRef {
        match result {
            QueryResult::Dense { values } => values,
            other => panic!("expected dense result, got {other:?}"),
        }
    }

    fn sparse_batch(result: QueryResult) -> RecordBatch {
        match result {
            QueryResult::Sparse { batch } => batch,
            other => panic!("expected sparse result, got {other:?}"),
        }
    }

    #[test]
    fn test_consecutive_ranges() {
        assert_eq!(
            consecutive_ranges(&[0, 1, 2, 5, 7, 8]),
            vec![0..3, 5..6, 7..9]
        );
        assert!(consecutive_ranges(&[]).is_empty());
    }

    #[test]
    fn test_dense_multi_index() -> anyhow::Result<()> {
        let (_dir, path) = dense_fixture()?;
        let reader = ParquetTileReader::try_new(&path, ReadOptions::default())?;

        let values = dense_values(reader.multi_index("x", &[vec![0, 2], vec![1, 3]])?);
        assert_eq!(
            values.as_primitive::<Float32Type>().values(),
            &[1.0, 3.0, 9.0, 11.0]
        );
        Ok(())
    }

    #[test]
    fn test_dense_multi_index_keeps_query_order() -> anyhow::Result<()> {
        let (_dir, path) = dense_fixture()?;
        for use_row_selection in [true, false] {
            let options = ReadOptions {
                batch_size: 3,
                use_row_selection,
            };
            let reader = ParquetTileReader::try_new(&path, options)?;
            let values = dense_values(reader.multi_index("x", &[vec![3, 0, 3], vec![2, 1]])?);
            assert_eq!(
                values.as_primitive::<Float32Type>().values(),
                &[14.0, 13.0, 2.0, 1.0, 14.0, 13.0]
            );
        }
        Ok(())
    }

    #[test]
    fn test_dense_empty_selection() -> anyhow::Result<()> {
        let (_dir, path) = dense_fixture()?;
        let reader = ParquetTileReader::try_new(&path, ReadOptions::default())?;
        let values = dense_values(reader.multi_index("x", &[vec![], vec![1, 2]])?);
        assert_eq!(values.len(), 0);
        assert_eq!(values.data_type(), &arrow::datatypes::DataType::Float32);
        Ok(())
    }

    #[test]
    fn test_multi_index_errors() -> anyhow::Result<()> {
        let (_dir, path) = dense_fixture()?;
        let reader = ParquetTileReader::try_new(&path, ReadOptions::default())?;

        assert!(matches!(
            reader.multi_index("y", &[vec![0], vec![0]]),
            Err(StoreError::UnknownAttribute(name)) if name == "y"
        ));
        assert!(matches!(
            reader.multi_index("x", &[vec![4], vec![0]]),
            Err(StoreError::IndexOutOfBounds { index: 4, .. })
        ));
        assert!(matches!(
            reader.multi_index("x", &[vec![0]]),
            Err(StoreError::DimensionMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_sparse_multi_index() -> anyhow::Result<()> {
        let (_dir, path) = sparse_fixture()?;
        let options = ReadOptions {
            batch_size: 2,
            ..Default::default()
        };
        let reader = ParquetTileReader::try_new(&path, options)?;

        let batch = sparse_batch(reader.multi_index("value", &[vec![4, 2, 0], vec![0, 3]])?);
        assert_eq!(batch.num_columns(), 3);
        assert_eq!(batch.schema().field(0).name(), "i");
        assert_eq!(batch.schema().field(1).name(), "j");
        assert_eq!(batch.schema().field(2).name(), "value");
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).as_primitive::<UInt64Type>().values(), &[0, 2]);
        assert_eq!(batch.column(1).as_primitive::<UInt64Type>().values(), &[0, 3]);
        assert_eq!(
            batch.column(2).as_primitive::<Float64Type>().values(),
            &[1.0, 2.5]
        );

        let batch = sparse_batch(reader.multi_index("tag", &[vec![1, 4], vec![1, 4]])?);
        assert_eq!(
            batch.column(2).as_primitive::<Int32Type>().values(),
            &[30, 40]
        );
        Ok(())
    }

    #[test]
    fn test_sparse_empty_selection() -> anyhow::Result<()> {
        let (_dir, path) = sparse_fixture()?;
        let reader = ParquetTileReader::try_new(&path, ReadOptions::default())?;
        let batch = sparse_batch(reader.multi_index("value", &[vec![0, 1], vec![]])?);
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.num_columns(), 3);

        let batch = sparse_batch(reader.multi_index("value", &[vec![3], vec![0, 1, 2]])?);
        assert_eq!(batch.num_rows(), 0);
        Ok(())
    }

    #[test]
    fn test_sparse_multi_index_huge_domain() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("huge.tileparquet");
        let extent = 1usize << 44;
        write_sparse(
            &path,
            vec![
                DimensionSchema::new("i", extent, 1 << 20),
                DimensionSchema::new("j", extent, 1 << 20),
            ],
            vec![vec![0, 5, 1 << 40], vec![0, 7, 3]],
            vec![(
                "value",
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])) as ArrayRef,
            )],
        )?;
        let reader = ParquetTileReader::try_new(&path.to_string_lossy(), ReadOptions::default())?;

        let batch = sparse_batch(reader.multi_index("value", &[vec![0, 5], vec![0, 7]])?);
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.column(0).as_primitive::<UInt64Type>().values(), &[0, 5]);
        assert_eq!(
            batch.column(2).as_primitive::<Float64Type>().values(),
            &[1.0, 2.0]
        );
        Ok(())
    }
}
