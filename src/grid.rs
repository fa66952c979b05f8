use std::ops::Range;

use crate::subset::{Selection, Subset};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Chunk shape {chunk_shape:?} does not match array shape {shape:?}")]
    RankMismatch {
        chunk_shape: Vec<usize>,
        shape: Vec<usize>,
    },
    #[error("Chunk extent of dimension {0} is 0")]
    EmptyChunk(usize),
}

/// A regular grid of chunks over an array, as reported to block-wise planners.
///
/// The cost factor scales the planner's estimate of how expensive it is to fetch one
/// element of the array; disk-backed seeds report a high value so blocks stay large.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkGrid {
    shape: Vec<usize>,
    chunk_shape: Vec<usize>,
    cost_factor: f64,
}

/// One block of a [`ChunkGrid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridChunk {
    /// Position of the chunk in the grid.
    pub chunk_indices: Vec<usize>,
    /// Element ranges covered by the chunk, per dimension.
    pub slices: Vec<Range<usize>>,
}

impl GridChunk {
    pub fn shape(&self) -> Vec<usize> {
        self.slices.iter().map(|s| s.end - s.start).collect()
    }

    pub fn to_subset(&self) -> Subset {
        Subset::new(
            self.slices
                .iter()
                .cloned()
                .map(Selection::range)
                .collect::<Vec<_>>(),
        )
    }
}

impl ChunkGrid {
    pub fn from_chunk_shape(
        chunk_shape: &[usize],
        shape: &[usize],
        cost_factor: f64,
    ) -> Result<Self, GridError> {
        if chunk_shape.len() != shape.len() {
            return Err(GridError::RankMismatch {
                chunk_shape: chunk_shape.to_vec(),
                shape: shape.to_vec(),
            });
        }
        if let Some(dim) = chunk_shape.iter().position(|&c| c == 0) {
            return Err(GridError::EmptyChunk(dim));
        }

        Ok(Self {
            shape: shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
            cost_factor,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk_shape
    }

    pub fn cost_factor(&self) -> f64 {
        self.cost_factor
    }

    /// Exclusive end of every chunk along `dim`, or `None` if the grid has no such
    /// dimension.
    pub fn boundaries(&self, dim: usize) -> Option<Vec<usize>> {
        let size = *self.shape.get(dim)?;
        let chunk = *self.chunk_shape.get(dim)?;
        Some(
            dim_starts(size, chunk)
                .into_iter()
                .map(|start| (start + chunk).min(size))
                .collect(),
        )
    }

    pub fn chunks_per_dimension(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&s, &c)| s.div_ceil(c))
            .collect()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks_per_dimension().iter().product()
    }

    /// Every chunk of the grid, last dimension varying fastest.
    pub fn chunks(&self) -> Vec<GridChunk> {
        let starts_per_dim: Vec<Vec<usize>> = self
            .shape
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&s, &c)| dim_starts(s, c))
            .collect();

        cartesian(&starts_per_dim)
            .into_iter()
            .map(|origin| {
                let chunk_indices = origin
                    .iter()
                    .zip(&self.chunk_shape)
                    .map(|(&o, &c)| o / c)
                    .collect();
                let slices = origin
                    .iter()
                    .enumerate()
                    .map(|(d, &o)| o..(o + self.chunk_shape[d]).min(self.shape[d]))
                    .collect();
                GridChunk {
                    chunk_indices,
                    slices,
                }
            })
            .collect()
    }
}

// all starting indices in one dimension
fn dim_starts(size: usize, chunk: usize) -> Vec<usize> {
    (0..size).step_by(chunk).collect()
}

fn cartesian(vv: &[Vec<usize>]) -> Vec<Vec<usize>> {
    vv.iter().fold(vec![vec![]], |acc, dim| {
        acc.into_iter()
            .flat_map(|base| {
                dim.iter().map(move |&i| {
                    let mut b = base.clone();
                    b.push(i);
                    b
                })
            })
            .collect()
    })
}
