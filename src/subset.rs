use std::{fmt, ops::Range};

/// Index selection along a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Every index of the dimension.
    All,
    /// Explicit indices, in any order. Duplicates are allowed.
    Indices(Vec<usize>),
}

impl Selection {
    pub fn range(range: Range<usize>) -> Self {
        Selection::Indices(range.collect())
    }

    fn resolve(&self, extent: usize) -> Vec<usize> {
        match self {
            Selection::All => (0..extent).collect(),
            Selection::Indices(indices) => indices.clone(),
        }
    }
}

impl From<Vec<usize>> for Selection {
    fn from(indices: Vec<usize>) -> Self {
        Selection::Indices(indices)
    }
}

impl From<&[usize]> for Selection {
    fn from(indices: &[usize]) -> Self {
        Selection::Indices(indices.to_vec())
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Selection::range(range)
    }
}

/// A per-dimension index selection over the logical shape of a seed.
///
/// Dimensions past the end of the selection list are implicitly [`Selection::All`].
///
/// ```
/// use tile_array_seed::subset::{Selection, Subset};
///
/// let subset = Subset::new(vec![Selection::from(vec![0, 2])]);
/// let normalized = subset.normalize(&[4, 3]).unwrap();
/// assert_eq!(normalized, vec![vec![0, 2], vec![0, 1, 2]]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Subset {
    selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Subset selects {selections} dimensions but the array only has {ndim}")]
pub struct SubsetRankError {
    pub selections: usize,
    pub ndim: usize,
}

impl Subset {
    pub fn new<S: Into<Selection>>(selections: Vec<S>) -> Self {
        Self {
            selections: selections.into_iter().map(|s| s.into()).collect(),
        }
    }

    /// Selects the whole array.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    /// Resolves every dimension of `shape` to an explicit index list.
    pub fn normalize(&self, shape: &[usize]) -> Result<Vec<Vec<usize>>, SubsetRankError> {
        if self.selections.len() > shape.len() {
            return Err(SubsetRankError {
                selections: self.selections.len(),
                ndim: shape.len(),
            });
        }

        Ok(shape
            .iter()
            .enumerate()
            .map(|(dim, &extent)| match self.selections.get(dim) {
                Some(selection) => selection.resolve(extent),
                None => (0..extent).collect(),
            })
            .collect())
    }

    /// Number of selected elements per dimension of `shape`.
    pub fn extents(&self, shape: &[usize]) -> Result<Vec<usize>, SubsetRankError> {
        if self.selections.len() > shape.len() {
            return Err(SubsetRankError {
                selections: self.selections.len(),
                ndim: shape.len(),
            });
        }

        Ok(shape
            .iter()
            .enumerate()
            .map(|(dim, &extent)| match self.selections.get(dim) {
                Some(Selection::Indices(indices)) => indices.len(),
                Some(Selection::All) | None => extent,
            })
            .collect())
    }
}

impl From<Vec<Selection>> for Subset {
    fn from(selections: Vec<Selection>) -> Self {
        Self { selections }
    }
}

impl From<Vec<Vec<usize>>> for Subset {
    fn from(indices: Vec<Vec<usize>>) -> Self {
        Self::new(indices)
    }
}

impl From<Vec<Range<usize>>> for Subset {
    fn from(ranges: Vec<Range<usize>>) -> Self {
        Self::new(ranges)
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, selection) in self.selections.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match selection {
                Selection::All => write!(f, ":")?,
                Selection::Indices(indices) if indices.len() > 8 => {
                    write!(f, "[{} indices]", indices.len())?
                }
                Selection::Indices(indices) => write!(f, "{:?}", indices)?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_fills_trailing_dimensions() {
        let subset = Subset::new(vec![Selection::from(vec![3, 1])]);
        let normalized = subset.normalize(&[4, 2]).unwrap();
        assert_eq!(normalized, vec![vec![3, 1], vec![0, 1]]);
    }

    #[test]
    fn test_normalize_expands_all() {
        let subset = Subset::new(vec![Selection::All, Selection::from(vec![2])]);
        let normalized = subset.normalize(&[3, 5]).unwrap();
        assert_eq!(normalized, vec![vec![0, 1, 2], vec![2]]);
        assert_eq!(subset.extents(&[3, 5]).unwrap(), vec![3, 1]);
    }

    #[test]
    fn test_empty_selection_has_zero_extent() {
        let subset = Subset::from(vec![vec![], vec![1, 2]]);
        assert_eq!(subset.extents(&[4, 4]).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_too_many_selections() {
        let subset = Subset::from(vec![0..1, 0..1, 0..1]);
        let err = subset.normalize(&[2, 2]).unwrap_err();
        assert_eq!(
            err,
            SubsetRankError {
                selections: 3,
                ndim: 2
            }
        );
    }

    #[test]
    fn test_display() {
        let subset = Subset::new(vec![Selection::All, Selection::from(vec![1, 3])]);
        assert_eq!(subset.to_string(), "(:, [1, 3])");
        assert_eq!(Subset::all().to_string(), "()");
    }
}
