/// A named axis of a materialized array.
///
/// The name is carried over from the store's dimension it was extracted from, and the
/// size is the number of elements selected along that axis.
///
/// # Examples
///
/// ```
/// use tile_array_seed::nd_array::dimension::Dimension;
///
/// let dim = Dimension::new("rows", 10);
/// assert_eq!(dim.size(), 10);
/// assert_eq!(dim.name(), "rows");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: String,
    pub size: usize,
}

impl Dimension {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl From<(String, usize)> for Dimension {
    fn from((name, size): (String, usize)) -> Self {
        Self { name, size }
    }
}

impl From<(&str, usize)> for Dimension {
    fn from((name, size): (&str, usize)) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

impl AsRef<Dimension> for Dimension {
    fn as_ref(&self) -> &Dimension {
        self
    }
}
