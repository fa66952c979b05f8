use crate::{nd_array::NdArrayError, store::StoreError, subset::SubsetRankError};

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Unable to load tile array schema from '{path}': {source}")]
    StoreUnavailable {
        path: String,
        #[source]
        source: StoreError,
    },
    #[error("Attribute '{attribute}' not in the tile array schema of '{path}' (available: {available:?})")]
    AttributeNotFound {
        attribute: String,
        path: String,
        available: Vec<String>,
    },
    #[error("Query on attribute '{attribute}' of '{path}' with subset {subset} failed: {source}")]
    Query {
        path: String,
        attribute: String,
        subset: String,
        #[source]
        source: QueryFailure,
    },
}

/// Cause of a failed extraction.
#[derive(Debug, thiserror::Error)]
pub enum QueryFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Subset(#[from] SubsetRankError),
    #[error(transparent)]
    Materialize(#[from] NdArrayError),
    #[error("Query result has no column '{0}'")]
    MissingColumn(String),
}

pub type SeedResult<T> = Result<T, SeedError>;
