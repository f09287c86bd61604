//! Error type for database queries and entry access.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("No database entry with identifier '{identifier}'.")]
    NotFound { identifier: String },

    #[error("The database has more than one entry with identifier '{identifier}'.")]
    Ambiguous { identifier: String },

    #[error(
        "The database has more than {limit} entries ({count}). \
         To plot all entries anyway, set `force` to `true`."
    )]
    TooManyEntries { count: usize, limit: usize },

    #[error("No axis with name '{0}' found.")]
    NoAxis(String),

    #[error("Electrode with name '{0}' does not exist")]
    NoElectrode(String),

    #[error("A data package needs at least one resource")]
    EmptyPackage,

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    RaggedTable {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to encode thumbnail: {0}")]
    Thumbnail(#[from] image::ImageError),
}
