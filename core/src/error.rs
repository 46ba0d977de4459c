use chrono::NaiveDate;

/// Rejected catalog edits.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Recipe name must not be empty")]
    EmptyName,

    #[error("Recipe '{0}' already exists")]
    Duplicate(String),

    #[error("Recipe '{0}' not found")]
    NotFound(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("A pick is already saved for {date}: {recipe}")]
    AlreadyPicked { date: NaiveDate, recipe: String },

    #[error("No pick saved for {0}")]
    NothingPicked(NaiveDate),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The file on disk no longer matches the version the caller loaded.
    #[error("{file} was modified by someone else since it was loaded; reload and try again")]
    Conflict { file: String },
}
