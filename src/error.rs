use thiserror::Error;

/// Errors surfaced by the record store and the commands built on it.
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    /// The student (or the whole department) has no marks yet.
    #[error("no marks entered for {0}")]
    NoData(String),

    #[error("score {0} is outside 0..=100")]
    InvalidScore(i64),

    #[error("roll number {0} is already registered")]
    DuplicateRollNo(String),

    #[error("invalid configuration for {var}: {reason}")]
    Config { var: &'static str, reason: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
