use thiserror::Error;

/// Everything that can go wrong while building or factorizing equations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Equation `{name}` has no terms")]
    EmptyEquation { name: String },

    #[error("Term in equation `{equation}` assigns to `{found}`, expected `{expected}`")]
    LhsMismatch {
        equation: String,
        expected: String,
        found: String,
    },

    #[error("Equation `{0}` already exists")]
    DuplicateEquation(String),

    #[error("Failed to parse expression: {0}")]
    Parse(String),

    #[error("Cannot classify index line `{0}`")]
    UnknownLine(String),

    #[error("Failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
