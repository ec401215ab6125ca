use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CaseError>;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Memory budget of {budget_mb} MB cannot hold a {nx}x{ny}x{nz} grid ({required_mb:.2} MB required)")]
    BudgetTooSmall {
        budget_mb: usize,
        nx: usize,
        ny: usize,
        nz: usize,
        required_mb: f64,
    },

    #[error("Geometry error in {}: {reason}", path.display())]
    Geometry { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaseError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        CaseError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn geometry(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CaseError::Geometry {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
