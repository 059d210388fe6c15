use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Properties file is not a mapping")]
    NotAMapping,
}

impl ProjectionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProjectionError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;
