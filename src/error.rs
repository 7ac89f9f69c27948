//! Error types for the kinetic solver.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown {kind} '{name}'")]
    UnknownScheme { kind: &'static str, name: String },

    #[error("{method} needs {required} ghost zones, grid has {available}")]
    InsufficientGhostZones {
        method: &'static str,
        required: usize,
        available: usize,
    },

    #[error("incompatible shape: expected {expected:?}, found {found:?}")]
    IncompatibleShape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("could not build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn unknown(kind: &'static str, name: &str) -> Self {
        Error::UnknownScheme {
            kind,
            name: name.to_owned(),
        }
    }

    pub(crate) fn shape(expected: &[usize], found: &[usize]) -> Self {
        Error::IncompatibleShape {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
