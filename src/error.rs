use thiserror::Error;

/// Invalid engine configuration, usually from an environment override.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidTickInterval { var: &'static str, value: String },

    #[error("{var} must be greater than zero")]
    ZeroTickInterval { var: &'static str },

    #[error("{var} must not be blank")]
    BlankLabel { var: &'static str },
}
