use std::path::PathBuf;

use thiserror::Error;

/// Failures of the document stages (completion and conversion).
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("cannot read spec: {0}")]
    SpecRead(String),

    #[error("not a legacy (swagger 2.0) document: {0}")]
    NotLegacyDialect(String),

    #[error("conversion failed: {0}")]
    Conversion(String),

    #[error("failed to serialize spec: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
