use std::path::PathBuf;

use tainter_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed policy {name}: {source}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid policy {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: ModelError,
    },
}
