use std::path::PathBuf;

use thiserror::Error;

/// Failure while building a [`crate::KubeClient`].
///
/// Request-time failures are reported as [`tainter_core::ClusterError`].
#[derive(Error, Debug)]
pub enum KubeError {
    #[error("not running in a cluster: {0} is not set")]
    NotInCluster(&'static str),

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CA certificate: {0}")]
    InvalidCertificate(#[source] reqwest::Error),

    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
