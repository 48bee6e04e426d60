use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::errors::KubeError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Connection settings for the API server.
#[derive(Clone)]
pub struct KubeConfig {
    /// Base URL, e.g. `https://10.0.0.1:443`.
    pub api_server: String,
    pub token: Option<String>,
    /// PEM bundle trusted in addition to the system roots.
    pub ca_pem: Option<Vec<u8>>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl KubeConfig {
    pub fn new(api_server: impl Into<String>) -> Self {
        Self {
            api_server: api_server.into(),
            token: None,
            ca_pem: None,
            insecure: false,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_ca_pem(mut self, pem: Vec<u8>) -> Self {
        self.ca_pem = Some(pem);
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads the token file; surrounding whitespace is trimmed.
    pub fn with_token_file(self, path: &Path) -> Result<Self, KubeError> {
        let token = read(path)?;
        Ok(self.with_token(String::from_utf8_lossy(&token).trim()))
    }

    pub fn with_ca_file(self, path: &Path) -> Result<Self, KubeError> {
        Ok(self.with_ca_pem(read(path)?))
    }

    /// Service-account configuration of a pod.
    ///
    /// Uses `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` and the mounted
    /// service-account token and CA bundle.
    pub fn in_cluster() -> Result<Self, KubeError> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| KubeError::NotInCluster("KUBERNETES_SERVICE_HOST"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT")
            .map_err(|_| KubeError::NotInCluster("KUBERNETES_SERVICE_PORT"))?;

        let dir = PathBuf::from(SERVICE_ACCOUNT_DIR);
        Self::new(server_url(&host, &port))
            .with_token_file(&dir.join("token"))?
            .with_ca_file(&dir.join("ca.crt"))
    }
}

impl std::fmt::Debug for KubeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeConfig")
            .field("api_server", &self.api_server)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("ca_pem", &self.ca_pem.as_ref().map(Vec::len))
            .field("insecure", &self.insecure)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn server_url(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    }
}

fn read(path: &Path) -> Result<Vec<u8>, KubeError> {
    std::fs::read(path).map_err(|source| KubeError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}
