//! Kubernetes REST implementation of [`tainter_core::ClusterClient`].
//!
//! Only the node endpoints are used: `GET /api/v1/nodes`, `GET /api/v1/nodes/{name}`
//! and a JSON-patch `PATCH /api/v1/nodes/{name}` carrying taints, labels and the observed
//! `resourceVersion`.

mod config;
pub use config::{DEFAULT_REQUEST_TIMEOUT, KubeConfig};

mod errors;
pub use errors::KubeError;

mod client;
pub use client::KubeClient;

mod wire;
