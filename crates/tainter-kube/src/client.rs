use async_trait::async_trait;
use reqwest::{
    Certificate, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use tainter_core::{ClusterClient, ClusterError};
use tainter_model::NodeState;
use tracing::{debug, trace};

use crate::{
    config::KubeConfig,
    errors::KubeError,
    wire::{Node, NodeList, Status, node_patch},
};

const JSON_PATCH: &str = "application/json-patch+json";

/// Node client for the Kubernetes API server.
///
/// The HTTP client (TLS roots, timeout) is built once in [`KubeClient::new`];
/// every call goes to the server, nothing is cached.
#[derive(Clone)]
pub struct KubeClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl KubeClient {
    pub fn new(cfg: KubeConfig) -> Result<Self, KubeError> {
        let mut builder = reqwest::Client::builder().timeout(cfg.timeout);
        if let Some(pem) = &cfg.ca_pem {
            let cert = Certificate::from_pem(pem).map_err(KubeError::InvalidCertificate)?;
            builder = builder.add_root_certificate(cert);
        }
        if cfg.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().map_err(KubeError::HttpClient)?;

        debug!(target: "tainter_kube::client", api_server = %cfg.api_server, insecure = cfg.insecure, "kubernetes client ready");
        Ok(Self {
            http,
            base: cfg.api_server.trim_end_matches('/').to_string(),
            token: cfg.token,
        })
    }

    fn nodes_url(&self) -> String {
        format!("{}/api/v1/nodes", self.base)
    }

    fn node_url(&self, name: &str) -> String {
        format!("{}/api/v1/nodes/{}", self.base, name)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder, name: &str) -> Result<Response, ClusterError> {
        let resp = self
            .authorize(req.header(ACCEPT, "application/json"))
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        let status = resp.status();
        trace!(target: "tainter_kube::client", %status, url = %resp.url(), "response");
        if status.is_success() {
            return Ok(resp);
        }

        let message = error_message(resp).await;
        Err(match status {
            StatusCode::NOT_FOUND => ClusterError::NotFound(name.to_string()),
            StatusCode::CONFLICT => ClusterError::Conflict(message),
            _ => ClusterError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl ClusterClient for KubeClient {
    async fn get_node(&self, name: &str) -> Result<NodeState, ClusterError> {
        let resp = self.send(self.http.get(self.node_url(name)), name).await?;
        let node: Node = decode(resp).await?;
        Ok(node.into())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeState>, ClusterError> {
        let resp = self.send(self.http.get(self.nodes_url()), "nodes").await?;
        let list: NodeList = decode(resp).await?;
        Ok(list.items.into_iter().map(NodeState::from).collect())
    }

    async fn update_node(&self, node: &NodeState) -> Result<(), ClusterError> {
        let body = node_patch(node)
            .and_then(|ops| serde_json::to_vec(&ops))
            .map_err(|e| ClusterError::Decode(format!("encode patch: {e}")))?;

        let req = self
            .http
            .patch(self.node_url(&node.name))
            .header(CONTENT_TYPE, JSON_PATCH)
            .body(body);
        self.send(req, &node.name).await?;

        debug!(
            target: "tainter_kube::client",
            node = %node.name,
            taints = node.taints.len(),
            labels = node.labels.len(),
            "node patched"
        );
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClusterError> {
    let body = resp
        .bytes()
        .await
        .map_err(|e| ClusterError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| ClusterError::Decode(e.to_string()))
}

/// `Status.message` when the body is a Kubernetes status, the raw body otherwise.
async fn error_message(resp: Response) -> String {
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<Status>(&body) {
        Ok(status) if !status.message.is_empty() => status.message,
        _ => body,
    }
}
