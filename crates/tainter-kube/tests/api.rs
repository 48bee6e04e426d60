use serde_json::json;
use tainter_core::{ClusterClient, ClusterError};
use tainter_kube::{KubeClient, KubeConfig};
use tainter_model::{NodeState, Taint, TaintEffect};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn node_json(name: &str, version: &str) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {
            "name": name,
            "resourceVersion": version,
            "labels": {"kubernetes.io/hostname": name}
        },
        "spec": {
            "taints": [{"key": "disk", "value": "full", "effect": "NoSchedule", "timeAdded": "2024-05-01T10:00:00Z"}]
        }
    })
}

fn client(server: &MockServer) -> KubeClient {
    KubeClient::new(KubeConfig::new(server.uri()).with_token("test-token")).unwrap()
}

#[tokio::test]
async fn get_node_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes/worker-1"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_json("worker-1", "17")))
        .expect(1)
        .mount(&server)
        .await;

    let node = client(&server).get_node("worker-1").await.unwrap();
    assert_eq!(node.name, "worker-1");
    assert_eq!(node.resource_version.as_deref(), Some("17"));
    assert_eq!(node.taints, vec![{
        let mut t = Taint::new("disk", "full", TaintEffect::NoSchedule);
        t.time_added = Some("2024-05-01T10:00:00Z".into());
        t
    }]);
}

#[tokio::test]
async fn missing_node_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "kind": "Status",
            "status": "Failure",
            "message": "nodes \"ghost\" not found",
            "reason": "NotFound",
            "code": 404
        })))
        .mount(&server)
        .await;

    let err = client(&server).get_node("ghost").await.unwrap_err();
    assert_eq!(err, ClusterError::NotFound("ghost".into()));
}

#[tokio::test]
async fn list_nodes_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "NodeList",
            "metadata": {"resourceVersion": "99"},
            "items": [node_json("a", "1"), node_json("b", "2"), node_json("c", "3")]
        })))
        .mount(&server)
        .await;

    let nodes = client(&server).list_nodes().await.unwrap();
    let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[tokio::test]
async fn server_error_is_api_error_with_status_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "kind": "Status",
            "message": "nodes is forbidden",
            "code": 403
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_nodes().await.unwrap_err();
    assert_eq!(
        err,
        ClusterError::Api {
            status: 403,
            message: "nodes is forbidden".into()
        }
    );
}

#[tokio::test]
async fn garbage_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/nodes/worker-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).get_node("worker-1").await.unwrap_err();
    assert!(matches!(err, ClusterError::Decode(_)));
}

#[tokio::test]
async fn update_sends_json_patch_with_version() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/nodes/worker-1"))
        .and(header("content-type", "application/json-patch+json"))
        .and(body_json(json!([
            {"op": "replace", "path": "/metadata/resourceVersion", "value": "17"},
            {"op": "add", "path": "/metadata/labels", "value": {"health": "bad"}},
            {"op": "add", "path": "/spec/taints", "value": [
                {"key": "disk", "value": "full", "effect": "NoExecute"}
            ]}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_json("worker-1", "18")))
        .expect(1)
        .mount(&server)
        .await;

    let mut node = NodeState::new("worker-1")
        .with_label("health", "bad")
        .with_taint(Taint::new("disk", "full", TaintEffect::NoExecute));
    node.resource_version = Some("17".into());

    client(&server).update_node(&node).await.unwrap();
}

#[tokio::test]
async fn stale_version_is_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/nodes/worker-1"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "kind": "Status",
            "message": "the object has been modified",
            "reason": "Conflict",
            "code": 409
        })))
        .mount(&server)
        .await;

    let mut node = NodeState::new("worker-1");
    node.resource_version = Some("1".into());

    let err = client(&server).update_node(&node).await.unwrap_err();
    assert_eq!(err, ClusterError::Conflict("the object has been modified".into()));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let client = KubeClient::new(KubeConfig::new("http://127.0.0.1:1")).unwrap();
    let err = client.get_node("worker-1").await.unwrap_err();
    assert!(matches!(err, ClusterError::Transport(_)));
}
