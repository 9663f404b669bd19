//! End-to-end route handling against a real data directory.

use enc_core::{Config, Passphrase, StoreEngine};
use enc_server::routes::handle;
use enc_server::{ApiResponse, ServerConfig, ServerContext, ServerError};
use serde_json::Value;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    ctx: ServerContext,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let engine = StoreEngine::open(dir.path(), Passphrase::new("pw"), Config::default()).unwrap();
        let ctx = ServerContext::new(Arc::new(engine), ServerConfig::default())
            .with_fingerprint("ab".repeat(32));
        Self { _dir: dir, ctx }
    }

    fn call(&self, method: &str, path: &str, body: &str) -> Result<ApiResponse, ServerError> {
        handle(&self.ctx, method, path, body.as_bytes())
    }

    fn json(&self, method: &str, path: &str, body: &str) -> Value {
        match self.call(method, path, body).unwrap() {
            ApiResponse::Json(v) => v,
            ApiResponse::Bytes(_) => panic!("expected JSON from {method} {path}"),
        }
    }
}

#[test]
fn store_lifecycle() {
    let f = Fixture::new();

    let created = f.json("POST", "/api/stores", r#"{"title": "personal"}"#);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["title"], "personal");
    assert_eq!(created["records"], 0);

    let list = f.json("GET", "/api/stores", "");
    assert_eq!(list.as_array().unwrap().len(), 1);

    let renamed = f.json("PUT", &format!("/api/store/{id}"), r#"{"title": "private"}"#);
    assert_eq!(renamed["title"], "private");

    let store = f.json("GET", &format!("/api/store/{id}"), "");
    assert_eq!(store["title"], "private");
    assert_eq!(store["records"].as_array().unwrap().len(), 0);

    f.json("DELETE", &format!("/api/store/{id}"), "");
    let err = f.call("GET", &format!("/api/store/{id}"), "").unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn record_lifecycle_and_buffer() {
    let f = Fixture::new();
    let store = f.json("POST", "/api/stores", r#"{"title": "s"}"#);
    let sid = store["id"].as_str().unwrap().to_string();

    let record = f.json(
        "POST",
        &format!("/api/store/{sid}/records"),
        r#"{"kind": "file", "title": "scan", "value": [9, 9], "buffer": [1, 2, 3, 4]}"#,
    );
    let rid = record["id"].as_str().unwrap().to_string();
    assert_eq!(record["title"], "scan");

    let listed = f.json("GET", &format!("/api/store/{sid}/records"), "");
    assert_eq!(listed[0]["buffer_size"], 4);

    let buffer = f
        .call("GET", &format!("/api/store/{sid}/record/{rid}/buffer"), "")
        .unwrap();
    assert_eq!(buffer, ApiResponse::Bytes(vec![1, 2, 3, 4]));

    let updated = f.json(
        "PUT",
        &format!("/api/store/{sid}/record/{rid}"),
        r#"{"title": "scan v2", "buffer": null}"#,
    );
    assert_eq!(updated["title"], "scan v2");
    assert!(updated["buffer"].is_null());

    let err = f
        .call("GET", &format!("/api/store/{sid}/record/{rid}/buffer"), "")
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound(_)));

    f.json("DELETE", &format!("/api/store/{sid}/record/{rid}"), "");
    let err = f
        .call("GET", &format!("/api/store/{sid}/record/{rid}"), "")
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[test]
fn status_config_and_events() {
    let f = Fixture::new();
    f.json("POST", "/api/stores", r#"{"title": "s"}"#);

    let status = f.json("GET", "/api/status", "");
    assert_eq!(status["engine"]["stores"], 1);
    assert_eq!(status["engine"]["dirty"], false);
    assert_eq!(status["fingerprint"], "ab".repeat(32));

    let config = f.json("GET", "/api/config", "");
    assert_eq!(config["port"], 8443);

    f.ctx.events.push(enc_core::NewEvent {
        kind: enc_core::EventKind::RecordExpired,
        title: "Record expired".into(),
        description: "test".into(),
        store_id: None,
        record_id: None,
    });
    let events = f.json("GET", "/api/events", "");
    assert_eq!(events[0]["kind"], "record_expired");

    let cleared = f.json("GET", "/api/events/clear", "");
    assert_eq!(cleared["removed"], 1);
    assert_eq!(f.json("GET", "/api/events", ""), Value::Array(vec![]));
}

#[test]
fn client_errors_are_classified() {
    let f = Fixture::new();

    let err = f.call("GET", "/api/unknown", "").unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(err.status_code(), 404);

    let err = f.call("POST", "/api/stores", "not json").unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = f.call("GET", "/api/store/zzz", "").unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = f.call("PATCH", "/api/stores", "").unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[test]
fn writes_through_routes_are_durable() {
    let dir = tempdir().unwrap();
    {
        let engine =
            StoreEngine::open(dir.path(), Passphrase::new("pw"), Config::default()).unwrap();
        let ctx = ServerContext::new(Arc::new(engine), ServerConfig::default());
        handle(&ctx, "POST", "/api/stores", br#"{"title": "kept"}"#).unwrap();
    }

    let engine = StoreEngine::open(dir.path(), Passphrase::new("pw"), Config::default()).unwrap();
    let stores = engine.list_stores().unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].title, "kept");
}
