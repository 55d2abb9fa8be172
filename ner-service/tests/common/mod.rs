//! Test helpers shared by the ner-service integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ner_service::config::NerConfig;
use ner_service::services::pipeline::{MockPipelineLoader, PipelineLoader};
use ner_service::startup::{router, AppState, Application};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub fn sample_kb_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/umls_sample.jsonl")
}

pub fn test_config() -> NerConfig {
    let mut config = NerConfig::default();
    config.common.port = 0; // Random port for testing
    config.model.knowledge_base_path = sample_kb_path();
    config.model.preload = false;
    config
}

/// In-process router around the given loader.
pub fn app_with_loader(loader: Arc<dyn PipelineLoader>) -> Router {
    app_with_config(test_config(), loader)
}

pub fn app_with_config(config: NerConfig, loader: Arc<dyn PipelineLoader>) -> Router {
    router(AppState::new(config, loader)).expect("Failed to build router")
}

/// In-process router around a mock pipeline.
pub fn mock_app(enabled: bool) -> Router {
    app_with_loader(Arc::new(MockPipelineLoader::new(enabled)))
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response was not JSON")
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    post_raw(uri, body.to_string())
}

pub fn post_raw(uri: &str, body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.into()))
        .unwrap()
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    /// Spawn the real application on a random port.
    pub async fn spawn(config: NerConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready
        let client = reqwest::Client::new();
        let ready_url = format!("{}/ready", address);
        for _ in 0..50 {
            if client.get(&ready_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}
