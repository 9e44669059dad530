mod common;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{FailingStore, TestApp, JSON_CONTENT_TYPE, MASTER_KEY};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], 200);
    assert_eq!(body["result"][0]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn health_reports_unreachable_store() {
    let app = TestApp::with_store(Arc::new(FailingStore::default()));

    let res = app.get("/health", None).await;
    assert_eq!(res.status.as_u16(), 503);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    assert_eq!(res.body["code"], 503);
}

#[tokio::test]
async fn ip_restricted_token_checks_peer_address() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let mut tokens = Vec::new();
    for address in ["127.0.0.1", "10.20.30.40"] {
        let res = client
            .post(format!("{}/token", server.base_url))
            .header("Authorization", MASTER_KEY)
            .json(&json!({
                "email": "lab@example.com",
                "get": 1,
                "ip_restricted": 1,
                "ip_address": [address],
            }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = res.json::<Value>().await?;
        tokens.push(body["result"][0]["token"].as_str().unwrap_or_default().to_string());
    }

    let res = client
        .get(format!("{}/test/case", server.base_url))
        .header("Authorization", format!("Bearer {}", tokens[0]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str()?,
        JSON_CONTENT_TYPE
    );

    let res = client
        .get(format!("{}/test/case", server.base_url))
        .header("Authorization", tokens[1].as_str())
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // a proxy supplied address takes precedence over the peer
    let res = client
        .get(format!("{}/test/case", server.base_url))
        .header("Authorization", tokens[1].as_str())
        .header("X-Real-IP", "10.20.30.40")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}
