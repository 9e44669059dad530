mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use bson::{doc, oid::ObjectId};
use serde_json::json;

use kernelci_api::config::AppConfig;
use kernelci_api::database::DocumentStore;

use common::{FailingStore, TestApp, ADMIN_TOKEN, JSON_CONTENT_TYPE, MASTER_KEY, READ_TOKEN};

async fn create_token(app: &TestApp) -> String {
    let res = app
        .post_json("/token", Some(ADMIN_TOKEN), &json!({ "email": "bar", "get": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    res.first_id()
}

#[tokio::test]
async fn get_without_token_is_forbidden() {
    let app = TestApp::new();

    let res = app.get("/token", None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    assert_eq!(res.body["code"], 403);

    let res = app.get("/token", Some("wrong")).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
}

#[tokio::test]
async fn get_empty_collection() {
    let app = TestApp::new();

    let res = app.get("/token", Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    assert_eq!(
        res.body,
        json!({ "code": 200, "count": 0, "limit": 0, "skip": 0, "result": [] })
    );
}

#[tokio::test]
async fn empty_collection_echoes_requested_limit_under_production_limits() {
    let mut config = AppConfig::production();
    config.security.master_key = Some(MASTER_KEY.to_string());
    config.api.enable_request_logging = false;
    let app = TestApp::with_config(config);

    let res = app.get("/token", Some(MASTER_KEY)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.body,
        json!({ "code": 200, "count": 0, "limit": 0, "skip": 0, "result": [] })
    );

    let res = app.get("/token?limit=5000", Some(MASTER_KEY)).await;
    assert_eq!(res.body["limit"], 5000);
}

#[tokio::test]
async fn master_key_and_bearer_form_are_accepted() {
    let app = TestApp::new();

    assert_eq!(app.get("/token", Some(MASTER_KEY)).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/token", Some("Bearer foo")).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn non_admin_token_is_forbidden() {
    let app = TestApp::new();

    let res = app.get("/token", Some(READ_TOKEN)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_checks_content_before_keys() {
    let app = TestApp::new();

    let res = app
        .post_json("/token", None, &json!({ "email": "foo" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .call(Method::POST, "/token", Some(ADMIN_TOKEN), Some("text/plain"), "")
        .await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);

    let res = app
        .call(Method::POST, "/token", Some(ADMIN_TOKEN), Some("application/json"), "")
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .call(Method::POST, "/token", Some(ADMIN_TOKEN), Some("application/json"), "{not json")
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

    let res = app
        .post_json("/token", Some(ADMIN_TOKEN), &json!({ "foo": "foo", "bar": "bar" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
}

#[tokio::test]
async fn post_rejects_invalid_tokens() {
    let app = TestApp::new();

    let bodies = [
        json!({ "username": "foo" }),
        json!({ "email": "bar", "username": "foo", "get": "1" }),
        json!({ "email": "bar", "username": "foo", "ip_restricted": 1 }),
        json!({ "email": "bar", "username": "foo", "ip_address": "127.0.0.1" }),
        json!({ "email": "bar", "ip_restricted": 1, "ip_address": ["not-an-ip"] }),
        json!({ "email": "bar", "expires_on": "2014" }),
    ];
    for body in bodies {
        let res = app.post_json("/token", Some(ADMIN_TOKEN), &body).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "body {}", body);
        assert!(res.body["reason"].is_string());
    }
    assert_eq!(app.store.count("api-token", bson::doc! {}).await.unwrap(), 0);
}

#[tokio::test]
async fn post_creates_token() {
    let app = TestApp::new();

    let res = app
        .post_json(
            "/token",
            Some(ADMIN_TOKEN),
            &json!({
                "email": "bar",
                "username": "foo",
                "expires_on": "2014-07-01",
                "admin": 1,
                "superuser": 1,
                "get": 1,
                "delete": 1,
                "post": 1,
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    let id = res.first_id();
    assert_eq!(res.location(), Some(format!("/token/{}", id).as_str()));
    let value = res.body["result"][0]["token"].as_str().unwrap().to_string();

    let res = app.get(&format!("/token/{}", id), Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["result"][0]["email"], "bar");
    assert_eq!(res.body["result"][0]["properties"]["admin"], true);
    assert_eq!(res.body["result"][0]["properties"]["put"], false);

    let res = app.get(&format!("/token/{}", value), Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.first_id(), id);
}

#[tokio::test]
async fn post_reports_dropped_keys() {
    let app = TestApp::new();

    let res = app
        .post_json("/token", Some(ADMIN_TOKEN), &json!({ "email": "bar", "color": "red" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(
        res.body["messages"],
        json!(["Found non recognizable keys, they will not be considered: color"])
    );
}

#[tokio::test]
async fn post_with_id_is_rejected() {
    let app = TestApp::new();

    let res = app
        .post_json("/token/token", Some(ADMIN_TOKEN), &json!({ "admin": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
}

#[tokio::test]
async fn get_one_missing_is_not_found() {
    let app = TestApp::new();

    let res = app
        .get(&format!("/token/{}", ObjectId::new().to_hex()), Some(ADMIN_TOKEN))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["code"], 404);
}

#[tokio::test]
async fn put_requires_valid_existing_id() {
    let app = TestApp::new();

    let res = app.put_json("/token", None, &json!({ "email": "foo" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.put_json("/token", Some(ADMIN_TOKEN), &json!({ "admin": 1 })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .put_json("/token/token", Some(ADMIN_TOKEN), &json!({ "admin": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .put_json(
            &format!("/token/{}", ObjectId::new().to_hex()),
            Some(ADMIN_TOKEN),
            &json!({ "admin": 1 }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app
        .call(Method::PUT, "/token/token", Some(ADMIN_TOKEN), Some("text/plain"), "")
        .await;
    assert_eq!(res.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let res = app
        .call(Method::PUT, "/token/token", Some(ADMIN_TOKEN), Some("application/json"), "")
        .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn put_updates_token() {
    let app = TestApp::new();
    let id = create_token(&app).await;
    let uri = format!("/token/{}", id);

    let res = app
        .put_json(&uri, Some(ADMIN_TOKEN), &json!({ "foo": "foo", "bar": "bar" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.put_json(&uri, Some(ADMIN_TOKEN), &json!({ "admin": "bar" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.put_json(&uri, Some(ADMIN_TOKEN), &json!({ "ip_restricted": 1 })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .put_json(
            &uri,
            Some(ADMIN_TOKEN),
            &json!({ "email": "foo", "ip_restricted": 1, "ip_address": "127.0.0.1" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);

    let res = app.get(&uri, Some(ADMIN_TOKEN)).await;
    let token = &res.body["result"][0];
    assert_eq!(token["email"], "foo");
    assert_eq!(token["ip_address"], json!(["127.0.0.1"]));
    assert_eq!(token["properties"]["ip_restricted"], true);
    assert_eq!(token["properties"]["get"], true);
}

#[tokio::test]
async fn put_accepts_short_ipv4_address() {
    let app = TestApp::new();
    let uri = format!("/token/{}", create_token(&app).await);

    let res = app
        .put_json(
            &uri,
            Some(ADMIN_TOKEN),
            &json!({ "email": "foo", "ip_restricted": 1, "ip_address": "127" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.get(&uri, Some(ADMIN_TOKEN)).await;
    assert_eq!(res.body["result"][0]["ip_address"], json!(["0.0.0.127"]));
}

#[tokio::test]
async fn delete_token() {
    let app = TestApp::new();

    let res = app.delete("/token/token", None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete("/token/token", Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.delete("/token", Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let missing = format!("/token/{}", ObjectId::new().to_hex());
    let res = app.delete(&missing, Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);

    let id = create_token(&app).await;
    let uri = format!("/token/{}", id);

    let res = app.delete(&uri, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    let oid = ObjectId::parse_str(&id).unwrap();
    assert!(app
        .store
        .find_one("api-token", doc! { "_id": oid })
        .await
        .unwrap()
        .is_some());

    let res = app.delete(&uri, Some(ADMIN_TOKEN)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.get(&uri, Some(ADMIN_TOKEN)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejected_delete_leaves_stored_token() {
    let app = TestApp::with_stored_tokens();

    let res = app
        .post_json("/token", Some(MASTER_KEY), &json!({ "email": "bar", "get": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.first_id();
    let reader = res.body["result"][0]["token"].as_str().unwrap().to_string();
    let uri = format!("/token/{}", id);

    let res = app.delete(&uri, None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.delete(&uri, Some(reader.as_str())).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let oid = ObjectId::parse_str(&id).unwrap();
    let stored = app
        .store
        .find_one("api-token", doc! { "_id": oid })
        .await
        .unwrap();
    assert!(stored.is_some());
    assert_eq!(app.get(&uri, Some(MASTER_KEY)).await.status, StatusCode::OK);
}

#[tokio::test]
async fn datastore_failure_is_reported() {
    let store = Arc::new(FailingStore::default());
    let app = TestApp::with_store(store);

    let res = app
        .delete(&format!("/token/{}", ObjectId::new().to_hex()), Some(ADMIN_TOKEN))
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
    assert_eq!(res.body["code"], 500);

    let res = app
        .post_json("/token", Some(ADMIN_TOKEN), &json!({ "email": "bar" }))
        .await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unlisted_verb_is_not_implemented() {
    let app = TestApp::new();

    let res = app
        .call(Method::PATCH, "/token", Some(ADMIN_TOKEN), None, "")
        .await;
    assert_eq!(res.status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(res.content_type(), JSON_CONTENT_TYPE);
}

#[tokio::test]
async fn stored_tokens_are_validated() {
    let app = TestApp::with_stored_tokens();

    let res = app
        .post_json("/token", Some(MASTER_KEY), &json!({ "email": "reader", "get": 1 }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let value = res.body["result"][0]["token"].as_str().unwrap().to_string();

    let res = app
        .post_json(
            "/token",
            Some(MASTER_KEY),
            &json!({ "email": "old", "admin": 1, "expires_on": "2014-07-01" }),
        )
        .await;
    let expired = res.body["result"][0]["token"].as_str().unwrap().to_string();

    // read-only tokens pass authentication but lack admin rights here
    assert_eq!(app.get("/token", Some(&value)).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get("/test/case", Some(&value)).await.status, StatusCode::OK);
    assert_eq!(
        app.delete(&format!("/test/case/{}", ObjectId::new().to_hex()), Some(&value))
            .await
            .status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(app.get("/test/case", Some(&expired)).await.status, StatusCode::FORBIDDEN);
}
