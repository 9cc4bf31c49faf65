use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::{self, Request, StatusCode};
use axum::Router;
use badgekit_mock::{app, app_with_secret};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

async fn seed_system(app: &Router) {
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/systems",
            r#"{"slug":"sys1","name":"System One"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

// --- ping ---

#[tokio::test]
async fn root_identifies_badgekit() {
    let resp = app().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["app"], "BadgeKit API");
    assert_eq!(body["status"], "okay");
    assert!(body["version"].is_string());
}

// --- list ---

#[tokio::test]
async fn list_systems_empty() {
    let resp = app().oneshot(get("/systems")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "systems": [] }));
}

#[tokio::test]
async fn list_under_missing_parent_is_not_found() {
    let resp = app().oneshot(get("/systems/nope/badges")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["code"], "ResourceNotFound");
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let resp = app().oneshot(get("/widgets")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- create ---

#[tokio::test]
async fn create_system_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/systems",
            r#"{"slug":"test-sys","name":"Test System FTW","url":"http://example.com/testz"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["slug"], "test-sys");
    assert_eq!(body["name"], "Test System FTW");
    assert_eq!(body["url"], "http://example.com/testz");
    assert!(body["id"].is_u64());
}

#[tokio::test]
async fn create_missing_fields_returns_validation_error() {
    let resp = app()
        .oneshot(json_request("POST", "/systems", r#"{"slug":"s"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "ValidationError");
    assert_eq!(body["details"][0]["field"], "name");
}

#[tokio::test]
async fn create_malformed_json_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/systems", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["code"], "ValidationError");
}

#[tokio::test]
async fn create_duplicate_returns_409() {
    let app = app();
    seed_system(&app).await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/systems",
            r#"{"slug":"sys1","name":"Again"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["code"], "ResourceConflict");
}

#[tokio::test]
async fn create_on_item_path_is_rejected() {
    let resp = app()
        .oneshot(json_request("POST", "/systems/s", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn applications_get_generated_slug() {
    let app = app();
    seed_system(&app).await;
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges",
            r#"{"slug":"b","name":"B"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges/b/applications",
            r#"{"learner":"me@example.org"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["slug"].as_str().map(str::len), Some(36));
}

// --- get ---

#[tokio::test]
async fn get_after_create() {
    let app = app();
    seed_system(&app).await;

    let resp = app.clone().oneshot(get("/systems/sys1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["slug"], "sys1");
    assert_eq!(body["name"], "System One");

    let resp = app.oneshot(get("/systems")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["systems"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_missing_is_not_found() {
    let resp = app().oneshot(get("/systems/ghost")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["code"], "ResourceNotFound");
    assert!(body["message"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn instances_are_keyed_by_email() {
    let app = app();
    seed_system(&app).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges",
            r#"{"slug":"b","name":"B"}"#,
        ))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges/b/instances",
            r#"{"email":"me@example.org"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(get("/systems/sys1/badges/b/instances/me@example.org"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], "me@example.org");
}

#[tokio::test]
async fn encoded_slash_stays_inside_key() {
    let app = app();
    seed_system(&app).await;
    app.clone()
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges",
            r#"{"slug":"b","name":"B"}"#,
        ))
        .await
        .unwrap();
    let resp = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/systems/sys1/badges/b/instances",
            r#"{"email":"a/b@example.org"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app
        .oneshot(get("/systems/sys1/badges/b/instances/a%2Fb@example.org"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["email"], "a/b@example.org");
}

// --- signing ---

#[tokio::test]
async fn secret_requires_authorization() {
    let resp = app_with_secret(Some("s3cr3t")).oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_bytes(resp).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "Unauthorized");
}

#[tokio::test]
async fn secret_rejects_bad_token() {
    let req = Request::builder()
        .uri("/")
        .header(http::header::AUTHORIZATION, "JWT token=\"a.b.c\"")
        .body(String::new())
        .unwrap();
    let resp = app_with_secret(Some("s3cr3t")).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["code"], "InvalidToken");
}

fn now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn token(claims: Value, secret: &str) -> String {
    let header = BASE64URL.encode(br#"{"typ":"JWT","alg":"HS256"}"#);
    let payload = BASE64URL.encode(serde_json::to_vec(&claims).unwrap());
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{header}.{payload}").as_bytes());
    let signature = BASE64URL.encode(mac.finalize().into_bytes());
    format!("JWT token=\"{header}.{payload}.{signature}\"")
}

fn signed_post(path: &str, body: &str, claims: Value) -> Request<String> {
    let mut req = json_request("POST", path, body);
    req.headers_mut().insert(
        http::header::AUTHORIZATION,
        token(claims, "s3cr3t").parse().unwrap(),
    );
    req
}

fn body_claim(body: &str) -> Value {
    json!({ "alg": "sha256", "hash": format!("{:x}", Sha256::digest(body.as_bytes())) })
}

#[tokio::test]
async fn secret_accepts_matching_token() {
    let body = r#"{"slug":"s","name":"Signed"}"#;
    let claims = json!({
        "key": "master",
        "exp": now() + 30,
        "method": "POST",
        "path": "/systems",
        "body": body_claim(body),
    });
    let resp = app_with_secret(Some("s3cr3t"))
        .oneshot(signed_post("/systems", body, claims))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["slug"], "s");
}

#[tokio::test]
async fn secret_rejects_expired_token() {
    let body = r#"{"slug":"s","name":"Signed"}"#;
    let claims = json!({
        "key": "master",
        "exp": now() - 60,
        "method": "POST",
        "path": "/systems",
        "body": body_claim(body),
    });
    let resp = app_with_secret(Some("s3cr3t"))
        .oneshot(signed_post("/systems", body, claims))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "token expired");
}

#[tokio::test]
async fn secret_rejects_token_for_other_body() {
    let claims = json!({
        "key": "master",
        "exp": now() + 30,
        "method": "POST",
        "path": "/systems",
        "body": body_claim(r#"{"slug":"other","name":"Other"}"#),
    });
    let resp = app_with_secret(Some("s3cr3t"))
        .oneshot(signed_post("/systems", r#"{"slug":"s","name":"Signed"}"#, claims))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["code"], "InvalidToken");
}
