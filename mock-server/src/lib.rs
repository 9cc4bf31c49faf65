//! In-memory emulation of the BadgeKit API routes used by the client.
//!
//! Paths alternate collection segments and keys, e.g.
//! `/systems/{slug}/issuers/{slug}/badges`. A path with an even number of
//! segments addresses a collection, an odd number addresses one item.
//! Keys are percent-decoded one segment at a time, so an encoded `/` stays
//! inside its key. Resources are stored per collection path in insertion
//! order.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const APP_NAME: &str = "BadgeKit API";
pub const API_VERSION: &str = "0.2.9";

const COLLECTIONS: [&str; 9] = [
    "systems",
    "issuers",
    "programs",
    "badges",
    "instances",
    "applications",
    "evidence",
    "comments",
    "codes",
];

/// Largest request body the signing check will buffer.
const MAX_BODY: usize = 1 << 20;

type Collection = Vec<Map<String, Value>>;

#[derive(Default)]
pub struct Store {
    /// Keyed by the decoded segments of the collection path.
    collections: HashMap<Vec<String>, Collection>,
    next_id: u64,
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    secret: Option<Arc<str>>,
}

/// Router without request signing.
pub fn app() -> Router {
    app_with_secret(None)
}

/// Router that rejects requests without a valid JWT when `secret` is set.
pub fn app_with_secret(secret: Option<&str>) -> Router {
    let state = AppState {
        store: Arc::default(),
        secret: secret.map(Arc::from),
    };
    Router::new()
        .route("/", get(root))
        .route("/{*path}", get(read).post(create))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_secret(listener: TcpListener, secret: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_secret(Some(secret))).await
}

/// BadgeKit's JSON error body.
fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let message = message.into();
    debug!(%status, code, %message, "rejecting request");
    (status, Json(json!({ "code": code, "message": message }))).into_response()
}

fn not_found(message: impl Into<String>) -> Response {
    error(StatusCode::NOT_FOUND, "ResourceNotFound", message)
}

async fn root() -> Json<Value> {
    Json(json!({ "app": APP_NAME, "version": API_VERSION, "status": "okay" }))
}

async fn read(State(state): State<AppState>, uri: Uri) -> Response {
    let segments = match split_path(uri.path()) {
        Ok(segments) => segments,
        Err(response) => return response,
    };
    let store = state.store.read().await;

    if segments.len() % 2 == 0 {
        if let Some(parent) = parent_path(&segments) {
            if find_item(&store, parent).is_none() {
                return not_found(format!("no resource at `{}`", display_path(parent)));
            }
        }
        let items = store
            .collections
            .get(&segments)
            .cloned()
            .unwrap_or_default();
        let segment = segments[segments.len() - 1].as_str();
        return Json(json!({ segment: items })).into_response();
    }

    match find_item(&store, &segments) {
        Some(item) => Json(Value::Object(item.clone())).into_response(),
        None => not_found(format!("no resource at `{}`", display_path(&segments))),
    }
}

async fn create(State(state): State<AppState>, uri: Uri, body: String) -> Response {
    let segments = match split_path(uri.path()) {
        Ok(segments) => segments,
        Err(response) => return response,
    };
    if segments.len() % 2 == 1 {
        return error(
            StatusCode::METHOD_NOT_ALLOWED,
            "MethodNotAllowed",
            "POST requires a collection path",
        );
    }

    let mut resource = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(resource)) => resource,
        _ => {
            return error(
                StatusCode::BAD_REQUEST,
                "ValidationError",
                "request body must be a JSON object",
            )
        }
    };

    let segment = segments[segments.len() - 1].as_str();
    let key_field = key_field(segment);
    if generates_key(segment) && !resource.contains_key(key_field) {
        resource.insert(key_field.to_string(), Value::String(Uuid::new_v4().to_string()));
    }

    let missing: Vec<&str> = required_fields(segment)
        .iter()
        .copied()
        .filter(|field| !is_present(resource.get(*field)))
        .collect();
    if !missing.is_empty() {
        let details: Vec<Value> = missing
            .iter()
            .map(|field| json!({ "field": field, "value": resource.get(*field) }))
            .collect();
        debug!(?missing, "validation failed");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": "ValidationError",
                "message": "Could not validate required fields",
                "details": details,
            })),
        )
            .into_response();
    }

    let Some(key) = resource.get(key_field).and_then(key_string) else {
        return error(
            StatusCode::BAD_REQUEST,
            "ValidationError",
            format!("`{key_field}` must be a string or number"),
        );
    };

    let mut store = state.store.write().await;
    if let Some(parent) = parent_path(&segments) {
        if find_item(&store, parent).is_none() {
            return not_found(format!("no resource at `{}`", display_path(parent)));
        }
    }

    let exists = store
        .collections
        .get(&segments)
        .is_some_and(|items| items.iter().any(|item| item_key(item, key_field) == Some(key.clone())));
    if exists {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "code": "ResourceConflict",
                "message": format!("{segment} with that `{key_field}` already exists"),
                "details": resource,
            })),
        )
            .into_response();
    }

    store.next_id += 1;
    let id = store.next_id;
    resource.entry("id").or_insert_with(|| json!(id));
    info!(path = %display_path(&segments), key = %key, "created resource");
    store
        .collections
        .entry(segments)
        .or_default()
        .push(resource.clone());

    (StatusCode::CREATED, Json(Value::Object(resource))).into_response()
}

/// Splits a raw request path, percent-decodes each segment and checks that
/// every collection segment is known.
fn split_path(raw: &str) -> Result<Vec<String>, Response> {
    let mut segments = Vec::new();
    for (index, segment) in raw.split('/').filter(|s| !s.is_empty()).enumerate() {
        let decoded = percent_decode_str(segment).decode_utf8().map_err(|_| {
            error(
                StatusCode::BAD_REQUEST,
                "InvalidPath",
                format!("segment `{segment}` is not valid UTF-8"),
            )
        })?;
        if index % 2 == 0 && !COLLECTIONS.contains(&&*decoded) {
            return Err(not_found(format!("unknown collection `{decoded}`")));
        }
        segments.push(decoded.into_owned());
    }
    Ok(segments)
}

/// Segments of the item that owns the collection at `segments`, if any.
fn parent_path(segments: &[String]) -> Option<&[String]> {
    (segments.len() > 1).then(|| &segments[..segments.len() - 1])
}

fn display_path(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

fn find_item<'a>(store: &'a Store, item_path: &[String]) -> Option<&'a Map<String, Value>> {
    let (key, collection_path) = item_path.split_last()?;
    let segment = collection_path.last()?;
    let key_field = key_field(segment);
    store
        .collections
        .get(collection_path)?
        .iter()
        .find(|item| item_key(item, key_field).as_deref() == Some(key.as_str()))
}

fn key_field(segment: &str) -> &'static str {
    match segment {
        "instances" => "email",
        "codes" => "code",
        _ => "slug",
    }
}

fn generates_key(segment: &str) -> bool {
    matches!(segment, "applications" | "evidence" | "comments")
}

fn required_fields(segment: &str) -> &'static [&'static str] {
    match segment {
        "systems" | "issuers" | "programs" | "badges" => &["slug", "name"],
        "instances" => &["email"],
        "codes" => &["code"],
        _ => &[],
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn item_key(item: &Map<String, Value>, key_field: &str) -> Option<String> {
    item.get(key_field).and_then(key_string)
}

// ---------------------------------------------------------------------------
// Request signing
// ---------------------------------------------------------------------------

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(secret) = state.secret.as_deref() else {
        return next.run(request).await;
    };

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY).await {
        Ok(body) => body,
        Err(e) => {
            return error(
                StatusCode::PAYLOAD_TOO_LARGE,
                "InvalidBody",
                format!("could not read body: {e}"),
            )
        }
    };

    let Some(authorization) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        return error(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "missing Authorization header",
        );
    };
    let claims = match verify_token(authorization, secret) {
        Ok(claims) => claims,
        Err(reason) => return error(StatusCode::UNAUTHORIZED, "InvalidToken", reason),
    };

    let path = parts
        .uri
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    if let Err(reason) = check_claims(&claims, parts.method.as_str(), path, &body, unix_now()) {
        return error(StatusCode::UNAUTHORIZED, "InvalidToken", reason);
    }

    next.run(Request::from_parts(parts, Body::from(body))).await
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Checks that verified claims cover this exact request and have not expired.
fn check_claims(
    claims: &Value,
    method: &str,
    path: &str,
    body: &[u8],
    now: u64,
) -> Result<(), String> {
    let Some(exp) = claims["exp"].as_u64() else {
        return Err("token has no expiry".to_string());
    };
    if exp < now {
        return Err("token expired".to_string());
    }
    if claims["method"] != method || claims["path"] != path {
        return Err("token does not match request".to_string());
    }
    if !body.is_empty() {
        let hash = format!("{:x}", Sha256::digest(body));
        if claims["body"]["alg"] != "sha256" || claims["body"]["hash"] != hash.as_str() {
            return Err("token does not match request body".to_string());
        }
    }
    Ok(())
}

/// Checks a `JWT token="..."` header value and returns its claims.
pub fn verify_token(header_value: &str, secret: &str) -> Result<Value, String> {
    let token = header_value
        .strip_prefix("JWT token=\"")
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or("malformed Authorization header")?;

    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err("token must have three parts".to_string());
    };

    let signature = BASE64URL
        .decode(signature)
        .map_err(|e| format!("bad signature encoding: {e}"))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|e| e.to_string())?;
    mac.update(format!("{header}.{payload}").as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| "invalid signature".to_string())?;

    let payload = BASE64URL
        .decode(payload)
        .map_err(|e| format!("bad payload encoding: {e}"))?;
    serde_json::from_slice(&payload).map_err(|e| format!("bad payload: {e}"))
}
