//! Stateless HTTP request builder and response parser for the BadgeKit API.
//!
//! # Design
//! `BadgeKitClient` holds only the base URL, optional signing credentials and
//! default locator components, and carries no mutable state between calls.
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! `BadgeKitApi` runs the round trip in between; callers with their own
//! HTTP stack can do the same.
//!
//! A `build_*` method that fails never reaches the network: locator
//! problems surface as `ApiError::Usage` before any request exists.

use std::time::SystemTime;

use serde_json::Value;
use tracing::warn;
use url::{Position, Url};

use crate::auth::Credentials;
use crate::error::{ApiError, ErrorBody};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::resource::{Locator, ResourceKind};
use crate::types::{ListFilter, Resource, ServerStatus};

const JSON: &str = "application/json";

/// The operation a response belongs to. Status classification depends on it:
/// only `create` reports validation failures and conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Ping,
    Get,
    List,
    Create,
}

/// Synchronous, stateless client for the BadgeKit API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct BadgeKitClient {
    base_url: Url,
    credentials: Option<Credentials>,
    defaults: Locator,
}

impl BadgeKitClient {
    /// Parses `base_url`. A path prefix such as `http://host/api/` is kept
    /// and every resource path is appended below it.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        Ok(Self {
            base_url,
            credentials: None,
            defaults: Locator::new(),
        })
    }

    /// Signs every request with `credentials`.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Components used when a call's locator leaves an ancestor slot empty,
    /// e.g. the one badge system an application works with.
    pub fn with_defaults(mut self, defaults: Locator) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn defaults(&self) -> &Locator {
        &self.defaults
    }

    // ------------------------------------------------------------------
    // Request builders
    // ------------------------------------------------------------------

    /// `GET` on the base path, which BadgeKit answers with its name and
    /// version.
    pub fn build_ping(&self) -> Result<HttpRequest, ApiError> {
        let url = self.url_for(&[], &[])?;
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_get(&self, kind: ResourceKind, locator: &Locator) -> Result<HttpRequest, ApiError> {
        let locator = locator.with_defaults(kind, &self.defaults);
        let url = self.url_for(&locator.item_segments(kind)?, &[])?;
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_list(
        &self,
        kind: ResourceKind,
        scope: &Locator,
        filter: &ListFilter,
    ) -> Result<HttpRequest, ApiError> {
        let scope = scope.with_defaults(kind, &self.defaults);
        let url = self.url_for(&scope.collection_segments(kind)?, &filter.query_pairs())?;
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_create(
        &self,
        kind: ResourceKind,
        scope: &Locator,
        payload: &Resource,
    ) -> Result<HttpRequest, ApiError> {
        let scope = scope.with_defaults(kind, &self.defaults);
        let url = self.url_for(&scope.collection_segments(kind)?, &[])?;
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.request(HttpMethod::Post, url, Some(body))
    }

    // ------------------------------------------------------------------
    // Response parsers
    // ------------------------------------------------------------------

    pub fn parse_ping(&self, response: HttpResponse) -> Result<ServerStatus, ApiError> {
        check_status(&response, Operation::Ping)?;
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Resource, ApiError> {
        check_status(&response, Operation::Get)?;
        decode_object(&response.body)
    }

    /// Accepts a bare JSON array or BadgeKit's `{"badges": [...]}` envelope
    /// keyed by the collection segment of `kind`.
    pub fn parse_list(
        &self,
        kind: ResourceKind,
        response: HttpResponse,
    ) -> Result<Vec<Resource>, ApiError> {
        check_status(&response, Operation::List)?;
        let value: Value =
            serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut envelope) => match envelope.remove(kind.segment()) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) => Vec::new(),
                _ => {
                    return Err(ApiError::Decode(format!(
                        "expected a `{}` array in list response",
                        kind.segment()
                    )))
                }
            },
            other => {
                return Err(ApiError::Decode(format!(
                    "expected an array or object, got {}",
                    json_type(&other)
                )))
            }
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(resource) => Ok(resource),
                other => Err(ApiError::Decode(format!(
                    "expected {} objects, got {}",
                    kind.name(),
                    json_type(&other)
                ))),
            })
            .collect()
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Resource, ApiError> {
        check_status(&response, Operation::Create)?;
        decode_object(&response.body)
    }

    fn url_for(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if !segments.is_empty() {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?;
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn request(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![("accept".to_string(), JSON.to_string())];
        if body.is_some() {
            headers.push(("content-type".to_string(), JSON.to_string()));
        }
        if let Some(credentials) = &self.credentials {
            let path = &url[Position::BeforePath..Position::AfterQuery];
            let token =
                credentials.authorization(method, path, body.as_deref(), SystemTime::now())?;
            headers.push(("authorization".to_string(), token));
        }
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, operation: Operation) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }

    let body = ErrorBody::parse(&response.body);
    let message = body
        .message
        .clone()
        .unwrap_or_else(|| response.text().trim().to_string());
    let code = body.code.as_deref();
    let is_create = operation == Operation::Create;
    let status = response.status;

    let err = match (status, code) {
        (404, _) | (_, Some("ResourceNotFound")) if operation != Operation::Ping => {
            ApiError::NotFound { status, message }
        }
        (409, _) | (_, Some("ResourceConflict")) if is_create => {
            ApiError::Conflict { status, message }
        }
        (400 | 422, _) | (_, Some("ValidationError")) if is_create => ApiError::Validation {
            status,
            message,
            fields: body.fields(),
        },
        _ => ApiError::Server { status, message },
    };
    warn!(status, code, error = %err, "BadgeKit request failed");
    Err(err)
}

fn decode_object(body: &[u8]) -> Result<Resource, ApiError> {
    match serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))? {
        Value::Object(resource) => Ok(resource),
        other => Err(ApiError::Decode(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
