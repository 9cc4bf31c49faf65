//! Blocking client for the BadgeKit badge-issuance API.
//!
//! # Overview
//! Translates ping, get, list and create calls on BadgeKit resources
//! (systems, issuers, programs, badges, badge instances, applications,
//! evidence, comments and claim codes) into HTTP requests, and HTTP
//! responses back into JSON objects or typed errors.
//!
//! # Design
//! - `BadgeKitClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network (host-does-IO).
//! - `BadgeKitApi` runs each operation as exactly one round trip through a
//!   `Transport`; `UreqTransport` is the default.
//! - All URL shapes come from the `ResourceKind` tables in `resource`, and
//!   incomplete locators fail with `ApiError::Usage` before any I/O.
//! - Requests are signed with an HS256 JWT when credentials are configured.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resource;
pub mod transport;
pub mod types;
pub mod version;

pub use api::BadgeKitApi;
pub use auth::Credentials;
pub use client::BadgeKitClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use resource::{Locator, ResourceKind};
pub use transport::{Transport, UreqTransport};
pub use types::{ListFilter, Resource, ServerStatus};
