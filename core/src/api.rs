//! One method per BadgeKit operation, each a single round trip.
//!
//! # Design
//! `BadgeKitApi` pairs the stateless `BadgeKitClient` with a `Transport`.
//! Every method builds a request, hands it to the transport exactly once
//! and parses the response. There is no retry and no state shared between
//! calls, so one `BadgeKitApi` can serve many threads at once.

use semver::Version;
use tracing::debug;

use crate::client::BadgeKitClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::resource::{Locator, ResourceKind};
use crate::transport::{Transport, UreqTransport};
use crate::types::{ListFilter, Resource, ServerStatus};
use crate::version::parse_version;

/// Blocking BadgeKit API client.
///
/// ```no_run
/// use badgekit_core::{BadgeKitApi, ClientConfig, Locator, ResourceKind};
///
/// let api = BadgeKitApi::connect(ClientConfig::new("http://localhost:8080").with_secret("s3cr3t"))?;
/// api.ping()?;
/// let badges = api.list(ResourceKind::Badge, &Locator::new().system("badgekit"))?;
/// println!("{} badges", badges.len());
/// # Ok::<(), badgekit_core::ApiError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BadgeKitApi<T = UreqTransport> {
    client: BadgeKitClient,
    transport: T,
}

impl BadgeKitApi<UreqTransport> {
    /// Builds a client over a `ureq` transport. No request is sent.
    pub fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let mut client = BadgeKitClient::new(&config.base_url)?.with_defaults(config.defaults);
        if let Some(credentials) = config.credentials {
            client = client.with_credentials(credentials);
        }
        Ok(Self::with_transport(client, UreqTransport::new(config.timeout)))
    }
}

impl<T: Transport> BadgeKitApi<T> {
    pub fn with_transport(client: BadgeKitClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &BadgeKitClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Checks that the server answers on its health path.
    pub fn ping(&self) -> Result<ServerStatus, ApiError> {
        let response = self.send(self.client.build_ping()?)?;
        self.client.parse_ping(response)
    }

    pub fn get(&self, kind: ResourceKind, locator: &Locator) -> Result<Resource, ApiError> {
        let response = self.send(self.client.build_get(kind, locator)?)?;
        self.client.parse_get(response)
    }

    /// Lists the resources of `kind` within `scope`, e.g. all badges of a
    /// system. An empty collection is an empty vector.
    pub fn list(&self, kind: ResourceKind, scope: &Locator) -> Result<Vec<Resource>, ApiError> {
        self.list_filtered(kind, scope, &ListFilter::default())
    }

    pub fn list_filtered(
        &self,
        kind: ResourceKind,
        scope: &Locator,
        filter: &ListFilter,
    ) -> Result<Vec<Resource>, ApiError> {
        let response = self.send(self.client.build_list(kind, scope, filter)?)?;
        self.client.parse_list(kind, response)
    }

    /// Creates a resource of `kind` within `scope` and returns the server's
    /// representation of it.
    pub fn create(
        &self,
        kind: ResourceKind,
        scope: &Locator,
        payload: &Resource,
    ) -> Result<Resource, ApiError> {
        let response = self.send(self.client.build_create(kind, scope, payload)?)?;
        self.client.parse_create(response)
    }

    /// The version the server reports on its health path.
    pub fn server_version(&self) -> Result<Version, ApiError> {
        let status = self.ping()?;
        let raw = status
            .version
            .ok_or_else(|| ApiError::Decode("server did not report a version".to_string()))?;
        parse_version(&raw)
    }

    /// Fails early when the server is older than `required`, e.g. `"0.2"`.
    /// Returns the server's version otherwise.
    pub fn require_server_version(&self, required: &str) -> Result<Version, ApiError> {
        let required = parse_version(required)
            .map_err(|_| ApiError::Usage(format!("invalid required version `{required}`")))?;
        let actual = self.server_version()?;
        if actual < required {
            return Err(ApiError::UnsupportedServer { required, actual });
        }
        Ok(actual)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending BadgeKit request");
        let response = self.transport.execute(&request)?;
        debug!(status = response.status, url = %request.url, "received BadgeKit response");
        Ok(response)
    }
}
