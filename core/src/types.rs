//! Value types exchanged with the BadgeKit API.
//!
//! # Design
//! BadgeKit objects differ per kind and grow fields between server releases,
//! so resources are kept as plain JSON objects instead of one struct per
//! kind. Callers read the fields they care about.

use serde::{Deserialize, Serialize};

/// A system, issuer, badge, instance, ... as a JSON object.
pub type Resource = serde_json::Map<String, serde_json::Value>;

/// Body of `GET /`, the server's health and identity report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Any other fields the server reports.
    #[serde(flatten)]
    pub extra: Resource,
}

impl ServerStatus {
    pub const BADGEKIT_APP: &'static str = "BadgeKit API";

    /// Whether the server identifies itself as the BadgeKit API.
    pub fn is_badgekit(&self) -> bool {
        self.app.as_deref() == Some(Self::BADGEKIT_APP)
    }
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to archived (`true`) or live (`false`) resources.
    pub archived: Option<bool>,
}

impl ListFilter {
    pub fn archived(archived: bool) -> Self {
        Self {
            archived: Some(archived),
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = Vec::new();
        if let Some(archived) = self.archived {
            pairs.push(("archived", if archived { "true" } else { "false" }));
        }
        pairs
    }
}
