//! Resource kinds, locators and the path table of the BadgeKit API.
//!
//! # Design
//! Every URL the client produces comes from `Locator::item_segments` or
//! `Locator::collection_segments`. The shape of a path is driven entirely by
//! the `ResourceKind` tables below, so adding a kind means adding one row to
//! each table rather than touching call sites.
//!
//! Components are always emitted in canonical order (system, issuer,
//! program, badge, instance, application, evidence, comment, code), no
//! matter in which order the locator was built.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// A kind of object exposed by the BadgeKit API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    System,
    Issuer,
    Program,
    Badge,
    /// A badge instance, i.e. a badge awarded to an email address.
    Instance,
    Application,
    Evidence,
    Comment,
    Code,
}

use ResourceKind::*;

impl ResourceKind {
    /// All kinds in canonical path order.
    pub const ALL: [ResourceKind; 9] = [
        System,
        Issuer,
        Program,
        Badge,
        Instance,
        Application,
        Evidence,
        Comment,
        Code,
    ];

    /// Singular name, as used in error messages and `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            System => "system",
            Issuer => "issuer",
            Program => "program",
            Badge => "badge",
            Instance => "instance",
            Application => "application",
            Evidence => "evidence",
            Comment => "comment",
            Code => "code",
        }
    }

    /// URL path segment naming the collection of this kind.
    pub fn segment(self) -> &'static str {
        match self {
            System => "systems",
            Issuer => "issuers",
            Program => "programs",
            Badge => "badges",
            Instance => "instances",
            Application => "applications",
            Evidence => "evidence",
            Comment => "comments",
            Code => "codes",
        }
    }

    /// Kinds that may appear above this one in a path, in canonical order.
    pub fn allowed_ancestors(self) -> &'static [ResourceKind] {
        match self {
            System => &[],
            Issuer => &[System],
            Program => &[System, Issuer],
            Badge => &[System, Issuer, Program],
            Instance | Application | Code => &[System, Issuer, Program, Badge],
            Evidence | Comment => &[System, Issuer, Program, Badge, Application],
        }
    }

    /// Kinds that must appear above this one in a path.
    pub fn required_ancestors(self) -> &'static [ResourceKind] {
        match self {
            System => &[],
            Issuer | Badge => &[System],
            Program => &[System, Issuer],
            Instance | Application | Code => &[System, Badge],
            Evidence | Comment => &[System, Badge, Application],
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = ApiError;

    /// Accepts the singular name or the collection segment, e.g. `badge`
    /// or `badges`. `badge_instance` is accepted as an alias of `instance`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "badge_instance" || s == "badge-instance" {
            return Ok(Instance);
        }
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s || kind.segment() == s)
            .ok_or_else(|| ApiError::Usage(format!("unknown resource kind `{s}`")))
    }
}

/// Identifies a resource or a collection scope by its path components.
///
/// ```
/// use badgekit_core::{Locator, ResourceKind};
///
/// let badge = Locator::new().system("sys1").issuer("iss1").badge("test-badge");
/// assert_eq!(
///     badge.item_segments(ResourceKind::Badge).unwrap(),
///     ["systems", "sys1", "issuers", "iss1", "badges", "test-badge"],
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locator {
    slots: [Option<String>; 9],
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the component for `kind`, replacing any previous value.
    pub fn with(mut self, kind: ResourceKind, value: impl Into<String>) -> Self {
        self.slots[kind.index()] = Some(value.into());
        self
    }

    pub fn system(self, slug: impl Into<String>) -> Self {
        self.with(System, slug)
    }

    pub fn issuer(self, slug: impl Into<String>) -> Self {
        self.with(Issuer, slug)
    }

    pub fn program(self, slug: impl Into<String>) -> Self {
        self.with(Program, slug)
    }

    pub fn badge(self, slug: impl Into<String>) -> Self {
        self.with(Badge, slug)
    }

    /// Badge instances are keyed by the recipient's email address.
    pub fn instance(self, email: impl Into<String>) -> Self {
        self.with(Instance, email)
    }

    pub fn application(self, slug: impl Into<String>) -> Self {
        self.with(Application, slug)
    }

    pub fn evidence(self, slug: impl Into<String>) -> Self {
        self.with(Evidence, slug)
    }

    pub fn comment(self, id: impl Into<String>) -> Self {
        self.with(Comment, id)
    }

    pub fn code(self, code: impl Into<String>) -> Self {
        self.with(Code, code)
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&str> {
        self.slots[kind.index()].as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Fills the allowed ancestor slots of `kind` that are unset here with
    /// the values from `defaults`. Other slots of `defaults` are ignored, so
    /// a default system never leaks into a request for systems themselves.
    pub fn with_defaults(&self, kind: ResourceKind, defaults: &Locator) -> Locator {
        let mut merged = self.clone();
        for &ancestor in kind.allowed_ancestors() {
            let slot = &mut merged.slots[ancestor.index()];
            if slot.is_none() {
                slot.clone_from(&defaults.slots[ancestor.index()]);
            }
        }
        merged
    }

    /// Path segments addressing a single resource of `kind`.
    pub fn item_segments(&self, kind: ResourceKind) -> Result<Vec<&str>, ApiError> {
        let key = self
            .get(kind)
            .ok_or_else(|| ApiError::Usage(format!("missing {kind} identifier")))?;
        let mut segments = self.scope_segments(kind, true)?;
        segments.push(kind.segment());
        segments.push(key);
        Ok(segments)
    }

    /// Path segments addressing the collection of `kind` in this scope.
    pub fn collection_segments(&self, kind: ResourceKind) -> Result<Vec<&str>, ApiError> {
        let mut segments = self.scope_segments(kind, false)?;
        segments.push(kind.segment());
        Ok(segments)
    }

    fn scope_segments(&self, kind: ResourceKind, with_key: bool) -> Result<Vec<&str>, ApiError> {
        let allowed = kind.allowed_ancestors();
        for other in ResourceKind::ALL {
            let Some(value) = self.get(other) else {
                continue;
            };
            if value.is_empty() {
                return Err(ApiError::Usage(format!("empty {other} identifier")));
            }
            if value == "." || value == ".." {
                return Err(ApiError::Usage(format!("invalid {other} identifier `{value}`")));
            }
            let permitted = allowed.contains(&other) || (with_key && other == kind);
            if !permitted {
                return Err(ApiError::Usage(format!(
                    "{other} identifier does not belong in {kind} {}",
                    if with_key { "paths" } else { "collection paths" }
                )));
            }
        }

        for &required in kind.required_ancestors() {
            if self.get(required).is_none() {
                return Err(ApiError::Usage(format!(
                    "missing {required} identifier for {kind}"
                )));
            }
        }

        let mut segments = Vec::with_capacity(allowed.len() * 2 + 2);
        for &ancestor in allowed {
            let Some(value) = self.get(ancestor) else {
                continue;
            };
            if let Some(missing) = ancestor
                .required_ancestors()
                .iter()
                .find(|parent| self.get(**parent).is_none())
            {
                return Err(ApiError::Usage(format!(
                    "missing {missing} identifier for {ancestor} `{value}`"
                )));
            }
            segments.push(ancestor.segment());
            segments.push(value);
        }
        Ok(segments)
    }
}
