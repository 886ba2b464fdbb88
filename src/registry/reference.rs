//! Resource references
//!
//! A registry resource is named in two notations that must resolve to the
//! same thing:
//!
//! - canonical ref (`$id`): `https://ns.adobe.com/mytenant/schemas/7a5416d13572`
//! - short id (`meta:altId`): `_mytenant.schemas.7a5416d13572`
//!
//! Tenant resources always have three segments with a kind alias in the
//! middle. Global resources are irregular and resolved through the
//! [`GlobalTable`](super::GlobalTable).

use super::globals::{global_table, GlobalTable};
use super::{Container, ResourceKind};
use crate::error::{Result, XdmError};
use std::fmt;
use std::str::FromStr;

const NAMESPACE_HOST: &str = "ns.adobe.com";

/// Parsed pointer to one registry resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    container: Container,
    kind: ResourceKind,
    tenant: Option<String>,
    uuid: String,
    short_id: String,
    canonical_ref: String,
}

impl Reference {
    /// Parse an identifier using the process-wide global table
    pub fn parse(identifier: &str) -> Result<Self> {
        Self::parse_with(identifier, global_table())
    }

    /// Parse an identifier against an explicit global table
    pub fn parse_with(identifier: &str, globals: &GlobalTable) -> Result<Self> {
        let unparseable = || XdmError::UnparseableReference(identifier.to_string());

        let segments = split_identifier(identifier).ok_or_else(unparseable)?;
        let key = segments.join(".");

        if let Some(entry) = globals.get(&key) {
            return Ok(Self {
                container: Container::Global,
                kind: entry.kind,
                tenant: None,
                uuid: key.clone(),
                short_id: format!("_{}", key),
                canonical_ref: entry.canonical_ref.clone(),
            });
        }

        let [tenant, alias, uuid] = segments.as_slice() else {
            return Err(unparseable());
        };
        let kind = ResourceKind::from_alias(alias).ok_or_else(unparseable)?;

        Ok(Self {
            container: Container::Tenant,
            kind,
            tenant: Some(tenant.to_string()),
            uuid: uuid.to_string(),
            short_id: format!("_{}", key),
            canonical_ref: format!("https://{}/{}", NAMESPACE_HOST, segments.join("/")),
        })
    }

    /// Global resource listed by the server but absent from the lookup table.
    ///
    /// Only used for records read from the global container, where the
    /// container and kind are known from the request that returned them.
    pub(crate) fn unlisted_global(kind: ResourceKind, canonical_ref: &str) -> Result<Self> {
        let segments = split_identifier(canonical_ref)
            .ok_or_else(|| XdmError::UnparseableReference(canonical_ref.to_string()))?;
        let key = segments.join(".");
        Ok(Self {
            container: Container::Global,
            kind,
            tenant: None,
            uuid: key.clone(),
            short_id: format!("_{}", key),
            canonical_ref: canonical_ref.to_string(),
        })
    }

    /// Reference to a known global resource, bypassing the lookup table
    pub(crate) fn global(kind: ResourceKind, key: &str) -> Self {
        Self {
            container: Container::Global,
            kind,
            tenant: None,
            uuid: key.to_string(),
            short_id: format!("_{}", key),
            canonical_ref: format!("https://{}/{}", NAMESPACE_HOST, key.replace('.', "/")),
        }
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Owning organization namespace, only set for tenant resources
    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// `meta:altId` form, e.g. `_mytenant.schemas.7a5416d13572`
    pub fn short_id(&self) -> &str {
        &self.short_id
    }

    /// `$id` form, e.g. `https://ns.adobe.com/mytenant/schemas/7a5416d13572`
    pub fn canonical_ref(&self) -> &str {
        &self.canonical_ref
    }
}

/// Split either notation into its path segments; `None` when neither applies
fn split_identifier(identifier: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = if let Some(rest) = identifier
        .strip_prefix("https://")
        .or_else(|| identifier.strip_prefix("http://"))
    {
        let mut split: Vec<&str> = rest.split('/').collect();
        if split.first() == Some(&NAMESPACE_HOST) {
            split.remove(0);
        }
        split
    } else if let Some(rest) = identifier.strip_prefix('_') {
        rest.split('.').collect()
    } else {
        return None;
    };

    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

impl FromStr for Reference {
    type Err = XdmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_ref)
    }
}
