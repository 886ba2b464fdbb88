//! Schema registry resource model
//!
//! Identifiers, typed resources, and collections for the XDM schema
//! registry. Every identifier string that enters this module is decoded by
//! [`reference`]; relationships between resources are materialized from the
//! reference lists embedded in fetched documents.
//!
//! # Architecture
//!
//! - [`globals`] - Snapshot of platform-defined resources that do not follow the tenant pattern
//! - [`reference`] - Parses short ids and canonical refs into a [`Reference`]
//! - [`paths`] - REST paths and content-negotiation headers
//! - [`resource`] - Lazily-populated document wrapper shared by every kind
//! - [`variants`] - One type per [`ResourceKind`] plus the [`AnyResource`] union
//! - [`collection`] - get / find / find_all / create per kind and container
//!
//! # Example
//!
//! ```ignore
//! use xdm_registry::registry::{Collection, Schema, TypedResource};
//!
//! async fn rename(schemas: &Collection<Schema>) -> xdm_registry::Result<()> {
//!     let mut schema = schemas.get("_mytenant.schemas.7a5416d13572")?;
//!     schema.set_title("Loyalty Members").await?;
//!     let behavior = schema.behavior().await?;
//!     println!("{} extends {}", schema, behavior);
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod globals;
pub mod paths;
pub mod reference;
pub mod resource;
pub mod variants;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use collection::{Collection, PropertyFilter};
pub use globals::{global_table, install_global_table, GlobalTable};
pub use paths::{accept_header, resource_path, Fidelity};
pub use reference::Reference;
pub use resource::Resource;
pub use variants::{AnyResource, Behavior, Class, DataType, FieldGroup, Schema, TypedResource};

/// The five kinds of registry resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    DataType,
    FieldGroup,
    Schema,
    Class,
    Behavior,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::DataType,
        ResourceKind::FieldGroup,
        ResourceKind::Schema,
        ResourceKind::Class,
        ResourceKind::Behavior,
    ];

    /// Path segment under the registry container, e.g. `fieldgroups`
    pub fn path_segment(self) -> &'static str {
        match self {
            ResourceKind::DataType => "datatypes",
            ResourceKind::FieldGroup => "fieldgroups",
            ResourceKind::Schema => "schemas",
            ResourceKind::Class => "classes",
            ResourceKind::Behavior => "behaviors",
        }
    }

    /// Resolve the kind alias found in the middle segment of an identifier.
    ///
    /// `mixins` is the legacy spelling of `fieldgroups`; behaviors live under `data`.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "datatypes" => Some(ResourceKind::DataType),
            "mixins" | "fieldgroups" => Some(ResourceKind::FieldGroup),
            "schemas" => Some(ResourceKind::Schema),
            "classes" => Some(ResourceKind::Class),
            "data" | "behaviors" => Some(ResourceKind::Behavior),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::DataType => "DataType",
            ResourceKind::FieldGroup => "FieldGroup",
            ResourceKind::Schema => "Schema",
            ResourceKind::Class => "Class",
            ResourceKind::Behavior => "Behavior",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a resource is stored: platform-defined or the caller's organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Global,
    Tenant,
}

impl Container {
    pub fn as_str(self) -> &'static str {
        match self {
            Container::Global => "global",
            Container::Tenant => "tenant",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
