//! Typed resources
//!
//! One type per [`ResourceKind`], each a thin wrapper over [`Resource`]
//! whose construction checks the kind, plus the [`AnyResource`] union used
//! wherever a value may be of any kind (multi-kind collections, `meta:extends`).

use super::reference::Reference;
use super::resource::Resource;
use super::ResourceKind;
use crate::error::{Result, XdmError};
use crate::platform::client::XdmClient;
use serde_json::{json, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A resource type bound to a fixed set of kinds
pub trait TypedResource: Sized + Deref<Target = Resource> + DerefMut {
    /// Kinds a value of this type may hold
    const KINDS: &'static [ResourceKind];

    /// Wrap a resource, failing with `KindMismatch` when its kind is not in [`Self::KINDS`]
    fn from_resource(resource: Resource) -> Result<Self>;

    fn into_resource(self) -> Resource;

    /// Deferred resource for a parsed reference (no request is made)
    fn from_reference(client: XdmClient, reference: Reference) -> Result<Self> {
        Self::from_resource(Resource::from_reference(client, reference))
    }

    /// Resource around a server payload
    fn from_document(client: XdmClient, document: Value) -> Result<Self> {
        Self::from_resource(Resource::from_document(client, document)?)
    }
}

fn kind_mismatch(resource: &Resource, expected: &str) -> XdmError {
    XdmError::KindMismatch {
        reference: resource.canonical_ref().to_string(),
        expected: expected.to_string(),
        found: resource.kind(),
    }
}

macro_rules! typed_resource {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(Resource);

        impl TypedResource for $name {
            const KINDS: &'static [ResourceKind] = &[ResourceKind::$name];

            fn from_resource(resource: Resource) -> Result<Self> {
                if resource.kind() != ResourceKind::$name {
                    return Err(kind_mismatch(&resource, stringify!($name)));
                }
                Ok(Self(resource))
            }

            fn into_resource(self) -> Resource {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Resource;

            fn deref(&self) -> &Resource {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Resource {
                &mut self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$name> for AnyResource {
            fn from(value: $name) -> Self {
                AnyResource::$name(value)
            }
        }
    };
}

typed_resource!(
    /// Reusable field structure, referenced from schemas and field groups
    DataType
);
typed_resource!(
    /// Set of fields a schema or class can include
    FieldGroup
);
typed_resource!(
    /// A class plus field groups; what datasets are built from
    Schema
);
typed_resource!(
    /// Base structure schemas inherit from
    Class
);
typed_resource!(
    /// Platform-defined data behavior: ad-hoc, record, or time-series
    Behavior
);

/// Behavior and field groups shared by schemas and classes, derived from `meta:extends`
async fn composition(resource: &mut Resource) -> Result<(Vec<Behavior>, Vec<FieldGroup>)> {
    let mut behaviors = Vec::new();
    let mut field_groups = Vec::new();
    for extended in resource.extends().await? {
        match extended {
            AnyResource::Behavior(behavior) => behaviors.push(behavior),
            AnyResource::FieldGroup(field_group) => field_groups.push(field_group),
            _ => {}
        }
    }
    Ok((behaviors, field_groups))
}

async fn single_behavior(resource: &mut Resource) -> Result<Behavior> {
    let (mut behaviors, _) = composition(resource).await?;
    if behaviors.len() != 1 {
        return Err(XdmError::InvalidComposition(format!(
            "expected exactly one behavior for {}, found {}",
            resource.canonical_ref(),
            behaviors.len()
        )));
    }
    Ok(behaviors.remove(0))
}

impl Schema {
    /// The class this schema implements (`meta:class`)
    pub async fn parent(&mut self) -> Result<Class> {
        self.0.ensure("meta:class", true).await?;
        let class_ref = self
            .0
            .body()
            .and_then(|body| body.get("meta:class"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| XdmError::missing_field(self.0.canonical_ref(), "meta:class"))?;
        let reference = Reference::parse(class_ref)?;
        Class::from_reference(self.0.client().clone(), reference)
    }

    /// The one behavior among the extended resources
    pub async fn behavior(&mut self) -> Result<Behavior> {
        single_behavior(&mut self.0).await
    }

    pub async fn field_groups(&mut self) -> Result<Vec<FieldGroup>> {
        Ok(composition(&mut self.0).await?.1)
    }

    /// Append a field group to the composition list
    pub async fn add_field_group(&mut self, field_group: &FieldGroup) -> Result<()> {
        tracing::info!("Adding {} to {}", field_group.reference(), self.0.reference());
        let operations = json!([{
            "op": "add",
            "path": "/allOf/-",
            "value": {"$ref": field_group.canonical_ref()},
        }]);
        if !self.0.patch(&operations).await? {
            self.0.invalidate(&["allOf", "meta:extends"]);
        }
        Ok(())
    }
}

impl Class {
    pub async fn behavior(&mut self) -> Result<Behavior> {
        single_behavior(&mut self.0).await
    }

    pub async fn field_groups(&mut self) -> Result<Vec<FieldGroup>> {
        Ok(composition(&mut self.0).await?.1)
    }
}

impl FieldGroup {
    /// Classes or schemas this field group is meant to be used with (`meta:intendedToExtend`)
    pub async fn intended_to_extend(&mut self) -> Result<Vec<AnyResource>> {
        let refs = self.0.string_list("meta:intendedToExtend", false).await?;
        self.0.materialize(&refs)
    }
}

const ADHOC_KEY: &str = "xdm.data.adhoc";
const RECORD_KEY: &str = "xdm.data.record";
const TIME_SERIES_KEY: &str = "xdm.data.time-series";

impl Behavior {
    /// `https://ns.adobe.com/xdm/data/adhoc`
    pub fn adhoc(client: XdmClient) -> Self {
        Self(Resource::from_reference(client, Reference::global(ResourceKind::Behavior, ADHOC_KEY)))
    }

    /// `https://ns.adobe.com/xdm/data/record`
    pub fn record(client: XdmClient) -> Self {
        Self(Resource::from_reference(client, Reference::global(ResourceKind::Behavior, RECORD_KEY)))
    }

    /// `https://ns.adobe.com/xdm/data/time-series`
    pub fn time_series(client: XdmClient) -> Self {
        Self(Resource::from_reference(
            client,
            Reference::global(ResourceKind::Behavior, TIME_SERIES_KEY),
        ))
    }
}

/// A resource of any kind
#[derive(Clone, Debug)]
pub enum AnyResource {
    DataType(DataType),
    FieldGroup(FieldGroup),
    Schema(Schema),
    Class(Class),
    Behavior(Behavior),
}

impl AnyResource {
    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            AnyResource::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self {
            AnyResource::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_field_group(&self) -> Option<&FieldGroup> {
        match self {
            AnyResource::FieldGroup(field_group) => Some(field_group),
            _ => None,
        }
    }
}

impl TypedResource for AnyResource {
    const KINDS: &'static [ResourceKind] = &ResourceKind::ALL;

    fn from_resource(resource: Resource) -> Result<Self> {
        Ok(match resource.kind() {
            ResourceKind::DataType => AnyResource::DataType(DataType(resource)),
            ResourceKind::FieldGroup => AnyResource::FieldGroup(FieldGroup(resource)),
            ResourceKind::Schema => AnyResource::Schema(Schema(resource)),
            ResourceKind::Class => AnyResource::Class(Class(resource)),
            ResourceKind::Behavior => AnyResource::Behavior(Behavior(resource)),
        })
    }

    fn into_resource(self) -> Resource {
        match self {
            AnyResource::DataType(r) => r.into_resource(),
            AnyResource::FieldGroup(r) => r.into_resource(),
            AnyResource::Schema(r) => r.into_resource(),
            AnyResource::Class(r) => r.into_resource(),
            AnyResource::Behavior(r) => r.into_resource(),
        }
    }
}

impl Deref for AnyResource {
    type Target = Resource;

    fn deref(&self) -> &Resource {
        match self {
            AnyResource::DataType(r) => &r.0,
            AnyResource::FieldGroup(r) => &r.0,
            AnyResource::Schema(r) => &r.0,
            AnyResource::Class(r) => &r.0,
            AnyResource::Behavior(r) => &r.0,
        }
    }
}

impl DerefMut for AnyResource {
    fn deref_mut(&mut self) -> &mut Resource {
        match self {
            AnyResource::DataType(r) => &mut r.0,
            AnyResource::FieldGroup(r) => &mut r.0,
            AnyResource::Schema(r) => &mut r.0,
            AnyResource::Class(r) => &mut r.0,
            AnyResource::Behavior(r) => &mut r.0,
        }
    }
}

impl fmt::Display for AnyResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
