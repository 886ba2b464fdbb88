//! Resource Collections
//!
//! Query façade over one or more resource kinds, optionally restricted to a
//! single container. Listing follows the registry's `_page.next` cursor.

use super::paths::{accept_header, resource_path, Fidelity, DEFAULT_XED_VERSION};
use super::reference::Reference;
use super::resource::{Document, Resource};
use super::variants::{Behavior, Class, DataType, FieldGroup, Schema, TypedResource};
use super::{Container, ResourceKind};
use crate::error::{Result, XdmError};
use crate::platform::client::XdmClient;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::marker::PhantomData;

/// Server-side `property` filter, e.g. `title==My Schema`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    pub key: String,
    pub value: String,
}

impl PropertyFilter {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Comma-joined `key==value` list for the `property` query parameter
fn property_query(filters: &[PropertyFilter]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(|f| format!("{}=={}", f.key, f.value))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Fetch every record of one kind in one container, following `_page.next`
pub(crate) async fn list_documents(
    client: &XdmClient,
    container: Container,
    kind: ResourceKind,
    full: bool,
    filters: &[PropertyFilter],
) -> Result<Vec<Value>> {
    let path = resource_path(container, kind, None);
    let accept = accept_header(full.then_some(Fidelity::Full), None);

    let mut params: Vec<(String, String)> = Vec::new();
    if let Some(property) = property_query(filters) {
        params.push(("property".to_string(), property));
    }

    let mut records = Vec::new();
    let mut seen_cursors = HashSet::new();
    let mut start: Option<String> = None;

    loop {
        let mut query = params.clone();
        if let Some(cursor) = &start {
            query.push(("start".to_string(), cursor.clone()));
        }

        let page = client
            .send(Method::GET, &path, &accept, &query, None)
            .await?
            .ok_or_else(|| listing_error(&path, "empty listing response"))?;

        let results = page
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| listing_error(&path, "listing response has no results"))?;
        records.extend(results.iter().cloned());

        let next = page
            .get("_page")
            .and_then(|p| p.get("next"))
            .and_then(cursor_string);

        match next {
            Some(cursor) => {
                if !seen_cursors.insert(cursor.clone()) {
                    return Err(listing_error(&path, &format!("cursor \"{}\" repeated", cursor)));
                }
                start = Some(cursor);
            }
            None => break,
        }
    }

    tracing::debug!("Listed {} {} records from {}", records.len(), kind, container);
    Ok(records)
}

fn cursor_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn listing_error(path: &str, message: &str) -> XdmError {
    XdmError::Inconsistent {
        reference: path.to_string(),
        message: message.to_string(),
    }
}

/// Resources of the kinds `T` can hold, in one or both containers
#[derive(Clone)]
pub struct Collection<T> {
    client: XdmClient,
    container: Option<Container>,
    kinds: Vec<ResourceKind>,
    _marker: PhantomData<T>,
}

impl<T: TypedResource> Collection<T> {
    /// Collection over every kind `T` allows; `None` searches both containers
    pub fn new(client: XdmClient, container: Option<Container>) -> Self {
        Self {
            client,
            container,
            kinds: T::KINDS.to_vec(),
            _marker: PhantomData,
        }
    }

    /// Collection over a subset of the kinds `T` allows
    pub fn with_kinds(
        client: XdmClient,
        container: Option<Container>,
        kinds: &[ResourceKind],
    ) -> Result<Self> {
        if kinds.is_empty() {
            return Err(XdmError::InvalidConfig("a collection needs at least one kind".to_string()));
        }
        if let Some(kind) = kinds.iter().find(|k| !T::KINDS.contains(k)) {
            return Err(XdmError::KindMismatch {
                reference: kind.path_segment().to_string(),
                expected: kinds_label(T::KINDS),
                found: *kind,
            });
        }
        Ok(Self {
            client,
            container,
            kinds: kinds.to_vec(),
            _marker: PhantomData,
        })
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    pub fn container(&self) -> Option<Container> {
        self.container
    }

    /// Containers searched by listings, tenant first
    pub fn containers(&self) -> Vec<Container> {
        match self.container {
            Some(container) => vec![container],
            None => vec![Container::Tenant, Container::Global],
        }
    }

    /// Resolve a `$id` or `meta:altId` to a resource; no request is made
    pub fn get(&self, id: &str) -> Result<T> {
        let reference = Reference::parse(id)?;
        if !self.kinds.contains(&reference.kind()) {
            return Err(XdmError::KindMismatch {
                reference: reference.canonical_ref().to_string(),
                expected: kinds_label(&self.kinds),
                found: reference.kind(),
            });
        }
        T::from_reference(self.client.clone(), reference)
    }

    /// Every resource matching `filters`, across kinds and containers
    pub async fn find_all(&self, full: bool, filters: &[PropertyFilter]) -> Result<Vec<T>> {
        let mut results = Vec::new();
        for kind in &self.kinds {
            for container in self.containers() {
                for record in list_documents(&self.client, container, *kind, full, filters).await? {
                    let resource =
                        Resource::from_listing(self.client.clone(), record, *kind, container)?;
                    results.push(T::from_resource(resource)?);
                }
            }
        }
        Ok(results)
    }

    /// The single resource matching `filters`
    pub async fn find(&self, full: bool, filters: &[PropertyFilter]) -> Result<T> {
        let mut results = self.find_all(full, filters).await?;
        match results.len() {
            0 => Err(XdmError::NotFound),
            1 => Ok(results.remove(0)),
            n => Err(XdmError::AmbiguousResult(n)),
        }
    }

    /// POST a new resource into the tenant container
    pub async fn create(&self, body: Value) -> Result<T> {
        if self.container == Some(Container::Global) {
            return Err(XdmError::IllegalCreate("cannot create global resource".to_string()));
        }
        let [kind] = self.kinds.as_slice() else {
            return Err(XdmError::IllegalCreate(format!(
                "collection spans {} kinds",
                self.kinds.len()
            )));
        };

        let path = resource_path(Container::Tenant, *kind, None);
        let accept = accept_header(None, Some(DEFAULT_XED_VERSION));
        tracing::info!("Creating {} with title {:?}", kind, body.get("title"));

        let document = self
            .client
            .send(Method::POST, &path, &accept, &[], Some(&body))
            .await?
            .ok_or_else(|| listing_error(&path, "create returned no document"))?;
        T::from_document(self.client.clone(), document)
    }
}

fn kinds_label(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn composition_list<'a>(refs: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(refs.map(|r| json!({ "$ref": r })).collect())
}

impl Collection<Schema> {
    /// Create a schema implementing `parent` and including `field_groups`
    pub async fn create_schema(
        &self,
        title: &str,
        parent: &Class,
        description: &str,
        field_groups: &[FieldGroup],
    ) -> Result<Schema> {
        let refs = std::iter::once(parent.canonical_ref())
            .chain(field_groups.iter().map(|fg| fg.canonical_ref()));
        self.create(json!({
            "type": "object",
            "title": title,
            "description": description,
            "allOf": composition_list(refs),
        }))
        .await
    }
}

impl Collection<Class> {
    /// Create a class with the given behavior and field groups
    pub async fn create_class(
        &self,
        title: &str,
        behavior: &Behavior,
        description: &str,
        field_groups: &[FieldGroup],
    ) -> Result<Class> {
        let refs = std::iter::once(behavior.canonical_ref())
            .chain(field_groups.iter().map(|fg| fg.canonical_ref()));
        self.create(json!({
            "type": "object",
            "title": title,
            "description": description,
            "allOf": composition_list(refs),
        }))
        .await
    }
}

impl Collection<FieldGroup> {
    /// Create a field group carrying `properties`, meant for the `intended_to_extend` resources
    pub async fn create_field_group<R: TypedResource>(
        &self,
        title: &str,
        description: &str,
        properties: Document,
        intended_to_extend: &[R],
    ) -> Result<FieldGroup> {
        let intended: Vec<&str> = intended_to_extend.iter().map(|r| r.canonical_ref()).collect();
        self.create(json!({
            "type": "object",
            "title": title,
            "description": description,
            "meta:intendedToExtend": intended,
            "allOf": [{ "properties": properties }],
        }))
        .await
    }
}

impl Collection<DataType> {
    pub async fn create_data_type(
        &self,
        title: &str,
        description: &str,
        properties: Document,
    ) -> Result<DataType> {
        self.create(json!({
            "type": "object",
            "title": title,
            "description": description,
            "properties": properties,
        }))
        .await
    }
}

impl Collection<Behavior> {
    pub fn adhoc(&self) -> Behavior {
        Behavior::adhoc(self.client.clone())
    }

    pub fn record(&self) -> Behavior {
        Behavior::record(self.client.clone())
    }

    pub fn time_series(&self) -> Behavior {
        Behavior::time_series(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::auth::XdmCredentials;
    use crate::platform::http::XdmHttpClient;
    use crate::registry::AnyResource;
    use std::time::Duration;

    fn client() -> XdmClient {
        let http = XdmHttpClient::new(Duration::from_secs(5)).unwrap();
        let credentials = XdmCredentials::from_token("t", "c", "o", "prod");
        XdmClient::with_credentials("http://localhost:1", credentials, http).unwrap()
    }

    #[test]
    fn test_property_query() {
        assert_eq!(property_query(&[]), None);
        assert_eq!(
            property_query(&[
                PropertyFilter::new("title", "My Schema"),
                PropertyFilter::new("meta:extends", "https://ns.adobe.com/xdm/context/profile"),
            ])
            .as_deref(),
            Some("title==My Schema,meta:extends==https://ns.adobe.com/xdm/context/profile")
        );
    }

    #[test]
    fn test_containers_default_to_tenant_then_global() {
        let all = Collection::<Schema>::new(client(), None);
        assert_eq!(all.containers(), vec![Container::Tenant, Container::Global]);

        let global = Collection::<Schema>::new(client(), Some(Container::Global));
        assert_eq!(global.containers(), vec![Container::Global]);
    }

    #[test]
    fn test_get_rejects_other_kinds() {
        let schemas = Collection::<Schema>::new(client(), None);
        let result = schemas.get("_xdm.context.profile");
        assert!(matches!(
            result,
            Err(XdmError::KindMismatch { found: ResourceKind::Class, .. })
        ));
    }

    #[test]
    fn test_get_does_not_fetch() {
        let classes = Collection::<Class>::new(client(), None);
        let class = classes.get("https://ns.adobe.com/xdm/context/profile").unwrap();
        assert!(class.body().is_none());
        assert_eq!(class.container(), Container::Global);
    }

    #[test]
    fn test_registry_subset_of_kinds() {
        let registry = Collection::<AnyResource>::with_kinds(
            client(),
            Some(Container::Tenant),
            &[ResourceKind::Schema, ResourceKind::Class],
        )
        .unwrap();
        assert!(registry.get("_acme.schemas.abc").is_ok());
        assert!(registry.get("_acme.classes.abc").is_ok());
        assert!(registry.get("_acme.mixins.abc").is_err());
    }

    #[test]
    fn test_with_kinds_rejects_foreign_kind() {
        let result =
            Collection::<Schema>::with_kinds(client(), None, &[ResourceKind::Class]);
        assert!(matches!(result, Err(XdmError::KindMismatch { .. })));
        assert!(Collection::<AnyResource>::with_kinds(client(), None, &[]).is_err());
    }

    #[tokio::test]
    async fn test_create_rejected_for_global_container() {
        let schemas = Collection::<Schema>::new(client(), Some(Container::Global));
        let result = schemas.create(json!({"title": "T"})).await;
        assert!(matches!(result, Err(XdmError::IllegalCreate(_))));
    }

    #[tokio::test]
    async fn test_create_rejected_for_multi_kind_collection() {
        let registry = Collection::<AnyResource>::new(client(), Some(Container::Tenant));
        let result = registry.create(json!({"title": "T"})).await;
        assert!(matches!(result, Err(XdmError::IllegalCreate(_))));
    }

    #[test]
    fn test_behavior_singletons() {
        let behaviors = Collection::<Behavior>::new(client(), None);
        assert_eq!(behaviors.record().canonical_ref(), "https://ns.adobe.com/xdm/data/record");
    }
}
