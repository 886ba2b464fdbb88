//! Resource documents
//!
//! A [`Resource`] pairs a [`Reference`] with the last document fetched for
//! it. Construction never performs I/O: the body starts out empty (or holds
//! whatever payload the resource was built from) and accessors fetch it on
//! first use.

use super::paths::{accept_header, resource_path, Fidelity, DEFAULT_XED_VERSION};
use super::reference::Reference;
use super::variants::{AnyResource, TypedResource};
use super::{Container, ResourceKind};
use crate::error::{Result, XdmError};
use crate::platform::client::XdmClient;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::fmt;

/// A JSON object body as returned by the registry
pub type Document = Map<String, Value>;

const LOCAL_DEFINITION_PREFIX: &str = "#/definitions/";

/// One registry document, fetched lazily
#[derive(Clone)]
pub struct Resource {
    client: XdmClient,
    reference: Reference,
    body: Option<Document>,
}

impl Resource {
    /// A resource whose body will be fetched on first access
    pub fn from_reference(client: XdmClient, reference: Reference) -> Self {
        Self {
            client,
            reference,
            body: None,
        }
    }

    /// A resource built from a server payload; its `$id` decides the reference
    pub fn from_document(client: XdmClient, document: Value) -> Result<Self> {
        let (body, id) = split_document(document)?;
        let reference = Reference::parse(&id)?;

        Ok(Self {
            client,
            reference,
            body: Some(body),
        })
    }

    /// A resource built from a listing record of a known kind and container.
    ///
    /// Global records missing from the global table still resolve, since the
    /// listing already says what they are.
    pub(crate) fn from_listing(
        client: XdmClient,
        document: Value,
        kind: ResourceKind,
        container: Container,
    ) -> Result<Self> {
        let (body, id) = split_document(document)?;
        let reference = match Reference::parse(&id) {
            Ok(reference) if reference.container() == container => reference,
            Ok(_) | Err(XdmError::UnparseableReference(_)) if container == Container::Global => {
                tracing::warn!("{} is missing from the global table snapshot", id);
                Reference::unlisted_global(kind, &id)?
            }
            Ok(reference) => {
                return Err(XdmError::Inconsistent {
                    reference: id,
                    message: format!("listed from {} but resolves to {}", container, reference.container()),
                })
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            client,
            reference,
            body: Some(body),
        })
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn kind(&self) -> ResourceKind {
        self.reference.kind()
    }

    pub fn container(&self) -> Container {
        self.reference.container()
    }

    pub fn uuid(&self) -> &str {
        self.reference.uuid()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.reference.tenant()
    }

    /// `meta:altId`
    pub fn short_id(&self) -> &str {
        self.reference.short_id()
    }

    /// `$id`
    pub fn canonical_ref(&self) -> &str {
        self.reference.canonical_ref()
    }

    pub(crate) fn client(&self) -> &XdmClient {
        &self.client
    }

    /// The body as last fetched, if any
    pub fn body(&self) -> Option<&Document> {
        self.body.as_ref()
    }

    fn has(&self, key: &str) -> bool {
        self.body.as_ref().is_some_and(|body| body.contains_key(key))
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.body.as_ref().and_then(|body| body.get(key))
    }

    /// Issue a request against this resource's item path and merge the returned document.
    ///
    /// Returns whether a document came back.
    async fn request(&mut self, method: Method, full: bool, json: Option<&Value>) -> Result<bool> {
        let path = resource_path(self.container(), self.kind(), Some(self.short_id()));
        let fidelity = full.then_some(Fidelity::Full);
        let accept = accept_header(fidelity, Some(DEFAULT_XED_VERSION));

        let response = self.client.send(method, &path, &accept, &[], json).await?;
        match response {
            Some(document) => {
                self.merge(document)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Merge a returned document into the body after checking it describes this resource
    fn merge(&mut self, document: Value) -> Result<()> {
        let inconsistent = |message: String| XdmError::Inconsistent {
            reference: self.reference.canonical_ref().to_string(),
            message,
        };

        let Value::Object(document) = document else {
            return Err(inconsistent("expected a JSON object".to_string()));
        };

        let id = document.get("$id").and_then(|v| v.as_str());
        if id != Some(self.reference.canonical_ref()) {
            return Err(inconsistent(format!("response $id is {:?}", id)));
        }
        let alt_id = document.get("meta:altId").and_then(|v| v.as_str());
        if alt_id != Some(self.reference.short_id()) {
            return Err(inconsistent(format!("response meta:altId is {:?}", alt_id)));
        }

        self.body.get_or_insert_with(Document::new).extend(document);
        Ok(())
    }

    /// Refresh the body from the server
    pub async fn fetch(&mut self, full: bool) -> Result<()> {
        if !self.request(Method::GET, full, None).await? {
            return Err(XdmError::Inconsistent {
                reference: self.canonical_ref().to_string(),
                message: "empty response body".to_string(),
            });
        }
        Ok(())
    }

    /// Fetch when `key` is not in the body yet
    pub(crate) async fn ensure(&mut self, key: &str, full: bool) -> Result<()> {
        if !self.has(key) {
            tracing::debug!("{} not loaded for {}, fetching", key, self.reference);
            self.fetch(full).await?;
        }
        Ok(())
    }

    async fn string_field(&mut self, key: &str) -> Result<&str> {
        self.ensure(key, false).await?;
        self.field(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| XdmError::missing_field(self.reference.canonical_ref(), key))
    }

    /// Strings of a list field, treating an absent field as empty
    pub(crate) async fn string_list(&mut self, key: &str, full: bool) -> Result<Vec<String>> {
        self.ensure(key, full).await?;
        let Some(value) = self.field(key) else {
            return Ok(Vec::new());
        };
        let not_a_list = || XdmError::Inconsistent {
            reference: self.reference.canonical_ref().to_string(),
            message: format!("{} is not a list of strings", key),
        };
        value
            .as_array()
            .ok_or_else(not_a_list)?
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(not_a_list))
            .collect()
    }

    pub async fn version(&mut self) -> Result<&str> {
        self.string_field("version").await
    }

    pub async fn title(&mut self) -> Result<&str> {
        self.string_field("title").await
    }

    pub async fn description(&mut self) -> Result<&str> {
        self.string_field("description").await
    }

    /// Top-level `properties`; requires a full-fidelity fetch
    pub async fn properties(&mut self) -> Result<&Document> {
        self.ensure("properties", true).await?;
        let body = self.body.get_or_insert_with(Document::new);
        match body
            .entry("properties")
            .or_insert_with(|| Value::Object(Document::new()))
        {
            Value::Object(properties) => Ok(&*properties),
            _ => Err(XdmError::Inconsistent {
                reference: self.reference.canonical_ref().to_string(),
                message: "properties is not an object".to_string(),
            }),
        }
    }

    /// Properties merged from every entry of the `allOf` composition list.
    ///
    /// Local `#/definitions/<name>` refs contribute the definition's properties;
    /// refs to other resources contribute nothing. A key declared twice is an error.
    pub async fn definitions(&mut self) -> Result<Document> {
        self.ensure("allOf", true).await?;
        let empty = Document::new();
        let body = self.body.as_ref().unwrap_or(&empty);
        merge_definitions(body)
    }

    /// Resources listed in `meta:extends`, with deferred bodies
    pub async fn extends(&mut self) -> Result<Vec<AnyResource>> {
        let refs = self.string_list("meta:extends", false).await?;
        self.materialize(&refs)
    }

    /// Turn reference strings into typed resources sharing this resource's client
    pub(crate) fn materialize(&self, refs: &[String]) -> Result<Vec<AnyResource>> {
        refs.iter()
            .map(|r| {
                let reference = Reference::parse(r)?;
                AnyResource::from_reference(self.client.clone(), reference)
            })
            .collect()
    }

    pub async fn set_title(&mut self, value: &str) -> Result<()> {
        self.replace_field("title", value).await
    }

    pub async fn set_description(&mut self, value: &str) -> Result<()> {
        self.replace_field("description", value).await
    }

    async fn replace_field(&mut self, field: &str, value: &str) -> Result<()> {
        tracing::info!("Setting {} of {}", field, self.reference);
        let patch = json!([{
            "op": "replace",
            "path": format!("/{}", field),
            "value": value,
        }]);
        self.request(Method::PATCH, false, Some(&patch)).await?;
        self.body
            .get_or_insert_with(Document::new)
            .insert(field.to_string(), Value::String(value.to_string()));
        Ok(())
    }

    /// Apply a JSON-patch operation list; returns whether the server sent the updated document
    pub(crate) async fn patch(&mut self, operations: &Value) -> Result<bool> {
        self.request(Method::PATCH, false, Some(operations)).await
    }

    /// Drop cached fields so the next access refetches them
    pub(crate) fn invalidate(&mut self, keys: &[&str]) {
        if let Some(body) = self.body.as_mut() {
            for key in keys {
                body.remove(*key);
            }
        }
    }

    /// Delete the resource on the server
    pub async fn delete(mut self) -> Result<()> {
        tracing::info!("Deleting {}", self.reference);
        self.request(Method::DELETE, false, None).await?;
        Ok(())
    }
}

/// Body and `$id` of a server payload
fn split_document(document: Value) -> Result<(Document, String)> {
    let Value::Object(body) = document else {
        return Err(XdmError::Inconsistent {
            reference: "<unknown>".to_string(),
            message: "expected a JSON object".to_string(),
        });
    };
    let id = body
        .get("$id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| XdmError::missing_field("<unknown>", "$id"))?
        .to_string();
    Ok((body, id))
}

/// Merge the `allOf` entries of a document into one property map
pub fn merge_definitions(body: &Document) -> Result<Document> {
    let composition = |message: &str| XdmError::InvalidComposition(message.to_string());
    let empty_list = Vec::new();
    let empty_map = Document::new();

    let entries = match body.get("allOf") {
        None => &empty_list,
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(composition("allOf is not a list")),
    };
    let local_definitions = body
        .get("definitions")
        .and_then(|v| v.as_object())
        .unwrap_or(&empty_map);

    let mut merged = Document::new();
    for entry in entries {
        let mut definition = entry;

        let local_ref = entry
            .get("$ref")
            .and_then(|v| v.as_str())
            .filter(|r| r.starts_with('#'));
        if let Some(local_ref) = local_ref {
            if entry.get("properties").is_some() {
                return Err(composition("unexpected \"properties\" and \"$ref\" definition"));
            }
            let name = local_ref
                .strip_prefix(LOCAL_DEFINITION_PREFIX)
                .ok_or_else(|| composition("unexpected non-definitions reference"))?;
            if name.contains('/') {
                return Err(composition("unexpected nested definition reference"));
            }
            definition = local_definitions
                .get(name)
                .ok_or_else(|| composition("reference to missing definition"))?;
            if definition.get("properties").is_none() {
                return Err(composition("expected definition to be an object"));
            }
        }

        let properties = definition
            .get("properties")
            .and_then(|v| v.as_object())
            .unwrap_or(&empty_map);
        for (key, value) in properties {
            if merged.contains_key(key) {
                return Err(XdmError::InvalidComposition(format!(
                    "unhandled merging of definitions: \"{}\" is declared twice",
                    key
                )));
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    Ok(merged)
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} {}", self.kind(), self.uuid())?;
        if let Some(title) = self.field("title").and_then(|v| v.as_str()) {
            write!(f, " title=\"{}\"", title)?;
        }
        if let Some(version) = self.field("version").and_then(|v| v.as_str()) {
            write!(f, " version=\"{}\"", version)?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("reference", &self.reference)
            .field("body", &self.body)
            .finish()
    }
}
