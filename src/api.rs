//! Registry entry point
//!
//! [`Api`] owns the platform client and hands out one collection per kind
//! and container combination.

use crate::config::{Credentials, Settings};
use crate::error::Result;
use crate::platform::client::XdmClient;
use crate::registry::collection::list_documents;
use crate::registry::{
    AnyResource, Behavior, Class, Collection, Container, DataType, FieldGroup, GlobalTable,
    Reference, ResourceKind, Schema, TypedResource,
};

/// Schema registry API
#[derive(Clone)]
pub struct Api {
    client: XdmClient,
}

impl Api {
    pub fn new(client: XdmClient) -> Self {
        Self { client }
    }

    /// Build the platform client from settings and credentials
    pub fn from_settings(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        Ok(Self::new(XdmClient::new(settings, credentials)?))
    }

    pub fn client(&self) -> &XdmClient {
        &self.client
    }

    pub fn switch_sandbox(&mut self, sandbox: &str) {
        tracing::info!("Switching sandbox to {}", sandbox);
        self.client.switch_sandbox(sandbox);
    }

    fn collection<T: TypedResource>(&self, container: Option<Container>) -> Collection<T> {
        Collection::new(self.client.clone(), container)
    }

    /// Every kind, both containers
    pub fn registry(&self) -> Collection<AnyResource> {
        self.collection(None)
    }

    pub fn global_registry(&self) -> Collection<AnyResource> {
        self.collection(Some(Container::Global))
    }

    pub fn tenant_registry(&self) -> Collection<AnyResource> {
        self.collection(Some(Container::Tenant))
    }

    pub fn schemas(&self) -> Collection<Schema> {
        self.collection(None)
    }

    pub fn global_schemas(&self) -> Collection<Schema> {
        self.collection(Some(Container::Global))
    }

    pub fn tenant_schemas(&self) -> Collection<Schema> {
        self.collection(Some(Container::Tenant))
    }

    pub fn classes(&self) -> Collection<Class> {
        self.collection(None)
    }

    pub fn global_classes(&self) -> Collection<Class> {
        self.collection(Some(Container::Global))
    }

    pub fn tenant_classes(&self) -> Collection<Class> {
        self.collection(Some(Container::Tenant))
    }

    pub fn field_groups(&self) -> Collection<FieldGroup> {
        self.collection(None)
    }

    pub fn global_field_groups(&self) -> Collection<FieldGroup> {
        self.collection(Some(Container::Global))
    }

    pub fn tenant_field_groups(&self) -> Collection<FieldGroup> {
        self.collection(Some(Container::Tenant))
    }

    pub fn data_types(&self) -> Collection<DataType> {
        self.collection(None)
    }

    pub fn global_data_types(&self) -> Collection<DataType> {
        self.collection(Some(Container::Global))
    }

    pub fn tenant_data_types(&self) -> Collection<DataType> {
        self.collection(Some(Container::Tenant))
    }

    /// Behaviors only exist in the global container
    pub fn behaviors(&self) -> Collection<Behavior> {
        self.collection(Some(Container::Global))
    }

    /// Resolve any identifier to a deferred resource of the right kind
    pub fn reference(&self, id: &str) -> Result<AnyResource> {
        AnyResource::from_reference(self.client.clone(), Reference::parse(id)?)
    }

    /// Build a fresh global table by listing every kind in the global container
    pub async fn snapshot_globals(&self) -> Result<GlobalTable> {
        let mut table = GlobalTable::new();
        for kind in ResourceKind::ALL {
            let records = list_documents(&self.client, Container::Global, kind, false, &[]).await?;
            for record in records {
                let alt_id = record.get("meta:altId").and_then(|v| v.as_str());
                let id = record.get("$id").and_then(|v| v.as_str());
                match (alt_id, id) {
                    (Some(alt_id), Some(id)) => {
                        table.insert(alt_id.trim_start_matches('_'), kind, id);
                    }
                    _ => tracing::warn!("Skipping global {} record without $id or meta:altId", kind),
                }
            }
        }
        tracing::info!("Snapshot holds {} global resources", table.len());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::auth::XdmCredentials;
    use crate::platform::http::XdmHttpClient;
    use std::time::Duration;

    fn api() -> Api {
        let http = XdmHttpClient::new(Duration::from_secs(5)).unwrap();
        let credentials = XdmCredentials::from_token("t", "c", "o", "prod");
        Api::new(XdmClient::with_credentials("http://localhost:1", credentials, http).unwrap())
    }

    #[test]
    fn test_collections_scope() {
        let api = api();
        assert_eq!(api.registry().kinds().len(), 5);
        assert_eq!(api.registry().container(), None);
        assert_eq!(api.tenant_schemas().container(), Some(Container::Tenant));
        assert_eq!(api.global_field_groups().kinds(), &[ResourceKind::FieldGroup]);
        assert_eq!(api.behaviors().container(), Some(Container::Global));
    }

    #[test]
    fn test_reference_shortcut() {
        let api = api();
        let resource = api.reference("_xdm.context.profile").unwrap();
        assert!(resource.as_class().is_some());
        assert!(api.reference("not-an-id").is_err());
    }

    #[test]
    fn test_switch_sandbox() {
        let mut api = api();
        api.switch_sandbox("dev");
        assert_eq!(api.client().credentials.sandbox(), "dev");
    }
}
