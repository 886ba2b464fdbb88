//! REST paths and content negotiation for the schema registry

use super::{Container, ResourceKind};

const REGISTRY_ROOT: &str = "/data/foundation/schemaregistry";

/// Version requested when reading or writing a single resource
pub const DEFAULT_XED_VERSION: u32 = 1;

/// Completeness of a fetched document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    /// Identifiers only
    Id,
    /// Fully resolved body including `properties`
    Full,
}

impl Fidelity {
    pub fn as_str(self) -> &'static str {
        match self {
            Fidelity::Id => "id",
            Fidelity::Full => "full",
        }
    }
}

/// `/data/foundation/schemaregistry/{container}/{kind}[/{id}]`
pub fn resource_path(container: Container, kind: ResourceKind, id: Option<&str>) -> String {
    let mut path = format!("{}/{}/{}", REGISTRY_ROOT, container, kind.path_segment());
    if let Some(id) = id {
        path.push('/');
        path.push_str(id);
    }
    path
}

/// `application/vnd.adobe.xed[-{fidelity}]+json[; version={n}]`
pub fn accept_header(fidelity: Option<Fidelity>, version: Option<u32>) -> String {
    let mut header = match fidelity {
        None => "application/vnd.adobe.xed+json".to_string(),
        Some(fidelity) => format!("application/vnd.adobe.xed-{}+json", fidelity.as_str()),
    };
    if let Some(version) = version {
        header.push_str(&format!("; version={}", version));
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path() {
        assert_eq!(
            resource_path(Container::Tenant, ResourceKind::FieldGroup, None),
            "/data/foundation/schemaregistry/tenant/fieldgroups"
        );
    }

    #[test]
    fn test_item_path() {
        assert_eq!(
            resource_path(Container::Global, ResourceKind::Class, Some("_xdm.context.profile")),
            "/data/foundation/schemaregistry/global/classes/_xdm.context.profile"
        );
    }

    #[test]
    fn test_accept_headers() {
        assert_eq!(accept_header(None, None), "application/vnd.adobe.xed+json");
        assert_eq!(
            accept_header(None, Some(1)),
            "application/vnd.adobe.xed+json; version=1"
        );
        assert_eq!(
            accept_header(Some(Fidelity::Full), Some(DEFAULT_XED_VERSION)),
            "application/vnd.adobe.xed-full+json; version=1"
        );
        assert_eq!(
            accept_header(Some(Fidelity::Id), None),
            "application/vnd.adobe.xed-id+json"
        );
    }
}
