//! Global resource table
//!
//! Platform-defined resources (`https://ns.adobe.com/xdm/context/profile`, ...)
//! do not follow the `<tenant>.<kind>.<uuid>` pattern, so their kind cannot be
//! read off the identifier. They are looked up in a snapshot of the global
//! container keyed by the dotted form of the identifier.
//!
//! The snapshot is a JSON object `{ "<dotted key>": ["<kind alias>", "<canonical ref>"] }`.
//! One is embedded in the binary; a fresher one can be produced with
//! `xdmctl globals <file>` and installed at startup with [`install_global_table`].

use super::reference::Reference;
use super::ResourceKind;
use crate::error::{Result, XdmError};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

/// Snapshot compiled into the binary
const EMBEDDED_GLOBALS: &str = include_str!("../resources/globals.json");

/// One platform-defined resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalEntry {
    pub kind: ResourceKind,
    pub canonical_ref: String,
}

/// Lookup table of platform-defined resources
#[derive(Debug, Clone, Default)]
pub struct GlobalTable {
    entries: HashMap<String, GlobalEntry>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot in the `{ key: [alias, ref] }` format
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, (String, String)> = serde_json::from_str(content)?;

        let mut table = Self::new();
        for (key, (alias, canonical_ref)) in raw {
            let kind = ResourceKind::from_alias(&alias).ok_or_else(|| {
                XdmError::GlobalTable(format!("unknown kind \"{}\" for \"{}\"", alias, key))
            })?;
            table.insert(key, kind, canonical_ref);
        }
        Ok(table)
    }

    /// Load a snapshot file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            XdmError::GlobalTable(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// The snapshot compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_GLOBALS)
    }

    pub fn insert(&mut self, key: impl Into<String>, kind: ResourceKind, canonical_ref: impl Into<String>) {
        self.entries.insert(
            key.into(),
            GlobalEntry {
                kind,
                canonical_ref: canonical_ref.into(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&GlobalEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize back to the snapshot format, keys sorted
    pub fn to_json(&self) -> Result<String> {
        let sorted: BTreeMap<&str, (&str, &str)> = self
            .entries
            .iter()
            .map(|(key, entry)| {
                (
                    key.as_str(),
                    (entry.kind.path_segment(), entry.canonical_ref.as_str()),
                )
            })
            .collect();
        Ok(serde_json::to_string_pretty(&sorted)?)
    }

    /// Parse an identifier against this table
    pub fn parse(&self, identifier: &str) -> Result<Reference> {
        Reference::parse_with(identifier, self)
    }
}

/// Process-wide table used by [`Reference::parse`]
static GLOBAL_TABLE: OnceLock<GlobalTable> = OnceLock::new();

/// Get the process-wide table (the embedded snapshot unless one was installed)
pub fn global_table() -> &'static GlobalTable {
    GLOBAL_TABLE.get_or_init(|| {
        GlobalTable::embedded()
            .unwrap_or_else(|e| panic!("Failed to parse embedded globals JSON: {}", e))
    })
}

/// Install the process-wide table. Must happen before the first identifier is parsed.
pub fn install_global_table(table: GlobalTable) -> Result<()> {
    let count = table.len();
    GLOBAL_TABLE
        .set(table)
        .map_err(|_| XdmError::GlobalTable("global table already initialized".to_string()))?;
    tracing::info!("Installed global table with {} entries", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_snapshot_loads() {
        let table = GlobalTable::embedded().unwrap();
        assert!(!table.is_empty());

        let profile = table.get("xdm.context.profile").unwrap();
        assert_eq!(profile.kind, ResourceKind::Class);
        assert_eq!(profile.canonical_ref, "https://ns.adobe.com/xdm/context/profile");
    }

    #[test]
    fn test_embedded_snapshot_has_behaviors() {
        let table = GlobalTable::embedded().unwrap();
        for key in ["xdm.data.adhoc", "xdm.data.record", "xdm.data.time-series"] {
            assert_eq!(table.get(key).map(|e| e.kind), Some(ResourceKind::Behavior), "{key}");
        }
    }

    #[test]
    fn test_unknown_alias_is_rejected() {
        let result = GlobalTable::from_json(r#"{"xdm.foo.bar": ["widgets", "https://ns.adobe.com/xdm/foo/bar"]}"#);
        assert!(matches!(result, Err(XdmError::GlobalTable(_))));
    }

    #[test]
    fn test_to_json_roundtrip() {
        let mut table = GlobalTable::new();
        table.insert("xdm.context.profile", ResourceKind::Class, "https://ns.adobe.com/xdm/context/profile");
        table.insert("xdm.mixins.legacy", ResourceKind::FieldGroup, "https://ns.adobe.com/xdm/mixins/legacy");

        let reloaded = GlobalTable::from_json(&table.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.get("xdm.mixins.legacy").unwrap().kind, ResourceKind::FieldGroup);
    }

    #[test]
    fn test_global_table_is_initialized_from_snapshot() {
        assert!(global_table().get("xdm.context.profile").is_some());
    }
}
