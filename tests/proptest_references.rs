//! Property-based tests using proptest
//!
//! These tests check that both identifier notations resolve to the same
//! reference, that the global table always wins for its keys, and that
//! malformed identifiers are rejected rather than guessed at.

use proptest::prelude::*;
use xdm_registry::registry::{Container, GlobalTable, ResourceKind};
use xdm_registry::XdmError;

/// Generate a kind alias as it may appear in the middle segment
fn arb_alias() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("datatypes"),
        Just("mixins"),
        Just("fieldgroups"),
        Just("schemas"),
        Just("classes"),
        Just("data"),
        Just("behaviors"),
    ]
}

fn arb_kind() -> impl Strategy<Value = ResourceKind> {
    prop::sample::select(ResourceKind::ALL.to_vec())
}

/// Generate a tenant identifier as (tenant, alias, uuid)
fn arb_tenant_parts() -> impl Strategy<Value = (String, &'static str, String)> {
    ("[a-z][a-z0-9]{0,15}", arb_alias(), "[a-f0-9]{1,32}")
}

/// Generate a dotted global key with two to four segments
fn arb_global_key() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z-]{0,9}", 2..=4).prop_map(|segments| segments.join("."))
}

proptest! {
    /// Short id and canonical ref of a tenant resource parse to the same reference
    #[test]
    fn tenant_notations_agree((tenant, alias, uuid) in arb_tenant_parts()) {
        let table = GlobalTable::new();
        let short = table.parse(&format!("_{}.{}.{}", tenant, alias, uuid)).unwrap();
        let canonical = table
            .parse(&format!("https://ns.adobe.com/{}/{}/{}", tenant, alias, uuid))
            .unwrap();

        prop_assert_eq!(&short, &canonical);
        prop_assert_eq!(short.container(), Container::Tenant);
        prop_assert_eq!(short.tenant(), Some(tenant.as_str()));
        prop_assert_eq!(short.uuid(), uuid.as_str());
    }

    /// Every alias resolves to its kind, legacy spellings included
    #[test]
    fn tenant_alias_normalizes((tenant, alias, uuid) in arb_tenant_parts()) {
        let table = GlobalTable::new();
        let reference = table.parse(&format!("_{}.{}.{}", tenant, alias, uuid)).unwrap();
        prop_assert_eq!(Some(reference.kind()), ResourceKind::from_alias(alias));
    }

    /// Re-parsing either rendered notation gives back the same reference
    #[test]
    fn rendered_notations_reparse((tenant, alias, uuid) in arb_tenant_parts()) {
        let table = GlobalTable::new();
        let reference = table.parse(&format!("_{}.{}.{}", tenant, alias, uuid)).unwrap();

        prop_assert_eq!(&table.parse(reference.short_id()).unwrap(), &reference);
        prop_assert_eq!(&table.parse(reference.canonical_ref()).unwrap(), &reference);
        prop_assert_eq!(reference.to_string(), reference.canonical_ref());
    }

    /// Keys in the global table always parse as global with the listed kind
    #[test]
    fn global_entries_are_global(key in arb_global_key(), kind in arb_kind()) {
        let canonical_ref = format!("https://ns.adobe.com/{}", key.replace('.', "/"));
        let mut table = GlobalTable::new();
        table.insert(key.clone(), kind, canonical_ref.clone());

        for identifier in [format!("_{}", key), canonical_ref.clone()] {
            let reference = table.parse(&identifier).unwrap();
            prop_assert_eq!(reference.container(), Container::Global);
            prop_assert_eq!(reference.kind(), kind);
            prop_assert_eq!(reference.tenant(), None);
            prop_assert_eq!(reference.canonical_ref(), canonical_ref.as_str());
        }
    }

    /// Identifiers in neither notation are rejected
    #[test]
    fn unprefixed_identifiers_are_unparseable(identifier in "[a-z0-9][a-z0-9./]{0,30}") {
        let result = GlobalTable::new().parse(&identifier);
        prop_assert!(matches!(result, Err(XdmError::UnparseableReference(_))));
    }

    /// Unknown aliases are rejected rather than guessed at
    #[test]
    fn unknown_alias_is_unparseable(
        (tenant, _, uuid) in arb_tenant_parts(),
        alias in "[a-z]{3,10}".prop_filter("known alias", |a| ResourceKind::from_alias(a).is_none()),
    ) {
        let result = GlobalTable::new().parse(&format!("_{}.{}.{}", tenant, alias, uuid));
        prop_assert!(matches!(result, Err(XdmError::UnparseableReference(_))));
    }

    /// Tenant identifiers with extra segments are not silently truncated
    #[test]
    fn extra_segments_are_unparseable(
        (tenant, alias, uuid) in arb_tenant_parts(),
        extra in "[a-z0-9]{1,8}",
    ) {
        let identifier = format!("_{}.{}.{}.{}", tenant, alias, uuid, extra);
        let result = GlobalTable::new().parse(&identifier);
        prop_assert!(matches!(result, Err(XdmError::UnparseableReference(_))));
    }
}
