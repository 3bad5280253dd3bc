//! Property-based tests for the typed resource IDs

use proptest::prelude::*;
use stratus_core::resource_id::{ResourceIdentifier, ScopeId};
use stratus_provider_azurerm::services::consumption::BudgetId;
use stratus_provider_azurerm::services::dns::DnsZoneId;
use stratus_provider_azurerm::services::policy::{PolicyAssignmentId, RemediationId};
use stratus_provider_azurerm::services::postgres::ServerId;
use stratus_provider_azurerm::services::web::ServicePlanId;

/// A user-supplied ID segment: never empty and never containing `/`
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9._-]{0,30}"
}

fn arb_scope() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_name().prop_map(|s| format!("/subscriptions/{s}")),
        (arb_name(), arb_name()).prop_map(|(s, rg)| format!("/subscriptions/{s}/resourceGroups/{rg}")),
        arb_name().prop_map(|mg| format!("/providers/Microsoft.Management/managementGroups/{mg}")),
    ]
}

#[test]
fn empty_input_is_rejected_by_every_identifier() {
    assert!(BudgetId::parse("").is_err());
    assert!(DnsZoneId::parse("").is_err());
    assert!(ServerId::parse("").is_err());
    assert!(ServicePlanId::parse("").is_err());
    assert!(RemediationId::parse("").is_err());
    assert!(PolicyAssignmentId::parse("").is_err());
    assert!(ScopeId::parse_insensitively("").is_err());
}

proptest! {
    #[test]
    fn dns_zone_ids_round_trip(sub in arb_name(), rg in arb_name(), zone in arb_name()) {
        let id = DnsZoneId::new(&sub, &rg, &zone);
        let parsed = DnsZoneId::parse(&id.id()).unwrap();
        prop_assert_eq!(parsed, id);
    }

    #[test]
    fn postgres_ids_round_trip(sub in arb_name(), rg in arb_name(), server in arb_name()) {
        let id = ServerId::new(&sub, &rg, &server);
        prop_assert_eq!(ServerId::parse(&id.id()).unwrap(), id);
    }

    #[test]
    fn service_plan_ids_parse_insensitively(sub in arb_name(), rg in arb_name(), plan in arb_name()) {
        let upper = ServicePlanId::new(&sub, &rg, &plan).id().to_uppercase();
        let parsed = ServicePlanId::parse_insensitively(&upper).unwrap();
        prop_assert_eq!(parsed.server_farm_name, plan.to_uppercase());
        prop_assert_eq!(parsed.resource_group_name, rg.to_uppercase());
    }

    #[test]
    fn trailing_segments_are_rejected(sub in arb_name(), rg in arb_name(), server in arb_name(), extra in arb_name()) {
        let id = ServerId::new(&sub, &rg, &server).id();
        let with_extra = ServerId::parse(&format!("{id}/{extra}")).is_err();
        let with_separator = ServerId::parse(&format!("{id}/")).is_err();
        prop_assert!(with_extra);
        prop_assert!(with_separator);
    }

    #[test]
    fn budget_scopes_survive_a_round_trip(scope in arb_scope(), name in arb_name()) {
        let id = BudgetId::new(&scope, &name);
        let parsed = BudgetId::parse(&id.id()).unwrap();
        prop_assert_eq!(&parsed.scope, &scope);
        prop_assert_eq!(parsed.scope_id().unwrap().id(), scope);
    }

    #[test]
    fn remediations_on_resources_keep_their_scope(
        sub in arb_name(),
        rg in arb_name(),
        vm in arb_name(),
        name in arb_name(),
    ) {
        let scope = format!("/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{vm}");
        let id = RemediationId::new(&scope, &name);
        let parsed = RemediationId::parse(&id.id()).unwrap();
        prop_assert_eq!(&parsed.remediation_name, &name);
        prop_assert!(matches!(parsed.scope_id(), Ok(ScopeId::Resource(_))));
    }

    #[test]
    fn remediations_on_subscription_level_resources_keep_their_scope(
        sub in arb_name(),
        budget in arb_name(),
        name in arb_name(),
    ) {
        let scope = format!("/subscriptions/{sub}/providers/Microsoft.Consumption/budgets/{budget}");
        let id = RemediationId::new(&scope, &name);
        let parsed = RemediationId::parse(&id.id()).unwrap();
        prop_assert_eq!(&parsed.scope, &scope);
        let resource = match parsed.scope_id() {
            Ok(ScopeId::Resource(resource)) => resource,
            other => return Err(TestCaseError::fail(format!("unexpected scope {other:?}"))),
        };
        prop_assert_eq!(resource.resource_group_name.clone(), None);
        prop_assert_eq!(resource.id(), scope);
    }

    #[test]
    fn parsing_arbitrary_input_never_panics(input in ".{0,200}") {
        let _ = DnsZoneId::parse(&input);
        let _ = BudgetId::parse_insensitively(&input);
        let _ = RemediationId::parse(&input);
    }
}
