use std::fmt;

use stratus_core::resource_id::{IdParseError, ParseResult, ResourceIdentifier, ScopeId, Segment};

/// `{scope}/providers/Microsoft.Consumption/budgets/{budgetName}`
///
/// The scope is a subscription, resource group or management group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BudgetId {
    pub scope: String,
    pub budget_name: String,
}

impl BudgetId {
    pub fn new(scope: impl Into<String>, budget_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            budget_name: budget_name.into(),
        }
    }

    /// The typed scope this budget applies to
    pub fn scope_id(&self) -> Result<ScopeId, IdParseError> {
        ScopeId::parse(&self.scope)
    }
}

impl ResourceIdentifier for BudgetId {
    const TYPE_NAME: &'static str = "Budget";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::scope("scope"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftConsumption", "Microsoft.Consumption"),
            Segment::literal("staticBudgets", "budgets"),
            Segment::user("budgetName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        let raw_scope = parsed.get("scope")?;
        // the scope's own literals follow the same casing rules as the rest of the ID
        let scope = if parsed.insensitively {
            ScopeId::parse_insensitively(raw_scope)?
        } else {
            ScopeId::parse(raw_scope)?
        };
        Ok(Self::new(scope.id(), parsed.get("budgetName")?))
    }

    fn id(&self) -> String {
        format!(
            "{}/providers/Microsoft.Consumption/budgets/{}",
            self.scope, self.budget_name
        )
    }
}

impl fmt::Display for BudgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Budget (Scope: {:?} / Budget Name: {:?})",
            self.scope, self.budget_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::resource_id::ManagementGroupId;

    const RG_BUDGET: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/foo/providers/Microsoft.Consumption/budgets/budget1";
    const MG_BUDGET: &str = "/providers/Microsoft.Management/managementGroups/12345678-1234-9876-4563-123456789012/providers/Microsoft.Consumption/budgets/budget1";

    #[test]
    fn parses_resource_group_budget() {
        let id = BudgetId::parse(RG_BUDGET).unwrap();
        assert_eq!(id.budget_name, "budget1");
        assert_eq!(
            id.scope,
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/foo"
        );
        assert!(matches!(id.scope_id(), Ok(ScopeId::ResourceGroup(_))));
    }

    #[test]
    fn management_group_budget_round_trips() {
        let id = BudgetId::parse(MG_BUDGET).unwrap();
        assert_eq!(id.budget_name, "budget1");
        assert_eq!(
            id.scope_id().unwrap(),
            ScopeId::ManagementGroup(ManagementGroupId::new(
                "12345678-1234-9876-4563-123456789012"
            ))
        );
        assert_eq!(id.id(), MG_BUDGET);
    }

    #[test]
    fn subscription_budget_round_trips() {
        let input = "/subscriptions/00000000-0000-0000-0000-000000000000/providers/Microsoft.Consumption/budgets/budget1";
        assert_eq!(BudgetId::parse(input).unwrap().id(), input);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(BudgetId::parse("").is_err());
        assert!(BudgetId::parse(&format!("{RG_BUDGET}/")).is_err());
        assert!(
            BudgetId::parse(
                "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/foo/providers/Microsoft.Consumption/budgets/"
            )
            .is_err()
        );
        // scope must be a subscription, resource group or management group path
        assert!(BudgetId::parse("/foo/providers/Microsoft.Consumption/budgets/budget1").is_err());
    }

    #[test]
    fn uppercase_parses_only_insensitively() {
        let upper = RG_BUDGET.to_uppercase();
        assert!(BudgetId::parse(&upper).is_err());
        let id = BudgetId::parse_insensitively(&upper).unwrap();
        assert_eq!(id.budget_name, "BUDGET1");
        assert_eq!(
            id.id(),
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/FOO/providers/Microsoft.Consumption/budgets/BUDGET1"
        );
    }

    #[test]
    fn display() {
        let id = BudgetId::new("/subscriptions/sub", "b1");
        assert_eq!(
            id.to_string(),
            "Budget (Scope: \"/subscriptions/sub\" / Budget Name: \"b1\")"
        );
    }
}
