//! Scope identifiers shared by every Azure resource type

use std::fmt;

use super::{IdParseError, ParseResult, Parser, ResourceIdentifier, Segment};

/// `/subscriptions/{subscriptionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }
}

impl ResourceIdentifier for SubscriptionId {
    const TYPE_NAME: &'static str = "Subscription";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(parsed.get("subscriptionId")?))
    }

    fn id(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription (Subscription: {:?})", self.subscription_id)
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group_name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
        }
    }
}

impl ResourceIdentifier for ResourceGroupId {
    const TYPE_NAME: &'static str = "Resource Group";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
            Segment::literal("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.get("subscriptionId")?,
            parsed.get("resourceGroupName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group_name
        )
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resource Group (Subscription: {:?} / Resource Group Name: {:?})",
            self.subscription_id, self.resource_group_name
        )
    }
}

/// `/providers/Microsoft.Management/managementGroups/{managementGroupName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagementGroupId {
    pub management_group_name: String,
}

impl ManagementGroupId {
    pub fn new(management_group_name: impl Into<String>) -> Self {
        Self {
            management_group_name: management_group_name.into(),
        }
    }
}

impl ResourceIdentifier for ManagementGroupId {
    const TYPE_NAME: &'static str = "Management Group";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftManagement", "Microsoft.Management"),
            Segment::literal("staticManagementGroups", "managementGroups"),
            Segment::user("managementGroupName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(parsed.get("managementGroupName")?))
    }

    fn id(&self) -> String {
        format!(
            "/providers/Microsoft.Management/managementGroups/{}",
            self.management_group_name
        )
    }
}

impl fmt::Display for ManagementGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Management Group (Management Group Name: {:?})",
            self.management_group_name
        )
    }
}

/// Any resource below a subscription or a resource group:
/// `/subscriptions/{s}[/resourceGroups/{rg}]/providers/{namespace}/{type}/{name}[/{type}/{name}...]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedResourceId {
    pub subscription_id: String,
    /// `None` for resources that live directly below the subscription
    pub resource_group_name: Option<String>,
    /// Everything after `/providers/`, e.g. `Microsoft.Compute/virtualMachines/vm1`
    pub provider_path: String,
}

impl ScopedResourceId {
    pub fn id(&self) -> String {
        format!("{}/providers/{}", self.parent_id(), self.provider_path)
    }

    /// The subscription or resource group the resource lives in
    pub fn parent_id(&self) -> String {
        match &self.resource_group_name {
            Some(rg) => ResourceGroupId::new(&self.subscription_id, rg).id(),
            None => SubscriptionId::new(&self.subscription_id).id(),
        }
    }

    fn parse_with(input: &str, insensitively: bool) -> Result<Self, IdParseError> {
        const TYPE_NAME: &str = "Resource";
        const EXPECTED: &str = "/subscriptions/{subscriptionId}[/resourceGroups/{resourceGroupName}]/providers/{namespace}/{type}/{name}";

        let invalid = |message: &str| IdParseError::Invalid {
            id_type: TYPE_NAME.to_string(),
            input: input.to_string(),
            message: format!("{message}, expected the format `{EXPECTED}`"),
        };
        let literal_is = |actual: &str, literal: &str| {
            if insensitively {
                actual.eq_ignore_ascii_case(literal)
            } else {
                actual == literal
            }
        };

        let path = input
            .strip_prefix('/')
            .ok_or_else(|| invalid("the ID must begin with \"/\""))?;
        let components: Vec<&str> = path.split('/').collect();
        if components.iter().any(|c| c.is_empty()) {
            return Err(invalid("the ID contained an empty segment"));
        }

        let in_resource_group = components
            .get(2)
            .is_some_and(|c| literal_is(c, "resourceGroups"));
        // parent scope + providers/{ns} + one or more {type}/{name} pairs
        let providers_at = if in_resource_group { 4 } else { 2 };
        if components.len() < providers_at + 4 || components.len() % 2 != 0 {
            return Err(invalid("the number of segments didn't match"));
        }

        let parent_input = format!("/{}", components[..providers_at].join("/"));
        let (subscription_id, resource_group_name) = if in_resource_group {
            let rg = if insensitively {
                ResourceGroupId::parse_insensitively(&parent_input)?
            } else {
                ResourceGroupId::parse(&parent_input)?
            };
            (rg.subscription_id, Some(rg.resource_group_name))
        } else {
            let sub = if insensitively {
                SubscriptionId::parse_insensitively(&parent_input)?
            } else {
                SubscriptionId::parse(&parent_input)?
            };
            (sub.subscription_id, None)
        };

        let providers = components[providers_at];
        if !literal_is(providers, "providers") {
            return Err(IdParseError::LiteralMismatch {
                id_type: TYPE_NAME.to_string(),
                input: input.to_string(),
                segment: "staticProviders".to_string(),
                literal: "providers".to_string(),
                actual: providers.to_string(),
                expected: EXPECTED.to_string(),
            });
        }

        Ok(Self {
            subscription_id,
            resource_group_name,
            provider_path: components[providers_at + 1..].join("/"),
        })
    }
}

/// Where a scoped resource (budget, remediation, ...) applies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeId {
    Subscription(SubscriptionId),
    ResourceGroup(ResourceGroupId),
    ManagementGroup(ManagementGroupId),
    Resource(ScopedResourceId),
}

impl ScopeId {
    /// Parse a user-supplied or stored scope; literal segments are case-sensitive
    pub fn parse(input: &str) -> Result<Self, IdParseError> {
        Self::parse_with(input, false)
    }

    /// Parse a scope returned by the API; literal segments are case-insensitive
    pub fn parse_insensitively(input: &str) -> Result<Self, IdParseError> {
        Self::parse_with(input, true)
    }

    pub(crate) fn parse_with(input: &str, insensitively: bool) -> Result<Self, IdParseError> {
        let has_prefix = |prefix: &str| {
            if insensitively {
                input
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            } else {
                input.starts_with(prefix)
            }
        };

        if has_prefix("/providers/") {
            let parsed = Parser::new(ManagementGroupId::TYPE_NAME, ManagementGroupId::segments())
                .parse(input, insensitively)?;
            return ManagementGroupId::from_parse_result(&parsed).map(ScopeId::ManagementGroup);
        }

        if has_prefix("/subscriptions/") {
            let count = input.trim_start_matches('/').split('/').count();
            return match count {
                2 => {
                    let parsed = Parser::new(SubscriptionId::TYPE_NAME, SubscriptionId::segments())
                        .parse(input, insensitively)?;
                    SubscriptionId::from_parse_result(&parsed).map(ScopeId::Subscription)
                }
                4 => {
                    let parsed =
                        Parser::new(ResourceGroupId::TYPE_NAME, ResourceGroupId::segments())
                            .parse(input, insensitively)?;
                    ResourceGroupId::from_parse_result(&parsed).map(ScopeId::ResourceGroup)
                }
                _ => ScopedResourceId::parse_with(input, insensitively).map(ScopeId::Resource),
            };
        }

        if input.is_empty() {
            return Err(IdParseError::Empty {
                id_type: "Scope".to_string(),
                expected: "/subscriptions/{subscriptionId}[/resourceGroups/{resourceGroupName}][/providers/...] or /providers/Microsoft.Management/managementGroups/{managementGroupName}".to_string(),
            });
        }

        Err(IdParseError::Invalid {
            id_type: "Scope".to_string(),
            input: input.to_string(),
            message: "expected a subscription, resource group, resource or management group scope"
                .to_string(),
        })
    }

    /// Canonical scope string
    pub fn id(&self) -> String {
        match self {
            ScopeId::Subscription(id) => id.id(),
            ScopeId::ResourceGroup(id) => id.id(),
            ScopeId::ManagementGroup(id) => id.id(),
            ScopeId::Resource(id) => id.id(),
        }
    }

    /// Short description of the scope shape (used in error messages)
    pub fn kind(&self) -> &'static str {
        match self {
            ScopeId::Subscription(_) => "subscription",
            ScopeId::ResourceGroup(_) => "resource group",
            ScopeId::ManagementGroup(_) => "management group",
            ScopeId::Resource(_) => "resource",
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Subscription(id) => id.fmt(f),
            ScopeId::ResourceGroup(id) => id.fmt(f),
            ScopeId::ManagementGroup(id) => id.fmt(f),
            ScopeId::Resource(id) => write!(f, "Resource (ID: {:?})", id.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    #[test]
    fn subscription_round_trip() {
        let input = format!("/subscriptions/{SUB}");
        let id = SubscriptionId::parse(&input).unwrap();
        assert_eq!(id.subscription_id, SUB);
        assert_eq!(id.id(), input);
    }

    #[test]
    fn resource_group_round_trip() {
        let input = format!("/subscriptions/{SUB}/resourceGroups/group1");
        let id = ResourceGroupId::parse(&input).unwrap();
        assert_eq!(id.resource_group_name, "group1");
        assert_eq!(id.id(), input);
    }

    #[test]
    fn resource_group_case_handling() {
        let upper = format!("/SUBSCRIPTIONS/{SUB}/RESOURCEGROUPS/Group1");
        assert!(ResourceGroupId::parse(&upper).is_err());
        let id = ResourceGroupId::parse_insensitively(&upper).unwrap();
        assert_eq!(id.resource_group_name, "Group1");
        assert_eq!(id.id(), format!("/subscriptions/{SUB}/resourceGroups/Group1"));
    }

    #[test]
    fn management_group_round_trip() {
        let input = "/providers/Microsoft.Management/managementGroups/mg1";
        let id = ManagementGroupId::parse(input).unwrap();
        assert_eq!(id.management_group_name, "mg1");
        assert_eq!(id.id(), input);
    }

    #[test]
    fn scope_variants() {
        assert!(matches!(
            ScopeId::parse(&format!("/subscriptions/{SUB}")).unwrap(),
            ScopeId::Subscription(_)
        ));
        assert!(matches!(
            ScopeId::parse(&format!("/subscriptions/{SUB}/resourceGroups/rg")).unwrap(),
            ScopeId::ResourceGroup(_)
        ));
        assert!(matches!(
            ScopeId::parse("/providers/Microsoft.Management/managementGroups/mg").unwrap(),
            ScopeId::ManagementGroup(_)
        ));

        let vm = format!(
            "/subscriptions/{SUB}/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1"
        );
        match ScopeId::parse(&vm).unwrap() {
            ScopeId::Resource(r) => {
                assert_eq!(r.provider_path, "Microsoft.Compute/virtualMachines/vm1");
                assert_eq!(r.resource_group_name.as_deref(), Some("rg"));
                assert_eq!(r.id(), vm);
            }
            other => panic!("unexpected scope {other:?}"),
        }
    }

    #[test]
    fn scope_resource_below_subscription() {
        let budget = format!(
            "/subscriptions/{SUB}/providers/Microsoft.Consumption/budgets/monthly"
        );
        match ScopeId::parse(&budget).unwrap() {
            ScopeId::Resource(r) => {
                assert_eq!(r.subscription_id, SUB);
                assert_eq!(r.resource_group_name, None);
                assert_eq!(r.provider_path, "Microsoft.Consumption/budgets/monthly");
                assert_eq!(r.parent_id(), format!("/subscriptions/{SUB}"));
                assert_eq!(r.id(), budget);
            }
            other => panic!("unexpected scope {other:?}"),
        }

        let upper = format!("/SUBSCRIPTIONS/{SUB}/PROVIDERS/Microsoft.Consumption/budgets/monthly");
        assert!(ScopeId::parse(&upper).is_err());
        assert_eq!(ScopeId::parse_insensitively(&upper).unwrap().id(), budget);

        assert!(ScopeId::parse(&format!("/subscriptions/{SUB}/providers/Microsoft.Consumption")).is_err());
        assert!(
            ScopeId::parse(&format!("/subscriptions/{SUB}/locations/westeurope/budgets/monthly"))
                .is_err()
        );
    }

    #[test]
    fn scope_rejects_garbage() {
        assert!(ScopeId::parse("").is_err());
        assert!(ScopeId::parse("/tenants/abc").is_err());
        assert!(ScopeId::parse(&format!("/subscriptions/{SUB}/resourceGroups/")).is_err());
        assert!(
            ScopeId::parse(&format!("/subscriptions/{SUB}/resourceGroups/rg/providers/Microsoft.Compute"))
                .is_err()
        );
    }

    #[test]
    fn scope_insensitive_resource_keeps_provider_path() {
        let upper = format!(
            "/SUBSCRIPTIONS/{SUB}/RESOURCEGROUPS/rg/PROVIDERS/Microsoft.Compute/virtualMachines/vm1"
        );
        assert!(ScopeId::parse(&upper).is_err());
        let scope = ScopeId::parse_insensitively(&upper).unwrap();
        assert_eq!(
            scope.id(),
            format!("/subscriptions/{SUB}/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1")
        );
    }
}
