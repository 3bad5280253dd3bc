use std::fmt;

use stratus_core::resource_id::{IdParseError, ParseResult, ResourceIdentifier, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Web/serverFarms/{serverFarmName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServicePlanId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub server_farm_name: String,
}

impl ServicePlanId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        server_farm_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            server_farm_name: server_farm_name.into(),
        }
    }
}

impl ResourceIdentifier for ServicePlanId {
    const TYPE_NAME: &'static str = "App Service Plan";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
            Segment::literal("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftWeb", "Microsoft.Web"),
            Segment::literal("staticServerFarms", "serverFarms"),
            Segment::user("serverFarmName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.get("subscriptionId")?,
            parsed.get("resourceGroupName")?,
            parsed.get("serverFarmName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/serverFarms/{}",
            self.subscription_id, self.resource_group_name, self.server_farm_name
        )
    }
}

impl fmt::Display for ServicePlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "App Service Plan (Subscription: {:?} / Resource Group Name: {:?} / Server Farm Name: {:?})",
            self.subscription_id, self.resource_group_name, self.server_farm_name
        )
    }
}

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Web/hostingEnvironments/{hostingEnvironmentName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppServiceEnvironmentId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub hosting_environment_name: String,
}

impl ResourceIdentifier for AppServiceEnvironmentId {
    const TYPE_NAME: &'static str = "App Service Environment";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
            Segment::literal("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftWeb", "Microsoft.Web"),
            Segment::literal("staticHostingEnvironments", "hostingEnvironments"),
            Segment::user("hostingEnvironmentName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self {
            subscription_id: parsed.get("subscriptionId")?.to_string(),
            resource_group_name: parsed.get("resourceGroupName")?.to_string(),
            hosting_environment_name: parsed.get("hostingEnvironmentName")?.to_string(),
        })
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/hostingEnvironments/{}",
            self.subscription_id, self.resource_group_name, self.hosting_environment_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.Web/serverFarms/serverFarmValue";

    #[test]
    fn parses_and_formats() {
        let id = ServicePlanId::parse(ID).unwrap();
        assert_eq!(id.server_farm_name, "serverFarmValue");
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn server_farms_literal_is_case_sensitive() {
        // the API reports plans under `serverfarms`
        let lowered = ID.replace("serverFarms", "serverfarms");
        assert!(ServicePlanId::parse(&lowered).is_err());
        assert_eq!(ServicePlanId::parse_insensitively(&lowered).unwrap().id(), ID);
    }

    #[test]
    fn rejects_other_resource_types() {
        let ase = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Web/hostingEnvironments/ase1";
        assert!(ServicePlanId::parse(ase).is_err());
        assert_eq!(AppServiceEnvironmentId::parse(ase).unwrap().hosting_environment_name, "ase1");
    }
}
