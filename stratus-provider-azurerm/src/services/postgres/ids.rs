use std::fmt;

use stratus_core::resource_id::{IdParseError, ParseResult, ResourceIdentifier, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.DBforPostgreSQL/servers/{serverName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub server_name: String,
}

impl ServerId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            server_name: server_name.into(),
        }
    }
}

impl ResourceIdentifier for ServerId {
    const TYPE_NAME: &'static str = "Server";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
            Segment::literal("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftDBforPostgreSQL", "Microsoft.DBforPostgreSQL"),
            Segment::literal("staticServers", "servers"),
            Segment::user("serverName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.get("subscriptionId")?,
            parsed.get("resourceGroupName")?,
            parsed.get("serverName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DBforPostgreSQL/servers/{}",
            self.subscription_id, self.resource_group_name, self.server_name
        )
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Server (Subscription: {:?} / Resource Group Name: {:?} / Server Name: {:?})",
            self.subscription_id, self.resource_group_name, self.server_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.DBforPostgreSQL/servers/serverValue";

    #[test]
    fn parses_and_formats() {
        let id = ServerId::parse(ID).unwrap();
        assert_eq!(id.subscription_id, "12345678-1234-9876-4563-123456789012");
        assert_eq!(id.resource_group_name, "example-resource-group");
        assert_eq!(id.server_name, "serverValue");
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn rejects_incomplete_ids() {
        assert!(ServerId::parse("").is_err());
        assert!(ServerId::parse(&format!("{ID}/")).is_err());
        assert!(
            ServerId::parse(
                "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.DBforPostgreSQL/servers"
            )
            .is_err()
        );
        assert!(ServerId::parse(&format!("{ID}/extra")).is_err());
    }

    #[test]
    fn uppercase_parses_only_insensitively() {
        let upper = ID.to_uppercase();
        assert!(ServerId::parse(&upper).is_err());
        let id = ServerId::parse_insensitively(&upper).unwrap();
        assert_eq!(id.server_name, "SERVERVALUE");
        assert_eq!(id.resource_group_name, "EXAMPLE-RESOURCE-GROUP");
    }
}
