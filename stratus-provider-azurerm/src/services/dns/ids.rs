use std::fmt;

use stratus_core::resource_id::{IdParseError, ParseResult, ResourceIdentifier, Segment};

/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/dnsZones/{dnsZoneName}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsZoneId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub dns_zone_name: String,
}

impl DnsZoneId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        dns_zone_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            dns_zone_name: dns_zone_name.into(),
        }
    }
}

impl ResourceIdentifier for DnsZoneId {
    const TYPE_NAME: &'static str = "DNS Zone";

    fn segments() -> Vec<Segment> {
        vec![
            Segment::literal("staticSubscriptions", "subscriptions"),
            Segment::subscription("subscriptionId"),
            Segment::literal("staticResourceGroups", "resourceGroups"),
            Segment::resource_group("resourceGroupName"),
            Segment::literal("staticProviders", "providers"),
            Segment::provider("staticMicrosoftNetwork", "Microsoft.Network"),
            Segment::literal("staticDnsZones", "dnsZones"),
            Segment::user("dnsZoneName"),
        ]
    }

    fn from_parse_result(parsed: &ParseResult) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.get("subscriptionId")?,
            parsed.get("resourceGroupName")?,
            parsed.get("dnsZoneName")?,
        ))
    }

    fn id(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones/{}",
            self.subscription_id, self.resource_group_name, self.dns_zone_name
        )
    }
}

impl fmt::Display for DnsZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DNS Zone (Subscription: {:?} / Resource Group Name: {:?} / Dns Zone Name: {:?})",
            self.subscription_id, self.resource_group_name, self.dns_zone_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.Network/dnsZones/contoso.com";

    #[test]
    fn parses_and_formats() {
        let id = DnsZoneId::parse(ID).unwrap();
        assert_eq!(id.resource_group_name, "example-resource-group");
        assert_eq!(id.dns_zone_name, "contoso.com");
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn dns_zones_segment_is_case_sensitive() {
        let lowered = ID.replace("dnsZones", "dnszones");
        assert!(DnsZoneId::parse(&lowered).is_err());
        let id = DnsZoneId::parse_insensitively(&lowered).unwrap();
        assert_eq!(id.id(), ID);
    }

    #[test]
    fn display_names_every_segment() {
        let id = DnsZoneId::new("sub", "rg", "contoso.com");
        assert_eq!(
            id.to_string(),
            "DNS Zone (Subscription: \"sub\" / Resource Group Name: \"rg\" / Dns Zone Name: \"contoso.com\")"
        );
    }
}
