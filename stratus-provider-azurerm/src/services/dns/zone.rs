//! `azurerm_dns_zone`

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::provider::ProviderResult;
use stratus_core::resource_id::{IdParseError, ResourceIdentifier};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::DnsZoneId;
use crate::registration::{
    Attributes, AzureResource, ProviderContext, decode, encode, from_body, parse_id, to_body,
};

/// Configuration and state of a DNS zone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsZoneModel {
    pub name: String,
    pub resource_group_name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
}

/// `Microsoft.Network/dnsZones` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: ZoneProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<String>,
}

pub fn expand(model: &DnsZoneModel) -> Zone {
    Zone {
        location: "global".to_string(),
        tags: Some(model.tags.clone()),
        properties: ZoneProperties {
            zone_type: Some("Public".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn flatten(id: &DnsZoneId, zone: Zone) -> DnsZoneModel {
    DnsZoneModel {
        name: id.dns_zone_name.clone(),
        resource_group_name: id.resource_group_name.clone(),
        tags: zone.tags.unwrap_or_default(),
        number_of_record_sets: zone.properties.number_of_record_sets,
        max_number_of_record_sets: zone.properties.max_number_of_record_sets,
        name_servers: zone.properties.name_servers.unwrap_or_default(),
    }
}

pub(super) fn computed_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(AttributeSchema::new("number_of_record_sets", AttributeType::Int).computed())
        .attribute(
            AttributeSchema::new("max_number_of_record_sets", AttributeType::Int).computed(),
        )
        .attribute(
            AttributeSchema::new("name_servers", AttributeType::set(AttributeType::String))
                .computed(),
        )
}

pub struct DnsZoneResource;

#[async_trait]
impl AzureResource for DnsZoneResource {
    fn type_name(&self) -> &'static str {
        "azurerm_dns_zone"
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(self.type_name())
            .with_description("A public DNS zone")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()));
        computed_attributes(schema)
    }

    fn id_format(&self) -> String {
        DnsZoneId::expected_format()
    }

    fn validate_id(&self, id: &str) -> Result<(), IdParseError> {
        DnsZoneId::parse(id).map(|_| ())
    }

    fn id_from_config(&self, ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String> {
        let model: DnsZoneModel = decode(config)?;
        Ok(DnsZoneId::new(&ctx.subscription_id, model.resource_group_name, model.name).id())
    }

    async fn create(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let zone_id: DnsZoneId = parse_id(id)?;
        let model: DnsZoneModel = decode(config)?;
        let body = to_body(&expand(&model))?;
        ctx.client
            .put(id, API_VERSION, &body)
            .await
            .map_err(|e| e.wrap(format!("creating {}", zone_id)))?;
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        let zone_id: DnsZoneId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", zone_id)))?
        else {
            return Ok(None);
        };
        let zone: Zone = from_body(body)?;
        encode(&flatten(&zone_id, zone)).map(Some)
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        id: &str,
        _previous: &Attributes,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let zone_id: DnsZoneId = parse_id(id)?;
        let model: DnsZoneModel = decode(config)?;
        let body = to_body(&expand(&model))?;
        ctx.client
            .put(id, API_VERSION, &body)
            .await
            .map_err(|e| e.wrap(format!("updating {}", zone_id)))?;
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<()> {
        let zone_id: DnsZoneId = parse_id(id)?;
        ctx.client
            .delete_then_poll(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("deleting {}", zone_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expand_is_always_global_and_public() {
        let model = DnsZoneModel {
            name: "contoso.com".into(),
            resource_group_name: "rg".into(),
            tags: HashMap::from([("env".to_string(), "test".to_string())]),
            ..Default::default()
        };
        let body = serde_json::to_value(expand(&model)).unwrap();
        assert_eq!(
            body,
            json!({
                "location": "global",
                "tags": {"env": "test"},
                "properties": {"zoneType": "Public"}
            })
        );
    }

    #[test]
    fn flatten_reads_counts_and_name_servers() {
        let zone: Zone = serde_json::from_value(json!({
            "id": "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/dnszones/contoso.com",
            "location": "global",
            "tags": null,
            "properties": {
                "maxNumberOfRecordSets": 10000,
                "numberOfRecordSets": 2,
                "nameServers": ["ns1-01.azure-dns.com.", "ns2-01.azure-dns.net."]
            }
        }))
        .unwrap();
        let id = DnsZoneId::new("sub", "rg", "contoso.com");
        let model = flatten(&id, zone);
        assert_eq!(model.name, "contoso.com");
        assert_eq!(model.number_of_record_sets, Some(2));
        assert_eq!(model.max_number_of_record_sets, Some(10000));
        assert_eq!(model.name_servers.len(), 2);
        assert!(model.tags.is_empty());
    }

    #[test]
    fn schema_rejects_computed_attributes() {
        let mut config = Attributes::new();
        config.insert("name".into(), "contoso.com".into());
        config.insert("resource_group_name".into(), "rg".into());
        assert!(DnsZoneResource.schema().validate(&config).is_ok());

        config.insert("number_of_record_sets".into(), stratus_core::resource::Value::Int(1));
        assert!(DnsZoneResource.schema().validate(&config).is_err());
    }
}
