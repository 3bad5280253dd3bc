//! `azurerm_dns_zone` data source

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource_id::ResourceIdentifier;
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::DnsZoneId;
use super::zone::{Zone, computed_attributes, flatten};
use crate::registration::{Attributes, AzureDataSource, ProviderContext, decode, encode, from_body};

#[derive(Debug, Deserialize)]
struct Lookup {
    name: String,
    #[serde(default)]
    resource_group_name: Option<String>,
}

pub struct DnsZoneDataSource;

impl DnsZoneDataSource {
    /// Find a zone by name anywhere in the subscription
    async fn find_in_subscription(
        &self,
        ctx: &ProviderContext,
        name: &str,
    ) -> ProviderResult<(DnsZoneId, Json)> {
        let path = format!(
            "/subscriptions/{}/providers/Microsoft.Network/dnszones",
            ctx.subscription_id
        );
        let zones = ctx
            .client
            .list(&path, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("listing DNS Zones in subscription {:?}", ctx.subscription_id)))?;

        for zone in zones {
            if zone.get("name").and_then(Json::as_str) != Some(name) {
                continue;
            }
            let raw_id = zone.get("id").and_then(Json::as_str).unwrap_or_default();
            let id = DnsZoneId::parse_insensitively(raw_id).map_err(ProviderError::invalid_id)?;
            return Ok((id, zone));
        }

        Err(ProviderError::not_found(format!(
            "DNS Zone {:?} was not found in subscription {:?}",
            name, ctx.subscription_id
        )))
    }
}

#[async_trait]
impl AzureDataSource for DnsZoneDataSource {
    fn type_name(&self) -> &'static str {
        "azurerm_dns_zone"
    }

    fn schema(&self) -> ResourceSchema {
        let schema = ResourceSchema::new(self.type_name())
            .with_description("Look up an existing DNS zone")
            .attribute(AttributeSchema::new("name", types::non_empty_string()).required())
            .attribute(
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("tags", AttributeType::map(AttributeType::String)).computed(),
            );
        computed_attributes(schema)
    }

    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &Attributes,
    ) -> ProviderResult<(String, Attributes)> {
        let lookup: Lookup = decode(config)?;

        let (id, body) = match lookup.resource_group_name {
            Some(resource_group_name) => {
                let id = DnsZoneId::new(&ctx.subscription_id, resource_group_name, &lookup.name);
                let body = ctx
                    .client
                    .get(&id.id(), API_VERSION)
                    .await
                    .map_err(|e| e.wrap(format!("retrieving {}", id)))?
                    .ok_or_else(|| ProviderError::not_found(format!("{} was not found", id)))?;
                (id, body)
            }
            None => self.find_in_subscription(ctx, &lookup.name).await?,
        };

        let zone: Zone = from_body(body)?;
        let attributes = encode(&flatten(&id, zone))?;
        Ok((id.id(), attributes))
    }
}
