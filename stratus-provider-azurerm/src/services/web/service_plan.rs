//! `azurerm_service_plan`

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use stratus_core::provider::{ProviderResult, Timeouts};
use stratus_core::resource::Value;
use stratus_core::resource_id::{IdParseError, ResourceIdentifier};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::{AppServiceEnvironmentId, ServicePlanId};
use crate::registration::{
    Attributes, AzureResource, ProviderContext, decode, encode, from_body, parse_id, to_body,
};
use crate::utils::{
    expand_tags, flatten_tags, ignore_case_equivalent, location_equivalent, normalize_location,
};

pub const SKU_NAMES: &[&str] = &[
    "B1", "B2", "B3", "D1", "F1", "I1", "I2", "I3", "I1v2", "I2v2", "I3v2", "I4v2", "I5v2",
    "I6v2", "P1v2", "P2v2", "P3v2", "P0v3", "P1v3", "P2v3", "P3v3", "P1mv3", "P2mv3", "P3mv3",
    "P4mv3", "P5mv3", "S1", "S2", "S3", "SHARED", "EP1", "EP2", "EP3", "FC1", "WS1", "WS2",
    "WS3", "Y1",
];

string_enum!(
    OsType {
        Linux => "Linux",
        Windows => "Windows",
        WindowsContainer => "WindowsContainer",
    }
);

/// Elastic Premium and Workflow Standard plans scale out on demand
pub fn is_elastic_sku(sku_name: &str) -> bool {
    sku_name.starts_with("EP") || sku_name.starts_with("WS")
}

// =============================================================================
// Configuration model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlanModel {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub os_type: String,
    pub sku_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_service_environment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_elastic_worker_count: Option<i64>,
    #[serde(default)]
    pub per_site_scaling_enabled: bool,
    #[serde(default)]
    pub zone_balancing_enabled: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<bool>,
}

// =============================================================================
// API payload
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Json>,
    #[serde(default)]
    pub properties: AppServicePlanProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppServicePlanProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosting_environment_profile: Option<HostingEnvironmentProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_site_scaling: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<bool>,
    #[serde(rename = "hyperV", default, skip_serializing_if = "Option::is_none")]
    pub hyper_v: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_redundant: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_elastic_worker_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostingEnvironmentProfile {
    pub id: String,
}

// =============================================================================
// Expand / flatten
// =============================================================================

pub fn expand(model: &ServicePlanModel) -> AppServicePlan {
    let mut properties = AppServicePlanProperties {
        per_site_scaling: Some(model.per_site_scaling_enabled),
        zone_redundant: Some(model.zone_balancing_enabled),
        hosting_environment_profile: model
            .app_service_environment_id
            .as_ref()
            .map(|id| HostingEnvironmentProfile { id: id.clone() }),
        ..Default::default()
    };

    let kind = match OsType::parse(&model.os_type) {
        OsType::Linux => {
            properties.reserved = Some(true);
            "linux"
        }
        OsType::WindowsContainer => {
            properties.hyper_v = Some(true);
            properties.reserved = Some(false);
            "xenon"
        }
        OsType::Windows | OsType::Other(_) => {
            properties.reserved = Some(false);
            "Windows"
        }
    };

    if is_elastic_sku(&model.sku_name) {
        properties.maximum_elastic_worker_count = model.maximum_elastic_worker_count;
    }

    AppServicePlan {
        location: normalize_location(&model.location),
        kind: Some(kind.to_string()),
        sku: Some(SkuDescription {
            name: model.sku_name.clone(),
            capacity: model.worker_count,
        }),
        tags: Some(expand_tags(&model.tags)),
        properties,
        ..Default::default()
    }
}

pub fn flatten(id: &ServicePlanId, plan: AppServicePlan) -> ServicePlanModel {
    let props = plan.properties;
    let reserved = props.reserved.unwrap_or(false);
    let os_type = if reserved {
        OsType::Linux
    } else if props.hyper_v.unwrap_or(false) {
        OsType::WindowsContainer
    } else {
        OsType::Windows
    };
    let sku = plan.sku.unwrap_or_default();
    let maximum_elastic_worker_count = props
        .maximum_elastic_worker_count
        .filter(|_| is_elastic_sku(&sku.name));

    ServicePlanModel {
        name: id.server_farm_name.clone(),
        resource_group_name: id.resource_group_name.clone(),
        location: normalize_location(&plan.location),
        os_type: os_type.to_string(),
        app_service_environment_id: props.hosting_environment_profile.map(|p| p.id),
        worker_count: sku.capacity,
        maximum_elastic_worker_count,
        sku_name: sku.name,
        per_site_scaling_enabled: props.per_site_scaling.unwrap_or(false),
        zone_balancing_enabled: props.zone_redundant.unwrap_or(false),
        tags: flatten_tags(plan.tags.as_ref()),
        kind: plan.kind,
        reserved: Some(reserved),
    }
}

// =============================================================================
// Resource
// =============================================================================

pub struct ServicePlanResource;

impl ServicePlanResource {
    async fn put(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
        action: &str,
    ) -> ProviderResult<()> {
        let plan_id: ServicePlanId = parse_id(id)?;
        let model: ServicePlanModel = decode(config)?;
        ctx.client
            .put_then_poll(id, API_VERSION, &to_body(&expand(&model))?)
            .await
            .map_err(|e| e.wrap(format!("{} {}", action, plan_id)))
    }
}

#[async_trait]
impl AzureResource for ServicePlanResource {
    fn type_name(&self) -> &'static str {
        "azurerm_service_plan"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .with_description("An App Service plan (server farm)")
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
            .attribute(
                AttributeSchema::new("location", types::location())
                    .required()
                    .force_new()
                    .with_equivalence(location_equivalent),
            )
            .attribute(
                AttributeSchema::new("os_type", types::string_in_slice(OsType::possible_values(), false))
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("sku_name", types::string_in_slice(SKU_NAMES, false)).required(),
            )
            .attribute(
                AttributeSchema::new(
                    "app_service_environment_id",
                    types::resource_id::<AppServiceEnvironmentId>(),
                )
                .force_new()
                .with_equivalence(ignore_case_equivalent),
            )
            .attribute(AttributeSchema::new("worker_count", types::int_at_least(1)).optional_computed())
            .attribute(
                AttributeSchema::new("maximum_elastic_worker_count", types::int_at_least(1))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("per_site_scaling_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false)),
            )
            .attribute(
                AttributeSchema::new("zone_balancing_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false))
                    .force_new(),
            )
            .attribute(AttributeSchema::new("tags", types::tags()))
            .attribute(AttributeSchema::new("kind", AttributeType::String).computed())
            .attribute(AttributeSchema::new("reserved", AttributeType::Bool).computed())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 60, 60)
    }

    fn id_format(&self) -> String {
        ServicePlanId::expected_format()
    }

    fn validate_id(&self, id: &str) -> Result<(), IdParseError> {
        ServicePlanId::parse(id).map(|_| ())
    }

    fn validate_config(&self, config: &Attributes) -> Result<(), String> {
        let model: ServicePlanModel = decode(config).map_err(|e| e.to_string())?;
        if model.maximum_elastic_worker_count.is_some() && !is_elastic_sku(&model.sku_name) {
            return Err(
                "`maximum_elastic_worker_count` can only be specified with Elastic Premium Skus"
                    .to_string(),
            );
        }
        Ok(())
    }

    fn id_from_config(&self, ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String> {
        let model: ServicePlanModel = decode(config)?;
        Ok(ServicePlanId::new(&ctx.subscription_id, model.resource_group_name, model.name).id())
    }

    async fn create(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
    ) -> ProviderResult<()> {
        self.put(ctx, id, config, "creating").await
    }

    async fn read(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        let plan_id: ServicePlanId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", plan_id)))?
        else {
            return Ok(None);
        };
        let plan: AppServicePlan = from_body(body)?;
        encode(&flatten(&plan_id, plan)).map(Some)
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        id: &str,
        _previous: &Attributes,
        config: &Attributes,
    ) -> ProviderResult<()> {
        self.put(ctx, id, config, "updating").await
    }

    async fn delete(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<()> {
        let plan_id: ServicePlanId = parse_id(id)?;
        ctx.client
            .delete(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("deleting {}", plan_id)))
            .map(|_| ())
    }
}
