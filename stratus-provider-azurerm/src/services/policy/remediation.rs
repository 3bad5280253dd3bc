//! Policy remediations at management group, subscription, resource group and
//! resource scope

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stratus_core::provider::{ProviderError, ProviderResult};
use stratus_core::resource::Value;
use stratus_core::resource_id::{
    IdParseError, ManagementGroupId, ResourceGroupId, ResourceIdentifier, ScopeId, SubscriptionId,
};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::{PolicyAssignmentId, RemediationId};
use crate::registration::{
    Attributes, AzureResource, ProviderContext, decode, encode, from_body, parse_id, to_body,
};
use crate::utils::{ignore_case_equivalent, normalize_location};

string_enum!(
    ResourceDiscoveryMode {
        ExistingNonCompliant => "ExistingNonCompliant",
        ReEvaluateCompliance => "ReEvaluateCompliance",
    }
);

/// Provisioning states of a remediation that is still deploying
const CANCELLABLE_STATES: &[&str] = &["Accepted", "Evaluating", "Running"];

const CANCELLING: &str = "Cancelling";

fn default_discovery_mode() -> String {
    ResourceDiscoveryMode::ExistingNonCompliant.to_string()
}

// =============================================================================
// Configuration model
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationModel {
    pub name: String,
    pub policy_assignment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_definition_reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_filters: Vec<String>,
    #[serde(default = "default_discovery_mode")]
    pub resource_discovery_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_deployments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<i64>,
}

// =============================================================================
// API payload
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remediation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: RemediationProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_assignment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_definition_reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_discovery_mode: Option<ResourceDiscoveryMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<RemediationFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<FailureThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_deployments: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureThreshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

// =============================================================================
// Expand / flatten
// =============================================================================

pub fn expand(model: &RemediationModel) -> Remediation {
    let locations: Vec<String> = model
        .location_filters
        .iter()
        .map(|l| normalize_location(l))
        .collect();

    Remediation {
        properties: RemediationProperties {
            policy_assignment_id: Some(model.policy_assignment_id.clone()),
            policy_definition_reference_id: model.policy_definition_reference_id.clone(),
            resource_discovery_mode: Some(ResourceDiscoveryMode::parse(
                &model.resource_discovery_mode,
            )),
            filters: Some(RemediationFilters {
                locations: Some(locations),
            }),
            failure_threshold: model.failure_percentage.map(|p| FailureThreshold {
                percentage: Some(p),
            }),
            parallel_deployments: model.parallel_deployments,
            resource_count: model.resource_count,
            provisioning_state: None,
        },
        ..Default::default()
    }
}

pub fn flatten(id: &RemediationId, remediation: Remediation) -> RemediationModel {
    let props = remediation.properties;
    RemediationModel {
        name: id.remediation_name.clone(),
        policy_assignment_id: props.policy_assignment_id.unwrap_or_default(),
        policy_definition_reference_id: props
            .policy_definition_reference_id
            .filter(|r| !r.is_empty()),
        location_filters: props
            .filters
            .and_then(|f| f.locations)
            .unwrap_or_default(),
        resource_discovery_mode: props
            .resource_discovery_mode
            .unwrap_or(ResourceDiscoveryMode::ExistingNonCompliant)
            .to_string(),
        failure_percentage: props.failure_threshold.and_then(|t| t.percentage),
        parallel_deployments: props.parallel_deployments,
        resource_count: props.resource_count,
    }
}

/// Which scope a remediation resource type manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationScope {
    ManagementGroup,
    Subscription,
    ResourceGroup,
    Resource,
}

impl RemediationScope {
    /// Configuration attribute holding the scope's ID
    pub fn attribute(self) -> &'static str {
        match self {
            RemediationScope::ManagementGroup => "management_group_id",
            RemediationScope::Subscription => "subscription_id",
            RemediationScope::ResourceGroup => "resource_group_id",
            RemediationScope::Resource => "resource_id",
        }
    }

    fn scope_type(self) -> AttributeType {
        match self {
            RemediationScope::ManagementGroup => types::resource_id::<ManagementGroupId>(),
            RemediationScope::Subscription => types::resource_id::<SubscriptionId>(),
            RemediationScope::ResourceGroup => types::resource_id::<ResourceGroupId>(),
            RemediationScope::Resource => {
                types::custom("ResourceId", AttributeType::String, |v| match v {
                    Value::String(s) => match ScopeId::parse(s) {
                        Ok(ScopeId::Resource(_)) => Ok(()),
                        Ok(other) => Err(format!("expected a resource ID but got a {} scope", other.kind())),
                        Err(e) => Err(e.to_string()),
                    },
                    _ => Err("expected a string".to_string()),
                })
            }
        }
    }

    fn matches(self, scope: &ScopeId) -> bool {
        matches!(
            (self, scope),
            (RemediationScope::ManagementGroup, ScopeId::ManagementGroup(_))
                | (RemediationScope::Subscription, ScopeId::Subscription(_))
                | (RemediationScope::ResourceGroup, ScopeId::ResourceGroup(_))
                | (RemediationScope::Resource, ScopeId::Resource(_))
        )
    }

    /// Re-evaluating compliance is not available for management groups
    fn discovery_modes(self) -> &'static [&'static str] {
        match self {
            RemediationScope::ManagementGroup => &["ExistingNonCompliant"],
            _ => ResourceDiscoveryMode::possible_values(),
        }
    }
}

// =============================================================================
// Resource
// =============================================================================

pub struct RemediationResource {
    pub scope: RemediationScope,
}

impl RemediationResource {
    pub fn new(scope: RemediationScope) -> Self {
        Self { scope }
    }

    fn remediation_id(&self, id: &str) -> Result<RemediationId, IdParseError> {
        let remediation_id = RemediationId::parse(id)?;
        let scope = remediation_id.scope_id()?;
        if !self.scope.matches(&scope) {
            return Err(IdParseError::Invalid {
                id_type: RemediationId::TYPE_NAME.to_string(),
                input: id.to_string(),
                message: format!(
                    "expected a remediation scoped to a {} but got a {} scope",
                    self.scope.attribute().trim_end_matches("_id").replace('_', " "),
                    scope.kind()
                ),
            });
        }
        Ok(remediation_id)
    }

    async fn put(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
        action: &str,
    ) -> ProviderResult<()> {
        let remediation_id = self.remediation_id(id).map_err(ProviderError::invalid_id)?;
        let model: RemediationModel = decode(config)?;
        ctx.client
            .put(id, API_VERSION, &to_body(&expand(&model))?)
            .await
            .map_err(|e| e.wrap(format!("{} {}", action, remediation_id)))?;
        Ok(())
    }

    async fn provisioning_state(
        &self,
        ctx: &ProviderContext,
        remediation_id: &RemediationId,
    ) -> ProviderResult<Option<String>> {
        let body = ctx
            .client
            .get(&remediation_id.id(), API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", remediation_id)))?;
        match body {
            Some(body) => {
                let remediation: Remediation = from_body(body)?;
                Ok(Some(remediation.properties.provisioning_state.unwrap_or_default()))
            }
            None => Ok(None),
        }
    }

    /// Stop a remediation that is still deploying and wait until it has stopped
    async fn cancel(&self, ctx: &ProviderContext, remediation_id: &RemediationId) -> ProviderResult<()> {
        log::info!("cancelling {} before deletion", remediation_id);
        ctx.client
            .post(&format!("{}/cancel", remediation_id.id()), API_VERSION, None)
            .await
            .map_err(|e| e.wrap(format!("cancelling {}", remediation_id)))?;

        loop {
            match self.provisioning_state(ctx, remediation_id).await? {
                Some(state) if state == CANCELLING || CANCELLABLE_STATES.contains(&state.as_str()) => {
                    log::debug!("{} is {}", remediation_id, state);
                    tokio::time::sleep(ctx.client.poll_interval()).await;
                }
                _ => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl AzureResource for RemediationResource {
    fn type_name(&self) -> &'static str {
        match self.scope {
            RemediationScope::ManagementGroup => "azurerm_management_group_policy_remediation",
            RemediationScope::Subscription => "azurerm_subscription_policy_remediation",
            RemediationScope::ResourceGroup => "azurerm_resource_group_policy_remediation",
            RemediationScope::Resource => "azurerm_resource_policy_remediation",
        }
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .with_description("Remediates resources that are non-compliant with a policy assignment")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new(self.scope.attribute(), self.scope.scope_type())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("policy_assignment_id", types::resource_id::<PolicyAssignmentId>())
                    .required()
                    .with_equivalence(ignore_case_equivalent),
            )
            .attribute(
                AttributeSchema::new("policy_definition_reference_id", AttributeType::String)
                    .with_equivalence(ignore_case_equivalent),
            )
            .attribute(AttributeSchema::new(
                "location_filters",
                AttributeType::list(types::location()),
            ))
            .attribute(
                AttributeSchema::new(
                    "resource_discovery_mode",
                    types::string_in_slice(self.scope.discovery_modes(), false),
                )
                .with_default(Value::String(default_discovery_mode())),
            )
            .attribute(AttributeSchema::new("failure_percentage", types::float_between(0.0, 1.0)))
            .attribute(
                AttributeSchema::new("parallel_deployments", types::int_at_least(1))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("resource_count", types::int_at_least(1)).optional_computed(),
            )
    }

    fn id_format(&self) -> String {
        RemediationId::expected_format()
    }

    fn validate_id(&self, id: &str) -> Result<(), IdParseError> {
        self.remediation_id(id).map(|_| ())
    }

    fn id_from_config(&self, _ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String> {
        let scope = config
            .get(self.scope.attribute())
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::validation(format!("{} must be set", self.scope.attribute())))?;
        let model: RemediationModel = decode(config)?;
        Ok(RemediationId::new(scope, model.name).id())
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
        let remediation_id: RemediationId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", remediation_id)))?
        else {
            return Ok(None);
        };

        let remediation: Remediation = from_body(body)?;
        let mut attributes = encode(&flatten(&remediation_id, remediation))?;
        attributes.insert(
            self.scope.attribute().to_string(),
            Value::String(remediation_id.scope.clone()),
        );
        Ok(Some(attributes))
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
        let remediation_id = self.remediation_id(id).map_err(ProviderError::invalid_id)?;

        if let Some(state) = self.provisioning_state(ctx, &remediation_id).await?
            && CANCELLABLE_STATES.contains(&state.as_str())
        {
            self.cancel(ctx, &remediation_id).await?;
        }

        ctx.client
            .delete(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("deleting {}", remediation_id)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ASSIGNMENT: &str = "/subscriptions/sub/providers/Microsoft.Authorization/policyAssignments/require-tags";

    fn model() -> RemediationModel {
        RemediationModel {
            name: "fix-tags".into(),
            policy_assignment_id: ASSIGNMENT.into(),
            location_filters: vec!["West Europe".into()],
            resource_discovery_mode: "ReEvaluateCompliance".into(),
            failure_percentage: Some(0.5),
            ..Default::default()
        }
    }

    #[test]
    fn expand_builds_request() {
        let body = serde_json::to_value(expand(&model())).unwrap();
        assert_eq!(
            body,
            json!({
                "properties": {
                    "policyAssignmentId": ASSIGNMENT,
                    "resourceDiscoveryMode": "ReEvaluateCompliance",
                    "filters": {"locations": ["westeurope"]},
                    "failureThreshold": {"percentage": 0.5}
                }
            })
        );
    }

    #[test]
    fn flatten_reads_response() {
        let remediation: Remediation = serde_json::from_value(json!({
            "id": "/subscriptions/sub/providers/Microsoft.PolicyInsights/remediations/fix-tags",
            "properties": {
                "policyAssignmentId": ASSIGNMENT,
                "policyDefinitionReferenceId": "",
                "provisioningState": "Succeeded",
                "filters": {"locations": []},
                "parallelDeployments": 10,
                "resourceCount": 500
            }
        }))
        .unwrap();
        let id = RemediationId::new("/subscriptions/sub", "fix-tags");
        let m = flatten(&id, remediation);
        assert_eq!(m.name, "fix-tags");
        assert_eq!(m.resource_discovery_mode, "ExistingNonCompliant");
        assert!(m.policy_definition_reference_id.is_none());
        assert!(m.location_filters.is_empty());
        assert_eq!(m.parallel_deployments, Some(10));
        assert_eq!(m.resource_count, Some(500));
    }

    #[test]
    fn management_groups_only_remediate_existing_resources() {
        let mut config = encode(&model()).unwrap();
        config.insert(
            "management_group_id".into(),
            Value::String("/providers/Microsoft.Management/managementGroups/mg1".into()),
        );
        let mg = RemediationResource::new(RemediationScope::ManagementGroup);
        assert!(mg.schema().validate(&config).is_err());

        config.insert(
            "resource_discovery_mode".into(),
            Value::String("ExistingNonCompliant".into()),
        );
        assert!(mg.schema().validate(&config).is_ok());
    }

    #[test]
    fn resource_scope_rejects_resource_groups() {
        let resource = RemediationResource::new(RemediationScope::Resource);
        let mut config = encode(&model()).unwrap();
        config.insert(
            "resource_id".into(),
            Value::String("/subscriptions/sub/resourceGroups/rg".into()),
        );
        assert!(resource.schema().validate(&config).is_err());

        config.insert(
            "resource_id".into(),
            Value::String(
                "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1".into(),
            ),
        );
        assert!(resource.schema().validate(&config).is_ok());
    }

    #[test]
    fn ids_must_match_the_resource_scope() {
        let sub = RemediationResource::new(RemediationScope::Subscription);
        assert!(
            sub.validate_id("/subscriptions/sub/providers/Microsoft.PolicyInsights/remediations/r1")
                .is_ok()
        );
        let err = sub
            .validate_id("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.PolicyInsights/remediations/r1")
            .unwrap_err();
        assert!(err.to_string().contains("got a resource group scope"));
    }
}
