//! `azurerm_postgresql_server`
//!
//! Single-server PostgreSQL. Creation takes one of four shapes depending on
//! `create_mode`; the API reports the server before it can accept updates, so
//! create waits for `userVisibleState` to reach `Ready`.
//!
//! The threat detection policy is a separate child resource
//! (`securityAlertPolicies/Default`) written after the server itself. Basic
//! servers do not support it, so it is only read back for the other tiers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use stratus_core::provider::{ProviderError, ProviderResult, Timeouts};
use stratus_core::resource::Value;
use stratus_core::resource_id::{IdParseError, ResourceIdentifier};
use stratus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::API_VERSION;
use super::ids::ServerId;
use crate::registration::{
    Attributes, AzureResource, ProviderContext, decode, encode, from_body, parse_id, to_body,
};
use crate::utils::{expand_tags, flatten_tags, location_equivalent, normalize_location};

/// Ordered from smallest to largest within each tier
pub const SKU_NAMES: &[&str] = &[
    "B_Gen4_1",
    "B_Gen4_2",
    "B_Gen5_1",
    "B_Gen5_2",
    "GP_Gen4_2",
    "GP_Gen4_4",
    "GP_Gen4_8",
    "GP_Gen4_16",
    "GP_Gen4_32",
    "GP_Gen5_2",
    "GP_Gen5_4",
    "GP_Gen5_8",
    "GP_Gen5_16",
    "GP_Gen5_32",
    "GP_Gen5_64",
    "MO_Gen5_2",
    "MO_Gen5_4",
    "MO_Gen5_8",
    "MO_Gen5_16",
    "MO_Gen5_32",
];

pub const VERSIONS: &[&str] = &["9.5", "9.6", "10", "10.0", "10.2", "11"];

pub const ALERT_TYPES: &[&str] = &[
    "Sql_Injection",
    "Sql_Injection_Vulnerability",
    "Access_Anomaly",
    "Data_Exfiltration",
    "Unsafe_Action",
];

string_enum!(
    CreateMode {
        Default => "Default",
        GeoRestore => "GeoRestore",
        PointInTimeRestore => "PointInTimeRestore",
        Replica => "Replica",
    }
);

string_enum!(
    SkuTier {
        Basic => "Basic",
        GeneralPurpose => "GeneralPurpose",
        MemoryOptimized => "MemoryOptimized",
    }
);

string_enum!(
    MinimalTlsVersion {
        TlsEnforcementDisabled => "TLSEnforcementDisabled",
        Tls1_0 => "TLS1_0",
        Tls1_1 => "TLS1_1",
        Tls1_2 => "TLS1_2",
    }
);

string_enum!(
    /// `userVisibleState` of a server
    ServerState {
        Disabled => "Disabled",
        Dropping => "Dropping",
        Inaccessible => "Inaccessible",
        Ready => "Ready",
    }
);

string_enum!(
    SecurityAlertPolicyState {
        Enabled => "Enabled",
        Disabled => "Disabled",
    }
);

const RESTARTING: &str = "Restarting";

// =============================================================================
// Configuration model
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_create_mode() -> String {
    CreateMode::Default.to_string()
}

fn default_tls_version() -> String {
    MinimalTlsVersion::Tls1_2.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostgresServerModel {
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    pub sku_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login_password: Option<String>,
    #[serde(default = "default_true")]
    pub auto_grow_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<i64>,
    #[serde(default)]
    pub geo_redundant_backup_enabled: bool,
    #[serde(default = "default_create_mode")]
    pub create_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_source_server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityModel>,
    #[serde(default)]
    pub infrastructure_encryption_enabled: bool,
    #[serde(default = "default_true")]
    pub public_network_access_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_point_in_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_mb: Option<i64>,
    pub ssl_enforcement_enabled: bool,
    #[serde(default = "default_tls_version")]
    pub ssl_minimal_tls_version_enforced: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_detection_policy: Option<ThreatDetectionPolicyModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatDetectionPolicyModel {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_alerts: Vec<String>,
    #[serde(default)]
    pub email_account_admins: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_addresses: Vec<String>,
    #[serde(default)]
    pub retention_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityModel {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

// =============================================================================
// API payload
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResourceIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Json>,
    #[serde(default)]
    pub properties: ServerProperties,
}

/// PATCH body; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<ResourceIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Json>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServerProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SkuTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_mode: Option<CreateMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrator_login_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_enforcement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal_tls_version: Option<MinimalTlsVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure_encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<StorageProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_point_in_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_domain_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_visible_state: Option<ServerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_server_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byok_enforcement: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_retention_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_redundant_backup: Option<String>,
    #[serde(rename = "storageMB", default, skip_serializing_if = "Option::is_none")]
    pub storage_mb: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_autogrow: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlertPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: SecurityAlertPolicyProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlertPolicyProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<SecurityAlertPolicyState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_alerts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_addresses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_account_admins: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_account_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_endpoint: Option<String>,
}

// =============================================================================
// Expand / flatten
// =============================================================================

fn enabled(flag: bool) -> String {
    let value = if flag { "Enabled" } else { "Disabled" };
    value.to_string()
}

fn is_enabled(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("Enabled"))
}

/// Split `GP_Gen5_8` into tier, family and capacity
pub fn expand_sku(sku_name: &str) -> Result<Sku, String> {
    let parts: Vec<&str> = sku_name.split('_').collect();
    let [tier, family, capacity] = parts.as_slice() else {
        return Err(format!(
            "sku_name ({sku_name}) has the wrong number of parts ({}) after splitting on _",
            parts.len()
        ));
    };
    let tier = match *tier {
        "B" => SkuTier::Basic,
        "GP" => SkuTier::GeneralPurpose,
        "MO" => SkuTier::MemoryOptimized,
        other => return Err(format!("sku_name {sku_name} has unknown sku tier {other}")),
    };
    let capacity: i64 = capacity
        .parse()
        .map_err(|_| format!("cannot convert sku_name {sku_name} capacity {capacity} to an integer"))?;

    Ok(Sku {
        name: sku_name.to_string(),
        tier: Some(tier),
        family: Some(family.to_string()),
        capacity: Some(capacity),
    })
}

fn sku_index(sku_name: &str) -> Option<usize> {
    SKU_NAMES.iter().position(|s| *s == sku_name)
}

fn expand_storage_profile(model: &PostgresServerModel) -> StorageProfile {
    StorageProfile {
        backup_retention_days: model.backup_retention_days,
        geo_redundant_backup: Some(enabled(model.geo_redundant_backup_enabled)),
        storage_mb: model.storage_mb,
        storage_autogrow: Some(enabled(model.auto_grow_enabled)),
    }
}

fn expand_identity(identity: Option<&IdentityModel>) -> Option<ResourceIdentity> {
    identity.map(|i| ResourceIdentity {
        identity_type: i.identity_type.clone(),
        ..Default::default()
    })
}

/// Build the create request for the model's `create_mode`
pub fn expand(model: &PostgresServerModel) -> Result<Server, String> {
    check_rules(model)?;

    let mode = CreateMode::parse(&model.create_mode);
    let mut properties = ServerProperties {
        create_mode: Some(mode.clone()),
        version: Some(model.version.clone()),
        ssl_enforcement: Some(enabled(model.ssl_enforcement_enabled)),
        minimal_tls_version: Some(MinimalTlsVersion::parse(&model.ssl_minimal_tls_version_enforced)),
        infrastructure_encryption: Some(enabled(model.infrastructure_encryption_enabled)),
        ..Default::default()
    };

    match mode {
        CreateMode::Default => {
            properties.administrator_login = model.administrator_login.clone();
            properties.administrator_login_password = model.administrator_login_password.clone();
            properties.public_network_access = Some(enabled(model.public_network_access_enabled));
            properties.storage_profile = Some(expand_storage_profile(model));
        }
        CreateMode::PointInTimeRestore => {
            properties.source_server_id = model.creation_source_server_id.clone();
            properties.restore_point_in_time = model.restore_point_in_time.clone();
            properties.storage_profile = Some(expand_storage_profile(model));
        }
        CreateMode::GeoRestore => {
            properties.source_server_id = model.creation_source_server_id.clone();
            properties.public_network_access = Some(enabled(model.public_network_access_enabled));
            properties.storage_profile = Some(expand_storage_profile(model));
        }
        CreateMode::Replica | CreateMode::Other(_) => {
            properties.source_server_id = model.creation_source_server_id.clone();
            properties.public_network_access = Some(enabled(model.public_network_access_enabled));
        }
    }

    Ok(Server {
        location: normalize_location(&model.location),
        sku: Some(expand_sku(&model.sku_name)?),
        identity: expand_identity(model.identity.as_ref()),
        tags: Some(expand_tags(&model.tags)),
        properties,
        ..Default::default()
    })
}

pub fn expand_security_alert_policy(policy: &ThreatDetectionPolicyModel) -> SecurityAlertPolicy {
    let state = if policy.enabled {
        SecurityAlertPolicyState::Enabled
    } else {
        SecurityAlertPolicyState::Disabled
    };
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

    SecurityAlertPolicy {
        id: None,
        properties: SecurityAlertPolicyProperties {
            state: Some(state),
            disabled_alerts: Some(policy.disabled_alerts.clone()),
            email_addresses: Some(policy.email_addresses.clone()),
            email_account_admins: Some(policy.email_account_admins),
            retention_days: Some(policy.retention_days),
            storage_account_access_key: non_empty(&policy.storage_account_access_key),
            storage_endpoint: non_empty(&policy.storage_endpoint),
        },
    }
}

/// The API reports unset lists as `[""]`
fn alert_policy_list(values: Option<Vec<String>>) -> Vec<String> {
    match values {
        Some(values) if values.len() == 1 && values[0].is_empty() => Vec::new(),
        Some(values) => values,
        None => Vec::new(),
    }
}

/// `None` when the API reports the policy every server starts with
pub fn flatten_security_alert_policy(
    props: SecurityAlertPolicyProperties,
) -> Option<ThreatDetectionPolicyModel> {
    let blank_list = |v: &Option<Vec<String>>| {
        v.as_ref()
            .is_some_and(|list| list.len() == 1 && list[0].is_empty())
    };
    let blank = |v: &Option<String>| v.as_deref() == Some("");
    let never_set = blank_list(&props.disabled_alerts)
        && blank_list(&props.email_addresses)
        && blank(&props.storage_account_access_key)
        && blank(&props.storage_endpoint)
        && props.retention_days == Some(0)
        && props.email_account_admins == Some(false)
        && props.state == Some(SecurityAlertPolicyState::Disabled);
    if never_set {
        return None;
    }

    Some(ThreatDetectionPolicyModel {
        enabled: props.state == Some(SecurityAlertPolicyState::Enabled),
        disabled_alerts: alert_policy_list(props.disabled_alerts),
        email_account_admins: props.email_account_admins.unwrap_or_default(),
        email_addresses: alert_policy_list(props.email_addresses),
        retention_days: props.retention_days.unwrap_or_default(),
        // never returned; carried over from configuration
        storage_account_access_key: None,
        storage_endpoint: props.storage_endpoint.filter(|s| !s.is_empty()),
    })
}

pub fn flatten(id: &ServerId, server: Server) -> PostgresServerModel {
    let props = server.properties;
    let storage = props.storage_profile.unwrap_or_default();

    PostgresServerModel {
        name: id.server_name.clone(),
        location: normalize_location(&server.location),
        resource_group_name: id.resource_group_name.clone(),
        sku_name: server.sku.map(|s| s.name).unwrap_or_default(),
        version: props.version.unwrap_or_default(),
        administrator_login: props.administrator_login,
        auto_grow_enabled: is_enabled(storage.storage_autogrow.as_deref()),
        backup_retention_days: storage.backup_retention_days,
        geo_redundant_backup_enabled: is_enabled(storage.geo_redundant_backup.as_deref()),
        identity: server
            .identity
            .filter(|i| !i.identity_type.eq_ignore_ascii_case("None"))
            .map(|i| IdentityModel {
                identity_type: i.identity_type,
                principal_id: i.principal_id,
                tenant_id: i.tenant_id,
            }),
        infrastructure_encryption_enabled: is_enabled(props.infrastructure_encryption.as_deref()),
        public_network_access_enabled: is_enabled(props.public_network_access.as_deref()),
        storage_mb: storage.storage_mb,
        ssl_enforcement_enabled: is_enabled(props.ssl_enforcement.as_deref()),
        ssl_minimal_tls_version_enforced: props
            .minimal_tls_version
            .map(|v| v.to_string())
            .unwrap_or_default(),
        fqdn: props.fully_qualified_domain_name,
        tags: flatten_tags(server.tags.as_ref()),
        // read separately
        threat_detection_policy: None,
        // configuration-only; carried over from state
        administrator_login_password: None,
        create_mode: String::new(),
        creation_source_server_id: None,
        restore_point_in_time: None,
    }
}

fn encode_server(
    id: &ServerId,
    server: Server,
    threat_detection_policy: Option<ThreatDetectionPolicyModel>,
) -> ProviderResult<Attributes> {
    let mut model = flatten(id, server);
    model.threat_detection_policy = threat_detection_policy;
    let mut attributes = encode(&model)?;
    // the API never echoes the create mode back
    attributes.remove("create_mode");
    Ok(attributes)
}

/// State as reported while waiting for a server to settle
fn server_state(server: &Server) -> String {
    let props = &server.properties;
    let state = props
        .user_visible_state
        .as_ref()
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty());

    // replicas with customer-managed keys stay Inaccessible until the key is revalidated
    let byok_replica = props.replication_role.as_deref() == Some("Replica")
        && is_enabled(props.byok_enforcement.as_deref());
    if byok_replica && props.user_visible_state == Some(ServerState::Inaccessible) {
        return ServerState::Ready.to_string();
    }

    state.unwrap_or_else(|| ServerState::Inaccessible.to_string())
}

// =============================================================================
// Validation
// =============================================================================

/// Cross-attribute rules shared by validation and create
fn check_rules(model: &PostgresServerModel) -> Result<(), String> {
    if !model.ssl_enforcement_enabled
        && MinimalTlsVersion::parse(&model.ssl_minimal_tls_version_enforced)
            != MinimalTlsVersion::TlsEnforcementDisabled
    {
        return Err("`ssl_minimal_tls_version_enforced` must be set to `TLSEnforcementDisabled` if `ssl_enforcement_enabled` is set to `false`".to_string());
    }

    let mode = CreateMode::parse(&model.create_mode);
    let is_blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
    match mode {
        CreateMode::Default => {
            if is_blank(&model.administrator_login) {
                return Err("`administrator_login` must not be empty when `create_mode` is `default`".to_string());
            }
            if is_blank(&model.administrator_login_password) {
                return Err("`administrator_login_password` must not be empty when `create_mode` is `default`".to_string());
            }
            if model.restore_point_in_time.is_some() {
                return Err("`restore_point_in_time` cannot be set when `create_mode` is `default`".to_string());
            }
        }
        _ => {
            if mode == CreateMode::PointInTimeRestore && is_blank(&model.restore_point_in_time) {
                return Err("`restore_point_in_time` must be set when `create_mode` is `PointInTimeRestore`".to_string());
            }
            if is_blank(&model.creation_source_server_id) {
                return Err(format!(
                    "`creation_source_server_id` must be set when `create_mode` is `{}`",
                    model.create_mode
                ));
            }
        }
    }
    Ok(())
}

/// Rules the attribute types cannot express
fn check_attributes(config: &Attributes) -> Result<(), String> {
    if let Some(Value::Map(policy)) = config.get("threat_detection_policy")
        && policy.is_empty()
    {
        return Err("`threat_detection_policy` must set at least one of `enabled`, `disabled_alerts`, `email_account_admins`, `email_addresses`, `retention_days`, `storage_account_access_key` or `storage_endpoint`".to_string());
    }
    Ok(())
}

fn sku_tier(value: &Value) -> Option<&str> {
    value.as_str().and_then(|s| s.split('_').next())
}

/// Basic servers cannot move to or from another tier in place
fn sku_tier_change_forces_new(old: &Value, new: &Value) -> bool {
    let (old, new) = (sku_tier(old), sku_tier(new));
    old != new && (old == Some("B") || new == Some("B"))
}

/// A primary cannot be turned into a replica
fn create_mode_change_forces_new(old: &Value, new: &Value) -> bool {
    let mode = |v: &Value| v.as_str().map(CreateMode::parse);
    mode(old) == Some(CreateMode::Default) && mode(new) == Some(CreateMode::Replica)
}

// =============================================================================
// Resource
// =============================================================================

pub struct PostgresServerResource;

impl PostgresServerResource {
    /// Poll until the server reports `Ready`; `pending` states keep waiting
    async fn wait_for_ready(
        &self,
        ctx: &ProviderContext,
        server_id: &ServerId,
        pending: &[&str],
    ) -> ProviderResult<()> {
        log::debug!("Waiting for {} to become available", server_id);
        loop {
            let body = ctx
                .client
                .get(&server_id.id(), API_VERSION)
                .await
                .map_err(|e| e.wrap(format!("retrieving status of {}", server_id)))?;
            // the server shows up 10-15 seconds after the create operation finishes
            let state = match body {
                Some(body) => server_state(&from_body(body)?),
                None => ServerState::Inaccessible.to_string(),
            };

            if state == ServerState::Ready.as_str() {
                return Ok(());
            }
            if !pending.contains(&state.as_str()) {
                return Err(ProviderError::new(format!(
                    "waiting for {} to become available: unexpected state {:?}",
                    server_id, state
                )));
            }
            tokio::time::sleep(ctx.client.poll_interval()).await;
        }
    }

    /// Scale replicas up before their primary; a replica may never be smaller
    async fn scale_replicas(
        &self,
        ctx: &ProviderContext,
        server_id: &ServerId,
        sku: &Sku,
    ) -> ProviderResult<()> {
        let path = format!("{}/replicas", server_id.id());
        let replicas = ctx
            .client
            .list(&path, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("listing replicas for {}", server_id)))?;

        let body = to_body(&ServerUpdate {
            sku: Some(sku.clone()),
            ..Default::default()
        })?;
        for replica in replicas {
            let raw_id = replica.get("id").and_then(Json::as_str).unwrap_or_default();
            let replica_id = ServerId::parse_insensitively(raw_id).map_err(ProviderError::invalid_id)?;
            log::info!("updating SKU of replica {}", replica_id);
            ctx.client
                .patch_then_poll(&replica_id.id(), API_VERSION, &body)
                .await
                .map_err(|e| e.wrap(format!("updating SKU for Replica {}", replica_id)))?;
        }
        Ok(())
    }

    fn security_alert_policy_path(server_id: &ServerId) -> String {
        format!("{}/securityAlertPolicies/Default", server_id.id())
    }

    async fn write_threat_detection_policy(
        &self,
        ctx: &ProviderContext,
        server_id: &ServerId,
        policy: &ThreatDetectionPolicyModel,
    ) -> ProviderResult<()> {
        log::info!("updating security alert policy for {}", server_id);
        let body = to_body(&expand_security_alert_policy(policy))?;
        ctx.client
            .put_then_poll(&Self::security_alert_policy_path(server_id), API_VERSION, &body)
            .await
            .map_err(|e| e.wrap(format!("updating security alert policy for {}", server_id)))
    }

    /// Basic servers have no threat detection, so nothing is read for them
    async fn read_threat_detection_policy(
        &self,
        ctx: &ProviderContext,
        server_id: &ServerId,
        server: &Server,
    ) -> ProviderResult<Option<ThreatDetectionPolicyModel>> {
        let tier = server.sku.as_ref().and_then(|s| s.tier.as_ref());
        if !matches!(tier, Some(SkuTier::GeneralPurpose | SkuTier::MemoryOptimized)) {
            return Ok(None);
        }

        let body = ctx
            .client
            .get(&Self::security_alert_policy_path(server_id), API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving security alert policy for {}", server_id)))?;
        match body {
            Some(body) => {
                let policy: SecurityAlertPolicy = from_body(body)?;
                Ok(flatten_security_alert_policy(policy.properties))
            }
            None => Ok(None),
        }
    }

    /// Settings the API only applies after a replica or restore exists
    async fn apply_post_create_settings(
        &self,
        ctx: &ProviderContext,
        server_id: &ServerId,
        model: &PostgresServerModel,
    ) -> ProviderResult<()> {
        let mode = CreateMode::parse(&model.create_mode);
        let identity = match mode {
            CreateMode::Replica => expand_identity(model.identity.as_ref()),
            CreateMode::PointInTimeRestore => None,
            _ => return Ok(()),
        };

        log::info!("updating `public_network_access_enabled` for {}", server_id);
        let body = to_body(&ServerUpdate {
            identity,
            properties: Some(ServerProperties {
                public_network_access: Some(enabled(model.public_network_access_enabled)),
                ..Default::default()
            }),
            ..Default::default()
        })?;
        ctx.client
            .patch_then_poll(&server_id.id(), API_VERSION, &body)
            .await
            .map_err(|e| {
                e.wrap(format!(
                    "updating Public Network Access for {} {}",
                    model.create_mode, server_id
                ))
            })
    }
}

#[async_trait]
impl AzureResource for PostgresServerResource {
    fn type_name(&self) -> &'static str {
        "azurerm_postgresql_server"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new(self.type_name())
            .with_description("An Azure Database for PostgreSQL single server")
            .attribute(
                AttributeSchema::new("name", types::non_empty_string())
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
                AttributeSchema::new("resource_group_name", types::non_empty_string())
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("sku_name", types::string_in_slice(SKU_NAMES, false))
                    .required()
                    .with_force_new_if(sku_tier_change_forces_new),
            )
            .attribute(
                AttributeSchema::new("version", types::string_in_slice(VERSIONS, false))
                    .required()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("administrator_login", types::non_empty_string())
                    .optional_computed()
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("administrator_login_password", AttributeType::String)
                    .sensitive(),
            )
            .attribute(
                AttributeSchema::new("auto_grow_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
            )
            .attribute(
                AttributeSchema::new("backup_retention_days", types::int_between(7, 35))
                    .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("geo_redundant_backup_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false))
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new(
                    "create_mode",
                    types::string_in_slice(CreateMode::possible_values(), false),
                )
                .with_default(Value::String(default_create_mode()))
                .write_only()
                .with_force_new_if(create_mode_change_forces_new),
            )
            .attribute(
                AttributeSchema::new("creation_source_server_id", types::resource_id::<ServerId>())
                    .write_only(),
            )
            .attribute(AttributeSchema::new(
                "identity",
                AttributeType::block(vec![
                    AttributeSchema::new("type", types::string_in_slice(&["SystemAssigned"], false))
                        .required(),
                    AttributeSchema::new("principal_id", AttributeType::String).computed(),
                    AttributeSchema::new("tenant_id", AttributeType::String).computed(),
                ]),
            ))
            .attribute(
                AttributeSchema::new("infrastructure_encryption_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(false))
                    .force_new(),
            )
            .attribute(
                AttributeSchema::new("public_network_access_enabled", AttributeType::Bool)
                    .with_default(Value::Bool(true)),
            )
            .attribute(
                AttributeSchema::new("restore_point_in_time", types::rfc3339()).write_only(),
            )
            .attribute(
                AttributeSchema::new(
                    "storage_mb",
                    types::custom("StorageMB", AttributeType::Int, |v| {
                        types::validate_int_between(v, 5120, 16_777_216)?;
                        types::validate_int_divisible_by(v, 1024)
                    }),
                )
                .optional_computed(),
            )
            .attribute(
                AttributeSchema::new("ssl_enforcement_enabled", AttributeType::Bool).required(),
            )
            .attribute(
                AttributeSchema::new(
                    "ssl_minimal_tls_version_enforced",
                    types::string_in_slice(MinimalTlsVersion::possible_values(), false),
                )
                .with_default(Value::String(default_tls_version())),
            )
            .attribute(AttributeSchema::new(
                "threat_detection_policy",
                AttributeType::block(vec![
                    AttributeSchema::new("enabled", AttributeType::Bool)
                        .with_default(Value::Bool(false)),
                    AttributeSchema::new(
                        "disabled_alerts",
                        AttributeType::set(types::string_in_slice(ALERT_TYPES, false)),
                    ),
                    AttributeSchema::new("email_account_admins", AttributeType::Bool)
                        .with_default(Value::Bool(false)),
                    AttributeSchema::new("email_addresses", AttributeType::set(AttributeType::String)),
                    AttributeSchema::new("retention_days", types::int_at_least(0))
                        .with_default(Value::Int(0)),
                    AttributeSchema::new("storage_account_access_key", types::non_empty_string())
                        .sensitive(),
                    AttributeSchema::new("storage_endpoint", types::non_empty_string()),
                ]),
            ))
            .attribute(AttributeSchema::new("fqdn", AttributeType::String).computed())
            .attribute(AttributeSchema::new("tags", types::tags()))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(60, 5, 60, 60)
    }

    fn id_format(&self) -> String {
        ServerId::expected_format()
    }

    fn validate_id(&self, id: &str) -> Result<(), IdParseError> {
        ServerId::parse(id).map(|_| ())
    }

    fn validate_config(&self, config: &Attributes) -> Result<(), String> {
        check_attributes(config)?;
        let model: PostgresServerModel = decode(config).map_err(|e| e.to_string())?;
        check_rules(&model)
    }

    fn id_from_config(&self, ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String> {
        let model: PostgresServerModel = decode(config)?;
        Ok(ServerId::new(&ctx.subscription_id, model.resource_group_name, model.name).id())
    }

    async fn create(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let server_id: ServerId = parse_id(id)?;
        let model: PostgresServerModel = decode(config)?;
        let server = expand(&model).map_err(ProviderError::validation)?;

        ctx.client
            .put_then_poll(id, API_VERSION, &to_body(&server)?)
            .await
            .map_err(|e| e.wrap(format!("creating {}", server_id)))?;

        self.wait_for_ready(ctx, &server_id, &[ServerState::Inaccessible.as_str()])
            .await?;
        self.apply_post_create_settings(ctx, &server_id, &model)
            .await?;

        if let Some(policy) = &model.threat_detection_policy {
            self.write_threat_detection_policy(ctx, &server_id, policy)
                .await?;
        }
        Ok(())
    }

    async fn read(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        let server_id: ServerId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", server_id)))?
        else {
            return Ok(None);
        };
        let server: Server = from_body(body)?;
        let policy = self
            .read_threat_detection_policy(ctx, &server_id, &server)
            .await?;
        encode_server(&server_id, server, policy).map(Some)
    }

    async fn import(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        let server_id: ServerId = parse_id(id)?;
        let Some(body) = ctx
            .client
            .get(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("retrieving {}", server_id)))?
        else {
            return Ok(None);
        };
        let server: Server = from_body(body)?;
        let replication_role = server.properties.replication_role.clone();
        let master_server_id = server.properties.master_server_id.clone();
        let policy = self
            .read_threat_detection_policy(ctx, &server_id, &server)
            .await?;
        let mut attributes = encode_server(&server_id, server, policy)?;

        let mode = match replication_role.as_deref() {
            Some(role) if role.eq_ignore_ascii_case("Replica") => CreateMode::Replica,
            _ => CreateMode::Default,
        };
        attributes.insert("create_mode".to_string(), Value::String(mode.to_string()));

        if let Some(master) = master_server_id.filter(|m| !m.is_empty()) {
            let master = ServerId::parse_insensitively(&master).map_err(ProviderError::invalid_id)?;
            attributes.insert(
                "creation_source_server_id".to_string(),
                Value::String(master.id()),
            );
        }
        Ok(Some(attributes))
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        id: &str,
        previous: &Attributes,
        config: &Attributes,
    ) -> ProviderResult<()> {
        let server_id: ServerId = parse_id(id)?;
        let model: PostgresServerModel = decode(config)?;
        check_rules(&model).map_err(ProviderError::validation)?;

        let previous_str = |name: &str| previous.get(name).and_then(Value::as_str);
        let mode = CreateMode::parse(&model.create_mode);

        if mode == CreateMode::Replica {
            // scaling the primary restarts its replicas
            self.wait_for_ready(
                ctx,
                &server_id,
                &[ServerState::Inaccessible.as_str(), RESTARTING],
            )
            .await?;
        }

        let sku = expand_sku(&model.sku_name).map_err(ProviderError::validation)?;
        if mode != CreateMode::Replica
            && let Some(old_sku) = previous_str("sku_name")
            && old_sku != model.sku_name
            && sku_index(old_sku) < sku_index(&model.sku_name)
        {
            self.scale_replicas(ctx, &server_id, &sku).await?;
        }

        let replica_to_default = previous_str("create_mode").map(CreateMode::parse)
            == Some(CreateMode::Replica)
            && mode == CreateMode::Default;
        let password_changed =
            previous_str("administrator_login_password") != model.administrator_login_password.as_deref();

        let mut properties = ServerProperties {
            ssl_enforcement: Some(enabled(model.ssl_enforcement_enabled)),
            minimal_tls_version: Some(MinimalTlsVersion::parse(&model.ssl_minimal_tls_version_enforced)),
            storage_profile: Some(expand_storage_profile(&model)),
            version: Some(model.version.clone()),
            public_network_access: Some(enabled(model.public_network_access_enabled)),
            ..Default::default()
        };
        if replica_to_default {
            properties.replication_role = Some("None".to_string());
        }
        if password_changed && !replica_to_default {
            properties.administrator_login_password = model.administrator_login_password.clone();
        }

        let mut update = ServerUpdate {
            sku: Some(sku),
            identity: expand_identity(model.identity.as_ref()),
            tags: Some(expand_tags(&model.tags)),
            properties: Some(properties),
        };
        ctx.client
            .patch_then_poll(id, API_VERSION, &to_body(&update)?)
            .await
            .map_err(|e| e.wrap(format!("updating {}", server_id)))?;

        // the password can only change once replication has stopped
        if password_changed && replica_to_default {
            if let Some(properties) = update.properties.as_mut() {
                properties.administrator_login_password = model.administrator_login_password.clone();
            }
            ctx.client
                .patch_then_poll(id, API_VERSION, &to_body(&update)?)
                .await
                .map_err(|e| e.wrap(format!("updating Admin Password of {}", server_id)))?;
        }

        if let Some(policy) = &model.threat_detection_policy {
            self.write_threat_detection_policy(ctx, &server_id, policy)
                .await?;
        }
        Ok(())
    }

    async fn delete(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<()> {
        let server_id: ServerId = parse_id(id)?;
        ctx.client
            .delete_then_poll(id, API_VERSION)
            .await
            .map_err(|e| e.wrap(format!("deleting {}", server_id)))
    }
}
