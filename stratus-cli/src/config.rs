//! Configuration file loading
//!
//! The configuration is a JSON document with a `provider` block, a `backend`
//! block and the `resources` and `data` lists.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use stratus_core::resource::{Resource, ResourceId, Value, attributes_from_json};
use stratus_provider_azurerm::ProviderBlock;
use stratus_state::BackendConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub provider: ProviderBlock,
    #[serde(default)]
    pub backend: BackendBlock,
    #[serde(default)]
    pub resources: Vec<ResourceBlock>,
    #[serde(default)]
    pub data: Vec<ResourceBlock>,
}

/// Where state is kept; only the local backend exists
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendBlock {
    pub path: Option<String>,
    pub lock_timeout_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceBlock {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl ResourceBlock {
    fn to_resource(&self, read_only: bool) -> Resource {
        let mut resource = Resource::new(&self.resource_type, &self.name).with_read_only(read_only);
        resource.attributes =
            attributes_from_json(&serde_json::Value::Object(self.attributes.clone()));
        resource
    }
}

impl Configuration {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Configuration =
            serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;
        config.check_addresses()?;
        Ok(config)
    }

    fn check_addresses(&self) -> Result<(), String> {
        for (kind, blocks) in [("resource", &self.resources), ("data source", &self.data)] {
            let mut seen = HashSet::new();
            for block in blocks {
                if block.resource_type.is_empty() || block.name.is_empty() {
                    return Err(format!("every {} needs a type and a name", kind));
                }
                if block.name.contains('.') {
                    return Err(format!(
                        "{}.{}: names must not contain '.'",
                        block.resource_type, block.name
                    ));
                }
                if !seen.insert((&block.resource_type, &block.name)) {
                    return Err(format!(
                        "duplicate {} {}.{}",
                        kind, block.resource_type, block.name
                    ));
                }
            }
        }
        Ok(())
    }

    /// Data sources first, then managed resources, each in file order
    pub fn resources(&self) -> Vec<Resource> {
        self.data
            .iter()
            .map(|b| b.to_resource(true))
            .chain(self.resources.iter().map(|b| b.to_resource(false)))
            .collect()
    }

    pub fn backend_config(&self) -> BackendConfig {
        let mut config =
            BackendConfig::local(self.backend.path.clone().unwrap_or_else(default_state_path));
        if let Some(timeout) = self.backend.lock_timeout_seconds {
            config
                .attributes
                .insert("lock_timeout_seconds".to_string(), Value::Int(timeout));
        }
        config
    }

    pub fn is_declared(&self, id: &ResourceId) -> bool {
        self.resources
            .iter()
            .any(|b| b.resource_type == id.resource_type && b.name == id.name)
    }
}

fn default_state_path() -> String {
    stratus_state::LocalBackend::DEFAULT_STATE_FILE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "provider": { "subscription_id": "00000000-0000-0000-0000-000000000000" },
        "backend": { "path": "env/prod.state.json" },
        "data": [
            { "type": "azurerm_dns_zone", "name": "shared", "attributes": { "name": "contoso.com" } }
        ],
        "resources": [
            {
                "type": "azurerm_dns_zone",
                "name": "main",
                "attributes": {
                    "name": "fabrikam.com",
                    "resource_group_name": "rg",
                    "tags": { "env": "prod" },
                    "comment": null
                }
            }
        ]
    }"#;

    #[test]
    fn parse_configuration() {
        let config = Configuration::parse(CONFIG).unwrap();
        assert_eq!(
            config.provider.subscription_id.as_deref(),
            Some("00000000-0000-0000-0000-000000000000")
        );

        let resources = config.resources();
        assert_eq!(resources.len(), 2);
        assert!(resources[0].is_data_source());
        assert_eq!(resources[1].id, ResourceId::new("azurerm_dns_zone", "main"));
        assert_eq!(
            resources[1].attributes.get("name"),
            Some(&Value::String("fabrikam.com".to_string()))
        );
        assert!(!resources[1].attributes.contains_key("comment"));
        assert!(config.is_declared(&ResourceId::new("azurerm_dns_zone", "main")));
        assert!(!config.is_declared(&ResourceId::new("azurerm_dns_zone", "shared")));
    }

    #[test]
    fn backend_defaults_to_local_file() {
        let config = Configuration::parse("{}").unwrap();
        let backend = config.backend_config();
        assert_eq!(backend.backend_type, "local");
        assert_eq!(backend.get_string("path"), Some("stratus.state.json"));

        let config = Configuration::parse(
            r#"{ "backend": { "path": "x.json", "lock_timeout_seconds": 60 } }"#,
        )
        .unwrap();
        assert_eq!(config.backend_config().get_int("lock_timeout_seconds"), Some(60));
    }

    #[test]
    fn rejects_duplicates_and_unknown_keys() {
        let duplicate = r#"{ "resources": [
            { "type": "azurerm_dns_zone", "name": "a" },
            { "type": "azurerm_dns_zone", "name": "a" }
        ] }"#;
        assert!(
            Configuration::parse(duplicate)
                .unwrap_err()
                .contains("duplicate resource azurerm_dns_zone.a")
        );

        assert!(Configuration::parse(r#"{ "providers": {} }"#).is_err());
        assert!(
            Configuration::parse(r#"{ "resources": [ { "type": "t", "name": "a.b" } ] }"#).is_err()
        );
    }

    #[test]
    fn same_name_may_be_resource_and_data_source() {
        let config = Configuration::parse(
            r#"{
                "resources": [ { "type": "azurerm_dns_zone", "name": "a" } ],
                "data": [ { "type": "azurerm_dns_zone", "name": "a" } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.resources().len(), 2);
    }
}
