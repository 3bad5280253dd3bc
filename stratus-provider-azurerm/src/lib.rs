//! Stratus Azure Resource Manager Provider
//!
//! Exposes Azure resources (consumption budgets, PostgreSQL servers, DNS
//! zones, service plans and policy remediations) through the
//! `stratus_core::provider::Provider` trait.
//!
//! ## Module Structure
//!
//! - `client` - ARM REST client (retries, error envelope, long-running operations)
//! - `auth` - Bearer token acquisition
//! - `config` - Provider settings from the environment and the configuration file
//! - `registration` - Per-resource traits and the service registration tables
//! - `provider` - AzureRmProvider implementation
//! - `services` - Typed IDs, expand/flatten and CRUD per Azure service
//! - `utils` - Helper functions for value normalization

#[macro_use]
mod enums;

pub mod auth;
pub mod client;
pub mod config;
pub mod provider;
pub mod registration;
pub mod services;
pub mod utils;

// Re-export main types
pub use config::{ProviderBlock, ProviderConfig};
pub use provider::AzureRmProvider;

use stratus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use stratus_core::resource::{Resource, ResourceId, State};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AzureRmProvider {
    fn name(&self) -> &'static str {
        "azurerm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        self.types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&id, &identifier, &from, &to).await })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&id, &identifier).await })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.import_resource(&id, &identifier).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.lookup_data_source(&resource).await })
    }
}
