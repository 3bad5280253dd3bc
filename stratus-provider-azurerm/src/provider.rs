//! AzureRM Provider implementation
//!
//! Dispatches each lifecycle operation to the registered resource type and
//! applies the behaviour every type shares: configuration validation, the
//! already-exists check on create, per-operation timeouts and not-found
//! handling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stratus_core::provider::{ProviderError, ProviderResult, ResourceType};
use stratus_core::resource::{Resource, ResourceId, State};

use crate::client::{ArmClient, ArmError};
use crate::config::ProviderConfig;
use crate::registration::{
    AzureDataSource, AzureResource, DataSourceKind, ProviderContext, ResourceKind, services,
};

/// Azure Resource Manager provider
pub struct AzureRmProvider {
    ctx: ProviderContext,
    overwrite_existing: bool,
    resources: HashMap<&'static str, Arc<dyn AzureResource>>,
    data_sources: HashMap<&'static str, Arc<dyn AzureDataSource>>,
}

/// Run `operation`, failing with a timeout error once `limit` has elapsed
async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    future: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(operation, limit)),
    }
}

impl AzureRmProvider {
    /// Create a provider from resolved settings
    pub fn new(config: &ProviderConfig) -> Result<Self, ArmError> {
        let client = ArmClient::new(config)?;
        Ok(Self::with_client(
            client,
            &config.subscription_id,
            config.overwrite_existing,
        ))
    }

    /// Create a provider around an existing client
    pub fn with_client(client: ArmClient, subscription_id: &str, overwrite_existing: bool) -> Self {
        let mut resources = HashMap::new();
        let mut data_sources = HashMap::new();
        for service in services() {
            log::debug!(
                "registering service {} ({} resources, {} data sources)",
                service.name,
                service.resources.len(),
                service.data_sources.len()
            );
            for resource in service.resources {
                resources.insert(resource.type_name(), resource);
            }
            for data_source in service.data_sources {
                data_sources.insert(data_source.type_name(), data_source);
            }
        }

        Self {
            ctx: ProviderContext {
                client,
                subscription_id: subscription_id.to_string(),
            },
            overwrite_existing,
            resources,
            data_sources,
        }
    }

    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    /// Registered resource and data source types, sorted by name
    pub fn types(&self) -> Vec<Box<dyn ResourceType>> {
        let mut types: Vec<Box<dyn ResourceType>> = Vec::new();
        for resource in self.resources.values() {
            types.push(Box::new(ResourceKind(Arc::clone(resource))));
        }
        for data_source in self.data_sources.values() {
            types.push(Box::new(DataSourceKind(Arc::clone(data_source))));
        }
        types.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then(a.is_data_source().cmp(&b.is_data_source()))
        });
        types
    }

    fn resource(&self, id: &ResourceId) -> ProviderResult<&Arc<dyn AzureResource>> {
        self.resources.get(id.resource_type.as_str()).ok_or_else(|| {
            ProviderError::new(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    fn data_source(&self, id: &ResourceId) -> ProviderResult<&Arc<dyn AzureDataSource>> {
        self.data_sources
            .get(id.resource_type.as_str())
            .ok_or_else(|| {
                ProviderError::new(format!("Unknown data source type: {}", id.resource_type))
                    .for_resource(id.clone())
            })
    }

    fn validate(&self, kind: &Arc<dyn AzureResource>, resource: &Resource) -> ProviderResult<()> {
        ResourceKind(Arc::clone(kind))
            .validate(&resource.attributes)
            .map_err(|errors| ProviderError::validation(errors.join("; ")))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Read a resource by its Azure resource ID
    pub async fn read_resource(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> ProviderResult<State> {
        let kind = self.resource(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        kind.validate_id(identifier)
            .map_err(|e| ProviderError::invalid_id(e).for_resource(id.clone()))?;

        let read = with_timeout("read", kind.timeouts().read, kind.read(&self.ctx, identifier));
        match read.await.map_err(|e| e.for_resource(id.clone()))? {
            Some(attributes) => Ok(State::existing(id.clone(), attributes).with_identifier(identifier)),
            None => {
                log::warn!("{} was not found - removing from state", identifier);
                Ok(State::not_found(id.clone()))
            }
        }
    }

    /// Create a resource, refusing to adopt an existing remote object
    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let kind = self.resource(&resource.id)?;
        self.validate(kind, resource)
            .map_err(|e| e.for_resource(resource.id.clone()))?;

        let mut config = resource.attributes.clone();
        let schema = kind.schema();
        schema.apply_defaults(&mut config);

        let timeouts = kind.timeouts();
        let create = async {
            let azure_id = kind.id_from_config(&self.ctx, &config)?;

            if !self.overwrite_existing && kind.read(&self.ctx, &azure_id).await?.is_some() {
                return Err(ProviderError::requires_import(&azure_id));
            }

            log::info!("creating {} {}", kind.type_name(), azure_id);
            kind.create(&self.ctx, &azure_id, &config).await?;

            let attributes = kind.read(&self.ctx, &azure_id).await?.ok_or_else(|| {
                ProviderError::new(format!("{} was not found after creation", azure_id))
            })?;
            Ok((azure_id, attributes))
        };

        let (azure_id, mut attributes) = with_timeout("create", timeouts.create, create)
            .await
            .map_err(|e| e.for_resource(resource.id.clone()))?;
        schema.carry_over_write_only(&config, &mut attributes);

        Ok(State::existing(resource.id.clone(), attributes).with_identifier(azure_id))
    }

    /// Update a resource in place
    pub async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let kind = self.resource(id)?;
        self.validate(kind, to).map_err(|e| e.for_resource(id.clone()))?;
        kind.validate_id(identifier)
            .map_err(|e| ProviderError::invalid_id(e).for_resource(id.clone()))?;

        let mut config = to.attributes.clone();
        let schema = kind.schema();
        schema.apply_defaults(&mut config);

        let update = async {
            log::info!("updating {} {}", kind.type_name(), identifier);
            kind.update(&self.ctx, identifier, &from.attributes, &config)
                .await?;
            kind.read(&self.ctx, identifier).await?.ok_or_else(|| {
                ProviderError::not_found(format!("{} was not found after update", identifier))
            })
        };

        let mut attributes = with_timeout("update", kind.timeouts().update, update)
            .await
            .map_err(|e| e.for_resource(id.clone()))?;
        schema.carry_over_write_only(&config, &mut attributes);

        Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Delete a resource; one that is already gone counts as deleted
    pub async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let kind = self.resource(id)?;
        kind.validate_id(identifier)
            .map_err(|e| ProviderError::invalid_id(e).for_resource(id.clone()))?;

        log::info!("deleting {} {}", kind.type_name(), identifier);
        with_timeout(
            "delete",
            kind.timeouts().delete,
            kind.delete(&self.ctx, identifier),
        )
        .await
        .map_err(|e| e.for_resource(id.clone()))
    }

    /// Adopt an existing remote object under `id`
    pub async fn import_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let kind = self.resource(id)?;
        kind.validate_id(identifier)
            .map_err(|e| ProviderError::invalid_id(e).for_resource(id.clone()))?;

        let read = with_timeout("read", kind.timeouts().read, kind.import(&self.ctx, identifier));
        match read.await.map_err(|e| e.for_resource(id.clone()))? {
            Some(attributes) => Ok(State::existing(id.clone(), attributes).with_identifier(identifier)),
            None => Err(ProviderError::not_found("Cannot import non-existent remote object")
                .for_resource(id.clone())),
        }
    }

    /// Look up a data source
    pub async fn lookup_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let kind = self.data_source(&resource.id)?;
        kind.schema()
            .validate(&resource.attributes)
            .map_err(|errors| {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                ProviderError::validation(messages.join("; ")).for_resource(resource.id.clone())
            })?;

        let (azure_id, attributes) = with_timeout(
            "read",
            kind.timeouts().read,
            kind.read(&self.ctx, &resource.attributes),
        )
        .await
        .map_err(|e| e.for_resource(resource.id.clone()))?;

        Ok(State::existing(resource.id.clone(), attributes).with_identifier(azure_id))
    }
}
