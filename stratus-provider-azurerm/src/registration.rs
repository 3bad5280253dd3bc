//! Resource and data source registration
//!
//! Every service module exposes a [`Registration`] listing the resource and
//! data source types it implements. The provider builds its dispatch tables
//! from [`services`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stratus_core::provider::{ProviderError, ProviderResult, ResourceType, Timeouts};
use stratus_core::resource::{Value, decode_attributes, encode_attributes};
use stratus_core::resource_id::IdParseError;
use stratus_core::schema::ResourceSchema;

use crate::client::ArmClient;
use crate::services;

/// Attribute map of a single resource
pub type Attributes = HashMap<String, Value>;

/// Everything a resource implementation needs to talk to ARM
#[derive(Clone)]
pub struct ProviderContext {
    pub client: ArmClient,
    /// Subscription used for resources whose ID is built from names
    pub subscription_id: String,
}

/// A managed resource type
///
/// Implementations own the expand/flatten mapping and the ARM calls; the
/// provider wraps them with validation, the already-exists check, timeouts and
/// not-found handling.
#[async_trait]
pub trait AzureResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Expected format of the resource ID, shown in import errors
    fn id_format(&self) -> String;

    /// Parse a stored or user-supplied ID with this type's codec
    fn validate_id(&self, id: &str) -> Result<(), IdParseError>;

    /// Cross-attribute rules the schema cannot express
    fn validate_config(&self, _config: &Attributes) -> Result<(), String> {
        Ok(())
    }

    /// Build the resource ID from configuration
    fn id_from_config(&self, ctx: &ProviderContext, config: &Attributes) -> ProviderResult<String>;

    /// Create the remote object; `id` comes from [`AzureResource::id_from_config`]
    async fn create(
        &self,
        ctx: &ProviderContext,
        id: &str,
        config: &Attributes,
    ) -> ProviderResult<()>;

    /// Read the remote object; `None` when it no longer exists
    async fn read(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>>;

    /// Read an object being imported, filling in attributes only configuration carries
    async fn import(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<Option<Attributes>> {
        self.read(ctx, id).await
    }

    async fn update(
        &self,
        ctx: &ProviderContext,
        id: &str,
        previous: &Attributes,
        config: &Attributes,
    ) -> ProviderResult<()>;

    /// Delete the remote object; an object that is already gone is not an error
    async fn delete(&self, ctx: &ProviderContext, id: &str) -> ProviderResult<()>;
}

/// A read-only lookup
#[async_trait]
pub trait AzureDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> ResourceSchema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::minutes(5, 5, 5, 5)
    }

    /// Look up the object; returns its ID and attributes
    async fn read(
        &self,
        ctx: &ProviderContext,
        config: &Attributes,
    ) -> ProviderResult<(String, Attributes)>;
}

/// The types one service contributes
pub struct Registration {
    pub name: &'static str,
    pub resources: Vec<Arc<dyn AzureResource>>,
    pub data_sources: Vec<Arc<dyn AzureDataSource>>,
}

/// Registrations of every supported service
pub fn services() -> Vec<Registration> {
    vec![
        services::consumption::registration(),
        services::dns::registration(),
        services::policy::registration(),
        services::postgres::registration(),
        services::web::registration(),
    ]
}

// =============================================================================
// ResourceType adapters
// =============================================================================

/// Every registered resource and data source type, sorted by name
///
/// Unlike [`crate::AzureRmProvider::types`] this needs no credentials, so
/// configuration can be validated offline.
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    let mut types: Vec<Box<dyn ResourceType>> = Vec::new();
    for service in services() {
        for resource in service.resources {
            types.push(Box::new(ResourceKind(resource)));
        }
        for data_source in service.data_sources {
            types.push(Box::new(DataSourceKind(data_source)));
        }
    }
    types.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then(a.is_data_source().cmp(&b.is_data_source()))
    });
    types
}

/// Describes a registered resource to the host
pub struct ResourceKind(pub Arc<dyn AzureResource>);

impl ResourceType for ResourceKind {
    fn name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }

    fn id_format(&self) -> Option<String> {
        Some(self.0.id_format())
    }

    fn validate(&self, attributes: &Attributes) -> Result<(), Vec<String>> {
        let mut errors: Vec<String> = match self.0.schema().validate(attributes) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        };
        // cross-attribute rules assume a schema-valid configuration
        if errors.is_empty()
            && let Err(e) = self.0.validate_config(attributes)
        {
            errors.push(e);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Describes a registered data source to the host
pub struct DataSourceKind(pub Arc<dyn AzureDataSource>);

impl ResourceType for DataSourceKind {
    fn name(&self) -> &'static str {
        self.0.type_name()
    }

    fn schema(&self) -> ResourceSchema {
        self.0.schema()
    }

    fn is_data_source(&self) -> bool {
        true
    }
}

// =============================================================================
// Model helpers
// =============================================================================

/// Decode configuration attributes into a typed model
pub fn decode<T: DeserializeOwned>(config: &Attributes) -> ProviderResult<T> {
    decode_attributes(config)
        .map_err(|e| ProviderError::validation("decoding configuration").with_cause(e))
}

/// Encode a typed model into attributes
pub fn encode<T: Serialize>(model: &T) -> ProviderResult<Attributes> {
    encode_attributes(model).map_err(|e| ProviderError::new("encoding state").with_cause(e))
}

/// Decode an API response body into a typed payload
pub fn from_body<T: DeserializeOwned>(body: serde_json::Value) -> ProviderResult<T> {
    serde_json::from_value(body)
        .map_err(|e| ProviderError::new("decoding API response").with_cause(e))
}

/// Encode a typed payload into a request body
pub fn to_body<T: Serialize>(payload: &T) -> ProviderResult<serde_json::Value> {
    serde_json::to_value(payload)
        .map_err(|e| ProviderError::new("encoding API request").with_cause(e))
}

/// Parse an ID with a typed codec, mapping failures to an invalid-ID error
pub fn parse_id<T: stratus_core::resource_id::ResourceIdentifier>(
    id: &str,
) -> ProviderResult<T> {
    T::parse(id).map_err(ProviderError::invalid_id)
}
