//! Effect - Side effects as values
//!
//! An Effect describes an operation against the provider without performing
//! it. Plans are lists of Effects; only applying a Plan calls the API.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Look up a data source
    Read(Resource),
    Create(Resource),
    /// In-place update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Delete then create, because a force-new attribute changed
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    Delete {
        id: ResourceId,
        identifier: String,
    },
}

impl Effect {
    /// Whether this Effect changes remote infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => {
                id
            }
        }
    }

    /// Single-character marker used when printing a plan
    pub fn symbol(&self) -> &'static str {
        match self {
            Effect::Read(_) => "<=",
            Effect::Create(_) => "+",
            Effect::Update { .. } => "~",
            Effect::Replace { .. } => "-/+",
            Effect::Delete { .. } => "-",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_not_mutating() {
        let read = Effect::Read(Resource::new("azurerm_dns_zone", "lookup").with_read_only(true));
        assert!(!read.is_mutating());
        assert_eq!(read.resource_id().name, "lookup");

        let delete = Effect::Delete {
            id: ResourceId::new("azurerm_dns_zone", "main"),
            identifier: "/subscriptions/x".to_string(),
        };
        assert!(delete.is_mutating());
        assert_eq!(delete.symbol(), "-");
    }
}
