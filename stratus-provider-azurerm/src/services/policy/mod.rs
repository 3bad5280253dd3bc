//! Microsoft.PolicyInsights remediations

pub mod ids;
pub mod remediation;

use std::sync::Arc;

use crate::registration::Registration;

pub use ids::{PolicyAssignmentId, RemediationId};
pub use remediation::{RemediationResource, RemediationScope};

pub(crate) const API_VERSION: &str = "2021-10-01";

pub fn registration() -> Registration {
    Registration {
        name: "Policy",
        resources: vec![
            Arc::new(RemediationResource::new(RemediationScope::ManagementGroup)),
            Arc::new(RemediationResource::new(RemediationScope::Resource)),
            Arc::new(RemediationResource::new(RemediationScope::ResourceGroup)),
            Arc::new(RemediationResource::new(RemediationScope::Subscription)),
        ],
        data_sources: Vec::new(),
    }
}
