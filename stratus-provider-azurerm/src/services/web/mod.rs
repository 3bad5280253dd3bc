//! Microsoft.Web App Service plans

pub mod ids;
pub mod service_plan;

use std::sync::Arc;

use crate::registration::Registration;

pub use ids::ServicePlanId;
pub use service_plan::ServicePlanResource;

pub(crate) const API_VERSION: &str = "2023-12-01";

pub fn registration() -> Registration {
    Registration {
        name: "Web",
        resources: vec![Arc::new(ServicePlanResource)],
        data_sources: Vec::new(),
    }
}
