//! Microsoft.Consumption budgets

pub mod budget;
pub mod ids;

use std::sync::Arc;

use crate::registration::Registration;

pub use budget::{BudgetResource, BudgetScope};
pub use ids::BudgetId;

pub(crate) const API_VERSION: &str = "2019-10-01";

pub fn registration() -> Registration {
    Registration {
        name: "Consumption",
        resources: vec![
            Arc::new(BudgetResource::new(BudgetScope::ManagementGroup)),
            Arc::new(BudgetResource::new(BudgetScope::ResourceGroup)),
            Arc::new(BudgetResource::new(BudgetScope::Subscription)),
        ],
        data_sources: Vec::new(),
    }
}
