//! Microsoft.DBforPostgreSQL single servers

pub mod ids;
pub mod server;

use std::sync::Arc;

use crate::registration::Registration;

pub use ids::ServerId;
pub use server::PostgresServerResource;

pub(crate) const API_VERSION: &str = "2017-12-01";

pub fn registration() -> Registration {
    Registration {
        name: "PostgreSQL",
        resources: vec![Arc::new(PostgresServerResource)],
        data_sources: Vec::new(),
    }
}
