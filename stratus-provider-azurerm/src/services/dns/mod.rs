//! Microsoft.Network DNS zones

mod data_source;
pub mod ids;
pub mod zone;

use std::sync::Arc;

use crate::registration::Registration;

pub use data_source::DnsZoneDataSource;
pub use ids::DnsZoneId;
pub use zone::DnsZoneResource;

pub(crate) const API_VERSION: &str = "2018-05-01";

pub fn registration() -> Registration {
    Registration {
        name: "DNS",
        resources: vec![Arc::new(DnsZoneResource)],
        data_sources: vec![Arc::new(DnsZoneDataSource)],
    }
}
