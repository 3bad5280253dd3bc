//! Azure services
//!
//! One module per ARM resource provider namespace. Each exposes its typed
//! resource IDs, the expand/flatten mapping of its resources and a
//! `registration()` listing the types it contributes.

pub mod consumption;
pub mod dns;
pub mod policy;
pub mod postgres;
pub mod web;
