//! Stratus Core
//!
//! Core library for a declarative Azure resource tool that treats side effects
//! as values: resources and their attribute values, schemas, resource ID
//! parsing, and the differ that turns desired state into a Plan of Effects.

pub mod differ;
pub mod effect;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod resource_id;
pub mod schema;
