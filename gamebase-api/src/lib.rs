//! Game server provisioning API.
//!
//! Tenants register, log in and then deploy game servers from a catalog of templates.
//! Each game server is a bundle of four cluster objects (config map, volume claim,
//! deployment and service) tied together by a shared identity label and living in the
//! tenant's own namespace.

pub mod authentication;
pub mod chain;
pub mod config;
pub mod credentials;
pub mod fleet;
pub mod instance;
pub mod k8s;
pub mod resources;
pub mod routes;
pub mod span_builder;
pub mod startup;
pub mod templates;
