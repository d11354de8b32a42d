//! # Berth API Server - Core Library Crate
//!
//! REST gateway in front of the berth custom resources. Clients talk JSON to
//! a fixed path prefix; each request is validated, translated into the
//! stored custom-resource shape, and written to or read from the object
//! store. Controllers elsewhere act on what is stored; this crate never
//! reconciles anything itself.
//!
//! ## Layout
//! - `core`: errors, configuration, quantity parsing, name validation,
//!   reference resolution and response projection helpers
//! - `resources`: the six custom resource kinds and their request/view shapes
//! - `store`: the object-store seam with the cluster and in-memory backends
//! - `gateway`: the generic per-kind CRUD gateway and the HTTP surface
//! - `observability`: logging setup

/// Errors, configuration, and the translation helpers shared by every kind
pub mod core;

/// Per-kind gateways and the axum HTTP server
pub mod gateway;

pub mod observability;

/// Custom resource definitions
pub mod resources;

/// Object store abstraction and backends
pub mod store;

pub use core::config::ApiServerConfig;
pub use core::error::{GatewayError, GatewayResult};
pub use gateway::{build_router, ApiServer, Gateway, Gateways, ResourceKind};
pub use store::{KubeStore, MemoryStore, ObjectStore, StoreError};
