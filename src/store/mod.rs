//! # Object Store
//!
//! The gateway never talks to the API server directly. Each gateway holds a
//! handle to an [`ObjectStore`] for its resource type, constructed once at
//! startup and injected, so the same translation code runs against the live
//! cluster ([`KubeStore`]) or an in-process map ([`MemoryStore`]).
//!
//! Objects carry their optimistic-concurrency token in
//! `metadata.resourceVersion`. A `replace` whose token no longer matches the
//! stored object fails with [`StoreError::Conflict`].

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub mod kube_store;
pub mod memory;

pub use kube_store::KubeStore;
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a store backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,

    #[error("object already exists")]
    AlreadyExists,

    /// Concurrent modification: the supplied version token is stale
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The store rejected the object itself (bad name, schema violation)
    #[error("invalid object: {message}")]
    Invalid { message: String },

    #[error("backend failure: {message}")]
    Backend { message: String },
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => match response.code {
                404 => StoreError::NotFound,
                409 if response.reason == "AlreadyExists" => StoreError::AlreadyExists,
                409 => StoreError::Conflict {
                    message: response.message,
                },
                400 | 422 => StoreError::Invalid {
                    message: response.message,
                },
                _ => StoreError::Backend {
                    message: response.message,
                },
            },
            other => StoreError::Backend {
                message: other.to_string(),
            },
        }
    }
}

/// Bounds every stored resource type satisfies: a namespaced custom
/// resource with a static type, serializable in both directions.
pub trait StoredResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> StoredResource for T where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Namespaced CRUD over one resource type
#[async_trait]
pub trait ObjectStore<R: StoredResource>: Send + Sync {
    async fn list(&self, namespace: &str) -> StoreResult<Vec<R>>;

    async fn get(&self, namespace: &str, name: &str) -> StoreResult<R>;

    /// Insert a new object. The returned copy carries the identity and
    /// version token the store assigned.
    async fn create(&self, namespace: &str, object: &R) -> StoreResult<R>;

    /// Overwrite an existing object. When `object` carries a
    /// `resourceVersion` it must match the stored one.
    async fn replace(&self, namespace: &str, name: &str, object: &R) -> StoreResult<R>;

    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{} happened", reason),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_kube_errors_are_classified_by_status() {
        assert_eq!(StoreError::from(api_error(404, "NotFound")), StoreError::NotFound);
        assert_eq!(
            StoreError::from(api_error(409, "AlreadyExists")),
            StoreError::AlreadyExists
        );
        assert!(matches!(
            StoreError::from(api_error(409, "Conflict")),
            StoreError::Conflict { .. }
        ));
        assert!(matches!(
            StoreError::from(api_error(422, "Invalid")),
            StoreError::Invalid { .. }
        ));
        assert!(matches!(
            StoreError::from(api_error(503, "ServiceUnavailable")),
            StoreError::Backend { .. }
        ));
    }
}
