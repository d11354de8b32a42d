//! # Resource Gateways
//!
//! One generic [`Gateway`] implements List/Get/Create/Update/Delete for every
//! kind. What differs per kind (request shape, validation, stored spec,
//! response view) is supplied through [`ResourceKind`].
//!
//! Update is a full-spec replace guarded by the store's version token: the
//! current object is fetched, its spec swapped, and written back with the
//! `resourceVersion` it was read at. Status and identity metadata ride along
//! untouched. If another writer got there first the store rejects the write
//! and the caller sees a `Conflict`.

use std::sync::Arc;

use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::validation::validate_name;
use crate::resources::{Archive, CloudInit, Disk, ISOImage, LoadBalancer, Server};
use crate::store::{MemoryStore, ObjectStore, StoreError, StoredResource};

pub mod server;

pub use server::{build_router, ApiServer};

/// Per-kind translation capabilities: decode, validate, build the stored
/// spec, and project the stored object back out.
pub trait ResourceKind: StoredResource {
    /// Desired state, as stored
    type Spec: Send;
    /// Create/replace payload, as clients send it
    type Request: DeserializeOwned + Send + 'static;
    /// Response shape
    type View: Serialize + Send + 'static;

    fn request_name(request: &Self::Request) -> &str;

    /// Validate a request and resolve its quantities and references.
    /// Must not touch the store.
    fn to_spec(request: Self::Request, namespace: &str) -> GatewayResult<Self::Spec>;

    fn from_spec(name: &str, spec: Self::Spec) -> Self;

    /// Swap in a new spec, leaving metadata and status alone
    fn replace_spec(&mut self, spec: Self::Spec);

    fn to_view(&self) -> Self::View;
}

/// CRUD entry point for one kind
pub struct Gateway<K: ResourceKind> {
    store: Arc<dyn ObjectStore<K>>,
    namespace: String,
}

impl<K: ResourceKind> Clone for Gateway<K> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

impl<K: ResourceKind> Gateway<K> {
    pub fn new<S: Into<String>>(store: Arc<dyn ObjectStore<K>>, namespace: S) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    fn kind() -> String {
        K::kind(&()).into_owned()
    }

    fn store_failure(&self, name: &str, operation: &str, err: StoreError) -> GatewayError {
        let kind = Self::kind();
        let failure = GatewayError::from_store(&kind, name, operation, err);
        match &failure {
            GatewayError::Backend { message, .. } => error!(
                kind = %kind,
                name,
                operation,
                namespace = %self.namespace,
                error = %message,
                retryable = failure.is_retryable(),
                "store operation failed"
            ),
            GatewayError::Conflict { reason, .. } => {
                warn!(kind = %kind, name, operation, reason = %reason, "store reported conflict")
            }
            other => debug!(
                kind = %kind,
                name,
                operation,
                error_type = other.error_type(),
                error = %other,
                "store rejected request"
            ),
        }
        failure
    }

    /// Every stored object of this kind. An empty namespace is an empty list.
    pub async fn list(&self) -> GatewayResult<Vec<K::View>> {
        let objects = self
            .store
            .list(&self.namespace)
            .await
            .map_err(|e| self.store_failure("", "list", e))?;
        Ok(objects.iter().map(K::to_view).collect())
    }

    pub async fn get(&self, name: &str) -> GatewayResult<K::View> {
        validate_name("name", name)?;
        let object = self
            .store
            .get(&self.namespace, name)
            .await
            .map_err(|e| self.store_failure(name, "get", e))?;
        Ok(object.to_view())
    }

    pub async fn create(&self, request: K::Request) -> GatewayResult<K::View> {
        let name = K::request_name(&request).to_string();
        validate_name("name", &name)?;
        let spec = K::to_spec(request, &self.namespace)?;

        let mut object = K::from_spec(&name, spec);
        object.meta_mut().namespace = Some(self.namespace.clone());

        let created = self
            .store
            .create(&self.namespace, &object)
            .await
            .map_err(|e| self.store_failure(&name, "create", e))?;

        info!(kind = %Self::kind(), name = %name, namespace = %self.namespace, "resource created");
        Ok(created.to_view())
    }

    /// Replace the spec of `name`. A `name` in the body, when present,
    /// must agree with the path.
    pub async fn update(&self, name: &str, request: K::Request) -> GatewayResult<K::View> {
        validate_name("name", name)?;
        let body_name = K::request_name(&request);
        if !body_name.is_empty() && body_name != name {
            return Err(GatewayError::validation(
                "name",
                format!("body name {:?} does not match {:?}", body_name, name),
            ));
        }
        let spec = K::to_spec(request, &self.namespace)?;

        let mut current = self
            .store
            .get(&self.namespace, name)
            .await
            .map_err(|e| self.store_failure(name, "get", e))?;
        current.replace_spec(spec);

        let updated = self
            .store
            .replace(&self.namespace, name, &current)
            .await
            .map_err(|e| self.store_failure(name, "update", e))?;

        info!(kind = %Self::kind(), name, namespace = %self.namespace, "resource updated");
        Ok(updated.to_view())
    }

    /// Not idempotent: deleting a missing name is `NotFound`
    pub async fn delete(&self, name: &str) -> GatewayResult<()> {
        validate_name("name", name)?;
        self.store
            .delete(&self.namespace, name)
            .await
            .map_err(|e| self.store_failure(name, "delete", e))?;

        info!(kind = %Self::kind(), name, namespace = %self.namespace, "resource deleted");
        Ok(())
    }
}

/// The six gateways the HTTP surface is built from
#[derive(Clone)]
pub struct Gateways {
    pub archives: Gateway<Archive>,
    pub cloudinits: Gateway<CloudInit>,
    pub disks: Gateway<Disk>,
    pub servers: Gateway<Server>,
    pub loadbalancers: Gateway<LoadBalancer>,
    pub isoimages: Gateway<ISOImage>,
}

impl Gateways {
    /// All kinds backed by one store handle, e.g. a shared `KubeStore`
    pub fn shared<S>(store: Arc<S>, namespace: &str) -> Self
    where
        S: ObjectStore<Archive>
            + ObjectStore<CloudInit>
            + ObjectStore<Disk>
            + ObjectStore<Server>
            + ObjectStore<LoadBalancer>
            + ObjectStore<ISOImage>
            + 'static,
    {
        Self {
            archives: Gateway::new(store.clone() as Arc<dyn ObjectStore<Archive>>, namespace),
            cloudinits: Gateway::new(store.clone() as Arc<dyn ObjectStore<CloudInit>>, namespace),
            disks: Gateway::new(store.clone() as Arc<dyn ObjectStore<Disk>>, namespace),
            servers: Gateway::new(store.clone() as Arc<dyn ObjectStore<Server>>, namespace),
            loadbalancers: Gateway::new(
                store.clone() as Arc<dyn ObjectStore<LoadBalancer>>,
                namespace,
            ),
            isoimages: Gateway::new(store as Arc<dyn ObjectStore<ISOImage>>, namespace),
        }
    }

    /// Every kind backed by its own empty in-process store
    pub fn in_memory(namespace: &str) -> Self {
        Self {
            archives: Gateway::new(Arc::new(MemoryStore::<Archive>::new()), namespace),
            cloudinits: Gateway::new(Arc::new(MemoryStore::<CloudInit>::new()), namespace),
            disks: Gateway::new(Arc::new(MemoryStore::<Disk>::new()), namespace),
            servers: Gateway::new(Arc::new(MemoryStore::<Server>::new()), namespace),
            loadbalancers: Gateway::new(Arc::new(MemoryStore::<LoadBalancer>::new()), namespace),
            isoimages: Gateway::new(Arc::new(MemoryStore::<ISOImage>::new()), namespace),
        }
    }
}
