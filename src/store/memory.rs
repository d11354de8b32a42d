//! In-process store with the same observable semantics as the API server:
//! identity and version tokens are assigned on write, stale tokens are
//! rejected, and missing names are reported as not found.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{ObjectStore, StoreError, StoreResult, StoredResource};

type Key = (String, String);

pub struct MemoryStore<R> {
    objects: Mutex<BTreeMap<Key, R>>,
    revision: AtomicU64,
}

impl<R: StoredResource> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    /// Number of stored objects across all namespaces
    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_revision(&self) -> String {
        (self.revision.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn object_name(object: &R) -> StoreResult<String> {
        object
            .meta()
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StoreError::Invalid {
                message: "metadata.name is required".to_string(),
            })
    }
}

impl<R: StoredResource> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: StoredResource> ObjectStore<R> for MemoryStore<R> {
    async fn list(&self, namespace: &str) -> StoreResult<Vec<R>> {
        let objects = self.objects.lock();
        Ok(objects
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, object)| object.clone())
            .collect())
    }

    async fn get(&self, namespace: &str, name: &str) -> StoreResult<R> {
        let objects = self.objects.lock();
        objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, namespace: &str, object: &R) -> StoreResult<R> {
        let name = Self::object_name(object)?;
        let mut objects = self.objects.lock();
        let key = (namespace.to_string(), name);
        if objects.contains_key(&key) {
            return Err(StoreError::AlreadyExists);
        }

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.namespace = Some(namespace.to_string());
        meta.uid = Some(Uuid::new_v4().to_string());
        meta.creation_timestamp = Some(Time(Utc::now()));
        meta.resource_version = Some(self.next_revision());

        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(&self, namespace: &str, name: &str, object: &R) -> StoreResult<R> {
        if Self::object_name(object)? != name {
            return Err(StoreError::Invalid {
                message: format!("metadata.name does not match \"{}\"", name),
            });
        }

        let mut objects = self.objects.lock();
        let key = (namespace.to_string(), name.to_string());
        let current = objects.get(&key).ok_or(StoreError::NotFound)?;

        let current_version = current.meta().resource_version.clone();
        if let Some(version) = &object.meta().resource_version {
            if current_version.as_ref() != Some(version) {
                return Err(StoreError::Conflict {
                    message: format!(
                        "resourceVersion {} is stale, current is {}",
                        version,
                        current_version.unwrap_or_default()
                    ),
                });
            }
        }

        let uid = current.meta().uid.clone();
        let created = current.meta().creation_timestamp.clone();

        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.namespace = Some(namespace.to_string());
        meta.uid = uid;
        meta.creation_timestamp = created;
        meta.resource_version = Some(self.next_revision());

        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let mut objects = self.objects.lock();
        objects
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
