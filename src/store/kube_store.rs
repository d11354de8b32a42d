//! # Cluster Store
//!
//! [`ObjectStore`] over the Kubernetes API server. Every call goes through a
//! namespaced `Api<R>`; API status errors are classified into
//! [`StoreError`] by the `From<kube::Error>` impl in the parent module.
//! Optimistic concurrency is enforced server side from
//! `metadata.resourceVersion`.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::debug;

use super::{ObjectStore, StoreError, StoreResult, StoredResource};

/// Store backed by the cluster API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Connect using in-cluster configuration, falling back to the local
    /// kubeconfig.
    pub async fn try_default() -> StoreResult<Self> {
        let client = Client::try_default().await.map_err(StoreError::from)?;
        Ok(Self { client })
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<R: StoredResource>(&self, namespace: &str) -> Api<R> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl<R: StoredResource> ObjectStore<R> for KubeStore {
    async fn list(&self, namespace: &str) -> StoreResult<Vec<R>> {
        let list = self.api::<R>(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get(&self, namespace: &str, name: &str) -> StoreResult<R> {
        Ok(self.api::<R>(namespace).get(name).await?)
    }

    async fn create(&self, namespace: &str, object: &R) -> StoreResult<R> {
        let created = self
            .api::<R>(namespace)
            .create(&PostParams::default(), object)
            .await?;
        debug!(kind = %R::kind(&()), namespace, "object created");
        Ok(created)
    }

    async fn replace(&self, namespace: &str, name: &str, object: &R) -> StoreResult<R> {
        // The API server compares metadata.resourceVersion and answers 409 on a stale token
        Ok(self
            .api::<R>(namespace)
            .replace(name, &PostParams::default(), object)
            .await?)
    }

    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()> {
        self.api::<R>(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
