use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::trace;

use operator_types::Crd;
use operator_types::InputK8Obj;
use operator_types::K8Meta;
use operator_types::K8Obj;
use operator_types::ObjectMeta;
use operator_types::Spec;
use operator_types::UpdateK8ObjStatus;
use operator_types::UpdatedK8Obj;

use crate::ResourceStore;
use crate::StoreError;

#[derive(Error, Debug)]
pub enum InMemoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{key} has been modified: resource version {expected} is stale, current is {current}")]
    Conflict {
        key: String,
        expected: String,
        current: String,
    },
    #[error("json: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("lock poison error")]
    LockPoisonError,
}

impl StoreError for InMemoryError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ItemKey {
    crd: &'static Crd,
    ns: String,
    name: String,
}

impl ItemKey {
    fn new<S>(metadata: &dyn K8Meta) -> Self
    where
        S: Spec,
    {
        ItemKey {
            crd: S::metadata(),
            ns: metadata.namespace().to_owned(),
            name: metadata.name().to_owned(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}/{}", self.crd.names.kind, self.ns, self.name)
    }
}

type ItemMap = HashMap<ItemKey, Value>;

/// Store keeping objects as json values in memory.
///
/// Assigns uid and resource version on create, bumps resource version on every write
/// and rejects writes carrying a stale resource version.
/// Clones share the same objects.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    store: Arc<RwLock<ItemMap>>,
    sequence: Arc<AtomicU64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_uid(&self) -> String {
        format!("00000000-0000-4000-8000-{:012x}", self.next_sequence())
    }

    /// number of objects of kind `S`
    pub fn count<S: Spec>(&self) -> Result<usize, InMemoryError> {
        let store = self.store.read().map_err(|_| InMemoryError::LockPoisonError)?;
        Ok(store.keys().filter(|key| key.crd == S::metadata()).count())
    }
}

fn check_version(key: &ItemKey, expected: &str, current: &str) -> Result<(), InMemoryError> {
    if !expected.is_empty() && expected != current {
        return Err(InMemoryError::Conflict {
            key: key.to_string(),
            expected: expected.to_owned(),
            current: current.to_owned(),
        });
    }
    Ok(())
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    type Error = InMemoryError;

    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        let store = self.store.read().map_err(|_| InMemoryError::LockPoisonError)?;
        let item_key = ItemKey::new::<S>(metadata);
        let item_value = store
            .get(&item_key)
            .ok_or_else(|| InMemoryError::NotFound(item_key.to_string()))?;
        trace!("retrieved {}", item_key);
        Ok(serde_json::from_value(item_value.clone())?)
    }

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        let item_key = ItemKey::new::<S>(&value.metadata);
        let mut store = self.store.write().map_err(|_| InMemoryError::LockPoisonError)?;
        if store.contains_key(&item_key) {
            return Err(InMemoryError::AlreadyExists(item_key.to_string()));
        }

        let input_meta = value.metadata;
        let k8_obj: K8Obj<S> = K8Obj {
            api_version: value.api_version,
            kind: value.kind,
            metadata: ObjectMeta {
                name: input_meta.name,
                namespace: input_meta.namespace,
                uid: self.next_uid(),
                resource_version: self.next_sequence().to_string(),
                generation: Some(1),
                labels: input_meta.labels,
                owner_references: input_meta.owner_references,
                annotations: input_meta.annotations,
                ..Default::default()
            },
            spec: value.spec,
            header: value.header,
            status: S::Status::default(),
        };

        store.insert(item_key.clone(), serde_json::to_value(&k8_obj)?);
        debug!("created {} at version {}", item_key, k8_obj.metadata.resource_version);
        Ok(k8_obj)
    }

    async fn replace_item<S>(&self, value: UpdatedK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        let item_key = ItemKey::new::<S>(&value.metadata);
        let mut store = self.store.write().map_err(|_| InMemoryError::LockPoisonError)?;
        let item_value = store
            .get_mut(&item_key)
            .ok_or_else(|| InMemoryError::NotFound(item_key.to_string()))?;

        let current: K8Obj<S> = serde_json::from_value(item_value.clone())?;
        check_version(
            &item_key,
            &value.metadata.resource_version,
            &current.metadata.resource_version,
        )?;

        let update_meta = value.metadata;
        let k8_obj: K8Obj<S> = K8Obj {
            api_version: value.api_version,
            kind: value.kind,
            metadata: ObjectMeta {
                resource_version: self.next_sequence().to_string(),
                generation: current.metadata.generation.map(|generation| generation + 1),
                labels: update_meta.labels,
                owner_references: update_meta.owner_references,
                annotations: update_meta.annotations,
                finalizers: update_meta.finalizers,
                ..current.metadata
            },
            spec: value.spec,
            header: value.header,
            status: current.status,
        };

        *item_value = serde_json::to_value(&k8_obj)?;
        debug!("replaced {} at version {}", item_key, k8_obj.metadata.resource_version);
        Ok(k8_obj)
    }

    async fn update_status<S>(
        &self,
        update_k8_status: &UpdateK8ObjStatus<S>,
    ) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        let item_key = ItemKey::new::<S>(&update_k8_status.metadata);
        let mut store = self.store.write().map_err(|_| InMemoryError::LockPoisonError)?;
        let item_value = store
            .get_mut(&item_key)
            .ok_or_else(|| InMemoryError::NotFound(item_key.to_string()))?;

        let mut k8_obj: K8Obj<S> = serde_json::from_value(item_value.clone())?;
        check_version(
            &item_key,
            &update_k8_status.metadata.resource_version,
            &k8_obj.metadata.resource_version,
        )?;
        k8_obj.status = update_k8_status.status.clone();
        k8_obj.metadata.resource_version = self.next_sequence().to_string();

        *item_value = serde_json::to_value(&k8_obj)?;
        debug!("updated status of {}", item_key);
        Ok(k8_obj)
    }
}
