#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use operator_store::{InMemoryError, InMemoryStore, ResourceStore};
use operator_types::{InputK8Obj, InputObjectMeta, K8Meta, K8Obj, Spec};
use operator_types::{UpdateK8ObjStatus, UpdatedK8Obj};
use sample_operator::api::{SampleOperator, SampleOperatorSpec};
use sample_operator::CancellationToken;

pub const NS: &str = "default";

/// store wrapper counting write attempts and failing or cancelling on request
#[derive(Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    writes: AtomicUsize,
    status_failures: AtomicUsize,
    cancel_after_create: Mutex<Option<CancellationToken>>,
}

impl FaultyStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    /// write calls seen so far, including failed ones
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_next_status_updates(&self, count: usize) {
        self.status_failures.store(count, Ordering::SeqCst);
    }

    /// cancel `token` right after the next create went through
    pub fn cancel_after_create(&self, token: CancellationToken) {
        *self.cancel_after_create.lock().unwrap() = Some(token);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceStore for FaultyStore {
    type Error = InMemoryError;

    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
        M: K8Meta + Send + Sync,
    {
        self.inner.retrieve_item::<S, M>(metadata).await
    }

    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        self.record_write();
        let result = self.inner.create_item(value).await;
        let token = self.cancel_after_create.lock().unwrap().take();
        if let Some(token) = token {
            token.cancel();
        }
        result
    }

    async fn replace_item<S>(&self, value: UpdatedK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        self.record_write();
        self.inner.replace_item(value).await
    }

    async fn update_status<S>(
        &self,
        value: &UpdateK8ObjStatus<S>,
    ) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
    {
        self.record_write();
        let failing = self
            .status_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(InMemoryError::Conflict {
                key: value.metadata.to_string(),
                expected: value.metadata.resource_version.clone(),
                current: "injected".to_owned(),
            });
        }
        self.inner.update_status(value).await
    }
}

pub fn sample_spec() -> SampleOperatorSpec {
    SampleOperatorSpec {
        size: 1,
        service_instance_name: "db".to_owned(),
    }
}

/// persist a parent directly in the backing store, bypassing write counting
pub async fn new_parent(store: &FaultyStore, name: &str) -> SampleOperator {
    store
        .inner()
        .create_item(InputK8Obj::new(sample_spec(), InputObjectMeta::named(name, NS)))
        .await
        .expect("parent created")
}
