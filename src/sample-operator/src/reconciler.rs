//!
//! # Reconciler
//!
//! Level-triggered convergence of a SampleOperator and its children.
//! A pass reads current state fresh, never relies on the event which triggered it,
//! and can be repeated any number of times with the same outcome.
//!
use std::future::Future;
use std::pin::pin;

use futures_util::future::{select, Either};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace};

use operator_store::{ResourceStore, SharedStore};
use operator_types::core::config_map::ConfigMapSpec;
use operator_types::{InputK8Obj, ItemMeta, K8Obj, OwnerReferenceHolder, Spec};

use crate::api::{SampleOperator, SampleOperatorSpec, SampleOperatorStatus};
use crate::config::OperatorConfig;
use crate::converge::{desired_update, ChildResource, ConvergePolicy, ConvergeResult};
use crate::credentials::{CredentialProvider, Credentials, StaticCredentials};
use crate::error::{ReconcileError, StoreOperation};
use crate::single_flight::KeyLocks;
use crate::template::{new_config_map_for, new_pod_for};

/// outcome of a successful pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileResult {
    /// ask the scheduler for another pass even though nothing failed
    pub requeue: bool,
}

impl ReconcileResult {
    pub fn done() -> Self {
        Self { requeue: false }
    }
}

pub struct SampleOperatorReconciler<C, P = StaticCredentials> {
    store: SharedStore<C>,
    credentials: P,
    config: OperatorConfig,
    locks: KeyLocks,
}

impl<C> SampleOperatorReconciler<C, StaticCredentials>
where
    C: ResourceStore,
{
    /// reconciler handing out credentials from `config`
    pub fn new(store: SharedStore<C>, config: OperatorConfig) -> Self {
        let credentials = config.credentials.clone();
        Self::with_credentials(store, config, credentials)
    }
}

impl<C, P> SampleOperatorReconciler<C, P>
where
    C: ResourceStore,
    P: CredentialProvider,
{
    pub fn with_credentials(store: SharedStore<C>, config: OperatorConfig, credentials: P) -> Self {
        Self {
            store,
            credentials,
            config,
            locks: KeyLocks::default(),
        }
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore<C> {
        &self.store
    }

    /// Converge the parent named by `key`.
    ///
    /// A parent which no longer exists is a successful no-op, its children are removed by the platform.
    /// An error leaves completed steps in place, the next pass resumes from the observed state.
    #[instrument(skip(self, key, cancel), fields(request = %key))]
    pub async fn reconcile(
        &self,
        key: &ItemMeta,
        cancel: &CancellationToken,
    ) -> Result<ReconcileResult, ReconcileError<C::Error>> {
        if self.config.single_flight {
            self.locks.run(key, self.reconcile_pass(key, cancel)).await
        } else {
            self.reconcile_pass(key, cancel).await
        }
    }

    async fn reconcile_pass(
        &self,
        key: &ItemMeta,
        cancel: &CancellationToken,
    ) -> Result<ReconcileResult, ReconcileError<C::Error>> {
        let request = key.to_string();

        let parent = Self::cancellable(
            cancel,
            &request,
            self.store.lookup_item::<SampleOperatorSpec, _>(key),
        )
        .await?
        .map_err(|source| ReconcileError::Store {
            operation: StoreOperation::Get,
            kind: SampleOperatorSpec::label(),
            key: request.clone(),
            source,
        })?;

        let parent = match parent {
            Some(parent) => parent,
            None => {
                info!("parent is gone, nothing to converge");
                return Ok(ReconcileResult::done());
            }
        };

        let credentials = Self::cancellable(cancel, &request, self.credentials.credentials(&parent))
            .await?
            .map_err(|source| ReconcileError::Credentials {
                key: request.clone(),
                source,
            })?;
        trace!(?credentials, "credentials resolved");

        let pod = new_pod_for(&parent.metadata, &credentials, &self.config.workload);
        let pod = self
            .converge_child(&parent, pod, self.config.workload.policy, cancel)
            .await?;
        debug!(pod = %pod.object().metadata.name, "workload converged");

        let config_map = new_config_map_for(&parent.metadata, &credentials);
        let config_map = self
            .converge_child(&parent, config_map, self.config.config_map.policy, cancel)
            .await?;

        self.update_status(&parent, config_map.object(), cancel)
            .await?;

        info!("parent converged");
        Ok(ReconcileResult::done())
    }

    /// Make the config map of `parent` carry `credentials`.
    ///
    /// Returns true when the config map was created or updated, in which case the status of the
    /// parent is refreshed as well. Returns false when the config map is already current,
    /// the status is still written if it does not name the config map yet.
    #[instrument(
        skip(self, parent, credentials, cancel),
        fields(parent = %parent.metadata.as_item())
    )]
    pub async fn ensure_latest_config(
        &self,
        parent: &SampleOperator,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<bool, ReconcileError<C::Error>> {
        let desired = new_config_map_for(&parent.metadata, credentials);
        let result = self
            .converge_child(parent, desired, ConvergePolicy::CreateOrUpdate, cancel)
            .await?;

        let updated = !result.is_unchanged();
        if updated || parent.status.sample_config_map != result.object().metadata.name {
            self.update_status(parent, result.object(), cancel).await?;
        }
        Ok(updated)
    }

    async fn converge_child<S>(
        &self,
        parent: &SampleOperator,
        mut desired: InputK8Obj<S>,
        policy: ConvergePolicy,
        cancel: &CancellationToken,
    ) -> Result<ConvergeResult<S>, ReconcileError<C::Error>>
    where
        S: ChildResource,
    {
        let child = desired.metadata.to_string();

        self.link_owner::<S, _>(parent, &mut desired.metadata, &child)?;

        let store_error = |operation: StoreOperation, source: C::Error| ReconcileError::Store {
            operation,
            kind: S::label(),
            key: child.clone(),
            source,
        };

        let found = Self::cancellable(
            cancel,
            &child,
            self.store.lookup_item::<S, _>(&desired.metadata),
        )
        .await?
        .map_err(|source| store_error(StoreOperation::Get, source))?;

        let found = match found {
            Some(found) => found,
            None => {
                info!(kind = S::label(), %child, "creating");
                let created = Self::cancellable(cancel, &child, self.store.create_item(desired))
                    .await?
                    .map_err(|source| store_error(StoreOperation::Create, source))?;
                return Ok(ConvergeResult::Created(created));
            }
        };

        match policy {
            ConvergePolicy::CreateOnly => {
                debug!(kind = S::label(), %child, "exists, left as is");
                Ok(ConvergeResult::Unchanged(found))
            }
            ConvergePolicy::CreateOrUpdate => {
                if !S::has_drifted(&found, &desired) {
                    debug!(kind = S::label(), %child, "up to date");
                    return Ok(ConvergeResult::Unchanged(found));
                }
                info!(kind = S::label(), %child, "drifted, updating");
                let mut update = desired_update(&found, desired);
                self.link_owner::<S, _>(parent, &mut update.metadata, &child)?;
                let updated = Self::cancellable(cancel, &child, self.store.replace_item(update))
                    .await?
                    .map_err(|source| store_error(StoreOperation::Update, source))?;
                Ok(ConvergeResult::Updated(updated))
            }
        }
    }

    /// make `parent` the controller of `metadata`, rejecting a child controlled by another object
    fn link_owner<S, M>(
        &self,
        parent: &SampleOperator,
        metadata: &mut M,
        child: &str,
    ) -> Result<(), ReconcileError<C::Error>>
    where
        S: Spec,
        M: OwnerReferenceHolder,
    {
        self.store
            .set_owner_reference(parent, metadata)
            .map_err(|source| {
                error!(
                    kind = S::label(),
                    %child,
                    %source,
                    "cannot link child to parent, check parent and child placement"
                );
                ReconcileError::Ownership {
                    owner: parent.metadata.as_item().to_string(),
                    kind: S::label(),
                    key: child.to_owned(),
                    source,
                }
            })
    }

    async fn update_status(
        &self,
        parent: &SampleOperator,
        config_map: &K8Obj<ConfigMapSpec>,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError<C::Error>> {
        let key = parent.metadata.as_item().to_string();
        let status = SampleOperatorStatus {
            sample_config_map: config_map.metadata.name.clone(),
        };
        let update = parent.as_status_update(status);

        match Self::cancellable(cancel, &key, self.store.update_status(&update)).await? {
            Ok(_) => {
                debug!(config_map = %config_map.metadata.name, "status updated");
                Ok(())
            }
            Err(source) => {
                error!(%source, "failed to record config map in status");
                Err(ReconcileError::Store {
                    operation: StoreOperation::UpdateStatus,
                    kind: SampleOperatorSpec::label(),
                    key,
                    source,
                })
            }
        }
    }

    /// Run `step` unless `cancel` fires first.
    /// A step is never started once the token is cancelled.
    async fn cancellable<F, T>(
        cancel: &CancellationToken,
        key: &str,
        step: F,
    ) -> Result<T, ReconcileError<C::Error>>
    where
        F: Future<Output = T>,
    {
        if cancel.is_cancelled() {
            debug!(%key, "cancelled before next step");
            return Err(ReconcileError::Cancelled(key.to_owned()));
        }

        let step = pin!(step);
        let cancelled = pin!(cancel.cancelled());
        match select(step, cancelled).await {
            Either::Left((output, _)) => Ok(output),
            Either::Right(_) => {
                debug!(%key, "cancelled while waiting");
                Err(ReconcileError::Cancelled(key.to_owned()))
            }
        }
    }
}
