use std::fmt::Debug;
use std::fmt::Display;

use async_trait::async_trait;
use tracing::debug;

use operator_types::set_controller_reference;
use operator_types::{InputK8Obj, K8Meta, K8Obj, Spec, UpdateK8ObjStatus, UpdatedK8Obj};
use operator_types::{OwnerReferenceHolder, OwnershipError};

/// error returned by a resource store
pub trait StoreError: Debug + Display + std::error::Error {
    /// object addressed by the call does not exist
    fn is_not_found(&self) -> bool;

    /// object being created exists already
    fn is_already_exists(&self) -> bool {
        false
    }

    /// write was made against a stale resource version
    fn is_conflict(&self) -> bool {
        false
    }
}

/// key-addressed store of resource objects.
/// Objects are addressed by (kind, namespace, name), the kind comes from the spec type `S`.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    type Error: StoreError + Send + Sync + 'static;

    /// retrieval a single item
    async fn retrieve_item<S, M>(&self, metadata: &M) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec,
        M: K8Meta + Send + Sync;

    /// create new object, fails if it exists already
    async fn create_item<S>(&self, value: InputK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec;

    /// replace spec, header and metadata of existing object.
    /// a non empty resource version must match the stored one
    async fn replace_item<S>(&self, value: UpdatedK8Obj<S>) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec;

    /// update status subresource
    async fn update_status<S>(
        &self,
        value: &UpdateK8ObjStatus<S>,
    ) -> Result<K8Obj<S>, Self::Error>
    where
        S: Spec;

    /// link `child` to `owner` so the platform removes it with its owner
    fn set_owner_reference<P, M>(&self, owner: &K8Obj<P>, child: &mut M) -> Result<(), OwnershipError>
    where
        P: Spec,
        M: OwnerReferenceHolder,
    {
        set_controller_reference::<P, M>(&owner.metadata, child)
    }

    /// retrieve item, not found is mapped to `None`
    async fn lookup_item<S, M>(&self, metadata: &M) -> Result<Option<K8Obj<S>>, Self::Error>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync,
    {
        match self.retrieve_item::<S, M>(metadata).await {
            Ok(item) => Ok(Some(item)),
            Err(err) => {
                if err.is_not_found() {
                    debug!("{}: '{}' not found", S::label(), metadata);
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Check if the object exists, return true or false.
    async fn exists<S, M>(&self, metadata: &M) -> Result<bool, Self::Error>
    where
        S: Spec,
        M: K8Meta + Display + Send + Sync,
    {
        debug!("check if '{}' exists", metadata);
        Ok(self.lookup_item::<S, M>(metadata).await?.is_some())
    }
}
