//!
//! # Convergence policy
//!
//! How an existing child is treated when it is found in the store.
//!
use serde::Deserialize;
use serde::Serialize;

use operator_types::core::config_map::ConfigMapSpec;
use operator_types::core::pod::PodSpec;
use operator_types::{InputK8Obj, K8Obj, Spec, UpdatedK8Obj};

use crate::credentials::CredentialField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConvergePolicy {
    /// create when absent, never touch an existing child
    #[default]
    CreateOnly,
    /// create when absent, replace an existing child which drifted from desired state
    CreateOrUpdate,
}

#[derive(Debug)]
pub enum ConvergeResult<S>
where
    S: Spec,
{
    Created(K8Obj<S>),
    Unchanged(K8Obj<S>),
    Updated(K8Obj<S>),
}

impl<S> ConvergeResult<S>
where
    S: Spec,
{
    pub fn object(&self) -> &K8Obj<S> {
        match self {
            Self::Created(obj) | Self::Unchanged(obj) | Self::Updated(obj) => obj,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged(_))
    }
}

/// child kind managed by the reconciler
pub trait ChildResource: Spec {
    /// true if stored object no longer matches desired one
    fn has_drifted(found: &K8Obj<Self>, desired: &InputK8Obj<Self>) -> bool;
}

impl ChildResource for ConfigMapSpec {
    fn has_drifted(found: &K8Obj<Self>, desired: &InputK8Obj<Self>) -> bool {
        CredentialField::ALL.iter().any(|field| {
            found.header.data.get(field.key()) != desired.header.data.get(field.key())
        })
    }
}

impl ChildResource for PodSpec {
    fn has_drifted(found: &K8Obj<Self>, desired: &InputK8Obj<Self>) -> bool {
        if found.spec.containers.len() != desired.spec.containers.len() {
            return true;
        }
        found
            .spec
            .containers
            .iter()
            .zip(desired.spec.containers.iter())
            .any(|(current, wanted)| {
                current.name != wanted.name
                    || current.image != wanted.image
                    || current.env != wanted.env
            })
    }
}

/// replacement for `found` carrying desired spec, header and labels.
/// Keeps resource version and owner references of `found`, the reconciler links the owner
/// against them so a child controlled by another object is rejected.
pub fn desired_update<S>(found: &K8Obj<S>, desired: InputK8Obj<S>) -> UpdatedK8Obj<S>
where
    S: Spec,
{
    let mut update = found.as_update();
    update.metadata.labels.extend(desired.metadata.labels);
    update.spec = desired.spec;
    update.header = desired.header;
    update
}
