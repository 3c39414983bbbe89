//!
//! # Owner linkage
//!
//! Rules for attaching a controller reference from a child object to its owner.
//! The platform uses the reference for cascade deletion only.
//!
use thiserror::Error;

use crate::K8Meta;
use crate::ObjectMeta;
use crate::OwnerReferences;
use crate::Spec;
use crate::InputObjectMeta;
use crate::UpdateItemMeta;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("owner {kind} {name} has no uid, it must be persisted before it can own objects")]
    OwnerWithoutUid { kind: String, name: String },
    #[error("cross-namespace owner references are not allowed: owner {kind} {owner_namespace}/{name}, child namespace {child_namespace}")]
    CrossNamespace {
        kind: String,
        name: String,
        owner_namespace: String,
        child_namespace: String,
    },
    #[error("{child} is already controlled by {kind} {name}")]
    AlreadyOwned {
        child: String,
        kind: String,
        name: String,
    },
}

/// metadata which can carry owner references
pub trait OwnerReferenceHolder: K8Meta {
    fn owner_references(&self) -> &[OwnerReferences];

    fn owner_references_mut(&mut self) -> &mut Vec<OwnerReferences>;

    /// the owner reference flagged as controller, if any
    fn controller_reference(&self) -> Option<&OwnerReferences> {
        self.owner_references()
            .iter()
            .find(|reference| reference.is_controller())
    }
}

impl OwnerReferenceHolder for ObjectMeta {
    fn owner_references(&self) -> &[OwnerReferences] {
        &self.owner_references
    }

    fn owner_references_mut(&mut self) -> &mut Vec<OwnerReferences> {
        &mut self.owner_references
    }
}

impl OwnerReferenceHolder for InputObjectMeta {
    fn owner_references(&self) -> &[OwnerReferences] {
        &self.owner_references
    }

    fn owner_references_mut(&mut self) -> &mut Vec<OwnerReferences> {
        &mut self.owner_references
    }
}

impl OwnerReferenceHolder for UpdateItemMeta {
    fn owner_references(&self) -> &[OwnerReferences] {
        &self.owner_references
    }

    fn owner_references_mut(&mut self) -> &mut Vec<OwnerReferences> {
        &mut self.owner_references
    }
}

/// make `owner` (an object of kind `S`) the controller of `child`.
///
/// Setting the same owner twice replaces the previous reference, so the call is idempotent.
/// A child already controlled by a different object is rejected.
pub fn set_controller_reference<S, M>(owner: &ObjectMeta, child: &mut M) -> Result<(), OwnershipError>
where
    S: Spec,
    M: OwnerReferenceHolder,
{
    if owner.uid.is_empty() {
        return Err(OwnershipError::OwnerWithoutUid {
            kind: S::kind(),
            name: owner.name.clone(),
        });
    }

    if S::NAME_SPACED && owner.namespace != child.namespace() {
        return Err(OwnershipError::CrossNamespace {
            kind: S::kind(),
            name: owner.name.clone(),
            owner_namespace: owner.namespace.clone(),
            child_namespace: child.namespace().to_owned(),
        });
    }

    let reference = owner.make_owner_reference::<S>();

    if let Some(existing) = child.controller_reference() {
        if !existing.refers_to_same(&reference) {
            return Err(OwnershipError::AlreadyOwned {
                child: child.name().to_owned(),
                kind: existing.kind.clone(),
                name: existing.name.clone(),
            });
        }
    }

    let references = child.owner_references_mut();
    references.retain(|current| !current.refers_to_same(&reference));
    references.push(reference);
    Ok(())
}
