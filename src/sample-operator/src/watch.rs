//!
//! # Watch mapping
//!
//! Maps change events to the key of the parent that must be reconciled.
//! Events on a parent map to the parent itself, events on a child map to its controlling parent.
//!
use operator_types::core::config_map::ConfigMapSpec;
use operator_types::core::pod::PodSpec;
use operator_types::{Crd, ItemMeta, K8Watch, OwnerReferenceHolder, Spec};

use crate::api::SampleOperatorSpec;

/// kinds whose events trigger reconciliation
pub fn watched_kinds() -> [&'static Crd; 3] {
    [
        SampleOperatorSpec::metadata(),
        PodSpec::metadata(),
        ConfigMapSpec::metadata(),
    ]
}

pub fn request_for_parent(event: &K8Watch<SampleOperatorSpec>) -> ItemMeta {
    event.object().metadata.as_item()
}

/// parent key for event on a child, `None` if the child is not controlled by a parent
pub fn request_for_owned<S>(event: &K8Watch<S>) -> Option<ItemMeta>
where
    S: Spec,
{
    let metadata = &event.object().metadata;
    metadata
        .controller_reference()
        .filter(|owner| owner.points_to::<SampleOperatorSpec>())
        .map(|owner| ItemMeta::new(owner.name.as_str(), metadata.namespace.as_str()))
}
