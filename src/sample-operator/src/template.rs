//!
//! # Child templates
//!
//! Desired state of the children of a parent. Builders are pure: same input gives the same output,
//! and owner linkage is attached separately by the reconciler.
//!
use operator_types::core::config_map::{ConfigMapHeader, ConfigMapSpec};
use operator_types::core::pod::{ContainerSpec, PodSpec};
use operator_types::{InputK8Obj, InputObjectMeta, LabelProvider, ObjectMeta};

use crate::config::WorkloadConfig;
use crate::credentials::Credentials;

pub const APP_LABEL: &str = "app";

pub fn pod_name(parent: &str) -> String {
    format!("{}-pod", parent)
}

pub fn config_map_name(parent: &str) -> String {
    format!("{}config", parent)
}

fn child_metadata(parent: &ObjectMeta, name: String) -> InputObjectMeta {
    InputObjectMeta::named(name, parent.namespace.clone())
        .set_labels(vec![(APP_LABEL, parent.name.as_str())])
}

/// workload running a single container with the credentials in its environment
pub fn new_pod_for(
    parent: &ObjectMeta,
    credentials: &Credentials,
    workload: &WorkloadConfig,
) -> InputK8Obj<PodSpec> {
    let container = ContainerSpec {
        name: workload.container_name.clone(),
        image: Some(workload.image.clone()),
        env: credentials.to_env(),
        ..Default::default()
    };

    let spec = PodSpec {
        containers: vec![container],
        ..Default::default()
    };

    InputK8Obj::new(spec, child_metadata(parent, pod_name(&parent.name)))
}

/// config map holding the credentials as data
pub fn new_config_map_for(parent: &ObjectMeta, credentials: &Credentials) -> InputK8Obj<ConfigMapSpec> {
    InputK8Obj::new(
        ConfigMapSpec::default(),
        child_metadata(parent, config_map_name(&parent.name)),
    )
    .with_header(ConfigMapHeader::new(credentials.to_data()))
}

#[cfg(test)]
mod test {

    use operator_types::ObjectMeta;

    use crate::config::WorkloadConfig;
    use crate::credentials::Credentials;

    use super::new_config_map_for;
    use super::new_pod_for;

    fn parent() -> ObjectMeta {
        ObjectMeta {
            uid: "uid-1".to_owned(),
            ..ObjectMeta::new("demo", "team-a")
        }
    }

    #[test]
    fn test_pod_template() {
        let credentials = Credentials::new("sample-user", "sample-pwd");
        let pod = new_pod_for(&parent(), &credentials, &WorkloadConfig::default());

        assert_eq!(pod.api_version, "v1");
        assert_eq!(pod.kind, "Pod");
        assert_eq!(pod.metadata.name, "demo-pod");
        assert_eq!(pod.metadata.namespace, "team-a");
        assert_eq!(pod.metadata.labels.get("app").unwrap(), "demo");
        assert!(pod.metadata.owner_references.is_empty());

        assert_eq!(pod.spec.containers.len(), 1);
        let container = &pod.spec.containers[0];
        assert_eq!(container.name, "slides");
        assert_eq!(container.image.as_deref(), Some("manueldewald/presentation"));
        assert_eq!(container.env_value("SAMPLE_SERVICE_USER"), Some("sample-user"));
        assert_eq!(container.env_value("SAMPLE_SERVICE_PASSWORD"), Some("sample-pwd"));
    }

    #[test]
    fn test_config_map_template() {
        let credentials = Credentials::new("sample-user", "sample-pwd");
        let config_map = new_config_map_for(&parent(), &credentials);

        assert_eq!(config_map.kind, "ConfigMap");
        assert_eq!(config_map.metadata.name, "democonfig");
        assert_eq!(config_map.metadata.namespace, "team-a");
        assert_eq!(config_map.metadata.labels.get("app").unwrap(), "demo");
        assert!(config_map.metadata.owner_references.is_empty());
        assert_eq!(config_map.header.data, credentials.to_data());
    }

    #[test]
    fn test_templates_deterministic() {
        let credentials = Credentials::new("sample-user", "sample-pwd");
        let workload = WorkloadConfig::default();

        let first = serde_json::to_vec(&new_pod_for(&parent(), &credentials, &workload)).unwrap();
        let second = serde_json::to_vec(&new_pod_for(&parent(), &credentials, &workload)).unwrap();
        assert_eq!(first, second);

        let first = serde_json::to_vec(&new_config_map_for(&parent(), &credentials)).unwrap();
        let second = serde_json::to_vec(&new_config_map_for(&parent(), &credentials)).unwrap();
        assert_eq!(first, second);
    }
}
