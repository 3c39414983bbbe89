//!
//! # SampleOperator
//!
//! Custom resource declaring the desired state the reconciler converges to.
//!
use serde::Deserialize;
use serde::Serialize;

use operator_types::{Crd, CrdNames, DefaultHeader, K8Obj, Spec, Status};

pub const GROUP: &str = "sample-operator.example.com";
pub const V1: &str = "v1";

const SAMPLE_OPERATOR_API: Crd = Crd {
    group: GROUP,
    version: V1,
    names: CrdNames {
        kind: "SampleOperator",
        plural: "sampleoperators",
        singular: "sampleoperator",
    },
};

impl Spec for SampleOperatorSpec {
    type Status = SampleOperatorStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &SAMPLE_OPERATOR_API
    }
}

/// user intent, never written by the reconciler
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleOperatorSpec {
    pub size: i32,
    pub service_instance_name: String,
}

/// observed state, written only by the reconciler
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleOperatorStatus {
    /// name of the config map currently in use
    pub sample_config_map: String,
}

impl Status for SampleOperatorStatus {}

pub type SampleOperator = K8Obj<SampleOperatorSpec>;

#[cfg(test)]
mod test {

    use operator_types::Spec;

    use super::SampleOperator;
    use super::SampleOperatorSpec;

    #[test]
    fn test_api_version() {
        assert_eq!(SampleOperatorSpec::api_version(), "sample-operator.example.com/v1");
        assert_eq!(SampleOperatorSpec::kind(), "SampleOperator");
    }

    #[test]
    fn test_decode_sample_operator() {
        let data = r#"
        {
            "apiVersion": "sample-operator.example.com/v1",
            "kind": "SampleOperator",
            "metadata": { "name": "demo", "namespace": "default", "uid": "abc" },
            "spec": { "size": 3, "serviceInstanceName": "db" },
            "status": { "sampleConfigMap": "democonfig" }
        }"#;

        let obj: SampleOperator = serde_json::from_str(data).expect("decode");
        assert_eq!(obj.spec.size, 3);
        assert_eq!(obj.spec.service_instance_name, "db");
        assert_eq!(obj.status.sample_config_map, "democonfig");
    }

    #[test]
    fn test_decode_without_status() {
        let data = r#"
        {
            "metadata": { "name": "demo", "namespace": "default" },
            "spec": { "size": 1 }
        }"#;

        let obj: SampleOperator = serde_json::from_str(data).expect("decode");
        assert_eq!(obj.kind, "SampleOperator");
        assert!(obj.status.sample_config_map.is_empty());
    }
}
