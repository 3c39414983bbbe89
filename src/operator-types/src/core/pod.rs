use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::Crd;
use crate::CrdNames;
use crate::DefaultHeader;
use crate::Env;
use crate::Spec;
use crate::Status;

const POD_API: Crd = Crd {
    group: "core",
    version: "v1",
    names: CrdNames {
        kind: "Pod",
        plural: "pods",
        singular: "pod",
    },
};

impl Spec for PodSpec {
    type Status = PodStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &POD_API
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PodSpec {
    pub containers: Vec<ContainerSpec>,
    pub restart_policy: Option<PodRestartPolicy>,
    pub service_account_name: Option<String>,
    pub node_name: Option<String>,
    pub node_selector: Option<HashMap<String, String>>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub enum PodRestartPolicy {
    #[default]
    Always,
    Never,
    OnFailure,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerSpec {
    pub name: String,
    pub args: Vec<String>,
    pub command: Vec<String>,
    pub ports: Vec<ContainerPortSpec>,
    pub image: Option<String>,
    pub image_pull_policy: Option<ImagePullPolicy>,
    pub env: Vec<Env>,
}

impl ContainerSpec {
    /// value of environment variable `name` if it is set literally
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|env| env.name == name)
            .and_then(|env| env.value.as_deref())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub enum ImagePullPolicy {
    Always,
    Never,
    #[default]
    IfNotPresent,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPortSpec {
    pub container_port: u16,
    pub name: Option<String>,
    pub protocol: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PodStatus {
    pub phase: String,
    #[serde(rename = "hostIP")]
    pub host_ip: String,
    #[serde(rename = "podIP")]
    pub pod_ip: Option<String>,
    pub start_time: String,
}

impl Status for PodStatus {}
