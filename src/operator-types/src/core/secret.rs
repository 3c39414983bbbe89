use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::Crd;
use crate::CrdNames;
use crate::Header;
use crate::Spec;
use crate::Status;

//
// Secret Object
const SECRET_API: Crd = Crd {
    group: "core",
    version: "v1",
    names: CrdNames {
        kind: "Secret",
        plural: "secrets",
        singular: "secret",
    },
};

pub const TYPE_OPAQUE: &str = "Opaque";

impl Spec for SecretSpec {
    type Status = SecretStatus;
    type Header = SecretHeader;

    fn metadata() -> &'static Crd {
        &SECRET_API
    }
}

#[derive(Deserialize, Serialize, Debug, Eq, PartialEq, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecretSpec {}

#[derive(Deserialize, Serialize, Default, Eq, PartialEq, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecretStatus {}

impl Status for SecretStatus {}

/// values in `data` are base64 encoded
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SecretHeader {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(rename = "type", default = "opaque")]
    pub ty: String,
}

fn opaque() -> String {
    TYPE_OPAQUE.to_owned()
}

impl Default for SecretHeader {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            ty: opaque(),
        }
    }
}

impl Header for SecretHeader {}
