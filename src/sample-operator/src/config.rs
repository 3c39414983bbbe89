use std::fs::File;
use std::io::Error as IoError;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_yaml::Error as SerdeYamlError;
use thiserror::Error;

use crate::converge::ConvergePolicy;
use crate::credentials::StaticCredentials;

pub const DEFAULT_CONTAINER_NAME: &str = "slides";
pub const DEFAULT_IMAGE: &str = "manueldewald/presentation";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("Yaml error: {0}")]
    SerdeError(#[from] SerdeYamlError),
}

/// Reconciler settings. Every field has a default, an empty document is a valid config.
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    pub workload: WorkloadConfig,
    pub config_map: ConfigMapConfig,
    /// credentials handed out by the static provider
    pub credentials: StaticCredentials,
    /// serialize reconciliations of the same key inside the reconciler.
    /// Only needed when the scheduler driving it does not guarantee it.
    pub single_flight: bool,
}

impl OperatorConfig {
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// pod child
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadConfig {
    pub container_name: String,
    pub image: String,
    pub policy: ConvergePolicy,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER_NAME.to_owned(),
            image: DEFAULT_IMAGE.to_owned(),
            policy: ConvergePolicy::CreateOnly,
        }
    }
}

/// config map child
#[derive(Debug, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigMapConfig {
    /// policy of the main pass, the dedicated convergence helper always updates
    pub policy: ConvergePolicy,
}
