//!
//! # Credentials
//!
//! Credentials are synthesized on every pass and injected into both children:
//! as config map data and as environment of the workload container.
//! They are never read back from the children.
//!
use std::collections::BTreeMap;
use std::fmt;
use std::string::FromUtf8Error;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use operator_store::{ResourceStore, SharedStore};
use operator_types::core::secret::SecretSpec;
use operator_types::{Env, ItemMeta};

use crate::api::SampleOperator;

/// closed set of credential entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialField {
    User,
    Password,
}

impl CredentialField {
    pub const ALL: [CredentialField; 2] = [CredentialField::User, CredentialField::Password];

    /// key in config map and secret data
    pub fn key(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Password => "password",
        }
    }

    /// environment variable of the workload container
    pub fn env_name(&self) -> &'static str {
        match self {
            Self::User => "SAMPLE_SERVICE_USER",
            Self::Password => "SAMPLE_SERVICE_PASSWORD",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn new<T: Into<String>>(user: T, password: T) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::User => &self.user,
            CredentialField::Password => &self.password,
        }
    }

    /// config map payload
    pub fn to_data(&self) -> BTreeMap<String, String> {
        CredentialField::ALL
            .iter()
            .map(|field| (field.key().to_owned(), self.get(*field).to_owned()))
            .collect()
    }

    /// container environment
    pub fn to_env(&self) -> Vec<Env> {
        CredentialField::ALL
            .iter()
            .map(|field| Env::key_value(field.env_name(), self.get(*field)))
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("{0} does not name a service instance")]
    MissingServiceInstance(String),
    #[error("secret {0} not found")]
    SecretNotFound(String),
    #[error("secret {secret} has no '{field}' entry")]
    MissingField {
        secret: String,
        field: CredentialField,
    },
    #[error("secret {secret} entry '{field}' is not valid base64: {source}")]
    Decode {
        secret: String,
        field: CredentialField,
        source: base64::DecodeError,
    },
    #[error("secret {secret} entry '{field}' is not utf8: {source}")]
    Utf8 {
        secret: String,
        field: CredentialField,
        source: FromUtf8Error,
    },
    #[error("secret {secret} lookup failed: {source}")]
    Store {
        secret: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// source of the credentials handed to the children of a parent
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, parent: &SampleOperator) -> Result<Credentials, CredentialError>;
}

/// same credentials for every parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticCredentials {
    pub user: String,
    pub password: String,
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self {
            user: "sample-user".to_owned(),
            password: "sample-pwd".to_owned(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self, _parent: &SampleOperator) -> Result<Credentials, CredentialError> {
        Ok(Credentials::new(self.user.as_str(), self.password.as_str()))
    }
}

/// reads credentials from the secret named by `spec.serviceInstanceName`
/// in the namespace of the parent
pub struct SecretCredentials<C> {
    store: SharedStore<C>,
}

impl<C> SecretCredentials<C> {
    pub fn new(store: SharedStore<C>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<C> CredentialProvider for SecretCredentials<C>
where
    C: ResourceStore,
{
    async fn credentials(&self, parent: &SampleOperator) -> Result<Credentials, CredentialError> {
        let instance = &parent.spec.service_instance_name;
        if instance.is_empty() {
            return Err(CredentialError::MissingServiceInstance(
                parent.metadata.as_item().to_string(),
            ));
        }

        let key = ItemMeta::new(instance.as_str(), parent.metadata.namespace.as_str());
        debug!("reading credentials from secret {}", key);
        let secret = self
            .store
            .lookup_item::<SecretSpec, _>(&key)
            .await
            .map_err(|err| CredentialError::Store {
                secret: key.to_string(),
                source: Box::new(err),
            })?
            .ok_or_else(|| CredentialError::SecretNotFound(key.to_string()))?;

        let decode = |field: CredentialField| -> Result<String, CredentialError> {
            let encoded =
                secret
                    .header
                    .data
                    .get(field.key())
                    .ok_or_else(|| CredentialError::MissingField {
                        secret: key.to_string(),
                        field,
                    })?;
            let bytes = base64::decode(encoded).map_err(|source| CredentialError::Decode {
                secret: key.to_string(),
                field,
                source,
            })?;
            String::from_utf8(bytes).map_err(|source| CredentialError::Utf8 {
                secret: key.to_string(),
                field,
                source,
            })
        };

        Ok(Credentials::new(
            decode(CredentialField::User)?,
            decode(CredentialField::Password)?,
        ))
    }
}
