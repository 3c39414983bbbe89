use std::fmt;

use thiserror::Error;

use operator_store::StoreError;
use operator_types::OwnershipError;

use crate::credentials::CredentialError;

/// store call which failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Get,
    Create,
    Update,
    UpdateStatus,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::UpdateStatus => write!(f, "status update"),
        }
    }
}

/// Failure of a reconciliation pass.
/// Work done before the failure is kept, the next pass picks up from there.
#[derive(Error, Debug)]
pub enum ReconcileError<E>
where
    E: StoreError + 'static,
{
    #[error("{operation} of {kind} {key} failed: {source}")]
    Store {
        operation: StoreOperation,
        kind: &'static str,
        key: String,
        source: E,
    },
    #[error("cannot make {owner} the owner of {kind} {key}: {source}")]
    Ownership {
        owner: String,
        kind: &'static str,
        key: String,
        source: OwnershipError,
    },
    #[error("credentials for {key} unavailable: {source}")]
    Credentials { key: String, source: CredentialError },
    #[error("reconciliation of {0} cancelled")]
    Cancelled(String),
}

impl<E> ReconcileError<E>
where
    E: StoreError + 'static,
{
    /// caller should try again later
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled(_))
    }

    /// error points at static setup rather than a flaky dependency
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::Ownership { .. })
    }

    /// write lost a race against another writer
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_conflict() || source.is_already_exists(),
            _ => false,
        }
    }
}
