pub mod api;
pub mod config;
pub mod converge;
pub mod credentials;
pub mod template;
pub mod watch;

mod error;
mod reconciler;
mod single_flight;

pub use self::config::OperatorConfig;
pub use self::converge::ConvergePolicy;
pub use self::converge::ConvergeResult;
pub use self::credentials::CredentialProvider;
pub use self::error::ReconcileError;
pub use self::error::StoreOperation;
pub use self::reconciler::ReconcileResult;
pub use self::reconciler::SampleOperatorReconciler;

pub use tokio_util::sync::CancellationToken;
