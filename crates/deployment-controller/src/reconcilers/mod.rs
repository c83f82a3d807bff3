pub mod deployment;
pub mod types;

pub use deployment::{DeploymentReconciler, DeploymentStore, DiffOutcome, KubeDeploymentStore};
pub use types::{ComparisonError, Error, Result, StoreError};
