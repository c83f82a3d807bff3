//! Access to stored deployments.

use crate::reconcilers::types::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use tracing::debug;

/// Read and write access to deployments in the external store.
///
/// Writes are not retried here; a rejected write surfaces to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Fetch a deployment. `Ok(None)` when it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, StoreError>;

    async fn create(&self, deployment: &Deployment) -> Result<(), StoreError>;

    /// Replace a deployment. The payload carries the `resourceVersion` it was
    /// based on, so stale writes are rejected.
    async fn update(&self, deployment: &Deployment) -> Result<(), StoreError>;
}

/// [`DeploymentStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeDeploymentStore {
    client: Client,
}

impl KubeDeploymentStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api_for(&self, deployment: &Deployment) -> Result<(Api<Deployment>, String), StoreError> {
        let namespace = deployment
            .namespace()
            .ok_or_else(|| StoreError::Invalid("deployment has no namespace".to_string()))?;
        let name = deployment
            .metadata
            .name
            .clone()
            .ok_or_else(|| StoreError::Invalid("deployment has no name".to_string()))?;
        Ok((Api::namespaced(self.client.clone(), &namespace), name))
    }
}

fn map_write_error(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(ae.message),
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl DeploymentStore for KubeDeploymentStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, StoreError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let (api, name) = self.api_for(deployment)?;
        api.create(&PostParams::default(), deployment)
            .await
            .map_err(map_write_error)?;
        debug!(deployment = %name, "Created deployment");
        Ok(())
    }

    async fn update(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let (api, name) = self.api_for(deployment)?;
        api.replace(&name, &PostParams::default(), deployment)
            .await
            .map_err(map_write_error)?;
        debug!(deployment = %name, "Replaced deployment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_mapped() {
        let err = map_write_error(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        }));
        assert!(matches!(err, StoreError::Conflict(ref msg) if msg == "the object has been modified"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_api_errors_are_kept() {
        let err = map_write_error(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "spec.template: Invalid value".to_string(),
            reason: "Invalid".to_string(),
            code: 422,
        }));
        assert!(matches!(err, StoreError::Kube(kube::Error::Api(ref ae)) if ae.code == 422));
        assert!(!err.is_retryable());
    }
}
