//! # Deployment Reconciler
//!
//! Converges one component's deployment with its declared state.
//!
//! The desired deployment is built once, when the reconciler is constructed.
//! Every [`DeploymentReconciler::reconcile`] call then reads the stored
//! deployment fresh, classifies the difference and issues at most one write:
//!
//! - nothing stored: create the desired deployment
//! - relevant drift: replace the stored deployment
//! - no relevant drift: leave it alone
//!
//! Nothing is cached between calls and nothing is retried internally. A write
//! based on a stale read is rejected by the store and surfaces as a retryable
//! error for the invoking control loop.

pub mod builder;
pub mod defaults;
pub mod diff;
pub mod quantity;
pub mod relevance;
pub mod store;

pub use builder::DesiredStateBuilder;
pub use defaults::DefaultsApplier;
pub use diff::{DiffOutcome, DifferenceDetector, FieldDrift};
pub use relevance::{MetadataKind, Partition, RelevanceClassifier};
pub use store::{DeploymentStore, KubeDeploymentStore};

use crate::component::{ComponentDescriptor, ComponentExtensionSpec};
use crate::config::ControllerConfig;
use crate::reconcilers::types::{Error, Result};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::PodSpec;
use tracing::{debug, info, info_span, warn, Instrument, Span};

pub struct DeploymentReconciler<S> {
    store: S,
    namespace: String,
    name: String,
    deployment: Deployment,
    detector: DifferenceDetector,
    span: Span,
}

impl<S: DeploymentStore> DeploymentReconciler<S> {
    /// Build the desired deployment for a component.
    ///
    /// A descriptor without a namespace lands in the configured namespace.
    pub fn new(
        store: S,
        descriptor: &ComponentDescriptor,
        extension: &ComponentExtensionSpec,
        pod_spec: &PodSpec,
        config: &ControllerConfig,
    ) -> Result<Self> {
        if descriptor.name.is_empty() {
            return Err(Error::MissingObjectKey);
        }

        let mut descriptor = descriptor.clone();
        if descriptor.namespace.is_empty() {
            descriptor.namespace.clone_from(&config.namespace);
        }

        let builder = DesiredStateBuilder::new(DefaultsApplier::new(config.defaults.clone()));
        let deployment = builder.build(&descriptor, extension, pod_spec);

        Ok(Self {
            store,
            namespace: descriptor.namespace,
            name: descriptor.name,
            deployment,
            detector: DifferenceDetector::new(RelevanceClassifier::new(&config.relevance)),
            span: Span::current(),
        })
    }

    /// Parent span for the spans of subsequent `reconcile` calls
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The desired deployment. Never modified after construction.
    pub fn desired(&self) -> &Deployment {
        &self.deployment
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Option<Deployment>> {
        self.store
            .get(&self.namespace, &self.name)
            .await
            .map_err(|source| Error::Fetch {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                source,
            })
    }

    /// Classify the stored deployment without writing anything.
    pub async fn check(&self) -> Result<DiffOutcome> {
        let observed = self.fetch().await?;
        Ok(self.detector.compare(&self.deployment, observed.as_ref()))
    }

    /// Desired deployment stamped with the observed resource version and
    /// replica count, so the write is conditional on the read and leaves the
    /// autoscaler's replica decision in place.
    fn update_payload(&self, observed: &Deployment) -> Deployment {
        let mut payload = self.deployment.clone();
        payload
            .metadata
            .resource_version
            .clone_from(&observed.metadata.resource_version);
        if let (Some(spec), Some(observed_spec)) = (payload.spec.as_mut(), observed.spec.as_ref()) {
            spec.replicas = observed_spec.replicas;
        }
        payload
    }

    /// Converge the stored deployment with the desired one.
    ///
    /// Returns the desired deployment after a create, the written payload
    /// after an update and the stored deployment when nothing changed.
    pub async fn reconcile(&self) -> Result<Deployment> {
        let span = info_span!(
            parent: &self.span,
            "reconcile_deployment",
            namespace = %self.namespace,
            name = %self.name
        );
        self.converge().instrument(span).await
    }

    async fn converge(&self) -> Result<Deployment> {
        let observed = self.fetch().await?;
        let outcome = self.detector.compare(&self.deployment, observed.as_ref());
        debug!(outcome = outcome.as_str(), "Compared deployment");

        match (outcome, observed) {
            (DiffOutcome::Indeterminate(source), _) => {
                warn!(error = %source, "Deployment comparison failed");
                Err(Error::Comparison {
                    namespace: self.namespace.clone(),
                    name: self.name.clone(),
                    source,
                })
            }
            (DiffOutcome::Update(drift), Some(observed)) => {
                info!(fields = drift.len(), "Updating deployment");
                let payload = self.update_payload(&observed);
                self.store
                    .update(&payload)
                    .await
                    .map_err(|source| Error::Update {
                        namespace: self.namespace.clone(),
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(payload)
            }
            (DiffOutcome::NoOp, Some(observed)) => {
                debug!("Deployment is up to date");
                Ok(observed)
            }
            (DiffOutcome::Create, _) | (_, None) => {
                info!("Creating deployment");
                self.store
                    .create(&self.deployment)
                    .await
                    .map_err(|source| Error::Create {
                        namespace: self.namespace.clone(),
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(self.deployment.clone())
            }
        }
    }
}
