//! Desired deployment construction.

use super::defaults::DefaultsApplier;
use crate::component::{ComponentDescriptor, ComponentExtensionSpec};
use crate::constants;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// Builds the canonical desired deployment of a component.
///
/// Inputs are borrowed and never modified: the derived `app` label is added
/// to fresh metadata owned by the result.
#[derive(Debug, Clone, Default)]
pub struct DesiredStateBuilder {
    defaults: DefaultsApplier,
}

impl DesiredStateBuilder {
    #[must_use]
    pub fn new(defaults: DefaultsApplier) -> Self {
        Self { defaults }
    }

    /// Component metadata plus the derived `app` selector label
    #[must_use]
    pub fn object_meta(descriptor: &ComponentDescriptor) -> ObjectMeta {
        let mut meta = descriptor.object_meta();
        meta.labels.get_or_insert_with(BTreeMap::new).insert(
            constants::APP_LABEL.to_string(),
            constants::raw_service_label(&descriptor.name),
        );
        meta
    }

    #[must_use]
    pub fn selector(descriptor: &ComponentDescriptor) -> LabelSelector {
        LabelSelector {
            match_labels: Some(BTreeMap::from([(
                constants::APP_LABEL.to_string(),
                constants::raw_service_label(&descriptor.name),
            )])),
            ..LabelSelector::default()
        }
    }

    /// Compose descriptor, extension and pod spec into a defaulted deployment.
    /// Replica count is left unset for the autoscaler.
    #[must_use]
    pub fn build(
        &self,
        descriptor: &ComponentDescriptor,
        extension: &ComponentExtensionSpec,
        pod_spec: &PodSpec,
    ) -> Deployment {
        let metadata = Self::object_meta(descriptor);

        let mut pod_spec = pod_spec.clone();
        self.defaults.apply_pod_spec(&mut pod_spec);

        let mut spec = DeploymentSpec {
            selector: Self::selector(descriptor),
            template: PodTemplateSpec {
                metadata: Some(metadata.clone()),
                spec: Some(pod_spec),
            },
            strategy: extension.deployment_strategy.clone(),
            ..DeploymentSpec::default()
        };
        self.defaults.apply_deployment_spec(&mut spec);

        Deployment {
            metadata,
            spec: Some(spec),
            ..Deployment::default()
        }
    }
}
