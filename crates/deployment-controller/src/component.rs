//! Component inputs supplied by the orchestration layer.

use crate::reconcilers::types::{Error, Result};
use k8s_openapi::api::apps::v1::DeploymentStrategy;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity and metadata of a serving component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Build a descriptor from object metadata. Fails without a name.
    pub fn from_object_meta(meta: &ObjectMeta) -> Result<Self> {
        let name = meta.name.clone().ok_or(Error::MissingObjectKey)?;
        Ok(Self {
            name,
            namespace: meta.namespace.clone().unwrap_or_default(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta.annotations.clone().unwrap_or_default(),
        })
    }

    /// Object metadata carrying this descriptor's identity, labels and annotations
    #[must_use]
    pub fn object_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels.clone()),
            annotations: Some(self.annotations.clone()),
            ..ObjectMeta::default()
        }
    }
}

/// Metric driving the external autoscaler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMetric {
    Cpu,
    Memory,
    Concurrency,
    Rps,
}

/// Scaling and rollout settings of a component.
///
/// Replica bounds and scale targets belong to the autoscaler and are carried
/// through untouched; only `deployment_strategy` shapes the deployment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentExtensionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_target: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_metric: Option<ScaleMetric>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_concurrency: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,

    /// Explicit rollout strategy; defaults fill whatever it leaves unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_strategy: Option<DeploymentStrategy>,
}

/// Everything needed to build one component's desired deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentManifest {
    pub metadata: ComponentDescriptor,

    #[serde(default)]
    pub extension: ComponentExtensionSpec,

    pub pod_spec: PodSpec,
}

impl ComponentManifest {
    /// Load a manifest from a YAML file
    pub fn from_file(path: &str) -> Result<Self, anyhow::Error> {
        let manifest_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read manifest {path}: {e}"))?;

        serde_yaml::from_str(&manifest_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse manifest YAML: {e}"))
    }
}
