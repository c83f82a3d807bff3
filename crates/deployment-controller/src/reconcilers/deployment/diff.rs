//! # Selective Deployment Diff
//!
//! Decides whether an observed deployment has drifted from the desired one.
//!
//! The comparison runs in two phases:
//!
//! 1. A typed structural comparison over the known deployment and pod spec
//!    fields. Replica count, template labels, template annotations and both
//!    service account fields are not part of it: replicas belong to the
//!    autoscaler and the rest is either handled by phase 2 or written by
//!    admission webhooks.
//! 2. A relevance-scoped comparison of template labels and annotations. Keys
//!    are partitioned with the [`RelevanceClassifier`] and only the relevant
//!    partitions are compared; irrelevant keys never count, whatever their
//!    presence or value.
//!
//! Absent lists and maps equal empty ones, and resource quantities are
//! compared by value.

use super::quantity;
use super::relevance::{MetadataKind, RelevanceClassifier};
use crate::reconcilers::types::ComparisonError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

const ABSENT: &str = "<absent>";

/// One drifted field: its path and the rendered desired and observed values.
/// `None` means the value is absent on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDrift {
    pub path: String,
    pub desired: Option<String>,
    pub observed: Option<String>,
}

impl fmt::Display for FieldDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.path,
            self.desired.as_deref().unwrap_or(ABSENT),
            self.observed.as_deref().unwrap_or(ABSENT)
        )
    }
}

/// Verdict of comparing desired and observed state.
#[derive(Debug)]
pub enum DiffOutcome {
    /// Nothing is stored yet
    Create,
    /// The stored object diverges on the listed fields
    Update(Vec<FieldDrift>),
    /// The stored object matches, modulo ignored and irrelevant fields
    NoOp,
    /// The comparison itself failed
    Indeterminate(ComparisonError),
}

impl DiffOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffOutcome::Create => "Create",
            DiffOutcome::Update(_) => "Update",
            DiffOutcome::NoOp => "NoOp",
            DiffOutcome::Indeterminate(_) => "Indeterminate",
        }
    }
}

fn summarize(drift: &[FieldDrift]) -> String {
    drift
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn render<T: Serialize>(path: &str, value: &T) -> Result<String, ComparisonError> {
    serde_json::to_string(value).map_err(|source| ComparisonError::Render {
        path: path.to_string(),
        source,
    })
}

/// Accumulates drift while walking two objects field by field.
#[derive(Default)]
struct Comparator {
    drift: Vec<FieldDrift>,
}

macro_rules! compare_fields {
    ($cmp:ident.$method:ident, $path:expr, $desired:expr, $observed:expr, [$($field:ident),+ $(,)?]) => {
        $(
            $cmp.$method(
                &format!("{}.{}", $path, stringify!($field)),
                &$desired.$field,
                &$observed.$field,
            )?;
        )+
    };
}

impl Comparator {
    fn record<T: Serialize>(
        &mut self,
        path: &str,
        desired: &T,
        observed: &T,
    ) -> Result<(), ComparisonError> {
        self.drift.push(FieldDrift {
            path: path.to_string(),
            desired: Some(render(path, desired)?),
            observed: Some(render(path, observed)?),
        });
        Ok(())
    }

    fn value<T: PartialEq + Serialize>(
        &mut self,
        path: &str,
        desired: &T,
        observed: &T,
    ) -> Result<(), ComparisonError> {
        if desired != observed {
            self.record(path, desired, observed)?;
        }
        Ok(())
    }

    fn list<T: PartialEq + Serialize>(
        &mut self,
        path: &str,
        desired: &Option<Vec<T>>,
        observed: &Option<Vec<T>>,
    ) -> Result<(), ComparisonError> {
        let desired = desired.as_deref().unwrap_or_default();
        let observed = observed.as_deref().unwrap_or_default();
        self.value(path, &desired, &observed)
    }

    fn map<V: PartialEq + Serialize>(
        &mut self,
        path: &str,
        desired: &Option<BTreeMap<String, V>>,
        observed: &Option<BTreeMap<String, V>>,
    ) -> Result<(), ComparisonError> {
        let empty = BTreeMap::new();
        let desired = desired.as_ref().unwrap_or(&empty);
        let observed = observed.as_ref().unwrap_or(&empty);
        self.value(path, desired, observed)
    }

    fn quantities(
        &mut self,
        path: &str,
        desired: &Option<BTreeMap<String, Quantity>>,
        observed: &Option<BTreeMap<String, Quantity>>,
    ) -> Result<(), ComparisonError> {
        let empty = BTreeMap::new();
        let desired = desired.as_ref().unwrap_or(&empty);
        let observed = observed.as_ref().unwrap_or(&empty);

        for key in desired.keys().chain(observed.keys()).collect::<BTreeSet<_>>() {
            let entry_path = format!("{path}[{key}]");
            let same = match (desired.get(key), observed.get(key)) {
                (Some(d), Some(o)) => quantity::quantities_equal(d, o).map_err(|value| {
                    ComparisonError::InvalidQuantity {
                        path: entry_path.clone(),
                        value: value.to_string(),
                    }
                })?,
                _ => false,
            };
            if !same {
                self.drift.push(FieldDrift {
                    desired: desired.get(key).map(|q| q.0.clone()),
                    observed: observed.get(key).map(|q| q.0.clone()),
                    path: entry_path,
                });
            }
        }
        Ok(())
    }

    fn resources(
        &mut self,
        path: &str,
        desired: &Option<ResourceRequirements>,
        observed: &Option<ResourceRequirements>,
    ) -> Result<(), ComparisonError> {
        let empty = ResourceRequirements::default();
        let desired = desired.as_ref().unwrap_or(&empty);
        let observed = observed.as_ref().unwrap_or(&empty);

        compare_fields!(self.list, path, desired, observed, [claims]);
        compare_fields!(self.quantities, path, desired, observed, [limits, requests]);
        Ok(())
    }

    fn containers(
        &mut self,
        path: &str,
        desired: &[Container],
        observed: &[Container],
    ) -> Result<(), ComparisonError> {
        if desired.len() != observed.len() {
            let names = |containers: &[Container]| -> Vec<String> {
                containers.iter().map(|c| c.name.clone()).collect()
            };
            return self.record(path, &names(desired), &names(observed));
        }

        for (index, (d, o)) in desired.iter().zip(observed).enumerate() {
            let container_path = format!("{path}[{index}]");
            compare_fields!(
                self.value,
                container_path,
                d,
                o,
                [
                    name,
                    image,
                    image_pull_policy,
                    working_dir,
                    lifecycle,
                    liveness_probe,
                    readiness_probe,
                    startup_probe,
                    restart_policy,
                    security_context,
                    stdin,
                    stdin_once,
                    tty,
                    termination_message_path,
                    termination_message_policy,
                ]
            );
            compare_fields!(
                self.list,
                container_path,
                d,
                o,
                [
                    command,
                    args,
                    env,
                    env_from,
                    ports,
                    resize_policy,
                    volume_devices,
                    volume_mounts,
                ]
            );
            compare_fields!(self.resources, container_path, d, o, [resources]);
        }
        Ok(())
    }

    fn optional_containers(
        &mut self,
        path: &str,
        desired: &Option<Vec<Container>>,
        observed: &Option<Vec<Container>>,
    ) -> Result<(), ComparisonError> {
        self.containers(
            path,
            desired.as_deref().unwrap_or_default(),
            observed.as_deref().unwrap_or_default(),
        )
    }

    /// Every pod spec field except `service_account` and `service_account_name`.
    fn pod_spec(
        &mut self,
        path: &str,
        desired: &PodSpec,
        observed: &PodSpec,
    ) -> Result<(), ComparisonError> {
        self.containers(&format!("{path}.containers"), &desired.containers, &observed.containers)?;
        compare_fields!(self.optional_containers, path, desired, observed, [init_containers]);
        compare_fields!(
            self.value,
            path,
            desired,
            observed,
            [
                active_deadline_seconds,
                affinity,
                automount_service_account_token,
                dns_config,
                dns_policy,
                enable_service_links,
                host_ipc,
                host_network,
                host_pid,
                host_users,
                hostname,
                node_name,
                os,
                preemption_policy,
                priority,
                priority_class_name,
                restart_policy,
                runtime_class_name,
                scheduler_name,
                security_context,
                set_hostname_as_fqdn,
                share_process_namespace,
                subdomain,
                termination_grace_period_seconds,
            ]
        );
        compare_fields!(
            self.list,
            path,
            desired,
            observed,
            [
                ephemeral_containers,
                host_aliases,
                image_pull_secrets,
                readiness_gates,
                resource_claims,
                scheduling_gates,
                tolerations,
                topology_spread_constraints,
                volumes,
            ]
        );
        compare_fields!(self.map, path, desired, observed, [node_selector]);
        compare_fields!(self.quantities, path, desired, observed, [overhead]);
        Ok(())
    }
}

/// Compares desired and observed deployments.
#[derive(Debug, Clone, Default)]
pub struct DifferenceDetector {
    classifier: RelevanceClassifier,
}

impl DifferenceDetector {
    #[must_use]
    pub fn new(classifier: RelevanceClassifier) -> Self {
        Self { classifier }
    }

    /// Classify the observed deployment against the desired one.
    pub fn compare(&self, desired: &Deployment, observed: Option<&Deployment>) -> DiffOutcome {
        let Some(observed) = observed else {
            return DiffOutcome::Create;
        };

        match self.spec_drift(desired, observed) {
            Err(e) => return DiffOutcome::Indeterminate(e),
            Ok(drift) if !drift.is_empty() => {
                info!(diff = %summarize(&drift), "Deployment spec drift detected");
                return DiffOutcome::Update(drift);
            }
            Ok(_) => {}
        }

        if let (Some(desired_spec), Some(observed_spec)) = (&desired.spec, &observed.spec) {
            let drift = self.metadata_drift(&desired_spec.template, &observed_spec.template);
            if !drift.is_empty() {
                info!(diff = %summarize(&drift), "Deployment metadata drift detected");
                return DiffOutcome::Update(drift);
            }
        }

        DiffOutcome::NoOp
    }

    /// Phase 1: structural drift of the deployment spec, excluding replicas,
    /// template labels and annotations and service account fields. The rest
    /// of the template metadata is compared as is.
    pub fn spec_drift(
        &self,
        desired: &Deployment,
        observed: &Deployment,
    ) -> Result<Vec<FieldDrift>, ComparisonError> {
        let desired_spec = desired
            .spec
            .as_ref()
            .ok_or_else(|| ComparisonError::MissingField("desired spec".to_string()))?;
        let observed_spec = observed
            .spec
            .as_ref()
            .ok_or_else(|| ComparisonError::MissingField("spec".to_string()))?;

        let mut cmp = Comparator::default();
        compare_fields!(
            cmp.value,
            "spec",
            desired_spec,
            observed_spec,
            [
                selector,
                strategy,
                min_ready_seconds,
                paused,
                revision_history_limit,
                progress_deadline_seconds,
            ]
        );

        let empty_meta = ObjectMeta::default();
        let desired_meta = desired_spec.template.metadata.as_ref().unwrap_or(&empty_meta);
        let observed_meta = observed_spec.template.metadata.as_ref().unwrap_or(&empty_meta);
        compare_fields!(
            cmp.value,
            "spec.template.metadata",
            desired_meta,
            observed_meta,
            [
                name,
                namespace,
                generate_name,
                generation,
                uid,
                resource_version,
                self_link,
                creation_timestamp,
                deletion_timestamp,
                deletion_grace_period_seconds,
            ]
        );
        compare_fields!(
            cmp.list,
            "spec.template.metadata",
            desired_meta,
            observed_meta,
            [finalizers, owner_references, managed_fields]
        );

        let desired_pod = desired_spec
            .template
            .spec
            .as_ref()
            .ok_or_else(|| ComparisonError::MissingField("desired spec.template.spec".to_string()))?;
        let observed_pod = observed_spec
            .template
            .spec
            .as_ref()
            .ok_or_else(|| ComparisonError::MissingField("spec.template.spec".to_string()))?;
        cmp.pod_spec("spec.template.spec", desired_pod, observed_pod)?;

        Ok(cmp.drift)
    }

    /// Phase 2: drift of relevant template labels and annotations.
    pub fn metadata_drift(
        &self,
        desired: &PodTemplateSpec,
        observed: &PodTemplateSpec,
    ) -> Vec<FieldDrift> {
        let mut drift = Vec::new();

        for kind in [MetadataKind::Annotation, MetadataKind::Label] {
            let desired_partition = self.classifier.partition(kind, metadata_map(desired, kind));
            let observed_partition = self.classifier.partition(kind, metadata_map(observed, kind));

            if !desired_partition.irrelevant.is_empty() || !observed_partition.irrelevant.is_empty() {
                debug!(
                    kind = kind.as_str(),
                    desired = ?desired_partition.irrelevant.keys(),
                    observed = ?observed_partition.irrelevant.keys(),
                    "Ignoring irrelevant metadata keys"
                );
            }
            debug!(
                kind = kind.as_str(),
                desired = ?desired_partition.relevant,
                observed = ?observed_partition.relevant,
                "Comparing relevant metadata"
            );

            drift.extend(entry_drift(
                &format!("spec.template.metadata.{}", kind.as_str()),
                &desired_partition.relevant,
                &observed_partition.relevant,
            ));
        }

        drift
    }
}

fn metadata_map(template: &PodTemplateSpec, kind: MetadataKind) -> Option<&BTreeMap<String, String>> {
    template.metadata.as_ref().and_then(|meta| match kind {
        MetadataKind::Annotation => meta.annotations.as_ref(),
        MetadataKind::Label => meta.labels.as_ref(),
    })
}

/// Per-key drift between two string maps: changed values and keys present on
/// only one side.
fn entry_drift(
    path: &str,
    desired: &BTreeMap<String, String>,
    observed: &BTreeMap<String, String>,
) -> Vec<FieldDrift> {
    desired
        .keys()
        .chain(observed.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|key| {
            let (d, o) = (desired.get(key), observed.get(key));
            (d != o).then(|| FieldDrift {
                path: format!("{path}[{key}]"),
                desired: d.cloned(),
                observed: o.cloned(),
            })
        })
        .collect()
}
