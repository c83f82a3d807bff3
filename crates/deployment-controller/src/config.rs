//! Deployment Controller Configuration
//!
//! Policy knobs for defaulting and metadata relevance, loaded from a mounted
//! YAML file. Every field has a default matching the serving platform, so an
//! empty document is a valid configuration.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Main controller configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Namespace used when a component descriptor does not carry one
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Metadata relevance policy
    #[serde(default)]
    pub relevance: RelevanceConfig,

    /// Pod and deployment defaults
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Reconcile loop cadence
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            relevance: RelevanceConfig::default(),
            defaults: DefaultsConfig::default(),
            reconcile: ReconcileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// How a key is matched against the infrastructure domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMatch {
    /// The key prefix (before `/`) equals the domain or ends with `.<domain>`
    #[default]
    Suffix,
    /// The domain appears anywhere in the key
    Substring,
}

/// Relevance configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceConfig {
    /// Annotation keys owned by the serving platform
    #[serde(default = "default_relevant_annotations")]
    pub annotations: BTreeSet<String>,

    /// Label keys owned by the serving platform
    #[serde(default = "default_relevant_labels")]
    pub labels: BTreeSet<String>,

    /// Domain of keys owned by the orchestration platform
    #[serde(default = "default_infrastructure_domain")]
    pub infrastructure_domain: String,

    #[serde(default)]
    pub domain_match: DomainMatch,
}

fn default_relevant_annotations() -> BTreeSet<String> {
    constants::RELEVANT_ANNOTATIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_relevant_labels() -> BTreeSet<String> {
    constants::RELEVANT_LABELS
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_infrastructure_domain() -> String {
    constants::INFRASTRUCTURE_DOMAIN.to_string()
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            annotations: default_relevant_annotations(),
            labels: default_relevant_labels(),
            infrastructure_domain: default_infrastructure_domain(),
            domain_match: DomainMatch::default(),
        }
    }
}

/// Defaulting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsConfig {
    /// Container that receives a synthesized readiness probe
    pub primary_container_name: String,

    /// Probe port used when the primary container declares no ports
    pub readiness_probe_port: i32,

    pub termination_grace_period_seconds: i64,

    pub scheduler_name: String,

    pub revision_history_limit: i32,

    pub progress_deadline_seconds: i32,

    /// Integer or percentage, e.g. `25%`
    pub max_unavailable: String,

    /// Integer or percentage, e.g. `25%`
    pub max_surge: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            primary_container_name: constants::PRIMARY_CONTAINER_NAME.to_string(),
            readiness_probe_port: constants::DEFAULT_READINESS_PROBE_PORT,
            termination_grace_period_seconds: constants::DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS,
            scheduler_name: constants::DEFAULT_SCHEDULER_NAME.to_string(),
            revision_history_limit: constants::DEFAULT_REVISION_HISTORY_LIMIT,
            progress_deadline_seconds: constants::DEFAULT_PROGRESS_DEADLINE_SECONDS,
            max_unavailable: constants::DEFAULT_MAX_UNAVAILABLE.to_string(),
            max_surge: constants::DEFAULT_MAX_SURGE.to_string(),
        }
    }
}

/// Reconcile loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileConfig {
    /// Seconds between reconcile invocations in the binary's loop
    pub interval_seconds: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Returns `true` for an integer (`1`) or a percentage (`25%`).
fn is_int_or_percent(value: &str) -> bool {
    let digits = value.strip_suffix('%').unwrap_or(value);
    !digits.is_empty() && digits.parse::<u32>().is_ok()
}

impl ControllerConfig {
    /// Validate that the configuration can drive the reconciler.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.namespace.trim().is_empty() {
            return Err(anyhow::anyhow!("namespace must not be empty"));
        }

        if self.relevance.infrastructure_domain.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "relevance.infrastructureDomain must not be empty"
            ));
        }

        let defaults = &self.defaults;
        if defaults.primary_container_name.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "defaults.primaryContainerName must not be empty"
            ));
        }
        if !(1..=65535).contains(&defaults.readiness_probe_port) {
            return Err(anyhow::anyhow!(
                "defaults.readinessProbePort {} is outside 1-65535",
                defaults.readiness_probe_port
            ));
        }
        if defaults.termination_grace_period_seconds < 0 {
            return Err(anyhow::anyhow!(
                "defaults.terminationGracePeriodSeconds must not be negative"
            ));
        }
        if defaults.revision_history_limit < 0 {
            return Err(anyhow::anyhow!(
                "defaults.revisionHistoryLimit must not be negative"
            ));
        }
        if defaults.progress_deadline_seconds <= 0 {
            return Err(anyhow::anyhow!(
                "defaults.progressDeadlineSeconds must be positive"
            ));
        }
        for (field, value) in [
            ("maxUnavailable", &defaults.max_unavailable),
            ("maxSurge", &defaults.max_surge),
        ] {
            if !is_int_or_percent(value) {
                return Err(anyhow::anyhow!(
                    "defaults.{field} '{value}' must be an integer or a percentage"
                ));
            }
        }

        if self.reconcile.interval_seconds == 0 {
            return Err(anyhow::anyhow!(
                "reconcile.intervalSeconds must be greater than zero"
            ));
        }

        Ok(())
    }

    /// Load configuration from mounted `ConfigMap` file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        Self::from_yaml(&config_str)
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml(config_str: &str) -> Result<Self, anyhow::Error> {
        serde_yaml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))
    }
}
