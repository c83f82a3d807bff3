//! Platform constants shared by the deployment reconciler.
//!
//! Label and annotation keys listed here are the ones the serving platform
//! itself writes onto pod templates. Every other key is considered foreign
//! and never drives a reconciliation unless it belongs to the orchestration
//! platform's own domain (see [`INFRASTRUCTURE_DOMAIN`]).

// ============================================================================
// Selector
// ============================================================================

/// Label key used for the deployment selector and pod template.
pub const APP_LABEL: &str = "app";

/// Prefix of the derived `app` label value.
pub const RAW_SERVICE_LABEL_PREFIX: &str = "isvc.";

/// Derive the canonical `app` selector value for a component name.
#[must_use]
pub fn raw_service_label(name: &str) -> String {
    format!("{RAW_SERVICE_LABEL_PREFIX}{name}")
}

// ============================================================================
// Serving platform annotations
// ============================================================================

pub const AUTOSCALER_CLASS_ANNOTATION: &str = "serving.kserve.io/autoscalerClass";
pub const DEPLOYMENT_MODE_ANNOTATION: &str = "serving.kserve.io/deploymentMode";
pub const AUTOSCALER_METRICS_ANNOTATION: &str = "serving.kserve.io/metrics";
pub const TARGET_UTILIZATION_ANNOTATION: &str = "serving.kserve.io/targetUtilizationPercentage";
pub const MIN_SCALE_ANNOTATION: &str = "serving.kserve.io/min-scale";
pub const MAX_SCALE_ANNOTATION: &str = "serving.kserve.io/max-scale";
pub const ENABLE_TAG_ROUTING_ANNOTATION: &str = "serving.kserve.io/enable-tag-routing";
pub const ENABLE_PROMETHEUS_SCRAPING_ANNOTATION: &str =
    "serving.kserve.io/enable-prometheus-scraping";
pub const STORAGE_INITIALIZER_SOURCE_URI_ANNOTATION: &str =
    "internal.serving.kserve.io/storage-initializer-sourceuri";
pub const STORAGE_INITIALIZER_INJECT_ANNOTATION: &str =
    "storage-initializer.serving.kserve.io/inject";

/// Annotation keys owned by the serving platform.
pub const RELEVANT_ANNOTATIONS: &[&str] = &[
    AUTOSCALER_CLASS_ANNOTATION,
    DEPLOYMENT_MODE_ANNOTATION,
    AUTOSCALER_METRICS_ANNOTATION,
    TARGET_UTILIZATION_ANNOTATION,
    MIN_SCALE_ANNOTATION,
    MAX_SCALE_ANNOTATION,
    ENABLE_TAG_ROUTING_ANNOTATION,
    ENABLE_PROMETHEUS_SCRAPING_ANNOTATION,
    STORAGE_INITIALIZER_SOURCE_URI_ANNOTATION,
    STORAGE_INITIALIZER_INJECT_ANNOTATION,
];

// ============================================================================
// Serving platform labels
// ============================================================================

pub const COMPONENT_LABEL: &str = "component";
pub const MODEL_LABEL: &str = "model";
pub const ENDPOINT_LABEL: &str = "endpoint";
pub const INFERENCE_SERVICE_LABEL: &str = "serving.kserve.io/inferenceservice";

/// Label keys owned by the serving platform.
pub const RELEVANT_LABELS: &[&str] = &[
    APP_LABEL,
    COMPONENT_LABEL,
    MODEL_LABEL,
    ENDPOINT_LABEL,
    INFERENCE_SERVICE_LABEL,
];

/// Domain of keys written by the orchestration platform itself
/// (`app.kubernetes.io/name`, `deployment.kubernetes.io/revision`, ...).
pub const INFRASTRUCTURE_DOMAIN: &str = "kubernetes.io";

// ============================================================================
// Pod and deployment defaults
// ============================================================================

/// Name of the primary serving container in a component's pod spec.
pub const PRIMARY_CONTAINER_NAME: &str = "kserve-container";

pub const DEFAULT_READINESS_PROBE_PORT: i32 = 8080;
pub const DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS: i64 = 30;
pub const DEFAULT_SCHEDULER_NAME: &str = "default-scheduler";
pub const DNS_CLUSTER_FIRST: &str = "ClusterFirst";
pub const RESTART_POLICY_ALWAYS: &str = "Always";
pub const TERMINATION_MESSAGE_PATH: &str = "/dev/termination-log";
pub const TERMINATION_MESSAGE_READ_FILE: &str = "File";
pub const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";
pub const PROTOCOL_TCP: &str = "TCP";

pub const ROLLING_UPDATE_STRATEGY: &str = "RollingUpdate";
pub const RECREATE_STRATEGY: &str = "Recreate";
pub const DEFAULT_MAX_UNAVAILABLE: &str = "25%";
pub const DEFAULT_MAX_SURGE: &str = "25%";
pub const DEFAULT_REVISION_HISTORY_LIMIT: i32 = 10;
pub const DEFAULT_PROGRESS_DEADLINE_SECONDS: i32 = 600;
