//! Fill unset pod and deployment fields with platform defaults.
//!
//! Only absent values are written, so applying the defaults twice yields the
//! same object as applying them once.

use crate::config::DefaultsConfig;
use crate::constants;
use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment};
use k8s_openapi::api::core::v1::{Container, PodSecurityContext, PodSpec, Probe, TCPSocketAction};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

#[derive(Debug, Clone, Default)]
pub struct DefaultsApplier {
    config: DefaultsConfig,
}

fn int_or_string(value: &str) -> IntOrString {
    value
        .parse::<i32>()
        .map_or_else(|_| IntOrString::String(value.to_string()), IntOrString::Int)
}

impl DefaultsApplier {
    #[must_use]
    pub fn new(config: DefaultsConfig) -> Self {
        Self { config }
    }

    /// Fill unset pod-level and container-level fields.
    pub fn apply_pod_spec(&self, pod_spec: &mut PodSpec) {
        pod_spec
            .dns_policy
            .get_or_insert_with(|| constants::DNS_CLUSTER_FIRST.to_string());
        pod_spec
            .restart_policy
            .get_or_insert_with(|| constants::RESTART_POLICY_ALWAYS.to_string());
        pod_spec
            .termination_grace_period_seconds
            .get_or_insert(self.config.termination_grace_period_seconds);
        pod_spec
            .security_context
            .get_or_insert_with(PodSecurityContext::default);
        pod_spec
            .scheduler_name
            .get_or_insert_with(|| self.config.scheduler_name.clone());

        for container in &mut pod_spec.containers {
            self.apply_container(container);
        }
    }

    fn apply_container(&self, container: &mut Container) {
        container
            .termination_message_path
            .get_or_insert_with(|| constants::TERMINATION_MESSAGE_PATH.to_string());
        container
            .termination_message_policy
            .get_or_insert_with(|| constants::TERMINATION_MESSAGE_READ_FILE.to_string());
        container
            .image_pull_policy
            .get_or_insert_with(|| constants::PULL_IF_NOT_PRESENT.to_string());

        for port in container.ports.iter_mut().flatten() {
            port.protocol
                .get_or_insert_with(|| constants::PROTOCOL_TCP.to_string());
        }

        let is_primary = container.name == self.config.primary_container_name;
        if is_primary && container.readiness_probe.is_none() {
            let port = container
                .ports
                .as_ref()
                .and_then(|ports| ports.first())
                .map_or(self.config.readiness_probe_port, |port| port.container_port);
            container.readiness_probe = Some(Self::tcp_readiness_probe(port));
        }
    }

    fn tcp_readiness_probe(port: i32) -> Probe {
        Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(port),
                ..TCPSocketAction::default()
            }),
            timeout_seconds: Some(1),
            period_seconds: Some(10),
            success_threshold: Some(1),
            failure_threshold: Some(3),
            ..Probe::default()
        }
    }

    /// Fill unset rollout fields of a deployment spec.
    ///
    /// Rolling-update parameters are only filled for the rolling-update
    /// strategy; the API server rejects them alongside `Recreate`.
    pub fn apply_deployment_spec(&self, spec: &mut DeploymentSpec) {
        let strategy = spec.strategy.get_or_insert_with(DeploymentStrategy::default);
        let strategy_type = strategy
            .type_
            .get_or_insert_with(|| constants::ROLLING_UPDATE_STRATEGY.to_string());

        if *strategy_type == constants::ROLLING_UPDATE_STRATEGY {
            let rolling_update = strategy
                .rolling_update
                .get_or_insert_with(RollingUpdateDeployment::default);
            rolling_update
                .max_unavailable
                .get_or_insert_with(|| int_or_string(&self.config.max_unavailable));
            rolling_update
                .max_surge
                .get_or_insert_with(|| int_or_string(&self.config.max_surge));
        }

        spec.revision_history_limit
            .get_or_insert(self.config.revision_history_limit);
        spec.progress_deadline_seconds
            .get_or_insert(self.config.progress_deadline_seconds);
    }
}
