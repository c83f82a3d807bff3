//! Shared fixtures for reconciler integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use deployment_controller::reconcilers::StoreError;
use deployment_controller::{
    ComponentDescriptor, ComponentExtensionSpec, ControllerConfig, DeploymentReconciler,
    DeploymentStore,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Key = (String, String);

#[derive(Default)]
struct State {
    objects: HashMap<Key, Deployment>,
    next_version: u64,
    creates: usize,
    updates: usize,
    fail_get: Option<String>,
    reject_writes: Option<String>,
}

/// In-memory deployment store with API-server-like optimistic concurrency:
/// every write bumps `resourceVersion` and an update carrying a stale
/// version is rejected with a conflict.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

fn key_of(deployment: &Deployment) -> Key {
    (
        deployment.metadata.namespace.clone().unwrap_or_default(),
        deployment.metadata.name.clone().unwrap_or_default(),
    )
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stored(&self, namespace: &str, name: &str) -> Option<Deployment> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Store an object as if another actor had written it
    pub fn insert(&self, mut deployment: Deployment) {
        let mut state = self.state.lock().unwrap();
        state.next_version += 1;
        deployment.metadata.resource_version = Some(state.next_version.to_string());
        state.objects.insert(key_of(&deployment), deployment);
    }

    /// Mutate a stored object as another controller would
    pub fn mutate(&self, namespace: &str, name: &str, f: impl FnOnce(&mut Deployment)) {
        let mut deployment = self
            .get_stored(namespace, name)
            .expect("object to mutate must exist");
        f(&mut deployment);
        self.insert(deployment);
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    pub fn writes(&self) -> usize {
        self.creates() + self.updates()
    }

    pub fn fail_next_get(&self, message: &str) {
        self.state.lock().unwrap().fail_get = Some(message.to_string());
    }

    pub fn reject_writes(&self, message: Option<&str>) {
        self.state.lock().unwrap().reject_writes = message.map(ToString::to_string);
    }
}

#[async_trait]
impl DeploymentStore for InMemoryStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Deployment>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_get.take() {
            return Err(StoreError::Unavailable(message));
        }
        Ok(state
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.reject_writes {
            return Err(StoreError::Conflict(message.clone()));
        }
        let key = key_of(deployment);
        if state.objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}/{} already exists", key.0, key.1)));
        }
        state.next_version += 1;
        let mut stored = deployment.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.objects.insert(key, stored);
        state.creates += 1;
        Ok(())
    }

    async fn update(&self, deployment: &Deployment) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.reject_writes {
            return Err(StoreError::Conflict(message.clone()));
        }
        let key = key_of(deployment);
        let current = state
            .objects
            .get(&key)
            .and_then(|stored| stored.metadata.resource_version.clone());
        if current.is_none() || current != deployment.metadata.resource_version {
            return Err(StoreError::Conflict(
                "the object has been modified; please apply your changes to the latest version"
                    .to_string(),
            ));
        }
        state.next_version += 1;
        let mut stored = deployment.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.objects.insert(key, stored);
        state.updates += 1;
        Ok(())
    }
}

pub const NAMESPACE: &str = "test";
pub const NAME: &str = "my-model";

pub fn descriptor() -> ComponentDescriptor {
    ComponentDescriptor::new(NAME, NAMESPACE)
        .with_label("component", "predictor")
        .with_label("model", "sklearn")
        .with_label("label.custom.io/my-label", "hello")
        .with_annotation("serving.kserve.io/deploymentMode", "RawDeployment")
        .with_annotation("serving.kserve.io/autoscalerClass", "hpa")
        .with_annotation("serving.kserve.io/metrics", "cpu")
        .with_annotation("annotation.custom.io/my-annotation", "hello")
}

pub fn pod_spec() -> PodSpec {
    PodSpec {
        containers: vec![Container {
            name: "kserve-container".to_string(),
            image: Some("kserve/sklearnserver:latest".to_string()),
            args: Some(vec![
                "--model_name=my-model".to_string(),
                "--http_port=8080".to_string(),
            ]),
            ports: Some(vec![ContainerPort {
                container_port: 8080,
                ..ContainerPort::default()
            }]),
            ..Container::default()
        }],
        ..PodSpec::default()
    }
}

pub fn reconciler(store: &InMemoryStore) -> DeploymentReconciler<InMemoryStore> {
    DeploymentReconciler::new(
        store.clone(),
        &descriptor(),
        &ComponentExtensionSpec::default(),
        &pod_spec(),
        &ControllerConfig::default(),
    )
    .expect("component descriptor is valid")
}
