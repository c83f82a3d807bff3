/*
 * 5D Labs Agent Platform - Raw Deployment Reconciler
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Raw deployment reconciler
//!
//! Keeps a serving component's Deployment converged with its declared state
//! while other controllers (autoscalers, admission webhooks, operators) own
//! parts of the same object. Replica count, service account fields and
//! foreign labels and annotations never trigger a write.

pub mod component;
pub mod config;
pub mod constants;
pub mod reconcilers;

// Re-export commonly used types
pub use component::{ComponentDescriptor, ComponentExtensionSpec, ComponentManifest};
pub use config::ControllerConfig;
pub use reconcilers::deployment::{
    DefaultsApplier, DesiredStateBuilder, DifferenceDetector, FieldDrift, RelevanceClassifier,
};
pub use reconcilers::{
    DeploymentReconciler, DeploymentStore, DiffOutcome, Error, KubeDeploymentStore, Result,
};
