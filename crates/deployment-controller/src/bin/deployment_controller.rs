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

//! Deployment Controller - converges one serving component's Deployment
//!
//! Builds the desired Deployment from a component manifest and reconciles it
//! against the cluster on a fixed interval until shut down.

use anyhow::{Context, Result};
use clap::Parser;
use deployment_controller::config::LogFormat;
use deployment_controller::{
    ComponentManifest, ControllerConfig, DeploymentReconciler, KubeDeploymentStore,
};
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Raw deployment reconciler for a serving component
#[derive(Parser, Debug)]
#[command(name = "deployment-controller", version, about)]
struct Args {
    /// Controller configuration file
    #[arg(long, env = "CONTROLLER_CONFIG", default_value = "/config/config.yaml")]
    config: String,

    /// Component manifest (metadata, extension and pod spec)
    #[arg(long, env = "COMPONENT_MANIFEST")]
    manifest: String,

    /// Reconcile once and exit
    #[arg(long)]
    once: bool,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let (json, text) = match format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Text => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = ControllerConfig::from_mounted_file(&args.config);
    let config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => ControllerConfig::default(),
    };
    init_tracing(config.logging.format);

    info!(
        "Starting 5D Labs Deployment Controller v{}",
        env!("CARGO_PKG_VERSION")
    );
    match loaded {
        Ok(_) => debug!("Loaded controller configuration from {}", args.config),
        Err(e) => error!("Failed to load configuration, using defaults: {}", e),
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    let manifest = ComponentManifest::from_file(&args.manifest)?;

    let client = kube::Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let reconciler = DeploymentReconciler::new(
        KubeDeploymentStore::new(client),
        &manifest.metadata,
        &manifest.extension,
        &manifest.pod_spec,
        &config,
    )?
    .with_span(info_span!("component", component = %manifest.metadata.name));

    if args.once {
        reconciler.reconcile().await?;
        info!("Reconciled {}/{}", reconciler.namespace(), reconciler.name());
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.reconcile.interval_seconds));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // errors are left to the next tick
                if let Err(e) = reconciler.reconcile().await {
                    error!(retryable = e.is_retryable(), "Reconcile failed: {}", e);
                }
            }
            () = &mut shutdown => break,
        }
    }

    info!("Deployment controller stopped");
    Ok(())
}
