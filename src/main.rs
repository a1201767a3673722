use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use kube_leader_election::{LeaseLock, LeaseLockParams};
use tokio::signal;
use tracing::{error, info, warn};

use pvc_webhook::config::{OperatorMode, StorageDefaults, webhook_port_from_env};
use pvc_webhook::health::{HealthState, run_health_server};
use pvc_webhook::{
    MutationEngine, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, run_controller,
    run_webhook_server,
};

/// Lease configuration
const LEASE_NAME: &str = "pvc-webhook-controller-leader";
const LEASE_TTL_SECS: u64 = 15;
const LEASE_RENEW_INTERVAL_SECS: u64 = 5;

/// Grace period for in-flight reconciliations to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pvc_webhook=info".parse()?)
                .add_directive("kube=info".parse()?)
                .add_directive("kube_leader_election=info".parse()?),
        )
        .init();

    let mode = OperatorMode::from_env()?;
    info!(mode = %mode, "Starting pvc-webhook");

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately (probes should work even as non-leader)
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let webhook_handle = if mode.runs_webhook() {
        start_webhook(mode, health_state.clone()).await?
    } else {
        None
    };

    let controller_future = {
        let health_state = health_state.clone();
        async move {
            if mode.runs_controller() {
                if let Err(e) = run_elected_controller(health_state).await {
                    error!("Controller error: {}", e);
                }
            } else {
                std::future::pending::<()>().await;
            }
        }
    };

    // Create a future that monitors the webhook handle (if it exists)
    let webhook_future = async {
        if let Some(handle) = webhook_handle {
            if let Err(e) = handle.await {
                error!("Webhook server task panicked: {}", e);
            }
        } else {
            // No webhook server, wait forever
            std::future::pending::<()>().await;
        }
    };

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        _ = controller_future => {
            error!("Controller exited");
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = webhook_future => {
            // Webhook server exited (either panic or normal exit)
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Mark as not ready to stop receiving new work
            health_state.set_ready(false).await;
            info!("Marked operator as not ready");

            info!(
                "Waiting {}s for in-flight requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("Operator stopped");
    Ok(())
}

/// Spawn the admission server when TLS material is mounted.
///
/// Missing certificates are fatal in webhook-only mode and only disable the
/// webhook otherwise.
async fn start_webhook(
    mode: OperatorMode,
    health_state: Arc<HealthState>,
) -> Result<Option<tokio::task::JoinHandle<()>>, BoxError> {
    if !(Path::new(WEBHOOK_CERT_PATH).exists() && Path::new(WEBHOOK_KEY_PATH).exists()) {
        if mode == OperatorMode::Webhook {
            return Err(format!(
                "TLS certificates not found at {} and {}",
                WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH
            )
            .into());
        }
        info!(
            "TLS certificates not found at {} and {}, webhook server disabled",
            WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH
        );
        return Ok(None);
    }

    let port = webhook_port_from_env(WEBHOOK_PORT)?;
    let defaults = StorageDefaults::from_env();
    info!(
        size = %defaults.size,
        storage_class = %defaults.storage_class,
        access_modes = %defaults.access_modes,
        port,
        "TLS certificates found, starting webhook server"
    );

    let engine = MutationEngine::new(defaults);
    Ok(Some(tokio::spawn(async move {
        if let Err(e) = run_webhook_server(
            engine,
            Some(health_state),
            WEBHOOK_CERT_PATH,
            WEBHOOK_KEY_PATH,
            port,
        )
        .await
        {
            error!("Webhook server error: {}", e);
        }
    })))
}

/// Acquire the controller lease, keep renewing it and run the controller
async fn run_elected_controller(health_state: Arc<HealthState>) -> Result<(), BoxError> {
    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Get pod identity for leader election
    let pod_name = std::env::var("POD_NAME").unwrap_or_else(|_| {
        warn!("POD_NAME not set, using hostname");
        hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    });
    let namespace = std::env::var("POD_NAMESPACE").unwrap_or_else(|_| {
        warn!("POD_NAMESPACE not set, using 'default'");
        "default".to_string()
    });

    info!(
        holder_id = %pod_name,
        namespace = %namespace,
        lease_name = LEASE_NAME,
        "Initializing leader election"
    );

    let lease_params = || LeaseLockParams {
        holder_id: pod_name.clone(),
        lease_name: LEASE_NAME.to_string(),
        lease_ttl: Duration::from_secs(LEASE_TTL_SECS),
    };
    let lease_lock = LeaseLock::new(client.clone(), &namespace, lease_params());

    // Acquire leadership before starting controller
    info!("Waiting to acquire leadership...");
    loop {
        match lease_lock.try_acquire_or_renew().await {
            Ok(result) if result.acquired_lease => {
                info!("Acquired leadership");
                break;
            }
            Ok(_) => info!("Another instance is leader, waiting..."),
            Err(e) => warn!("Failed to acquire lease: {}, retrying...", e),
        }
        tokio::time::sleep(Duration::from_secs(LEASE_RENEW_INTERVAL_SECS)).await;
    }

    // Start lease renewal background task
    let renewal_lock = LeaseLock::new(client.clone(), &namespace, lease_params());
    let lease_renewal_handle = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(LEASE_RENEW_INTERVAL_SECS)).await;

            match renewal_lock.try_acquire_or_renew().await {
                Ok(result) if result.acquired_lease => {}
                Ok(_) => {
                    error!("Lost leadership! Shutting down...");
                    // Exit so Kubernetes restarts us and we re-enter election
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Failed to renew lease: {}. Shutting down...", e);
                    std::process::exit(1);
                }
            }
        }
    });

    info!("Watching Pod and PersistentVolumeClaim resources");

    tokio::select! {
        _ = run_controller(client, Some(health_state)) => {}
        // Lease renewal task only exits via process::exit() or panic
        Err(e) = lease_renewal_handle => {
            error!("Lease renewal task panicked: {}", e);
        }
    }

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
