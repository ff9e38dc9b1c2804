//! # Motor Controller Daemon
//!
//! Runs the command handshake until Ctrl+C or SIGTERM.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: artifacts in the current directory
//! cargo run --bin motor-ctrl
//!
//! # With a TOML file and an environment override
//! MOTOR_CTRL_CONFIG=motor.toml MOTOR_CTRL_POLL_INTERVAL_MS=50 cargo run --bin motor-ctrl
//! ```

use anyhow::Context;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use motor_ctrl::constants::CONFIG_PATH_ENV;
use motor_ctrl::logging;
use motor_ctrl::{MotorController, MotorCtrlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    info!("Starting motor controller");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config_file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = MotorCtrlConfig::load(config_file.as_deref())
        .context("Failed to load motor controller configuration")?;

    let mut controller =
        MotorController::simulated(config).context("Failed to create motor controller")?;
    info!(
        controller_id = %controller.controller_id(),
        command_file = %controller.config().command_file_path.display(),
        process_tag = %controller.config().process_tag,
        "Motor controller ready"
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, finishing current cycle");
        shutdown.cancel();
    });

    controller
        .run(cancel)
        .await
        .context("Motor controller stopped with an error")?;

    info!("Motor controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
