//! dnspod-ddns - dynamic DNS agent for DNSPod.

use clap::{Parser, Subcommand};
use dnspod_ddns::config::Config;
use dnspod_ddns::detect::{AddressSource, IpDetector};
use dnspod_ddns::dnspod::Client;
use dnspod_ddns::updater::{CycleOutcome, Updater};
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "dnspod-ddns")]
#[command(about = "Dynamic DNS agent for DNSPod, configured via environment variables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile on the configured interval (default)
    Run,

    /// Run exactly one reconciliation cycle and exit
    Once,

    /// Print the address detection would pick, without touching DNS
    Detect,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("config error: {e}");
            std::process::exit(2);
        }
    };

    let detector = match IpDetector::from_config(&config) {
        Ok(detector) => detector,
        Err(e) => {
            error!("config error: {e}");
            std::process::exit(2);
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let updater = Updater::new(config.clone(), Box::new(detector), Box::new(Client::from_config(&config)));
            let shutdown = spawn_signal_handler();
            match updater.run(shutdown).await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => info!("shutdown signal received"),
                Err(e) => {
                    error!("fatal: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Once => {
            let updater = Updater::new(config.clone(), Box::new(detector), Box::new(Client::from_config(&config)));
            match updater.check_once().await {
                Ok(CycleOutcome::Updated { ip, previous }) => {
                    println!("updated: {previous} -> {ip}");
                }
                Ok(CycleOutcome::NoChange { ip }) => {
                    println!("no change: {ip}");
                }
                Ok(CycleOutcome::ConstraintSkipped) => {
                    println!("skipped: wifi constraint not satisfied");
                }
                Err(e) => {
                    error!("check failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Detect => match detector.detect_ipv4().await {
            Ok(detected) => println!("{} via {}", detected.ip, detected.source),
            Err(e) => {
                error!("detection failed: {e}");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Translate SIGINT/SIGTERM into the cancellation channel the loop watches.
fn spawn_signal_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        let _ = tx.send(true);
    });

    rx
}
