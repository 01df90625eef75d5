use std::sync::Arc;

use clap::Parser as _;
use constcat::concat;
use sts_reclaimer::Reclaimer;
use sts_reclaimer_controller::Context;
use sts_reclaimer_kubeapi::KubeApi;
use tokio_util::sync::CancellationToken;

mod cli;
mod health;

const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();
    let config = cli.config()?;
    tracing::info!(?config, "Starting {VERSION}");

    let kubeapi = KubeApi::new().await?;
    let pods = kubeapi.watched_pods(config.single_namespace());

    let cancel = CancellationToken::new();
    shutdown_on_signal(cancel.clone())?;

    let readiness = health::Readiness::default();
    let listener = tokio::net::TcpListener::bind(cli.health_addr).await?;
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Serving health checks on http://{addr}");
    }
    let app = health::router(readiness.clone());
    let health = axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .into_future();
    let health = tokio::spawn(health);

    let reclaimer = Reclaimer::new(kubeapi, config);
    let context = Context::new(reclaimer, cli.backoff(), cancel.clone());

    readiness.set(true);
    sts_reclaimer_controller::run(pods, Arc::new(context)).await;
    readiness.set(false);

    cancel.cancel();
    health.await??;

    Ok(())
}

/// Cancel `cancel` on SIGTERM or SIGINT
fn shutdown_on_signal(cancel: CancellationToken) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;
        use tokio::signal::unix::signal;

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down"),
            }
            cancel.cancel();
        });
    }

    #[cfg(not(unix))]
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(?err, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Received Ctrl+C, shutting down");
        cancel.cancel();
    });

    Ok(())
}
