use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use sts_reclaimer::Config;
use sts_reclaimer::ConfigError;
use sts_reclaimer::parse_duration;
use sts_reclaimer_controller::Backoff;

/// Force-delete StatefulSet pods stuck terminating on lost or unhealthy nodes
#[derive(Debug, Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Comma separated namespaces to manage, all namespaces when not set
    #[arg(long, env = "STS_RECLAIMER_MANAGED_NAMESPACES", value_delimiter = ',')]
    managed_namespaces: Vec<String>,

    /// Grace period of the force delete, in Go duration syntax
    #[arg(
        long,
        env = "STS_RECLAIMER_FORCE_DELETE_GRACE_PERIOD",
        default_value = "0s",
        value_parser = parse_duration
    )]
    force_delete_grace_period: Duration,

    /// Delay before looking again at a pod terminating on a healthy node
    #[arg(
        long,
        env = "STS_RECLAIMER_REQUEUE_AFTER",
        default_value = "5s",
        value_parser = parse_duration
    )]
    requeue_after: Duration,

    /// First retry delay after a failed reconcile
    #[arg(
        long,
        env = "STS_RECLAIMER_ERROR_BACKOFF_BASE",
        default_value = "1s",
        value_parser = parse_duration
    )]
    error_backoff_base: Duration,

    /// Upper bound of the retry delay after failed reconciles
    #[arg(
        long,
        env = "STS_RECLAIMER_ERROR_BACKOFF_MAX",
        default_value = "5m",
        value_parser = parse_duration
    )]
    error_backoff_max: Duration,

    /// Listen address of the health endpoints
    #[arg(long, env = "STS_RECLAIMER_HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub(crate) health_addr: SocketAddr,
}

impl Cli {
    pub(crate) fn config(&self) -> Result<Config, ConfigError> {
        let config = Config::default()
            .with_managed_namespaces(self.managed_namespaces.iter().cloned())?
            .with_force_delete_grace_period(self.force_delete_grace_period)?
            .with_requeue_after(self.requeue_after);
        Ok(config)
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff::new(self.error_backoff_base, self.error_backoff_max)
    }
}
