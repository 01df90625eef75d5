//! Reclaims StatefulSet pods stuck in `Terminating` on nodes that are gone or
//! no longer `Ready`.
//!
//! A pod whose node became unreachable keeps its deletion timestamp forever,
//! since no kubelet is left to confirm termination. The StatefulSet controller
//! will not create a replacement with the same identity until the old pod is
//! gone from the API, so the [`Reclaimer`] force-deletes it with a zero grace
//! period once the node is known to be unhealthy.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use sts_reclaimer_ext as k8s;

use k8s::corev1;

pub use config::Config;
pub use config::parse_duration;
pub use error::ConfigError;
pub use error::Error;
pub use reclaimer::Reclaimer;

mod config;
mod error;
mod reclaimer;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Namespaced pod identity handed over by the event dispatcher
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    pub fn new(namespace: impl ToString, name: impl ToString) -> Self {
        let namespace = namespace.to_string();
        let name = name.to_string();
        Self { namespace, name }
    }
}

impl From<&corev1::Pod> for PodRef {
    fn from(pod: &corev1::Pod) -> Self {
        let namespace = pod.metadata.namespace.clone().unwrap_or_default();
        let name = pod.metadata.name.clone().unwrap_or_default();
        Self { namespace, name }
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Decision taken by a single reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to reclaim
    NoAction,
    /// The pod was deleted with the configured grace period
    ForceDelete,
    /// The pod is terminating on a healthy node, look again after the delay
    RequeueAfter(Duration),
}

/// Point-in-time access to the cluster state store.
///
/// Lookups report a missing object as `Ok(None)`. Deleting an object that is
/// already gone succeeds.
pub trait ClusterState: Send + Sync {
    fn get_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = kube::Result<Option<corev1::Pod>>> + Send;

    fn get_node(&self, name: &str) -> impl Future<Output = kube::Result<Option<corev1::Node>>> + Send;

    /// Delete `pod` with the given grace period.
    ///
    /// The deletion is bound to the UID of `pod`, so a newer pod that re-uses
    /// the same name is left alone.
    fn delete_pod(
        &self,
        pod: &corev1::Pod,
        grace_period_seconds: u32,
    ) -> impl Future<Output = kube::Result<()>> + Send;
}
