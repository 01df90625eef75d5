use thiserror::Error;

use super::PodRef;

/// Failure of a single reconciliation.
///
/// All variants are worth retrying; a not-found pod or node never ends up
/// here since it is a regular branch of the decision.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to get pod {pod}")]
    GetPod {
        pod: PodRef,
        #[source]
        source: kube::Error,
    },

    #[error("failed to get node {node} of pod {pod}")]
    GetNode {
        pod: PodRef,
        node: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to force delete pod {pod} on node {node}")]
    DeletePod {
        pod: PodRef,
        node: String,
        #[source]
        source: kube::Error,
    },

    #[error("reconciliation of pod {0} cancelled")]
    Cancelled(PodRef),
}

impl Error {
    pub fn pod(&self) -> &PodRef {
        match self {
            Self::GetPod { pod, .. }
            | Self::GetNode { pod, .. }
            | Self::DeletePod { pod, .. }
            | Self::Cancelled(pod) => pod,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Invalid scoping configuration, fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("grace period of {0}s does not fit into the delete options")]
    GracePeriodOutOfRange(u64),

    #[error("invalid namespace {0:?}: must be a lowercase RFC 1123 label")]
    InvalidNamespace(String),
}
