use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;

use k8s::NodeExt as _;
use k8s::PodExt as _;

use super::*;

/// Decides, for one pod at a time, whether a terminating StatefulSet pod has to
/// be force-deleted.
///
/// Holds no state between calls. Every [`reconcile`](Self::reconcile) re-reads
/// the pod and its node, so concurrent or repeated calls for the same pod are
/// harmless.
#[derive(Debug)]
pub struct Reclaimer<C> {
    cluster: C,
    config: Config,
}

impl<C> Reclaimer<C>
where
    C: ClusterState,
{
    pub fn new(cluster: C, config: Config) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Re-derive the action for `pod` from the current cluster state.
    ///
    /// Returns [`Error::Cancelled`] as soon as `cancel` fires, leaving any
    /// in-flight client call behind.
    #[instrument(skip_all, fields(pod = %pod))]
    pub async fn reconcile(&self, pod: &PodRef, cancel: &CancellationToken) -> Result<Outcome> {
        let Some(object) = self.get_pod(pod, cancel).await? else {
            debug!("Pod not found");
            return Ok(Outcome::NoAction);
        };

        if !object.is_controlled_by_statefulset() {
            debug!("Pod is not controlled by a StatefulSet, skipping");
            return Ok(Outcome::NoAction);
        }

        if !self.config.manages(&pod.namespace) {
            info!(namespace = %pod.namespace, "Pod is not in a managed namespace, skipping");
            return Ok(Outcome::NoAction);
        }

        if !object.is_terminating() {
            debug!("Pod is not terminating");
            return Ok(Outcome::NoAction);
        }

        let Some(node) = object.bound_node_name() else {
            info!("Pod has not been scheduled to a node, skipping force delete");
            return Ok(Outcome::NoAction);
        };

        match self.get_node(pod, node, cancel).await? {
            Some(found) if found.is_ready() => {
                let requeue_after = self.config.requeue_after();
                info!(
                    node,
                    ?requeue_after,
                    "Pod is terminating but its node is healthy, will look again"
                );
                Ok(Outcome::RequeueAfter(requeue_after))
            }
            Some(_) => {
                info!(node, "Pod's node is not ready, force deleting pod");
                self.force_delete(pod, &object, node, cancel).await
            }
            None => {
                info!(node, "Pod's node is gone, force deleting pod");
                self.force_delete(pod, &object, node, cancel).await
            }
        }
    }

    async fn get_pod(
        &self,
        pod: &PodRef,
        cancel: &CancellationToken,
    ) -> Result<Option<corev1::Pod>> {
        let call = self.cluster.get_pod(&pod.namespace, &pod.name);
        let result = cancellable(pod, cancel, call).await?;
        result
            .map_err(|source| Error::GetPod {
                pod: pod.clone(),
                source,
            })
            .inspect_err(|err| error!(?err, "Failed to get pod"))
    }

    async fn get_node(
        &self,
        pod: &PodRef,
        node: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<corev1::Node>> {
        let call = self.cluster.get_node(node);
        let result = cancellable(pod, cancel, call).await?;
        result
            .map_err(|source| Error::GetNode {
                pod: pod.clone(),
                node: node.to_string(),
                source,
            })
            .inspect_err(|err| error!(node, ?err, "Failed to get node"))
    }

    async fn force_delete(
        &self,
        pod: &PodRef,
        object: &corev1::Pod,
        node: &str,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let grace_period_seconds = self.config.grace_period_seconds();
        let call = self.cluster.delete_pod(object, grace_period_seconds);
        let result = cancellable(pod, cancel, call).await?;
        result
            .map_err(|source| Error::DeletePod {
                pod: pod.clone(),
                node: node.to_string(),
                source,
            })
            .inspect_err(|err| error!(node, ?err, "Failed to force delete StatefulSet pod"))?;

        info!(node, grace_period_seconds, "Pod force deleted");
        Ok(Outcome::ForceDelete)
    }
}

async fn cancellable<F>(pod: &PodRef, cancel: &CancellationToken, call: F) -> Result<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled(pod.clone())),
        output = call => Ok(output),
    }
}
