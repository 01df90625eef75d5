use std::sync::Arc;

use futures::future;
use futures::StreamExt as _;
use kube::api::Api;
use kube::runtime::controller;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::runtime::Controller;
use sts_reclaimer::ClusterState;
use sts_reclaimer::Outcome;
use sts_reclaimer::PodRef;
use sts_reclaimer::Reclaimer;
use sts_reclaimer_ext as k8s;
use tokio_util::sync::CancellationToken;

use k8s::corev1;

pub use backoff::Backoff;

mod backoff;

type ReconcileResult =
    Result<(ObjectRef<corev1::Pod>, Action), controller::Error<sts_reclaimer::Error, watcher::Error>>;

/// Everything a single reconcile needs, shared by all workers
#[derive(Debug)]
pub struct Context<C> {
    reclaimer: Reclaimer<C>,
    backoff: Backoff,
    cancel: CancellationToken,
}

impl<C> Context<C>
where
    C: ClusterState,
{
    pub fn new(reclaimer: Reclaimer<C>, backoff: Backoff, cancel: CancellationToken) -> Self {
        Self {
            reclaimer,
            backoff,
            cancel,
        }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

/// Watch `pods` and reconcile every change until the context's token is cancelled.
pub async fn run<C>(pods: Api<corev1::Pod>, context: Arc<Context<C>>)
where
    C: ClusterState + 'static,
{
    tracing::info!("Starting StatefulSet pod reclaimer");
    let shutdown = context.cancel.clone().cancelled_owned();
    let reports = Arc::clone(&context);

    Controller::new(pods, watcher::Config::default())
        .graceful_shutdown_on(shutdown)
        .run(reconcile::<C>, error_policy::<C>, context)
        .for_each(|result| {
            report(result, &reports);
            future::ready(())
        })
        .await;

    tracing::info!("StatefulSet pod reclaimer stopped");
}

/// Dispatcher side of [`Outcome`]
pub fn action(outcome: Outcome) -> Action {
    match outcome {
        Outcome::NoAction | Outcome::ForceDelete => Action::await_change(),
        Outcome::RequeueAfter(delay) => Action::requeue(delay),
    }
}

/// Log one controller result and drop the backoff of pods that are gone
fn report<C>(result: ReconcileResult, context: &Context<C>) {
    match result {
        Ok((pod, action)) => tracing::debug!(%pod, ?action, "Reconciled"),
        Err(controller::Error::ReconcilerFailed(err, pod)) => {
            tracing::debug!(%pod, %err, "Reconcile failed, will retry");
        }
        Err(controller::Error::ObjectNotFound(obj)) => {
            tracing::debug!(%obj, "Pod no longer in cache");
            let pod = PodRef::new(obj.namespace.unwrap_or_default(), obj.name);
            context.backoff.reset(&pod);
        }
        Err(err) => tracing::error!(?err, "Pod controller error"),
    }
}

async fn reconcile<C>(
    pod: Arc<corev1::Pod>,
    context: Arc<Context<C>>,
) -> sts_reclaimer::Result<Action>
where
    C: ClusterState,
{
    let pod = PodRef::from(pod.as_ref());
    let outcome = context.reclaimer.reconcile(&pod, &context.cancel).await?;
    context.backoff.reset(&pod);
    Ok(action(outcome))
}

fn error_policy<C>(
    _pod: Arc<corev1::Pod>,
    err: &sts_reclaimer::Error,
    context: Arc<Context<C>>,
) -> Action
where
    C: ClusterState,
{
    if err.is_cancelled() {
        return Action::await_change();
    }
    let delay = context.backoff.next_delay(err.pod());
    tracing::warn!(pod = %err.pod(), ?delay, "Retrying failed reconcile");
    Action::requeue(delay)
}

#[cfg(test)]
mod tests;
