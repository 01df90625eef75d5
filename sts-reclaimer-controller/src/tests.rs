use std::io;
use std::time::Duration;

use k8s::PodExt as _;
use kube::runtime::reflector::ObjectRef;
use sts_reclaimer::Config;

use super::*;

/// Cluster without any pods or nodes
#[derive(Debug)]
struct EmptyCluster;

impl ClusterState for EmptyCluster {
    async fn get_pod(&self, _namespace: &str, _name: &str) -> kube::Result<Option<corev1::Pod>> {
        Ok(None)
    }

    async fn get_node(&self, _name: &str) -> kube::Result<Option<corev1::Node>> {
        Ok(None)
    }

    async fn delete_pod(&self, _pod: &corev1::Pod, _grace_period_seconds: u32) -> kube::Result<()> {
        Ok(())
    }
}

/// Cluster whose API server cannot be reached
#[derive(Debug)]
struct UnreachableCluster;

fn unreachable_api() -> kube::Error {
    let err = io::Error::new(io::ErrorKind::TimedOut, "api server timed out");
    kube::Error::ReadEvents(err)
}

impl ClusterState for UnreachableCluster {
    async fn get_pod(&self, _namespace: &str, _name: &str) -> kube::Result<Option<corev1::Pod>> {
        Err(unreachable_api())
    }

    async fn get_node(&self, _name: &str) -> kube::Result<Option<corev1::Node>> {
        Err(unreachable_api())
    }

    async fn delete_pod(&self, _pod: &corev1::Pod, _grace_period_seconds: u32) -> kube::Result<()> {
        Err(unreachable_api())
    }
}

fn context<C: ClusterState>(cluster: C) -> Arc<Context<C>> {
    let reclaimer = Reclaimer::new(cluster, Config::default());
    let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(8));
    Arc::new(Context::new(reclaimer, backoff, CancellationToken::new()))
}

fn web_0() -> Arc<corev1::Pod> {
    Arc::new(corev1::Pod::new("web-0", "app"))
}

#[test]
fn outcome_actions() {
    assert_eq!(action(Outcome::NoAction), Action::await_change());
    assert_eq!(action(Outcome::ForceDelete), Action::await_change());
    assert_eq!(
        action(Outcome::RequeueAfter(Duration::from_secs(5))),
        Action::requeue(Duration::from_secs(5))
    );
}

#[tokio::test]
async fn missing_pod_awaits_change() {
    let context = context(EmptyCluster);

    let action = reconcile(web_0(), context).await.unwrap();

    assert_eq!(action, Action::await_change());
}

#[tokio::test]
async fn failures_back_off() {
    let context = context(UnreachableCluster);

    let mut actions = Vec::new();
    for _ in 0..5 {
        let err = reconcile(web_0(), context.clone()).await.unwrap_err();
        actions.push(error_policy(web_0(), &err, context.clone()));
    }

    let expected = [1, 2, 4, 8, 8]
        .map(Duration::from_secs)
        .map(Action::requeue);
    assert_eq!(actions, expected);
    assert_eq!(context.backoff().failures(&PodRef::new("app", "web-0")), 5);
}

#[tokio::test]
async fn success_resets_backoff() {
    let context = context(EmptyCluster);
    let pod = PodRef::new("app", "web-0");
    context.backoff().next_delay(&pod);
    context.backoff().next_delay(&pod);

    reconcile(web_0(), context.clone()).await.unwrap();

    assert_eq!(context.backoff().failures(&pod), 0);
}

#[tokio::test]
async fn cancelled_reconcile_is_not_retried() {
    let context = context(EmptyCluster);
    context.cancel.cancel();

    let err = reconcile(web_0(), context.clone()).await.unwrap_err();
    let action = error_policy(web_0(), &err, context.clone());

    assert!(err.is_cancelled());
    assert_eq!(action, Action::await_change());
    assert_eq!(context.backoff().failures(&PodRef::new("app", "web-0")), 0);
}

#[tokio::test]
async fn vanished_pod_drops_backoff() {
    let context = context(UnreachableCluster);
    let pod = PodRef::new("app", "web-0");
    let err = reconcile(web_0(), context.clone()).await.unwrap_err();
    error_policy(web_0(), &err, context.clone());
    assert_eq!(context.backoff().failures(&pod), 1);

    let gone = ObjectRef::<corev1::Pod>::new("web-0").within("app").erase();
    report(Err(controller::Error::ObjectNotFound(gone)), &context);

    assert_eq!(context.backoff().failures(&pod), 0);
}

#[test]
fn vanished_pod_leaves_other_pods_alone() {
    let context = context(EmptyCluster);
    let web_1 = PodRef::new("app", "web-1");
    context.backoff().next_delay(&web_1);

    let gone = ObjectRef::<corev1::Pod>::new("web-0").within("app").erase();
    report(Err(controller::Error::ObjectNotFound(gone)), &context);

    assert_eq!(context.backoff().failures(&web_1), 1);
}
