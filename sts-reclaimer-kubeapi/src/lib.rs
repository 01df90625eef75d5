use std::fmt::Debug;

use kube::api;
use kube::ResourceExt as _;
use sts_reclaimer::ClusterState;
use sts_reclaimer_ext as k8s;

use k8s::corev1;

/// Cluster state client backed by the Kubernetes API server
pub struct KubeApi {
    client: kube::Client,
}

impl KubeApi {
    /// Create a KubeApi configured with a default Kubernetes client.
    ///
    /// The client is inferred from the environment: in-cluster service account
    /// first, then the local kubeconfig.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn run() -> Result<(), kube::Error> {
    /// let api = sts_reclaimer_kubeapi::KubeApi::new().await?;
    /// // use `api`...
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new() -> kube::Result<Self> {
        kube::Client::try_default().await.map(Self::with_client)
    }

    /// Create a KubeApi backed by the provided Kubernetes client.
    pub fn with_client(client: kube::Client) -> Self {
        Self { client }
    }

    /// Pod handle used to watch pods, scoped to `namespace` when given
    pub fn watched_pods(&self, namespace: Option<&str>) -> api::Api<corev1::Pod> {
        match namespace {
            Some(namespace) => api::Api::namespaced(self.client.clone(), namespace),
            None => api::Api::all(self.client.clone()),
        }
    }

    fn pods(&self, namespace: &str) -> api::Api<corev1::Pod> {
        api::Api::namespaced(self.client.clone(), namespace)
    }

    fn nodes(&self) -> api::Api<corev1::Node> {
        api::Api::all(self.client.clone())
    }
}

impl ClusterState for KubeApi {
    async fn get_pod(&self, namespace: &str, name: &str) -> kube::Result<Option<corev1::Pod>> {
        self.pods(namespace).get_opt(name).await
    }

    async fn get_node(&self, name: &str) -> kube::Result<Option<corev1::Node>> {
        self.nodes().get_opt(name).await
    }

    async fn delete_pod(&self, pod: &corev1::Pod, grace_period_seconds: u32) -> kube::Result<()> {
        let namespace = pod.namespace().unwrap_or_default();
        let name = pod.name_any();
        let dp = delete_params(pod, grace_period_seconds);
        let result = self.pods(&namespace).delete(&name, &dp).await;
        match result {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => {
                tracing::debug!(%namespace, %name, "Pod already gone");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl Debug for KubeApi {
    /// Formats the `KubeApi` for debugging while redacting the `client`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeApi")
            .field("client", &"<kube::Client>")
            .finish()
    }
}

/// Delete options bound to the UID of `pod`.
///
/// A StatefulSet re-creates its pods under the same name, so the precondition
/// keeps a delayed delete from hitting the replacement pod.
fn delete_params(pod: &corev1::Pod, grace_period_seconds: u32) -> api::DeleteParams {
    let preconditions = api::Preconditions {
        uid: pod.uid(),
        resource_version: None,
    };
    api::DeleteParams {
        grace_period_seconds: Some(grace_period_seconds),
        preconditions: Some(preconditions),
        ..api::DeleteParams::default()
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}
