pub use k8s_openapi as openapi;
pub use k8s_openapi::api::apps::v1 as appsv1;
pub use k8s_openapi::api::core::v1 as corev1;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

pub use time::TimeExt;

use openapi::Resource as _;

mod time;

/// Node condition type signalling the kubelet is healthy and can run pods
pub const NODE_READY: &str = "Ready";

/// Condition status value for a condition that holds
pub const CONDITION_TRUE: &str = "True";

pub trait ObjectMetaExt {
    fn new(name: impl ToString) -> Self;
    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self;
    fn owned_by(self, owner: metav1::OwnerReference) -> Self;
    fn deleted(self, ts: impl Into<Option<metav1::Time>>) -> Self;
}

impl ObjectMetaExt for metav1::ObjectMeta {
    fn new(name: impl ToString) -> Self {
        let name = Some(name.to_string());
        Self { name, ..default() }
    }

    fn with_namespace(name: impl ToString, namespace: impl ToString) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::new(name)
        }
    }

    fn owned_by(mut self, owner: metav1::OwnerReference) -> Self {
        self.owner_references.get_or_insert_with(Vec::new).push(owner);
        self
    }

    fn deleted(self, ts: impl Into<Option<metav1::Time>>) -> Self {
        Self {
            deletion_timestamp: ts.into(),
            ..self
        }
    }
}

pub trait OwnerReferenceExt {
    /// Controlling owner reference pointing at the StatefulSet `name`
    fn statefulset(name: impl ToString) -> Self;

    /// Same reference with the controller flag replaced by `controller`
    fn controller(self, controller: impl Into<Option<bool>>) -> Self;

    /// Whether this reference marks a StatefulSet as the managing controller.
    ///
    /// A reference qualifies only when its `controller` flag is `true`. When the
    /// flag is absent the kind alone decides.
    fn is_statefulset_controller(&self) -> bool;
}

impl OwnerReferenceExt for metav1::OwnerReference {
    fn statefulset(name: impl ToString) -> Self {
        Self {
            api_version: appsv1::StatefulSet::API_VERSION.to_string(),
            kind: appsv1::StatefulSet::KIND.to_string(),
            name: name.to_string(),
            controller: Some(true),
            ..default()
        }
    }

    fn controller(self, controller: impl Into<Option<bool>>) -> Self {
        Self {
            controller: controller.into(),
            ..self
        }
    }

    fn is_statefulset_controller(&self) -> bool {
        self.kind == appsv1::StatefulSet::KIND && self.controller.unwrap_or(true)
    }
}

pub trait PodExt {
    fn new(name: impl ToString, namespace: impl ToString) -> Self;
    fn scheduled_on(self, node: impl ToString) -> Self;

    /// Whether some StatefulSet controls this pod
    fn is_controlled_by_statefulset(&self) -> bool;

    /// Whether a deletion has been requested and the pod is still present
    fn is_terminating(&self) -> bool;

    /// Node the pod is bound to, `None` for unscheduled pods
    fn bound_node_name(&self) -> Option<&str>;
}

impl PodExt for corev1::Pod {
    fn new(name: impl ToString, namespace: impl ToString) -> Self {
        let metadata = metav1::ObjectMeta::with_namespace(name, namespace);
        Self {
            metadata,
            ..default()
        }
    }

    fn scheduled_on(self, node: impl ToString) -> Self {
        let spec = corev1::PodSpec {
            node_name: Some(node.to_string()),
            ..self.spec.unwrap_or_default()
        };
        Self {
            spec: Some(spec),
            ..self
        }
    }

    fn is_controlled_by_statefulset(&self) -> bool {
        self.metadata
            .owner_references
            .iter()
            .flatten()
            .any(OwnerReferenceExt::is_statefulset_controller)
    }

    fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    fn bound_node_name(&self) -> Option<&str> {
        self.spec
            .as_ref()
            .and_then(|spec| spec.node_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

pub trait NodeConditionExt {
    fn ready(ready: bool) -> Self;
    fn is_ready_true(&self) -> bool;
}

impl NodeConditionExt for corev1::NodeCondition {
    fn ready(ready: bool) -> Self {
        let status = if ready { CONDITION_TRUE } else { "False" };
        Self {
            type_: NODE_READY.to_string(),
            status: status.to_string(),
            ..default()
        }
    }

    fn is_ready_true(&self) -> bool {
        self.type_ == NODE_READY && self.status == CONDITION_TRUE
    }
}

pub trait NodeExt {
    fn new(name: impl ToString) -> Self;
    fn with_conditions(self, conditions: impl IntoIterator<Item = corev1::NodeCondition>) -> Self;

    /// Whether the node reports `Ready=True`.
    ///
    /// A node without any conditions, or with `Ready` in `False`/`Unknown`,
    /// is not ready.
    fn is_ready(&self) -> bool;
}

impl NodeExt for corev1::Node {
    fn new(name: impl ToString) -> Self {
        let metadata = metav1::ObjectMeta::new(name);
        Self {
            metadata,
            ..default()
        }
    }

    fn with_conditions(self, conditions: impl IntoIterator<Item = corev1::NodeCondition>) -> Self {
        let status = corev1::NodeStatus {
            conditions: Some(conditions.into_iter().collect()),
            ..self.status.unwrap_or_default()
        };
        Self {
            status: Some(status),
            ..self
        }
    }

    fn is_ready(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .into_iter()
            .flatten()
            .any(NodeConditionExt::is_ready_true)
    }
}

pub fn default<T: Default>() -> T {
    T::default()
}
