use serde::Serialize;
use std::fmt;

use crate::domain::utils::id::{InstanceId, NodeTypeId, OperationId};

/// One lifecycle action of a management plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    /// Creates an instance of a node type without containment requirement.
    ScaleOut { node_type: NodeTypeId, instance: InstanceId },

    /// Creates an instance of a node type with exactly one containment requirement inside `container`.
    ScaleOutContained { node_type: NodeTypeId, instance: InstanceId, container: InstanceId },

    /// Destroys an instance and, transitively, everything it contains.
    ScaleIn { instance: InstanceId },

    /// Starts a protocol operation, moving the instance into the transition's transient state.
    OpStart { instance: InstanceId, operation: OperationId },

    /// Completes a running operation, moving the instance into the transition's end state.
    OpEnd { instance: InstanceId, operation: OperationId },
}

impl Action {
    pub fn scale_out(node_type: impl Into<String>, instance: impl Into<String>) -> Self {
        Action::ScaleOut { node_type: NodeTypeId::new(node_type), instance: InstanceId::new(instance) }
    }

    pub fn scale_out_contained(node_type: impl Into<String>, instance: impl Into<String>, container: impl Into<String>) -> Self {
        Action::ScaleOutContained {
            node_type: NodeTypeId::new(node_type),
            instance: InstanceId::new(instance),
            container: InstanceId::new(container),
        }
    }

    pub fn scale_in(instance: impl Into<String>) -> Self {
        Action::ScaleIn { instance: InstanceId::new(instance) }
    }

    pub fn op_start(instance: impl Into<String>, operation: impl Into<String>) -> Self {
        Action::OpStart { instance: InstanceId::new(instance), operation: OperationId::new(operation) }
    }

    pub fn op_end(instance: impl Into<String>, operation: impl Into<String>) -> Self {
        Action::OpEnd { instance: InstanceId::new(instance), operation: OperationId::new(operation) }
    }

    /// The instance the action is applied to (or creates).
    pub fn subject(&self) -> &InstanceId {
        match self {
            Action::ScaleOut { instance, .. }
            | Action::ScaleOutContained { instance, .. }
            | Action::ScaleIn { instance }
            | Action::OpStart { instance, .. }
            | Action::OpEnd { instance, .. } => instance,
        }
    }

    /// Whether the action may ask the binding policy for new servers of its subject.
    pub fn binds_subject(&self) -> bool {
        !matches!(self, Action::ScaleIn { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ScaleOut { node_type, instance } => write!(f, "scaleOut({}, {})", node_type, instance),
            Action::ScaleOutContained { node_type, instance, container } => {
                write!(f, "scaleOutContained({}, {}, {})", node_type, instance, container)
            }
            Action::ScaleIn { instance } => write!(f, "scaleIn({})", instance),
            Action::OpStart { instance, operation } => write!(f, "opStart({}, {})", instance, operation),
            Action::OpEnd { instance, operation } => write!(f, "opEnd({}, {})", instance, operation),
        }
    }
}
