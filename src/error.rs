use serde::Serialize;
use thiserror::Error;

use crate::domain::utils::id::{InstanceId, NodeTypeId, OperationId, RequirementId, StateId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal domain model: {0}")]
    ModelConstructionError(#[from] ConversionError),

    #[error("Failed to execute management action: {0}")]
    ExecutionError(#[from] ExecutionError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Raised while turning parsed DTOs (or hand-built parts) into the domain model.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Malformed identifier '{0}'")]
    IllegalIdentifier(String),

    #[error("Node type '{0}' is defined more than once")]
    DuplicateNodeType(String),

    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Invalid node type '{node_type}': {source}")]
    InvalidNodeType {
        node_type: String,
        #[source]
        source: Box<ConversionError>,
    },

    #[error("Requirement '{0}' is declared more than once")]
    DuplicateRequirement(String),

    #[error("Requirement '{0}' is not declared")]
    UnknownRequirement(String),

    #[error("Capability '{0}' is not declared")]
    UnknownCapability(String),

    #[error("Operation '{0}' is not declared")]
    UnknownOperation(String),

    #[error("State '{0}' does not exist")]
    UnknownState(String),

    #[error("State '{0}' is defined more than once")]
    DuplicateState(String),

    #[error("More than one transition leaves state '{state}' with operation '{operation}'")]
    AmbiguousTransition { state: String, operation: String },

    #[error("Requirement '{requirement}' of node type '{node_type}' has more than one static binding")]
    DuplicateStaticBinding { node_type: String, requirement: String },

    #[error("Unknown binding policy '{0}'")]
    UnknownBindingPolicy(String),

    #[error("Action id '{0}' is used more than once")]
    DuplicateAction(String),

    #[error("Constraint references unknown action '{0}'")]
    UnknownAction(String),

    #[error("Plan constraints contain a cycle")]
    CyclicConstraints,

    #[error("Invalid global state snapshot: {0}")]
    Snapshot(#[from] ExecutionError),
}

/// Coarse classification of an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    IllegalInput,
    RuleNotApplicable,
    Recoverable,
    Unrecoverable,
}

/// Everything that can go wrong while applying one action to an application.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ExecutionError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(NodeTypeId),

    #[error("Unknown instance '{0}'")]
    UnknownInstance(InstanceId),

    #[error("Instance id '{0}' is already in use")]
    DuplicateInstance(InstanceId),

    #[error("Malformed identifier '{0}'")]
    IllegalIdentifier(String),

    #[error("Requirement '{requirement}' of node type '{node_type}' has no static binding")]
    MissingStaticBinding { node_type: NodeTypeId, requirement: RequirementId },

    #[error("Node type '{node_type}' has containment requirement '{requirement}' and must be scaled out inside a container")]
    ContainmentRequired { node_type: NodeTypeId, requirement: RequirementId },

    #[error("Node type '{node_type}' declares {found} containment requirements, exactly one is needed")]
    NotContainedType { node_type: NodeTypeId, found: usize },

    #[error("Instance '{container}' cannot contain instances of node type '{node_type}'")]
    ContainerMismatch { node_type: NodeTypeId, container: InstanceId },

    #[error("Operation '{operation}' is not available for instance '{instance}' in state '{state}'")]
    OperationNotAvailable { instance: InstanceId, operation: OperationId, state: StateId },

    #[error("Requirement '{requirement}' of instance '{instance}' is not a pending fault")]
    NotPendingFault { instance: InstanceId, requirement: RequirementId },

    #[error("Fault on requirement '{requirement}' of instance '{instance}' is resolvable and must be reconnected")]
    ResolvableFault { instance: InstanceId, requirement: RequirementId },

    #[error("Fault on requirement '{requirement}' of instance '{instance}' cannot be resolved by reconnection")]
    NotResolvableFault { instance: InstanceId, requirement: RequirementId },

    #[error("Instance '{server}' cannot serve requirement '{requirement}' of instance '{instance}'")]
    IncapableServer { instance: InstanceId, requirement: RequirementId, server: InstanceId },

    #[error("Operation '{operation}' of instance '{instance}' is blocked by pending faults on [{}]", join(.requirements))]
    BlockedByFaults { instance: InstanceId, operation: OperationId, requirements: Vec<RequirementId> },

    #[error("No fault handling state of instance '{instance}' in state '{state}' drops requirement '{requirement}'")]
    UnrecoverableFault { instance: InstanceId, requirement: RequirementId, state: StateId },
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::UnknownNodeType(_)
            | ExecutionError::UnknownInstance(_)
            | ExecutionError::DuplicateInstance(_)
            | ExecutionError::IllegalIdentifier(_)
            | ExecutionError::MissingStaticBinding { .. } => ErrorKind::IllegalInput,
            ExecutionError::ContainmentRequired { .. }
            | ExecutionError::NotContainedType { .. }
            | ExecutionError::ContainerMismatch { .. }
            | ExecutionError::OperationNotAvailable { .. }
            | ExecutionError::NotPendingFault { .. }
            | ExecutionError::ResolvableFault { .. }
            | ExecutionError::NotResolvableFault { .. }
            | ExecutionError::IncapableServer { .. } => ErrorKind::RuleNotApplicable,
            ExecutionError::BlockedByFaults { .. } => ErrorKind::Recoverable,
            ExecutionError::UnrecoverableFault { .. } => ErrorKind::Unrecoverable,
        }
    }

    /// A blocked `op_end` leaves the application in a consistent, explorable state.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Recoverable
    }
}

fn join(requirements: &[RequirementId]) -> String {
    requirements.iter().map(RequirementId::as_str).collect::<Vec<_>>().join(", ")
}
