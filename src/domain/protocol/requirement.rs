use serde::Serialize;
use std::fmt;

use crate::domain::utils::id::RequirementId;

/// How a requirement may be resolved at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementSort {
    /// Bound to one specific replica; losing it can only be handled by the protocol's fault rules.
    ReplicaAware,

    /// Any capable replica will do, so a lost server can be replaced by reconnection.
    ReplicaUnaware,

    /// The instance lives inside its server and dies with it.
    Containment,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Requirement {
    pub name: RequirementId,
    pub sort: RequirementSort,
}

impl Requirement {
    pub fn new(name: impl Into<String>, sort: RequirementSort) -> Self {
        Requirement { name: RequirementId::new(name), sort }
    }

    pub fn replica_aware(name: impl Into<String>) -> Self {
        Requirement::new(name, RequirementSort::ReplicaAware)
    }

    pub fn replica_unaware(name: impl Into<String>) -> Self {
        Requirement::new(name, RequirementSort::ReplicaUnaware)
    }

    pub fn containment(name: impl Into<String>) -> Self {
        Requirement::new(name, RequirementSort::Containment)
    }

    pub fn is_containment(&self) -> bool {
        self.sort == RequirementSort::Containment
    }

    pub fn is_replica_unaware(&self) -> bool {
        self.sort == RequirementSort::ReplicaUnaware
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
