use serde::Serialize;
use std::fmt;

use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::InstanceId;

/// A needed, non-containment requirement of an active instance that is currently unsatisfied.
///
/// Faults are derived from the global state on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Fault {
    pub instance: InstanceId,
    pub requirement: Requirement,
}

impl Fault {
    pub fn new(instance: InstanceId, requirement: Requirement) -> Self {
        Fault { instance, requirement }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instance, self.requirement)
    }
}
