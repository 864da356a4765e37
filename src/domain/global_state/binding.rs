use serde::Serialize;

use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::InstanceId;

/// Concrete server currently assigned to one requirement of a requesting instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuntimeBinding {
    pub requirement: Requirement,
    pub server: InstanceId,
}

impl RuntimeBinding {
    pub fn new(requirement: Requirement, server: InstanceId) -> Self {
        RuntimeBinding { requirement, server }
    }
}
