use std::collections::BTreeSet;

use crate::domain::protocol::management_protocol::ManagementProtocol;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::{CapabilityId, NodeTypeId, OperationId, RequirementId};
use crate::error::ConversionError;

/// Immutable declaration of an application component.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub name: NodeTypeId,
    pub protocol: ManagementProtocol,
    pub requirements: BTreeSet<Requirement>,
    pub capabilities: BTreeSet<CapabilityId>,
    pub operations: BTreeSet<OperationId>,
}

impl NodeType {
    /// Builds a node type whose protocol only uses what the type declares.
    pub fn new(
        name: impl Into<String>,
        protocol: ManagementProtocol,
        requirements: impl IntoIterator<Item = Requirement>,
        capabilities: impl IntoIterator<Item = CapabilityId>,
        operations: impl IntoIterator<Item = OperationId>,
    ) -> Result<Self, ConversionError> {
        let name = NodeTypeId::new(name);
        if !name.is_well_formed() {
            return Err(ConversionError::IllegalIdentifier(name.into()));
        }

        let mut declared: BTreeSet<Requirement> = BTreeSet::new();
        for requirement in requirements {
            if declared.iter().any(|r| r.name == requirement.name) {
                return Err(ConversionError::DuplicateRequirement(requirement.name.into()));
            }
            declared.insert(requirement);
        }
        let capabilities: BTreeSet<CapabilityId> = capabilities.into_iter().collect();
        let operations: BTreeSet<OperationId> = operations.into_iter().collect();

        if let Some(requirement) = protocol.mentioned_requirements().find(|r| !declared.contains(*r)) {
            return Err(ConversionError::UnknownRequirement(requirement.name.to_string()));
        }
        if let Some(capability) = protocol.mentioned_capabilities().find(|c| !capabilities.contains(*c)) {
            return Err(ConversionError::UnknownCapability(capability.to_string()));
        }
        if let Some(transition) = protocol.transitions().iter().find(|t| !operations.contains(&t.operation)) {
            return Err(ConversionError::UnknownOperation(transition.operation.to_string()));
        }

        Ok(NodeType { name, protocol, requirements: declared, capabilities, operations })
    }

    pub fn requirement(&self, name: &RequirementId) -> Option<&Requirement> {
        self.requirements.iter().find(|r| &r.name == name)
    }

    pub fn containment_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(|r| r.is_containment())
    }

    pub fn declares_capability(&self, capability: &CapabilityId) -> bool {
        self.capabilities.contains(capability)
    }
}
