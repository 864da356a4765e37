use std::collections::HashMap;

use crate::domain::utils::id::{CapabilityId, NodeTypeId, RequirementId};
use crate::error::ConversionError;

/// Node type and capability that may serve a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingTarget {
    pub node_type: NodeTypeId,
    pub capability: CapabilityId,
}

/// The topology's binding function: `(node type, requirement) -> (node type, capability)`.
///
/// Fixed when the application is defined and never touched at runtime.
#[derive(Debug, Clone, Default)]
pub struct StaticBindings {
    targets: HashMap<(NodeTypeId, RequirementId), BindingTarget>,
}

impl StaticBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        node_type: impl Into<String>,
        requirement: impl Into<String>,
        target_node_type: impl Into<String>,
        capability: impl Into<String>,
    ) -> Result<(), ConversionError> {
        let key = (NodeTypeId::new(node_type), RequirementId::new(requirement));
        if self.targets.contains_key(&key) {
            return Err(ConversionError::DuplicateStaticBinding { node_type: key.0.into(), requirement: key.1.into() });
        }

        let target = BindingTarget { node_type: NodeTypeId::new(target_node_type), capability: CapabilityId::new(capability) };
        self.targets.insert(key, target);
        Ok(())
    }

    pub fn target(&self, node_type: &NodeTypeId, requirement: &RequirementId) -> Option<&BindingTarget> {
        self.targets.get(&(node_type.clone(), requirement.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeTypeId, &RequirementId, &BindingTarget)> {
        self.targets.iter().map(|((node_type, requirement), target)| (node_type, requirement, target))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
