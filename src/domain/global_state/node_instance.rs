use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::domain::protocol::node_type::NodeType;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::{CapabilityId, InstanceId, NodeTypeId, StateId};

/// A runtime occurrence of a node type.
///
/// The node type is shared between all instances and all cloned application states.
#[derive(Debug, Clone)]
pub struct NodeInstance {
    id: InstanceId,
    node_type: Arc<NodeType>,
    current_state: StateId,
}

impl NodeInstance {
    /// Creates an instance sitting in the initial state of its protocol.
    pub fn new(id: InstanceId, node_type: Arc<NodeType>) -> Self {
        let current_state = node_type.protocol.initial_state().clone();
        NodeInstance { id, node_type, current_state }
    }

    pub fn in_state(id: InstanceId, node_type: Arc<NodeType>, current_state: StateId) -> Self {
        NodeInstance { id, node_type, current_state }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    pub fn type_name(&self) -> &NodeTypeId {
        &self.node_type.name
    }

    pub fn current_state(&self) -> &StateId {
        &self.current_state
    }

    pub(crate) fn set_state(&mut self, state: StateId) {
        self.current_state = state;
    }

    pub fn needed_reqs(&self) -> &BTreeSet<Requirement> {
        &self.node_type.protocol.rules(&self.current_state).needs
    }

    pub fn offered_caps(&self) -> &BTreeSet<CapabilityId> {
        &self.node_type.protocol.rules(&self.current_state).offers
    }

    pub fn fault_targets(&self) -> &BTreeSet<StateId> {
        &self.node_type.protocol.rules(&self.current_state).fault_targets
    }

    pub fn offers(&self, capability: &CapabilityId) -> bool {
        self.offered_caps().contains(capability)
    }
}

// Two instances are the same runtime value when id, type and state agree.
impl PartialEq for NodeInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.node_type.name == other.node_type.name && self.current_state == other.current_state
    }
}

impl Eq for NodeInstance {}

impl Hash for NodeInstance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.node_type.name.hash(state);
        self.current_state.hash(state);
    }
}
