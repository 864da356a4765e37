use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::application::binding_policy::BindingPolicy;
use crate::domain::global_state::fault::Fault;
use crate::domain::global_state::global_state::GlobalState;
use crate::domain::global_state::node_instance::NodeInstance;
use crate::domain::plan::action::Action;
use crate::domain::protocol::node_type::NodeType;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::protocol::static_binding::{BindingTarget, StaticBindings};
use crate::domain::utils::id::{ApplicationId, InstanceId, NodeTypeId, OperationId, RequirementId, StateId};
use crate::error::{ConversionError, ExecutionError};

/// Execution engine of a managed application.
///
/// Owns the node type registry, the static binding function, the global state and the
/// binding policy, and applies one lifecycle action at a time while enforcing the rules
/// of the management protocols. Node types and static bindings are shared between
/// clones, the global state is copied, so a clone is an isolated branch.
#[derive(Debug, Clone)]
pub struct Application {
    name: ApplicationId,
    node_types: Arc<BTreeMap<NodeTypeId, Arc<NodeType>>>,
    static_bindings: Arc<StaticBindings>,
    global_state: GlobalState,
    binding_policy: BindingPolicy,
}

impl Application {
    /// Creates an application with an empty global state.
    ///
    /// Every static binding must start from a requirement its node type declares and
    /// end in a capability the target node type declares.
    pub fn new(
        name: impl Into<String>,
        node_types: Vec<NodeType>,
        static_bindings: StaticBindings,
        binding_policy: BindingPolicy,
    ) -> Result<Self, ConversionError> {
        let name = ApplicationId::new(name);
        if !name.is_well_formed() {
            return Err(ConversionError::IllegalIdentifier(name.into()));
        }

        let mut registry = BTreeMap::new();
        for node_type in node_types {
            if registry.contains_key(&node_type.name) {
                return Err(ConversionError::DuplicateNodeType(node_type.name.into()));
            }
            registry.insert(node_type.name.clone(), Arc::new(node_type));
        }

        for (source, requirement, target) in static_bindings.iter() {
            let source_type = registry.get(source).ok_or_else(|| ConversionError::UnknownNodeType(source.to_string()))?;
            if source_type.requirement(requirement).is_none() {
                return Err(ConversionError::UnknownRequirement(requirement.to_string()));
            }
            let target_type = registry.get(&target.node_type).ok_or_else(|| ConversionError::UnknownNodeType(target.node_type.to_string()))?;
            if !target_type.declares_capability(&target.capability) {
                return Err(ConversionError::UnknownCapability(target.capability.to_string()));
            }
        }

        let static_bindings = Arc::new(static_bindings);
        log::debug!("Application '{}' defined with {} node types and {} static bindings.", name, registry.len(), static_bindings.len());

        Ok(Application {
            name,
            node_types: Arc::new(registry),
            global_state: GlobalState::new(static_bindings.clone()),
            static_bindings,
            binding_policy,
        })
    }

    pub fn name(&self) -> &ApplicationId {
        &self.name
    }

    pub fn global_state(&self) -> &GlobalState {
        &self.global_state
    }

    pub(crate) fn global_state_mut(&mut self) -> &mut GlobalState {
        &mut self.global_state
    }

    pub fn static_bindings(&self) -> &StaticBindings {
        &self.static_bindings
    }

    pub fn binding_policy(&self) -> BindingPolicy {
        self.binding_policy
    }

    pub fn set_binding_policy(&mut self, binding_policy: BindingPolicy) {
        self.binding_policy = binding_policy;
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.node_types.values().map(|node_type| node_type.as_ref())
    }

    pub fn node_type(&self, name: &NodeTypeId) -> Result<Arc<NodeType>, ExecutionError> {
        self.node_types.get(name).cloned().ok_or_else(|| ExecutionError::UnknownNodeType(name.clone()))
    }

    /// Applies any action.
    pub fn perform(&mut self, action: &Action) -> Result<(), ExecutionError> {
        match action {
            Action::ScaleOut { node_type, instance } => self.scale_out(node_type, instance),
            Action::ScaleOutContained { node_type, instance, container } => self.scale_out_contained(node_type, instance, container),
            Action::ScaleIn { instance } => self.scale_in(instance),
            Action::OpStart { instance, operation } => self.op_start(instance, operation),
            Action::OpEnd { instance, operation } => self.op_end(instance, operation),
        }
    }

    /// Creates `instance` of a node type without containment requirement and binds its
    /// needed requirements where a capable server exists.
    pub fn scale_out(&mut self, node_type: &NodeTypeId, instance: &InstanceId) -> Result<(), ExecutionError> {
        let node_type = self.node_type(node_type)?;
        if let Some(requirement) = node_type.containment_requirements().next() {
            return Err(ExecutionError::ContainmentRequired { node_type: node_type.name.clone(), requirement: requirement.name.clone() });
        }
        self.create_instance(node_type, instance)
    }

    /// Creates `instance` inside `container`.
    ///
    /// The container is checked against the static target of the containment requirement
    /// at type level: it must be of the target node type, and that type must declare the
    /// target capability. Whether the container offers the capability right now does not
    /// matter.
    pub fn scale_out_contained(&mut self, node_type: &NodeTypeId, instance: &InstanceId, container: &InstanceId) -> Result<(), ExecutionError> {
        let node_type = self.node_type(node_type)?;
        let containment: Vec<&Requirement> = node_type.containment_requirements().collect();
        let [requirement] = containment.as_slice() else {
            return Err(ExecutionError::NotContainedType { node_type: node_type.name.clone(), found: containment.len() });
        };
        let requirement = (*requirement).clone();

        let target = self.static_target(&node_type, &requirement)?;
        let container_instance = self.global_state.instance(container)?;
        if container_instance.type_name() != &target.node_type || !container_instance.node_type().declares_capability(&target.capability) {
            return Err(ExecutionError::ContainerMismatch { node_type: node_type.name.clone(), container: container.clone() });
        }

        self.create_instance(node_type, instance)?;
        self.global_state.add_binding(instance, requirement, container)
    }

    /// Destroys `instance` and every instance it contains, directly or indirectly.
    pub fn scale_in(&mut self, instance: &InstanceId) -> Result<(), ExecutionError> {
        self.global_state.instance(instance)?;

        let mut doomed = vec![instance.clone()];
        while let Some(next) = doomed.pop() {
            if self.global_state.remove_instance(&next).is_none() {
                continue;
            }
            // Contained instances still point at `next` until its bindings are stripped.
            for broken in self.global_state.broken_instances() {
                if !doomed.contains(&broken) {
                    doomed.push(broken);
                }
            }
            self.global_state.remove_all_bindings_both_ways(&next);
            log::debug!("Instance '{}' destroyed.", next);
        }
        Ok(())
    }

    /// Moves `instance` into the transient state of the transition leaving its current
    /// state with `operation`.
    pub fn op_start(&mut self, instance: &InstanceId, operation: &OperationId) -> Result<(), ExecutionError> {
        let node = self.global_state.instance(instance)?;
        let transition = node
            .node_type()
            .protocol
            .transition_from(node.current_state(), operation)
            .ok_or_else(|| ExecutionError::OperationNotAvailable {
                instance: instance.clone(),
                operation: operation.clone(),
                state: node.current_state().clone(),
            })?;

        let transient = transition.transient_state();
        log::debug!("Instance '{}' starts '{}' ({}).", instance, operation, transition);
        self.global_state.set_state(instance, transient)?;
        self.refresh_bindings(instance)
    }

    /// Completes `operation`, moving `instance` into the transition's end state.
    ///
    /// Fails with the recoverable [`ExecutionError::BlockedByFaults`] while the transient
    /// state has pending faults; the instance then stays where it is.
    pub fn op_end(&mut self, instance: &InstanceId, operation: &OperationId) -> Result<(), ExecutionError> {
        let node = self.global_state.instance(instance)?;
        let transition = node
            .node_type()
            .protocol
            .transition_through(node.current_state(), operation)
            .ok_or_else(|| ExecutionError::OperationNotAvailable {
                instance: instance.clone(),
                operation: operation.clone(),
                state: node.current_state().clone(),
            })?;
        let end = transition.end.clone();

        let faults = self.global_state.pending_faults(instance)?;
        if !faults.is_empty() {
            log::debug!("Operation '{}' of '{}' is blocked by {} pending fault(s).", operation, instance, faults.len());
            return Err(ExecutionError::BlockedByFaults {
                instance: instance.clone(),
                operation: operation.clone(),
                requirements: faults.into_iter().map(|fault| fault.requirement.name).collect(),
            });
        }

        log::debug!("Instance '{}' completes '{}' and reaches '{}'.", instance, operation, end);
        self.global_state.set_state(instance, end)?;
        self.refresh_bindings(instance)
    }

    /// Handles a pending, non-resolvable fault by moving `instance` into one of the fault
    /// handling states of its current state.
    ///
    /// Candidates are the states that do not need the failed requirement; the one with the
    /// most needed requirements wins, ties go to the first in state order.
    pub fn fault(&mut self, instance: &InstanceId, requirement: &Requirement) -> Result<StateId, ExecutionError> {
        let fault = Fault::new(instance.clone(), requirement.clone());
        if !self.global_state.is_pending_fault(&fault)? {
            return Err(ExecutionError::NotPendingFault { instance: instance.clone(), requirement: requirement.name.clone() });
        }
        if self.global_state.is_resolvable_fault(&fault)? {
            return Err(ExecutionError::ResolvableFault { instance: instance.clone(), requirement: requirement.name.clone() });
        }

        let node = self.global_state.instance(instance)?;
        let protocol = &node.node_type().protocol;
        let target = node
            .fault_targets()
            .iter()
            .filter(|state| !protocol.rules(state).needs.contains(requirement))
            .fold(None, |best: Option<&StateId>, state| match best {
                Some(best) if protocol.rules(best).needs.len() >= protocol.rules(state).needs.len() => Some(best),
                _ => Some(state),
            })
            .cloned()
            .ok_or_else(|| ExecutionError::UnrecoverableFault {
                instance: instance.clone(),
                requirement: requirement.name.clone(),
                state: node.current_state().clone(),
            })?;

        log::debug!("Fault on '{}' of '{}' handled, moving to '{}'.", requirement, instance, target);
        self.global_state.set_state(instance, target.clone())?;
        self.refresh_bindings(instance)?;
        Ok(target)
    }

    /// Resolves a resolvable fault by binding a server chosen by the binding policy.
    pub fn autoreconnect(&mut self, instance: &InstanceId, requirement: &Requirement) -> Result<InstanceId, ExecutionError> {
        self.ensure_resolvable(instance, requirement)?;
        let candidates = self.global_state.capable_instances(instance, requirement)?;
        let server = self
            .binding_policy
            .select(&candidates)
            .ok_or_else(|| ExecutionError::NotResolvableFault { instance: instance.clone(), requirement: requirement.name.clone() })?;

        self.global_state.add_binding(instance, requirement.clone(), &server)?;
        log::debug!("Fault on '{}' of '{}' reconnected to '{}'.", requirement, instance, server);
        Ok(server)
    }

    /// Resolves a resolvable fault by binding the given capable server.
    pub fn autoreconnect_to(&mut self, instance: &InstanceId, requirement: &Requirement, server: &InstanceId) -> Result<(), ExecutionError> {
        self.ensure_resolvable(instance, requirement)?;
        self.bind(instance, requirement, server)
    }

    /// Handles any pending fault the way the protocol allows: reconnection when resolvable,
    /// fault handling states otherwise.
    pub fn handle_fault(&mut self, fault: &Fault) -> Result<(), ExecutionError> {
        if self.global_state.is_resolvable_fault(fault)? {
            self.autoreconnect(&fault.instance, &fault.requirement).map(|_| ())
        } else {
            self.fault(&fault.instance, &fault.requirement).map(|_| ())
        }
    }

    /// Binds a needed requirement of `instance` to a server able to serve it right now,
    /// replacing the current binding of that requirement.
    pub fn bind(&mut self, instance: &InstanceId, requirement: &Requirement, server: &InstanceId) -> Result<(), ExecutionError> {
        if !self.global_state.capable_instances(instance, requirement)?.contains(server) {
            return Err(ExecutionError::IncapableServer {
                instance: instance.clone(),
                requirement: requirement.name.clone(),
                server: server.clone(),
            });
        }
        self.global_state.add_binding(instance, requirement.clone(), server)
    }

    /// Adds an instance from a global state snapshot, in any state its protocol knows.
    pub fn restore_instance(&mut self, instance: &InstanceId, node_type: &NodeTypeId, state: &StateId) -> Result<(), ExecutionError> {
        Self::check_identifier(instance)?;
        if self.global_state.contains(instance) {
            return Err(ExecutionError::DuplicateInstance(instance.clone()));
        }
        let node_type = self.node_type(node_type)?;
        if !node_type.protocol.knows_state(state) {
            return Err(ExecutionError::IllegalIdentifier(state.to_string()));
        }
        self.global_state.insert_instance(NodeInstance::in_state(instance.clone(), node_type, state.clone()));
        Ok(())
    }

    /// Adds a runtime binding from a global state snapshot. The binding may be stale, and a
    /// containment binding may name a container that is gone, which leaves the requester
    /// broken.
    pub fn restore_binding(&mut self, requester: &InstanceId, requirement: &RequirementId, server: &InstanceId) -> Result<(), ExecutionError> {
        let node = self.global_state.instance(requester)?;
        let requirement = node
            .node_type()
            .requirement(requirement)
            .cloned()
            .ok_or_else(|| ExecutionError::IllegalIdentifier(requirement.to_string()))?;
        if requirement.is_containment() {
            Self::check_identifier(server)?;
            return self.global_state.add_dangling_containment(requester, requirement, server);
        }
        self.global_state.add_binding(requester, requirement, server)
    }

    fn check_identifier(instance: &InstanceId) -> Result<(), ExecutionError> {
        if instance.is_well_formed() {
            Ok(())
        } else {
            Err(ExecutionError::IllegalIdentifier(instance.to_string()))
        }
    }

    fn static_target(&self, node_type: &NodeType, requirement: &Requirement) -> Result<BindingTarget, ExecutionError> {
        self.static_bindings.target(&node_type.name, &requirement.name).cloned().ok_or_else(|| ExecutionError::MissingStaticBinding {
            node_type: node_type.name.clone(),
            requirement: requirement.name.clone(),
        })
    }

    fn ensure_resolvable(&self, instance: &InstanceId, requirement: &Requirement) -> Result<(), ExecutionError> {
        let fault = Fault::new(instance.clone(), requirement.clone());
        if self.global_state.is_pending_fault(&fault)? && self.global_state.is_resolvable_fault(&fault)? {
            Ok(())
        } else {
            Err(ExecutionError::NotResolvableFault { instance: instance.clone(), requirement: requirement.name.clone() })
        }
    }

    fn create_instance(&mut self, node_type: Arc<NodeType>, instance: &InstanceId) -> Result<(), ExecutionError> {
        Self::check_identifier(instance)?;
        if self.global_state.contains(instance) {
            return Err(ExecutionError::DuplicateInstance(instance.clone()));
        }

        log::debug!("Scaling out '{}' of node type '{}'.", instance, node_type.name);
        self.global_state.insert_instance(NodeInstance::new(instance.clone(), node_type));
        self.bind_missing(instance)
    }

    /// Drops bindings the current state no longer needs and binds newly needed requirements.
    /// Containment bindings are kept for the whole life of the instance.
    fn refresh_bindings(&mut self, instance: &InstanceId) -> Result<(), ExecutionError> {
        let needed = self.global_state.needed_reqs(instance)?;
        let unneeded: Vec<Requirement> = self
            .global_state
            .bindings_of(instance)?
            .iter()
            .map(|binding| &binding.requirement)
            .filter(|requirement| !requirement.is_containment() && !needed.contains(*requirement))
            .cloned()
            .collect();

        for requirement in &unneeded {
            self.global_state.remove_binding(instance, requirement)?;
        }
        self.bind_missing(instance)
    }

    /// Best effort: requirements without capable server stay pending faults.
    fn bind_missing(&mut self, instance: &InstanceId) -> Result<(), ExecutionError> {
        let satisfied = self.global_state.satisfied_reqs(instance)?;
        let missing: Vec<Requirement> = self
            .global_state
            .needed_reqs(instance)?
            .into_iter()
            .filter(|requirement| !requirement.is_containment() && !satisfied.contains(requirement))
            .collect();

        for requirement in missing {
            let candidates = self.global_state.capable_instances(instance, &requirement)?;
            match self.binding_policy.select(&candidates) {
                Some(server) => self.global_state.add_binding(instance, requirement, &server)?,
                None => log::debug!("No capable server for requirement '{}' of '{}'.", requirement, instance),
            }
        }
        Ok(())
    }
}
