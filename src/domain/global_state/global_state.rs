use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::domain::global_state::binding::RuntimeBinding;
use crate::domain::global_state::fault::Fault;
use crate::domain::global_state::node_instance::NodeInstance;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::protocol::static_binding::{BindingTarget, StaticBindings};
use crate::domain::utils::id::{CapabilityId, InstanceId, StateId};
use crate::error::ExecutionError;

/// Runtime core of an application: the active instances and who is bound to whom.
///
/// Answers binding and fault queries but never decides which server should be picked;
/// that is left to the binding policy of the owning application.
///
/// Every active instance has a (possibly empty) entry in `bindings`, and no binding is
/// held by an instance that is not active. Both maps are ordered so that queries and
/// greedy server selection are deterministic, and so that two states holding the same
/// instances and bindings compare (and hash) equal.
#[derive(Debug, Clone)]
pub struct GlobalState {
    static_bindings: Arc<StaticBindings>,
    active_instances: BTreeMap<InstanceId, NodeInstance>,
    bindings: BTreeMap<InstanceId, BTreeSet<RuntimeBinding>>,
}

impl GlobalState {
    pub fn new(static_bindings: Arc<StaticBindings>) -> Self {
        GlobalState { static_bindings, active_instances: BTreeMap::new(), bindings: BTreeMap::new() }
    }

    pub fn static_bindings(&self) -> &StaticBindings {
        &self.static_bindings
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.active_instances.contains_key(id)
    }

    pub fn instance(&self, id: &InstanceId) -> Result<&NodeInstance, ExecutionError> {
        self.active_instances.get(id).ok_or_else(|| ExecutionError::UnknownInstance(id.clone()))
    }

    pub fn active_instances(&self) -> impl Iterator<Item = &NodeInstance> {
        self.active_instances.values()
    }

    pub fn instance_count(&self) -> usize {
        self.active_instances.len()
    }

    pub fn bindings_of(&self, id: &InstanceId) -> Result<&BTreeSet<RuntimeBinding>, ExecutionError> {
        self.bindings.get(id).ok_or_else(|| ExecutionError::UnknownInstance(id.clone()))
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(BTreeSet::len).sum()
    }

    pub(crate) fn insert_instance(&mut self, instance: NodeInstance) {
        self.bindings.entry(instance.id().clone()).or_default();
        self.active_instances.insert(instance.id().clone(), instance);
    }

    /// Drops the instance from the active set only; its bindings, and bindings other
    /// instances hold towards it, stay until [`GlobalState::remove_all_bindings_both_ways`].
    pub(crate) fn remove_instance(&mut self, id: &InstanceId) -> Option<NodeInstance> {
        self.active_instances.remove(id)
    }

    pub(crate) fn set_state(&mut self, id: &InstanceId, state: StateId) -> Result<(), ExecutionError> {
        let instance = self.active_instances.get_mut(id).ok_or_else(|| ExecutionError::UnknownInstance(id.clone()))?;
        instance.set_state(state);
        Ok(())
    }

    /// Static target of a requirement of the given instance, if the topology defines one.
    pub fn binding_target(&self, instance: &NodeInstance, requirement: &Requirement) -> Option<&BindingTarget> {
        self.static_bindings.target(instance.type_name(), &requirement.name)
    }

    fn serves(server: &NodeInstance, target: &BindingTarget) -> bool {
        server.type_name() == &target.node_type && server.offers(&target.capability)
    }

    pub fn needed_reqs(&self, id: &InstanceId) -> Result<BTreeSet<Requirement>, ExecutionError> {
        Ok(self.instance(id)?.needed_reqs().clone())
    }

    pub fn offered_caps(&self, id: &InstanceId) -> Result<BTreeSet<CapabilityId>, ExecutionError> {
        Ok(self.instance(id)?.offered_caps().clone())
    }

    /// Needed requirements whose binding points to an active server of the statically
    /// designated type that currently offers the designated capability.
    ///
    /// Stale bindings (dead or no longer offering servers) simply do not count.
    pub fn satisfied_reqs(&self, id: &InstanceId) -> Result<BTreeSet<Requirement>, ExecutionError> {
        let instance = self.instance(id)?;
        let needed = instance.needed_reqs();

        let satisfied = self
            .bindings_of(id)?
            .iter()
            .filter(|binding| needed.contains(&binding.requirement))
            .filter(|binding| {
                let server = self.active_instances.get(&binding.server);
                let target = self.binding_target(instance, &binding.requirement);
                matches!((server, target), (Some(server), Some(target)) if Self::serves(server, target))
            })
            .map(|binding| binding.requirement.clone())
            .collect();

        Ok(satisfied)
    }

    /// Needed but unsatisfied requirements of one instance. Containment failures are
    /// reported by [`GlobalState::is_broken_instance`] instead.
    pub fn pending_faults(&self, id: &InstanceId) -> Result<BTreeSet<Fault>, ExecutionError> {
        let satisfied = self.satisfied_reqs(id)?;
        let faults = self
            .instance(id)?
            .needed_reqs()
            .iter()
            .filter(|requirement| !requirement.is_containment() && !satisfied.contains(*requirement))
            .map(|requirement| Fault::new(id.clone(), requirement.clone()))
            .collect();

        Ok(faults)
    }

    pub fn pending_faults_all(&self) -> BTreeSet<Fault> {
        self.active_instances
            .keys()
            .filter_map(|id| self.pending_faults(id).ok())
            .flatten()
            .collect()
    }

    pub fn is_pending_fault(&self, fault: &Fault) -> Result<bool, ExecutionError> {
        Ok(self.pending_faults(&fault.instance)?.contains(fault))
    }

    /// Active instances able to serve `requirement` of `requester` right now, in id order.
    pub fn capable_instances(&self, requester: &InstanceId, requirement: &Requirement) -> Result<Vec<InstanceId>, ExecutionError> {
        let instance = self.instance(requester)?;
        let Some(target) = self.binding_target(instance, requirement) else {
            return Ok(Vec::new());
        };

        Ok(self
            .active_instances
            .values()
            .filter(|server| Self::serves(server, target))
            .map(|server| server.id().clone())
            .collect())
    }

    /// Only replica-unaware faults with at least one capable server can be reconnected.
    pub fn is_resolvable_fault(&self, fault: &Fault) -> Result<bool, ExecutionError> {
        if !fault.requirement.is_replica_unaware() {
            self.instance(&fault.instance)?;
            return Ok(false);
        }
        Ok(!self.capable_instances(&fault.instance, &fault.requirement)?.is_empty())
    }

    /// An instance is broken when its container has disappeared.
    pub fn is_broken_instance(&self, id: &InstanceId) -> Result<bool, ExecutionError> {
        let broken = self
            .bindings_of(id)?
            .iter()
            .any(|binding| binding.requirement.is_containment() && !self.active_instances.contains_key(&binding.server));
        Ok(broken)
    }

    pub fn broken_instances(&self) -> Vec<InstanceId> {
        self.active_instances
            .keys()
            .filter(|id| self.is_broken_instance(id).unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Binds `requirement` of `requester` to `server`, replacing any binding the requester
    /// already holds for the same requirement.
    pub fn add_binding(&mut self, requester: &InstanceId, requirement: Requirement, server: &InstanceId) -> Result<(), ExecutionError> {
        self.instance(requester)?;
        self.instance(server)?;
        let bindings = self.bindings.get_mut(requester).ok_or_else(|| ExecutionError::UnknownInstance(requester.clone()))?;

        bindings.retain(|binding| binding.requirement != requirement);
        log::debug!("Binding requirement '{}' of '{}' to '{}'.", requirement, requester, server);
        bindings.insert(RuntimeBinding::new(requirement, server.clone()));
        Ok(())
    }

    /// Records a containment binding to a container that is no longer active, leaving
    /// `requester` broken. Only snapshots taken after a container vanished hold these.
    pub(crate) fn add_dangling_containment(&mut self, requester: &InstanceId, requirement: Requirement, container: &InstanceId) -> Result<(), ExecutionError> {
        self.instance(requester)?;
        if !requirement.is_containment() || self.contains(container) {
            return self.add_binding(requester, requirement, container);
        }
        let bindings = self.bindings.get_mut(requester).ok_or_else(|| ExecutionError::UnknownInstance(requester.clone()))?;

        bindings.retain(|binding| binding.requirement != requirement);
        log::warn!("Instance '{}' is contained in '{}', which is not active.", requester, container);
        bindings.insert(RuntimeBinding::new(requirement, container.clone()));
        Ok(())
    }

    pub fn remove_binding(&mut self, requester: &InstanceId, requirement: &Requirement) -> Result<(), ExecutionError> {
        let bindings = self.bindings.get_mut(requester).ok_or_else(|| ExecutionError::UnknownInstance(requester.clone()))?;
        bindings.retain(|binding| &binding.requirement != requirement);
        Ok(())
    }

    /// Forgets every binding held by `target` and every binding served by `target`.
    pub fn remove_all_bindings_both_ways(&mut self, target: &InstanceId) {
        self.bindings.remove(target);
        for bindings in self.bindings.values_mut() {
            bindings.retain(|binding| &binding.server != target);
        }
    }
}

// Branch identity ignores the shared static bindings.
impl PartialEq for GlobalState {
    fn eq(&self, other: &Self) -> bool {
        self.active_instances == other.active_instances && self.bindings == other.bindings
    }
}

impl Eq for GlobalState {}

impl Hash for GlobalState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.active_instances.hash(state);
        self.bindings.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::binding_policy::BindingPolicy;
    use crate::domain::test_fixtures::{application, id};

    #[test]
    fn stale_binding_is_unsatisfied_not_an_error() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"database".into(), &id("d1")).unwrap();
        app.scale_out(&"monitor".into(), &id("m1")).unwrap();
        assert_eq!(app.global_state().satisfied_reqs(&id("m1")).unwrap().len(), 1);

        app.op_start(&id("d1"), &"stop".into()).unwrap();

        let state = app.global_state();
        assert_eq!(state.bindings_of(&id("m1")).unwrap().len(), 1);
        assert!(state.satisfied_reqs(&id("m1")).unwrap().is_empty());
        assert_eq!(state.pending_faults(&id("m1")).unwrap().len(), 1);
    }

    #[test]
    fn add_binding_replaces_previous_binding_for_the_same_requirement() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"database".into(), &id("d1")).unwrap();
        app.scale_out(&"database".into(), &id("d2")).unwrap();
        app.scale_out(&"monitor".into(), &id("m1")).unwrap();

        let requirement = Requirement::replica_unaware("db");
        let state = app.global_state_mut();
        state.add_binding(&id("m1"), requirement.clone(), &id("d2")).unwrap();

        let bindings = state.bindings_of(&id("m1")).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings.iter().next().unwrap().server, id("d2"));
    }

    #[test]
    fn add_binding_rejects_unknown_instances() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"monitor".into(), &id("m1")).unwrap();

        let requirement = Requirement::replica_unaware("db");
        let state = app.global_state_mut();
        assert_eq!(state.add_binding(&id("m1"), requirement.clone(), &id("ghost")), Err(ExecutionError::UnknownInstance(id("ghost"))));
        assert_eq!(state.add_binding(&id("ghost"), requirement, &id("m1")), Err(ExecutionError::UnknownInstance(id("ghost"))));
    }

    #[test]
    fn remove_all_bindings_both_ways_strips_requester_and_server_sides() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"database".into(), &id("d1")).unwrap();
        app.scale_out(&"monitor".into(), &id("m1")).unwrap();
        app.scale_out(&"monitor".into(), &id("m2")).unwrap();
        assert_eq!(app.global_state().binding_count(), 2);

        let state = app.global_state_mut();
        state.remove_all_bindings_both_ways(&id("d1"));
        assert_eq!(state.binding_count(), 0);

        state.add_binding(&id("m1"), Requirement::replica_unaware("db"), &id("d1")).unwrap();
        state.remove_all_bindings_both_ways(&id("m1"));
        assert!(state.bindings_of(&id("m1")).is_err());
        assert!(state.bindings_of(&id("m2")).unwrap().is_empty());
    }

    #[test]
    fn replica_aware_faults_are_never_resolvable() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"analytics".into(), &id("a1")).unwrap();
        app.scale_out(&"database".into(), &id("d1")).unwrap();

        let state = app.global_state();
        let faults = state.pending_faults(&id("a1")).unwrap();
        assert_eq!(faults.len(), 1);
        assert!(!state.is_resolvable_fault(faults.iter().next().unwrap()).unwrap());
    }

    #[test]
    fn instance_with_vanished_container_is_broken() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"vm".into(), &id("v1")).unwrap();
        app.scale_out_contained(&"docker".into(), &id("k1"), &id("v1")).unwrap();
        assert!(app.global_state().broken_instances().is_empty());

        let state = app.global_state_mut();
        state.remove_instance(&id("v1"));

        assert!(state.is_broken_instance(&id("k1")).unwrap());
        assert_eq!(state.broken_instances(), vec![id("k1")]);
        // containment is never reported as a pending fault
        assert!(state.pending_faults(&id("k1")).unwrap().is_empty());
    }

    #[test]
    fn equal_runtime_content_means_equal_states() {
        let mut first = application(BindingPolicy::Greedy);
        let mut second = first.clone();
        first.scale_out(&"database".into(), &id("d1")).unwrap();
        first.scale_out(&"monitor".into(), &id("m1")).unwrap();
        second.scale_out(&"database".into(), &id("d1")).unwrap();
        assert_ne!(first.global_state(), second.global_state());

        second.scale_out(&"monitor".into(), &id("m1")).unwrap();
        assert_eq!(first.global_state(), second.global_state());
    }
}
