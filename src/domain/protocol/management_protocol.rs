use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::{CapabilityId, OperationId, StateId};
use crate::error::ConversionError;

static NO_RULES: StateRules = StateRules { needs: BTreeSet::new(), offers: BTreeSet::new(), fault_targets: BTreeSet::new() };

/// The three state-indexed maps of a protocol, evaluated for one (stable or transient) state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRules {
    /// Requirements that must be satisfied while the state is occupied (rho).
    pub needs: BTreeSet<Requirement>,

    /// Capabilities offered while the state is occupied (gamma).
    pub offers: BTreeSet<CapabilityId>,

    /// States the instance may fall back to when a needed requirement fails (phi).
    pub fault_targets: BTreeSet<StateId>,
}

impl StateRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs<I>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = Requirement>,
    {
        self.needs.extend(requirements);
        self
    }

    pub fn offers<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.offers.extend(capabilities.into_iter().map(CapabilityId::new));
        self
    }

    pub fn fault_targets<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fault_targets.extend(states.into_iter().map(StateId::new));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Transition {
    pub start: StateId,
    pub operation: OperationId,
    pub end: StateId,
}

impl Transition {
    pub fn new(start: impl Into<String>, operation: impl Into<String>, end: impl Into<String>) -> Self {
        Transition { start: StateId::new(start), operation: OperationId::new(operation), end: StateId::new(end) }
    }

    /// The state occupied while the operation is running: start, operation and end concatenated.
    pub fn transient_state(&self) -> StateId {
        StateId::new(format!("{}{}{}", self.start, self.operation, self.end))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -{}-> {}", self.start, self.operation, self.end)
    }
}

/// Immutable management protocol of a node type.
#[derive(Debug, Clone)]
pub struct ManagementProtocol {
    initial_state: StateId,
    states: BTreeSet<StateId>,
    transitions: Vec<Transition>,

    /// Keyed by stable states and by the transient state of every transition.
    rules: HashMap<StateId, StateRules>,
}

impl ManagementProtocol {
    pub fn builder(initial_state: impl Into<String>) -> ProtocolBuilder {
        ProtocolBuilder {
            initial_state: StateId::new(initial_state),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn initial_state(&self) -> &StateId {
        &self.initial_state
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Rules of a stable or transient state; unknown states need and offer nothing.
    pub fn rules(&self, state: &StateId) -> &StateRules {
        self.rules.get(state).unwrap_or(&NO_RULES)
    }

    /// True for stable states and for transient states of the protocol's transitions.
    pub fn knows_state(&self, state: &StateId) -> bool {
        self.rules.contains_key(state)
    }

    /// Transition leaving the stable `state` with `operation`.
    pub fn transition_from(&self, state: &StateId, operation: &OperationId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.start == state && &t.operation == operation)
    }

    /// Transition whose transient state is `state` and whose operation is `operation`.
    pub fn transition_through(&self, state: &StateId, operation: &OperationId) -> Option<&Transition> {
        self.transitions.iter().find(|t| &t.operation == operation && &t.transient_state() == state)
    }

    /// All requirements mentioned anywhere in the protocol.
    pub fn mentioned_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.rules.values().flat_map(|rules| rules.needs.iter())
    }

    pub fn mentioned_capabilities(&self) -> impl Iterator<Item = &CapabilityId> {
        self.rules.values().flat_map(|rules| rules.offers.iter())
    }
}

pub struct ProtocolBuilder {
    initial_state: StateId,
    states: Vec<(StateId, StateRules)>,
    transitions: Vec<(Transition, StateRules)>,
}

impl ProtocolBuilder {
    pub fn state(mut self, state: impl Into<String>, rules: StateRules) -> Self {
        self.states.push((StateId::new(state), rules));
        self
    }

    pub fn transition(mut self, start: impl Into<String>, operation: impl Into<String>, end: impl Into<String>, rules: StateRules) -> Self {
        self.transitions.push((Transition::new(start, operation, end), rules));
        self
    }

    /// Validates the collected states and transitions.
    ///
    /// Fails on duplicate or malformed states, on transitions between unknown states,
    /// on two transitions sharing start state and operation, on transient states that
    /// collide with other states and on fault targets that are not stable states.
    pub fn build(self) -> Result<ManagementProtocol, ConversionError> {
        let mut states = BTreeSet::new();
        let mut rules = HashMap::new();

        for (state, state_rules) in self.states {
            if !state.is_well_formed() {
                return Err(ConversionError::IllegalIdentifier(state.into()));
            }
            if !states.insert(state.clone()) {
                return Err(ConversionError::DuplicateState(state.into()));
            }
            rules.insert(state, state_rules);
        }

        if !states.contains(&self.initial_state) {
            return Err(ConversionError::UnknownState(self.initial_state.into()));
        }

        let mut transitions: Vec<Transition> = Vec::with_capacity(self.transitions.len());
        for (transition, state_rules) in self.transitions {
            if !transition.operation.is_well_formed() {
                return Err(ConversionError::IllegalIdentifier(transition.operation.into()));
            }
            for endpoint in [&transition.start, &transition.end] {
                if !states.contains(endpoint) {
                    return Err(ConversionError::UnknownState(endpoint.to_string()));
                }
            }
            if transitions.iter().any(|t| t.start == transition.start && t.operation == transition.operation) {
                return Err(ConversionError::AmbiguousTransition {
                    state: transition.start.into(),
                    operation: transition.operation.into(),
                });
            }

            let transient = transition.transient_state();
            if rules.contains_key(&transient) {
                return Err(ConversionError::DuplicateState(transient.into()));
            }
            rules.insert(transient, state_rules);
            transitions.push(transition);
        }

        for state_rules in rules.values() {
            if let Some(target) = state_rules.fault_targets.iter().find(|target| !states.contains(*target)) {
                return Err(ConversionError::UnknownState(target.to_string()));
            }
        }

        Ok(ManagementProtocol { initial_state: self.initial_state, states, transitions, rules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web_server_protocol() -> ManagementProtocol {
        let db = Requirement::replica_unaware("db");
        ManagementProtocol::builder("stopped")
            .state("stopped", StateRules::new())
            .state("running", StateRules::new().needs([db.clone()]).offers(["http"]).fault_targets(["stopped"]))
            .transition("stopped", "start", "running", StateRules::new().needs([db]).fault_targets(["stopped"]))
            .transition("running", "stop", "stopped", StateRules::new())
            .build()
            .unwrap()
    }

    #[test]
    fn transient_state_behaves_like_a_state() {
        let protocol = web_server_protocol();
        let transient = Transition::new("stopped", "start", "running").transient_state();

        assert_eq!(transient.as_str(), "stoppedstartrunning");
        assert!(protocol.knows_state(&transient));
        assert!(protocol.transition_through(&transient, &OperationId::new("start")).is_some());
        assert!(protocol.transition_through(&StateId::new("running"), &OperationId::new("start")).is_none());
        assert_eq!(protocol.rules(&transient).needs.len(), 1);
        assert!(protocol.rules(&transient).offers.is_empty());
    }

    #[test]
    fn transitions_are_found_from_stable_and_transient_states() {
        let protocol = web_server_protocol();
        let start = OperationId::new("start");

        let transition = protocol.transition_from(&StateId::new("stopped"), &start).unwrap();
        assert_eq!(transition.end, StateId::new("running"));
        assert!(protocol.transition_from(&StateId::new("running"), &start).is_none());

        let transient = transition.transient_state();
        assert!(protocol.transition_through(&transient, &start).is_some());
        assert!(protocol.transition_through(&transient, &OperationId::new("stop")).is_none());
    }

    #[test]
    fn unknown_states_have_empty_rules() {
        let protocol = web_server_protocol();
        let rules = protocol.rules(&StateId::new("nowhere"));
        assert!(rules.needs.is_empty() && rules.offers.is_empty() && rules.fault_targets.is_empty());
    }

    #[test]
    fn ambiguous_transitions_are_rejected() {
        let result = ManagementProtocol::builder("a")
            .state("a", StateRules::new())
            .state("b", StateRules::new())
            .state("c", StateRules::new())
            .transition("a", "go", "b", StateRules::new())
            .transition("a", "go", "c", StateRules::new())
            .build();

        assert!(matches!(result, Err(ConversionError::AmbiguousTransition { .. })));
    }

    #[test]
    fn fault_targets_must_be_stable_states() {
        let result = ManagementProtocol::builder("a")
            .state("a", StateRules::new().fault_targets(["ghost"]))
            .build();

        assert!(matches!(result, Err(ConversionError::UnknownState(state)) if state == "ghost"));
    }

    #[test]
    fn colliding_transient_state_is_rejected() {
        let result = ManagementProtocol::builder("a")
            .state("a", StateRules::new())
            .state("b", StateRules::new())
            .state("agob", StateRules::new())
            .transition("a", "go", "b", StateRules::new())
            .build();

        assert!(matches!(result, Err(ConversionError::DuplicateState(state)) if state == "agob"));
    }
}
