use std::collections::{BTreeSet, HashSet};

use crate::domain::analyzer::budget::{BudgetExhausted, Meter};
use crate::domain::analyzer::report::{FailureReport, Step};
use crate::domain::application::application::Application;
use crate::domain::global_state::fault::Fault;
use crate::domain::global_state::global_state::GlobalState;
use crate::domain::plan::action::Action;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::InstanceId;
use crate::error::ExecutionError;

/// How the outcomes of sibling branches are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantifier {
    /// Every branch must succeed.
    All,

    /// One succeeding branch is enough.
    Any,
}

impl Quantifier {
    /// Outcome of a node whose branches are all skipped.
    pub fn neutral(self) -> bool {
        matches!(self, Quantifier::All)
    }

    /// Whether one branch outcome already fixes the outcome of its parent.
    pub fn decides(self, holds: bool) -> bool {
        holds != self.neutral()
    }
}

/// A way of handling the faults of a state, applied to a clone of it.
enum Remedy {
    Destroy(InstanceId),
    Reconnect(Fault, InstanceId),
    Recover(Fault),
}

pub(crate) struct SearchOutcome {
    pub holds: bool,
    pub failure: Option<FailureReport>,
}

/// Depth-first exploration of one action sequence.
///
/// Each branch works on its own clone of the application. Points already explored at
/// the same position of the sequence (or still open on the current path) are skipped
/// and count as the quantifier's neutral outcome: an earlier visit either decided the
/// whole search already or produced that very outcome. This also cuts cycles of fault
/// handling states.
pub(crate) struct SequenceSearch<'a> {
    sequence: &'a [Action],
    quantifier: Quantifier,
    meter: &'a mut Meter,
    explored: HashSet<(usize, GlobalState)>,
    trace: Vec<Step>,
    failure: Option<FailureReport>,
}

impl<'a> SequenceSearch<'a> {
    pub fn new(sequence: &'a [Action], quantifier: Quantifier, meter: &'a mut Meter) -> Self {
        SequenceSearch { sequence, quantifier, meter, explored: HashSet::new(), trace: Vec::new(), failure: None }
    }

    pub fn run(mut self, app: &Application) -> Result<SearchOutcome, BudgetExhausted> {
        let holds = self.perform_next(app, 0)?;
        Ok(SearchOutcome { holds, failure: self.failure })
    }

    /// Applies the action at `position` to a clone of `app` and explores what follows.
    fn perform_next(&mut self, app: &Application, position: usize) -> Result<bool, BudgetExhausted> {
        self.meter.tick()?;
        let Some(action) = self.sequence.get(position) else {
            return Ok(true);
        };

        let satisfied_before = Self::satisfied_of_subject(app, action);
        let mut next = app.clone();
        if let Err(error) = next.perform(action) {
            if !error.is_recoverable() {
                self.fail(Step::Perform { action: action.clone() }, error);
                return Ok(false);
            }
            log::debug!("Recoverable failure at '{}': {}", action, error);
        }

        self.trace.push(Step::Perform { action: action.clone() });
        let holds = self.explore_binding_choices(next, action, &satisfied_before, position + 1);
        self.trace.pop();
        holds
    }

    /// Branches over every combination of servers for the requirements the action just
    /// bound, when the binding policy could have chosen differently.
    fn explore_binding_choices(
        &mut self,
        app: Application,
        action: &Action,
        satisfied_before: &BTreeSet<Requirement>,
        position: usize,
    ) -> Result<bool, BudgetExhausted> {
        let choices = if app.binding_policy().is_deterministic() {
            Vec::new()
        } else {
            Self::binding_choices(&app, action, satisfied_before)
        };
        if choices.iter().all(|(_, servers)| servers.len() <= 1) {
            return self.handle_faults(app, position);
        }

        let subject = action.subject();
        let candidate_lists: Vec<Vec<InstanceId>> = choices.iter().map(|(_, servers)| servers.clone()).collect();
        for combination in combinations(&candidate_lists) {
            let mut branch = app.clone();
            let mut steps = Vec::with_capacity(combination.len());
            let mut failed = None;

            for ((requirement, _), server) in choices.iter().zip(combination) {
                let step = Step::Bind { instance: subject.clone(), requirement: requirement.clone(), server: server.clone() };
                if let Err(error) = branch.bind(subject, requirement, &server) {
                    failed = Some((step, error));
                    break;
                }
                steps.push(step);
            }

            let depth = self.trace.len();
            self.trace.extend(steps);
            let holds = match failed {
                Some((step, error)) => {
                    self.fail(step, error);
                    false
                }
                None => self.handle_faults(branch, position)?,
            };
            self.trace.truncate(depth);

            if self.quantifier.decides(holds) {
                return Ok(holds);
            }
        }
        Ok(self.quantifier.neutral())
    }

    /// Branches over every way of handling the current faults, including leaving them
    /// alone and moving on to the next action.
    fn handle_faults(&mut self, app: Application, position: usize) -> Result<bool, BudgetExhausted> {
        self.meter.tick()?;
        if !self.explored.insert((position, app.global_state().clone())) {
            return Ok(self.quantifier.neutral());
        }

        for remedy in self.remedies(&app) {
            let mut branch = app.clone();
            let (step, applied) = match remedy {
                Remedy::Destroy(instance) => {
                    let applied = branch.scale_in(&instance);
                    (Step::Destroy { instance }, applied)
                }
                Remedy::Reconnect(fault, server) => {
                    let applied = branch.autoreconnect_to(&fault.instance, &fault.requirement, &server);
                    (Step::Reconnect { instance: fault.instance, requirement: fault.requirement, server }, applied)
                }
                Remedy::Recover(fault) => {
                    let applied = branch.fault(&fault.instance, &fault.requirement).map(|state| {
                        log::debug!("'{}' recovers from '{}' in state '{}'.", fault.instance, fault.requirement, state);
                    });
                    (Step::Recover { instance: fault.instance, requirement: fault.requirement }, applied)
                }
            };

            let holds = match applied {
                Ok(()) => {
                    self.trace.push(step);
                    let holds = self.handle_faults(branch, position);
                    self.trace.pop();
                    holds?
                }
                Err(error) => {
                    self.fail(step, error);
                    false
                }
            };
            if self.quantifier.decides(holds) {
                return Ok(holds);
            }
        }

        self.perform_next(&app, position)
    }

    /// Broken instances first, then every pending fault: one branch per capable server
    /// for resolvable faults (just the policy's pick when it is deterministic), one
    /// fault handling branch otherwise.
    fn remedies(&self, app: &Application) -> Vec<Remedy> {
        let state = app.global_state();
        let mut remedies: Vec<Remedy> = state.broken_instances().into_iter().map(Remedy::Destroy).collect();

        for fault in state.pending_faults_all() {
            if state.is_resolvable_fault(&fault).unwrap_or(false) {
                let candidates = state.capable_instances(&fault.instance, &fault.requirement).unwrap_or_default();
                let servers = if app.binding_policy().is_deterministic() {
                    app.binding_policy().select(&candidates).into_iter().collect()
                } else {
                    candidates
                };
                remedies.extend(servers.into_iter().map(|server| Remedy::Reconnect(fault.clone(), server)));
            } else {
                remedies.push(Remedy::Recover(fault));
            }
        }
        remedies
    }

    /// Requirements of the action's subject that became satisfied through the action,
    /// each with all servers that could have been picked for it.
    fn binding_choices(app: &Application, action: &Action, satisfied_before: &BTreeSet<Requirement>) -> Vec<(Requirement, Vec<InstanceId>)> {
        let subject = action.subject();
        let state = app.global_state();
        if !action.binds_subject() || !state.contains(subject) {
            return Vec::new();
        }

        state
            .satisfied_reqs(subject)
            .unwrap_or_default()
            .into_iter()
            .filter(|requirement| !requirement.is_containment() && !satisfied_before.contains(requirement))
            .map(|requirement| {
                let servers = state.capable_instances(subject, &requirement).unwrap_or_default();
                (requirement, servers)
            })
            .collect()
    }

    fn satisfied_of_subject(app: &Application, action: &Action) -> BTreeSet<Requirement> {
        app.global_state().satisfied_reqs(action.subject()).unwrap_or_default()
    }

    /// Keeps the first failure; later ones are alternatives of an already failed search
    /// or of a search that may still succeed.
    fn fail(&mut self, failed_step: Step, cause: ExecutionError) {
        log::debug!("Branch fails at '{}': {}", failed_step, cause);
        if self.failure.is_none() {
            self.failure = Some(FailureReport { sequence: self.sequence.to_vec(), prefix: self.trace.clone(), failed_step, cause });
        }
    }
}

/// Cartesian product of the candidate lists, built recursively one list at a time.
pub(crate) fn combinations<T: Clone>(lists: &[Vec<T>]) -> Vec<Vec<T>> {
    let Some((first, rest)) = lists.split_first() else {
        return vec![Vec::new()];
    };

    let tails = combinations(rest);
    let mut all = Vec::with_capacity(first.len() * tails.len());
    for head in first {
        for tail in &tails {
            let mut combination = Vec::with_capacity(tail.len() + 1);
            combination.push(head.clone());
            combination.extend(tail.iter().cloned());
            all.push(combination);
        }
    }
    all
}
