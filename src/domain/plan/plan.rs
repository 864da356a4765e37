use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;

use crate::domain::plan::action::Action;
use crate::domain::utils::id::ActionId;
use crate::error::ConversionError;

/// `before` must be performed before `after`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Constraint {
    pub before: ActionId,
    pub after: ActionId,
}

impl Constraint {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Constraint { before: ActionId::new(before), after: ActionId::new(after) }
    }
}

/// A partially ordered management plan.
#[derive(Debug, Clone)]
pub struct Plan {
    actions: Vec<(ActionId, Action)>,
    constraints: Vec<Constraint>,

    /// For each action (by position), the positions of the actions that must follow it.
    successors: Vec<Vec<usize>>,
}

impl Plan {
    /// Builds a plan, rejecting duplicate action ids, constraints over unknown actions and
    /// constraint sets without any linearization.
    pub fn new(actions: Vec<(ActionId, Action)>, constraints: Vec<Constraint>) -> Result<Self, ConversionError> {
        let mut positions: HashMap<ActionId, usize> = HashMap::with_capacity(actions.len());
        for (position, (id, _)) in actions.iter().enumerate() {
            if !id.is_well_formed() {
                return Err(ConversionError::IllegalIdentifier(id.to_string()));
            }
            if positions.insert(id.clone(), position).is_some() {
                return Err(ConversionError::DuplicateAction(id.to_string()));
            }
        }

        let mut successors = vec![Vec::new(); actions.len()];
        for constraint in &constraints {
            let before = positions.get(&constraint.before).ok_or_else(|| ConversionError::UnknownAction(constraint.before.to_string()))?;
            let after = positions.get(&constraint.after).ok_or_else(|| ConversionError::UnknownAction(constraint.after.to_string()))?;
            successors[*before].push(*after);
        }

        let plan = Plan { actions, constraints, successors };
        if !plan.is_acyclic() {
            return Err(ConversionError::CyclicConstraints);
        }
        Ok(plan)
    }

    /// A totally ordered plan; ids are the 1-based positions.
    pub fn from_sequence(sequence: Vec<Action>) -> Self {
        let actions: Vec<(ActionId, Action)> =
            sequence.into_iter().enumerate().map(|(position, action)| (ActionId::new((position + 1).to_string()), action)).collect();
        let successors = (0..actions.len()).map(|position| if position + 1 < actions.len() { vec![position + 1] } else { Vec::new() }).collect();
        let constraints = actions.windows(2).map(|pair| Constraint { before: pair[0].0.clone(), after: pair[1].0.clone() }).collect();

        Plan { actions, constraints, successors }
    }

    pub fn actions(&self) -> impl Iterator<Item = (&ActionId, &Action)> {
        self.actions.iter().map(|(id, action)| (id, action))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Ids of the actions that must follow `id`.
    pub fn successors_of(&self, id: &ActionId) -> Vec<&ActionId> {
        self.actions
            .iter()
            .position(|(candidate, _)| candidate == id)
            .map(|position| self.successors[position].iter().map(|next| &self.actions[*next].0).collect())
            .unwrap_or_default()
    }

    /// Visits every total order of the actions compatible with the constraints.
    ///
    /// Orders are generated directly from the constraint graph, so incompatible
    /// permutations are never built. The visitor can stop the enumeration early.
    pub fn for_each_linearization<B, F>(&self, mut visit: F) -> ControlFlow<B>
    where
        F: FnMut(&[Action]) -> ControlFlow<B>,
    {
        let mut indegree = self.indegrees();
        let mut placed = vec![false; self.actions.len()];
        let mut order = Vec::with_capacity(self.actions.len());
        self.linearize(&mut indegree, &mut placed, &mut order, &mut visit)
    }

    pub fn linearizations(&self) -> Vec<Vec<Action>> {
        let mut all = Vec::new();
        let _ = self.for_each_linearization::<(), _>(|order| {
            all.push(order.to_vec());
            ControlFlow::Continue(())
        });
        all
    }

    fn linearize<B, F>(&self, indegree: &mut [usize], placed: &mut [bool], order: &mut Vec<Action>, visit: &mut F) -> ControlFlow<B>
    where
        F: FnMut(&[Action]) -> ControlFlow<B>,
    {
        if order.len() == self.actions.len() {
            return visit(order);
        }

        for position in 0..self.actions.len() {
            if placed[position] || indegree[position] > 0 {
                continue;
            }

            placed[position] = true;
            for next in &self.successors[position] {
                indegree[*next] -= 1;
            }
            order.push(self.actions[position].1.clone());

            let flow = self.linearize(indegree, placed, order, visit);

            order.pop();
            for next in &self.successors[position] {
                indegree[*next] += 1;
            }
            placed[position] = false;
            flow?;
        }
        ControlFlow::Continue(())
    }

    fn indegrees(&self) -> Vec<usize> {
        let mut indegree = vec![0; self.actions.len()];
        for next in self.successors.iter().flatten() {
            indegree[*next] += 1;
        }
        indegree
    }

    fn is_acyclic(&self) -> bool {
        let mut indegree = self.indegrees();
        let mut ready: VecDeque<usize> = (0..self.actions.len()).filter(|position| indegree[*position] == 0).collect();
        let mut visited = 0;

        while let Some(position) = ready.pop_front() {
            visited += 1;
            for next in &self.successors[position] {
                indegree[*next] -= 1;
                if indegree[*next] == 0 {
                    ready.push_back(*next);
                }
            }
        }
        visited == self.actions.len()
    }
}
