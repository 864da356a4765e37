use crate::api::plan_dto::{ActionBodyDto, PlanDto};
use crate::domain::plan::action::Action;
use crate::domain::plan::plan::{Constraint, Plan};
use crate::domain::utils::id::ActionId;
use crate::error::Error;

fn map_action(dto_body: ActionBodyDto) -> Action {
    match dto_body {
        ActionBodyDto::ScaleOut { node_type, instance } => Action::scale_out(node_type, instance),
        ActionBodyDto::ScaleOutContained { node_type, instance, container } => Action::scale_out_contained(node_type, instance, container),
        ActionBodyDto::ScaleIn { instance } => Action::scale_in(instance),
        ActionBodyDto::OpStart { instance, operation } => Action::op_start(instance, operation),
        ActionBodyDto::OpEnd { instance, operation } => Action::op_end(instance, operation),
    }
}

impl TryFrom<PlanDto> for Plan {
    type Error = Error;

    fn try_from(dto: PlanDto) -> Result<Self, Self::Error> {
        let actions: Vec<(ActionId, Action)> = dto
            .actions
            .into_iter()
            .enumerate()
            .map(|(position, action)| {
                let id = action.id.unwrap_or_else(|| (position + 1).to_string());
                (ActionId::new(id), map_action(action.body))
            })
            .collect();

        let mut constraints = Vec::new();
        if dto.sequence {
            constraints.extend(actions.windows(2).map(|pair| Constraint { before: pair[0].0.clone(), after: pair[1].0.clone() }));
        }
        constraints.extend(dto.constraints.into_iter().map(|c| Constraint::new(c.before, c.after)));

        let plan = Plan::new(actions, constraints)?;
        log::info!("Plan loaded with {} actions and {} constraints.", plan.len(), plan.constraints().len());
        Ok(plan)
    }
}
