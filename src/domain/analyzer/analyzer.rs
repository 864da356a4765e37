use std::ops::ControlFlow;

use crate::domain::analyzer::budget::{BudgetExhausted, Meter, SearchBudget};
use crate::domain::analyzer::report::{AnalysisReport, Check, FailureReport, Verdict};
use crate::domain::analyzer::search::{Quantifier, SequenceSearch};
use crate::domain::application::application::Application;
use crate::domain::plan::action::Action;
use crate::domain::plan::plan::Plan;

/// Target of the statistics event emitted once per analysis.
pub const ANALYSIS_TARGET: &str = "analysis";

/// Decides validity, weak validity and non-validity of action sequences and plans.
///
/// The analyzed application is never modified; every branch of the search runs on a
/// clone of it. An analysis that exceeds the [`SearchBudget`] ends with
/// [`Verdict::Inconclusive`].
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    budget: SearchBudget,
}

struct Decision {
    holds: bool,
    failure: Option<FailureReport>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: SearchBudget) -> Self {
        Analyzer { budget }
    }

    pub fn is_valid_sequence(&self, app: &Application, sequence: &[Action]) -> AnalysisReport {
        self.check_sequence(app, sequence, Check::Valid)
    }

    pub fn is_weakly_valid_sequence(&self, app: &Application, sequence: &[Action]) -> AnalysisReport {
        self.check_sequence(app, sequence, Check::WeaklyValid)
    }

    pub fn is_not_valid_sequence(&self, app: &Application, sequence: &[Action]) -> AnalysisReport {
        self.check_sequence(app, sequence, Check::NotValid)
    }

    pub fn is_valid_plan(&self, app: &Application, plan: &Plan) -> AnalysisReport {
        self.check_plan(app, plan, Check::Valid)
    }

    pub fn is_weakly_valid_plan(&self, app: &Application, plan: &Plan) -> AnalysisReport {
        self.check_plan(app, plan, Check::WeaklyValid)
    }

    pub fn is_not_valid_plan(&self, app: &Application, plan: &Plan) -> AnalysisReport {
        self.check_plan(app, plan, Check::NotValid)
    }

    pub fn check_sequence(&self, app: &Application, sequence: &[Action], check: Check) -> AnalysisReport {
        log::info!("Checking whether a sequence of {} actions is {} for '{}'.", sequence.len(), check, app.name());
        let mut meter = Meter::new(self.budget);
        meter.count_linearization();

        let decision = Self::search(app, sequence, Self::quantifier(check), &mut meter);
        Self::report(app, check, decision, &meter)
    }

    /// Checks every linearization of the plan: valid iff all of them are valid, weakly
    /// valid iff one of them is weakly valid.
    pub fn check_plan(&self, app: &Application, plan: &Plan, check: Check) -> AnalysisReport {
        log::info!(
            "Checking whether a plan of {} actions and {} constraints is {} for '{}'.",
            plan.len(),
            plan.constraints().len(),
            check,
            app.name()
        );
        let quantifier = Self::quantifier(check);
        let mut meter = Meter::new(self.budget);
        let mut failure = None;

        let flow = plan.for_each_linearization(|sequence| {
            meter.count_linearization();
            match Self::search(app, sequence, quantifier, &mut meter) {
                Ok(decision) => {
                    if failure.is_none() {
                        failure = decision.failure;
                    }
                    if quantifier.decides(decision.holds) {
                        ControlFlow::Break(Ok(decision.holds))
                    } else {
                        ControlFlow::Continue(())
                    }
                }
                Err(exhausted) => ControlFlow::Break(Err(exhausted)),
            }
        });

        let decision = match flow {
            ControlFlow::Break(Ok(holds)) => Ok(Decision { holds, failure }),
            ControlFlow::Break(Err(exhausted)) => Err(exhausted),
            ControlFlow::Continue(()) => Ok(Decision { holds: quantifier.neutral(), failure }),
        };
        Self::report(app, check, decision, &meter)
    }

    /// Valid needs every branch; weakly valid and its negation need one.
    fn quantifier(check: Check) -> Quantifier {
        match check {
            Check::Valid => Quantifier::All,
            Check::WeaklyValid | Check::NotValid => Quantifier::Any,
        }
    }

    fn search(app: &Application, sequence: &[Action], quantifier: Quantifier, meter: &mut Meter) -> Result<Decision, BudgetExhausted> {
        let outcome = SequenceSearch::new(sequence, quantifier, meter).run(app)?;
        Ok(Decision { holds: outcome.holds, failure: outcome.failure })
    }

    fn report(app: &Application, check: Check, decision: Result<Decision, BudgetExhausted>, meter: &Meter) -> AnalysisReport {
        let (verdict, failure) = match decision {
            Ok(Decision { holds, failure }) => {
                let verdict = Verdict::from_bool(holds);
                match check {
                    Check::Valid | Check::WeaklyValid => (verdict, if holds { None } else { failure }),
                    Check::NotValid => (verdict.negate(), if holds { None } else { failure }),
                }
            }
            Err(BudgetExhausted) => {
                log::warn!("Search budget exhausted after {} explored branches.", meter.explored());
                (Verdict::Inconclusive, None)
            }
        };

        tracing::info!(
            target: ANALYSIS_TARGET,
            application = %app.name(),
            check = %check,
            verdict = ?verdict,
            explored = meter.explored(),
            linearizations = meter.linearizations(),
            elapsed_ms = meter.elapsed().as_millis() as u64,
            "analysis finished"
        );

        AnalysisReport {
            application: app.name().clone(),
            check,
            verdict,
            failure,
            explored_branches: meter.explored(),
            linearizations: meter.linearizations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analyzer::report::Step;
    use crate::domain::application::binding_policy::BindingPolicy;
    use crate::domain::test_fixtures::{application, id};
    use crate::error::ExecutionError;

    #[test]
    fn empty_sequence_is_valid_in_every_sense() {
        let app = application(BindingPolicy::Greedy);
        let analyzer = Analyzer::new();

        assert!(analyzer.is_valid_sequence(&app, &[]).holds());
        assert!(analyzer.is_weakly_valid_sequence(&app, &[]).holds());
        assert!(!analyzer.is_not_valid_sequence(&app, &[]).holds());
    }

    #[test]
    fn illegal_action_invalidates_with_trace() {
        let app = application(BindingPolicy::Greedy);
        let sequence = [Action::scale_out("database", "d1"), Action::op_start("d1", "explode")];

        let report = Analyzer::new().is_valid_sequence(&app, &sequence);
        assert_eq!(report.verdict, Verdict::DoesNotHold);

        let failure = report.failure.unwrap();
        assert_eq!(failure.failed_step, Step::Perform { action: sequence[1].clone() });
        assert_eq!(failure.prefix, vec![Step::Perform { action: sequence[0].clone() }]);
        assert!(matches!(failure.cause, ExecutionError::OperationNotAvailable { .. }));
    }

    #[test]
    fn analysis_leaves_the_application_untouched() {
        let app = application(BindingPolicy::Greedy);
        let before = app.global_state().clone();

        Analyzer::new().is_valid_sequence(&app, &[Action::scale_out("database", "d1")]);
        assert_eq!(app.global_state(), &before);
        assert!(!app.global_state().contains(&id("d1")));
    }

    #[test]
    fn blocked_op_end_keeps_the_branch_alive() {
        let app = application(BindingPolicy::Greedy);
        let sequence = [Action::scale_out("frontend", "f1"), Action::op_start("f1", "start"), Action::op_end("f1", "start")];
        let analyzer = Analyzer::new();

        assert!(analyzer.is_weakly_valid_sequence(&app, &sequence).holds());

        // Handling the fault first leaves `f1` stopped, where `start` cannot end.
        let report = analyzer.is_valid_sequence(&app, &sequence);
        assert_eq!(report.verdict, Verdict::DoesNotHold);
        let failure = report.failure.unwrap();
        assert!(matches!(failure.cause, ExecutionError::OperationNotAvailable { .. }));
        assert!(failure.prefix.iter().any(|step| matches!(step, Step::Recover { .. })));
    }

    #[test]
    fn unrecoverable_faults_invalidate() {
        let mut app = application(BindingPolicy::Greedy);
        app.scale_out(&"legacy".into(), &id("l1")).unwrap();

        let report = Analyzer::new().is_valid_sequence(&app, &[Action::scale_out("vm", "v1")]);
        assert_eq!(report.verdict, Verdict::DoesNotHold);
        assert!(matches!(report.failure.unwrap().cause, ExecutionError::UnrecoverableFault { .. }));
    }

    #[test]
    fn exhausted_budget_is_inconclusive() {
        let app = application(BindingPolicy::Greedy);
        let sequence = [Action::scale_out("database", "d1"), Action::scale_out("monitor", "m1"), Action::scale_in("d1")];

        let analyzer = Analyzer::with_budget(SearchBudget::unlimited().with_max_branches(2));
        let report = analyzer.is_valid_sequence(&app, &sequence);

        assert!(report.is_inconclusive());
        assert!(report.failure.is_none());
        assert!(!analyzer.is_not_valid_sequence(&app, &sequence).holds());
    }
}
