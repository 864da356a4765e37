use serde::Serialize;
use std::fmt;

use crate::domain::plan::action::Action;
use crate::domain::protocol::requirement::Requirement;
use crate::domain::utils::id::{ApplicationId, InstanceId};
use crate::error::ExecutionError;

/// Which property of a sequence or plan is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Check {
    /// Every resolution of the non-determinism succeeds.
    Valid,

    /// At least one resolution of the non-determinism succeeds.
    WeaklyValid,

    /// No resolution succeeds.
    NotValid,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Valid => write!(f, "valid"),
            Check::WeaklyValid => write!(f, "weakly valid"),
            Check::NotValid => write!(f, "not valid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    Holds,
    DoesNotHold,

    /// The search budget ran out first.
    Inconclusive,
}

impl Verdict {
    pub fn from_bool(holds: bool) -> Self {
        if holds { Verdict::Holds } else { Verdict::DoesNotHold }
    }

    pub fn negate(self) -> Self {
        match self {
            Verdict::Holds => Verdict::DoesNotHold,
            Verdict::DoesNotHold => Verdict::Holds,
            Verdict::Inconclusive => Verdict::Inconclusive,
        }
    }
}

/// One step of an explored branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    /// A plan action.
    Perform { action: Action },

    /// A binding choice left open by a non-deterministic binding policy.
    Bind { instance: InstanceId, requirement: Requirement, server: InstanceId },

    /// A resolvable fault reconnected to `server`.
    Reconnect { instance: InstanceId, requirement: Requirement, server: InstanceId },

    /// A fault handled through the protocol's fault handling states.
    Recover { instance: InstanceId, requirement: Requirement },

    /// A broken instance destroyed together with its contents.
    Destroy { instance: InstanceId },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Perform { action } => write!(f, "{}", action),
            Step::Bind { instance, requirement, server } => write!(f, "bind({}.{} -> {})", instance, requirement, server),
            Step::Reconnect { instance, requirement, server } => write!(f, "autoreconnect({}.{} -> {})", instance, requirement, server),
            Step::Recover { instance, requirement } => write!(f, "fault({}.{})", instance, requirement),
            Step::Destroy { instance } => write!(f, "destroyBroken({})", instance),
        }
    }
}

/// The minimal trace needed to reproduce a failing branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    /// The (linearized) action sequence that was analysed.
    pub sequence: Vec<Action>,

    /// Steps applied successfully before the failure.
    pub prefix: Vec<Step>,

    pub failed_step: Step,
    pub cause: ExecutionError,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "failed step: {}", self.failed_step)?;
        writeln!(f, "cause: {}", self.cause)?;
        write!(f, "after:")?;
        if self.prefix.is_empty() {
            write!(f, " <initial state>")?;
        }
        for step in &self.prefix {
            write!(f, "\n  {}", step)?;
        }
        Ok(())
    }
}

/// Result of one analysis, keyed by application name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub application: ApplicationId,
    pub check: Check,
    pub verdict: Verdict,

    /// Present when a branch failed in a way that explains the verdict.
    pub failure: Option<FailureReport>,

    pub explored_branches: u64,
    pub linearizations: u64,
}

impl AnalysisReport {
    pub fn holds(&self) -> bool {
        self.verdict == Verdict::Holds
    }

    pub fn is_inconclusive(&self) -> bool {
        self.verdict == Verdict::Inconclusive
    }
}
