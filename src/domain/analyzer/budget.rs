use std::time::{Duration, Instant};

/// Upper bounds for one analysis. Unbounded by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    /// Maximum number of explored search nodes (action steps and fault handling points).
    pub max_branches: Option<u64>,

    /// Wall clock limit for the whole analysis.
    pub time_limit: Option<Duration>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_branches(mut self, max_branches: u64) -> Self {
        self.max_branches = Some(max_branches);
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

/// The budget ran out before the search could decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetExhausted;

/// Tracks how much of a [`SearchBudget`] has been used.
#[derive(Debug)]
pub(crate) struct Meter {
    budget: SearchBudget,
    started: Instant,
    explored: u64,
    linearizations: u64,
}

impl Meter {
    pub fn new(budget: SearchBudget) -> Self {
        Meter { budget, started: Instant::now(), explored: 0, linearizations: 0 }
    }

    pub fn tick(&mut self) -> Result<(), BudgetExhausted> {
        self.explored += 1;
        if let Some(max_branches) = self.budget.max_branches {
            if self.explored > max_branches {
                return Err(BudgetExhausted);
            }
        }
        if let Some(time_limit) = self.budget.time_limit {
            if self.started.elapsed() > time_limit {
                return Err(BudgetExhausted);
            }
        }
        Ok(())
    }

    pub fn count_linearization(&mut self) {
        self.linearizations += 1;
    }

    pub fn explored(&self) -> u64 {
        self.explored
    }

    pub fn linearizations(&self) -> u64 {
        self.linearizations
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
