use std::time::Duration;

/// Limits for a single `solve` call. Both are checked every time the solver
/// makes a branching decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Maximum number of branching decisions
    pub max_steps: Option<u64>,
    /// Wall-clock limit
    pub timeout: Option<Duration>,
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_steps.is_none() && self.timeout.is_none()
    }
}
