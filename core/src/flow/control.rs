//! Flow signals returned by handlers and the summary of a finished run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt immediately. Remaining handlers and steps are not executed.
  Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  Completed,
  Stopped,
}

/// An optional step whose handler failed. The run carried on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedStep {
  pub step_name: String,
  pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub outcome: RunOutcome,
  pub degraded: Vec<DegradedStep>,
}

impl RunReport {
  pub(crate) fn new(outcome: RunOutcome, degraded: Vec<DegradedStep>) -> Self {
    Self { outcome, degraded }
  }

  pub fn completed(&self) -> bool {
    self.outcome == RunOutcome::Completed
  }

  /// Completed with every optional step succeeding.
  pub fn is_clean(&self) -> bool {
    self.completed() && self.degraded.is_empty()
  }
}
