use crate::error::FlowError;
use crate::flow::handler::Handler;
use crate::flow::step::{SkipCondition, StepDef};
use std::collections::HashMap;

/// An ordered set of steps over a root context `TData`, with handlers that
/// fail with `Err`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) label: String,
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a pipeline from `(name, optional, skip_if)` triples.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, optional, skip_if)| StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      label: std::any::type_name::<TData>().to_string(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Name used in tracing spans. Defaults to the context type name.
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let step = self.step_mut(step_name);
    step.skip_if = skip_if;
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) {
    let step = self.step_mut(step_name);
    step.optional = optional;
  }

  fn step_mut(&mut self, step_name: &str) -> &mut StepDef<TData> {
    match self.steps.iter_mut().find(|s| s.name == step_name) {
      Some(step) => step,
      None => panic!("pipeline setup error: step '{}' is not defined", step_name),
    }
  }

  /// Step names are fixed at construction; wiring a handler to an unknown
  /// step is a programming error.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("pipeline setup error: step '{}' is not defined", step_name);
    }
  }

  pub(crate) fn has_handlers(&self, step_name: &str) -> bool {
    [&self.before, &self.on, &self.after]
      .iter()
      .any(|phase| phase.get(step_name).map_or(false, |v| !v.is_empty()))
  }
}
