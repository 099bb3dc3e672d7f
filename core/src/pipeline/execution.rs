use crate::error::FlowError;
use crate::flow::context_data::ContextData;
use crate::flow::control::{DegradedStep, PipelineControl, RunOutcome, RunReport};
use crate::flow::step::StepDef;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A failing required step aborts the run with its error. A failing optional
  /// step is logged, recorded in [`RunReport::degraded`], and the run continues.
  #[instrument(name = "Pipeline::run", skip_all, fields(pipeline = %self.label, num_steps = self.steps.len()))]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<RunReport, Err> {
    let mut degraded = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = %step_def.name, "Step skipped by condition.");
          continue;
        }
      }

      if !self.has_handlers(&step_def.name) {
        if step_def.optional {
          event!(Level::DEBUG, step = %step_def.name, "Optional step has no handlers.");
          continue;
        }
        event!(Level::ERROR, step = %step_def.name, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let span = info_span!("pipeline_step", step = %step_def.name, step_index = step_idx, optional = step_def.optional);
      match self.run_step(step_def, &ctx_data).instrument(span).await {
        Ok(PipelineControl::Continue) => {}
        Ok(PipelineControl::Stop) => {
          event!(Level::INFO, step = %step_def.name, "Pipeline stopped by handler.");
          return Ok(RunReport::new(RunOutcome::Stopped, degraded));
        }
        Err(e) if step_def.optional => {
          event!(Level::WARN, step = %step_def.name, error = %e, "Optional step failed, continuing.");
          degraded.push(DegradedStep {
            step_name: step_def.name.clone(),
            error: e.to_string(),
          });
        }
        Err(e) => {
          event!(Level::ERROR, step = %step_def.name, error = %e, "Step failed.");
          return Err(e);
        }
      }
    }

    Ok(RunReport::new(RunOutcome::Completed, degraded))
  }

  async fn run_step(&self, step_def: &StepDef<TData>, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    for phase in [&self.before, &self.on, &self.after] {
      let Some(handlers) = phase.get(&step_def.name) else {
        continue;
      };
      for handler_fn in handlers {
        if handler_fn(ctx_data.clone()).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }
}
