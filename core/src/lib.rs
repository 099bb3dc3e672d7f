//! digistore-flow: async step pipelines for order workflows.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step carries
//! `before`, `on` and `after` handlers that receive a shared
//! [`ContextData`] and decide whether the run continues or stops.
//!
//! Steps can be:
//!  - skipped by a predicate over the context (`skip_if`),
//!  - marked optional, in which case a missing handler is ignored and a
//!    failing handler is logged and recorded in the [`RunReport`] instead of
//!    aborting the run.
//!
//! [`FlowRegistry`] keys pipelines by their context type so callers only need
//! the context to dispatch a run.

pub mod error;
pub mod flow;
pub mod pipeline;
pub mod registry;

pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::context_data::ContextData;
pub use crate::flow::control::{DegradedStep, PipelineControl, RunOutcome, RunReport};
pub use crate::flow::handler::Handler;
pub use crate::flow::step::{SkipCondition, StepDef};
pub use crate::pipeline::Pipeline;
pub use crate::registry::FlowRegistry;
