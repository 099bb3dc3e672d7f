use crate::flow::context_data::ContextData;
use crate::flow::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A boxed async step handler.
///
/// Handlers receive a clone of the shared context. Lock guards taken inside a
/// handler must be released before the handler awaits anything.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
