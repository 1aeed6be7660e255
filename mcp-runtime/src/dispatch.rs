use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::envelope::ResponseEnvelope;
use crate::error::{ToolError, classify_panic};
use crate::registry::ToolRegistry;

/// Routes `tools/call` requests to their handlers.
///
/// Every outcome is an envelope: unknown tools, invalid arguments, backend
/// failures and even panicking handlers come back as error envelopes so the
/// session keeps serving.
pub struct Dispatcher {
    registry: ToolRegistry,
    context: Arc<ExecutionContext>,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, context: Arc<ExecutionContext>) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, name: &str, args: Value) -> ResponseEnvelope {
        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = name, "call to unknown tool");
            return ResponseEnvelope::error(ToolError::UnknownTool(name.to_string()).classify());
        };

        let outcome = AssertUnwindSafe(tool.invoke(self.context.clone(), args))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(envelope)) => {
                tracing::debug!(tool = name, is_error = envelope.is_error(), "tool call finished");
                envelope
            }
            Ok(Err(err)) => {
                tracing::warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                ResponseEnvelope::error(err.classify())
            }
            Err(panic) => {
                tracing::error!(tool = name, "tool handler panicked");
                ResponseEnvelope::error(classify_panic(panic.as_ref()))
            }
        }
    }
}
