//! Tool definitions and the registry they are served from.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::context::ExecutionContext;
use crate::envelope::ResponseEnvelope;
use crate::error::{StartupError, ToolError};

pub type ToolResult = Result<ResponseEnvelope, ToolError>;

type ErasedHandler =
    Arc<dyn Fn(Arc<ExecutionContext>, Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;

/// Typed tool input. The JSON schema advertised to the agent is derived from
/// the type and incoming arguments are validated by deserializing into it.
pub trait ToolArgs: DeserializeOwned + JsonSchema + Send + 'static {
    /// Collection the call operates on, checked against the schema before the
    /// handler runs.
    fn collection(&self) -> Option<&str> {
        None
    }
}

/// Behaviour hints advertised with a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

impl ToolAnnotations {
    pub fn titled(title: &'static str) -> Self {
        Self {
            title: Some(title),
            ..Self::default()
        }
    }

    pub fn read_only(title: &'static str) -> Self {
        Self {
            read_only_hint: Some(true),
            ..Self::titled(title)
        }
    }

    pub fn destructive(title: &'static str) -> Self {
        Self {
            destructive_hint: Some(true),
            ..Self::titled(title)
        }
    }
}

pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub annotations: ToolAnnotations,
    pub input_schema: Value,
    handler: ErasedHandler,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    pub fn new<A, F, Fut>(
        name: &'static str,
        description: &'static str,
        annotations: ToolAnnotations,
        handler: F,
    ) -> Self
    where
        A: ToolArgs,
        F: Fn(Arc<ExecutionContext>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        let input_schema = serde_json::to_value(schemars::schema_for!(A))
            .unwrap_or_else(|_| json!({ "type": "object" }));

        let handler: ErasedHandler = Arc::new(move |context: Arc<ExecutionContext>, raw: Value| {
            let args = match serde_json::from_value::<A>(raw) {
                Ok(args) => args,
                Err(e) => {
                    return future::ready(Err(ToolError::InvalidArguments(e.to_string()))).boxed();
                }
            };
            if let Some(collection) = args.collection() {
                if let Err(e) = context.require_collection(collection) {
                    return future::ready(Err(e)).boxed();
                }
            }
            handler(context, args).boxed()
        });

        Self {
            name,
            description,
            annotations,
            input_schema,
            handler,
        }
    }

    /// Validate `args` and run the handler.
    pub fn invoke(&self, context: Arc<ExecutionContext>, args: Value) -> BoxFuture<'static, ToolResult> {
        (self.handler)(context, args)
    }

    /// Entry of the `tools/list` result.
    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        });
        if self.annotations != ToolAnnotations::default() {
            payload["annotations"] = json!(self.annotations);
        }
        payload
    }
}

/// The active tool set: unique names, disabled tools removed, registration
/// order kept for listing.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn build(definitions: Vec<ToolDefinition>, disabled: &[String]) -> Result<Self, StartupError> {
        let mut registry = ToolRegistry::default();
        let mut seen = HashSet::new();
        for definition in definitions {
            if !seen.insert(definition.name) {
                return Err(StartupError::DuplicateTool(definition.name.to_string()));
            }
            if disabled.iter().any(|name| name == definition.name) {
                tracing::debug!(tool = definition.name, "tool disabled by configuration");
                continue;
            }
            registry
                .by_name
                .insert(definition.name, registry.tools.len());
            registry.tools.push(definition);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.by_name.get(name).map(|index| &self.tools[*index])
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|tool| tool.name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn list_payload(&self) -> Value {
        let tools: Vec<Value> = self.tools.iter().map(ToolDefinition::to_value).collect();
        json!({ "tools": tools })
    }
}
