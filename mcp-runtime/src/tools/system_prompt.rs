use std::sync::Arc;

use super::NoArgs;
use crate::context::ExecutionContext;
use crate::envelope::ResponseEnvelope;
use crate::registry::{ToolAnnotations, ToolDefinition, ToolResult};

/// Used when the system prompt tool is enabled without custom text.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a content assistant working inside a Directus CMS instance. You help \
people read, write and organise the content stored there.

## Getting oriented
- Call read-collections before touching any collection. It lists the \
collections, their fields and how they relate.
- Use read-fields when you need a field's exact definition.

## Editing content
- Rich text (HTML/WYSIWYG) fields take plain, semantic HTML only. Do not add \
classes, inline styles or custom markup.
- If you are not sure which value a field should get, stop and ask. Accuracy \
matters more than speed.
- Keep the language precise and readable for the audience of the content.

## Deleting content
- Never delete anything without explicit confirmation. Ask the user to type \
DELETE and explain what will be lost before you proceed.

## Answering
- Keep responses short and focused on the task.
- After creating or updating an item, share the link to it in the Directus \
admin app when one is provided.
";

pub fn system_prompt() -> ToolDefinition {
    ToolDefinition::new(
        "system-prompt",
        "IMPORTANT: Call this tool first. It returns the instructions for working with this Directus instance.",
        ToolAnnotations::read_only("System Prompt"),
        read,
    )
}

async fn read(ctx: Arc<ExecutionContext>, _args: NoArgs) -> ToolResult {
    let prompt = ctx.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
    Ok(ResponseEnvelope::text(prompt))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::stub::StubBackend;
    use crate::tools::testing::{blog_context, dispatcher_with, text};

    #[tokio::test]
    async fn returns_configured_prompt_verbatim() {
        let stub = Arc::new(StubBackend::new());
        let context =
            blog_context(stub.clone()).with_system_prompt(Some("Be brief.".to_string()));
        let envelope = dispatcher_with(context, &[])
            .dispatch("system-prompt", json!({}))
            .await;
        assert_eq!(text(&envelope), "Be brief.");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn listed_first_when_enabled() {
        let context = blog_context(Arc::new(StubBackend::new()))
            .with_system_prompt(Some(super::DEFAULT_SYSTEM_PROMPT.to_string()));
        let dispatcher = dispatcher_with(context, &[]);
        assert_eq!(dispatcher.registry().names().next(), Some("system-prompt"));
    }
}
