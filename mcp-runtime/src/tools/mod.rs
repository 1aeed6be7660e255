//! The tool catalogue.
//!
//! Each module contributes the tools for one backend area. Handlers receive
//! validated, typed arguments; collection arguments have already been checked
//! against the schema when a handler runs.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::registry::ToolDefinition;

pub mod comments;
pub mod fields;
pub mod files;
pub mod flows;
pub mod folders;
pub mod items;
pub mod schema;
pub mod system_prompt;
pub mod users;

/// A primary key, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Number(id) => write!(f, "{id}"),
            ItemId::Text(id) => f.write_str(id),
        }
    }
}

/// Input of tools that take no arguments.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

impl crate::registry::ToolArgs for NoArgs {}

/// All tools in listing order. `system-prompt` comes first when enabled.
pub fn catalogue(system_prompt_enabled: bool) -> Vec<ToolDefinition> {
    let mut tools = Vec::new();
    if system_prompt_enabled {
        tools.push(system_prompt::system_prompt());
    }
    tools.extend(users::tools());
    tools.push(schema::read_collections());
    tools.extend(items::tools());
    tools.extend(flows::tools());
    tools.extend(files::tools());
    tools.push(folders::read_folders());
    tools.extend(fields::tools());
    tools.extend(comments::tools());
    tools
}
