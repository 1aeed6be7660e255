//! Pure domain logic shared by the Directus MCP runtime: schema compaction,
//! prompt templating and the backend's structured error shape.

pub mod error;
pub mod schema;
pub mod strip;
pub mod template;
