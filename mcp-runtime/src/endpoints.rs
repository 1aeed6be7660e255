//! REST path builders. Each returns the path segments below the base URL.

use directus_mcp_core::schema::INTERNAL_PREFIX;

fn segments<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Root path for the items of `collection`. Internal collections are served
/// by dedicated endpoints (`directus_users` -> `/users`).
pub fn collection_root(collection: &str) -> Vec<String> {
    match collection.strip_prefix(INTERNAL_PREFIX) {
        Some(system) if !system.is_empty() => segments([system]),
        _ => segments(["items", collection]),
    }
}

pub fn items(collection: &str) -> Vec<String> {
    collection_root(collection)
}

pub fn item(collection: &str, id: &str) -> Vec<String> {
    let mut path = collection_root(collection);
    path.push(id.to_string());
    path
}

pub fn fields() -> Vec<String> {
    segments(["fields"])
}

pub fn fields_in(collection: &str) -> Vec<String> {
    segments(["fields", collection])
}

pub fn field(collection: &str, field: &str) -> Vec<String> {
    segments(["fields", collection, field])
}

pub fn relations() -> Vec<String> {
    segments(["relations"])
}

pub fn files() -> Vec<String> {
    segments(["files"])
}

pub fn file(id: &str) -> Vec<String> {
    segments(["files", id])
}

pub fn files_import() -> Vec<String> {
    segments(["files", "import"])
}

pub fn asset(id: &str) -> Vec<String> {
    segments(["assets", id])
}

pub fn folders() -> Vec<String> {
    segments(["folders"])
}

pub fn flows() -> Vec<String> {
    segments(["flows"])
}

pub fn flow_trigger(id: &str) -> Vec<String> {
    segments(["flows", "trigger", id])
}

pub fn comments() -> Vec<String> {
    segments(["comments"])
}

pub fn comment(id: &str) -> Vec<String> {
    segments(["comments", id])
}

pub fn users() -> Vec<String> {
    segments(["users"])
}

pub fn users_me() -> Vec<String> {
    segments(["users", "me"])
}

pub fn auth_login() -> Vec<String> {
    segments(["auth", "login"])
}
