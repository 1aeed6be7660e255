//! Deep links into the backend's admin UI.

use serde_json::Value;

/// Users and files have their own admin pages; every other collection,
/// internal ones included, opens in the content module.
pub fn item_link(base_url: &str, collection: &str, primary_key: &str) -> String {
    match collection {
        "directus_users" => user_link(base_url, primary_key),
        "directus_files" => file_link(base_url, primary_key),
        _ => format!(
            "{}/admin/content/{collection}/{primary_key}",
            base_url.trim_end_matches('/')
        ),
    }
}

pub fn user_link(base_url: &str, id: &str) -> String {
    format!("{}/admin/users/{id}", base_url.trim_end_matches('/'))
}

pub fn file_link(base_url: &str, id: &str) -> String {
    format!("{}/admin/files/{id}", base_url.trim_end_matches('/'))
}

/// String form of a key value; only strings and numbers qualify.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(key) if !key.is_empty() => Some(key.clone()),
        Value::Number(key) => Some(key.to_string()),
        _ => None,
    }
}
