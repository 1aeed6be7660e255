//! Typed form of the backend's query language and its URL encoding.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
    Yaml,
}

impl ExportFormat {
    fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
            ExportFormat::Yaml => "yaml",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetaCount {
    /// Total number of items in the collection.
    TotalCount,
    /// Number of items matching the filter.
    FilterCount,
}

impl MetaCount {
    fn as_str(self) -> &'static str {
        match self {
            MetaCount::TotalCount => "total_count",
            MetaCount::FilterCount => "filter_count",
        }
    }
}

/// Aggregation functions, each applied to a list of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_distinct: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_distinct: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_distinct: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<String>>,
}

impl Aggregate {
    fn operations(&self) -> [(&'static str, Option<&Vec<String>>); 8] {
        [
            ("avg", self.avg.as_ref()),
            ("avgDistinct", self.avg_distinct.as_ref()),
            ("count", self.count.as_ref()),
            ("countDistinct", self.count_distinct.as_ref()),
            ("sum", self.sum.as_ref()),
            ("sumDistinct", self.sum_distinct.as_ref()),
            ("min", self.min.as_ref()),
            ("max", self.max.as_ref()),
        ]
    }
}

/// Query parameters accepted by item, file, user and comment reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemQuery {
    /// Fields to return. Supports dot notation for nested relational fields and `*` wildcards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Fields to sort by, prefix with `-` for descending order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    /// Filter rules in the backend's filter syntax (`{"status": {"_eq": "published"}}`, `_and`, `_or`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Maximum number of items to return. `-1` returns everything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Number of items to skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Page number for pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    /// Global search over all root level text fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Content version to retrieve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Return the raw version delta instead of the merged item.
    #[serde(default, rename = "versionRaw", skip_serializing_if = "Option::is_none")]
    pub version_raw: Option<bool>,
    /// Export the result in the given format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportFormat>,
    /// Fields to group results by.
    #[serde(default, rename = "groupBy", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    /// Aggregation operations to perform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    /// Nested queries for relational fields, keyed by field name (`{"author": {"_fields": ["name"]}}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep: Option<BTreeMap<String, Value>>,
    /// Field aliases for the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<BTreeMap<String, String>>,
    /// Include count metadata in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaCount>,
}

impl ItemQuery {
    pub fn with_fields(fields: Vec<String>) -> Self {
        Self {
            fields: Some(fields),
            ..Self::default()
        }
    }

    /// Encode as URL query pairs: lists comma-joined, structured values as
    /// JSON, aggregates as `aggregate[op]=fields`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "fields", self.fields.as_ref());
        push_list(&mut pairs, "sort", self.sort.as_ref());
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page".to_string(), page.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        if let Some(version) = &self.version {
            pairs.push(("version".to_string(), version.clone()));
        }
        if let Some(version_raw) = self.version_raw {
            pairs.push(("versionRaw".to_string(), version_raw.to_string()));
        }
        if let Some(export) = self.export {
            pairs.push(("export".to_string(), export.as_str().to_string()));
        }
        push_list(&mut pairs, "groupBy", self.group_by.as_ref());
        if let Some(aggregate) = &self.aggregate {
            for (operation, fields) in aggregate.operations() {
                if let Some(fields) = fields {
                    pairs.push((format!("aggregate[{operation}]"), fields.join(",")));
                }
            }
        }
        if let Some(deep) = &self.deep {
            push_json(&mut pairs, "deep", deep);
        }
        if let Some(alias) = &self.alias {
            push_json(&mut pairs, "alias", alias);
        }
        if let Some(meta) = self.meta {
            pairs.push(("meta".to_string(), meta.as_str().to_string()));
        }
        pairs
    }
}

/// The subset of query parameters that shape the record returned by a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WriteQuery {
    /// Fields to return for the written item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Include count metadata in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaCount>,
}

impl WriteQuery {
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        ItemQuery {
            fields: self.fields.clone(),
            meta: self.meta,
            ..ItemQuery::default()
        }
        .to_query_pairs()
    }
}

fn push_list(pairs: &mut Vec<(String, String)>, key: &str, values: Option<&Vec<String>>) {
    if let Some(values) = values {
        if !values.is_empty() {
            pairs.push((key.to_string(), values.join(",")));
        }
    }
}

fn push_json<T: Serialize>(pairs: &mut Vec<(String, String)>, key: &str, value: &T) {
    if let Ok(encoded) = serde_json::to_string(value) {
        pairs.push((key.to_string(), encoded));
    }
}
