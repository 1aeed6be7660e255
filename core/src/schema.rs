//! Compact collection -> field map built from the backend's field and
//! relation metadata.
//!
//! The raw metadata is verbose (UI layout, translations, validation rules,
//! database column details). Agents only need enough to address fields and
//! follow relations, so each field is reduced to a [`Field`] and internal
//! collections are dropped, keeping only files and users since agents need
//! to resolve those.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::strip::strip_nulls;

pub const INTERNAL_PREFIX: &str = "directus_";
pub const FILES_COLLECTION: &str = "directus_files";
pub const USERS_COLLECTION: &str = "directus_users";

// ── Raw backend shapes ──────────────────────────────────────────

/// A field record as returned by `GET /fields`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawField {
    pub collection: String,
    pub field: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub schema: Option<RawFieldSchema>,
    #[serde(default)]
    pub meta: Option<RawFieldMeta>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFieldSchema {
    #[serde(default)]
    pub is_primary_key: Option<bool>,
    #[serde(default)]
    pub foreign_key_table: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFieldMeta {
    #[serde(default)]
    pub system: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_special")]
    pub special: Vec<String>,
    #[serde(default)]
    pub interface: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub options: Option<Value>,
}

/// A relation record as returned by `GET /relations`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRelation {
    pub collection: String,
    pub field: String,
    #[serde(default)]
    pub related_collection: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl RawRelation {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta.as_ref()?.get(key)?.as_str()
    }

    fn allowed_collections(&self) -> Option<&Value> {
        self.meta
            .as_ref()?
            .get("one_allowed_collections")
            .filter(|value| !value.is_null())
    }
}

/// `meta.special` is an array in current backends and a comma separated
/// string in older ones.
fn deserialize_special<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(csv)) => csv
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    })
}

// ── Compact shapes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    M2o,
    O2m,
    M2m,
    M2a,
    File,
    Files,
}

/// Collection(s) on the other side of a relation. Polymorphic (m2a)
/// relations always carry a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTarget {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: Value,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_type: Option<RelationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_collection: Option<RelationTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_meta: Option<Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Collection name -> field name -> [`Field`]. Ordered so that serialising
/// the same backend state always produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(BTreeMap<String, BTreeMap<String, Field>>);

impl Schema {
    pub fn contains_collection(&self, collection: &str) -> bool {
        self.0.contains_key(collection)
    }

    pub fn collection(&self, collection: &str) -> Option<&BTreeMap<String, Field>> {
        self.0.get(collection)
    }

    pub fn field(&self, collection: &str, field: &str) -> Option<&Field> {
        self.0.get(collection)?.get(field)
    }

    /// Name of the field flagged as primary key, if any.
    pub fn primary_key_field(&self, collection: &str) -> Option<&str> {
        self.0
            .get(collection)?
            .iter()
            .find(|(_, field)| field.primary_key)
            .map(|(name, _)| name.as_str())
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, collection: impl Into<String>, field: impl Into<String>, value: Field) {
        self.0
            .entry(collection.into())
            .or_default()
            .insert(field.into(), value);
    }
}

// ── Compaction ──────────────────────────────────────────────────

/// Which end of a relation record a field was joined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// The field holding the foreign key (`relation.collection/field`).
    Many,
    /// The alias field on the referenced collection (`related_collection/meta.one_field`).
    One,
}

struct RelationIndex<'a> {
    many: HashMap<&'a str, HashMap<&'a str, &'a RawRelation>>,
    one: HashMap<&'a str, HashMap<&'a str, &'a RawRelation>>,
}

impl<'a> RelationIndex<'a> {
    fn build(relations: &'a [RawRelation]) -> Self {
        let mut many: HashMap<&str, HashMap<&str, &RawRelation>> = HashMap::new();
        let mut one: HashMap<&str, HashMap<&str, &RawRelation>> = HashMap::new();
        for relation in relations {
            many.entry(relation.collection.as_str())
                .or_default()
                .entry(relation.field.as_str())
                .or_insert(relation);
            if let (Some(related), Some(one_field)) = (
                relation.related_collection.as_deref(),
                relation.meta_str("one_field"),
            ) {
                one.entry(related)
                    .or_default()
                    .entry(one_field)
                    .or_insert(relation);
            }
        }
        Self { many, one }
    }

    fn many_side(&self, collection: &str, field: &str) -> Option<&'a RawRelation> {
        self.many.get(collection)?.get(field).copied()
    }

    fn lookup(&self, collection: &str, field: &str) -> Option<(&'a RawRelation, Side)> {
        if let Some(relation) = self.many_side(collection, field) {
            return Some((relation, Side::Many));
        }
        self.one
            .get(collection)?
            .get(field)
            .map(|relation| (*relation, Side::One))
    }

    /// The other relation of a junction collection, reached through
    /// `meta.junction_field`.
    fn junction_sibling(&self, relation: &RawRelation) -> Option<&'a RawRelation> {
        let junction_field = relation.meta_str("junction_field")?;
        self.many_side(&relation.collection, junction_field)
    }
}

/// Reduce raw field and relation metadata to a compact [`Schema`].
///
/// Fields owned by internal collections, system fields (unless they point at
/// files or users) and alias fields without data are dropped. Collections left
/// without fields do not appear in the result.
pub fn compact_schema(fields: &[RawField], relations: &[RawRelation]) -> Schema {
    let index = RelationIndex::build(relations);
    let mut schema = Schema::default();

    for raw in fields {
        let joined = index.lookup(&raw.collection, &raw.field);
        if !is_retained(raw, joined.map(|(relation, _)| relation)) {
            continue;
        }
        let field = project_field(raw, joined, &index);
        schema.insert(raw.collection.clone(), raw.field.clone(), field);
    }

    schema
}

fn is_file_or_user_collection(collection: &str) -> bool {
    collection == FILES_COLLECTION || collection == USERS_COLLECTION
}

fn is_retained(raw: &RawField, relation: Option<&RawRelation>) -> bool {
    let meta = raw.meta.as_ref();

    if meta.and_then(|m| m.system).unwrap_or(false) {
        let relation_target = relation
            .and_then(|r| r.related_collection.as_deref())
            .or_else(|| raw.schema.as_ref()?.foreign_key_table.as_deref());
        if !relation_target.is_some_and(is_file_or_user_collection) {
            return false;
        }
    }

    if raw.collection.starts_with(INTERNAL_PREFIX) && !is_file_or_user_collection(&raw.collection) {
        return false;
    }

    let is_alias = raw.field_type.as_deref() == Some("alias");
    let no_data = meta.is_some_and(|m| m.special.iter().any(|tag| tag == "no-data"));
    !(is_alias && no_data)
}

fn project_field(
    raw: &RawField,
    joined: Option<(&RawRelation, Side)>,
    index: &RelationIndex<'_>,
) -> Field {
    let meta = raw.meta.clone().unwrap_or_default();
    let foreign_key_table = raw
        .schema
        .as_ref()
        .and_then(|schema| schema.foreign_key_table.clone());

    let mut field = Field {
        field_type: raw.field_type.clone(),
        interface: meta.interface.clone(),
        note: meta.note.clone(),
        primary_key: raw
            .schema
            .as_ref()
            .and_then(|schema| schema.is_primary_key)
            .unwrap_or(false),
        required: meta.required.unwrap_or(false),
        choices: extract_choices(meta.options.as_ref()),
        ..Field::default()
    };

    let relation_meta = joined
        .and_then(|(relation, _)| relation.meta.clone())
        .filter(|value| !value.is_null());

    match infer_relation_type(&meta.special) {
        Some(RelationType::M2a) => {
            let allowed = joined
                .map(|(relation, _)| allowed_collections(relation, index))
                .unwrap_or_default();
            field.relation_type = Some(RelationType::M2a);
            field.relation_collection = Some(RelationTarget::Many(allowed));
            field.relation_meta = relation_meta;
        }
        Some(relation_type) => {
            field.relation_type = Some(relation_type);
            if let Some((relation, side)) = joined {
                field.relation_collection = target_collection(relation_type, relation, side, index)
                    .map(RelationTarget::Single);
                field.relation_meta = relation_meta;
            } else if matches!(relation_type, RelationType::M2o | RelationType::File) {
                field.relation_collection = foreign_key_table.map(RelationTarget::Single);
            }
        }
        // Heuristic: an untagged foreign key is assumed to be many-to-one.
        // Directionality is not verified against the relation list.
        None => {
            if let Some(target) = foreign_key_table {
                field.relation_type = Some(RelationType::M2o);
                field.relation_collection = Some(RelationTarget::Single(target));
                field.relation_meta = relation_meta;
            }
        }
    }

    field
}

fn extract_choices(options: Option<&Value>) -> Option<Vec<Choice>> {
    let choices = options?.get("choices")?.as_array()?;
    let projected: Vec<Choice> = choices
        .iter()
        .filter_map(Value::as_object)
        .map(|choice| Choice {
            text: choice.get("text").cloned().unwrap_or(Value::Null),
            value: choice.get("value").cloned().unwrap_or(Value::Null),
        })
        .collect();
    if projected.is_empty() {
        None
    } else {
        Some(projected)
    }
}

/// First match wins, in this order: m2o/file, o2m, m2m/files, m2a.
fn infer_relation_type(special: &[String]) -> Option<RelationType> {
    let has = |tag: &str| special.iter().any(|candidate| candidate == tag);

    if has("m2o") || has("file") {
        Some(if has("file") {
            RelationType::File
        } else {
            RelationType::M2o
        })
    } else if has("o2m") {
        Some(RelationType::O2m)
    } else if has("m2m") || has("files") {
        Some(if has("files") {
            RelationType::Files
        } else {
            RelationType::M2m
        })
    } else if has("m2a") {
        Some(RelationType::M2a)
    } else {
        None
    }
}

fn target_collection(
    relation_type: RelationType,
    relation: &RawRelation,
    side: Side,
    index: &RelationIndex<'_>,
) -> Option<String> {
    match side {
        Side::Many => relation.related_collection.clone(),
        Side::One => match relation_type {
            RelationType::M2m | RelationType::Files => index
                .junction_sibling(relation)
                .and_then(|sibling| sibling.related_collection.clone())
                .or_else(|| Some(relation.collection.clone())),
            _ => Some(relation.collection.clone()),
        },
    }
}

fn allowed_collections(relation: &RawRelation, index: &RelationIndex<'_>) -> Vec<String> {
    let raw = relation
        .allowed_collections()
        .or_else(|| index.junction_sibling(relation)?.allowed_collections());
    let Some(stripped) = raw.and_then(strip_nulls) else {
        return Vec::new();
    };
    stripped
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
