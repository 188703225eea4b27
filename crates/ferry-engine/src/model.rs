//! Request and record types shared by every stage of a migration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use ferry_admin::Connection;

/// What a single migration call moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Metaobjects,
    Products,
    Collections,
    Pages,
    Blogs,
    Metafields,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Metaobjects,
        EntityKind::Products,
        EntityKind::Collections,
        EntityKind::Pages,
        EntityKind::Blogs,
        EntityKind::Metafields,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Metaobjects => "metaobjects",
            EntityKind::Products => "products",
            EntityKind::Collections => "collections",
            EntityKind::Pages => "pages",
            EntityKind::Blogs => "blogs",
            EntityKind::Metafields => "metafields",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown entity kind '{}', expected one of: {}",
                    s,
                    EntityKind::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

/// Entity kinds that can own metafields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Products,
    Collections,
    Pages,
    Blogs,
}

impl OwnerType {
    pub const ALL: [OwnerType; 4] = [
        OwnerType::Products,
        OwnerType::Collections,
        OwnerType::Pages,
        OwnerType::Blogs,
    ];

    /// REST resource segment, e.g. `products` in `products/1/metafields.json`.
    pub fn resource(&self) -> &'static str {
        match self {
            OwnerType::Products => "products",
            OwnerType::Collections => "collections",
            OwnerType::Pages => "pages",
            OwnerType::Blogs => "blogs",
        }
    }

    /// Root key of a single-resource response.
    pub fn singular(&self) -> &'static str {
        match self {
            OwnerType::Products => "product",
            OwnerType::Collections => "collection",
            OwnerType::Pages => "page",
            OwnerType::Blogs => "blog",
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            OwnerType::Products => EntityKind::Products,
            OwnerType::Collections => EntityKind::Collections,
            OwnerType::Pages => EntityKind::Pages,
            OwnerType::Blogs => EntityKind::Blogs,
        }
    }
}

impl std::fmt::Display for OwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.resource())
    }
}

impl std::str::FromStr for OwnerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the singular form too ("product"), since callers often pass it.
        let s = s.trim().to_ascii_lowercase();
        OwnerType::ALL
            .into_iter()
            .find(|o| o.resource() == s || o.singular() == s)
            .ok_or_else(|| {
                format!(
                    "unknown owner type '{}', expected one of: products, collections, pages, blogs",
                    s
                )
            })
    }
}

impl TryFrom<EntityKind> for OwnerType {
    type Error = String;

    fn try_from(kind: EntityKind) -> Result<Self, Self::Error> {
        match kind {
            EntityKind::Products => Ok(OwnerType::Products),
            EntityKind::Collections => Ok(OwnerType::Collections),
            EntityKind::Pages => Ok(OwnerType::Pages),
            EntityKind::Blogs => Ok(OwnerType::Blogs),
            other => Err(format!("{} cannot own metafields", other)),
        }
    }
}

/// Request-wide policy for items whose natural key already exists on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    #[default]
    Overwrite,
    Skip,
    /// Interactive mode. Only accepted when every item carries its own resolution.
    Ask,
}

impl std::str::FromStr for ConflictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ConflictMode::Overwrite),
            "skip" => Ok(ConflictMode::Skip),
            "ask" => Ok(ConflictMode::Ask),
            other => Err(format!(
                "unknown conflict mode '{}', expected overwrite, skip or ask",
                other
            )),
        }
    }
}

/// A resolved conflict decision. This is all the core acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Overwrite,
    Skip,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "skip" => Ok(ConflictPolicy::Skip),
            other => Err(format!(
                "unknown conflict resolution '{}', expected overwrite or skip",
                other
            )),
        }
    }
}

/// One migration call: one entity kind, one set of source-side ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRequest {
    pub source: Connection,
    pub target: Connection,
    pub entity_kind: EntityKind,
    /// Source-side identifiers. Target ids are always discovered, never supplied.
    pub item_ids: BTreeSet<String>,
    #[serde(default)]
    pub conflict_mode: ConflictMode,
    #[serde(default)]
    pub dry_run: bool,
    /// Owner type for `metafields` requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_type_hint: Option<OwnerType>,
    /// Per-item conflict decisions, keyed by source id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resolutions: BTreeMap<String, ConflictPolicy>,
}

impl MigrationRequest {
    pub fn new<I, S>(
        source: Connection,
        target: Connection,
        entity_kind: EntityKind,
        ids: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source,
            target,
            entity_kind,
            item_ids: ids.into_iter().map(Into::into).collect(),
            conflict_mode: ConflictMode::default(),
            dry_run: false,
            owner_type_hint: None,
            resolutions: BTreeMap::new(),
        }
    }

    pub fn with_mode(mut self, mode: ConflictMode) -> Self {
        self.conflict_mode = mode;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_owner_type(mut self, owner: OwnerType) -> Self {
        self.owner_type_hint = Some(owner);
        self
    }

    pub fn resolve(mut self, id: impl Into<String>, policy: ConflictPolicy) -> Self {
        self.resolutions.insert(id.into(), policy);
        self
    }
}

/// A metaobject type definition. `type_name` is the cross-store natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaobjectDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub field_definitions: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub name: String,
    #[serde(rename = "type", deserialize_with = "type_name")]
    pub value_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Validation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub name: String,
    pub value: String,
}

/// A metaobject instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaobjectEntry {
    pub id: String,
    pub handle: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<MetaobjectField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaobjectField {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
}

impl MetaobjectField {
    /// Null or empty values are never replayed against the target.
    pub fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Field types arrive either as a plain string or as `{ "name": ... }`.
fn type_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TypeRef {
        Name(String),
        Object { name: String },
    }

    Ok(match TypeRef::deserialize(deserializer)? {
        TypeRef::Name(name) | TypeRef::Object { name } => name,
    })
}
