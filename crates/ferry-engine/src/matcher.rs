//! Cross-store identity by natural key.
//!
//! Source and target ids are never comparable. A source item is the same
//! entity as a target item only when their natural keys are equal.

use serde_json::Value;

use crate::model::{MetaobjectDefinition, MetaobjectEntry};
use crate::record::handle_of;

/// The identity bridge between two stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    /// `handle` of a product, collection, page, blog or article.
    Handle(String),
    /// `handle` within a scope, e.g. a metaobject entry within its definition type.
    Scoped { scope: String, handle: String },
    /// `(namespace, key)` of a metafield on an already-resolved owner.
    Namespaced { namespace: String, key: String },
    /// `type` of a metaobject definition.
    Type(String),
}

/// Extracts the natural key of a record, or `None` when it has none.
pub type KeyFn<T> = fn(&T) -> Option<NaturalKey>;

/// Finds the target counterpart of a source item by linear scan.
///
/// The first candidate with an equal key wins; later duplicates are never returned.
pub struct Matcher<'a, T> {
    candidates: &'a [T],
    key_of: KeyFn<T>,
}

impl<'a, T> Matcher<'a, T> {
    pub fn new(candidates: &'a [T], key_of: KeyFn<T>) -> Self {
        Self {
            candidates,
            key_of,
        }
    }

    /// Target counterpart of `item`. Items without a key never match.
    pub fn find(&self, item: &T) -> Option<&'a T> {
        let key = (self.key_of)(item)?;
        self.find_key(&key)
    }

    pub fn find_key(&self, key: &NaturalKey) -> Option<&'a T> {
        self.candidates
            .iter()
            .find(|candidate| (self.key_of)(candidate).as_ref() == Some(key))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> Matcher<'a, Value> {
    /// Products, collections, pages, blogs and articles.
    pub fn by_handle(candidates: &'a [Value]) -> Self {
        Self::new(candidates, handle_key)
    }

    /// Metafields of one owner.
    pub fn by_namespace_key(candidates: &'a [Value]) -> Self {
        Self::new(candidates, namespace_key)
    }
}

impl<'a> Matcher<'a, MetaobjectEntry> {
    /// Metaobject entries, scoped to their definition type.
    pub fn entries(candidates: &'a [MetaobjectEntry]) -> Self {
        Self::new(candidates, entry_key)
    }
}

impl<'a> Matcher<'a, MetaobjectDefinition> {
    pub fn definitions(candidates: &'a [MetaobjectDefinition]) -> Self {
        Self::new(candidates, definition_key)
    }
}

pub fn handle_key(record: &Value) -> Option<NaturalKey> {
    handle_of(record).map(|h| NaturalKey::Handle(h.to_string()))
}

pub fn namespace_key(metafield: &Value) -> Option<NaturalKey> {
    let namespace = metafield.get("namespace")?.as_str()?;
    let key = metafield.get("key")?.as_str()?;
    if namespace.is_empty() || key.is_empty() {
        return None;
    }
    Some(NaturalKey::Namespaced {
        namespace: namespace.to_string(),
        key: key.to_string(),
    })
}

pub fn definition_key(definition: &MetaobjectDefinition) -> Option<NaturalKey> {
    (!definition.type_name.is_empty()).then(|| NaturalKey::Type(definition.type_name.clone()))
}

pub fn entry_key(entry: &MetaobjectEntry) -> Option<NaturalKey> {
    if entry.handle.is_empty() {
        return None;
    }
    Some(NaturalKey::Scoped {
        scope: entry.type_name.clone(),
        handle: entry.handle.clone(),
    })
}
