//! Strips store-local identity from a record before it is replayed on another store.

use serde_json::{Map, Value};

/// Fields that only mean something on the store the record came from.
const STORE_LOCAL_FIELDS: &[&str] = &[
    "id",
    "admin_graphql_api_id",
    "created_at",
    "updated_at",
    "published_at",
    "shop_id",
    "blog_id",
    "product_id",
    "user_id",
];

const IMAGE_FIELDS: &[&str] = &["src", "alt", "position"];

const VARIANT_FIELDS: &[&str] = &[
    "title",
    "price",
    "compare_at_price",
    "sku",
    "barcode",
    "position",
    "option1",
    "option2",
    "option3",
    "grams",
    "weight",
    "weight_unit",
    "taxable",
    "requires_shipping",
    "inventory_policy",
    "inventory_management",
    "fulfillment_service",
];

const OPTION_FIELDS: &[&str] = &["name", "position", "values"];

/// Collection sub-type tag added by the fetcher (`custom` or `smart`).
pub const COLLECTION_TYPE_FIELD: &str = "collection_type";

/// Record shapes the cleaner knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Product,
    Collection,
    Page,
    Blog,
    Article,
}

/// Return a copy of `record` that is safe to send to another store.
pub fn clean(kind: RecordKind, record: &Value) -> Value {
    let Value::Object(source) = record else {
        return record.clone();
    };

    let mut out: Map<String, Value> = source
        .iter()
        .filter(|(key, _)| !STORE_LOCAL_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if let Some(image) = out.get_mut("image") {
        *image = keep_fields(image, IMAGE_FIELDS);
    }

    match kind {
        RecordKind::Product => {
            reduce_each(&mut out, "images", IMAGE_FIELDS);
            reduce_each(&mut out, "variants", VARIANT_FIELDS);
            reduce_each(&mut out, "options", OPTION_FIELDS);
        }
        RecordKind::Collection => {
            out.remove(COLLECTION_TYPE_FIELD);
        }
        RecordKind::Page | RecordKind::Blog | RecordKind::Article => {}
    }

    Value::Object(out)
}

fn reduce_each(record: &mut Map<String, Value>, key: &str, fields: &[&str]) {
    if let Some(Value::Array(items)) = record.get_mut(key) {
        for item in items.iter_mut() {
            *item = keep_fields(item, fields);
        }
    }
}

fn keep_fields(value: &Value, fields: &[&str]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| fields.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
