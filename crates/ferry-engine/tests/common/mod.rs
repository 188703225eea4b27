//! In-memory stores behind the `AdminApi` trait.
//!
//! REST paths are routed by segment count: an odd count names a collection
//! (`products`, `blogs/5/articles`), an even count names one record in it
//! (`products/7`). Collection listings honour `limit` and `since_id` the way
//! the Admin REST API does. GraphQL documents are routed on their operation name.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use ferry_admin::{AdminApi, AdminError, Connection};

pub const SOURCE: &str = "source.example.com";
pub const TARGET: &str = "target.example.com";

pub fn source() -> Connection {
    Connection::new(SOURCE, "source-token")
}

pub fn target() -> Connection {
    Connection::new(TARGET, "target-token")
}

/// A write issued against a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub store: String,
    pub method: &'static str,
    pub path: String,
}

#[derive(Default)]
struct Store {
    rest: BTreeMap<String, Vec<Value>>,
    definitions: Vec<Value>,
    entries: Vec<Value>,
    failing_gets: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    failing_graphql: BTreeSet<String>,
    rejected_mutations: BTreeSet<String>,
}

#[derive(Default)]
pub struct FakeAdmin {
    stores: Mutex<HashMap<String, Store>>,
    reads: Mutex<Vec<(String, String)>>,
    writes: Mutex<Vec<Write>>,
    next_id: AtomicU64,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    fn with_store<R>(&self, url: &str, f: impl FnOnce(&mut Store) -> R) -> R {
        let mut stores = self.stores.lock().unwrap();
        f(stores.entry(url.to_string()).or_default())
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Add a record to a REST collection such as `products` or `blogs/5/articles`.
    pub fn insert(&self, url: &str, collection: &str, record: Value) {
        self.with_store(url, |s| {
            s.rest.entry(collection.to_string()).or_default().push(record)
        });
    }

    pub fn insert_definition(&self, url: &str, definition: Value) {
        self.with_store(url, |s| s.definitions.push(definition));
    }

    pub fn insert_entry(&self, url: &str, entry: Value) {
        self.with_store(url, |s| s.entries.push(entry));
    }

    /// GETs whose path starts with `prefix` fail with a 500.
    pub fn fail_gets(&self, url: &str, prefix: &str) {
        self.with_store(url, |s| s.failing_gets.insert(prefix.to_string()));
    }

    /// POSTs and PUTs whose path starts with `prefix` fail with a 422.
    pub fn fail_writes(&self, url: &str, prefix: &str) {
        self.with_store(url, |s| s.failing_writes.insert(prefix.to_string()));
    }

    /// GraphQL operations with this name fail with a top-level error.
    pub fn fail_graphql(&self, url: &str, operation: &str) {
        self.with_store(url, |s| s.failing_graphql.insert(operation.to_string()));
    }

    /// Mutations with this name answer with `userErrors`.
    pub fn reject_mutation(&self, url: &str, operation: &str) {
        self.with_store(url, |s| s.rejected_mutations.insert(operation.to_string()));
    }

    pub fn records(&self, url: &str, collection: &str) -> Vec<Value> {
        self.with_store(url, |s| s.rest.get(collection).cloned().unwrap_or_default())
    }

    pub fn definitions(&self, url: &str) -> Vec<Value> {
        self.with_store(url, |s| s.definitions.clone())
    }

    pub fn entries(&self, url: &str) -> Vec<Value> {
        self.with_store(url, |s| s.entries.clone())
    }

    /// Paths of every GET issued against `url`, in order.
    pub fn reads(&self, url: &str) -> Vec<String> {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .filter(|(store, _)| store == url)
            .map(|(_, path)| path.clone())
            .collect()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, url: &str) -> Vec<Write> {
        self.writes()
            .into_iter()
            .filter(|w| w.store == url)
            .collect()
    }

    fn log_write(&self, url: &str, method: &'static str, path: &str) {
        self.writes.lock().unwrap().push(Write {
            store: url.to_string(),
            method,
            path: path.to_string(),
        });
    }
}

fn split(path: &str) -> (Vec<String>, BTreeMap<String, String>) {
    let (path, query) = path.split_once('?').unwrap_or((path, ""));
    let segments = path
        .trim_end_matches(".json")
        .split('/')
        .map(str::to_string)
        .collect();
    let params = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            let v = urlencoding::decode(v).map(|v| v.into_owned()).unwrap_or_default();
            (k.to_string(), v)
        })
        .collect();
    (segments, params)
}

fn singular(collection: &str) -> String {
    let root = collection.rsplit('/').next().unwrap_or(collection);
    root.strip_suffix('s').unwrap_or(root).to_string()
}

fn numeric_id(record: &Value) -> u64 {
    match record.get("id") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

fn same_id(record: &Value, id: &str) -> bool {
    match record.get("id") {
        Some(Value::Number(n)) => n.to_string() == id,
        Some(Value::String(s)) => s == id,
        _ => false,
    }
}

fn status(code: u16, path: &str) -> AdminError {
    AdminError::Status {
        status: code,
        body: format!("{{\"errors\":\"{}\"}}", path),
    }
}

fn failing(prefixes: &BTreeSet<String>, path: &str) -> bool {
    prefixes.iter().any(|p| path.starts_with(p.as_str()))
}

/// Collections named by a single-record lookup. `collections/7` spans both sub-types.
fn lookup_collections(collection: &str) -> Vec<String> {
    if collection == "collections" {
        vec!["custom_collections".to_string(), "smart_collections".to_string()]
    } else {
        vec![collection.to_string()]
    }
}

fn paginate(items: Vec<Value>, variables: &Value) -> Value {
    let total = items.len();
    let first = variables["first"].as_u64().unwrap_or(250) as usize;
    let start = variables["after"]
        .as_str()
        .and_then(|c| c.strip_prefix("cursor-"))
        .and_then(|n| n.parse::<usize>().ok())
        .map(|n| n + 1)
        .unwrap_or(0);

    let edges: Vec<Value> = items
        .into_iter()
        .enumerate()
        .skip(start)
        .take(first)
        .map(|(i, node)| json!({"cursor": format!("cursor-{}", i), "node": node}))
        .collect();
    let seen = start + edges.len();
    let end_cursor = edges.last().map(|e| e["cursor"].clone()).unwrap_or(Value::Null);

    json!({
        "edges": edges,
        "pageInfo": {"hasNextPage": seen < total, "endCursor": end_cursor}
    })
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn get(&self, conn: &Connection, path: &str) -> Result<Value, AdminError> {
        self.reads
            .lock()
            .unwrap()
            .push((conn.url.clone(), path.to_string()));
        let (segments, params) = split(path);
        self.with_store(&conn.url, |store| {
            if failing(&store.failing_gets, path) {
                return Err(status(500, path));
            }

            if segments.len() % 2 == 1 {
                let collection = segments.join("/");
                let root = segments.last().cloned().unwrap_or_default();
                let mut items: Vec<Value> = store
                    .rest
                    .get(&collection)
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|r| match params.get("handle") {
                        Some(handle) => {
                            r.get("handle").and_then(Value::as_str) == Some(handle.as_str())
                        }
                        None => true,
                    })
                    .collect();
                items.sort_by_key(numeric_id);
                if let Some(since) = params.get("since_id").and_then(|s| s.parse::<u64>().ok()) {
                    items.retain(|r| numeric_id(r) > since);
                }
                if let Some(limit) = params.get("limit").and_then(|l| l.parse::<usize>().ok()) {
                    items.truncate(limit);
                }
                let mut response = serde_json::Map::new();
                response.insert(root, Value::Array(items));
                return Ok(Value::Object(response));
            }

            let (id, parent) = segments.split_last().expect("even segment count");
            let collection = parent.join("/");
            for name in lookup_collections(&collection) {
                if let Some(found) = store
                    .rest
                    .get(&name)
                    .and_then(|items| items.iter().find(|r| same_id(r, id)))
                {
                    return Ok(json!({ singular(&collection): found }));
                }
            }
            Err(status(404, path))
        })
    }

    async fn post(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        self.log_write(&conn.url, "POST", path);
        let (segments, _) = split(path);
        let collection = segments.join("/");
        let key = singular(&collection);
        let id = self.fresh_id();

        self.with_store(&conn.url, |store| {
            if failing(&store.failing_writes, path) {
                return Err(status(422, path));
            }
            let mut record = body.get(&key).cloned().ok_or_else(|| status(400, path))?;
            record["id"] = json!(id);
            store
                .rest
                .entry(collection.clone())
                .or_default()
                .push(record.clone());
            Ok(json!({ key: record }))
        })
    }

    async fn put(&self, conn: &Connection, path: &str, body: &Value) -> Result<Value, AdminError> {
        self.log_write(&conn.url, "PUT", path);
        let (segments, _) = split(path);
        let (id, parent) = segments.split_last().ok_or_else(|| status(400, path))?;
        let collection = parent.join("/");
        let key = singular(&collection);

        self.with_store(&conn.url, |store| {
            if failing(&store.failing_writes, path) {
                return Err(status(422, path));
            }
            let Some(Value::Object(changes)) = body.get(&key) else {
                return Err(status(400, path));
            };
            let record = store
                .rest
                .get_mut(&collection)
                .and_then(|items| items.iter_mut().find(|r| same_id(r, id)))
                .ok_or_else(|| status(404, path))?;
            for (field, value) in changes {
                record[field.as_str()] = value.clone();
            }
            Ok(json!({ key: record.clone() }))
        })
    }

    async fn graphql(
        &self,
        conn: &Connection,
        query: &str,
        variables: Option<Value>,
    ) -> Result<Value, AdminError> {
        let variables = variables.unwrap_or_else(|| json!({}));
        let operation = [
            "MetaobjectDefinitionCreate",
            "MetaobjectDefinitions",
            "MetaobjectCreate",
            "MetaobjectUpdate",
            "Metaobjects",
        ]
        .into_iter()
        .find(|name| {
            query.contains(&format!("query {}(", name))
                || query.contains(&format!("mutation {}(", name))
        })
        .ok_or_else(|| AdminError::GraphQl("unknown operation".to_string()))?;

        if query.contains("mutation ") {
            self.log_write(&conn.url, "graphql", operation);
        }
        let id = self.fresh_id();

        self.with_store(&conn.url, |store| {
            if store.failing_graphql.contains(operation) {
                return Err(AdminError::GraphQl(format!("{} failed", operation)));
            }
            let root = {
                let mut chars = operation.chars();
                let first = chars.next().map(|c| c.to_ascii_lowercase()).unwrap_or_default();
                format!("{}{}", first, chars.as_str())
            };
            if store.rejected_mutations.contains(operation) {
                return Ok(json!({"data": {root: {
                    "userErrors": [{"field": ["type"], "message": "rejected", "code": "INVALID"}]
                }}}));
            }

            match operation {
                "MetaobjectDefinitions" => {
                    let page = paginate(store.definitions.clone(), &variables);
                    Ok(json!({"data": {"metaobjectDefinitions": page}}))
                }
                "Metaobjects" => {
                    let type_name = variables["type"].as_str().unwrap_or_default();
                    let items: Vec<Value> = store
                        .entries
                        .iter()
                        .filter(|e| e["type"] == type_name)
                        .cloned()
                        .collect();
                    Ok(json!({"data": {"metaobjects": paginate(items, &variables)}}))
                }
                "MetaobjectDefinitionCreate" => {
                    let mut definition = variables["definition"].clone();
                    definition["id"] = json!(format!("gid://target/MetaobjectDefinition/{}", id));
                    store.definitions.push(definition.clone());
                    Ok(json!({"data": {"metaobjectDefinitionCreate": {
                        "metaobjectDefinition": {
                            "id": definition["id"],
                            "type": definition["type"]
                        },
                        "userErrors": []
                    }}}))
                }
                "MetaobjectCreate" => {
                    let input = &variables["metaobject"];
                    let entry = json!({
                        "id": format!("gid://target/Metaobject/{}", id),
                        "handle": input["handle"],
                        "type": input["type"],
                        "fields": input["fields"],
                    });
                    store.entries.push(entry.clone());
                    Ok(json!({"data": {"metaobjectCreate": {
                        "metaobject": {"id": entry["id"], "handle": entry["handle"]},
                        "userErrors": []
                    }}}))
                }
                "MetaobjectUpdate" => {
                    let target_id = variables["id"].as_str().unwrap_or_default();
                    let Some(entry) = store.entries.iter_mut().find(|e| e["id"] == target_id) else {
                        return Ok(json!({"data": {"metaobjectUpdate": {
                            "metaobject": null,
                            "userErrors": [{"field": ["id"], "message": "not found"}]
                        }}}));
                    };
                    entry["fields"] = variables["metaobject"]["fields"].clone();
                    Ok(json!({"data": {"metaobjectUpdate": {
                        "metaobject": {"id": entry["id"], "handle": entry["handle"]},
                        "userErrors": []
                    }}}))
                }
                other => Err(AdminError::GraphQl(format!("unhandled {}", other))),
            }
        })
    }
}
