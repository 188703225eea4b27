//! Retrieves whole collections from a store.
//!
//! REST listings are paged with `since_id`, GraphQL connections with their
//! cursor. Source reads propagate their errors. Target reads go through
//! [`Fetcher::degrade`], which applies the configured [`FetchPolicy`].

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use ferry_admin::graphql::{Page, data_at};
use ferry_admin::{AdminApi, AdminError, Connection};

use crate::cleaner::COLLECTION_TYPE_FIELD;
use crate::matcher::Matcher;
use crate::model::{EntityKind, MetaobjectDefinition, MetaobjectEntry, OwnerType};
use crate::record::{id_of, root_list, root_object};
use crate::{FetchPolicy, MigrateError, queries};

/// Collection sub-types, each served by its own REST resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    Custom,
    Smart,
}

impl CollectionType {
    pub fn tag(&self) -> &'static str {
        match self {
            CollectionType::Custom => "custom",
            CollectionType::Smart => "smart",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            CollectionType::Custom => "custom_collections",
            CollectionType::Smart => "smart_collections",
        }
    }

    pub fn singular(&self) -> &'static str {
        match self {
            CollectionType::Custom => "custom_collection",
            CollectionType::Smart => "smart_collection",
        }
    }

    /// Sub-type a fetched collection was tagged with. Untagged means custom.
    pub fn of(record: &Value) -> Self {
        match record.get(COLLECTION_TYPE_FIELD).and_then(Value::as_str) {
            Some("smart") => CollectionType::Smart,
            _ => CollectionType::Custom,
        }
    }
}

pub struct Fetcher<'a> {
    api: &'a dyn AdminApi,
    policy: FetchPolicy,
    page_size: u32,
}

impl<'a> Fetcher<'a> {
    pub fn new(api: &'a dyn AdminApi, policy: FetchPolicy, page_size: u32) -> Self {
        Self {
            api,
            policy,
            page_size,
        }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Apply the fetch policy to a target-side read.
    ///
    /// Best effort turns a failure into an empty collection, so every source
    /// item looks new. Fail-fast aborts the call.
    pub fn degrade<T>(
        &self,
        what: &str,
        result: Result<Vec<T>, AdminError>,
    ) -> Result<Vec<T>, MigrateError> {
        match result {
            Ok(items) => Ok(items),
            Err(e) if self.policy.best_effort => {
                warn!(
                    what = %what,
                    error = %e,
                    "target fetch failed, continuing with an empty target set"
                );
                Ok(Vec::new())
            }
            Err(e) => Err(MigrateError::Target(e)),
        }
    }

    /// Every item of a REST-backed kind. Blogs come without their articles.
    pub async fn fetch_kind(
        &self,
        conn: &Connection,
        kind: EntityKind,
    ) -> Result<Vec<Value>, AdminError> {
        match kind {
            EntityKind::Products => self.list(conn, "products", "products").await,
            EntityKind::Collections => self.collections(conn).await,
            EntityKind::Pages => self.list(conn, "pages", "pages").await,
            EntityKind::Blogs => self.list(conn, "blogs", "blogs").await,
            EntityKind::Metaobjects | EntityKind::Metafields => Err(
                AdminError::InvalidResponse(format!("{} is not a REST collection", kind)),
            ),
        }
    }

    /// Every owner of a metafield owner type.
    pub async fn fetch_owners(
        &self,
        conn: &Connection,
        owner: OwnerType,
    ) -> Result<Vec<Value>, AdminError> {
        self.fetch_kind(conn, owner.entity_kind()).await
    }

    /// Page through `{collection}.json` until a short page comes back.
    ///
    /// Pages are requested in ascending id order, each one starting after the
    /// last id of the previous page.
    async fn list(
        &self,
        conn: &Connection,
        collection: &str,
        root: &str,
    ) -> Result<Vec<Value>, AdminError> {
        let limit = self.page_size as usize;
        let mut items = Vec::new();
        let mut since_id: Option<String> = None;

        loop {
            let path = match &since_id {
                Some(since) => format!(
                    "{}.json?limit={}&since_id={}",
                    collection, self.page_size, since
                ),
                None => format!("{}.json?limit={}", collection, self.page_size),
            };
            let page = root_list(self.api.get(conn, &path).await?, root)?;
            let full = page.len() >= limit;
            let last = page.last().and_then(id_of);
            items.extend(page);

            if !full {
                break;
            }
            match last {
                Some(id) if since_id.as_deref() != Some(id.as_str()) => since_id = Some(id),
                Some(id) => {
                    return Err(AdminError::InvalidResponse(format!(
                        "listing of {} repeated since_id {}",
                        collection, id
                    )));
                }
                None => {
                    return Err(AdminError::InvalidResponse(format!(
                        "listing of {} returned a record without an id",
                        collection
                    )));
                }
            }
        }

        debug!(collection = %collection, count = items.len(), "listed");
        Ok(items)
    }

    /// Custom and smart collections, fetched concurrently and tagged with their sub-type.
    pub async fn collections(&self, conn: &Connection) -> Result<Vec<Value>, AdminError> {
        let (custom, smart) = tokio::join!(
            self.list_collection_type(conn, CollectionType::Custom),
            self.list_collection_type(conn, CollectionType::Smart),
        );
        let mut all = custom?;
        all.extend(smart?);
        Ok(all)
    }

    async fn list_collection_type(
        &self,
        conn: &Connection,
        ty: CollectionType,
    ) -> Result<Vec<Value>, AdminError> {
        let items = self.list(conn, ty.resource(), ty.resource()).await?;
        Ok(items.into_iter().map(|c| tag_collection(c, ty)).collect())
    }

    /// Articles of one blog.
    pub async fn articles(
        &self,
        conn: &Connection,
        blog_id: &str,
    ) -> Result<Vec<Value>, AdminError> {
        self.list(conn, &format!("blogs/{}/articles", blog_id), "articles")
            .await
    }

    /// A single owner record, e.g. `GET products/1.json`.
    pub async fn item(
        &self,
        conn: &Connection,
        owner: OwnerType,
        id: &str,
    ) -> Result<Value, AdminError> {
        let path = format!("{}/{}.json", owner.resource(), id);
        root_object(self.api.get(conn, &path).await?, owner.singular())
    }

    pub async fn metafields(
        &self,
        conn: &Connection,
        owner: OwnerType,
        id: &str,
    ) -> Result<Vec<Value>, AdminError> {
        let collection = format!("{}/{}/metafields", owner.resource(), id);
        self.list(conn, &collection, "metafields").await
    }

    /// Locate an owner on `conn` by handle.
    ///
    /// Tries the handle-filtered listing first, then falls back to scanning the
    /// full collection when the filtered query fails.
    pub async fn find_owner_by_handle(
        &self,
        conn: &Connection,
        owner: OwnerType,
        handle: &str,
    ) -> Result<Option<Value>, AdminError> {
        let candidates = match self.filtered_by_handle(conn, owner, handle).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    owner = %owner,
                    handle = %handle,
                    error = %e,
                    "filtered lookup failed, scanning full collection"
                );
                self.fetch_owners(conn, owner).await?
            }
        };

        // Filters the store does not understand are ignored, so re-check the handle.
        let wanted = json!({ "handle": handle });
        Ok(Matcher::by_handle(&candidates).find(&wanted).cloned())
    }

    async fn filtered_by_handle(
        &self,
        conn: &Connection,
        owner: OwnerType,
        handle: &str,
    ) -> Result<Vec<Value>, AdminError> {
        let handle = urlencoding::encode(handle);
        match owner {
            OwnerType::Collections => {
                let (custom, smart) = tokio::join!(
                    self.filtered(conn, CollectionType::Custom.resource(), &handle),
                    self.filtered(conn, CollectionType::Smart.resource(), &handle),
                );
                let mut all: Vec<Value> = custom?
                    .into_iter()
                    .map(|c| tag_collection(c, CollectionType::Custom))
                    .collect();
                all.extend(
                    smart?
                        .into_iter()
                        .map(|c| tag_collection(c, CollectionType::Smart)),
                );
                Ok(all)
            }
            other => self.filtered(conn, other.resource(), &handle).await,
        }
    }

    async fn filtered(
        &self,
        conn: &Connection,
        resource: &str,
        encoded_handle: &str,
    ) -> Result<Vec<Value>, AdminError> {
        let path = format!("{}.json?handle={}", resource, encoded_handle);
        root_list(self.api.get(conn, &path).await?, resource)
    }

    pub async fn definitions(
        &self,
        conn: &Connection,
    ) -> Result<Vec<MetaobjectDefinition>, AdminError> {
        self.paginate(
            conn,
            queries::METAOBJECT_DEFINITIONS,
            json!({}),
            "metaobjectDefinitions",
        )
        .await
    }

    pub async fn entries(
        &self,
        conn: &Connection,
        type_name: &str,
    ) -> Result<Vec<MetaobjectEntry>, AdminError> {
        self.paginate(
            conn,
            queries::METAOBJECTS,
            json!({ "type": type_name }),
            "metaobjects",
        )
        .await
    }

    /// Follow `pageInfo.hasNextPage` until exhausted, accumulating every node.
    async fn paginate<T: DeserializeOwned>(
        &self,
        conn: &Connection,
        query: &str,
        variables: Value,
        root: &str,
    ) -> Result<Vec<T>, AdminError> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut vars = variables.clone();
            if let Value::Object(map) = &mut vars {
                map.insert("first".to_string(), json!(self.page_size));
                map.insert("after".to_string(), json!(after));
            }

            let response = self.api.graphql(conn, query, Some(vars)).await?;
            let page: Page<T> = data_at(&response, root)?;
            let next = page.next_cursor().map(str::to_string);
            nodes.extend(page.into_nodes());

            match next {
                Some(cursor) if after.as_deref() != Some(cursor.as_str()) => after = Some(cursor),
                Some(cursor) => {
                    return Err(AdminError::InvalidResponse(format!(
                        "pagination of {} repeated cursor {}",
                        root, cursor
                    )));
                }
                None => break,
            }
        }

        debug!(root = %root, count = nodes.len(), "paginated");
        Ok(nodes)
    }
}

fn tag_collection(mut collection: Value, ty: CollectionType) -> Value {
    if let Value::Object(map) = &mut collection {
        map.insert(COLLECTION_TYPE_FIELD.to_string(), json!(ty.tag()));
    }
    collection
}
