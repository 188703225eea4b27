//! Generic migration of products, collections, pages and blogs.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use ferry_admin::{AdminApi, AdminError, Connection};

use crate::cleaner::{RecordKind, clean};
use crate::conflict::{Action, ConflictResolver};
use crate::fetcher::{CollectionType, Fetcher};
use crate::matcher::Matcher;
use crate::model::{MigrationRequest, OwnerType};
use crate::record::{id_of, root_object, title_of};
use crate::{ItemResult, ItemStatus, MigrateError, MigrationOutcome, ResultLog};

pub(crate) const NOT_FOUND_ON_SOURCE: &str = "not found on source store";
pub(crate) const ALREADY_EXISTS: &str = "already exists on target";

/// Message for a simulated action.
pub(crate) fn dry_run_message(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Updated => "dry run: would update",
        _ => "dry run: would create",
    }
}

/// `{ "<singular>": body }`
pub(crate) fn envelope(singular: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(singular.to_string(), body);
    Value::Object(map)
}

/// POST `body` to `{collection}.json`, returning the new record's id when the store reports one.
pub(crate) async fn create_record(
    api: &dyn AdminApi,
    conn: &Connection,
    collection: &str,
    singular: &str,
    body: Value,
) -> Result<Option<String>, AdminError> {
    let path = format!("{}.json", collection);
    let response = api.post(conn, &path, &envelope(singular, body)).await?;
    Ok(root_object(response, singular).ok().as_ref().and_then(id_of))
}

/// PUT `body` to `{collection}/{id}.json`, carrying the target id in the body.
pub(crate) async fn update_record(
    api: &dyn AdminApi,
    conn: &Connection,
    collection: &str,
    singular: &str,
    target_id: &Value,
    mut body: Value,
) -> Result<(), AdminError> {
    let id = match target_id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if let Value::Object(map) = &mut body {
        map.insert("id".to_string(), target_id.clone());
    }
    let path = format!("{}/{}.json", collection, id);
    api.put(conn, &path, &envelope(singular, body)).await?;
    Ok(())
}

fn record_kind(owner: OwnerType) -> RecordKind {
    match owner {
        OwnerType::Products => RecordKind::Product,
        OwnerType::Collections => RecordKind::Collection,
        OwnerType::Pages => RecordKind::Page,
        OwnerType::Blogs => RecordKind::Blog,
    }
}

/// REST collection and root key a record is written through.
///
/// Collections are split by sub-type, so the record decides which resource is used.
fn endpoint(owner: OwnerType, record: &Value) -> (&'static str, &'static str) {
    match owner {
        OwnerType::Collections => {
            let ty = CollectionType::of(record);
            (ty.resource(), ty.singular())
        }
        other => (other.resource(), other.singular()),
    }
}

/// Per-blog article counts, reported in the blog's result message.
#[derive(Debug, Default)]
struct ArticleTally {
    created: usize,
    updated: usize,
    skipped: usize,
    failures: Vec<String>,
}

impl ArticleTally {
    fn record(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Created => self.created += 1,
            ItemStatus::Updated => self.updated += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Error => {}
        }
    }

    fn describe(&self) -> String {
        let mut line = format!(
            "articles: {} created, {} updated, {} skipped, {} errors",
            self.created,
            self.updated,
            self.skipped,
            self.failures.len()
        );
        for failure in &self.failures {
            line.push_str("; ");
            line.push_str(failure);
        }
        line
    }
}

pub struct EntityMigrator<'a> {
    api: &'a dyn AdminApi,
    fetcher: &'a Fetcher<'a>,
    resolver: &'a ConflictResolver,
    dedupe_articles: bool,
}

impl<'a> EntityMigrator<'a> {
    pub fn new(
        api: &'a dyn AdminApi,
        fetcher: &'a Fetcher<'a>,
        resolver: &'a ConflictResolver,
    ) -> Self {
        Self {
            api,
            fetcher,
            resolver,
            dedupe_articles: false,
        }
    }

    /// Match blog articles by handle instead of always creating them.
    pub fn dedupe_articles(mut self, dedupe: bool) -> Self {
        self.dedupe_articles = dedupe;
        self
    }

    #[instrument(skip_all, fields(kind = %owner, items = request.item_ids.len()))]
    pub async fn run(
        &self,
        owner: OwnerType,
        request: &MigrationRequest,
    ) -> Result<MigrationOutcome, MigrateError> {
        let source = self.fetcher.fetch_owners(&request.source, owner).await?;
        let targets = self.fetcher.degrade(
            owner.resource(),
            self.fetcher.fetch_owners(&request.target, owner).await,
        )?;
        info!(source = source.len(), target = targets.len(), "fetched collections");

        let matcher = Matcher::by_handle(&targets);
        let mut log = ResultLog::new();

        for id in &request.item_ids {
            let Some(item) = source
                .iter()
                .find(|s| id_of(s).as_deref() == Some(id.as_str()))
            else {
                log.error(id.as_str(), id.as_str(), NOT_FOUND_ON_SOURCE);
                continue;
            };
            let result = self
                .migrate_item(owner, id, item, matcher.find(item), request)
                .await?;
            log.push(result);
        }

        Ok(log.finish())
    }

    async fn migrate_item(
        &self,
        owner: OwnerType,
        id: &str,
        item: &Value,
        existing: Option<&Value>,
        request: &MigrationRequest,
    ) -> Result<ItemResult, MigrateError> {
        let title = title_of(item);
        let target = &request.target;

        // Articles are read before the blog is written, so a blog whose
        // articles cannot be listed is not half migrated.
        let articles = if owner == OwnerType::Blogs {
            match self.fetcher.articles(&request.source, id).await {
                Ok(articles) => articles,
                Err(e) => {
                    return Ok(ItemResult::new(id, title, ItemStatus::Error)
                        .with_message(format!("failed to list articles: {}", e)));
                }
            }
        } else {
            Vec::new()
        };

        let cleaned = clean(record_kind(owner), item);
        let action = self.resolver.resolve(id, existing.is_some());
        debug!(id = %id, ?action, "resolved");

        let (mut result, target_id) = match (action, existing) {
            (Action::Create, _) => {
                let (collection, singular) = endpoint(owner, item);
                match create_record(self.api, target, collection, singular, cleaned).await {
                    Ok(new_id) => (ItemResult::new(id, &title, ItemStatus::Created), new_id),
                    Err(e) => {
                        return Ok(ItemResult::new(id, title, ItemStatus::Error)
                            .with_message(e.to_string()));
                    }
                }
            }
            (Action::Update, Some(found)) => {
                let Some(target_id) = found.get("id").filter(|v| !v.is_null()) else {
                    return Ok(ItemResult::new(id, title, ItemStatus::Error)
                        .with_message("matched target record has no id"));
                };
                let (collection, singular) = endpoint(owner, found);
                let written =
                    update_record(self.api, target, collection, singular, target_id, cleaned)
                        .await;
                match written {
                    Ok(()) => (ItemResult::new(id, &title, ItemStatus::Updated), id_of(found)),
                    Err(e) => {
                        return Ok(ItemResult::new(id, title, ItemStatus::Error)
                            .with_message(e.to_string()));
                    }
                }
            }
            (Action::Skip, found) => (
                ItemResult::new(id, &title, ItemStatus::Skipped).with_message(ALREADY_EXISTS),
                found.and_then(id_of),
            ),
            (Action::Simulate(status), found) => (
                ItemResult::new(id, &title, status).with_message(dry_run_message(status)),
                found.and_then(id_of),
            ),
            (Action::Update, None) => {
                return Ok(ItemResult::new(id, title, ItemStatus::Error)
                    .with_message("no target record to update"));
            }
        };

        if owner == OwnerType::Blogs {
            let tally = self
                .sync_articles(target, id, target_id.as_deref(), &articles)
                .await?;
            let message = match result.message.take() {
                Some(message) => format!("{}; {}", message, tally.describe()),
                None => tally.describe(),
            };
            result = result.with_message(message);
        }

        Ok(result)
    }

    /// Replay a blog's articles under its target counterpart.
    ///
    /// Without article de-duplication every article is created, including on
    /// a re-run against an already migrated blog.
    async fn sync_articles(
        &self,
        target: &Connection,
        blog_source_id: &str,
        target_blog_id: Option<&str>,
        articles: &[Value],
    ) -> Result<ArticleTally, MigrateError> {
        let mut tally = ArticleTally::default();

        let Some(blog_id) = target_blog_id else {
            if self.resolver.dry_run() {
                tally.created = articles.len();
            } else if !articles.is_empty() {
                tally
                    .failures
                    .push("target blog id unknown, articles not migrated".to_string());
            }
            return Ok(tally);
        };

        let existing = if self.dedupe_articles {
            self.fetcher
                .degrade("articles", self.fetcher.articles(target, blog_id).await)?
        } else {
            Vec::new()
        };
        let matcher = Matcher::by_handle(&existing);
        let collection = format!("blogs/{}/articles", blog_id);

        for article in articles {
            let title = title_of(article);
            let found = if self.dedupe_articles {
                matcher.find(article)
            } else {
                None
            };
            let cleaned = clean(RecordKind::Article, article);
            let action = self.resolver.resolve(blog_source_id, found.is_some());

            let written = match (action, found) {
                (Action::Create, _) => {
                    create_record(self.api, target, &collection, "article", cleaned)
                        .await
                        .map(|_| ItemStatus::Created)
                }
                (Action::Update, Some(found)) => match found.get("id") {
                    Some(target_id) => {
                        update_record(self.api, target, &collection, "article", target_id, cleaned)
                            .await
                            .map(|()| ItemStatus::Updated)
                    }
                    None => Err(AdminError::InvalidResponse(
                        "matched article has no id".to_string(),
                    )),
                },
                (Action::Update, None) | (Action::Skip, _) => Ok(ItemStatus::Skipped),
                (Action::Simulate(status), _) => Ok(status),
            };

            match written {
                Ok(status) => tally.record(status),
                Err(e) => tally.failures.push(format!("{}: {}", title, e)),
            }
        }

        debug!(
            blog = %blog_id,
            created = tally.created,
            failed = tally.failures.len(),
            "articles synced"
        );
        Ok(tally)
    }
}
