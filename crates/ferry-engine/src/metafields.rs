//! Metafield copy for one owner type.
//!
//! Metafields hang off an owner, so each requested source owner is first
//! resolved to its target counterpart by handle. Metafields are never created
//! without a resolved owner.

use serde_json::{Value, json};
use tracing::{info, instrument};

use ferry_admin::{AdminApi, AdminError, Connection};

use crate::conflict::{Action, ConflictResolver};
use crate::entities::{create_record, update_record};
use crate::fetcher::Fetcher;
use crate::matcher::Matcher;
use crate::model::{MigrationRequest, OwnerType};
use crate::record::{handle_of, id_of, title_of};
use crate::{ItemResult, ItemStatus, MigrateError, MigrationOutcome, ResultLog, Summary};

pub(crate) const NO_METAFIELDS: &str = "no metafields";
pub(crate) const NO_HANDLE: &str = "no handle found";
pub(crate) const TARGET_NOT_FOUND: &str = "target resource not found";

pub struct MetafieldSynchronizer<'a> {
    api: &'a dyn AdminApi,
    fetcher: &'a Fetcher<'a>,
    resolver: &'a ConflictResolver,
}

impl<'a> MetafieldSynchronizer<'a> {
    pub fn new(
        api: &'a dyn AdminApi,
        fetcher: &'a Fetcher<'a>,
        resolver: &'a ConflictResolver,
    ) -> Self {
        Self {
            api,
            fetcher,
            resolver,
        }
    }

    #[instrument(skip_all, fields(owner = %owner, items = request.item_ids.len()))]
    pub async fn run(
        &self,
        owner: OwnerType,
        request: &MigrationRequest,
    ) -> Result<MigrationOutcome, MigrateError> {
        let mut log = ResultLog::new();
        for id in &request.item_ids {
            let result = self.sync_owner(owner, id, request).await?;
            log.push(result);
        }
        Ok(log.finish())
    }

    /// One aggregated result for all metafields of source owner `id`.
    async fn sync_owner(
        &self,
        owner: OwnerType,
        id: &str,
        request: &MigrationRequest,
    ) -> Result<ItemResult, MigrateError> {
        let fields = match self.fetcher.metafields(&request.source, owner, id).await {
            Ok(fields) => fields,
            Err(e) => {
                return Ok(ItemResult::new(id, id, ItemStatus::Error)
                    .with_message(format!("failed to fetch metafields: {}", e)));
            }
        };
        if fields.is_empty() {
            return Ok(ItemResult::new(id, id, ItemStatus::Skipped).with_message(NO_METAFIELDS));
        }

        let item = match self.fetcher.item(&request.source, owner, id).await {
            Ok(item) => item,
            Err(e) => {
                return Ok(ItemResult::new(id, id, ItemStatus::Error)
                    .with_message(format!("failed to fetch {}: {}", owner.singular(), e)));
            }
        };
        let title = title_of(&item);
        let Some(handle) = handle_of(&item) else {
            return Ok(ItemResult::new(id, title, ItemStatus::Error).with_message(NO_HANDLE));
        };

        let target_owner = match self
            .fetcher
            .find_owner_by_handle(&request.target, owner, handle)
            .await
        {
            Ok(Some(found)) => found,
            Ok(None) => {
                return Ok(
                    ItemResult::new(id, title, ItemStatus::Error).with_message(TARGET_NOT_FOUND)
                );
            }
            Err(e) => {
                return Ok(ItemResult::new(id, title, ItemStatus::Error)
                    .with_message(format!("{}: {}", TARGET_NOT_FOUND, e)));
            }
        };
        let Some(target_id) = id_of(&target_owner) else {
            return Ok(ItemResult::new(id, title, ItemStatus::Error).with_message(TARGET_NOT_FOUND));
        };

        let existing = self.fetcher.degrade(
            "metafields",
            self.fetcher
                .metafields(&request.target, owner, &target_id)
                .await,
        )?;
        let matcher = Matcher::by_namespace_key(&existing);
        let collection = format!("{}/{}/metafields", owner.resource(), target_id);

        let mut tally = Summary::default();
        let mut failures = Vec::new();
        for field in &fields {
            let found = matcher.find(field);
            let action = self.resolver.resolve(id, found.is_some());
            match self
                .write_field(&request.target, &collection, field, found, action)
                .await
            {
                Ok(status) => tally.record(status),
                Err(e) => {
                    tally.record(ItemStatus::Error);
                    failures.push(format!("{}: {}", field_label(field), e));
                }
            }
        }
        info!(
            owner = %owner,
            handle = %handle,
            created = tally.created,
            updated = tally.updated,
            errors = tally.errors,
            "metafields synced"
        );

        Ok(aggregate(id, title, &tally, &failures, self.resolver.dry_run()))
    }

    async fn write_field(
        &self,
        target: &Connection,
        collection: &str,
        field: &Value,
        found: Option<&Value>,
        action: Action,
    ) -> Result<ItemStatus, AdminError> {
        match (action, found) {
            (Action::Create, _) => {
                let body = json!({
                    "namespace": field.get("namespace"),
                    "key": field.get("key"),
                    "value": field.get("value"),
                    "type": value_type(field),
                });
                create_record(self.api, target, collection, "metafield", body).await?;
                Ok(ItemStatus::Created)
            }
            (Action::Update, Some(existing)) => {
                let target_id = existing.get("id").ok_or_else(|| {
                    AdminError::InvalidResponse("target metafield has no id".to_string())
                })?;
                let body = json!({
                    "value": field.get("value"),
                    "type": value_type(field),
                });
                update_record(self.api, target, collection, "metafield", target_id, body).await?;
                Ok(ItemStatus::Updated)
            }
            (Action::Update, None) | (Action::Skip, _) => Ok(ItemStatus::Skipped),
            (Action::Simulate(status), _) => Ok(status),
        }
    }
}

/// `type`, or the older `value_type` some stores still return.
fn value_type(field: &Value) -> Option<&Value> {
    field
        .get("type")
        .filter(|t| !t.is_null())
        .or_else(|| field.get("value_type"))
}

fn field_label(field: &Value) -> String {
    let part = |key: &str| field.get(key).and_then(Value::as_str).unwrap_or("?");
    format!("{}.{}", part("namespace"), part("key"))
}

/// Roll per-field counts into the owner's result.
///
/// The status is `error` when any field failed and `created` otherwise, even
/// when every field was an update.
fn aggregate(
    id: &str,
    title: String,
    tally: &Summary,
    failures: &[String],
    dry_run: bool,
) -> ItemResult {
    let status = if tally.errors > 0 {
        ItemStatus::Error
    } else {
        ItemStatus::Created
    };
    let mut message = format!(
        "{} created, {} updated, {} skipped, {} errors",
        tally.created, tally.updated, tally.skipped, tally.errors
    );
    if dry_run {
        message.insert_str(0, "dry run: ");
    }
    for failure in failures {
        message.push_str("; ");
        message.push_str(failure);
    }
    ItemResult::new(id, title, status).with_message(message)
}
