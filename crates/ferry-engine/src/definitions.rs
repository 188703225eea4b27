//! Dependency-ordered migration of metaobject definitions and their entries.
//!
//! Each selected definition walks a small state machine:
//!
//! ```text
//! DefineTarget ──exists / created──▶ SyncEntries ──▶ Done
//!       │
//!       └──create failed──▶ Halted ──▶ Done
//! ```
//!
//! No entry of a type is written before its definition is known to exist on
//! the target, and a failed definition create never reaches `SyncEntries`.

use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use ferry_admin::graphql::{join_user_errors, user_errors};
use ferry_admin::{AdminApi, AdminError, Connection};

use crate::conflict::{Action, ConflictResolver};
use crate::entities::{ALREADY_EXISTS, NOT_FOUND_ON_SOURCE, dry_run_message};
use crate::fetcher::Fetcher;
use crate::matcher::Matcher;
use crate::model::{MetaobjectDefinition, MetaobjectEntry, MigrationRequest};
use crate::{ItemResult, ItemStatus, MigrateError, MigrationOutcome, ResultLog, queries};

pub(crate) const DEFINITION_EXISTS: &str = "definition already exists on target";

/// Where one definition is in its migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    DefineTarget,
    /// `target_exists` is false only in a dry run whose definition would be created.
    SyncEntries { target_exists: bool },
    /// The definition could not be created; its entries are never attempted.
    Halted,
    Done,
}

pub struct DefinitionSynchronizer<'a> {
    api: &'a dyn AdminApi,
    fetcher: &'a Fetcher<'a>,
    resolver: &'a ConflictResolver,
}

impl<'a> DefinitionSynchronizer<'a> {
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

    #[instrument(skip_all, fields(items = request.item_ids.len()))]
    pub async fn run(&self, request: &MigrationRequest) -> Result<MigrationOutcome, MigrateError> {
        let source = self.fetcher.definitions(&request.source).await?;
        let targets = self.fetcher.degrade(
            "metaobject definitions",
            self.fetcher.definitions(&request.target).await,
        )?;
        info!(source = source.len(), target = targets.len(), "fetched definitions");

        let mut log = ResultLog::new();
        for id in &request.item_ids {
            let Some(definition) = source.iter().find(|d| &d.id == id) else {
                log.error(id.as_str(), id.as_str(), NOT_FOUND_ON_SOURCE);
                continue;
            };
            self.migrate_definition(id, definition, &targets, request, &mut log)
                .await?;
        }

        Ok(log.finish())
    }

    /// Walk one definition through its phases.
    ///
    /// The definition's own result is logged ahead of its entries, and is
    /// turned into an error when the source entries cannot be listed.
    async fn migrate_definition(
        &self,
        id: &str,
        definition: &MetaobjectDefinition,
        targets: &[MetaobjectDefinition],
        request: &MigrationRequest,
        log: &mut ResultLog,
    ) -> Result<(), MigrateError> {
        let mut phase = Phase::DefineTarget;
        let mut own: Option<ItemResult> = None;
        loop {
            phase = match phase {
                Phase::DefineTarget => {
                    let (result, next) = self
                        .define_target(id, definition, targets, &request.target)
                        .await;
                    own = Some(result);
                    next
                }
                Phase::SyncEntries { target_exists } => {
                    let type_name = definition.type_name.as_str();
                    match self.fetcher.entries(&request.source, type_name).await {
                        Ok(entries) => {
                            if let Some(result) = own.take() {
                                log.push(result);
                            }
                            self.sync_entries(type_name, id, &entries, target_exists, request, log)
                                .await?;
                        }
                        Err(e) => {
                            own = own.map(|result| entries_unlisted(result, &e));
                        }
                    }
                    Phase::Done
                }
                Phase::Halted => {
                    warn!(
                        definition = %definition.type_name,
                        "definition not created, skipping its entries"
                    );
                    Phase::Done
                }
                Phase::Done => {
                    if let Some(result) = own.take() {
                        log.push(result);
                    }
                    return Ok(());
                }
            };
        }
    }

    async fn define_target(
        &self,
        id: &str,
        definition: &MetaobjectDefinition,
        targets: &[MetaobjectDefinition],
        target: &Connection,
    ) -> (ItemResult, Phase) {
        let name = definition.name.as_str();

        if Matcher::definitions(targets).find(definition).is_some() {
            return (
                ItemResult::new(id, name, ItemStatus::Skipped).with_message(DEFINITION_EXISTS),
                Phase::SyncEntries {
                    target_exists: true,
                },
            );
        }

        if self.resolver.dry_run() {
            return (
                ItemResult::new(id, name, ItemStatus::Created)
                    .with_message(dry_run_message(ItemStatus::Created)),
                Phase::SyncEntries {
                    target_exists: false,
                },
            );
        }

        let variables = json!({ "definition": definition_input(definition) });
        let response = self
            .api
            .graphql(target, queries::METAOBJECT_DEFINITION_CREATE, Some(variables))
            .await;
        match mutation_result(response, "metaobjectDefinitionCreate") {
            Ok(_) => {
                info!(definition = %definition.type_name, "definition created");
                (
                    ItemResult::new(id, name, ItemStatus::Created),
                    Phase::SyncEntries {
                        target_exists: true,
                    },
                )
            }
            Err(message) => (
                ItemResult::new(id, name, ItemStatus::Error).with_message(message),
                Phase::Halted,
            ),
        }
    }

    async fn sync_entries(
        &self,
        type_name: &str,
        id: &str,
        source: &[MetaobjectEntry],
        target_exists: bool,
        request: &MigrationRequest,
        log: &mut ResultLog,
    ) -> Result<(), MigrateError> {
        let targets = if target_exists {
            self.fetcher.degrade(
                "metaobject entries",
                self.fetcher.entries(&request.target, type_name).await,
            )?
        } else {
            Vec::new()
        };
        info!(
            definition = %type_name,
            source = source.len(),
            target = targets.len(),
            "syncing entries"
        );

        let matcher = Matcher::entries(&targets);
        for entry in source {
            let found = matcher.find(entry);
            let action = self.resolver.resolve(id, found.is_some());
            log.push(self.write_entry(entry, found, action, &request.target).await);
        }
        Ok(())
    }

    async fn write_entry(
        &self,
        entry: &MetaobjectEntry,
        found: Option<&MetaobjectEntry>,
        action: Action,
        target: &Connection,
    ) -> ItemResult {
        let title = entry.display_name.as_deref().unwrap_or(&entry.handle);
        let result = |status| ItemResult::new(entry.id.as_str(), title, status);

        let written = match (action, found) {
            (Action::Create, _) => {
                let variables = json!({
                    "metaobject": {
                        "type": entry.type_name,
                        "handle": entry.handle,
                        "fields": field_inputs(entry),
                    }
                });
                let response = self
                    .api
                    .graphql(target, queries::METAOBJECT_CREATE, Some(variables))
                    .await;
                mutation_result(response, "metaobjectCreate").map(|_| ItemStatus::Created)
            }
            (Action::Update, Some(existing)) => {
                let variables = json!({
                    "id": existing.id,
                    "metaobject": { "fields": field_inputs(entry) }
                });
                let response = self
                    .api
                    .graphql(target, queries::METAOBJECT_UPDATE, Some(variables))
                    .await;
                mutation_result(response, "metaobjectUpdate").map(|_| ItemStatus::Updated)
            }
            (Action::Update, None) => Err("no target entry to update".to_string()),
            (Action::Skip, _) => {
                return result(ItemStatus::Skipped).with_message(ALREADY_EXISTS);
            }
            (Action::Simulate(status), _) => {
                return result(status).with_message(dry_run_message(status));
            }
        };

        match written {
            Ok(status) => result(status),
            Err(message) => result(ItemStatus::Error).with_message(message),
        }
    }
}

/// The definition's result once its source entries turned out to be unreadable.
fn entries_unlisted(result: ItemResult, error: &AdminError) -> ItemResult {
    let before = match &result.message {
        Some(message) => message.clone(),
        None => format!("definition {}", result.status),
    };
    ItemResult::new(result.id, result.title, ItemStatus::Error).with_message(format!(
        "{}; failed to list source entries: {}",
        before, error
    ))
}

/// `MetaobjectDefinitionCreateInput` mapping field definitions one to one.
fn definition_input(definition: &MetaobjectDefinition) -> Value {
    let fields: Vec<Value> = definition
        .field_definitions
        .iter()
        .map(|field| {
            let mut input = json!({
                "key": field.key,
                "name": field.name,
                "type": field.value_type,
                "required": field.required,
            });
            if let Some(description) = &field.description {
                input["description"] = json!(description);
            }
            if !field.validations.is_empty() {
                input["validations"] = json!(field.validations);
            }
            input
        })
        .collect();

    json!({
        "name": definition.name,
        "type": definition.type_name,
        "fieldDefinitions": fields,
    })
}

/// Entry fields with a value. Null and empty values are dropped.
fn field_inputs(entry: &MetaobjectEntry) -> Vec<Value> {
    entry
        .fields
        .iter()
        .filter(|f| f.has_value())
        .map(|f| json!({ "key": f.key, "value": f.value }))
        .collect()
}

/// Collapse a mutation response into success or an error message.
///
/// Non-empty `userErrors` are a failure even though the request itself succeeded.
fn mutation_result(
    response: Result<Value, AdminError>,
    mutation: &str,
) -> Result<Value, String> {
    let response = response.map_err(|e| e.to_string())?;
    let errors = user_errors(&response, mutation);
    if errors.is_empty() {
        Ok(response)
    } else {
        Err(join_user_errors(&errors))
    }
}
