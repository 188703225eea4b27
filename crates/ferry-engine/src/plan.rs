//! Multi-kind migrations.
//!
//! A plan runs one engine pass per selected kind in dependency order, then
//! one metafield pass per owner type, and sums the summaries.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ferry_admin::{AdminApi, Connection};

use crate::engine::Migrator;
use crate::model::{ConflictMode, ConflictPolicy, EntityKind, MigrationRequest, OwnerType};
use crate::{MigrationOutcome, Summary};

/// Items of one kind to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub kind: EntityKind,
    pub item_ids: BTreeSet<String>,
}

/// Owners whose metafields to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldSelection {
    pub owner_type: OwnerType,
    pub item_ids: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub source: Connection,
    pub target: Connection,
    #[serde(default)]
    pub selections: Vec<Selection>,
    #[serde(default)]
    pub metafields: Vec<MetafieldSelection>,
    #[serde(default)]
    pub conflict_mode: ConflictMode,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resolutions: BTreeMap<String, ConflictPolicy>,
}

impl MigrationPlan {
    /// One request per pass, in execution order.
    ///
    /// Definitions come before anything that may reference them, and
    /// metafields come last so their owners already exist on the target.
    pub fn requests(&self) -> Vec<MigrationRequest> {
        let mut selections: Vec<&Selection> = self.selections.iter().collect();
        selections.sort_by_key(|s| s.kind);
        let mut owners: Vec<&MetafieldSelection> = self.metafields.iter().collect();
        owners.sort_by_key(|m| m.owner_type);

        let kinds = selections
            .into_iter()
            .map(|s| self.request(s.kind, &s.item_ids, None));
        let metafields = owners.into_iter().map(|m| {
            self.request(EntityKind::Metafields, &m.item_ids, Some(m.owner_type))
        });
        kinds.chain(metafields).collect()
    }

    fn request(
        &self,
        kind: EntityKind,
        ids: &BTreeSet<String>,
        owner: Option<OwnerType>,
    ) -> MigrationRequest {
        let mut request = MigrationRequest::new(
            self.source.clone(),
            self.target.clone(),
            kind,
            ids.iter().cloned(),
        )
        .with_mode(self.conflict_mode)
        .with_dry_run(self.dry_run);
        request.owner_type_hint = owner;
        request.resolutions = self
            .resolutions
            .iter()
            .filter(|(id, _)| ids.contains(*id))
            .map(|(id, policy)| (id.clone(), *policy))
            .collect();
        request
    }
}

/// Result of one pass: its outcome, or the error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub kind: EntityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_type: Option<OwnerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MigrationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passes: Vec<PassReport>,
    /// Sum over every pass that produced an outcome.
    pub summary: Summary,
}

impl PlanReport {
    pub fn failed_passes(&self) -> usize {
        self.passes.iter().filter(|p| p.error.is_some()).count()
    }
}

impl<A: AdminApi> Migrator<A> {
    /// Run every pass of `plan`. A failed pass is reported and does not stop later passes.
    pub async fn run_plan(&self, plan: &MigrationPlan) -> PlanReport {
        let started_at = Utc::now();
        let mut passes = Vec::new();

        for request in plan.requests() {
            let kind = request.entity_kind;
            let owner_type = request.owner_type_hint;
            let pass = match self.migrate(&request).await {
                Ok(outcome) => PassReport {
                    kind,
                    owner_type,
                    outcome: Some(outcome),
                    error: None,
                },
                Err(e) => {
                    warn!(kind = %kind, error = %e, "pass failed");
                    PassReport {
                        kind,
                        owner_type,
                        outcome: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            passes.push(pass);
        }

        let summary: Summary = passes
            .iter()
            .filter_map(|p| p.outcome.as_ref().map(|o| o.summary))
            .sum();
        info!(
            passes = passes.len(),
            total = summary.total,
            errors = summary.errors,
            "plan finished"
        );

        PlanReport {
            started_at,
            finished_at: Utc::now(),
            passes,
            summary,
        }
    }
}
