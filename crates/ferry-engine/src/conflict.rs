//! Maps (existing?, conflict policy, dry run) to the action taken for one item.

use std::collections::BTreeMap;

use crate::model::{ConflictMode, ConflictPolicy, MigrationRequest};
use crate::{ItemStatus, MigrateError};

/// What to do with one source item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Skip,
    /// Dry run: report the predicted status and write nothing.
    Simulate(ItemStatus),
}

impl Action {
    pub fn writes(&self) -> bool {
        matches!(self, Action::Create | Action::Update)
    }
}

/// The decision table.
///
/// A dry run predicts `created` for unmatched items and `updated` for matched
/// ones under every policy, so it never predicts `skipped`.
pub fn decide(existing: bool, policy: ConflictPolicy, dry_run: bool) -> Action {
    match (existing, dry_run, policy) {
        (false, true, _) => Action::Simulate(ItemStatus::Created),
        (true, true, _) => Action::Simulate(ItemStatus::Updated),
        (false, false, _) => Action::Create,
        (true, false, ConflictPolicy::Skip) => Action::Skip,
        (true, false, ConflictPolicy::Overwrite) => Action::Update,
    }
}

/// Per-request resolver: the request-wide policy plus per-item overrides.
///
/// Decisions are keyed by the requested source id. Sub-items discovered
/// during the call (metaobject entries, metafields, articles) use the
/// decision of the requested item they belong to.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    default: ConflictPolicy,
    overrides: BTreeMap<String, ConflictPolicy>,
    dry_run: bool,
}

impl ConflictResolver {
    pub fn new(default: ConflictPolicy, dry_run: bool) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
            dry_run,
        }
    }

    /// Build the resolver for a request.
    ///
    /// `ask` is only accepted when every requested id has a resolution; the
    /// core never guesses a policy for an unanswered conflict.
    pub fn for_request(request: &MigrationRequest) -> Result<Self, MigrateError> {
        let default = match request.conflict_mode {
            ConflictMode::Overwrite => ConflictPolicy::Overwrite,
            ConflictMode::Skip => ConflictPolicy::Skip,
            ConflictMode::Ask => {
                let missing: Vec<String> = request
                    .item_ids
                    .iter()
                    .filter(|id| !request.resolutions.contains_key(*id))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    return Err(MigrateError::UnresolvedConflicts { ids: missing });
                }
                // Unreachable for requested ids once every one is resolved.
                ConflictPolicy::Skip
            }
        };

        Ok(Self {
            default,
            overrides: request.resolutions.clone(),
            dry_run: request.dry_run,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn policy_for(&self, id: &str) -> ConflictPolicy {
        self.overrides.get(id).copied().unwrap_or(self.default)
    }

    /// Action for an item belonging to requested id `id`.
    pub fn resolve(&self, id: &str, existing: bool) -> Action {
        decide(existing, self.policy_for(id), self.dry_run)
    }
}
