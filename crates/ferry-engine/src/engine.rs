//! The migration entry point.

use tracing::{info, instrument};

use ferry_admin::AdminApi;

use crate::conflict::ConflictResolver;
use crate::definitions::DefinitionSynchronizer;
use crate::entities::EntityMigrator;
use crate::fetcher::Fetcher;
use crate::metafields::MetafieldSynchronizer;
use crate::model::{EntityKind, MigrationRequest, OwnerType};
use crate::{EngineConfig, MigrateError, MigrationOutcome};

/// Runs migration requests against the stores reachable through `A`.
pub struct Migrator<A: AdminApi> {
    api: A,
    config: EngineConfig,
}

impl<A: AdminApi> Migrator<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(api: A, config: EngineConfig) -> Result<Self, MigrateError> {
        config.validate()?;
        Ok(Self { api, config })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Migrate one entity kind for one set of source ids.
    ///
    /// Per-item failures are returned as `error` results. `Err` is reserved
    /// for a malformed request, a failed source listing, or a failed target
    /// listing under a fail-fast fetch policy.
    #[instrument(
        skip(self, request),
        fields(
            kind = %request.entity_kind,
            items = request.item_ids.len(),
            dry_run = request.dry_run
        )
    )]
    pub async fn migrate(
        &self,
        request: &MigrationRequest,
    ) -> Result<MigrationOutcome, MigrateError> {
        validate_request(request)?;
        let resolver = ConflictResolver::for_request(request)?;
        let fetcher = Fetcher::new(&self.api, self.config.fetch_policy, self.config.page_size);

        let outcome = match request.entity_kind {
            EntityKind::Metaobjects => {
                DefinitionSynchronizer::new(&self.api, &fetcher, &resolver)
                    .run(request)
                    .await?
            }
            EntityKind::Metafields => {
                let owner = request.owner_type_hint.ok_or_else(|| {
                    MigrateError::InvalidRequest("metafields need an owner type".to_string())
                })?;
                MetafieldSynchronizer::new(&self.api, &fetcher, &resolver)
                    .run(owner, request)
                    .await?
            }
            kind => {
                let owner = OwnerType::try_from(kind).map_err(MigrateError::InvalidRequest)?;
                EntityMigrator::new(&self.api, &fetcher, &resolver)
                    .dedupe_articles(self.config.dedupe_articles)
                    .run(owner, request)
                    .await?
            }
        };

        let summary = &outcome.summary;
        info!(
            total = summary.total,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            errors = summary.errors,
            "migration finished"
        );
        Ok(outcome)
    }
}

/// Reject requests that cannot be run at all.
pub fn validate_request(request: &MigrationRequest) -> Result<(), MigrateError> {
    if request.item_ids.is_empty() {
        return Err(MigrateError::InvalidRequest("no item ids given".to_string()));
    }
    if request.item_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(MigrateError::InvalidRequest("item ids must not be blank".to_string()));
    }

    request
        .source
        .validate()
        .map_err(|e| MigrateError::InvalidRequest(format!("source: {}", e)))?;
    request
        .target
        .validate()
        .map_err(|e| MigrateError::InvalidRequest(format!("target: {}", e)))?;

    if request.source.same_store(&request.target) {
        return Err(MigrateError::InvalidRequest(format!(
            "source and target are the same store ({})",
            request.source.url
        )));
    }
    if request.entity_kind == EntityKind::Metafields && request.owner_type_hint.is_none() {
        return Err(MigrateError::InvalidRequest(
            "metafields need an owner type".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_admin::Connection;

    fn request(kind: EntityKind) -> MigrationRequest {
        MigrationRequest::new(
            Connection::new("a.example.com", "a"),
            Connection::new("b.example.com", "b"),
            kind,
            ["1"],
        )
    }

    #[test]
    fn accepts_a_well_formed_request() {
        assert!(validate_request(&request(EntityKind::Products)).is_ok());
        assert!(
            validate_request(&request(EntityKind::Metafields).with_owner_type(OwnerType::Pages))
                .is_ok()
        );
    }

    #[test]
    fn rejects_empty_ids() {
        let mut empty = request(EntityKind::Pages);
        empty.item_ids.clear();
        assert!(matches!(
            validate_request(&empty),
            Err(MigrateError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_same_store() {
        let mut same = request(EntityKind::Pages);
        same.target = Connection::new("https://A.example.com/", "b");
        assert!(validate_request(&same).is_err());
    }

    #[test]
    fn rejects_blank_token() {
        let mut blank = request(EntityKind::Pages);
        blank.source.token = "  ".to_string();
        assert!(validate_request(&blank).is_err());
    }

    #[test]
    fn metafields_require_owner_type() {
        assert!(validate_request(&request(EntityKind::Metafields)).is_err());
    }
}
