//! The `migrate` and `plan` subcommands.
//!
//! Both print their report as pretty JSON on stdout. Item-level failures are
//! part of the report; only call-level failures make the command fail.

use std::path::Path;

use miette::Result;
use serde::de::DeserializeOwned;
use tracing::info;

use ferry_admin::{AdminClient, ClientConfig, Connection};
use ferry_engine::{EngineConfig, MigrationPlan, MigrationRequest, Migrator};

use crate::StoreArgs;

async fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| miette::miette!("failed to read {} {}: {}", what, path.display(), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| miette::miette!("invalid {} {}: {}", what, path.display(), e))
}

/// Engine configuration from `path`, or the defaults.
pub async fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config: EngineConfig = match path {
        Some(path) => read_json(path, "config file").await?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(|e| miette::miette!("{}", e))?;
    Ok(config)
}

pub async fn load_plan(path: &Path) -> Result<MigrationPlan> {
    read_json(path, "plan file").await
}

fn migrator(api_version: &str, config: EngineConfig) -> Result<Migrator<AdminClient>> {
    let client_config = ClientConfig::builder()
        .api_version(api_version)
        .build()
        .map_err(|e| miette::miette!("{}", e))?;
    Migrator::with_config(AdminClient::with_config(client_config), config)
        .map_err(|e| miette::miette!("{}", e))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| miette::miette!("{}", e))?;
    println!("{}", json);
    Ok(())
}

/// Connections given on the command line take precedence over the plan's.
fn apply_store_overrides(plan: &mut MigrationPlan, stores: &StoreArgs) {
    if let (Some(url), Some(token)) = (&stores.source_url, &stores.source_token) {
        plan.source = Connection::new(url, token);
    }
    if let (Some(url), Some(token)) = (&stores.target_url, &stores.target_token) {
        plan.target = Connection::new(url, token);
    }
}

pub async fn run_migrate_command(
    api_version: &str,
    config_path: Option<&Path>,
    request: &MigrationRequest,
) -> Result<()> {
    let config = load_engine_config(config_path).await?;
    let migrator = migrator(api_version, config)?;

    let outcome = migrator
        .migrate(request)
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    info!(
        kind = %request.entity_kind,
        total = outcome.summary.total,
        errors = outcome.summary.errors,
        "migrate finished"
    );
    print_json(&outcome)
}

pub async fn run_plan_command(
    stores: &StoreArgs,
    plan_path: &Path,
    dry_run: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut plan = load_plan(plan_path).await?;
    apply_store_overrides(&mut plan, stores);
    plan.dry_run |= dry_run;

    let config = load_engine_config(config_path).await?;
    let migrator = migrator(&stores.api_version, config)?;

    let report = migrator.run_plan(&plan).await;
    print_json(&report)?;

    let failed = report.failed_passes();
    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} passes failed",
            failed,
            report.passes.len()
        ));
    }
    Ok(())
}
