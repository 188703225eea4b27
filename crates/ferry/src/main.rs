//! ferry: cross-store commerce data migration
//!
//! Subcommands:
//! - `migrate`: Migrate one entity kind for a set of source ids
//! - `plan`: Run a JSON migration plan across several kinds

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferry_admin::{Connection, DEFAULT_API_VERSION};
use ferry_engine::{ConflictMode, ConflictPolicy, EntityKind, MigrationRequest, OwnerType};

mod migrate;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

/// Parse `ID=POLICY`, e.g. `123=skip`.
fn parse_resolution(s: &str) -> Result<(String, ConflictPolicy), String> {
    let (id, policy) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid resolution '{}', expected ID=overwrite or ID=skip", s))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("invalid resolution '{}': empty id", s));
    }
    Ok((id.to_string(), policy.parse()?))
}

#[derive(Parser)]
#[command(name = "ferry")]
#[command(about = "Migrate commerce data between stores", long_about = None)]
struct Cli {
    #[command(flatten)]
    stores: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Store connections, shared by every subcommand.
#[derive(Args, Debug, Default)]
struct StoreArgs {
    /// Source store URL
    #[arg(long, env = "FERRY_SOURCE_URL", global = true)]
    source_url: Option<String>,

    /// Source store access token
    #[arg(long, env = "FERRY_SOURCE_TOKEN", global = true, hide_env_values = true)]
    source_token: Option<String>,

    /// Target store URL
    #[arg(long, env = "FERRY_TARGET_URL", global = true)]
    target_url: Option<String>,

    /// Target store access token
    #[arg(long, env = "FERRY_TARGET_TOKEN", global = true, hide_env_values = true)]
    target_token: Option<String>,

    /// Admin API version
    #[arg(long, env = "FERRY_API_VERSION", global = true, default_value = DEFAULT_API_VERSION)]
    api_version: String,
}

impl StoreArgs {
    fn connection(url: &Option<String>, token: &Option<String>, side: &str) -> Result<Connection> {
        match (url, token) {
            (Some(url), Some(token)) => Ok(Connection::new(url, token)),
            (None, _) => Err(miette::miette!(
                "missing --{}-url (or FERRY_{}_URL)",
                side,
                side.to_uppercase()
            )),
            (_, None) => Err(miette::miette!(
                "missing --{}-token (or FERRY_{}_TOKEN)",
                side,
                side.to_uppercase()
            )),
        }
    }

    fn source(&self) -> Result<Connection> {
        Self::connection(&self.source_url, &self.source_token, "source")
    }

    fn target(&self) -> Result<Connection> {
        Self::connection(&self.target_url, &self.target_token, "target")
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate one entity kind for a set of source ids
    Migrate {
        /// Entity kind: products, collections, pages, blogs, metaobjects or metafields
        #[arg(long)]
        kind: EntityKind,

        /// Source-side ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,

        /// What to do with items that already exist on the target
        #[arg(long, default_value = "overwrite")]
        mode: ConflictMode,

        /// Per-item decision, e.g. `--resolve 123=skip`. Required for every id under `--mode ask`.
        #[arg(long = "resolve", value_name = "ID=POLICY", value_parser = parse_resolution)]
        resolutions: Vec<(String, ConflictPolicy)>,

        /// Predict results without writing to the target
        #[arg(
            long,
            env = "FERRY_DRY_RUN",
            value_parser = parse_bool_env,
            default_value = "false",
            num_args = 0..=1,
            default_missing_value = "true"
        )]
        dry_run: bool,

        /// Owner type for `--kind metafields`
        #[arg(long)]
        owner_type: Option<OwnerType>,

        /// Engine configuration file (JSON)
        #[arg(long, env = "FERRY_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Run a migration plan file
    Plan {
        /// Plan file (JSON)
        #[arg(value_name = "PLAN")]
        plan: PathBuf,

        /// Force a dry run regardless of the plan's setting
        #[arg(
            long,
            env = "FERRY_DRY_RUN",
            value_parser = parse_bool_env,
            default_value = "false",
            num_args = 0..=1,
            default_missing_value = "true"
        )]
        dry_run: bool,

        /// Engine configuration file (JSON)
        #[arg(long, env = "FERRY_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "ferry=info,ferry_engine=info,ferry_admin=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            kind,
            ids,
            mode,
            resolutions,
            dry_run,
            owner_type,
            config,
        } => {
            let mut request =
                MigrationRequest::new(cli.stores.source()?, cli.stores.target()?, kind, ids)
                    .with_mode(mode)
                    .with_dry_run(dry_run);
            request.owner_type_hint = owner_type;
            request.resolutions.extend(resolutions);
            migrate::run_migrate_command(&cli.stores.api_version, config.as_deref(), &request).await
        }

        Commands::Plan {
            plan,
            dry_run,
            config,
        } => migrate::run_plan_command(&cli.stores, &plan, dry_run, config.as_deref()).await,
    }
}
