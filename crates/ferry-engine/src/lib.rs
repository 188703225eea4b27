//! Cross-store migration engine for ferry.
//!
//! Moves products, collections, pages, blogs, metaobjects and metafields from
//! a source store to a target store. Entities are matched across stores by
//! natural key, never by id.
//!
//! ## Features
//!
//! - **Cleaner**: strips store-local identity before a record is replayed
//! - **Fetcher**: whole-collection reads, cursor pagination, best-effort target reads
//! - **Matcher**: natural-key identity (handle, type-scoped handle, namespace + key)
//! - **ConflictResolver**: create / update / skip / simulate per item
//! - **DefinitionSynchronizer**: definitions before their entries
//! - **MetafieldSynchronizer**: metafields under a target owner resolved by handle
//! - **EntityMigrator**: products, collections, pages, blogs and articles
//! - **MigrationPlan**: several kinds in dependency order with a summed summary
//!
//! ```rust,no_run
//! use ferry_admin::{AdminClient, Connection};
//! use ferry_engine::{EntityKind, MigrationRequest, Migrator};
//!
//! # async fn run() -> Result<(), ferry_engine::MigrateError> {
//! let migrator = Migrator::new(AdminClient::new());
//! let request = MigrationRequest::new(
//!     Connection::new("source.example.com", "source-token"),
//!     Connection::new("target.example.com", "target-token"),
//!     EntityKind::Products,
//!     ["1", "2"],
//! );
//! let outcome = migrator.migrate(&request).await?;
//! println!("{} created", outcome.summary.created);
//! # Ok(())
//! # }
//! ```

pub mod cleaner;
pub mod conflict;
mod config;
pub mod definitions;
mod engine;
pub mod entities;
mod error;
pub mod fetcher;
pub mod matcher;
pub mod metafields;
mod model;
mod plan;
mod queries;
mod record;
mod results;

pub use cleaner::{RecordKind, clean};
pub use config::{EngineConfig, EngineConfigBuilder, FetchPolicy, MAX_PAGE_SIZE};
pub use conflict::{Action, ConflictResolver, decide};
pub use engine::{Migrator, validate_request};
pub use error::MigrateError;
pub use fetcher::{CollectionType, Fetcher};
pub use matcher::{Matcher, NaturalKey};
pub use model::{
    ConflictMode, ConflictPolicy, EntityKind, FieldDefinition, MetaobjectDefinition,
    MetaobjectEntry, MetaobjectField, MigrationRequest, OwnerType, Validation,
};
pub use plan::{MetafieldSelection, MigrationPlan, PassReport, PlanReport, Selection};
pub use results::{ItemResult, ItemStatus, MigrationOutcome, ResultLog, Summary};
