//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::MigrateError;

/// Largest page the Admin API serves for REST `limit` and GraphQL `first`.
pub const MAX_PAGE_SIZE: u32 = 250;

/// How the fetcher treats a failed target listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Degrade a failed target fetch to an empty collection instead of aborting.
    ///
    /// Every source item is then treated as new, which can create duplicates
    /// on the target.
    pub best_effort: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self { best_effort: true }
    }
}

impl FetchPolicy {
    pub fn fail_fast() -> Self {
        Self { best_effort: false }
    }
}

/// Engine-wide settings.
///
/// ```rust
/// use ferry_engine::{EngineConfig, FetchPolicy};
///
/// let config = EngineConfig::builder()
///     .fetch_policy(FetchPolicy::fail_fast())
///     .page_size(50)
///     .build()
///     .unwrap();
/// assert!(!config.fetch_policy.best_effort);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fetch_policy: FetchPolicy,
    /// REST `limit` and GraphQL `first` for listing calls.
    pub page_size: u32,
    /// Match blog articles by handle instead of always creating them.
    pub dedupe_articles: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::default(),
            page_size: MAX_PAGE_SIZE,
            dedupe_articles: false,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(MigrateError::Config(format!(
                "page_size must be between 1 and {} (got {})",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.config.fetch_policy = policy;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn dedupe_articles(mut self, dedupe: bool) -> Self {
        self.config.dedupe_articles = dedupe;
        self
    }

    pub fn build(self) -> Result<EngineConfig, MigrateError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
