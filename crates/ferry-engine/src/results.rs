//! Per-item results and their aggregation into a summary.

use serde::{Deserialize, Serialize};

/// Outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Created,
    Updated,
    Skipped,
    Error,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ItemStatus::Created => "created",
            ItemStatus::Updated => "updated",
            ItemStatus::Skipped => "skipped",
            ItemStatus::Error => "error",
        })
    }
}

/// Result of one item, keyed by its source-side id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: String,
    pub title: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemResult {
    pub fn new(id: impl Into<String>, title: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Counts over a result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Summary {
    pub fn from_results(results: &[ItemResult]) -> Self {
        results.iter().fold(Summary::default(), |mut summary, r| {
            summary.record(r.status);
            summary
        })
    }

    pub fn record(&mut self, status: ItemStatus) {
        self.total += 1;
        match status {
            ItemStatus::Created => self.created += 1,
            ItemStatus::Updated => self.updated += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Error => self.errors += 1,
        }
    }
}

impl std::ops::AddAssign for Summary {
    fn add_assign(&mut self, other: Summary) {
        self.total += other.total;
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

impl std::iter::Sum for Summary {
    fn sum<I: Iterator<Item = Summary>>(iter: I) -> Self {
        iter.fold(Summary::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

/// What a migration call returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub results: Vec<ItemResult>,
    pub summary: Summary,
}

impl MigrationOutcome {
    pub fn from_results(results: Vec<ItemResult>) -> Self {
        let summary = Summary::from_results(&results);
        Self { results, summary }
    }
}

/// Accumulates results over a call. The only mutable state shared across items.
#[derive(Debug, Default)]
pub struct ResultLog {
    results: Vec<ItemResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ItemResult) {
        tracing::debug!(
            id = %result.id,
            title = %result.title,
            status = %result.status,
            message = result.message.as_deref().unwrap_or(""),
            "item result"
        );
        self.results.push(result);
    }

    pub fn created(&mut self, id: impl Into<String>, title: impl Into<String>) {
        self.push(ItemResult::new(id, title, ItemStatus::Created));
    }

    pub fn updated(&mut self, id: impl Into<String>, title: impl Into<String>) {
        self.push(ItemResult::new(id, title, ItemStatus::Updated));
    }

    pub fn skipped(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(ItemResult::new(id, title, ItemStatus::Skipped).with_message(message));
    }

    pub fn error(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(ItemResult::new(id, title, ItemStatus::Error).with_message(message));
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[ItemResult] {
        &self.results
    }

    pub fn finish(self) -> MigrationOutcome {
        MigrationOutcome::from_results(self.results)
    }
}
