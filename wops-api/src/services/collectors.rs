//! Collector Registry
//!
//! Handheld collectors are lent to operators and returned at the end of the
//! shift. Same read-then-write model as the box allocator.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use wops_common::records::{scan, CollectorRecord, CollectorState, RecordSet};
use wops_common::store::{Field, RowStore};
use wops_common::{time, Error, Outcome, Result};

use super::required;

/// Status written on check-out
pub const STATUS_IN_USE: &str = "Em uso";

/// Status written on check-in
pub const STATUS_AVAILABLE: &str = "Disponível";

/// Collector totals by state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorCounts {
    pub total: usize,
    pub available: usize,
    pub in_use: usize,
    pub maintenance: usize,
    pub other: usize,
}

impl CollectorCounts {
    pub fn tally<'a>(collectors: impl IntoIterator<Item = &'a CollectorRecord>) -> Self {
        let mut counts = Self::default();
        for collector in collectors {
            counts.total += 1;
            match collector.state {
                CollectorState::Available => counts.available += 1,
                CollectorState::InUse => counts.in_use += 1,
                CollectorState::Maintenance => counts.maintenance += 1,
                CollectorState::Other => counts.other += 1,
            }
        }
        counts
    }
}

#[derive(Clone)]
pub struct CollectorRegistry {
    store: Arc<dyn RowStore>,
    table: String,
}

impl CollectorRegistry {
    pub fn new(store: Arc<dyn RowStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    async fn collectors(&self) -> Result<RecordSet<CollectorRecord>> {
        let table = self.store.get_all_rows(&self.table).await?;
        Ok(scan(table))
    }

    /// Collectors in table order; `status` keeps only one state bucket
    pub async fn list(&self, status: Option<CollectorState>) -> Result<Vec<CollectorRecord>> {
        let set = self.collectors().await?;
        Ok(set
            .entries
            .into_iter()
            .map(|e| e.record)
            .filter(|c| status.map_or(true, |s| c.state == s))
            .collect())
    }

    pub async fn status_counts(&self) -> Result<CollectorCounts> {
        let set = self.collectors().await?;
        Ok(CollectorCounts::tally(set.records()))
    }

    /// Lend `collector_id` to `operator`
    pub async fn check_out(&self, collector_id: &str, operator: &str) -> Result<Outcome> {
        let collector_id = required(collector_id, "collectorId")?;
        let operator = required(operator, "operator")?;
        let outcome = self.write_status(collector_id, STATUS_IN_USE, operator).await?;
        if outcome.is_applied() {
            info!(collector_id, operator, "Collector checked out");
        }
        Ok(outcome)
    }

    /// Return `collector_id`; the operator is cleared
    pub async fn check_in(&self, collector_id: &str) -> Result<Outcome> {
        let collector_id = required(collector_id, "collectorId")?;
        let outcome = self.write_status(collector_id, STATUS_AVAILABLE, "").await?;
        if outcome.is_applied() {
            info!(collector_id, "Collector checked in");
        }
        Ok(outcome)
    }

    async fn write_status(&self, collector_id: &str, status: &str, operator: &str) -> Result<Outcome> {
        let set = self.collectors().await?;
        let Some(entry) = set
            .entries
            .iter()
            .find(|e| e.record.collector_id.eq_ignore_ascii_case(collector_id))
        else {
            return Ok(Outcome::NotFound);
        };

        let mut row = entry.row.clone();
        if !set.columns.set(&mut row, Field::Status, status) {
            return Err(Error::Store(format!(
                "table '{}' has no '{}' column",
                self.table,
                Field::Status.canonical()
            )));
        }
        // Optional columns: sheets without them only track the status
        set.columns.set(&mut row, Field::Operator, operator);
        set.columns.set(&mut row, Field::UpdatedAt, time::timestamp());

        self.store.update_row(&self.table, &row).await?;
        Ok(Outcome::Applied)
    }
}
