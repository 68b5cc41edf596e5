//! Draft Roster Reconciler
//!
//! The Buffer table holds workers tentatively assigned to a supervisor and
//! group. Entries are keyed by (supervisor, group, employeeId) and live
//! between "added" and "removed". Committing merges a batch of entries into
//! the Base table for today: matching (supervisor, today, employeeId) rows
//! are updated in place, anything else is appended.
//!
//! Lookups that match nothing return [`Outcome::NotFound`]; only store
//! failures are errors.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use wops_common::normalize::normalize_shift;
use wops_common::records::{scan, AttendanceRecord, BufferEntry, RecordSet, TableRecord};
use wops_common::store::columns::canonical_headers;
use wops_common::store::{Field, Row, RowStore};
use wops_common::{time, Error, Outcome, Result, ShiftLabel};

use super::required;

/// Worker to add to a draft roster
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub employee_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Result of [`RosterService::add_if_absent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// One buffer entry to merge into Base
///
/// Accepted on the wire either as an object or as the positional array
/// `[supervisor, group, employeeId, name, role, status, deviation?, shift?]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawTuple")]
pub struct CommitTuple {
    pub supervisor: String,
    pub group: String,
    pub employee_id: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub deviation: String,
    pub shift: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TupleObject {
    supervisor: String,
    #[serde(default)]
    group: String,
    employee_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    deviation: String,
    #[serde(default)]
    shift: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTuple {
    Positional(Vec<String>),
    Named(TupleObject),
}

impl TryFrom<RawTuple> for CommitTuple {
    type Error = String;

    fn try_from(raw: RawTuple) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawTuple::Named(t) => Ok(Self {
                supervisor: t.supervisor,
                group: t.group,
                employee_id: t.employee_id,
                name: t.name,
                role: t.role,
                status: t.status,
                deviation: t.deviation,
                shift: t.shift,
            }),
            RawTuple::Positional(values) => {
                if !(6..=8).contains(&values.len()) {
                    return Err(format!(
                        "commit tuple needs 6 to 8 values, got {}",
                        values.len()
                    ));
                }
                let mut values = values.into_iter();
                let mut next = || values.next().unwrap_or_default();
                Ok(Self {
                    supervisor: next(),
                    group: next(),
                    employee_id: next(),
                    name: next(),
                    role: next(),
                    status: next(),
                    deviation: next(),
                    shift: Some(next()).filter(|s| !s.trim().is_empty()),
                })
            }
        }
    }
}

/// Counts reported by a commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    pub new: usize,
    pub updated: usize,
}

/// Where a committed key landed inside the current batch
#[derive(Clone, Copy)]
enum Slot {
    /// Index into the pending row updates
    Update(usize),
    /// Index into the pending appends
    Insert(usize),
}

/// Buffer and commit operations
#[derive(Clone)]
pub struct RosterService {
    store: Arc<dyn RowStore>,
    buffer_table: String,
    base_table: String,
    chunk_size: usize,
}

impl RosterService {
    pub fn new(
        store: Arc<dyn RowStore>,
        buffer_table: impl Into<String>,
        base_table: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            store,
            buffer_table: buffer_table.into(),
            base_table: base_table.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Create the Buffer table when it does not exist
    pub async fn ensure_buffer(&self) -> Result<()> {
        self.store
            .ensure_table(&self.buffer_table, &canonical_headers(BufferEntry::FIELDS))
            .await
    }

    async fn buffer(&self) -> Result<RecordSet<BufferEntry>> {
        let table = self.store.get_all_rows(&self.buffer_table).await?;
        Ok(scan(table))
    }

    /// Entries of `supervisor`, optionally limited to one group
    pub async fn list(&self, supervisor: &str, group: Option<&str>) -> Result<Vec<BufferEntry>> {
        let supervisor = supervisor.trim();
        let group = group.map(str::trim);
        let set = self.buffer().await?;

        Ok(set
            .entries
            .into_iter()
            .map(|e| e.record)
            .filter(|r| r.supervisor == supervisor && group.map_or(true, |g| r.group == g))
            .collect())
    }

    /// Append `candidate` unless (supervisor, group, employeeId) is already
    /// in the buffer
    pub async fn add_if_absent(
        &self,
        supervisor: &str,
        group: &str,
        candidate: &Candidate,
    ) -> Result<AddOutcome> {
        let supervisor = required(supervisor, "supervisor")?;
        let employee_id = required(&candidate.employee_id, "employeeId")?;
        let group = group.trim();

        let set = self.buffer().await?;
        let present = set.records().any(|r| {
            r.supervisor == supervisor && r.group == group && r.employee_id == employee_id
        });
        if present {
            debug!(supervisor, group, employee_id, "Already in buffer");
            return Ok(AddOutcome::AlreadyPresent);
        }

        let entry = BufferEntry {
            supervisor: supervisor.to_string(),
            group: group.to_string(),
            employee_id: employee_id.to_string(),
            name: candidate.name.trim().to_string(),
            role: candidate.role.trim().to_string(),
            status: String::new(),
            deviation: None,
        };
        self.store
            .append_row(&self.buffer_table, entry.to_fields(&set.columns))
            .await?;
        info!(supervisor, group, employee_id, "Added to buffer");
        Ok(AddOutcome::Added)
    }

    /// Delete the first entry of `supervisor` with `employee_id`
    pub async fn remove(&self, supervisor: &str, employee_id: &str) -> Result<Outcome> {
        let (supervisor, employee_id) = (supervisor.trim(), employee_id.trim());
        self.delete_first(|r| r.supervisor == supervisor && r.employee_id == employee_id)
            .await
    }

    /// Delete the first entry of `group` with `employee_id`
    pub async fn remove_by_group(&self, group: &str, employee_id: &str) -> Result<Outcome> {
        let (group, employee_id) = (group.trim(), employee_id.trim());
        self.delete_first(|r| r.group == group && r.employee_id == employee_id)
            .await
    }

    async fn delete_first<P>(&self, matches: P) -> Result<Outcome>
    where
        P: Fn(&BufferEntry) -> bool,
    {
        let set = self.buffer().await?;
        let Some(entry) = set.entries.iter().find(|e| matches(&e.record)) else {
            return Ok(Outcome::NotFound);
        };

        self.store.delete_row(&self.buffer_table, &entry.row).await?;
        info!(
            supervisor = %entry.record.supervisor,
            employee_id = %entry.record.employee_id,
            row = entry.row.number(),
            "Removed from buffer"
        );
        Ok(Outcome::Applied)
    }

    pub async fn set_status(&self, supervisor: &str, employee_id: &str, status: &str) -> Result<Outcome> {
        self.set_field(supervisor, employee_id, Field::Status, status.trim())
            .await
    }

    pub async fn set_deviation(
        &self,
        supervisor: &str,
        employee_id: &str,
        deviation: &str,
    ) -> Result<Outcome> {
        self.set_field(supervisor, employee_id, Field::Deviation, deviation.trim())
            .await
    }

    async fn set_field(
        &self,
        supervisor: &str,
        employee_id: &str,
        field: Field,
        value: &str,
    ) -> Result<Outcome> {
        let (supervisor, employee_id) = (supervisor.trim(), employee_id.trim());
        let set = self.buffer().await?;
        let Some(entry) = set
            .entries
            .iter()
            .find(|e| e.record.supervisor == supervisor && e.record.employee_id == employee_id)
        else {
            return Ok(Outcome::NotFound);
        };

        let mut row = entry.row.clone();
        if !set.columns.set(&mut row, field, value) {
            return Err(Error::Store(format!(
                "table '{}' has no '{}' column",
                self.buffer_table,
                field.canonical()
            )));
        }
        self.store.update_row(&self.buffer_table, &row).await?;
        info!(supervisor, employee_id, field = field.canonical(), value, "Updated buffer entry");
        Ok(Outcome::Applied)
    }

    /// Merge `batch` into Base for today's date
    pub async fn commit_to_base(&self, batch: &[CommitTuple]) -> Result<CommitReport> {
        self.commit_to_base_on(batch, &time::today()).await
    }

    /// Merge `batch` into Base for `date` (`DD/MM/YYYY`)
    ///
    /// Every tuple of the batch uses the same date. A key repeated within
    /// the batch lands on the row written earlier in the same batch.
    pub async fn commit_to_base_on(&self, batch: &[CommitTuple], date: &str) -> Result<CommitReport> {
        for tuple in batch {
            required(&tuple.supervisor, "supervisor")?;
            required(&tuple.employee_id, "employeeId")?;
        }
        if batch.is_empty() {
            return Ok(CommitReport::default());
        }

        let date = date.trim();
        let table = self.store.get_all_rows(&self.base_table).await?;
        let base: RecordSet<AttendanceRecord> = scan(table);
        let columns = &base.columns;

        // Key and status cells must land somewhere before anything is written
        let mut needed = vec![Field::Supervisor, Field::EmployeeId, Field::Date, Field::Status];
        if batch.iter().any(|t| !t.deviation.trim().is_empty()) {
            needed.push(Field::Deviation);
        }
        if let Some(missing) = needed.into_iter().find(|f| !columns.is_resolved(*f)) {
            return Err(Error::Store(format!(
                "table '{}' has no '{}' column",
                self.base_table,
                missing.canonical()
            )));
        }

        let mut existing: HashMap<(&str, &str), &Row> = HashMap::new();
        for entry in base.entries.iter().filter(|e| e.record.date == date) {
            existing
                .entry((entry.record.supervisor.as_str(), entry.record.employee_id.as_str()))
                .or_insert(&entry.row);
        }

        let mut slots: HashMap<(String, String), Slot> = HashMap::new();
        let mut updates: Vec<Row> = Vec::new();
        let mut inserts: Vec<AttendanceRecord> = Vec::new();
        let mut report = CommitReport::default();

        for tuple in batch {
            let supervisor = tuple.supervisor.trim();
            let employee_id = tuple.employee_id.trim();
            let status = tuple.status.trim();
            let deviation = tuple.deviation.trim();
            let key = (supervisor.to_string(), employee_id.to_string());

            let slot = match slots.get(&key).copied() {
                Some(slot) => Some(slot),
                None => existing.get(&(supervisor, employee_id)).map(|row| {
                    updates.push((*row).clone());
                    let slot = Slot::Update(updates.len() - 1);
                    slots.insert(key.clone(), slot);
                    slot
                }),
            };

            match slot {
                Some(Slot::Update(i)) => {
                    let row = &mut updates[i];
                    columns.set(row, Field::Status, status);
                    if !deviation.is_empty() {
                        columns.set(row, Field::Deviation, deviation);
                    }
                    report.updated += 1;
                }
                Some(Slot::Insert(i)) => {
                    let record = &mut inserts[i];
                    record.status = status.to_string();
                    if !deviation.is_empty() {
                        record.deviation = Some(deviation.to_string());
                    }
                    report.updated += 1;
                }
                None => {
                    inserts.push(AttendanceRecord {
                        supervisor: supervisor.to_string(),
                        sheet_group: tuple.group.trim().to_string(),
                        employee_id: employee_id.to_string(),
                        name: tuple.name.trim().to_string(),
                        role: tuple.role.trim().to_string(),
                        status: status.to_string(),
                        deviation: Some(deviation.to_string()).filter(|d| !d.is_empty()),
                        date: date.to_string(),
                        shift: tuple
                            .shift
                            .as_deref()
                            .map(normalize_shift)
                            .unwrap_or(ShiftLabel::Undefined),
                    });
                    slots.insert(key, Slot::Insert(inserts.len() - 1));
                    report.new += 1;
                }
            }
        }

        for chunk in updates.chunks(self.chunk_size) {
            self.store.update_rows(&self.base_table, chunk).await?;
        }
        let rows: Vec<_> = inserts.iter().map(|r| r.to_fields(columns)).collect();
        for chunk in rows.chunks(self.chunk_size) {
            self.store.append_rows(&self.base_table, chunk.to_vec()).await?;
        }

        info!(
            date,
            new = report.new,
            updated = report.updated,
            "✓ Committed buffer to base"
        );
        Ok(report)
    }
}
