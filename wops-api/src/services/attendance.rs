//! Attendance queries over the Base table

use std::sync::Arc;
use tracing::debug;
use wops_common::records::{scan, AttendanceRecord, RecordSet};
use wops_common::store::RowStore;
use wops_common::{Result, ShiftLabel};

use super::summary::{summarize_with, DailySummary};

/// Read side of the Base table
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn RowStore>,
    base_table: String,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn RowStore>, base_table: impl Into<String>) -> Self {
        Self {
            store,
            base_table: base_table.into(),
        }
    }

    async fn records(&self) -> Result<Vec<AttendanceRecord>> {
        let table = self.store.get_all_rows(&self.base_table).await?;
        let set: RecordSet<AttendanceRecord> = scan(table);
        Ok(set.entries.into_iter().map(|e| e.record).collect())
    }

    /// Summary of `date` (`DD/MM/YYYY`), optionally for one shift
    pub async fn daily_summary(&self, date: &str, shift: Option<&ShiftLabel>) -> Result<DailySummary> {
        let records = self.records().await?;
        debug!(date, rows = records.len(), "Summarizing attendance");
        Ok(summarize_with(&records, date, shift))
    }

    /// CSV export of every named record of `date`, in table order
    pub async fn export_csv(&self, date: &str) -> Result<String> {
        let date = date.trim();
        let records = self.records().await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "Supervisor", "Grupo", "Matricula", "Nome", "Funcao", "Status", "Desvio", "Data",
            "Turno",
        ])?;

        let mut count = 0usize;
        for record in records
            .iter()
            .filter(|r| r.date.trim() == date && !r.name.trim().is_empty())
        {
            let shift = match &record.shift {
                ShiftLabel::Undefined => "",
                other => other.label(),
            };
            writer.write_record([
                record.supervisor.as_str(),
                record.sheet_group.as_str(),
                record.employee_id.as_str(),
                record.name.as_str(),
                record.role.as_str(),
                record.status.as_str(),
                record.deviation.as_deref().unwrap_or(""),
                record.date.as_str(),
                shift,
            ])?;
            count += 1;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| wops_common::Error::Internal(format!("CSV flush failed: {}", e)))?;
        debug!(date, count, "Exported attendance CSV");
        String::from_utf8(bytes)
            .map_err(|e| wops_common::Error::Internal(format!("CSV is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wops_common::store::MemoryStore;

    async fn service() -> AttendanceService {
        let store = MemoryStore::new();
        store
            .insert_table(
                "Base",
                &["Supervisor", "Matricula", "Nome", "Funcao", "Status", "Data", "Turno"],
                &[
                    &["Ana", "1", "Joao", "Conferente", "Presente", "10/01/2024", "TA"],
                    &["Ana", "2", "Rosa", "Conferente", "Ausente", "10/01/2024", "turno c"],
                    &["Bia", "3", "Lia", "Operador", "Presente", "11/01/2024", ""],
                    &["", "", "", "", "", "", ""],
                    &["Bia", "4", "", "Operador", "Presente", "10/01/2024", ""],
                ],
            )
            .await;
        AttendanceService::new(Arc::new(store), "Base")
    }

    #[tokio::test]
    async fn test_daily_summary_reads_base() {
        let service = service().await;
        let summary = service.daily_summary("10/01/2024", None).await.unwrap();

        assert_eq!(summary.overall.tally.total, 2);
        assert_eq!(summary.per_supervisor.len(), 1);
        assert_eq!(summary.overall.percentages.present, 50.0);
    }

    #[tokio::test]
    async fn test_daily_summary_by_shift() {
        let service = service().await;
        let summary = service
            .daily_summary("10/01/2024", Some(&ShiftLabel::ShiftC))
            .await
            .unwrap();

        assert_eq!(summary.overall.tally.total, 1);
        assert_eq!(summary.per_supervisor[0].members[0].name, "Rosa");
    }

    #[tokio::test]
    async fn test_export_csv() {
        let service = service().await;
        let csv = service.export_csv("10/01/2024").await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Supervisor,Grupo,Matricula"));
        assert_eq!(lines[1], "Ana,,1,Joao,Conferente,Presente,,10/01/2024,Shift A");
        assert_eq!(lines[2], "Ana,,2,Rosa,Conferente,Ausente,,10/01/2024,Shift C");
    }

    #[tokio::test]
    async fn test_missing_base_table_propagates() {
        let service = AttendanceService::new(Arc::new(MemoryStore::new()), "Base");
        let err = service.daily_summary("10/01/2024", None).await.unwrap_err();
        assert!(matches!(err, wops_common::Error::NotFound(_)));
    }
}
