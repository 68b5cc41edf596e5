//! Typed records and the row adapter boundary
//!
//! This is the only place where table rows become domain records. Services
//! read through [`scan`], mutate through [`ColumnMap`] with logical
//! [`Field`]s, and append through each record's `to_fields`.

use crate::normalize::{
    is_deviation, normalize_shift, normalize_status, parse_locale_number, ShiftLabel, StatusLabel,
};
use crate::store::{ColumnMap, Field, Fields, Row, Table};
use crate::RowError;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Record types that can be read from a table row
pub trait TableRecord: Sized {
    /// Logical columns this record reads
    const FIELDS: &'static [Field];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError>;
}

/// A record together with the row it was read from
#[derive(Debug, Clone)]
pub struct Scanned<T> {
    pub row: Row,
    pub record: T,
}

/// A table read as typed records
#[derive(Debug, Clone)]
pub struct RecordSet<T> {
    pub columns: ColumnMap,
    pub entries: Vec<Scanned<T>>,
}

impl<T> RecordSet<T> {
    pub fn records(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.record)
    }
}

/// Adapt every row of `table` into `T`
///
/// Blank rows are skipped silently; rows failing adaptation are skipped with
/// a warning and never abort the scan.
pub fn scan<T: TableRecord>(table: Table) -> RecordSet<T> {
    let columns = ColumnMap::resolve(&table.headers, T::FIELDS);
    let mut entries = Vec::with_capacity(table.rows.len());

    for row in table.rows {
        match T::from_row(&row, &columns) {
            Ok(record) => entries.push(Scanned { row, record }),
            Err(RowError::Blank) => {}
            Err(e) => warn!(
                table = %table.name,
                row = row.number(),
                error = %e,
                "Skipping malformed row"
            ),
        }
    }

    RecordSet { columns, entries }
}

fn text(row: &Row, columns: &ColumnMap, field: Field) -> String {
    columns.get(row, field).to_string()
}

fn optional(row: &Row, columns: &ColumnMap, field: Field) -> Option<String> {
    Some(text(row, columns, field)).filter(|v| !v.is_empty())
}

// ========================================
// Attendance (Base table)
// ========================================

/// One worker's attendance on one day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub supervisor: String,
    pub sheet_group: String,
    pub employee_id: String,
    pub name: String,
    pub role: String,
    /// Status text as typed in the sheet
    pub status: String,
    pub deviation: Option<String>,
    /// `DD/MM/YYYY`
    pub date: String,
    pub shift: ShiftLabel,
}

impl AttendanceRecord {
    pub fn status_label(&self) -> StatusLabel {
        normalize_status(&self.status)
    }

    pub fn is_deviation(&self) -> bool {
        self.deviation.as_deref().is_some_and(is_deviation)
    }

    /// Append fields for a new Base row
    pub fn to_fields(&self, columns: &ColumnMap) -> Fields {
        let shift = match &self.shift {
            ShiftLabel::Undefined => String::new(),
            other => other.label().to_string(),
        };
        columns.fields(&[
            (Field::Supervisor, self.supervisor.clone()),
            (Field::Group, self.sheet_group.clone()),
            (Field::EmployeeId, self.employee_id.clone()),
            (Field::Name, self.name.clone()),
            (Field::Role, self.role.clone()),
            (Field::Status, self.status.clone()),
            (Field::Deviation, self.deviation.clone().unwrap_or_default()),
            (Field::Date, self.date.clone()),
            (Field::Shift, shift),
        ])
    }
}

impl TableRecord for AttendanceRecord {
    const FIELDS: &'static [Field] = &[
        Field::Supervisor,
        Field::Group,
        Field::EmployeeId,
        Field::Name,
        Field::Role,
        Field::Status,
        Field::Deviation,
        Field::Date,
        Field::Shift,
    ];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError> {
        if row.is_blank() {
            return Err(RowError::Blank);
        }
        Ok(Self {
            supervisor: text(row, columns, Field::Supervisor),
            sheet_group: text(row, columns, Field::Group),
            employee_id: text(row, columns, Field::EmployeeId),
            name: text(row, columns, Field::Name),
            role: text(row, columns, Field::Role),
            status: text(row, columns, Field::Status),
            deviation: optional(row, columns, Field::Deviation),
            date: text(row, columns, Field::Date),
            shift: normalize_shift(columns.get(row, Field::Shift)),
        })
    }
}

// ========================================
// Draft roster (Buffer table)
// ========================================

/// Worker tentatively assigned to a supervisor/group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferEntry {
    pub supervisor: String,
    pub group: String,
    pub employee_id: String,
    pub name: String,
    pub role: String,
    pub status: String,
    pub deviation: Option<String>,
}

impl BufferEntry {
    pub fn to_fields(&self, columns: &ColumnMap) -> Fields {
        columns.fields(&[
            (Field::Supervisor, self.supervisor.clone()),
            (Field::Group, self.group.clone()),
            (Field::EmployeeId, self.employee_id.clone()),
            (Field::Name, self.name.clone()),
            (Field::Role, self.role.clone()),
            (Field::Status, self.status.clone()),
            (Field::Deviation, self.deviation.clone().unwrap_or_default()),
        ])
    }
}

impl TableRecord for BufferEntry {
    const FIELDS: &'static [Field] = &[
        Field::Supervisor,
        Field::Group,
        Field::EmployeeId,
        Field::Name,
        Field::Role,
        Field::Status,
        Field::Deviation,
    ];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError> {
        if row.is_blank() {
            return Err(RowError::Blank);
        }
        let employee_id = text(row, columns, Field::EmployeeId);
        if employee_id.is_empty() {
            return Err(RowError::MissingField("employeeId"));
        }
        Ok(Self {
            supervisor: text(row, columns, Field::Supervisor),
            group: text(row, columns, Field::Group),
            employee_id,
            name: text(row, columns, Field::Name),
            role: text(row, columns, Field::Role),
            status: text(row, columns, Field::Status),
            deviation: optional(row, columns, Field::Deviation),
        })
    }
}

// ========================================
// Cargo (Cargas table)
// ========================================

/// Shipment and the box currently holding it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CargoRecord {
    pub cargo_id: String,
    pub box_id: Option<String>,
    pub store: String,
    pub store_type: String,
    pub segment: String,
    /// Cubic meters
    pub volume: f64,
    /// Remaining columns, by physical header
    pub details: BTreeMap<String, String>,
}

impl TableRecord for CargoRecord {
    const FIELDS: &'static [Field] = &[
        Field::CargoId,
        Field::Box,
        Field::Store,
        Field::StoreType,
        Field::Segment,
        Field::Volume,
    ];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError> {
        if row.is_blank() {
            return Err(RowError::Blank);
        }
        let cargo_id = text(row, columns, Field::CargoId);
        if cargo_id.is_empty() {
            return Err(RowError::MissingField("cargoId"));
        }
        let details = columns
            .unclaimed(row.headers())
            .into_iter()
            .map(|h| (h.to_string(), row.get(h).trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        Ok(Self {
            cargo_id,
            box_id: optional(row, columns, Field::Box),
            store: text(row, columns, Field::Store),
            store_type: text(row, columns, Field::StoreType),
            segment: text(row, columns, Field::Segment),
            volume: parse_locale_number(columns.get(row, Field::Volume)),
            details,
        })
    }
}

// ========================================
// Collector devices (Coletores table)
// ========================================

/// Collector status bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectorState {
    Available,
    InUse,
    Maintenance,
    Other,
}

impl CollectorState {
    /// Classify a raw collector status
    pub fn classify(raw: &str) -> Self {
        let key = crate::normalize::fold_key(raw);
        if key.contains("indispon") {
            CollectorState::Maintenance
        } else if key.contains("dispon") || key.contains("livre") {
            CollectorState::Available
        } else if key.contains("uso") {
            CollectorState::InUse
        } else if key.contains("manut") || key.contains("quebrad") || key.contains("defeito") {
            CollectorState::Maintenance
        } else {
            CollectorState::Other
        }
    }
}

/// Handheld collector device
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorRecord {
    pub collector_id: String,
    pub status: String,
    pub state: CollectorState,
    pub operator: Option<String>,
    pub updated_at: Option<String>,
}

impl TableRecord for CollectorRecord {
    const FIELDS: &'static [Field] = &[
        Field::CollectorId,
        Field::Status,
        Field::Operator,
        Field::UpdatedAt,
    ];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError> {
        if row.is_blank() {
            return Err(RowError::Blank);
        }
        let collector_id = text(row, columns, Field::CollectorId);
        if collector_id.is_empty() {
            return Err(RowError::MissingField("collectorId"));
        }
        let status = text(row, columns, Field::Status);
        Ok(Self {
            collector_id,
            state: CollectorState::classify(&status),
            status,
            operator: optional(row, columns, Field::Operator),
            updated_at: optional(row, columns, Field::UpdatedAt),
        })
    }
}

// ========================================
// Credentials (Usuarios table)
// ========================================

/// Login credential row
#[derive(Debug, Clone, PartialEq)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

impl TableRecord for UserCredential {
    const FIELDS: &'static [Field] = &[Field::Username, Field::Password, Field::Name];

    fn from_row(row: &Row, columns: &ColumnMap) -> Result<Self, RowError> {
        if row.is_blank() {
            return Err(RowError::Blank);
        }
        let username = text(row, columns, Field::Username);
        if username.is_empty() {
            return Err(RowError::MissingField("username"));
        }
        Ok(Self {
            username,
            // Passwords are compared verbatim; no trimming
            password: columns
                .is_resolved(Field::Password)
                .then(|| row.get(columns.header(Field::Password)).to_string())
                .unwrap_or_default(),
            display_name: text(row, columns, Field::Name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, lines: &[&[&str]]) -> Table {
        Table::from_grid(
            name,
            lines
                .iter()
                .map(|l| l.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_attendance_from_aliased_headers() {
        let set: RecordSet<AttendanceRecord> = scan(table(
            "Base",
            &[
                &["Supervisora", "Matrícula", "Colaborador", "Função", "Situação", "Desvio", "Dia", "Turno"],
                &["Ana", "17", " Joao ", "Conferente", "Presente", "desvio", "10/01/2024", "tc"],
            ],
        ));

        let record = &set.entries[0].record;
        assert_eq!(record.supervisor, "Ana");
        assert_eq!(record.employee_id, "17");
        assert_eq!(record.name, "Joao");
        assert_eq!(record.role, "Conferente");
        assert_eq!(record.status_label(), StatusLabel::Presente);
        assert!(record.is_deviation());
        assert_eq!(record.shift, ShiftLabel::ShiftC);
        assert_eq!(record.sheet_group, "");
    }

    #[test]
    fn test_scan_skips_blank_and_malformed_rows() {
        let set: RecordSet<CargoRecord> = scan(table(
            "Cargas",
            &[
                &["Carga", "Box", "Segmento"],
                &["C1", "", "LJ COMPER"],
                &["", "", ""],
                &["", "4", "LJ COMPER"],
                &["C3", "", "OTHER"],
            ],
        ));

        let ids: Vec<&str> = set.records().map(|c| c.cargo_id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C3"]);
        assert_eq!(set.entries[1].row.number(), 5);
    }

    #[test]
    fn test_cargo_volume_and_details() {
        let set: RecordSet<CargoRecord> = scan(table(
            "Cargas",
            &[
                &["Carga", "Volume (m³)", "Rota", "Peso"],
                &["C9", "12,5", "R-04", ""],
            ],
        ));

        let cargo = &set.entries[0].record;
        assert_eq!(cargo.volume, 12.5);
        assert_eq!(cargo.box_id, None);
        assert_eq!(cargo.details.get("Rota").map(String::as_str), Some("R-04"));
        assert!(!cargo.details.contains_key("Peso"));
    }

    #[test]
    fn test_attendance_to_fields_uses_physical_headers() {
        let base = table("Base", &[&["Supervisor", "Chapa", "Nome", "Data", "Turno"]]);
        let columns = ColumnMap::resolve(&base.headers, AttendanceRecord::FIELDS);
        let record = AttendanceRecord {
            supervisor: "Ana".to_string(),
            sheet_group: "G1".to_string(),
            employee_id: "17".to_string(),
            name: "Joao".to_string(),
            role: "Conferente".to_string(),
            status: "Presente".to_string(),
            deviation: None,
            date: "10/01/2024".to_string(),
            shift: ShiftLabel::Undefined,
        };

        let fields = record.to_fields(&columns);
        assert_eq!(fields.get("Chapa").map(String::as_str), Some("17"));
        assert_eq!(fields.get("Turno").map(String::as_str), Some(""));
        assert_eq!(fields.get("Desvio").map(String::as_str), Some(""));
    }

    #[test]
    fn test_collector_state_classification() {
        assert_eq!(CollectorState::classify("Disponível"), CollectorState::Available);
        assert_eq!(CollectorState::classify("Indisponível"), CollectorState::Maintenance);
        assert_eq!(CollectorState::classify("INDISPONIVEL"), CollectorState::Maintenance);
        assert_eq!(CollectorState::classify("Em uso"), CollectorState::InUse);
        assert_eq!(CollectorState::classify("MANUTENÇÃO"), CollectorState::Maintenance);
        assert_eq!(CollectorState::classify("quebrado"), CollectorState::Maintenance);
        assert_eq!(CollectorState::classify("perdido"), CollectorState::Other);
    }

    #[test]
    fn test_user_password_kept_verbatim() {
        let set: RecordSet<UserCredential> = scan(table(
            "Usuarios",
            &[&["Login", "Senha", "Nome"], &["ana", " s3cret", "Ana Lima"]],
        ));
        let user = &set.entries[0].record;
        assert_eq!(user.username, "ana");
        assert_eq!(user.password, " s3cret");
        assert_eq!(user.display_name, "Ana Lima");
    }
}
