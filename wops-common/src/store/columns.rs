//! Column alias resolution
//!
//! Sheets drift: the same logical column shows up as "Matricula",
//! "Matrícula" or "Chapa" depending on who built the sheet. A [`ColumnMap`]
//! is built once per table read from the header row and maps each logical
//! [`Field`] to the first physical header matching one of its aliases.
//! An unresolved field reads as "" and writes to its canonical header.

use super::{Fields, Row};
use crate::normalize::fold_key;
use std::collections::HashMap;
use tracing::debug;

/// Logical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Supervisor,
    Group,
    EmployeeId,
    Name,
    Role,
    Status,
    Deviation,
    Date,
    Shift,
    CargoId,
    Box,
    Store,
    StoreType,
    Segment,
    Volume,
    CollectorId,
    Operator,
    UpdatedAt,
    Username,
    Password,
}

impl Field {
    /// Header written when the table is created by us
    pub fn canonical(self) -> &'static str {
        match self {
            Field::Supervisor => "Supervisor",
            Field::Group => "Grupo",
            Field::EmployeeId => "Matricula",
            Field::Name => "Nome",
            Field::Role => "Funcao",
            Field::Status => "Status",
            Field::Deviation => "Desvio",
            Field::Date => "Data",
            Field::Shift => "Turno",
            Field::CargoId => "Carga",
            Field::Box => "Box",
            Field::Store => "Loja",
            Field::StoreType => "Tipo",
            Field::Segment => "Segmento",
            Field::Volume => "Volume",
            Field::CollectorId => "Coletor",
            Field::Operator => "Operador",
            Field::UpdatedAt => "Atualizado em",
            Field::Username => "Usuario",
            Field::Password => "Senha",
        }
    }

    /// Alternative spellings, tried after the canonical header
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Supervisor => &["Supervisora", "Líder"],
            Field::Group => &["Planilha", "Equipe"],
            Field::EmployeeId => &["Matrícula", "ID", "Chapa"],
            Field::Name => &["Colaborador", "Funcionário"],
            Field::Role => &["Função", "Cargo"],
            Field::Status => &["Situação"],
            Field::Deviation => &["Desvio de Função"],
            Field::Date => &["Dia"],
            Field::Shift => &["Shift"],
            Field::CargoId => &["ID Carga", "Carga ID"],
            Field::Box => &["Boxe", "Doca"],
            Field::Store => &["Destino"],
            Field::StoreType => &["Tipo Loja"],
            Field::Segment => &["Bandeira"],
            Field::Volume => &["Volume (m³)", "M3"],
            Field::CollectorId => &["ID Coletor", "Serial"],
            Field::Operator => &["Colaborador"],
            Field::UpdatedAt => &["Atualizado", "Data"],
            Field::Username => &["Usuário", "Login"],
            Field::Password => &["Password"],
        }
    }

    fn matches(self, header: &str) -> bool {
        let key = fold_key(header);
        !key.is_empty()
            && std::iter::once(self.canonical())
                .chain(self.aliases().iter().copied())
                .any(|alias| fold_key(alias) == key)
    }
}

/// Canonical header row for a set of fields
pub fn canonical_headers(fields: &[Field]) -> Vec<&'static str> {
    fields.iter().map(|f| f.canonical()).collect()
}

/// Logical field → physical header, resolved from one table's header row
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    resolved: HashMap<Field, String>,
}

impl ColumnMap {
    /// Resolve `fields` against `headers`; first matching header wins
    pub fn resolve(headers: &[String], fields: &[Field]) -> Self {
        let mut resolved = HashMap::new();

        for &field in fields {
            match headers.iter().find(|h| field.matches(h)) {
                Some(header) => {
                    resolved.insert(field, header.clone());
                }
                None => debug!(field = field.canonical(), "Column not present; reads as empty"),
            }
        }

        Self { resolved }
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.resolved.contains_key(&field)
    }

    /// Physical header for `field`, or its canonical name when unresolved
    pub fn header(&self, field: Field) -> &str {
        self.resolved
            .get(&field)
            .map(String::as_str)
            .unwrap_or_else(|| field.canonical())
    }

    /// Trimmed value of `field` in `row`; "" when unresolved
    pub fn get<'r>(&self, row: &'r Row, field: Field) -> &'r str {
        match self.resolved.get(&field) {
            Some(header) => row.get(header).trim(),
            None => "",
        }
    }

    /// Set `field` in `row`; false when the table has no column for it
    pub fn set(&self, row: &mut Row, field: Field, value: impl Into<String>) -> bool {
        row.set(self.header(field), value)
    }

    /// Physical headers that no resolved field claims
    pub fn unclaimed<'h>(&self, headers: &'h [String]) -> Vec<&'h str> {
        headers
            .iter()
            .filter(|h| !h.is_empty() && !self.resolved.values().any(|r| r == *h))
            .map(String::as_str)
            .collect()
    }

    /// Build append fields keyed by physical header
    pub fn fields(&self, values: &[(Field, String)]) -> Fields {
        values
            .iter()
            .map(|(field, value)| (self.header(*field).to_string(), value.clone()))
            .collect()
    }
}
