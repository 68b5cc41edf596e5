//! Daily Summary Aggregator
//!
//! Turns Base rows into per-supervisor, per-role and overall counts for one
//! reference date. Pure: no store access, no caching.
//!
//! **Algorithm:** single pass in input order. A record is kept when its
//! trimmed date string equals the reference date (string equality, so
//! "1/2/2024" and "01/02/2024" are different days) and its name is not
//! empty. Every kept record bumps three accumulators at once (its
//! supervisor, its role, overall) and appends a member tuple to its
//! supervisor's and its role's member lists.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use wops_common::normalize::{locale_cmp, normalize_shift};
use wops_common::records::AttendanceRecord;
use wops_common::{ShiftLabel, StatusLabel};

/// Count per status bucket; every record lands in exactly one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub presente: usize,
    pub ausente: usize,
    pub atestado: usize,
    pub ferias: usize,
    pub folga: usize,
    pub afastado: usize,
    pub outros: usize,
}

impl StatusCounts {
    fn slot(&mut self, label: StatusLabel) -> &mut usize {
        match label {
            StatusLabel::Presente => &mut self.presente,
            StatusLabel::Ausente => &mut self.ausente,
            StatusLabel::Atestado => &mut self.atestado,
            StatusLabel::Ferias => &mut self.ferias,
            StatusLabel::Folga => &mut self.folga,
            StatusLabel::Afastado => &mut self.afastado,
            StatusLabel::Outros => &mut self.outros,
        }
    }

    pub fn get(&self, label: StatusLabel) -> usize {
        match label {
            StatusLabel::Presente => self.presente,
            StatusLabel::Ausente => self.ausente,
            StatusLabel::Atestado => self.atestado,
            StatusLabel::Ferias => self.ferias,
            StatusLabel::Folga => self.folga,
            StatusLabel::Afastado => self.afastado,
            StatusLabel::Outros => self.outros,
        }
    }

    pub fn sum(&self) -> usize {
        StatusLabel::ALL.iter().map(|l| self.get(*l)).sum()
    }
}

/// Running totals for one aggregation target
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub counts: StatusCounts,
    /// Records flagged as deviation (orthogonal to the status buckets)
    pub deviations: usize,
}

impl Tally {
    fn add(&mut self, status: StatusLabel, deviation: bool) {
        self.total += 1;
        *self.counts.slot(status) += 1;
        if deviation {
            self.deviations += 1;
        }
    }

    pub fn percentages(&self) -> Percentages {
        Percentages::compute(self.counts.presente, self.deviations, self.total)
    }
}

/// Percentages rounded to one decimal place; all zero when total is zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Percentages {
    #[serde(rename = "percentPresente", serialize_with = "one_decimal")]
    pub present: f64,
    #[serde(rename = "percentAusente", serialize_with = "one_decimal")]
    pub absent: f64,
    #[serde(rename = "percentDesvio", serialize_with = "one_decimal")]
    pub deviation: f64,
}

impl Percentages {
    pub fn compute(present: usize, deviations: usize, total: usize) -> Self {
        if total == 0 {
            return Self::default();
        }
        let pct = |n: usize| round1(n as f64 / total as f64 * 100.0);
        Self {
            present: pct(present),
            absent: pct(total - present),
            deviation: pct(deviations),
        }
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.1}", value))
}

/// Lightweight member tuple listed under a group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub employee_id: String,
    pub name: String,
    pub supervisor: String,
    pub role: String,
    pub status: StatusLabel,
    pub raw_status: String,
    pub deviation: bool,
    pub shift: ShiftLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorSummary {
    pub supervisor: String,
    #[serde(flatten)]
    pub tally: Tally,
    #[serde(flatten)]
    pub percentages: Percentages,
    /// Members per role under this supervisor
    pub roles: BTreeMap<String, usize>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub role: String,
    #[serde(flatten)]
    pub tally: Tally,
    #[serde(flatten)]
    pub percentages: Percentages,
    /// Members per supervisor holding this role
    pub supervisors: BTreeMap<String, usize>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverallSummary {
    #[serde(flatten)]
    pub tally: Tally,
    #[serde(flatten)]
    pub percentages: Percentages,
}

/// Derived view of one day; rebuilt on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: String,
    pub per_supervisor: Vec<SupervisorSummary>,
    pub per_role: Vec<RoleSummary>,
    pub overall: OverallSummary,
}

#[derive(Default)]
struct GroupAcc {
    tally: Tally,
    breakdown: BTreeMap<String, usize>,
    members: Vec<Member>,
}

impl GroupAcc {
    fn add(&mut self, member: &Member, other_key: &str) {
        self.tally.add(member.status, member.deviation);
        *self.breakdown.entry(other_key.to_string()).or_default() += 1;
        self.members.push(member.clone());
    }
}

/// Summarize every record of `reference_date`
pub fn summarize(records: &[AttendanceRecord], reference_date: &str) -> DailySummary {
    summarize_with(records, reference_date, None)
}

/// Summarize `reference_date`, optionally keeping only one shift
pub fn summarize_with(
    records: &[AttendanceRecord],
    reference_date: &str,
    shift: Option<&ShiftLabel>,
) -> DailySummary {
    let reference_date = reference_date.trim();
    let mut overall = Tally::default();
    let mut by_supervisor: HashMap<String, GroupAcc> = HashMap::new();
    let mut by_role: HashMap<String, GroupAcc> = HashMap::new();

    for record in records {
        if record.date.trim() != reference_date || record.name.trim().is_empty() {
            continue;
        }
        if shift.is_some_and(|s| *s != record.shift) {
            continue;
        }

        let member = Member {
            employee_id: record.employee_id.clone(),
            name: record.name.trim().to_string(),
            supervisor: record.supervisor.clone(),
            role: record.role.clone(),
            status: record.status_label(),
            raw_status: record.status.clone(),
            deviation: record.is_deviation(),
            shift: record.shift.clone(),
        };

        overall.add(member.status, member.deviation);
        by_supervisor
            .entry(record.supervisor.clone())
            .or_default()
            .add(&member, &record.role);
        by_role
            .entry(record.role.clone())
            .or_default()
            .add(&member, &record.supervisor);
    }

    let mut per_supervisor: Vec<SupervisorSummary> = by_supervisor
        .into_iter()
        .map(|(supervisor, acc)| SupervisorSummary {
            supervisor,
            percentages: acc.tally.percentages(),
            tally: acc.tally,
            roles: acc.breakdown,
            members: acc.members,
        })
        .collect();
    per_supervisor.sort_by(|a, b| locale_cmp(&a.supervisor, &b.supervisor));

    let mut per_role: Vec<RoleSummary> = by_role
        .into_iter()
        .map(|(role, acc)| RoleSummary {
            role,
            percentages: acc.tally.percentages(),
            tally: acc.tally,
            supervisors: acc.breakdown,
            members: acc.members,
        })
        .collect();
    per_role.sort_by(|a, b| locale_cmp(&a.role, &b.role));

    DailySummary {
        date: reference_date.to_string(),
        per_supervisor,
        per_role,
        overall: OverallSummary {
            percentages: overall.percentages(),
            tally: overall,
        },
    }
}

/// Parse an optional shift query value; blank means "all shifts"
pub fn shift_filter(raw: Option<&str>) -> Option<ShiftLabel> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(supervisor: &str, date: &str, name: &str, status: &str) -> AttendanceRecord {
        AttendanceRecord {
            supervisor: supervisor.to_string(),
            sheet_group: String::new(),
            employee_id: format!("id-{}", name),
            name: name.to_string(),
            role: "Conferente".to_string(),
            status: status.to_string(),
            deviation: None,
            date: date.to_string(),
            shift: ShiftLabel::Undefined,
        }
    }

    #[test]
    fn test_two_supervisors_two_days() {
        let records = vec![
            record("Ana", "10/01/2024", "Joao", "Presente"),
            record("Ana", "10/01/2024", "Rosa", "Ausente"),
            record("Bia", "11/01/2024", "Lia", "Presente"),
        ];

        let summary = summarize(&records, "10/01/2024");

        assert_eq!(summary.overall.tally.total, 2);
        assert_eq!(summary.overall.tally.counts.presente, 1);
        assert_eq!(summary.overall.tally.counts.ausente, 1);
        assert_eq!(summary.overall.percentages.present, 50.0);
        assert_eq!(summary.per_supervisor.len(), 1);
        assert_eq!(summary.per_supervisor[0].supervisor, "Ana");
        assert_eq!(summary.per_supervisor[0].tally.total, 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["overall"]["percentPresente"], "50.0");
        assert_eq!(json["overall"]["total"], 2);
        assert_eq!(json["perSupervisor"][0]["counts"]["ausente"], 1);
    }

    #[test]
    fn test_other_dates_excluded_everywhere() {
        let records = vec![
            record("Ana", "10/01/2024", "Joao", "Presente"),
            record("Bia", "11/01/2024", "Lia", "Presente"),
            record("Caio", "10/1/2024", "Rui", "Presente"),
        ];

        let summary = summarize(&records, "10/01/2024");

        assert_eq!(summary.overall.tally.total, 1);
        assert!(summary.per_supervisor.iter().all(|s| s.supervisor == "Ana"));
        let role_members: usize = summary.per_role.iter().map(|r| r.members.len()).sum();
        assert_eq!(role_members, 1);
    }

    #[test]
    fn test_blank_names_excluded() {
        let records = vec![
            record("Ana", "10/01/2024", "", "Presente"),
            record("Ana", "10/01/2024", "   ", "Presente"),
            record("Ana", "10/01/2024", "Joao", "Folga"),
        ];

        let summary = summarize(&records, " 10/01/2024 ");
        assert_eq!(summary.overall.tally.total, 1);
        assert_eq!(summary.overall.tally.counts.folga, 1);
    }

    #[test]
    fn test_bucket_counts_sum_to_total() {
        let statuses = [
            "Presente", "ausente", "Atestado", "Férias", "folga", "Afastado", "", "treinamento",
            "Presente",
        ];
        let records: Vec<AttendanceRecord> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| record(if i % 2 == 0 { "Ana" } else { "Bia" }, "10/01/2024", &format!("w{}", i), s))
            .collect();

        let summary = summarize(&records, "10/01/2024");

        assert_eq!(summary.overall.tally.total, statuses.len());
        assert_eq!(summary.overall.tally.counts.sum(), summary.overall.tally.total);
        assert_eq!(summary.overall.tally.counts.outros, 2);
        for group in &summary.per_supervisor {
            assert_eq!(group.tally.counts.sum(), group.tally.total);
        }
        for group in &summary.per_role {
            assert_eq!(group.tally.counts.sum(), group.tally.total);
        }
    }

    #[test]
    fn test_percentages_rounding_and_zero_total() {
        let p = Percentages::compute(1, 1, 3);
        assert_eq!(p.present, 33.3);
        assert_eq!(p.absent, 66.7);
        assert_eq!(p.deviation, 33.3);

        let p = Percentages::compute(2, 0, 3);
        assert_eq!(p.present, round1(2.0 / 3.0 * 100.0));

        assert_eq!(Percentages::compute(0, 0, 0), Percentages::default());
        let empty = summarize(&[], "10/01/2024");
        assert_eq!(empty.overall.percentages.present, 0.0);
        assert_eq!(empty.overall.percentages.absent, 0.0);
    }

    #[test]
    fn test_deviation_is_orthogonal_flag() {
        let mut flagged = record("Ana", "10/01/2024", "Joao", "Presente");
        flagged.deviation = Some("Desvio".to_string());
        let mut other_text = record("Ana", "10/01/2024", "Rosa", "Presente");
        other_text.deviation = Some("empréstimo".to_string());

        let summary = summarize(&[flagged, other_text], "10/01/2024");

        assert_eq!(summary.overall.tally.counts.presente, 2);
        assert_eq!(summary.overall.tally.deviations, 1);
        assert_eq!(summary.overall.percentages.deviation, 50.0);
        assert!(summary.per_supervisor[0].members[0].deviation);
    }

    #[test]
    fn test_groups_sorted_locale_aware_members_in_input_order() {
        let mut records = vec![
            record("bruno", "10/01/2024", "Z1", "Presente"),
            record("Álvaro", "10/01/2024", "Z2", "Presente"),
            record("Carla", "10/01/2024", "Z3", "Presente"),
            record("Álvaro", "10/01/2024", "A4", "Ausente"),
        ];
        records[1].role = "Operador".to_string();
        records[3].role = "Empilhador".to_string();

        let summary = summarize(&records, "10/01/2024");

        let supervisors: Vec<&str> = summary.per_supervisor.iter().map(|s| s.supervisor.as_str()).collect();
        assert_eq!(supervisors, vec!["Álvaro", "bruno", "Carla"]);

        let alvaro = &summary.per_supervisor[0];
        let names: Vec<&str> = alvaro.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Z2", "A4"]);
        assert_eq!(alvaro.roles.get("Operador"), Some(&1));
        assert_eq!(alvaro.roles.get("Empilhador"), Some(&1));

        let roles: Vec<&str> = summary.per_role.iter().map(|r| r.role.as_str()).collect();
        assert_eq!(roles, vec!["Conferente", "Empilhador", "Operador"]);
        assert_eq!(summary.per_role[0].supervisors.get("bruno"), Some(&1));
    }

    #[test]
    fn test_shift_filter() {
        let mut a = record("Ana", "10/01/2024", "Joao", "Presente");
        a.shift = ShiftLabel::ShiftA;
        let mut c = record("Ana", "10/01/2024", "Rosa", "Presente");
        c.shift = ShiftLabel::ShiftC;

        let filter = shift_filter(Some("turno c"));
        let summary = summarize_with(&[a, c], "10/01/2024", filter.as_ref());

        assert_eq!(summary.overall.tally.total, 1);
        assert_eq!(summary.per_supervisor[0].members[0].name, "Rosa");
        assert_eq!(shift_filter(Some("  ")), None);
        assert_eq!(shift_filter(None), None);
    }
}
