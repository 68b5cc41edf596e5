//! Field normalization for human-entered spreadsheet values
//!
//! Shift and status labels are typed in by supervisors with inconsistent
//! abbreviations. Classification is expressed as ordered rule tables so that
//! rule order and fallback behavior can be tested on their own.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

// ========================================
// Shift labels
// ========================================

/// Canonical shift label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShiftLabel {
    ShiftA,
    ShiftB,
    ShiftC,
    Undefined,
    /// Non-empty value no rule recognized, kept literally (whitespace collapsed)
    Other(String),
}

impl ShiftLabel {
    pub fn label(&self) -> &str {
        match self {
            ShiftLabel::ShiftA => "Shift A",
            ShiftLabel::ShiftB => "Shift B",
            ShiftLabel::ShiftC => "Shift C",
            ShiftLabel::Undefined => "Undefined",
            ShiftLabel::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ShiftLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ShiftLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One entry of the shift rule table: predicate over the uppercased,
/// whitespace-collapsed label
type ShiftRule = (fn(&str) -> bool, ShiftLabel);

/// Ordered shift rules, first match wins.
///
/// C variants are tested before B, B before A: labels such as "A TC" resolve
/// to Shift C.
const SHIFT_RULES: &[ShiftRule] = &[
    (is_blank, ShiftLabel::Undefined),
    (is_undefined_synonym, ShiftLabel::Undefined),
    (is_direct_c, ShiftLabel::ShiftC),
    (is_direct_b, ShiftLabel::ShiftB),
    (is_direct_a, ShiftLabel::ShiftA),
    (is_variant_c, ShiftLabel::ShiftC),
    (is_variant_b, ShiftLabel::ShiftB),
    (is_variant_a, ShiftLabel::ShiftA),
];

const UNDEFINED_SYNONYMS: &[&str] = &[
    "NÃO DEFINIDO",
    "NAO DEFINIDO",
    "INDEFINIDO",
    "UNDEFINED",
    "SEM TURNO",
];

fn is_blank(s: &str) -> bool {
    s.is_empty()
}

fn is_undefined_synonym(s: &str) -> bool {
    UNDEFINED_SYNONYMS.contains(&s)
}

fn is_direct(s: &str, letter: char) -> bool {
    s == format!("SHIFT {letter}")
        || s == format!("TURNO {letter}")
        || s == format!("T{letter}")
        || s == letter.to_string()
}

fn is_direct_a(s: &str) -> bool {
    is_direct(s, 'A')
}

fn is_direct_b(s: &str) -> bool {
    is_direct(s, 'B')
}

fn is_direct_c(s: &str) -> bool {
    is_direct(s, 'C')
}

fn is_variant(s: &str, letter: char) -> bool {
    s.contains(&format!("TURNO {letter}"))
        || s == letter.to_string()
        || s.ends_with(&format!(" {letter}"))
        || s.starts_with(&format!("{letter} "))
        || s.contains(&format!(" T{letter}"))
        || s.contains(&format!("T{letter} "))
}

fn is_variant_a(s: &str) -> bool {
    is_variant(s, 'A')
}

fn is_variant_b(s: &str) -> bool {
    is_variant(s, 'B')
}

fn is_variant_c(s: &str) -> bool {
    is_variant(s, 'C')
}

/// Canonicalize a free-text shift label
///
/// Pure and idempotent: `normalize_shift(normalize_shift(x).label())`
/// equals `normalize_shift(x)`.
pub fn normalize_shift(raw: &str) -> ShiftLabel {
    let collapsed = collapse_whitespace(raw);
    let key = collapsed.to_uppercase();

    SHIFT_RULES
        .iter()
        .find(|(matches, _)| matches(&key))
        .map(|(_, label)| label.clone())
        .unwrap_or(ShiftLabel::Other(collapsed))
}

// ========================================
// Attendance status
// ========================================

/// Status bucket used for counting; the raw status text stays on the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLabel {
    Presente,
    Ausente,
    Atestado,
    Ferias,
    Folga,
    Afastado,
    Outros,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 7] = [
        StatusLabel::Presente,
        StatusLabel::Ausente,
        StatusLabel::Atestado,
        StatusLabel::Ferias,
        StatusLabel::Folga,
        StatusLabel::Afastado,
        StatusLabel::Outros,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatusLabel::Presente => "presente",
            StatusLabel::Ausente => "ausente",
            StatusLabel::Atestado => "atestado",
            StatusLabel::Ferias => "ferias",
            StatusLabel::Folga => "folga",
            StatusLabel::Afastado => "afastado",
            StatusLabel::Outros => "outros",
        }
    }
}

type StatusRule = (fn(&str) -> bool, StatusLabel);

const STATUS_RULES: &[StatusRule] = &[
    (|s| s.contains("féria") || s.contains("feria"), StatusLabel::Ferias),
    (|s| s == "presente", StatusLabel::Presente),
    (|s| s == "ausente", StatusLabel::Ausente),
    (|s| s == "atestado", StatusLabel::Atestado),
    (|s| s == "folga", StatusLabel::Folga),
    (|s| s == "afastado", StatusLabel::Afastado),
];

/// Classify a raw attendance status into its counting bucket
pub fn normalize_status(raw: &str) -> StatusLabel {
    let key = raw.trim().to_lowercase();

    STATUS_RULES
        .iter()
        .find(|(matches, _)| matches(&key))
        .map(|(_, label)| *label)
        .unwrap_or(StatusLabel::Outros)
}

/// Deviation flag: the deviation column literally says "desvio"
pub fn is_deviation(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("desvio")
}

// ========================================
// Numbers and dates
// ========================================

/// Parse a number that may use a comma decimal separator
///
/// Empty, non-numeric or non-finite input yields 0.0.
pub fn parse_locale_number(raw: &str) -> f64 {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Reformat a `YYYY-MM-DD` query parameter as `DD/MM/YYYY`
///
/// No calendar validation: `2024-13-45` becomes `45/13/2024`. Input without
/// exactly three dash-separated parts is returned trimmed.
pub fn parse_date_query_param(iso_date: &str) -> String {
    let trimmed = iso_date.trim();
    let parts: Vec<&str> = trimmed.split('-').collect();

    match parts.as_slice() {
        [year, month, day] => format!("{day}/{month}/{year}"),
        _ => trimmed.to_string(),
    }
}

// ========================================
// Text keys
// ========================================

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, accent-folded, whitespace-collapsed comparison key
pub fn fold_key(raw: &str) -> String {
    collapse_whitespace(raw)
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Locale-aware label ordering: accent- and case-insensitive first, raw
/// string as tie-break so the order is total
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    fold_key(a).cmp(&fold_key(b)).then_with(|| a.cmp(b))
}
