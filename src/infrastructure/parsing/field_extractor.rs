//! Name/power field extraction from scraped tables
//!
//! No two catalog sites share a schema, so the name and power columns are located by
//! header keywords, with positional fallbacks when the headers say nothing useful.

use tracing::debug;

use super::error::ParsingResult;
use super::table::{ScrapedTable, tables_from_html};
use crate::domain::component::{ComponentKind, RawComponentRow};

/// Cell values treated as missing (compared case-insensitively after trimming)
pub const MISSING_SENTINELS: [&str; 6] = ["", "nan", "none", "null", "n/a", "-"];

/// Keyword hints for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRules {
    pub name_keywords: &'static [&'static str],
    pub power_keywords: &'static [&'static str],
    /// Drop rows whose power cell is missing. PSU rows keep them; the power text is only a hint there.
    pub power_required: bool,
}

pub const CPU_RULES: ExtractionRules = ExtractionRules {
    name_keywords: &["cpu", "name", "processor", "model", "title"],
    power_keywords: &["tdp", "power", "watt"],
    power_required: true,
};

pub const GPU_RULES: ExtractionRules = ExtractionRules {
    name_keywords: &["gpu", "name", "model", "chip", "title"],
    power_keywords: &["tdp", "board power", "power", "watt"],
    power_required: true,
};

pub const PSU_RULES: ExtractionRules = ExtractionRules {
    name_keywords: &["psu", "name", "model", "product", "title"],
    power_keywords: &["wattage", "power", "watt"],
    power_required: false,
};

impl ExtractionRules {
    /// Rules for a scraped kind; `None` for CRUD-only kinds
    pub fn for_kind(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::Cpu => Some(CPU_RULES),
            ComponentKind::Gpu => Some(GPU_RULES),
            ComponentKind::Psu => Some(PSU_RULES),
            _ => None,
        }
    }
}

/// Resolved column positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: usize,
    /// `None` only for single-column tables
    pub power: Option<usize>,
}

/// Rows pulled out of a table plus the number of rows rejected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub rows: Vec<RawComponentRow>,
    pub dropped: usize,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append another page's extraction
    pub fn merge(&mut self, other: Extraction) {
        self.rows.extend(other.rows);
        self.dropped += other.dropped;
    }
}

pub fn is_missing(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    MISSING_SENTINELS.contains(&value.as_str())
}

/// First header (left to right) containing any keyword, ignoring case
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let header = header.to_lowercase();
        keywords.iter().any(|keyword| header.contains(keyword))
    })
}

/// Locate the name and power columns.
///
/// Name falls back to column 0, power to the last column (at least column 1). When both land
/// on the same column, power moves to the last column that is not the name column.
pub fn detect_columns(table: &ScrapedTable, rules: &ExtractionRules) -> ColumnMap {
    let column_count = table.column_count();
    let name = find_column(&table.headers, rules.name_keywords).unwrap_or(0);

    let power = find_column(&table.headers, rules.power_keywords)
        .unwrap_or_else(|| column_count.saturating_sub(1).max(1));

    let power = if power == name {
        (0..column_count).rev().find(|idx| *idx != name)
    } else {
        Some(power)
    };

    ColumnMap { name, power }
}

/// Extract `(name, consumption)` pairs from one table
pub fn extract(table: &ScrapedTable, rules: &ExtractionRules) -> Extraction {
    let columns = detect_columns(table, rules);
    let mut extraction = Extraction::default();

    for (idx, cells) in table.rows.iter().enumerate() {
        let name = cells.get(columns.name).map(|s| s.trim()).unwrap_or("");
        let power = columns
            .power
            .and_then(|col| cells.get(col))
            .map(|s| s.trim())
            .unwrap_or("");

        if is_missing(name) || (rules.power_required && is_missing(power)) {
            debug!("Dropping row {}: name={:?} power={:?}", idx, name, power);
            extraction.dropped += 1;
            continue;
        }

        let consumption = if is_missing(power) { "" } else { power };
        extraction.rows.push(RawComponentRow::new(name, consumption));
    }

    extraction
}

/// Extract from every table and keep the one yielding the most rows (first wins a tie)
pub fn extract_best(tables: &[ScrapedTable], rules: &ExtractionRules) -> Extraction {
    tables
        .iter()
        .map(|table| extract(table, rules))
        .fold(Extraction::default(), |best, candidate| {
            if candidate.rows.len() > best.rows.len() {
                candidate
            } else {
                best
            }
        })
}

/// Extract from an HTML document
pub fn extract_from_html(html: &str, rules: &ExtractionRules) -> Extraction {
    extract_best(&tables_from_html(html), rules)
}

/// Extract from a JSON listing payload
pub fn extract_from_json(body: &str, rules: &ExtractionRules) -> ParsingResult<Extraction> {
    let table = ScrapedTable::from_json_str(body)?;
    Ok(extract(&table, rules))
}
