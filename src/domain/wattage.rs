//! PSU wattage resolution
//!
//! Product names on PSU catalogs rarely carry a clean wattage column, so the wattage is
//! recovered from the power hint or the name with an ordered list of numeric patterns.
//! The first number inside [`WATTAGE_BAND`] wins; anything else is rejected so model years
//! and revision numbers never become wattages.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::RangeInclusive;
use tracing::debug;

use crate::domain::component::{PsuRecord, RawComponentRow};

pub const MIN_WATTAGE: u32 = 300;
pub const MAX_WATTAGE: u32 = 2000;

/// Plausible PSU output power
pub const WATTAGE_BAND: RangeInclusive<u32> = MIN_WATTAGE..=MAX_WATTAGE;

/// Any number in the hint, optionally followed by `W`
static HINT_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*W?").unwrap());

/// Explicit `750W` / `750 w` in the name
static NAME_EXPLICIT_WATTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s*W\b").unwrap());

/// SKU shapes such as `RM-750x`, `RM750x`, `SF/600L`
static NAME_MODEL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[-_/.\s]|[A-Za-z])(\d{3,4})[A-Za-z]").unwrap());

/// Standalone 3-4 digit token
static NAME_BARE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{3,4})\b").unwrap());

pub fn in_band(watts: u32) -> bool {
    WATTAGE_BAND.contains(&watts)
}

fn first_in_band(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .find(|watts| in_band(*watts))
}

/// Resolve a PSU wattage from its name and optional power hint.
///
/// Tried in order, first in-band match wins:
/// 1. any number in `hint`
/// 2. a number followed by `W` in `name`
/// 3. a 3-4 digit model code in `name` (separator or letter before, letter after)
/// 4. any standalone 3-4 digit token in `name`
pub fn resolve_wattage(name: &str, hint: Option<&str>) -> Option<u32> {
    if let Some(watts) = hint.and_then(|hint| first_in_band(&HINT_NUMBER, hint)) {
        return Some(watts);
    }

    [&*NAME_EXPLICIT_WATTS, &*NAME_MODEL_CODE, &*NAME_BARE_DIGITS]
        .into_iter()
        .find_map(|pattern| first_in_band(pattern, name))
}

/// Resolve a batch of scraped PSU rows; rows without a plausible wattage are dropped and counted
pub fn resolve_psus(rows: Vec<RawComponentRow>) -> (Vec<PsuRecord>, usize) {
    let mut dropped = 0;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        match resolve_wattage(&row.name, row.consumption_hint()) {
            Some(wattage) => records.push(PsuRecord {
                name: row.name,
                wattage,
            }),
            None => {
                debug!("Dropping PSU without plausible wattage: {:?} (hint {:?})", row.name, row.consumption);
                dropped += 1;
            }
        }
    }

    (records, dropped)
}
