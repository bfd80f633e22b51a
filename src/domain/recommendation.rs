//! PSU recommendation for a CPU + GPU pair
//!
//! Used by the `psu_advisor` client against the HTTP API lists.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::component::{PowerRecord, PsuRecord};

/// Fixed allowance for the rest of the system (board, drives, fans)
pub const BASE_SYSTEM_WATTS: u32 = 200;

/// Headroom applied on top of the estimated draw, as a percentage
pub const HEADROOM_PERCENT: u32 = 20;

pub const DEFAULT_RECOMMENDATIONS: usize = 5;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// First run of ASCII digits in a free-text power value; 0 when there is none
pub fn parse_watts(text: &str) -> u32 {
    FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Exact name match first, then the first case-insensitive substring match
pub fn find_component<'a>(entries: &'a [PowerRecord], query: &str) -> Option<&'a PowerRecord> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    if let Some(exact) = entries.iter().find(|e| e.name == query) {
        return Some(exact);
    }
    let needle = query.to_lowercase();
    entries
        .iter()
        .find(|e| e.name.to_lowercase().contains(&needle))
}

/// `ceil((cpu + gpu + 200) * 1.20)`, computed in `u64` so no pair of parsed ratings overflows
pub fn required_wattage(cpu_watts: u32, gpu_watts: u32) -> u64 {
    let total = u64::from(cpu_watts) + u64::from(gpu_watts) + u64::from(BASE_SYSTEM_WATTS);
    (total * u64::from(100 + HEADROOM_PERCENT)).div_ceil(100)
}

/// PSUs that cover `required`, smallest first, at most `limit`
pub fn recommend_psus(psus: &[PsuRecord], required: u64, limit: usize) -> Vec<PsuRecord> {
    let mut suitable: Vec<PsuRecord> = psus
        .iter()
        .filter(|psu| u64::from(psu.wattage) >= required)
        .cloned()
        .collect();
    suitable.sort_by(|a, b| a.wattage.cmp(&b.wattage).then_with(|| a.name.cmp(&b.name)));
    suitable.truncate(limit);
    suitable
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn power(name: &str, consumption: &str) -> PowerRecord {
        PowerRecord {
            name: name.to_string(),
            consumption: consumption.to_string(),
        }
    }

    fn psu(name: &str, wattage: u32) -> PsuRecord {
        PsuRecord {
            name: name.to_string(),
            wattage,
        }
    }

    #[rstest]
    #[case("65 W", 65)]
    #[case("TDP: 125W (boost 181W)", 125)]
    #[case("n/a", 0)]
    #[case("", 0)]
    fn test_parse_watts(#[case] text: &str, #[case] expected: u32) {
        assert_eq!(parse_watts(text), expected);
    }

    #[rstest]
    #[case(65, 220, 582)]
    #[case(0, 0, 240)]
    #[case(1, 0, 242)]
    #[case(125, 450, 930)]
    #[case(4_000_000_000, 4_000_000_000, 9_600_000_240)]
    #[case(u32::MAX, u32::MAX, 10_307_921_748)]
    fn test_required_wattage(#[case] cpu: u32, #[case] gpu: u32, #[case] expected: u64) {
        assert_eq!(required_wattage(cpu, gpu), expected);
    }

    #[test]
    fn test_absurd_ratings_leave_nothing_to_recommend() {
        let cpu_watts = parse_watts("4000000000");
        let required = required_wattage(cpu_watts, 0);

        assert!(recommend_psus(&[psu("Big", 2000)], required, DEFAULT_RECOMMENDATIONS).is_empty());
    }

    #[test]
    fn test_find_component_prefers_exact_match() {
        let entries = vec![
            power("AMD Ryzen 5 5600X3D", "105 W"),
            power("AMD Ryzen 5 5600X", "65 W"),
        ];
        assert_eq!(
            find_component(&entries, "AMD Ryzen 5 5600X").map(|e| e.consumption.as_str()),
            Some("65 W")
        );
        assert_eq!(
            find_component(&entries, "5600x3d").map(|e| e.consumption.as_str()),
            Some("105 W")
        );
        assert!(find_component(&entries, "Core i9").is_none());
        assert!(find_component(&entries, "  ").is_none());
    }

    #[test]
    fn test_recommend_psus_sorted_and_limited() {
        let psus = vec![
            psu("Big", 1600),
            psu("Small", 450),
            psu("Exact", 582),
            psu("A", 650),
            psu("B", 750),
            psu("C", 850),
            psu("D", 1000),
        ];

        let picks = recommend_psus(&psus, 582, DEFAULT_RECOMMENDATIONS);

        let names: Vec<&str> = picks.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Exact", "A", "B", "C", "D"]);
    }
}
