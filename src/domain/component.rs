//! Component entities
//!
//! A component is one catalog row: a CPU, GPU, PSU, RAM module, storage device or cooler.
//! Names are the natural key within a kind and are kept exactly as scraped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The six component tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Cpu,
    Gpu,
    Psu,
    Ram,
    Storage,
    Cooling,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Cpu,
        ComponentKind::Gpu,
        ComponentKind::Psu,
        ComponentKind::Ram,
        ComponentKind::Storage,
        ComponentKind::Cooling,
    ];

    /// Kinds populated by the scrape pipeline, in load order
    pub const SCRAPED: [ComponentKind; 3] =
        [ComponentKind::Cpu, ComponentKind::Gpu, ComponentKind::Psu];

    /// SQLite table name
    pub fn table(self) -> &'static str {
        match self {
            ComponentKind::Cpu => "cpus",
            ComponentKind::Gpu => "gpus",
            ComponentKind::Psu => "psus",
            ComponentKind::Ram => "ram",
            ComponentKind::Storage => "storages",
            ComponentKind::Cooling => "cooling",
        }
    }

    /// URL path segment used by the HTTP API (same as the table name)
    pub fn path_segment(self) -> &'static str {
        self.table()
    }

    /// Human readable label, used in log lines and 404 messages
    pub fn label(self) -> &'static str {
        match self {
            ComponentKind::Cpu => "CPU",
            ComponentKind::Gpu => "GPU",
            ComponentKind::Psu => "PSU",
            ComponentKind::Ram => "RAM",
            ComponentKind::Storage => "Storage",
            ComponentKind::Cooling => "Cooling",
        }
    }

    pub fn is_scraped(self) -> bool {
        Self::SCRAPED.contains(&self)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown component type: {0}")]
pub struct UnknownComponent(pub String);

impl FromStr for ComponentKind {
    type Err = UnknownComponent;

    /// Parses an API path segment (`cpus`, `gpus`, ...)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.path_segment() == s)
            .ok_or_else(|| UnknownComponent(s.to_string()))
    }
}

/// CPU, GPU and RAM rows: power draw kept as free text, e.g. `"65 W"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRecord {
    pub name: String,
    pub consumption: String,
}

/// PSU rows: wattage always resolved and inside the plausible band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsuRecord {
    pub name: String,
    pub wattage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRecord {
    pub name: String,
    pub consumption: String,
    #[serde(rename = "type", default)]
    pub storage_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoolingRecord {
    pub name: String,
    pub size: String,
    #[serde(default)]
    pub has_led: bool,
}

/// One persisted component of any kind.
///
/// Serialises untagged, so API clients see the plain row shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ComponentRecord {
    Cpu(PowerRecord),
    Gpu(PowerRecord),
    Psu(PsuRecord),
    Ram(PowerRecord),
    Storage(StorageRecord),
    Cooling(CoolingRecord),
}

impl ComponentRecord {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentRecord::Cpu(_) => ComponentKind::Cpu,
            ComponentRecord::Gpu(_) => ComponentKind::Gpu,
            ComponentRecord::Psu(_) => ComponentKind::Psu,
            ComponentRecord::Ram(_) => ComponentKind::Ram,
            ComponentRecord::Storage(_) => ComponentKind::Storage,
            ComponentRecord::Cooling(_) => ComponentKind::Cooling,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ComponentRecord::Cpu(r) | ComponentRecord::Gpu(r) | ComponentRecord::Ram(r) => &r.name,
            ComponentRecord::Psu(r) => &r.name,
            ComponentRecord::Storage(r) => &r.name,
            ComponentRecord::Cooling(r) => &r.name,
        }
    }

    /// Wraps a free-text power record for the given kind; `None` for PSU/Storage/Cooling
    pub fn power(kind: ComponentKind, record: PowerRecord) -> Option<Self> {
        match kind {
            ComponentKind::Cpu => Some(ComponentRecord::Cpu(record)),
            ComponentKind::Gpu => Some(ComponentRecord::Gpu(record)),
            ComponentKind::Ram => Some(ComponentRecord::Ram(record)),
            _ => None,
        }
    }
}

impl From<PsuRecord> for ComponentRecord {
    fn from(record: PsuRecord) -> Self {
        ComponentRecord::Psu(record)
    }
}

/// A `(name, consumption)` pair as it comes out of a scraped table, before typing.
///
/// `consumption` may be empty for PSU rows, where it is only a wattage hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComponentRow {
    pub name: String,
    pub consumption: String,
}

impl RawComponentRow {
    pub fn new(name: impl Into<String>, consumption: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumption: consumption.into(),
        }
    }

    /// The power text, or `None` when the cell was empty
    pub fn consumption_hint(&self) -> Option<&str> {
        let hint = self.consumption.trim();
        (!hint.is_empty()).then_some(hint)
    }

    pub fn into_power_record(self) -> PowerRecord {
        PowerRecord {
            name: self.name,
            consumption: self.consumption,
        }
    }
}

/// Keep the first row for each name, preserving order
pub fn dedupe_by_name(rows: Vec<RawComponentRow>) -> Vec<RawComponentRow> {
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_path_round_trip() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.path_segment().parse::<ComponentKind>(), Ok(kind));
        }
        assert!("motherboards".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_scraped_kinds_are_ordered() {
        assert_eq!(
            ComponentKind::SCRAPED,
            [ComponentKind::Cpu, ComponentKind::Gpu, ComponentKind::Psu]
        );
        assert!(!ComponentKind::Cooling.is_scraped());
    }

    #[test]
    fn test_records_serialize_as_plain_rows() {
        let psu = ComponentRecord::from(PsuRecord {
            name: "Corsair RM750x".into(),
            wattage: 750,
        });
        assert_eq!(
            serde_json::to_value(&psu).unwrap(),
            serde_json::json!({"name": "Corsair RM750x", "wattage": 750})
        );

        let storage = ComponentRecord::Storage(StorageRecord {
            name: "WD Blue".into(),
            consumption: "6 W".into(),
            storage_type: "HDD".into(),
        });
        assert_eq!(
            serde_json::to_value(&storage).unwrap(),
            serde_json::json!({"name": "WD Blue", "consumption": "6 W", "type": "HDD"})
        );
    }

    #[test]
    fn test_power_wrapper_rejects_structured_kinds() {
        let record = PowerRecord {
            name: "x".into(),
            consumption: "1".into(),
        };
        assert!(ComponentRecord::power(ComponentKind::Psu, record.clone()).is_none());
        assert_eq!(
            ComponentRecord::power(ComponentKind::Gpu, record).map(|r| r.kind()),
            Some(ComponentKind::Gpu)
        );
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let rows = vec![
            RawComponentRow::new("A", "1"),
            RawComponentRow::new("B", "2"),
            RawComponentRow::new("A", "3"),
            RawComponentRow::new("a", "4"),
        ];
        let deduped = dedupe_by_name(rows);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].consumption, "1");
    }

    #[test]
    fn test_consumption_hint() {
        assert_eq!(RawComponentRow::new("x", "  ").consumption_hint(), None);
        assert_eq!(RawComponentRow::new("x", " 750 W ").consumption_hint(), Some("750 W"));
    }
}
