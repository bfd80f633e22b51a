//! Domain module - Core entities and rules
//!
//! This module contains the component entities, the PSU wattage rules,
//! the recommendation arithmetic and the repository traits.
//!
//! Modern Rust module organization (Rust 2018+ style):
//! - Each module is its own file in the domain/ directory
//! - Public exports are defined here for convenience

pub mod component;
pub mod recommendation;
pub mod repositories;
pub mod wattage;

// Re-export commonly used items for convenience
pub use component::{
    ComponentKind, ComponentRecord, CoolingRecord, PowerRecord, PsuRecord, RawComponentRow,
    StorageRecord, UnknownComponent,
};
pub use repositories::{ComponentRepository, InsertOutcome};
pub use wattage::{WATTAGE_BAND, resolve_psus, resolve_wattage};
