//! Table parsing infrastructure for the component catalogs
//!
//! HTML tables and JSON listing payloads are flattened into a [`ScrapedTable`], then the
//! field extractor finds the name and power columns by keyword.

pub mod error;
pub mod field_extractor;
pub mod script_probe;
pub mod table;

// Re-export public types
pub use error::{ParsingError, ParsingResult};
pub use field_extractor::{
    ColumnMap, CPU_RULES, Extraction, ExtractionRules, GPU_RULES, PSU_RULES, detect_columns,
    extract, extract_best, extract_from_html, extract_from_json,
};
pub use table::{ScrapedTable, tables_from_html, tables_matching};
