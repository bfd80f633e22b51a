//! Table abstraction shared by HTML and JSON sources
//!
//! Both an HTML `<table>` and a JSON listing payload are flattened into headers plus
//! rows of cell text, so column detection never needs to know where the data came from.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use super::error::{ParsingError, ParsingResult};

/// Keys under which listing APIs commonly nest their row array
pub const JSON_ARRAY_KEYS: [&str; 4] = ["items", "data", "results", "rows"];

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static THEAD_CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("thead th, thead td").unwrap());
static TBODY_ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody tr").unwrap());
static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static HEADER_CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").unwrap());
static DATA_CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Headers plus rows of trimmed cell text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ScrapedTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Widest of the header row and any data row
    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flatten one `<table>` element
    pub fn from_element(table: ElementRef<'_>) -> Self {
        let thead: Vec<String> = table.select(&THEAD_CELLS).map(cell_text).collect();
        let first_row = table.select(&ROWS).next();

        let (headers, header_row) = if thead.is_empty() {
            match first_row {
                Some(row) => (row.select(&HEADER_CELLS).map(cell_text).collect(), Some(row.id())),
                None => (Vec::new(), None),
            }
        } else {
            (thead, None)
        };

        let mut body: Vec<ElementRef<'_>> = table.select(&TBODY_ROWS).collect();
        if body.is_empty() {
            body = table.select(&ROWS).collect();
        }

        let rows = body
            .into_iter()
            .filter(|row| Some(row.id()) != header_row)
            .map(|row| row.select(&DATA_CELLS).map(cell_text).collect::<Vec<_>>())
            .filter(|cells| !cells.is_empty())
            .collect();

        Self { headers, rows }
    }

    /// Flatten a JSON listing payload.
    ///
    /// Accepts a top-level array of objects or an object holding one under
    /// [`JSON_ARRAY_KEYS`]. Scalars become text; `null` and nested values become empty cells.
    pub fn from_json(payload: &Value) -> ParsingResult<Self> {
        let items = match payload {
            Value::Array(items) => items,
            Value::Object(map) => JSON_ARRAY_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .ok_or_else(|| {
                    ParsingError::unexpected_json_shape("object without items/data/results/rows array")
                })?,
            _ => return Err(ParsingError::unexpected_json_shape("neither an array nor an object")),
        };

        let objects: Vec<&serde_json::Map<String, Value>> =
            items.iter().filter_map(Value::as_object).collect();

        let mut headers: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = objects
            .iter()
            .map(|object| {
                headers
                    .iter()
                    .map(|key| object.get(key).map(json_cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        Ok(Self { headers, rows })
    }

    /// Parse a response body as JSON and flatten it
    pub fn from_json_str(body: &str) -> ParsingResult<Self> {
        let payload: Value = serde_json::from_str(body.trim()).map_err(ParsingError::invalid_json)?;
        Self::from_json(&payload)
    }
}

/// Every `<table>` in a document, in document order
pub fn tables_from_html(html: &str) -> Vec<ScrapedTable> {
    let document = Html::parse_document(html);
    document.select(&TABLE).map(ScrapedTable::from_element).collect()
}

/// Tables matching a specific selector, e.g. `table.mytable` from a rendered page
pub fn tables_matching(html: &str, selector: &str) -> ParsingResult<Vec<ScrapedTable>> {
    let selector =
        Selector::parse(selector).map_err(|e| ParsingError::invalid_selector(selector, e))?;
    let document = Html::parse_fragment(html);
    Ok(document.select(&selector).map(ScrapedTable::from_element).collect())
}

/// Trimmed text with internal whitespace collapsed to single spaces
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    normalize_whitespace(&cell.text().collect::<Vec<_>>().join(" "))
}

fn json_cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_whitespace(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
