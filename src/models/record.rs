//! Record, sort and page models

use crate::error::{validation_error, ApiResult};
use crate::models::{AdvancedFilter, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A row: column name to value, shaped by the table schema
pub type Record = serde_json::Map<String, Value>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// The single active sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: String,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Next sort after clicking `column`: an ascending sort on the same
    /// column flips to descending, anything else sorts `column` ascending.
    pub fn toggle(current: Option<&SortConfig>, column: &str) -> SortConfig {
        match current {
            Some(sort) if sort.key == column && sort.direction == SortDirection::Asc => {
                SortConfig::desc(column)
            }
            _ => SortConfig::asc(column),
        }
    }
}

/// One page of records plus the backend's total count
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    #[serde(default)]
    pub total: u64,
}

/// Parameters of `GET /tables/{name}/records`
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<SortConfig>,
    pub filters: Option<AdvancedFilter>,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            sort: None,
            filters: None,
        }
    }
}

impl RecordQuery {
    /// Query-string pairs; `filters` and `sort` travel JSON-encoded and are
    /// omitted when unset.
    pub fn to_query_pairs(&self) -> ApiResult<Vec<(String, String)>> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];

        if let Some(filters) = self.filters.as_ref().filter(|f| !f.is_empty()) {
            let encoded = serde_json::to_string(filters)
                .map_err(|e| validation_error(format!("Invalid filter: {}", e)))?;
            pairs.push(("filters".to_string(), encoded));
        }

        if let Some(sort) = &self.sort {
            let encoded = serde_json::to_string(sort)
                .map_err(|e| validation_error(format!("Invalid sort: {}", e)))?;
            pairs.push(("sort".to_string(), encoded));
        }

        Ok(pairs)
    }
}

/// Resolve the value identifying `record` as a path segment.
///
/// Returns `None` when the key column is missing, null, or an empty string.
pub fn record_key(table: &Table, record: &Record) -> Option<String> {
    match record.get(table.primary_key_column())? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Plain string form of a cell: strings unquoted, `null` for JSON null,
/// empty for a missing key.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
