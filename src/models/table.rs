//! Table-related models and DTOs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column data types understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnDataType {
    Int,
    Varchar,
    Text,
    Date,
    Timestamp,
    Boolean,
    Float,
    Decimal,
}

impl ColumnDataType {
    pub const ALL: [ColumnDataType; 8] = [
        ColumnDataType::Int,
        ColumnDataType::Varchar,
        ColumnDataType::Text,
        ColumnDataType::Date,
        ColumnDataType::Timestamp,
        ColumnDataType::Boolean,
        ColumnDataType::Float,
        ColumnDataType::Decimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnDataType::Int => "INT",
            ColumnDataType::Varchar => "VARCHAR",
            ColumnDataType::Text => "TEXT",
            ColumnDataType::Date => "DATE",
            ColumnDataType::Timestamp => "TIMESTAMP",
            ColumnDataType::Boolean => "BOOLEAN",
            ColumnDataType::Float => "FLOAT",
            ColumnDataType::Decimal => "DECIMAL",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnDataType::Int | ColumnDataType::Float | ColumnDataType::Decimal
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnDataType::Date | ColumnDataType::Timestamp)
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        ColumnDataType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("Invalid data type: {}", s))
    }
}

/// Column definition as reported by (and sent to) the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: ColumnDataType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary_key: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_auto_increment: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_nullable: Option<bool>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary_key: None,
            is_auto_increment: None,
            default_value: None,
            is_nullable: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = Some(true);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = Some(true);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = Some(nullable);
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key.unwrap_or(false)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.is_auto_increment.unwrap_or(false)
    }

    /// Columns without an explicit flag are treated as nullable.
    pub fn is_nullable(&self) -> bool {
        self.is_nullable.unwrap_or(true)
    }

    /// Audit columns are managed by the backend and never edited by hand.
    pub fn is_audit(&self) -> bool {
        AUDIT_COLUMNS.contains(&self.name.as_str())
    }
}

/// Table schema: a unique name plus its ordered columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// Key column used when a schema marks no primary key
pub const FALLBACK_PRIMARY_KEY: &str = "id";

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Name of the column identifying a record.
    pub fn primary_key_column(&self) -> &str {
        self.columns
            .iter()
            .find(|c| c.is_primary_key())
            .map(|c| c.name.as_str())
            .unwrap_or(FALLBACK_PRIMARY_KEY)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Backend-managed audit columns, hidden from record forms
pub const AUDIT_COLUMNS: [&str; 4] = ["created_at", "modified_at", "created_by", "modified_by"];

/// Columns prepended to every table-creation request, in order
pub static SYSTEM_COLUMNS: Lazy<Vec<Column>> = Lazy::new(|| {
    vec![
        Column::new("id", ColumnDataType::Int)
            .primary_key()
            .auto_increment()
            .nullable(false),
        Column::new("created_at", ColumnDataType::Timestamp)
            .default_value("CURRENT_TIMESTAMP")
            .nullable(false),
        // ON UPDATE behaviour is the backend's job
        Column::new("modified_at", ColumnDataType::Timestamp)
            .default_value("CURRENT_TIMESTAMP")
            .nullable(false),
        // References the users table
        Column::new("created_by", ColumnDataType::Int).nullable(true),
        Column::new("modified_by", ColumnDataType::Int).nullable(true),
    ]
});

/// Request to create a new table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub table_name: String,
    pub columns: Vec<Column>,
}
