//! Record filter models
//!
//! Filters are evaluated by the backend; the client only builds them and
//! passes them through on record queries.

use crate::models::ColumnDataType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How filters (or groups) combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterLogic {
    #[default]
    And,
    Or,
}

/// Comparison operators, grouped by the column family they apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    // Text
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    // Number
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    // Date
    On,
    Before,
    After,
    Between,
}

impl FilterOperator {
    const ALL: [FilterOperator; 14] = [
        FilterOperator::Equals,
        FilterOperator::Contains,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Eq,
        FilterOperator::Neq,
        FilterOperator::Gt,
        FilterOperator::Lt,
        FilterOperator::Gte,
        FilterOperator::Lte,
        FilterOperator::On,
        FilterOperator::Before,
        FilterOperator::After,
        FilterOperator::Between,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Lt => "lt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lte => "lte",
            FilterOperator::On => "on",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::Between => "between",
        }
    }

    /// Whether this operator makes sense for a column of `data_type`.
    pub fn supports(&self, data_type: ColumnDataType) -> bool {
        use FilterOperator::*;
        match self {
            Equals | Contains | StartsWith | EndsWith => {
                !data_type.is_numeric() && !data_type.is_temporal()
            }
            Eq | Neq | Gt | Lt | Gte | Lte => data_type.is_numeric(),
            On | Before | After | Between => data_type.is_temporal(),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown filter operator: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            column: column.into(),
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub id: String,
    pub logic: FilterLogic,
    pub filters: Vec<Filter>,
}

impl FilterGroup {
    pub fn new(logic: FilterLogic, filters: Vec<Filter>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            logic,
            filters,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvancedFilter {
    pub logic: FilterLogic,
    pub groups: Vec<FilterGroup>,
}

impl AdvancedFilter {
    /// A filter holding exactly one condition.
    pub fn single(filter: Filter) -> Self {
        Self {
            logic: FilterLogic::And,
            groups: vec![FilterGroup::new(FilterLogic::And, vec![filter])],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.filters.is_empty())
    }
}
