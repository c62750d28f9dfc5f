//! Table creation form

use crate::client::ApiClient;
use crate::error::{validation_error, ApiResult};
use crate::models::{Column, ColumnDataType, SYSTEM_COLUMNS};
use tracing::debug;
use validator::Validate;

const REQUIRED_MESSAGE: &str = "Table name and all column names/types are required.";

/// One user-entered column
#[derive(Debug, Clone, Validate)]
pub struct ColumnSpec {
    #[validate(length(min = 1, message = "Table name and all column names/types are required."))]
    pub name: String,

    #[validate(length(min = 1, message = "Table name and all column names/types are required."))]
    pub data_type: String,

    /// Empty means "no default"
    pub default_value: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: ColumnDataType::Varchar.as_str().to_string(),
            default_value: String::new(),
        }
    }
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            default_value: String::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    fn to_column(&self) -> ApiResult<Column> {
        let data_type: ColumnDataType = self.data_type.parse().map_err(validation_error)?;
        let mut column = Column::new(self.name.clone(), data_type).nullable(true);
        if !self.default_value.is_empty() {
            column = column.default_value(self.default_value.clone());
        }
        Ok(column)
    }
}

/// State of the "create table" form
#[derive(Debug, Clone, Validate)]
pub struct CreateTableForm {
    #[validate(length(min = 1, message = "Table name and all column names/types are required."))]
    pub table_name: String,

    #[validate(nested)]
    pub columns: Vec<ColumnSpec>,

    error: Option<String>,
}

impl Default for CreateTableForm {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateTableForm {
    /// A blank form with one empty VARCHAR column
    pub fn new() -> Self {
        Self {
            table_name: String::new(),
            columns: vec![ColumnSpec::default()],
            error: None,
        }
    }

    pub fn set_table_name(&mut self, name: impl Into<String>) {
        self.table_name = name.into();
    }

    /// Append a blank column and return its index
    pub fn add_column(&mut self) -> usize {
        self.columns.push(ColumnSpec::default());
        self.columns.len() - 1
    }

    pub fn remove_column(&mut self, index: usize) -> Option<ColumnSpec> {
        (index < self.columns.len()).then(|| self.columns.remove(index))
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut ColumnSpec> {
        self.columns.get_mut(index)
    }

    pub fn set_column_name(&mut self, index: usize, name: impl Into<String>) -> bool {
        self.column_mut(index).map(|c| c.name = name.into()).is_some()
    }

    /// Stored as typed; unknown types are reported by [`CreateTableForm::check`]
    pub fn set_column_type(&mut self, index: usize, data_type: impl Into<String>) -> bool {
        self.column_mut(index)
            .map(|c| c.data_type = data_type.into())
            .is_some()
    }

    pub fn set_column_default(&mut self, index: usize, value: impl Into<String>) -> bool {
        self.column_mut(index)
            .map(|c| c.default_value = value.into())
            .is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Local checks; nothing here talks to the backend
    pub fn check(&self) -> ApiResult<()> {
        self.validate()?;
        for spec in &self.columns {
            spec.data_type
                .parse::<ColumnDataType>()
                .map_err(validation_error)?;
        }
        Ok(())
    }

    /// System columns first, then the user's columns in entry order
    pub fn schema(&self) -> ApiResult<Vec<Column>> {
        let mut columns = SYSTEM_COLUMNS.clone();
        for spec in &self.columns {
            columns.push(spec.to_column()?);
        }
        Ok(columns)
    }

    /// Validate and send the schema-creation request.
    ///
    /// Any failure is also kept on the form for inline display.
    pub async fn submit(&mut self, client: &ApiClient) -> ApiResult<()> {
        self.error = None;

        let result = match self.check().and_then(|_| self.schema()) {
            Ok(columns) => {
                debug!(
                    "Submitting table '{}' with {} columns",
                    self.table_name,
                    columns.len()
                );
                client.create_table(&self.table_name, columns).await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }
}
