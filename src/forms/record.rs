//! Record create/edit form
//!
//! One field per visible column, with the input widget chosen from the
//! column's declared type. Auto-increment and audit columns never appear.

use crate::client::ApiClient;
use crate::error::{validation_error, ApiResult};
use crate::models::{record_key, Column, ColumnDataType, Record, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Number, Value};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Input widget for a column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidget {
    Checkbox,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DDTHH:MM`, UTC
    DateTime,
    Number,
    TextArea,
    Text,
}

impl FieldWidget {
    pub fn for_type(data_type: ColumnDataType) -> Self {
        match data_type {
            ColumnDataType::Boolean => FieldWidget::Checkbox,
            ColumnDataType::Date => FieldWidget::Date,
            ColumnDataType::Timestamp => FieldWidget::DateTime,
            ColumnDataType::Int | ColumnDataType::Float | ColumnDataType::Decimal => {
                FieldWidget::Number
            }
            ColumnDataType::Text => FieldWidget::TextArea,
            ColumnDataType::Varchar => FieldWidget::Text,
        }
    }
}

/// Current input of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    pub fn display(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub column: Column,
    pub widget: FieldWidget,
    pub value: FieldValue,
}

impl FormField {
    fn new(column: &Column, initial: Option<&Value>) -> Self {
        let widget = FieldWidget::for_type(column.data_type);
        let value = match widget {
            FieldWidget::Checkbox => FieldValue::Bool(initial.map(is_truthy).unwrap_or(false)),
            FieldWidget::Date => FieldValue::Text(initial.and_then(normalize_date).unwrap_or_default()),
            FieldWidget::DateTime => {
                FieldValue::Text(initial.and_then(normalize_timestamp).unwrap_or_default())
            }
            FieldWidget::Number | FieldWidget::TextArea | FieldWidget::Text => {
                FieldValue::Text(initial.map(plain_text).unwrap_or_default())
            }
        };

        Self {
            column: column.clone(),
            widget,
            value,
        }
    }

    /// Typed JSON value sent to the backend
    fn to_json(&self) -> ApiResult<Value> {
        let name = &self.column.name;
        let text = match &self.value {
            FieldValue::Bool(b) => return Ok(Value::Bool(*b)),
            FieldValue::Text(s) => s.trim(),
        };

        match self.widget {
            FieldWidget::Checkbox => Ok(Value::Bool(parse_bool(text).unwrap_or(false))),
            FieldWidget::Number if text.is_empty() => Ok(Value::Null),
            FieldWidget::Number if self.column.data_type == ColumnDataType::Int => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| validation_error(format!("Field '{}' expects a whole number.", name))),
            FieldWidget::Number if self.column.data_type == ColumnDataType::Decimal => {
                // Exact digits go through as text; f64 would round them.
                serde_json::from_str::<Number>(text)
                    .map(|_| Value::String(text.to_string()))
                    .map_err(|_| validation_error(format!("Field '{}' expects a number.", name)))
            }
            FieldWidget::Number => text
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| validation_error(format!("Field '{}' expects a number.", name))),
            FieldWidget::Date if text.is_empty() => Ok(Value::Null),
            FieldWidget::Date => normalize_date(&Value::from(text))
                .map(Value::String)
                .ok_or_else(|| {
                    validation_error(format!("Field '{}' expects a date (YYYY-MM-DD).", name))
                }),
            FieldWidget::DateTime if text.is_empty() => Ok(Value::Null),
            FieldWidget::DateTime => normalize_timestamp(&Value::from(text))
                .map(Value::String)
                .ok_or_else(|| {
                    validation_error(format!(
                        "Field '{}' expects a date and time (YYYY-MM-DDTHH:MM).",
                        name
                    ))
                }),
            FieldWidget::TextArea | FieldWidget::Text => match &self.value {
                FieldValue::Text(s) => Ok(Value::String(s.clone())),
                FieldValue::Bool(b) => Ok(Value::String(b.to_string())),
            },
        }
    }
}

/// Whether the form creates a record or edits the one identified by `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { key: String },
}

/// Columns a record form shows, in schema order
pub fn visible_columns(table: &Table) -> impl Iterator<Item = &Column> {
    table
        .columns
        .iter()
        .filter(|c| !c.is_auto_increment() && !c.is_audit())
}

#[derive(Debug, Clone)]
pub struct RecordForm {
    table: Table,
    mode: FormMode,
    fields: Vec<FormField>,
    error: Option<String>,
    open: bool,
}

impl RecordForm {
    /// Empty form for a new record
    pub fn create(table: &Table) -> Self {
        let fields = visible_columns(table)
            .map(|c| FormField::new(c, None))
            .collect();
        Self {
            table: table.clone(),
            mode: FormMode::Create,
            fields,
            error: None,
            open: true,
        }
    }

    /// Form pre-filled from `record`; fails if its key cannot be resolved
    pub fn edit(table: &Table, record: &Record) -> ApiResult<Self> {
        let key = record_key(table, record).ok_or_else(|| {
            validation_error("Could not determine the primary key for this record.")
        })?;
        let fields = visible_columns(table)
            .map(|c| FormField::new(c, record.get(&c.name)))
            .collect();
        Ok(Self {
            table: table.clone(),
            mode: FormMode::Edit { key },
            fields,
            error: None,
            open: true,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit { .. })
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, column: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.column.name == column)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn title(&self) -> String {
        match self.mode {
            FormMode::Create => format!("Create Record in {}", self.table.name),
            FormMode::Edit { .. } => format!("Edit Record in {}", self.table.name),
        }
    }

    /// Set a field from raw user input.
    ///
    /// Checkboxes accept `true/false`, `yes/no`, `on/off` and `1/0`; every
    /// other widget stores the text as typed and is checked on submit.
    pub fn set_value(&mut self, column: &str, input: &str) -> ApiResult<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.column.name == column)
            .ok_or_else(|| validation_error(format!("Field '{}' is not editable.", column)))?;

        field.value = match field.widget {
            FieldWidget::Checkbox => FieldValue::Bool(parse_bool(input).ok_or_else(|| {
                validation_error(format!("Field '{}' expects true or false.", column))
            })?),
            _ => FieldValue::Text(input.to_string()),
        };
        Ok(())
    }

    /// The request body, typed per widget
    pub fn payload(&self) -> ApiResult<Record> {
        let mut record = Record::new();
        for field in &self.fields {
            record.insert(field.column.name.clone(), field.to_json()?);
        }
        Ok(record)
    }

    /// Create or update through `client`.
    ///
    /// Success closes the form. Failure keeps it open with the message
    /// available from [`RecordForm::error`].
    pub async fn submit(&mut self, client: &ApiClient) -> ApiResult<Record> {
        self.error = None;

        let result = match self.payload() {
            Ok(payload) => match &self.mode {
                FormMode::Create => client.create_record(&self.table.name, payload).await,
                FormMode::Edit { key } => {
                    debug!("Updating record '{}' in '{}'", key, self.table.name);
                    client.update_record(&self.table.name, key, payload).await
                }
            },
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.open = false,
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => parse_bool(s).unwrap_or(false),
        _ => false,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse the shapes dates arrive in: RFC 3339, naive date-times, bare dates
/// and epoch milliseconds. Offsets are converted to UTC.
fn parse_instant(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc).naive_utc());
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    NaiveDate::parse_from_str(s, DATE_FORMAT)
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                })
        }
        _ => None,
    }
}

/// `YYYY-MM-DD`, or `None` when the value is not a date
pub fn normalize_date(value: &Value) -> Option<String> {
    parse_instant(value).map(|dt| dt.format(DATE_FORMAT).to_string())
}

/// `YYYY-MM-DDTHH:MM` (minute precision), or `None` when not a date
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    parse_instant(value).map(|dt| dt.format(DATETIME_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::SYSTEM_COLUMNS;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn products() -> Table {
        let mut columns = SYSTEM_COLUMNS.clone();
        columns.extend([
            Column::new("name", ColumnDataType::Varchar),
            Column::new("description", ColumnDataType::Text),
            Column::new("price", ColumnDataType::Decimal),
            Column::new("stock", ColumnDataType::Int),
            Column::new("active", ColumnDataType::Boolean),
            Column::new("released", ColumnDataType::Date),
            Column::new("restocked_at", ColumnDataType::Timestamp),
        ]);
        Table::new("products", columns)
    }

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_widget_selection() {
        assert_eq!(FieldWidget::for_type(ColumnDataType::Boolean), FieldWidget::Checkbox);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Date), FieldWidget::Date);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Timestamp), FieldWidget::DateTime);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Int), FieldWidget::Number);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Float), FieldWidget::Number);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Decimal), FieldWidget::Number);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Text), FieldWidget::TextArea);
        assert_eq!(FieldWidget::for_type(ColumnDataType::Varchar), FieldWidget::Text);
    }

    #[test]
    fn test_hidden_columns_in_both_modes() {
        let table = products();
        let expected = vec!["name", "description", "price", "stock", "active", "released", "restocked_at"];

        let create = RecordForm::create(&table);
        let names: Vec<&str> = create.fields().iter().map(|f| f.column.name.as_str()).collect();
        assert_eq!(names, expected);

        let existing = row(json!({"id": 7, "created_at": "2023-10-27T10:00:00Z", "created_by": 1, "name": "Lamp"}));
        let edit = RecordForm::edit(&table, &existing).unwrap();
        let names: Vec<&str> = edit.fields().iter().map(|f| f.column.name.as_str()).collect();
        assert_eq!(names, expected);
        assert_eq!(edit.mode(), &FormMode::Edit { key: "7".to_string() });
    }

    #[test]
    fn test_auto_increment_hidden_outside_system_columns() {
        let table = Table::new(
            "tickets",
            vec![
                Column::new("ticket_no", ColumnDataType::Int).primary_key().auto_increment(),
                Column::new("subject", ColumnDataType::Varchar),
            ],
        );
        let form = RecordForm::create(&table);
        assert_eq!(form.fields().len(), 1);
        assert_eq!(form.fields()[0].column.name, "subject");
    }

    #[test]
    fn test_edit_prefills_normalized_values() {
        let table = products();
        let existing = row(json!({
            "id": 3,
            "name": "Desk",
            "price": 129.5,
            "stock": null,
            "active": 1,
            "released": "2023-10-27T22:30:00Z",
            "restocked_at": "2023-10-27T10:15:42.123+02:00"
        }));
        let form = RecordForm::edit(&table, &existing).unwrap();

        assert_eq!(form.field("name").unwrap().value, FieldValue::Text("Desk".into()));
        assert_eq!(form.field("price").unwrap().value, FieldValue::Text("129.5".into()));
        assert_eq!(form.field("stock").unwrap().value, FieldValue::Text(String::new()));
        assert_eq!(form.field("active").unwrap().value, FieldValue::Bool(true));
        assert_eq!(form.field("released").unwrap().value, FieldValue::Text("2023-10-27".into()));
        assert_eq!(
            form.field("restocked_at").unwrap().value,
            FieldValue::Text("2023-10-27T08:15".into())
        );
        assert_eq!(form.field("description").unwrap().value, FieldValue::Text(String::new()));
    }

    #[test]
    fn test_edit_without_key_fails() {
        let table = products();
        let err = RecordForm::edit(&table, &row(json!({"name": "orphan"}))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_payload_is_typed() {
        let table = products();
        let mut form = RecordForm::create(&table);
        form.set_value("name", "Chair").unwrap();
        form.set_value("price", "19.99").unwrap();
        form.set_value("stock", "12").unwrap();
        form.set_value("active", "yes").unwrap();
        form.set_value("released", "2024-02-29").unwrap();
        form.set_value("restocked_at", "2024-03-01 09:05").unwrap();

        let payload = form.payload().unwrap();
        assert_eq!(
            Value::Object(payload),
            json!({
                "name": "Chair",
                "description": "",
                "price": "19.99",
                "stock": 12,
                "active": true,
                "released": "2024-02-29",
                "restocked_at": "2024-03-01T09:05"
            })
        );
    }

    #[test]
    fn test_decimal_keeps_every_digit() {
        let table = Table::new(
            "ledger",
            vec![
                Column::new("id", ColumnDataType::Int).primary_key().auto_increment(),
                Column::new("amount", ColumnDataType::Decimal),
                Column::new("ratio", ColumnDataType::Float),
            ],
        );
        let mut form = RecordForm::create(&table);
        form.set_value("amount", " 12345678901234567.89 ").unwrap();
        form.set_value("ratio", "0.25").unwrap();

        let payload = form.payload().unwrap();
        assert_eq!(payload["amount"], json!("12345678901234567.89"));
        assert_eq!(payload["ratio"], json!(0.25));

        form.set_value("amount", "-0.000000000000000000001").unwrap();
        assert_eq!(form.payload().unwrap()["amount"], json!("-0.000000000000000000001"));

        for bad in ["NaN", "inf", "12,5", "1.2.3"] {
            form.set_value("amount", bad).unwrap();
            assert!(form.payload().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_empty_numbers_and_dates_become_null() {
        let form = RecordForm::create(&products());
        let payload = form.payload().unwrap();
        assert_eq!(payload["price"], Value::Null);
        assert_eq!(payload["stock"], Value::Null);
        assert_eq!(payload["released"], Value::Null);
        assert_eq!(payload["active"], Value::Bool(false));
    }

    #[test]
    fn test_invalid_inputs_rejected_locally() {
        let mut form = RecordForm::create(&products());
        form.set_value("stock", "1.5").unwrap();
        assert!(form.payload().is_err());

        form.set_value("stock", "2").unwrap();
        form.set_value("released", "yesterday").unwrap();
        assert!(form.payload().is_err());

        assert!(form.set_value("active", "maybe").is_err());
        assert!(form.set_value("id", "5").is_err());
        assert!(form.set_value("created_at", "2024-01-01").is_err());
    }

    #[test]
    fn test_normalize_dates() {
        assert_eq!(normalize_date(&json!("2023-01-05")), Some("2023-01-05".to_string()));
        assert_eq!(normalize_date(&json!(0)), Some("1970-01-01".to_string()));
        assert_eq!(normalize_date(&json!("")), None);
        assert_eq!(normalize_date(&json!(true)), None);
        assert_eq!(
            normalize_timestamp(&json!("2023-01-05 07:08:09")),
            Some("2023-01-05T07:08".to_string())
        );
        assert_eq!(
            normalize_timestamp(&json!("2023-01-05")),
            Some("2023-01-05T00:00".to_string())
        );
    }

    #[test]
    fn test_titles() {
        let table = products();
        assert_eq!(RecordForm::create(&table).title(), "Create Record in products");
        let edit = RecordForm::edit(&table, &row(json!({"id": 1}))).unwrap();
        assert_eq!(edit.title(), "Edit Record in products");
        assert!(edit.is_editing());
    }
}
