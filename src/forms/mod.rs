//! Form view models
//!
//! Forms are created fresh each time they are opened and dropped on close or
//! after a successful save. A failed submission keeps the form open with the
//! error message available for inline display.

pub mod record;
pub mod table;

pub use record::{FieldValue, FieldWidget, FormField, FormMode, RecordForm};
pub use table::{ColumnSpec, CreateTableForm};
