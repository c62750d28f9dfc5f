//! Text rendering for the shell
//!
//! Boxed tables for the record grid, plus the table list and record forms.

use crate::browser::{GridView, RecordBrowser};
use crate::forms::{FieldWidget, RecordForm};
use crate::models::Table;

/// Maximum column width before truncation
const MAX_COLUMN_WIDTH: usize = 32;

/// Truncate a string to `max_width` characters with an ellipsis
fn truncate_value(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else if max_width <= 3 {
        value.chars().take(max_width).collect()
    } else {
        let take = max_width - 3;
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

/// Left-align `value` in `width` characters
fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (idx, width) in widths.iter().enumerate() {
        line.push_str(&"─".repeat(width + 2));
        line.push(if idx == widths.len() - 1 { right } else { mid });
    }
    line.push('\n');
    line
}

fn row_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (value, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(&pad(&truncate_value(value, *width), *width));
        line.push_str(" │");
    }
    line.push('\n');
    line
}

/// Render a grid as a box-drawn table
pub fn render_grid(grid: &GridView) -> String {
    if grid.headers.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = grid.headers.iter().map(|h| h.chars().count()).collect();
    for row in &grid.rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    for width in widths.iter_mut() {
        *width = (*width).min(MAX_COLUMN_WIDTH);
    }

    let mut output = border(&widths, '┌', '┬', '┐');
    output.push_str(&row_line(&grid.headers, &widths));
    output.push_str(&border(&widths, '├', '┼', '┤'));
    for row in &grid.rows {
        output.push_str(&row_line(row, &widths));
    }
    output.push_str(&border(&widths, '└', '┴', '┘'));
    output
}

/// Grid, summary and page indicator for the browser's current page
pub fn render_browser(browser: &RecordBrowser) -> String {
    let mut output = format!("Table: {}\n", browser.table().name);
    if browser.records().is_empty() {
        output.push_str("No records found.\n");
    } else {
        output.push_str(&render_grid(&browser.grid()));
    }
    output.push_str(&format!(
        "{}    Page {}\n",
        browser.summary(),
        browser.page_indicator()
    ));
    output
}

/// One line per table; the selected one is marked with `*`
pub fn render_table_list(tables: &[Table], selected: Option<&str>) -> String {
    if tables.is_empty() {
        return "No tables found.\n".to_string();
    }
    tables
        .iter()
        .map(|t| {
            let marker = if Some(t.name.as_str()) == selected { '*' } else { ' ' };
            format!("{} {} ({} columns)\n", marker, t.name, t.columns.len())
        })
        .collect()
}

/// Column list of a schema
pub fn render_schema(table: &Table) -> String {
    let grid = GridView {
        headers: vec!["column".into(), "type".into(), "key".into(), "default".into()],
        rows: table
            .columns
            .iter()
            .map(|c| {
                let mut flags = Vec::new();
                if c.is_primary_key() {
                    flags.push("PK");
                }
                if c.is_auto_increment() {
                    flags.push("AI");
                }
                if !c.is_nullable() {
                    flags.push("NOT NULL");
                }
                vec![
                    c.name.clone(),
                    c.data_type.to_string(),
                    flags.join(" "),
                    c.default_value.clone().unwrap_or_default(),
                ]
            })
            .collect(),
    };
    render_grid(&grid)
}

fn widget_hint(widget: FieldWidget) -> &'static str {
    match widget {
        FieldWidget::Checkbox => "true/false",
        FieldWidget::Date => "YYYY-MM-DD",
        FieldWidget::DateTime => "YYYY-MM-DDTHH:MM, UTC",
        FieldWidget::Number => "number",
        FieldWidget::TextArea => "text",
        FieldWidget::Text => "short text",
    }
}

/// Title, fields with their current values, and any inline error
pub fn render_form(form: &RecordForm) -> String {
    let mut output = format!("{}\n", form.title());
    for field in form.fields() {
        output.push_str(&format!(
            "  {} [{}] = {}\n",
            field.column.name,
            widget_hint(field.widget),
            field.value.display()
        ));
    }
    if let Some(error) = form.error() {
        output.push_str(&format!("  Error: {}\n", error));
    }
    output
}
