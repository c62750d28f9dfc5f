//! Record browser
//!
//! Paginated, sortable view over one table's records. Every change of page,
//! sort or filter needs a full re-fetch of the current page; nothing is
//! cached between fetches.
//!
//! A fetch is split into [`RecordBrowser::begin_fetch`], which issues a
//! monotonic token, and [`RecordBrowser::apply_fetch`], which only accepts
//! the response carrying the latest token. Out-of-order responses are dropped.

use crate::client::ApiClient;
use crate::confirm::Confirm;
use crate::error::{not_found_error, validation_error, ApiResult};
use crate::forms::RecordForm;
use crate::models::{
    cell_text, record_key, AdvancedFilter, Record, RecordPage, RecordQuery, SortConfig,
    SortDirection, Table,
};
use tracing::{debug, info, warn};

pub const ACTIONS_HEADER: &str = "Actions";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// An issued fetch: what to request and the token to hand back
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub token: u64,
    pub table: String,
    pub query: RecordQuery,
}

/// Header and cells ready for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct RecordBrowser {
    table: Table,
    page: u32,
    page_size: u32,
    sort: Option<SortConfig>,
    filters: Option<AdvancedFilter>,
    records: Vec<Record>,
    total: u64,
    state: LoadState,
    latest_token: u64,
    error: Option<String>,
}

impl RecordBrowser {
    pub fn new(table: Table, page_size: u32) -> Self {
        Self {
            table,
            page: 1,
            page_size: page_size.max(1),
            sort: None,
            filters: None,
            records: Vec::new(),
            total: 0,
            state: LoadState::Idle,
            latest_token: 0,
            error: None,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> Option<&SortConfig> {
        self.sort.as_ref()
    }

    pub fn filters(&self) -> Option<&AdvancedFilter> {
        self.filters.as_ref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Error of the last record action (delete), if it failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `ceil(total / page_size)`; zero when the table is empty
    pub fn total_pages(&self) -> u32 {
        pages_for(self.total, self.page_size)
    }

    pub fn query(&self) -> RecordQuery {
        RecordQuery {
            page: self.page,
            limit: self.page_size,
            sort: self.sort.clone(),
            filters: self.filters.clone(),
        }
    }

    /// Toggle the sort for `column` and go back to page 1.
    pub fn set_sort(&mut self, column: &str) -> ApiResult<()> {
        if self.table.column(column).is_none() {
            return Err(not_found_error(format!(
                "Column '{}' does not exist in table '{}'.",
                column, self.table.name
            )));
        }
        self.sort = Some(SortConfig::toggle(self.sort.as_ref(), column));
        self.page = 1;
        Ok(())
    }

    /// Move to page `n`. Out-of-range pages are ignored and return `false`.
    pub fn set_page(&mut self, n: u32) -> bool {
        if n < 1 || n > self.total_pages() {
            return false;
        }
        self.page = n;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.page.saturating_sub(1))
    }

    /// Replace the filter (`None` clears it) and go back to page 1.
    pub fn set_filters(&mut self, filters: Option<AdvancedFilter>) {
        self.filters = filters.filter(|f| !f.is_empty());
        self.page = 1;
    }

    /// Issue a new fetch token; any earlier ticket becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.latest_token += 1;
        self.state = LoadState::Loading;
        FetchTicket {
            token: self.latest_token,
            table: self.table.name.clone(),
            query: self.query(),
        }
    }

    /// Accept a fetch result if `token` is still the latest.
    ///
    /// Returns `Ok(false)` for a stale response, which changes nothing.
    pub fn apply_fetch(&mut self, token: u64, result: ApiResult<RecordPage>) -> ApiResult<bool> {
        if token != self.latest_token {
            warn!(
                "Discarding stale response for '{}' (token {}, latest {})",
                self.table.name, token, self.latest_token
            );
            return Ok(false);
        }

        match result {
            Ok(page) => {
                debug!(
                    "Loaded {} of {} records for '{}'",
                    page.records.len(),
                    page.total,
                    self.table.name
                );
                self.records = page.records;
                self.total = page.total;
                self.state = LoadState::Loaded;
                Ok(true)
            }
            Err(e) => {
                self.state = LoadState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the current page
    pub async fn fetch(&mut self, client: &ApiClient) -> ApiResult<bool> {
        let ticket = self.begin_fetch();
        let result = client.get_records(&ticket.table, &ticket.query).await;
        self.apply_fetch(ticket.token, result)
    }

    fn record_at(&self, index: usize) -> ApiResult<&Record> {
        self.records
            .get(index)
            .ok_or_else(|| not_found_error(format!("No record at row {}.", index + 1)))
    }

    /// Delete the record at `index` after confirmation.
    ///
    /// Returns `Ok(false)` when the user declines. On success the current
    /// page is clamped to the new page count and re-fetched.
    pub async fn delete_record(
        &mut self,
        client: &ApiClient,
        index: usize,
        confirm: &mut dyn Confirm,
    ) -> ApiResult<bool> {
        self.error = None;
        let result = self.try_delete(client, index, confirm).await;
        if let Err(e) = &result {
            self.error = Some(e.to_string());
        }
        result
    }

    async fn try_delete(
        &mut self,
        client: &ApiClient,
        index: usize,
        confirm: &mut dyn Confirm,
    ) -> ApiResult<bool> {
        let record = self.record_at(index)?;
        let key_column = self.table.primary_key_column().to_string();
        let key = record_key(&self.table, record).ok_or_else(|| {
            validation_error("Could not determine the primary key for this record.")
        })?;

        let prompt = format!(
            "Are you sure you want to delete record with {} = {}?",
            key_column, key
        );
        if !confirm.confirm(&prompt) {
            debug!("Delete of record '{}' cancelled", key);
            return Ok(false);
        }

        client.delete_record(&self.table.name, &key).await?;
        self.note_removed();
        self.fetch(client).await?;
        Ok(true)
    }

    /// Account for one removed record: shrink the total and clamp the page.
    fn note_removed(&mut self) {
        self.total = self.total.saturating_sub(1);
        let pages = self.total_pages().max(1);
        if self.page > pages {
            info!(
                "Page {} of '{}' is now empty, moving to page {}",
                self.page, self.table.name, pages
            );
            self.page = pages;
        }
    }

    pub fn new_record_form(&self) -> RecordForm {
        RecordForm::create(&self.table)
    }

    pub fn edit_record_form(&self, index: usize) -> ApiResult<RecordForm> {
        RecordForm::edit(&self.table, self.record_at(index)?)
    }

    /// Submit `form`, then re-fetch. A failed submit skips the refresh.
    pub async fn save_form(&mut self, form: &mut RecordForm, client: &ApiClient) -> ApiResult<Record> {
        let saved = form.submit(client).await?;
        self.fetch(client).await?;
        Ok(saved)
    }

    /// Schema columns in declared order, then the actions column
    pub fn grid(&self) -> GridView {
        let mut headers: Vec<String> = self
            .table
            .columns
            .iter()
            .map(|c| match &self.sort {
                Some(s) if s.key == c.name => match s.direction {
                    SortDirection::Asc => format!("{} ▲", c.name),
                    SortDirection::Desc => format!("{} ▼", c.name),
                },
                _ => c.name.clone(),
            })
            .collect();
        headers.push(ACTIONS_HEADER.to_string());

        let rows = self
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let mut cells: Vec<String> = self
                    .table
                    .columns
                    .iter()
                    .map(|c| cell_text(record.get(&c.name)))
                    .collect();
                cells.push(format!("edit {} | delete {}", i + 1, i + 1));
                cells
            })
            .collect();

        GridView { headers, rows }
    }

    /// "Showing a to b of total"
    pub fn summary(&self) -> String {
        if self.total == 0 {
            return "Showing 0 to 0 of 0".to_string();
        }
        let size = u64::from(self.page_size);
        let first = ((u64::from(self.page) - 1) * size + 1).min(self.total);
        let last = (u64::from(self.page) * size).min(self.total);
        format!("Showing {} to {} of {}", first, last, self.total)
    }

    /// "page / pages"
    pub fn page_indicator(&self) -> String {
        format!("{} / {}", self.page, self.total_pages().max(1))
    }
}

fn pages_for(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX)
}
