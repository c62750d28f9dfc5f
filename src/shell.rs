//! Interactive command shell
//!
//! Reads one command per line, drives the view models and prints the
//! result. Errors are printed and the shell keeps going; an expired session
//! drops the user back to the logged-out state.

use crate::browser::RecordBrowser;
use crate::confirm::Confirm;
use crate::error::{not_found_error, validation_error, ApiResult, AppError};
use crate::formatter::{render_browser, render_form, render_schema, render_table_list};
use crate::forms::{CreateTableForm, RecordForm};
use crate::models::{AdvancedFilter, ColumnDataType, Filter, FilterOperator};
use crate::session::SessionController;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, EditMode};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

const HELP: &str = "\
Commands:
  login <username> [password]        Sign in (prompts for the password if omitted)
  logout                             Sign out and forget the saved session
  whoami                             Show the signed-in user
  tables                             Refresh and list tables
  use <table>                        Select a table and show its first page
  show [table]                       Re-fetch the current page, or show a table's columns
  create-table <name> <col>[:TYPE][=default] ...
                                     Create a table (Admin only)
  drop <table>                       Drop a table (Admin only)
  page <n> | next | prev             Change page
  sort <column>                      Sort by column; repeat to flip direction
  filter <column> <op> <value>       Filter records; `filter clear` removes it
  add <col>=<value> ...              Create a record
  edit <row> <col>=<value> ...       Update the record at <row>
  delete <row>                       Delete the record at <row>
  help                               Show this help
  quit                               Exit
";

/// Whether the shell should keep reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Error)]
enum ShellError {
    #[error(transparent)]
    Api(#[from] AppError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

type CommandResult = Result<(), ShellError>;

/// Line-based terminal I/O
pub struct Console<R, W> {
    input: R,
    output: W,
    /// Attached to a terminal: secrets are read with echo turned off.
    terminal: bool,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Console over scripted input; secrets are read like any other line.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            terminal: false,
        }
    }

    /// Console for a user at a terminal.
    pub fn terminal(input: R, output: W) -> Self {
        Self {
            input,
            output,
            terminal: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Print `prompt` and read one line; `None` at end of input.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Read a password. On a terminal the input is not echoed.
    pub fn read_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if !self.terminal {
            return self.read_line(prompt);
        }
        self.output.flush()?;
        rpassword::prompt_password(prompt).map(Some)
    }

    pub fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{}", text)
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<R: BufRead, W: Write> Confirm for Console<R, W> {
    fn confirm(&mut self, prompt: &str) -> bool {
        match self.read_line(&format!("{} [y/N] ", prompt)) {
            Ok(Some(answer)) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Ok(None) => false,
            Err(e) => {
                warn!("Could not read confirmation: {}", e);
                false
            }
        }
    }
}

pub struct Shell<R, W> {
    session: SessionController,
    browser: Option<RecordBrowser>,
    page_size: u32,
    console: Console<R, W>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// Shell over scripted input.
    pub fn new(session: SessionController, page_size: u32, input: R, output: W) -> Self {
        Self::with_console(session, page_size, Console::new(input, output))
    }

    /// Shell for a user at a terminal.
    pub fn terminal(session: SessionController, page_size: u32, input: R, output: W) -> Self {
        Self::with_console(session, page_size, Console::terminal(input, output))
    }

    fn with_console(session: SessionController, page_size: u32, console: Console<R, W>) -> Self {
        Self {
            session,
            browser: None,
            page_size,
            console,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn browser(&self) -> Option<&RecordBrowser> {
        self.browser.as_ref()
    }

    pub fn output(&self) -> &W {
        self.console.output()
    }

    fn prompt(&self) -> String {
        match &self.browser {
            Some(browser) => format!("table-admin:{}> ", browser.table().name),
            None => "table-admin> ".to_string(),
        }
    }

    /// Load tables for a session restored from disk.
    pub async fn start(&mut self) -> io::Result<()> {
        let Some(user) = self.session.user().cloned() else {
            return self.console.line("Not logged in. Use: login <username> [password]");
        };
        match self.session.restore().await {
            Ok(()) => {
                self.console
                    .line(&format!("Logged in as {} ({})", user.username, user.role))?;
                self.console.write(&render_table_list(self.session.tables(), None))
            }
            Err(e) => self.report(e),
        }
    }

    /// Read and run commands until `quit` or end of input.
    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            let prompt = self.prompt();
            let Some(line) = self.console.read_line(&prompt)? else {
                break;
            };
            if self.execute(&line).await? == Flow::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Line-editing loop for a terminal, with history kept in `history`.
    ///
    /// Ctrl-C clears the current line; Ctrl-D exits.
    pub async fn run_interactive(&mut self, history: Option<&Path>) -> io::Result<()> {
        let config = Config::builder()
            .edit_mode(EditMode::Emacs)
            .auto_add_history(true)
            .build();
        let mut editor = DefaultEditor::with_config(config).map_err(readline_error)?;
        if let Some(path) = history {
            if let Err(e) = editor.load_history(path) {
                debug!("No history loaded from {}: {}", path.display(), e);
            }
        }

        loop {
            let prompt = self.prompt();
            match editor.readline(&prompt) {
                Ok(line) => {
                    if self.execute(&line).await? == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(readline_error(e)),
            }
        }

        if let Some(path) = history {
            if let Err(e) = editor.save_history(path) {
                warn!("Failed to save history to {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    /// Run one command line. Command failures are printed, not returned.
    pub async fn execute(&mut self, line: &str) -> io::Result<Flow> {
        let args = match tokenize(line) {
            Ok(args) => args,
            Err(e) => {
                self.report(e)?;
                return Ok(Flow::Continue);
            }
        };
        let Some((command, rest)) = args.split_first() else {
            return Ok(Flow::Continue);
        };
        debug!("Running command '{}'", command);

        let result = match command.as_str() {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => self.console.write(HELP).map_err(ShellError::from),
            "login" => self.login(rest).await,
            "logout" => self.logout(),
            "whoami" => self.whoami(),
            other => {
                if !self.session.is_logged_in() {
                    self.console
                        .line("Not logged in. Use: login <username> [password]")?;
                    return Ok(Flow::Continue);
                }
                match other {
                    "tables" => self.tables().await,
                    "use" => self.use_table(rest).await,
                    "show" => self.show(rest).await,
                    "create-table" => self.create_table(rest).await,
                    "drop" => self.drop_table(rest).await,
                    "page" => self.page(rest).await,
                    "next" => self.step_page(true).await,
                    "prev" => self.step_page(false).await,
                    "sort" => self.sort(rest).await,
                    "filter" => self.filter(rest).await,
                    "add" => self.add_record(rest).await,
                    "edit" => self.edit_record(rest).await,
                    "delete" => self.delete_record(rest).await,
                    _ => self
                        .console
                        .line(&format!("Unknown command '{}'. Type 'help'.", other))
                        .map_err(ShellError::from),
                }
            }
        };

        match result {
            Ok(()) => {}
            Err(ShellError::Api(e)) => self.report(e)?,
            Err(ShellError::Io(e)) => return Err(e),
        }
        Ok(Flow::Continue)
    }

    fn report(&mut self, err: AppError) -> io::Result<()> {
        if err.is_unauthorized() {
            self.session.logout();
            self.browser = None;
            return self.console.line(SESSION_EXPIRED_MESSAGE);
        }
        self.console.line(&format!("Error: {}", err))
    }

    /// Drop the browser when its table is no longer selected.
    fn sync_browser(&mut self) {
        let selected = self.session.selected_table().map(|t| t.name.clone());
        if self.browser.as_ref().map(|b| b.table().name.clone()) != selected {
            self.browser = None;
        }
    }

    fn browser_mut(&mut self) -> ApiResult<&mut RecordBrowser> {
        self.browser
            .as_mut()
            .ok_or_else(|| validation_error("No table selected. Use: use <table>"))
    }

    async fn login(&mut self, args: &[String]) -> CommandResult {
        let username = args.first().cloned().unwrap_or_default();
        let password = match args.get(1) {
            Some(p) => p.clone(),
            None if username.is_empty() => String::new(),
            None => self.console.read_secret("Password: ")?.unwrap_or_default(),
        };

        let user = self.session.login(&username, &password).await?;
        self.browser = None;
        self.console
            .line(&format!("Logged in as {} ({})", user.username, user.role))?;
        self.console
            .write(&render_table_list(self.session.tables(), None))?;
        Ok(())
    }

    fn logout(&mut self) -> CommandResult {
        self.session.logout();
        self.browser = None;
        self.console.line("Logged out.")?;
        Ok(())
    }

    fn whoami(&mut self) -> CommandResult {
        let text = match self.session.user() {
            Some(u) => format!("{} ({})", u.username, u.role),
            None => "Not logged in.".to_string(),
        };
        self.console.line(&text)?;
        Ok(())
    }

    async fn tables(&mut self) -> CommandResult {
        self.session.refresh_tables().await?;
        self.sync_browser();
        let selected = self.session.selected_table().map(|t| t.name.clone());
        self.console
            .write(&render_table_list(self.session.tables(), selected.as_deref()))?;
        Ok(())
    }

    async fn use_table(&mut self, args: &[String]) -> CommandResult {
        let name = required(args, 0, "use <table>")?;
        let table = self.session.select_table(name)?.clone();
        let mut browser = RecordBrowser::new(table, self.page_size);
        let fetched = browser.fetch(self.session.client()).await;
        self.browser = Some(browser);
        fetched?;
        self.render_page()
    }

    async fn show(&mut self, args: &[String]) -> CommandResult {
        if let Some(name) = args.first() {
            let table = self
                .session
                .table(name)
                .ok_or_else(|| not_found_error(format!("Table '{}' not found.", name)))?;
            let text = render_schema(table);
            self.console.write(&text)?;
            return Ok(());
        }
        self.refetch().await
    }

    async fn create_table(&mut self, args: &[String]) -> CommandResult {
        let mut form = CreateTableForm::new();
        if let Some((name, specs)) = args.split_first() {
            form.set_table_name(name.clone());
            for (i, spec) in specs.iter().enumerate() {
                let index = if i == 0 { 0 } else { form.add_column() };
                let (definition, default) = match spec.split_once('=') {
                    Some((d, v)) => (d, v),
                    None => (spec.as_str(), ""),
                };
                let (column, data_type) = definition
                    .split_once(':')
                    .unwrap_or((definition, ColumnDataType::Varchar.as_str()));
                form.set_column_name(index, column);
                form.set_column_type(index, data_type);
                form.set_column_default(index, default);
            }
        }

        self.session.create_table(&mut form).await?;
        self.sync_browser();
        self.console
            .line(&format!("Table '{}' created.", form.table_name))?;
        Ok(())
    }

    async fn drop_table(&mut self, args: &[String]) -> CommandResult {
        let name = required(args, 0, "drop <table>")?;
        let dropped = self.session.delete_table(name, &mut self.console).await?;
        self.sync_browser();
        if dropped {
            self.console.line(&format!("Table '{}' dropped.", name))?;
        }
        Ok(())
    }

    async fn page(&mut self, args: &[String]) -> CommandResult {
        let raw = required(args, 0, "page <n>")?;
        let n: u32 = raw
            .parse()
            .map_err(|_| validation_error(format!("'{}' is not a page number.", raw)))?;
        if self.browser_mut()?.set_page(n) {
            self.refetch().await?;
        }
        Ok(())
    }

    async fn step_page(&mut self, forward: bool) -> CommandResult {
        let browser = self.browser_mut()?;
        let moved = if forward {
            browser.next_page()
        } else {
            browser.prev_page()
        };
        if moved {
            self.refetch().await?;
        }
        Ok(())
    }

    async fn sort(&mut self, args: &[String]) -> CommandResult {
        let column = required(args, 0, "sort <column>")?;
        self.browser_mut()?.set_sort(column)?;
        self.refetch().await
    }

    async fn filter(&mut self, args: &[String]) -> CommandResult {
        let browser = self.browser_mut()?;
        if args.first().map(String::as_str) == Some("clear") {
            browser.set_filters(None);
            return self.refetch().await;
        }

        let column = required(args, 0, "filter <column> <op> <value>")?;
        let operator: FilterOperator = required(args, 1, "filter <column> <op> <value>")?
            .parse()
            .map_err(validation_error)?;
        let raw = args[2..].join(" ");
        if raw.is_empty() {
            return Err(validation_error("Usage: filter <column> <op> <value>").into());
        }

        let data_type = browser
            .table()
            .column(column)
            .map(|c| c.data_type)
            .ok_or_else(|| not_found_error(format!("Column '{}' not found.", column)))?;
        if !operator.supports(data_type) {
            return Err(validation_error(format!(
                "Operator '{}' does not apply to {} column '{}'.",
                operator, data_type, column
            ))
            .into());
        }

        let value = serde_json::from_str::<Value>(&raw).unwrap_or(Value::String(raw));
        browser.set_filters(Some(AdvancedFilter::single(Filter::new(column, operator, value))));
        self.refetch().await
    }

    async fn add_record(&mut self, args: &[String]) -> CommandResult {
        let mut form = self.browser_mut()?.new_record_form();
        apply_assignments(&mut form, args)?;
        self.save(form, "Record created.").await
    }

    async fn edit_record(&mut self, args: &[String]) -> CommandResult {
        let row = parse_row(required(args, 0, "edit <row> <col>=<value> ...")?)?;
        let mut form = self.browser_mut()?.edit_record_form(row)?;
        apply_assignments(&mut form, &args[1..])?;
        self.save(form, "Record updated.").await
    }

    async fn save(&mut self, mut form: RecordForm, done: &str) -> CommandResult {
        let Some(browser) = self.browser.as_mut() else {
            return Err(validation_error("No table selected. Use: use <table>").into());
        };
        match browser.save_form(&mut form, self.session.client()).await {
            Ok(_) => {
                self.console.line(done)?;
                self.render_page()
            }
            Err(e) if form.is_open() && !e.is_unauthorized() => {
                self.console.write(&render_form(&form))?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_record(&mut self, args: &[String]) -> CommandResult {
        let row = parse_row(required(args, 0, "delete <row>")?)?;
        let Some(browser) = self.browser.as_mut() else {
            return Err(validation_error("No table selected. Use: use <table>").into());
        };
        let deleted = browser
            .delete_record(self.session.client(), row, &mut self.console)
            .await?;
        if deleted {
            self.console.line("Record deleted.")?;
            self.render_page()?;
        }
        Ok(())
    }

    async fn refetch(&mut self) -> CommandResult {
        let Some(browser) = self.browser.as_mut() else {
            return Err(validation_error("No table selected. Use: use <table>").into());
        };
        browser.fetch(self.session.client()).await?;
        self.render_page()
    }

    fn render_page(&mut self) -> CommandResult {
        if let Some(browser) = &self.browser {
            let text = render_browser(browser);
            self.console.write(&text)?;
        }
        Ok(())
    }
}

fn readline_error(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

fn required<'a>(args: &'a [String], index: usize, usage: &str) -> ApiResult<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| validation_error(format!("Usage: {}", usage)))
}

/// 1-based row number to a record index
fn parse_row(raw: &str) -> ApiResult<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(validation_error(format!("'{}' is not a row number.", raw))),
    }
}

fn apply_assignments(form: &mut RecordForm, args: &[String]) -> ApiResult<()> {
    for arg in args {
        let (column, value) = arg
            .split_once('=')
            .ok_or_else(|| validation_error(format!("Expected <column>=<value>, got '{}'.", arg)))?;
        form.set_value(column, value)?;
    }
    Ok(())
}

/// Split a command line on whitespace; single or double quotes group words.
fn tokenize(line: &str) -> ApiResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(validation_error("Unterminated quote."));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
