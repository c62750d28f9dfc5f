//! Session controller
//!
//! Top-level view model: who is signed in, which tables exist and which one
//! is selected. Table management lives in [`crate::navigator`].

use crate::client::ApiClient;
use crate::error::{ApiResult, AppError};
use crate::models::{Credentials, Table, User};
use tracing::{debug, info, warn};

pub struct SessionController {
    pub(crate) client: ApiClient,
    pub(crate) user: Option<User>,
    pub(crate) tables: Vec<Table>,
    pub(crate) selected: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) loading: bool,
}

impl SessionController {
    /// Wrap `client`, picking up any user its session store already holds.
    pub fn new(client: ApiClient) -> Self {
        let user = client.current_user();
        if let Some(u) = &user {
            debug!("Restored session for '{}'", u.username);
        }
        Self {
            client,
            user,
            tables: Vec::new(),
            selected: None,
            error: None,
            loading: false,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The selected table's current schema
    pub fn selected_table(&self) -> Option<&Table> {
        self.selected.as_deref().and_then(|name| self.table(name))
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Load the tables for a user restored at startup.
    ///
    /// Without a restored user this does nothing.
    pub async fn restore(&mut self) -> ApiResult<()> {
        if self.user.is_none() {
            return Ok(());
        }
        self.refresh_tables().await
    }

    /// Sign in and load the table list.
    ///
    /// A failed login records its message and leaves the previous state as
    /// it was.
    pub async fn login(&mut self, username: &str, password: &str) -> ApiResult<User> {
        self.error = None;
        self.loading = true;
        let result = self.client.login(&Credentials::new(username, password)).await;
        self.loading = false;

        let user = match result {
            Ok(user) => user,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.user = Some(user.clone());
        self.tables.clear();
        self.selected = None;
        self.refresh_tables().await?;
        Ok(user)
    }

    /// Forget the user, the table list and the selection.
    pub fn logout(&mut self) {
        if let Err(e) = self.client.logout() {
            warn!("Failed to remove persisted session: {}", e);
        }
        self.user = None;
        self.tables.clear();
        self.selected = None;
        self.error = None;
        self.loading = false;
    }

    /// Re-read the table list.
    ///
    /// The selection survives when a table of that name still exists. A
    /// rejected session logs the user out.
    pub async fn refresh_tables(&mut self) -> ApiResult<()> {
        self.loading = true;
        let result = self.client.get_tables().await;
        self.loading = false;

        match result {
            Ok(tables) => {
                if let Some(name) = &self.selected {
                    if !tables.iter().any(|t| &t.name == name) {
                        info!("Selected table '{}' no longer exists", name);
                        self.selected = None;
                    }
                }
                self.tables = tables;
                self.error = None;
                Ok(())
            }
            Err(e) => Err(self.handle_error(e)),
        }
    }

    /// Record `err` for display; an expired session also logs out.
    pub fn handle_error(&mut self, err: AppError) -> AppError {
        if err.is_unauthorized() {
            warn!("Session rejected by server: {}", err);
            self.logout();
        }
        self.error = Some(err.to_string());
        err
    }
}
