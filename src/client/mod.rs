//! Remote service client
//!
//! Thin wrapper over the backend's REST surface. Every call goes out as JSON,
//! carries `Authorization: Bearer <token>` when a session exists, and turns a
//! failed response into an [`AppError`] whose message is ready for display.
//!
//! A 401/403 on any authenticated call clears the session store; callers see
//! [`AppError::Unauthorized`] and are expected to drop back to the login
//! screen.

mod store;

pub use store::SessionStore;

use crate::config::normalize_base_url;
use crate::error::{validation_error, ApiResult, AppError};
use crate::models::{
    Column, CreateTableRequest, Credentials, Record, RecordPage, RecordQuery, Table, User,
};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the table administration API.
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
///
/// ```rust,no_run
/// use table_admin::client::{ApiClient, SessionStore};
/// use table_admin::models::Credentials;
///
/// # async fn example() -> table_admin::error::ApiResult<()> {
/// let client = ApiClient::builder()
///     .base_url("http://localhost:3000")
///     .session(SessionStore::in_memory())
///     .build()?;
///
/// let user = client.login(&Credentials::new("admin", "admin")).await?;
/// let tables = client.get_tables().await?;
/// println!("{} sees {} tables", user.username, tables.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: reqwest::Client,
    session: SessionStore,
}

impl ApiClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current()
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn url(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config("API base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send `request` and map non-success statuses to errors
    async fn execute(&self, request: RequestBuilder, authenticated: bool) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = AppError::from_response(status, &body, authenticated);
        debug!("Request failed with {}: {}", status, err);

        if err.is_unauthorized() {
            warn!("Server rejected the session ({}), signing out", status);
            if let Err(e) = self.session.clear() {
                warn!("Failed to clear session: {}", e);
            }
        }

        Err(err)
    }

    /// Decode a record body; an empty body yields an empty record
    async fn read_record(response: Response) -> ApiResult<Record> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Record::new());
        }
        serde_json::from_str(&body).map_err(|e| AppError::Decode(e.to_string()))
    }

    fn current_user_id(&self) -> Value {
        self.session
            .current()
            .map(|u| Value::from(u.id))
            .unwrap_or(Value::Null)
    }

    // ============================================
    // Authentication
    // ============================================

    /// POST /auth/login
    ///
    /// On success the returned user becomes the current (persisted) session.
    /// A failure leaves any existing session untouched.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<User> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(validation_error("Username and password are required."));
        }

        let url = self.url(&["auth", "login"])?;
        debug!("Attempting login for '{}'", credentials.username);

        let response = self
            .execute(self.http_client.post(url).json(credentials), false)
            .await?;
        let user: User = response.json().await?;

        self.session.set(user.clone())?;
        info!("Logged in as '{}' ({})", user.username, user.role);
        Ok(user)
    }

    /// Forget the session locally. The backend keeps no logout state.
    pub fn logout(&self) -> ApiResult<()> {
        self.session.clear()?;
        info!("User logged out");
        Ok(())
    }

    // ============================================
    // Schema management
    // ============================================

    /// GET /tables
    pub async fn get_tables(&self) -> ApiResult<Vec<Table>> {
        let url = self.url(&["tables"])?;
        debug!("Fetching tables");

        let response = self
            .execute(self.authorize(self.http_client.get(url)), true)
            .await?;
        let tables: Vec<Table> = response.json().await?;

        debug!("Fetched {} tables", tables.len());
        Ok(tables)
    }

    /// POST /tables
    pub async fn create_table(&self, table_name: &str, columns: Vec<Column>) -> ApiResult<()> {
        let url = self.url(&["tables"])?;
        let column_count = columns.len();
        let body = CreateTableRequest {
            table_name: table_name.to_string(),
            columns,
        };

        self.execute(self.authorize(self.http_client.post(url).json(&body)), true)
            .await?;

        info!("Table '{}' created with {} columns", table_name, column_count);
        Ok(())
    }

    /// DELETE /tables/{name}
    pub async fn delete_table(&self, table_name: &str) -> ApiResult<()> {
        let url = self.url(&["tables", table_name])?;

        self.execute(self.authorize(self.http_client.delete(url)), true)
            .await?;

        info!("Table '{}' deleted", table_name);
        Ok(())
    }

    // ============================================
    // Record management
    // ============================================

    /// GET /tables/{name}/records
    pub async fn get_records(&self, table_name: &str, query: &RecordQuery) -> ApiResult<RecordPage> {
        let url = self.url(&["tables", table_name, "records"])?;
        let params = query.to_query_pairs()?;
        debug!(
            "Fetching records for '{}' (page {}, limit {}, sort {:?})",
            table_name, query.page, query.limit, query.sort
        );

        let response = self
            .execute(self.authorize(self.http_client.get(url).query(&params)), true)
            .await?;
        let page: RecordPage = response.json().await?;

        debug!("Fetched {} of {} records", page.records.len(), page.total);
        Ok(page)
    }

    /// POST /tables/{name}/records
    ///
    /// Stamps `created_by` and `modified_by` with the current user's id.
    pub async fn create_record(&self, table_name: &str, mut data: Record) -> ApiResult<Record> {
        let url = self.url(&["tables", table_name, "records"])?;
        let user_id = self.current_user_id();
        data.insert("created_by".to_string(), user_id.clone());
        data.insert("modified_by".to_string(), user_id);

        let response = self
            .execute(self.authorize(self.http_client.post(url).json(&data)), true)
            .await?;
        let created = Self::read_record(response).await?;

        info!("Record created in '{}'", table_name);
        Ok(created)
    }

    /// PUT /tables/{name}/records/{id}
    ///
    /// Stamps `modified_by` with the current user's id.
    pub async fn update_record(
        &self,
        table_name: &str,
        record_id: &str,
        mut data: Record,
    ) -> ApiResult<Record> {
        let url = self.url(&["tables", table_name, "records", record_id])?;
        data.insert("modified_by".to_string(), self.current_user_id());

        let response = self
            .execute(self.authorize(self.http_client.put(url).json(&data)), true)
            .await?;
        let updated = Self::read_record(response).await?;

        info!("Record '{}' updated in '{}'", record_id, table_name);
        Ok(updated)
    }

    /// DELETE /tables/{name}/records/{id}
    pub async fn delete_record(&self, table_name: &str, record_id: &str) -> ApiResult<()> {
        let url = self.url(&["tables", table_name, "records", record_id])?;

        self.execute(self.authorize(self.http_client.delete(url)), true)
            .await?;

        info!("Record '{}' deleted from '{}'", record_id, table_name);
        Ok(())
    }
}

/// Builder for configuring [`ApiClient`] instances.
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    session: Option<SessionStore>,
}

impl ApiClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            session: None,
        }
    }

    /// Set the base URL of the backend (e.g. `https://api.example.com`)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Share an existing session store; defaults to an in-memory one
    pub fn session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the client
    pub fn build(self) -> ApiResult<ApiClient> {
        let raw = self
            .base_url
            .ok_or_else(|| AppError::Config("base_url is required".to_string()))?;
        let normalized = normalize_base_url(&raw).map_err(|e| AppError::Config(e.to_string()))?;
        let base_url = Url::parse(&normalized).map_err(|e| AppError::Config(e.to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("table-admin/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(ApiClient {
            base_url,
            http_client,
            session: self.session.unwrap_or_default(),
        })
    }
}
