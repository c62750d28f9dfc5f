//! In-process stub of the table admin backend
//!
//! Serves the REST surface from memory on an ephemeral port and logs every
//! request so tests can assert on what the client actually sent.

#![allow(dead_code)]

use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use table_admin::client::{ApiClient, SessionStore};
use table_admin::models::{
    cell_text, record_key, AdvancedFilter, Column, ColumnDataType, Record, Role, SortConfig,
    SortDirection, Table, User,
};
use tokio::net::TcpListener;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const VIEWER_TOKEN: &str = "viewer-token";

/// One request as seen by the stub
#[derive(Debug, Clone)]
pub struct LoggedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

#[derive(Debug, Default)]
pub struct Backend {
    pub accounts: Vec<(String, User)>,
    pub tables: Vec<Table>,
    pub records: HashMap<String, Vec<Record>>,
    pub requests: Vec<LoggedRequest>,
    pub fail_updates: bool,
    pub expire_tokens: bool,
    pub next_id: i64,
}

impl Backend {
    /// Two accounts (`admin`/`admin` and `viewer`/`viewer`) and a `users`
    /// table holding `rows` records.
    pub fn seeded(rows: usize) -> Self {
        let mut backend = Backend {
            next_id: 1,
            ..Default::default()
        };
        backend.accounts.push((
            "admin".to_string(),
            User {
                id: 1,
                username: "admin".to_string(),
                role: Role::Admin,
                token: ADMIN_TOKEN.to_string(),
            },
        ));
        backend.accounts.push((
            "viewer".to_string(),
            User {
                id: 2,
                username: "viewer".to_string(),
                role: Role::User,
                token: VIEWER_TOKEN.to_string(),
            },
        ));

        backend.tables.push(users_table());
        let records = (0..rows)
            .map(|i| backend.make_record(json!({"name": format!("user{:02}", i + 1)})))
            .collect();
        backend.records.insert("users".to_string(), records);
        backend
    }

    fn make_record(&mut self, fields: Value) -> Record {
        let mut record = Record::new();
        record.insert("id".to_string(), json!(self.next_id));
        self.next_id += 1;
        if let Value::Object(map) = fields {
            record.extend(map);
        }
        record
    }
}

pub fn users_table() -> Table {
    Table::new(
        "users",
        vec![
            Column::new("id", ColumnDataType::Int).primary_key().auto_increment(),
            Column::new("name", ColumnDataType::Varchar),
            Column::new("email", ColumnDataType::Varchar),
            Column::new("created_by", ColumnDataType::Int),
            Column::new("modified_by", ColumnDataType::Int),
        ],
    )
}

pub type SharedBackend = Arc<Mutex<Backend>>;

pub struct TestServer {
    pub base_url: String,
    pub backend: SharedBackend,
}

impl TestServer {
    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.backend.lock().unwrap().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.backend.lock().unwrap().requests.clear();
    }

    /// Requests matching `method` whose path starts with `prefix`
    pub fn requests_to(&self, method: &str, prefix: &str) -> Vec<LoggedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .collect()
    }

    pub fn with_backend<T>(&self, f: impl FnOnce(&mut Backend) -> T) -> T {
        f(&mut self.backend.lock().unwrap())
    }

    pub fn client(&self, store: SessionStore) -> ApiClient {
        ApiClient::builder()
            .base_url(self.base_url.clone())
            .session(store)
            .build()
            .unwrap()
    }
}

pub async fn spawn(backend: Backend) -> TestServer {
    let shared: SharedBackend = Arc::new(Mutex::new(backend));

    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/tables", get(list_tables).post(create_table))
        .route("/tables/{name}", axum::routing::delete(delete_table))
        .route("/tables/{name}/records", get(list_records).post(create_record))
        .route(
            "/tables/{name}/records/{id}",
            put(update_record).delete(delete_record),
        )
        .layer(middleware::from_fn_with_state(shared.clone(), log_request))
        .with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        backend: shared,
    }
}

async fn log_request(State(backend): State<SharedBackend>, request: Request, next: Next) -> Response {
    let query = request
        .uri()
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let logged = LoggedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query,
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };
    backend.lock().unwrap().requests.push(logged);
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn authorize(backend: &Backend, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(t) if !backend.expire_tokens && backend.accounts.iter().any(|(_, u)| u.token == t) => {
            Ok(())
        }
        _ => Err(error(StatusCode::UNAUTHORIZED, "Token expired")),
    }
}

async fn login(State(backend): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    let backend = backend.lock().unwrap();
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    // Every stub account uses its username as the password
    match backend
        .accounts
        .iter()
        .find(|(name, _)| name == username && name == password)
    {
        Some((_, user)) => Json(user.clone()).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Invalid credentials."),
    }
}

async fn list_tables(State(backend): State<SharedBackend>, headers: HeaderMap) -> Response {
    let backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    Json(backend.tables.clone()).into_response()
}

async fn create_table(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    let name = body["tableName"].as_str().unwrap_or_default().to_string();
    if backend.tables.iter().any(|t| t.name == name) {
        return error(StatusCode::CONFLICT, "Table already exists");
    }
    let columns: Vec<Column> = serde_json::from_value(body["columns"].clone()).unwrap_or_default();
    backend.tables.push(Table::new(name.clone(), columns));
    backend.records.insert(name, Vec::new());
    (StatusCode::CREATED, Json(json!({ "success": true }))).into_response()
}

async fn delete_table(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    let before = backend.tables.len();
    backend.tables.retain(|t| t.name != name);
    if backend.tables.len() == before {
        return error(StatusCode::NOT_FOUND, "Table not found");
    }
    backend.records.remove(&name);
    StatusCode::NO_CONTENT.into_response()
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => cell_text(a).cmp(&cell_text(b)),
    }
}

/// Only `equals`/`eq` and `contains` are evaluated; other operators pass
fn matches_filter(record: &Record, filters: &AdvancedFilter) -> bool {
    filters.groups.iter().all(|group| {
        group.filters.iter().all(|f| {
            let cell = cell_text(record.get(&f.column));
            let wanted = cell_text(Some(&f.value));
            match f.operator.as_str() {
                "equals" | "eq" => cell == wanted,
                "contains" => cell.contains(&wanted),
                _ => true,
            }
        })
    })
}

async fn list_records(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    let Some(records) = backend.records.get(&name) else {
        return error(StatusCode::NOT_FOUND, "Table not found");
    };

    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|p| p.parse().ok()).unwrap_or(20);
    let sort: Option<SortConfig> = params.get("sort").and_then(|s| serde_json::from_str(s).ok());
    let filters: Option<AdvancedFilter> =
        params.get("filters").and_then(|s| serde_json::from_str(s).ok());

    let mut rows: Vec<Record> = records
        .iter()
        .filter(|r| filters.as_ref().map_or(true, |f| matches_filter(r, f)))
        .cloned()
        .collect();
    if let Some(sort) = &sort {
        rows.sort_by(|a, b| {
            let ord = compare(a.get(&sort.key), b.get(&sort.key));
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    let total = rows.len();
    let page_rows: Vec<Record> = rows
        .into_iter()
        .skip(page.saturating_sub(1) * limit)
        .take(limit)
        .collect();
    Json(json!({ "records": page_rows, "total": total })).into_response()
}

async fn create_record(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    if !backend.records.contains_key(&name) {
        return error(StatusCode::NOT_FOUND, "Table not found");
    }
    let record = backend.make_record(body);
    if let Some(rows) = backend.records.get_mut(&name) {
        rows.push(record.clone());
    }
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update_record(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    if backend.fail_updates {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Update failed: disk full");
    }
    let Some(table) = backend.tables.iter().find(|t| t.name == name).cloned() else {
        return error(StatusCode::NOT_FOUND, "Table not found");
    };
    let rows = backend.records.entry(name).or_default();
    let Some(row) = rows
        .iter_mut()
        .find(|r| record_key(&table, r).as_deref() == Some(id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, "Record not found");
    };
    if let Value::Object(fields) = body {
        row.extend(fields);
    }
    Json(row.clone()).into_response()
}

async fn delete_record(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
) -> Response {
    let mut backend = backend.lock().unwrap();
    if let Err(r) = authorize(&backend, &headers) {
        return r;
    }
    let Some(table) = backend.tables.iter().find(|t| t.name == name).cloned() else {
        return error(StatusCode::NOT_FOUND, "Table not found");
    };
    let rows = backend.records.entry(name).or_default();
    let before = rows.len();
    rows.retain(|r| record_key(&table, r).as_deref() != Some(id.as_str()));
    if rows.len() == before {
        return error(StatusCode::NOT_FOUND, "Record not found");
    }
    StatusCode::NO_CONTENT.into_response()
}
