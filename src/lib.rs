//! table-admin
//!
//! Admin client for dynamically defined database tables served by a REST
//! backend. Users sign in, browse the table list, create and drop tables
//! with their own columns, and page through, sort, create, edit and delete
//! records.
//!
//! The library holds the remote client and the view models; the
//! `table-admin` binary drives them from an interactive shell.

pub mod browser;
pub mod client;
pub mod config;
pub mod confirm;
pub mod error;
pub mod formatter;
pub mod forms;
pub mod models;
pub mod navigator;
pub mod session;
pub mod shell;

pub use browser::RecordBrowser;
pub use client::{ApiClient, SessionStore};
pub use error::{ApiResult, AppError};
pub use session::SessionController;
pub use shell::Shell;
