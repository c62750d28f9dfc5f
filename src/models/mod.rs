//! Data models and DTOs (Data Transfer Objects)
//!
//! Contains the schema, user, record and filter structures exchanged with the
//! backend.

pub mod filter;
pub mod record;
pub mod table;
pub mod user;

// Re-export commonly used types
pub use filter::*;
pub use record::*;
pub use table::*;
pub use user::*;
