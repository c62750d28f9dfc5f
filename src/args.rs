use clap::Parser;
use std::path::PathBuf;

/// table-admin - terminal client for dynamically defined tables
#[derive(Parser, Debug)]
#[command(name = "table-admin")]
#[command(version, about = "Browse and edit tables over the table admin REST API", long_about = None)]
pub struct Cli {
    /// API base URL (e.g., http://localhost:3000)
    #[arg(short = 'u', long = "url", env = "TABLE_ADMIN_URL")]
    pub url: Option<String>,

    /// Records per page
    #[arg(long = "page-size", value_name = "ROWS")]
    pub page_size: Option<u32>,

    /// Where the signed-in session is kept
    #[arg(long = "session-file", value_name = "PATH")]
    pub session_file: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Run one shell command and exit
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
