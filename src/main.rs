//! table-admin - terminal client for dynamically defined tables
//!
//! Settings come from defaults, an optional `table-admin.toml`, the
//! `TABLE_ADMIN__*` environment and finally the command line.

mod args;

use anyhow::Context;
use args::Cli;
use clap::Parser;
use std::io::{self, IsTerminal};
use std::time::Duration;
use table_admin::client::{ApiClient, SessionStore};
use table_admin::config::Settings;
use table_admin::session::SessionController;
use table_admin::shell::Shell;
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = apply_overrides(Settings::load()?, &cli)?;
    debug!("Using API at {}", settings.api.base_url);

    let session_path = settings.session_path();
    let store = SessionStore::with_path(&session_path)
        .with_context(|| format!("Failed to open session file {}", session_path.display()))?;

    let client = ApiClient::builder()
        .base_url(settings.api.base_url.clone())
        .timeout(Duration::from_secs(settings.api.timeout_secs))
        .session(store)
        .build()?;

    let controller = SessionController::new(client);
    let stdin = io::stdin();
    let interactive = cli.command.is_none() && stdin.is_terminal();
    let mut shell = if interactive {
        Shell::terminal(controller, settings.ui.page_size, stdin.lock(), io::stdout())
    } else {
        Shell::new(controller, settings.ui.page_size, stdin.lock(), io::stdout())
    };

    shell.start().await?;
    match cli.command {
        Some(command) => {
            shell.execute(&command).await?;
        }
        None if interactive => {
            info!("Type 'help' for a list of commands");
            let history = session_path.with_file_name("history.txt");
            shell.run_interactive(Some(&history)).await?;
        }
        None => shell.run().await?,
    }

    Ok(())
}

/// Command-line flags win over every other source
fn apply_overrides(mut settings: Settings, cli: &Cli) -> anyhow::Result<Settings> {
    if let Some(url) = &cli.url {
        settings.api.base_url = url.clone();
    }
    if let Some(timeout) = cli.timeout {
        settings.api.timeout_secs = timeout;
    }
    if let Some(page_size) = cli.page_size {
        settings.ui.page_size = page_size;
    }
    if let Some(path) = &cli.session_file {
        settings.session.file = Some(path.clone());
    }
    Ok(settings.validated()?)
}

/// Initialize tracing subscriber. Logs go to stderr so they never mix with
/// shell output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "info,table_admin=debug"
    } else {
        "warn,table_admin=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_file(verbose)
                .with_line_number(verbose)
                .compact(),
        )
        .init();
}
