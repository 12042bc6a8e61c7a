//! tokenward - command-line driver for a persisted token session.
//!
//! Logs in against the configured backend, keeps the session in the state
//! directory, and can run the background refresh loop in the foreground.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tokenward_core::{
    Config, Credentials, FileStore, Navigator, SessionManager, SessionSnapshot, LOGIN_ROUTE,
};

// ============================================================================
// Constants
// ============================================================================

/// Environment variables consulted before prompting
const USERNAME_ENV: &str = "TOKENWARD_USERNAME";
const PASSWORD_ENV: &str = "TOKENWARD_PASSWORD";

/// Log file name prefix used with `--log-file`
const LOG_FILE_PREFIX: &str = "tokenward.log";

#[derive(Parser, Debug)]
#[command(name = "tokenward", version, about = "Manage a persisted API token session")]
struct Cli {
    /// Backend base URL (overrides config and TOKENWARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding session.json
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Write logs to a daily rolling file in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange username/password for a token pair and load the profile
    Login {
        #[arg(long, short)]
        username: Option<String>,
    },
    /// Forget both tokens
    Logout,
    /// Print the signed-in user's profile
    Whoami,
    /// Renew the access token once
    Refresh,
    /// Show which parts of the session are present
    Status,
    /// Keep the access token fresh until Ctrl+C
    Watch,
}

/// Sends the user back to `tokenward login` whenever the session ends.
struct CliNavigator;

impl Navigator for CliNavigator {
    fn navigate_to(&self, route: &str) {
        if route == LOGIN_ROUTE {
            eprintln!("Session ended. Run `tokenward login` to sign in again.");
        } else {
            info!(route, "Navigation requested");
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    config.apply_api_url_override(cli.api_url.clone());

    let state_dir = match cli.state_dir.clone() {
        Some(dir) => dir,
        None => config.state_dir()?,
    };
    info!(api_url = %config.api_url, state_dir = %state_dir.display(), "tokenward starting");

    let storage = Arc::new(FileStore::new(&state_dir));
    let api = config.api_client()?;
    let navigator = Arc::new(CliNavigator);
    let options = config.session_options();

    let mut manager = SessionManager::new(api, storage, navigator, options);

    match cli.command {
        Command::Login { username } => login(&manager, &mut config, username).await,
        Command::Logout => {
            manager.logout();
            println!("Logged out.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Whoami => whoami(&manager).await,
        Command::Refresh => {
            manager.refresh().await.context("Cannot refresh")?;
            if manager.is_logged_in() {
                println!("Access token refreshed.");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Status => {
            print_status(&manager.snapshot());
            Ok(ExitCode::SUCCESS)
        }
        Command::Watch => {
            manager.start_auto_refresh();
            watch(manager).await
        }
    }
}

async fn login(manager: &SessionManager, config: &mut Config, username: Option<String>) -> Result<ExitCode> {
    let username = match username
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .or_else(|| config.last_username.clone())
    {
        Some(u) if !u.is_empty() => u,
        _ => prompt_username()?,
    };

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        eprintln!("Username and password required");
        return Ok(ExitCode::FAILURE);
    }

    println!("Authenticating...");
    let credentials = Credentials::new(username.clone(), password);

    if !manager.login(&credentials).await || !manager.is_logged_in() {
        eprintln!("Login failed.");
        return Ok(ExitCode::FAILURE);
    }

    config.last_username = Some(username);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    match manager.user() {
        Some(user) => println!("Logged in as {}.", user.display_name()),
        None => println!("Logged in."),
    }
    Ok(ExitCode::SUCCESS)
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

async fn whoami(manager: &SessionManager) -> Result<ExitCode> {
    if manager.user().is_none() && manager.is_logged_in() {
        manager.fetch_user().await.context("Cannot load profile")?;
    }

    match manager.user() {
        Some(user) => {
            println!("{}", serde_json::to_string_pretty(&user)?);
            if !manager.is_logged_in() {
                eprintln!("(cached profile; not logged in)");
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            eprintln!("Not logged in.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_status(snapshot: &SessionSnapshot) {
    let present = |v: Option<&str>| if v.is_some() { "present" } else { "absent" };

    println!("logged in:     {}", snapshot.is_logged_in());
    println!("access token:  {}", present(snapshot.access_token()));
    println!("refresh token: {}", present(snapshot.refresh_token()));
    match snapshot.user {
        Some(ref user) => println!("user:          {} ({})", user.username, user.display_name()),
        None => println!("user:          none"),
    }
    if let Some(at) = snapshot.updated_at {
        println!("updated:       {}", at.to_rfc3339());
    }
}

async fn watch(manager: SessionManager) -> Result<ExitCode> {
    let mut rx = manager.subscribe();
    print_status(&rx.borrow_and_update());
    if let Some(period) = manager.auto_refresh_period() {
        println!("Refreshing every {}s. Press Ctrl+C to stop.", period.as_secs());
    }

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = rx.borrow_and_update().clone();
                println!();
                print_status(&snapshot);
            }
        }
    }

    manager.shutdown().await;
    info!("tokenward watch stopped");
    Ok(ExitCode::SUCCESS)
}
