//! Command-line front end for the integration client
//!
//! Runs one upstream operation for one profile and prints the typed result as JSON to stdout.
//! Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! chatlink --profile-id 1001 --cookie "sid=..." dialogs --online-only
//! chatlink --profile-id 1001 send 1002 "Hello!"
//! chatlink --mock restrictions 1002
//! ```
//!
//! # Output
//!
//! On success the operation result, e.g. for `send`:
//! ```json
//! {"success": true, "messageId": 100299}
//! ```
//!
//! On failure an error object and exit code 1:
//! ```json
//! {"success": false, "error": "...", "kind": "http-5xx", "status": 503}
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chatlink_client::{
    CallContext, Error, ErrorResponse, Result, Settings, UpstreamClient,
    config::{ConfigLoader, Mode},
    session::InMemorySessionStore,
    types::{DialogsQuery, MessagesQuery, Session},
    utils::VERSION,
};

/// Profile used in mock mode when none is given
const MOCK_PROFILE_ID: &str = "1001";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "chatlink")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Upstream profile to act as
    #[arg(short, long, env = "CHATLINK_PROFILE_ID", value_name = "PROFILE_ID")]
    profile_id: Option<String>,

    /// Session cookie of the profile
    #[arg(long, env = "CHATLINK_COOKIE", value_name = "COOKIE", hide_env_values = true)]
    cookie: Option<String>,

    /// Operator code, marks requests made during an active shift
    #[arg(long, value_name = "CODE")]
    operator_code: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the upstream base URL
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Per-attempt deadline in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Retry budget for this call
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Serve fixtures instead of calling the upstream
    #[arg(long)]
    mock: bool,

    /// Show version information
    #[arg(long)]
    version: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Show the profile's own account
    Account,

    /// List dialogs
    Dialogs {
        #[arg(long, default_value_t = 15)]
        limit: u32,

        /// Cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,

        #[arg(long)]
        online_only: bool,

        #[arg(long)]
        unread_only: bool,
    },

    /// Show the message history of a dialog
    Messages {
        dialog_id: u64,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        /// Load messages older than this message id
        #[arg(long)]
        cursor: Option<u64>,
    },

    /// Send a text message
    Send { dialog_id: u64, text: String },

    /// Send a catalog sticker
    Sticker { dialog_id: u64, sticker_id: u64 },

    /// List the sticker catalog
    Stickers,

    /// Show content restrictions of a dialog's peer
    Restrictions { dialog_id: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle version flag early
    if cli.version {
        println!("{}", VERSION);
        return Ok(());
    }

    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        std::process::exit(2);
    };

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => fail(&e),
    };

    init_logging(&log_filter(&cli, &settings));

    debug!("Running {:?} in {:?} mode", command, settings.upstream.mode);

    match run(&cli, settings, command).await {
        Ok(output) => println!("{}", output),
        Err(e) => fail(&e),
    }

    Ok(())
}

/// Settings from file and environment, with flags applied on top
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = ConfigLoader::new().load(cli.config.as_deref())?;

    if let Some(base_url) = &cli.base_url {
        settings.upstream.base_url = base_url.clone();
    }
    if cli.mock {
        settings.upstream.mode = Mode::Mock;
    }

    settings.validate()?;
    Ok(settings)
}

/// Filter used when `RUST_LOG` is unset; verbose from either the flag or the config
fn log_filter(cli: &Cli, settings: &Settings) -> String {
    if cli.verbose || settings.logging.verbose {
        "debug".to_string()
    } else {
        settings.logging.level.clone()
    }
}

fn init_logging(fallback: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build the call context from CLI arguments
fn build_context(cli: &Cli, mode: Mode) -> Result<CallContext> {
    let profile_id = match (&cli.profile_id, mode) {
        (Some(profile_id), _) => profile_id.clone(),
        (None, Mode::Mock) => MOCK_PROFILE_ID.to_string(),
        (None, Mode::Live) => return Err(Error::config("--profile-id is required")),
    };

    let mut ctx = CallContext::new(profile_id);
    if let Some(code) = &cli.operator_code {
        ctx = ctx.with_operator_code(code);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        ctx = ctx.with_timeout(Duration::from_millis(timeout_ms));
    }
    if let Some(max_retries) = cli.max_retries {
        ctx = ctx.with_max_retries(max_retries);
    }

    Ok(ctx)
}

async fn run(cli: &Cli, settings: Settings, command: Command) -> Result<String> {
    let ctx = build_context(cli, settings.upstream.mode)?;

    let store = Arc::new(InMemorySessionStore::new());
    if let Some(cookie) = &cli.cookie {
        store
            .insert_session(Session::new(ctx.profile_id.clone(), cookie.clone()))
            .await;
        // The operator running the CLI is on shift by definition
        if let Some(code) = &ctx.operator_code {
            store.start_shift(code.clone()).await;
        }
    }

    let client = UpstreamClient::new(settings, store)?;

    match command {
        Command::Account => to_json(&client.fetch_account(&ctx).await?),
        Command::Dialogs {
            limit,
            cursor,
            online_only,
            unread_only,
        } => {
            let mut query = DialogsQuery::new()
                .with_limit(limit)
                .with_online_only(online_only)
                .with_unread_only(unread_only);
            if let Some(cursor) = cursor {
                query = query.with_cursor(cursor);
            }
            to_json(&client.fetch_dialogs(&ctx, &query).await?)
        }
        Command::Messages {
            dialog_id,
            limit,
            cursor,
        } => {
            let mut query = MessagesQuery::new().with_limit(limit);
            if let Some(cursor) = cursor {
                query = query.with_cursor(cursor);
            }
            to_json(&client.fetch_messages(&ctx, dialog_id, &query).await?)
        }
        Command::Send { dialog_id, text } => {
            to_json(&client.send_message(&ctx, dialog_id, text).await?)
        }
        Command::Sticker {
            dialog_id,
            sticker_id,
        } => to_json(&client.send_sticker(&ctx, dialog_id, sticker_id).await?),
        Command::Stickers => to_json(&client.fetch_stickers(&ctx).await?),
        Command::Restrictions { dialog_id } => {
            to_json(&client.fetch_restrictions(&ctx, dialog_id).await?)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Print the error as JSON and exit with status 1
fn fail(error: &Error) -> ! {
    eprintln!("chatlink: {}", error);
    match serde_json::to_string(&ErrorResponse::new(error)) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{{}}"),
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("chatlink").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = parse(&["--mock", "dialogs", "--limit", "5", "--online-only"]);
        assert!(cli.mock);
        assert_eq!(
            cli.command,
            Some(Command::Dialogs {
                limit: 5,
                cursor: None,
                online_only: true,
                unread_only: false,
            })
        );

        let cli = parse(&["send", "1002", "Hello there"]);
        assert_eq!(
            cli.command,
            Some(Command::Send {
                dialog_id: 1002,
                text: "Hello there".to_string(),
            })
        );
    }

    #[test]
    fn test_build_context() {
        let cli = parse(&[
            "--profile-id",
            "77",
            "--operator-code",
            "OP1",
            "--timeout-ms",
            "2500",
            "--max-retries",
            "0",
            "account",
        ]);

        let ctx = build_context(&cli, Mode::Live).unwrap();
        assert_eq!(ctx.profile_id, "77");
        assert_eq!(ctx.operator_code.as_deref(), Some("OP1"));
        assert_eq!(ctx.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(ctx.max_retries, Some(0));
    }

    #[test]
    fn test_log_filter_honours_config_verbose() {
        let mut settings = Settings::default();
        assert_eq!(log_filter(&parse(&["account"]), &settings), "warn");
        assert_eq!(log_filter(&parse(&["--verbose", "account"]), &settings), "debug");

        settings.logging.verbose = true;
        assert_eq!(log_filter(&parse(&["account"]), &settings), "debug");
    }

    #[test]
    fn test_profile_required_in_live_mode() {
        let cli = Cli {
            profile_id: None,
            cookie: None,
            operator_code: None,
            config: None,
            base_url: None,
            timeout_ms: None,
            max_retries: None,
            mock: false,
            version: false,
            verbose: false,
            command: Some(Command::Account),
        };

        assert!(matches!(
            build_context(&cli, Mode::Live),
            Err(Error::Config(_))
        ));
        assert_eq!(
            build_context(&cli, Mode::Mock).unwrap().profile_id,
            MOCK_PROFILE_ID
        );
    }
}
