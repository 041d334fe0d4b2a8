//! Command-line front end: one subcommand per page action.

use crate::auth::Auth;
use crate::config::Config;
use crate::error::ClientError;
use crate::gateway::Gateway;
use crate::pages::{
    AdminDashboard, LoginPage, RegisterPage, StatusKind, UserDashboard, View,
};
use crate::session::SessionStore;
use crate::terminal::TerminalView;
use crate::transport::HttpTransport;
use anyhow::Result;
use clap::{Parser, Subcommand};
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// memecap - caption memes from the terminal
#[derive(Parser, Debug)]
#[command(name = "memecap", about = "Client for the meme captioning service")]
pub struct Args {
    #[arg(long, help = "Config file (default: ~/.memecap/config.toml)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override the API base URL")]
    pub base_url: Option<String>,

    #[arg(long, help = "Override the session file location")]
    pub session_file: Option<PathBuf>,

    #[arg(long, help = "Debug output")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login {
        username: String,
        #[arg(long, env = "MEMECAP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        #[arg(long, env = "MEMECAP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and clear the local session
    Logout,
    /// Re-validate the stored token with the server
    Verify,
    /// Show the signed-in user's dashboard
    #[command(alias = "whoami")]
    Dashboard,
    /// Upload an image and print the generated caption
    Caption { file: Option<PathBuf> },
    /// Admin dashboard: list users and stats, or act on one user
    Admin {
        #[command(subcommand)]
        action: Option<AdminCommand>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Grant the admin role
    Promote {
        id: u64,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    /// Delete a user
    Delete {
        id: u64,
        #[arg(long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
}

/// Wiring shared by every subcommand.
pub struct Context {
    pub config: Config,
    pub auth: Auth,
}

impl Context {
    pub fn new(config: Config) -> Result<Self> {
        let session = Arc::new(SessionStore::open(config.session_path())?);
        let transport = Arc::new(HttpTransport::new(config.request_timeout())?);
        let gateway = Gateway::new(&config.base_url, transport, session);
        Ok(Self {
            config,
            auth: Auth::new(gateway),
        })
    }
}

pub fn init_tracing(level: Option<&str>, debug: bool) {
    let filter = if debug {
        EnvFilter::new("memecap=debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.unwrap_or("warn")))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

fn prompt_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    let mut editor = DefaultEditor::new()?;
    Ok(editor.readline("Password: ")?)
}

/// Build configuration from file, environment and flags. Also returns
/// warnings about environment values that were ignored.
pub fn resolve_config(args: &Args) -> Result<(Config, Vec<String>)> {
    let mut cfg = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let warnings = cfg.apply_env();
    if let Some(url) = &args.base_url {
        cfg.base_url = url.clone();
    }
    if let Some(path) = &args.session_file {
        cfg.session_file = Some(path.clone());
    }
    Ok((cfg, warnings))
}

pub async fn run(args: Args) -> Result<ExitCode> {
    let (cfg, env_warnings) = resolve_config(&args)?;
    init_tracing(cfg.log_level.as_deref(), args.debug);
    for warning in &env_warnings {
        tracing::warn!("{}", warning);
    }

    if let Err(errors) = cfg.validate() {
        for err in &errors {
            eprintln!("Config error {}", err);
        }
        anyhow::bail!("Configuration has {} validation error(s)", errors.len());
    }

    let ctx = Context::new(cfg)?;

    if args.debug {
        eprintln!("[DEBUG] Base URL: {}", ctx.auth.gateway().base_url());
        if let Some(path) = ctx.auth.session().path() {
            eprintln!("[DEBUG] Session file: {}", path.display());
        }
    }
    let outcome = dispatch(&ctx, args.command).await;

    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    })
}

/// Run one subcommand. Errors have already been rendered by the page.
async fn dispatch(ctx: &Context, command: Command) -> std::result::Result<(), ClientError> {
    let delay = ctx.config.redirect_delay();
    match command {
        Command::Login { username, password } => {
            let password = read_password(password)?;
            let page = LoginPage::new(ctx.auth.clone(), TerminalView::new(false), delay);
            page.submit(&username, &password).await.map(|_| ())
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = read_password(password)?;
            let page = RegisterPage::new(ctx.auth.clone(), TerminalView::new(false), delay);
            page.submit(&username, &email, &password).await.map(|_| ())
        }
        Command::Logout => {
            let mut view = TerminalView::new(false);
            let result = ctx.auth.logout().await;
            match &result {
                Ok(()) => view.show_status(StatusKind::Success, "Logged out."),
                Err(e) => view.show_status(StatusKind::Error, &format!("Error: {}", e)),
            }
            result
        }
        Command::Verify => {
            let mut view = TerminalView::new(false);
            match ctx.auth.verify().await {
                Ok(user) => {
                    view.show_status(
                        StatusKind::Success,
                        &format!("Session valid for {}.", user.username),
                    );
                    Ok(())
                }
                Err(e) => {
                    view.show_status(StatusKind::Error, &format!("Error: {}", e));
                    Err(e)
                }
            }
        }
        Command::Dashboard => {
            let page = UserDashboard::new(ctx.auth.clone(), TerminalView::new(false));
            page.load().await.map(|_| ())
        }
        Command::Caption { file } => {
            let page = UserDashboard::new(ctx.auth.clone(), TerminalView::new(false));
            page.generate(file.as_deref()).await.map(|_| ())
        }
        Command::Admin { action } => {
            let assume_yes = matches!(
                action,
                Some(AdminCommand::Promote { yes: true, .. })
                    | Some(AdminCommand::Delete { yes: true, .. })
            );
            let page = AdminDashboard::new(ctx.auth.clone(), TerminalView::new(assume_yes));
            page.load().await?;
            match action {
                None => Ok(()),
                Some(AdminCommand::Promote { id, .. }) => page.promote(id).await.map(|_| ()),
                Some(AdminCommand::Delete { id, .. }) => page.delete(id).await.map(|_| ()),
            }
        }
    }
}

fn read_password(given: Option<String>) -> std::result::Result<String, ClientError> {
    prompt_password(given).map_err(|e| {
        let message = format!("No password given: {}", e);
        eprintln!("✗ {}", message);
        ClientError::Validation(message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_admin_promote() {
        let args = Args::try_parse_from(["memecap", "admin", "promote", "42", "--yes"]).unwrap();
        match args.command {
            Command::Admin {
                action: Some(AdminCommand::Promote { id, yes }),
            } => {
                assert_eq!(id, 42);
                assert!(yes);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_whoami_alias() {
        let args = Args::try_parse_from(["memecap", "whoami"]).unwrap();
        assert!(matches!(args.command, Command::Dashboard));
    }

    #[test]
    fn test_parse_caption_without_file() {
        let args = Args::try_parse_from(["memecap", "caption"]).unwrap();
        assert!(matches!(args.command, Command::Caption { file: None }));
    }

    #[test]
    #[serial_test::serial]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "base_url = \"http://file.example.com\"\n").unwrap();

        let args = Args::try_parse_from([
            "memecap",
            "--config",
            config.to_str().unwrap(),
            "--base-url",
            "http://flag.example.com",
            "logout",
        ])
        .unwrap();
        let (cfg, _) = resolve_config(&args).unwrap();
        assert_eq!(cfg.base_url, "http://flag.example.com");
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_env_reported_after_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();
        std::env::set_var("MEMECAP_REDIRECT_DELAY_MS", "later");

        let args =
            Args::try_parse_from(["memecap", "--config", config.to_str().unwrap(), "logout"])
                .unwrap();
        let resolved = resolve_config(&args);
        std::env::remove_var("MEMECAP_REDIRECT_DELAY_MS");

        let (cfg, warnings) = resolved.unwrap();
        assert_eq!(cfg.redirect_delay_ms, crate::config::DEFAULT_REDIRECT_DELAY_MS);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("MEMECAP_REDIRECT_DELAY_MS"));
    }
}
