//! Runs a parsed command line against the gateway.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;
use roadfleet_access::{
    AccessGuard, AuthBackend, AuthGateway, FileStorage, GuardAction, Role, Session, SessionStore,
};
use roadfleet_api::ApiClient;
use rootcause::prelude::{Report, ResultExt};
use secrecy::SecretString;
use tracing::debug;

use crate::config::CliConfig;

/// Top-level CLI failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// Configuration from the environment is invalid.
    Config,
    /// The session directory cannot be used.
    Storage { dir: PathBuf },
    /// The HTTP client could not be created.
    Client,
    /// A sign-in related command failed.
    Command { name: &'static str },
    /// A required argument was missing after parsing.
    MissingArgument { name: &'static str },
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "invalid configuration"),
            Self::Storage { dir } => {
                write!(f, "cannot use session directory {}", dir.display())
            }
            Self::Client => write!(f, "cannot create backend client"),
            Self::Command { name } => write!(f, "{name} failed"),
            Self::MissingArgument { name } => write!(f, "missing argument --{name}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Applies command-line overrides on top of the environment configuration.
pub fn configure(mut config: CliConfig, matches: &ArgMatches) -> CliConfig {
    if let Some(url) = matches.get_one::<String>("api-url") {
        config.api = config.api.with_base_url(url);
    }
    if let Some(secs) = matches.get_one::<u64>("timeout") {
        config.api = config.api.with_request_timeout(Duration::from_secs(*secs));
    }
    if let Some(dir) = matches.get_one::<PathBuf>("storage-dir") {
        config.storage_dir = dir.clone();
    }
    config
}

/// Executes the selected subcommand.
///
/// # Errors
///
/// Returns an error if configuration, storage or the backend client cannot
/// be set up, or if the command itself fails.
pub async fn run(matches: &ArgMatches) -> Result<ExitCode, Report<CliError>> {
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };

    let config = CliConfig::from_env().context(CliError::Config)?;
    let config = configure(config, sub);
    debug!(?config, "configuration loaded");

    let storage = FileStorage::open(&config.storage_dir).context(CliError::Storage {
        dir: config.storage_dir.clone(),
    })?;
    let store = Arc::new(SessionStore::new(Arc::new(storage)));
    store.load();

    let timeout = config.api.request_timeout();
    let client = ApiClient::new(config.api.clone()).context(CliError::Client)?;
    let gateway = AuthGateway::new(client, store).with_timeout(timeout);

    execute(&gateway, &config, name, sub).await
}

async fn execute<B: AuthBackend>(
    gateway: &AuthGateway<B>,
    config: &CliConfig,
    name: &str,
    sub: &ArgMatches,
) -> Result<ExitCode, Report<CliError>> {
    match name {
        "login" => {
            let session = gateway
                .login(required(sub, "email")?, password(sub)?)
                .await
                .context(CliError::Command { name: "login" })?;
            println!("Signed in as {}", describe(&session));
        }
        "register" => {
            let session = gateway
                .register(required(sub, "name")?, required(sub, "email")?, password(sub)?)
                .await
                .context(CliError::Command { name: "register" })?;
            println!("Signed in as {}", describe(&session));
        }
        "logout" => {
            gateway.logout().await;
            println!("Signed out");
        }
        "whoami" => {
            let session = if sub.get_flag("remote") {
                gateway
                    .current_identity()
                    .await
                    .context(CliError::Command { name: "whoami" })?
            } else {
                let Some(session) = gateway.store().session() else {
                    println!("Not signed in");
                    return Ok(ExitCode::FAILURE);
                };
                session
            };
            println!("{}", describe(&session));
        }
        "refresh" => {
            let session = gateway
                .refresh()
                .await
                .context(CliError::Command { name: "refresh" })?;
            println!("Token refreshed for {}", describe(&session));
        }
        "check" => {
            if !check(gateway.store(), config, sub) {
                return Ok(ExitCode::FAILURE);
            }
        }
        _ => return Ok(ExitCode::FAILURE),
    }
    Ok(ExitCode::SUCCESS)
}

/// Evaluates the access guard for the stored session; true if access is granted.
fn check(store: &SessionStore, config: &CliConfig, sub: &ArgMatches) -> bool {
    let required = sub
        .get_one::<String>("role")
        .map_or(Role::Worker, |role| Role::from_wire(role));
    let guard = AccessGuard::new(required).with_login_path(config.login_path.as_str());

    let action = guard.decide(&store.current());
    println!("{action}");
    action == GuardAction::Render
}

fn required<'a>(sub: &'a ArgMatches, name: &'static str) -> Result<&'a str, Report<CliError>> {
    sub.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| CliError::MissingArgument { name }.into())
}

fn password(sub: &ArgMatches) -> Result<SecretString, Report<CliError>> {
    required(sub, "password").map(|p| SecretString::from(p.to_string()))
}

fn describe(session: &Session) -> String {
    let identity = session.identity();
    let company = identity
        .company_id()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    format!(
        "{} <{}> ({}, company {company})",
        identity.name(),
        identity.email(),
        session.role().label()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadfleet_access::{MemoryStorage, SessionStorage};

    fn matches(args: &[&str]) -> ArgMatches {
        crate::commands::new()
            .try_get_matches_from(args)
            .expect("parse")
    }

    #[test]
    fn flags_override_environment() {
        let matches = matches(&[
            "roadfleet",
            "whoami",
            "--api-url",
            "http://fleet:9000",
            "--timeout",
            "3",
            "--storage-dir",
            "/tmp/rf",
        ]);
        let (_, sub) = matches.subcommand().expect("subcommand");

        let config = configure(CliConfig::default(), sub);

        assert_eq!(config.api.base_url(), "http://fleet:9000");
        assert_eq!(config.api.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/rf"));
    }

    #[test]
    fn without_flags_config_is_untouched() {
        let matches = matches(&["roadfleet", "logout"]);
        let (_, sub) = matches.subcommand().expect("subcommand");

        let config = configure(CliConfig::default(), sub);

        assert_eq!(config.api.base_url(), "http://localhost:8000");
    }

    #[test]
    fn check_signed_out_fails() {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        store.load();
        let matches = matches(&["roadfleet", "check", "--role", "company_admin"]);
        let (_, sub) = matches.subcommand().expect("subcommand");

        assert!(!check(&store, &CliConfig::default(), sub));
    }

    #[test]
    fn file_storage_session_survives_between_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::open(dir.path()).expect("open");
        storage
            .set(roadfleet_access::store::TOKEN_KEY, "tok1")
            .expect("set token");
        storage
            .set(
                roadfleet_access::store::USER_KEY,
                r#"{"id":"1","email":"a@b.com","name":"A","role":"company_admin","company_id":"c1","created_at":"2024-02-01T09:00:00"}"#,
            )
            .expect("set user");

        let store = SessionStore::new(Arc::new(storage));
        let session = store.load().expect("session");
        assert_eq!(describe(&session), "A <a@b.com> (Administrador, company c1)");

        let matches = matches(&["roadfleet", "check", "--role", "worker"]);
        let (_, sub) = matches.subcommand().expect("subcommand");
        assert!(check(&store, &CliConfig::default(), sub));
    }
}
