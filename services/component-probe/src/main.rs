//! Component probe
//!
//! Operator CLI for a WeChat third-party platform deployment:
//! 1. Loads platform identity and collaborator paths from TOML
//! 2. Reads the verify ticket from the file the push receiver maintains
//! 3. Caches the platform token in a local JSON file between runs
//! 4. Runs one remote operation and prints the JSON result to stdout

mod config;
mod error;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use component_auth::{ApiClient, AppIdentity, ComponentAuth, FileStore, FileTicket};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const USAGE: &str = "usage: component-probe [--config <path>] <command>

commands:
  token                                  show the platform token expiry (mints if needed)
  pre-auth-code [redirect_uri]           create a pre-auth code (and login page URL)
  query-auth <auth_code>                 exchange an authorization code
  authorizer-info <authorizer_appid>     fetch authorizer account info
  oauth-url <appid> <redirect_uri> [scope]   build a web-login URL with a random state";

/// One probe invocation.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Token,
    PreAuthCode { redirect_uri: Option<String> },
    QueryAuth { auth_code: String },
    AuthorizerInfo { authorizer_appid: String },
    OAuthUrl {
        appid: String,
        redirect_uri: String,
        scope: Option<String>,
    },
}

/// Split `--config <path>` from the remaining positional arguments.
fn split_config_flag(args: &[String]) -> (Option<String>, Vec<String>) {
    let mut config = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            config = iter.next().cloned();
        } else {
            rest.push(arg.clone());
        }
    }
    (config, rest)
}

fn parse_command(args: &[String]) -> Result<Command> {
    let arg = |i: usize, what: &str| {
        args.get(i)
            .cloned()
            .with_context(|| format!("missing {what}\n\n{USAGE}"))
    };

    match args.first().map(String::as_str) {
        Some("token") => Ok(Command::Token),
        Some("pre-auth-code") => Ok(Command::PreAuthCode {
            redirect_uri: args.get(1).cloned(),
        }),
        Some("query-auth") => Ok(Command::QueryAuth {
            auth_code: arg(1, "<auth_code>")?,
        }),
        Some("authorizer-info") => Ok(Command::AuthorizerInfo {
            authorizer_appid: arg(1, "<authorizer_appid>")?,
        }),
        Some("oauth-url") => Ok(Command::OAuthUrl {
            appid: arg(1, "<appid>")?,
            redirect_uri: arg(2, "<redirect_uri>")?,
            scope: args.get(3).cloned(),
        }),
        Some(other) => anyhow::bail!("unknown command: {other}\n\n{USAGE}"),
        None => anyhow::bail!("{USAGE}"),
    }
}

fn build_auth(config: &Config) -> Result<ComponentAuth> {
    let secret = config
        .component
        .appsecret
        .clone()
        .context("app secret not resolved")?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    Ok(ComponentAuth::new(
        AppIdentity::new(config.component.appid.clone(), secret),
        ApiClient::with_base_url(http, config.http.api_base.clone()),
        Arc::new(FileTicket::new(&config.component.verify_ticket_file)),
        Arc::new(FileStore::new(&config.component.token_file)),
    ))
}

async fn run(auth: &ComponentAuth, command: Command) -> Result<serde_json::Value> {
    let output = match command {
        Command::Token => {
            let token = auth.latest_token().await?;
            serde_json::json!({
                "expires_at": token.expires_at(),
                "valid": token.is_valid(),
            })
        }
        Command::PreAuthCode { redirect_uri } => {
            let code = auth.pre_auth_code().await?;
            let login_page = redirect_uri
                .map(|redirect| auth.login_page_url(&code.pre_auth_code, &redirect));
            serde_json::json!({
                "pre_auth_code": code.pre_auth_code,
                "expires_in": code.expires_in,
                "login_page_url": login_page,
            })
        }
        Command::QueryAuth { auth_code } => {
            serde_json::to_value(auth.query_auth(&auth_code).await?)?
        }
        Command::AuthorizerInfo { authorizer_appid } => {
            auth.authorizer_info(&authorizer_appid).await?
        }
        Command::OAuthUrl {
            appid,
            redirect_uri,
            scope,
        } => {
            let state = uuid::Uuid::new_v4().simple().to_string();
            let url = auth.oauth_url(&appid, &redirect_uri, &state, scope.as_deref());
            serde_json::json!({ "url": url, "state": state })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (cli_config_path, positional) = split_config_flag(&args);
    let command = parse_command(&positional)?;

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        appid = %config.component.appid,
        api_base = %config.http.api_base,
        token_file = %config.component.token_file.display(),
        "configuration loaded"
    );

    let auth = build_auth(&config)?;
    let output = run(&auth, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
