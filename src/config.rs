use crate::identity::DEFAULT_CREDENTIAL_KEY;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CREDENTIAL_FILE: &str = "scorecard-credentials.json";

/// Everything the core needs from its surroundings at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub credential_key: String,
    pub credential_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            credential_key: DEFAULT_CREDENTIAL_KEY.to_string(),
            credential_file: PathBuf::from(DEFAULT_CREDENTIAL_FILE),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Keep score for the latest round from the terminal")]
pub struct Cli {
    #[arg(long)]
    pub config_toml: Option<PathBuf>,
    /// Backend base url, e.g. http://192.168.5.34:3000
    #[arg(long)]
    pub base_url: Option<String>,
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    #[arg(long)]
    pub credential_file: Option<PathBuf>,
    #[arg(long)]
    pub credential_key: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the grid of the most recent scorecard
    Show {
        #[arg(long)]
        html: bool,
    },
    /// Set one hole score and wait until the server has it
    Set {
        /// 1-based row number as printed by `show`
        #[arg(long, conflicts_with = "player")]
        row: Option<usize>,
        #[arg(long)]
        player: Option<String>,
        #[arg(long)]
        hole: u32,
        value: String,
    },
    /// Start a new round; the signed-in user is always the first player
    Create {
        #[arg(long)]
        course: String,
        #[arg(long = "player")]
        players: Vec<String>,
        #[arg(long, default_value_t = 18)]
        holes: u32,
    },
    /// Store a session token as if signed in
    LoginToken { token: String },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    credential_file: Option<PathBuf>,
    credential_key: Option<String>,
}

/// Load config from CLI and optional TOML file. CLI values win over the file,
/// the file wins over defaults.
///
/// # Errors
/// Returns an error if the config file is unreadable or invalid, the base url
/// is not an absolute http(s) url, or the timeout is zero.
pub fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let file_config = match cli.config_toml.as_ref() {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read config toml {}", path.display()))?;
            toml::from_str::<FileConfig>(&contents)
                .with_context(|| format!("parse config toml {}", path.display()))?
        }
        None => FileConfig::default(),
    };
    let defaults = ClientConfig::default();

    let base_url = cli
        .base_url
        .clone()
        .or(file_config.base_url)
        .unwrap_or(defaults.base_url);
    let parsed = reqwest::Url::parse(&base_url).with_context(|| format!("parse base url {base_url}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("base url must use http or https: {base_url}"));
    }

    let timeout_secs = cli
        .timeout_secs
        .or(file_config.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(anyhow!("timeout must be at least one second"));
    }

    Ok(ClientConfig {
        base_url,
        request_timeout: Duration::from_secs(timeout_secs),
        credential_key: cli
            .credential_key
            .clone()
            .or(file_config.credential_key)
            .unwrap_or(defaults.credential_key),
        credential_file: cli
            .credential_file
            .clone()
            .or(file_config.credential_file)
            .unwrap_or(defaults.credential_file),
    })
}
