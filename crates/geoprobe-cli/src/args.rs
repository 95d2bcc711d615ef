//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use geoprobe::ServiceConfig;
use geoprobe::config::{DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES};

/// Default depth the result tree is expanded to.
const DEFAULT_DEPTH: usize = 2;

#[derive(Parser, Debug)]
#[command(
    name = "geoprobe",
    version,
    about = "Run geospatial REST requests and inspect the responses"
)]
pub struct Cli {
    /// Prefix every request path is appended to.
    #[arg(long, env = "GEOPROBE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// API key sent as the `key` query parameter.
    #[arg(long, env = "GEOPROBE_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Resends allowed when the service asks to retry later.
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Per-attempt timeout in seconds (0 waits indefinitely).
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a JSON request and print the response tree.
    Fetch {
        /// Request path relative to the base URL, e.g. `Locations`.
        path: String,

        /// Query parameter, repeatable.
        #[arg(short = 'q', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Run a binary request (e.g. a static map) and save the bytes.
    Image {
        /// Request path relative to the base URL, e.g. `Imagery/Map/Road`.
        path: String,

        /// Query parameter, repeatable.
        #[arg(short = 'q', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// File to write the response body to.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the tree of a saved JSON response without any network access.
    Inspect {
        file: PathBuf,

        #[command(flatten)]
        tree: TreeArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct TreeArgs {
    /// Expand the tree this many levels deep.
    #[arg(long, default_value_t = DEFAULT_DEPTH)]
    pub depth: usize,

    /// Expand the whole tree.
    #[arg(long)]
    pub all: bool,
}

impl Cli {
    pub fn service_config(&self) -> ServiceConfig {
        let timeout = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));
        let config = ServiceConfig::default()
            .with_base_url(self.base_url.clone())
            .with_max_retries(self.max_retries)
            .with_timeout(timeout);

        match &self.key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }
}

/// Parse a `KEY=VALUE` query parameter. The value may itself contain `=`.
fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
