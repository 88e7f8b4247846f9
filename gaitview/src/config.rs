//! User configuration: `$XDG_CONFIG_HOME/gaitview/config.toml` merged with
//! command-line overrides.

use clap::Parser;
use gaitview_core::engine::EngineConfig;
use gaitview_core::expansion::DEFAULT_GC_MIN_LOADED;
use gaitview_core::feed::DEFAULT_PAGE_LIMIT;
use gaitview_core::reconcile::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

/// Terminal client for a gait repository server.
#[derive(Debug, Parser)]
#[command(name = "gaitview", version, about)]
pub struct Cli {
    /// Base URL of the gait server.
    #[arg(long)]
    pub server: Option<String>,
    /// Config file to read instead of the XDG default.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Commits fetched per page.
    #[arg(long)]
    pub page_limit: Option<usize>,
    /// Skip the server-rendered commit listing and page through JSON only.
    #[arg(long)]
    pub no_markup: bool,
    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: String,
    pub page_limit: usize,
    pub prefer_markup: bool,
    pub gc_min_loaded: usize,
    pub reconnect_secs: u64,
    pub theme: String,
    pub state_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            page_limit: DEFAULT_PAGE_LIMIT,
            prefer_markup: true,
            gc_min_loaded: DEFAULT_GC_MIN_LOADED,
            reconnect_secs: 5,
            theme: "catppuccin-mocha".to_owned(),
            state_dir: PathBuf::from(".gaitview"),
        }
    }
}

impl Config {
    /// Parses a config file body. Unknown keys are ignored, missing ones
    /// take their defaults.
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Reads `path`, falling back to defaults when the file is missing or
    /// malformed. Returns the warning to log once logging is up.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return (Self::default(), None),
        };
        match Self::parse(&raw) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(format!("config parse error in {path:?}: {e}"))),
        }
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server = server.clone();
        }
        if let Some(limit) = cli.page_limit {
            self.page_limit = limit;
        }
        if cli.no_markup {
            self.prefer_markup = false;
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            page_limit: self.page_limit.max(1),
            prefer_markup: self.prefer_markup,
            gc_min_loaded: self.gc_min_loaded,
            reconnect: ReconnectPolicy::fixed(Duration::from_secs(self.reconnect_secs.max(1))),
            ..EngineConfig::default()
        }
    }

    /// WebSocket URL of the live dashboard channel derived from `server`.
    pub fn live_url(&self) -> String {
        let base = self.server.trim_end_matches('/');
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        };
        format!("{ws}/ws/dashboard")
    }
}

/// `$XDG_CONFIG_HOME/gaitview/config.toml`, or `~/.config/gaitview/config.toml`.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("gaitview").join("config.toml")
}
