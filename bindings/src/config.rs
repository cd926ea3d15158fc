use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use lazy_static::lazy_static;
use serde::Deserialize;

use crate::Error;

pub const DEFAULT_CONFIG_FILE: &str = "yocki.toml";
pub const CONFIG_ENV_VAR: &str = "YOCKI_CONFIG";

/// Command line accepted by every plugin
#[derive(Debug, Clone, Default, Parser)]
#[command(about = "Serve plugin calls on the specified port")]
pub struct PluginArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host or address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// TOML file with plugin settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl PluginArgs {
    pub fn from_env() -> Self {
        Self::parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub host: String,
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 9090,
            timeout_ms: 1000,
        }
    }
}

impl PluginConfig {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let data = read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;

        toml::from_str(&data)
            .map_err(|err| Error::Config(format!("cannot parse {}: {err}", path.display())))
    }

    /// Flags win over the config file, which wins over the defaults. An
    /// explicitly given config file must exist; the default one is optional.
    pub fn load(args: &PluginArgs) -> Result<Self, Error> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(host) = &args.host {
            config.host = host.clone();
        }
        if let Some(port) = args.port {
            config.port = port;
        }

        Ok(config)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn parse_config_file(path: &Path) -> Result<toml::Table, String> {
    let data = read_to_string(path).map_err(|err| format!("{err}"))?;
    toml::from_str(&data).map_err(|err| format!("{err}"))
}

fn lookup(table: &toml::Table, key: &str) -> Result<String, Error> {
    match table.get(key) {
        Some(toml::Value::String(val)) => Ok(val.clone()),
        Some(val) => Ok(val.to_string()),
        None => Err(Error::Config(format!("No such config entry: {key}"))),
    }
}

/// Reads `key` from the plugin's config file (`$YOCKI_CONFIG` or
/// `yocki.toml`). The file is parsed on first use.
pub fn get_config_value(key: &str) -> Result<String, Error> {
    lazy_static! {
        static ref CONFIG: Result<toml::Table, String> = parse_config_file(&config_path());
    };

    match CONFIG.as_ref() {
        Ok(table) => lookup(table, key),
        Err(err) => Err(Error::Config(err.clone())),
    }
}
