// Configuration management for tgw-path-walker
// Supports CLI arguments, config file (TOML), and environment variables

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::error::{RetryConfig, RouterError, RouterResult};

/// tgw-path-walker - Resolve routes and walk packet paths across Transit Gateways
#[derive(Parser, Debug, Clone)]
#[command(name = "tgw-path-walker")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, global = true, env = "TGW_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "TGW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Topology JSON file to read gateways, routes and attachments from
    #[arg(short, long, global = true, env = "TGW_TOPOLOGY")]
    pub topology: Option<PathBuf>,

    /// Read gateways from the last `sync` snapshot instead of a topology file
    #[arg(long, global = true, env = "TGW_OFFLINE")]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print every route table of the selected gateways
    Routes {
        /// Gateway id to include (repeatable, default: all)
        #[arg(short, long = "gateway")]
        gateways: Vec<String>,
    },
    /// Walk the path from SRC to DST through each selected gateway
    Path {
        src: IpAddr,
        dst: IpAddr,
        /// Gateway id to include (repeatable, default: all)
        #[arg(short, long = "gateway")]
        gateways: Vec<String>,
    },
    /// Fetch every gateway and save a snapshot to the data directory
    Sync,
}

/// Configuration file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Topology source settings
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Retry settings for source calls
    #[serde(default)]
    pub retry: RetrySection,

    /// Snapshot storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TopologyConfig {
    /// Topology JSON file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory snapshots are written to
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Snapshot name, stored as `<db_name>_tgw.json`
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_db_name() -> String {
    "default".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl From<RetrySection> for RetryConfig {
    fn from(section: RetrySection) -> Self {
        RetryConfig {
            max_attempts: section.max_attempts,
            initial_delay_ms: section.initial_delay_ms,
            max_delay_ms: section.max_delay_ms,
            backoff_multiplier: section.backoff_multiplier,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: default_data_dir(),
            db_name: default_db_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl ConfigFile {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        tracing::info!("Loading configuration from: {}", path.display());
        let config_content = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<ConfigFile>(&config_content)?)
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: Level,
    pub topology_file: Option<PathBuf>,
    pub offline: bool,
    pub retry: RetryConfig,
    pub data_dir: PathBuf,
    pub db_name: String,
    pub command: Command,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args > Environment variables > Config file > Defaults
    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli_args: CliArgs) -> anyhow::Result<Self> {
        let config_file = if let Some(config_path) = &cli_args.config {
            ConfigFile::from_path(config_path)?
        } else {
            // Try loading from default locations
            let default_paths = vec![
                PathBuf::from("tgw-path-walker.toml"),
                PathBuf::from("config.toml"),
            ];

            let mut loaded_config = None;
            for path in default_paths {
                if path.exists() {
                    loaded_config = Some(ConfigFile::from_path(&path)?);
                    break;
                }
            }

            loaded_config.unwrap_or_default()
        };

        Self::merge(cli_args, config_file)
    }

    /// CLI args override the config file.
    pub fn merge(cli_args: CliArgs, config_file: ConfigFile) -> anyhow::Result<Self> {
        let log_level = parse_log_level(
            cli_args
                .log_level
                .as_deref()
                .unwrap_or(&config_file.logging.level),
        )?;

        let topology_file = cli_args.topology.or(config_file.topology.file);
        if topology_file.is_none() && !cli_args.offline {
            return Err(RouterError::Config(
                "no topology file given: use --topology, TGW_TOPOLOGY, [topology] file or --offline"
                    .to_string(),
            )
            .into());
        }
        if cli_args.offline && cli_args.command == Command::Sync {
            return Err(RouterError::Config("sync needs a topology file, not --offline".to_string()).into());
        }

        Ok(Config {
            log_level,
            topology_file,
            offline: cli_args.offline,
            retry: config_file.retry.into(),
            data_dir: config_file.storage.data_dir,
            db_name: config_file.storage.db_name,
            command: cli_args.command,
        })
    }
}

fn parse_log_level(level_str: &str) -> RouterResult<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(RouterError::Config(format!("invalid log level: {}", level_str))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.storage.db_name, "default");
        assert_eq!(config.logging.level, "info");
        assert!(config.topology.file.is_none());
    }

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("DEBUG"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("invalid"), Err(RouterError::Config(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ConfigFile = toml::from_str(
            r#"
            [topology]
            file = "topology.json"

            [retry]
            max_attempts = 5

            [storage]
            db_name = "prod"
            "#,
        )
        .unwrap();
        assert_eq!(config.topology.file, Some(PathBuf::from("topology.json")));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 100);
        assert_eq!(config.storage.db_name, "prod");
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn test_path_subcommand() {
        let cli = args(&[
            "tgw-path-walker",
            "--topology",
            "t.json",
            "path",
            "10.0.0.1",
            "10.1.0.1",
            "--gateway",
            "tgw-1",
            "-g",
            "tgw-2",
        ]);
        assert_eq!(
            cli.command,
            Command::Path {
                src: "10.0.0.1".parse().unwrap(),
                dst: "10.1.0.1".parse().unwrap(),
                gateways: vec!["tgw-1".to_string(), "tgw-2".to_string()],
            }
        );
        assert!(CliArgs::try_parse_from(["tgw-path-walker", "path", "nope", "10.0.0.1"]).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = ConfigFile::default();
        file.topology.file = Some(PathBuf::from("from-file.json"));
        file.logging.level = "warn".to_string();

        let cli = args(&["tgw-path-walker", "--topology", "from-cli.json", "-l", "debug", "sync"]);
        let config = Config::merge(cli, file.clone()).unwrap();
        assert_eq!(config.topology_file, Some(PathBuf::from("from-cli.json")));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.command, Command::Sync);

        let cli = args(&["tgw-path-walker", "routes"]);
        let config = Config::merge(cli, file).unwrap();
        assert_eq!(config.topology_file, Some(PathBuf::from("from-file.json")));
        assert_eq!(config.log_level, Level::WARN);
        assert_eq!(config.retry.max_delay_ms, 5000);
    }

    #[test]
    fn test_missing_topology() {
        let cli = args(&["tgw-path-walker", "sync"]);
        let err = Config::merge(cli, ConfigFile::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<RouterError>(), Some(RouterError::Config(_))));
    }

    #[test]
    fn test_offline_needs_no_topology() {
        let cli = args(&["tgw-path-walker", "routes", "--offline"]);
        let config = Config::merge(cli, ConfigFile::default()).unwrap();
        assert!(config.offline);
        assert!(config.topology_file.is_none());

        let cli = args(&["tgw-path-walker", "--offline", "sync"]);
        assert!(Config::merge(cli, ConfigFile::default()).is_err());
    }

    #[test]
    fn test_config_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tgw-path-walker.toml");
        std::fs::write(&path, "[logging]\nlevel = \"trace\"\n").unwrap();
        let config = ConfigFile::from_path(&path).unwrap();
        assert_eq!(config.logging.level, "trace");
    }
}
