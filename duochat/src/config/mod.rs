//! Configuration for the `duochat` client.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/duochat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

pub mod prefs;

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::net::NetConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a configuration file.
    #[error("failed to write config file {path}: {source}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Failed to serialize preferences.
    #[error("failed to serialize preferences: {0}")]
    SerializeToml(#[from] toml::ser::Error),

    /// The server URL does not parse.
    #[error("invalid server url {url:?}: {source}")]
    InvalidUrl {
        /// The configured value.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The server URL scheme has no WebSocket counterpart.
    #[error("unsupported url scheme {0:?} (expected http, https, ws or wss)")]
    UnsupportedScheme(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    chat: ChatFileConfig,
    ui: UiFileConfig,
    files: FilesFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    socket_path: Option<String>,
    upload_path: Option<String>,
    connect_timeout_secs: Option<u64>,
    channel_capacity: Option<usize>,
}

/// `[chat]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ChatFileConfig {
    typing_idle_ms: Option<u64>,
    display_name: Option<String>,
}

/// `[ui]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
    timestamp_format: Option<String>,
}

/// `[files]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct FilesFileConfig {
    download_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Server --
    /// Base URL of the chat server (`http(s)://` or `ws(s)://`).
    pub server_url: String,
    /// Path of the WebSocket endpoint.
    pub socket_path: String,
    /// Path of the multipart upload endpoint.
    pub upload_path: String,
    /// Timeout for the WebSocket connect and handshake.
    pub connect_timeout: Duration,
    /// Capacity of the networking channels.
    pub channel_capacity: usize,

    // -- Chat --
    /// Idle window before `typing=false` is sent.
    pub typing_idle: Duration,
    /// Display name to prefill, if any.
    pub display_name: Option<String>,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,

    // -- Files --
    /// Where downloads are written.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".to_string(),
            socket_path: "/ws".to_string(),
            upload_path: "/upload".to_string(),
            connect_timeout: Duration::from_secs(10),
            channel_capacity: 256,
            typing_idle: Duration::from_millis(2000),
            display_name: None,
            poll_timeout: Duration::from_millis(50),
            timestamp_format: "%H:%M".to_string(),
            download_dir: default_download_dir(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or any config file cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve from CLI args and a parsed config file. CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.server.url.clone())
                .unwrap_or(defaults.server_url),
            socket_path: file
                .server
                .socket_path
                .clone()
                .unwrap_or(defaults.socket_path),
            upload_path: file
                .server
                .upload_path
                .clone()
                .unwrap_or(defaults.upload_path),
            connect_timeout: file
                .server
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            channel_capacity: file
                .server
                .channel_capacity
                .unwrap_or(defaults.channel_capacity),
            typing_idle: file
                .chat
                .typing_idle_ms
                .map_or(defaults.typing_idle, Duration::from_millis),
            display_name: cli
                .name
                .clone()
                .or_else(|| file.chat.display_name.clone()),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or_else(|| file.ui.timestamp_format.clone())
                .unwrap_or(defaults.timestamp_format),
            download_dir: cli
                .download_dir
                .clone()
                .or_else(|| file.files.download_dir.clone())
                .unwrap_or(defaults.download_dir),
        }
    }

    /// Base URL for HTTP requests (uploads and downloads).
    ///
    /// A `ws`/`wss` server URL is mapped to `http`/`https`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] or
    /// [`ConfigError::UnsupportedScheme`].
    pub fn http_base(&self) -> Result<Url, ConfigError> {
        self.server_with_scheme(|scheme| match scheme {
            "http" | "ws" => Some("http"),
            "https" | "wss" => Some("https"),
            _ => None,
        })
    }

    /// WebSocket URL of the chat endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] or
    /// [`ConfigError::UnsupportedScheme`].
    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        let base = self.server_with_scheme(|scheme| match scheme {
            "http" | "ws" => Some("ws"),
            "https" | "wss" => Some("wss"),
            _ => None,
        })?;
        join_path(&base, &self.socket_path)
    }

    /// Multipart upload endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] or
    /// [`ConfigError::UnsupportedScheme`].
    pub fn upload_url(&self) -> Result<Url, ConfigError> {
        join_path(&self.http_base()?, &self.upload_path)
    }

    /// Build a [`NetConfig`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the server URL is unusable.
    pub fn to_net_config(&self) -> Result<NetConfig, ConfigError> {
        let mut net = NetConfig::new(
            self.socket_url()?.to_string(),
            self.upload_url()?,
            self.download_dir.clone(),
        );
        net.connect_timeout = self.connect_timeout;
        net.channel_capacity = self.channel_capacity;
        Ok(net)
    }

    fn server_with_scheme(
        &self,
        map: impl Fn(&str) -> Option<&'static str>,
    ) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.server_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.server_url.clone(),
            source,
        })?;
        let scheme = map(url.scheme())
            .ok_or_else(|| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(url.scheme().to_string()))?;
        Ok(url)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal client for two-person and group chat rooms")]
pub struct CliArgs {
    /// Base URL of the chat server.
    #[arg(long, env = "DUOCHAT_SERVER_URL")]
    pub server_url: Option<String>,

    /// Display name to use.
    #[arg(long, env = "DUOCHAT_NAME")]
    pub name: Option<String>,

    /// Path to config file (default: `~/.config/duochat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory downloaded files are saved to.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "DUOCHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/duochat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Directory holding `config.toml` and `prefs.toml`.
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("duochat"))
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(std::env::temp_dir)
}

fn join_path(base: &Url, path: &str) -> Result<Url, ConfigError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl {
        url: joined,
        source,
    })
}

/// Load and parse a TOML config file.
///
/// An explicit path must exist. Without one, the default path is tried and
/// a missing file is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(dir) = config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = dir.join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
