// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Site configuration.
//!
//! Configuration is loaded from `pagewright.toml` at the project root.
//!
//! # Example Configuration
//!
//! ```toml
//! [project]
//! name = "my-site"
//!
//! [server]
//! port = 3000
//! host = "127.0.0.1"
//! context_path = ""
//! static_dir = "static"
//!
//! [routing]
//! templates_dir = "templates"
//! event_parameter = "event"
//! flash_capacity = 256
//!
//! [[page]]
//! name = "Layout"
//! decorated = true
//!
//! [[page]]
//! name = "UserPage"
//! uri = "/users/:id"
//! extends = "Layout"
//! model = { id = "", title = "User" }
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "pagewright.toml";

/// Main configuration structure loaded from `pagewright.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Project metadata.
    #[serde(default)]
    pub project: ProjectConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Routing and template settings.
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Page declarations, in registration order.
    #[serde(default, rename = "page")]
    pub pages: Vec<PageConfig>,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Project metadata configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Project version (default: "0.1.0").
    #[serde(default = "default_version")]
    pub version: String,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 3000).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Server host (default: "127.0.0.1").
    #[serde(default = "default_host")]
    pub host: String,
    /// Prefix the site is mounted under (default: root).
    #[serde(default)]
    pub context_path: String,
    /// Directory served under `/static` (default: "static").
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Allow cross-origin requests.
    #[serde(default)]
    pub cors: bool,
}

/// Routing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing page templates (default: "templates").
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,
    /// Request parameter that selects event handlers.
    #[serde(default)]
    pub event_parameter: Option<String>,
    /// Pending chained pages kept before eviction (default: 256).
    #[serde(default = "default_flash_capacity")]
    pub flash_capacity: usize,
}

/// One `[[page]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    /// Class name, unique within the site.
    pub name: String,
    /// URI template the page is reachable at.
    #[serde(default)]
    pub uri: Option<String>,
    /// Template file, relative to the templates directory (default: `<name>.html`).
    #[serde(default)]
    pub template: Option<String>,
    /// Name of the parent page class.
    #[serde(default)]
    pub extends: Option<String>,
    /// Marks the page as a layout for its subclasses.
    #[serde(default)]
    pub decorated: bool,
    /// Name the page is embeddable under.
    #[serde(default)]
    pub embed: Option<String>,
    /// Initial model.
    #[serde(default)]
    pub model: Value,
}

fn default_name() -> String {
    "unnamed".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_flash_capacity() -> usize {
    pagewright::flash::DEFAULT_FLASH_CAPACITY
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            context_path: String::new(),
            static_dir: default_static_dir(),
            cors: false,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            event_parameter: None,
            flash_capacity: default_flash_capacity(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or `pagewright.toml` in the current
    /// directory.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Config {
                        root: std::env::current_dir()?,
                        ..Config::default()
                    });
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", config_path.display(), e))?;
        let root = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        Self::parse(&content, root)
    }

    /// Parses configuration text, resolving relative paths against `root`.
    pub fn parse(content: &str, root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.root = root.into();
        config.server.context_path = config.server.context_path.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Absolute templates directory.
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(&self.routing.templates_dir)
    }

    /// Absolute static directory.
    pub fn static_dir(&self) -> PathBuf {
        self.root.join(&self.server.static_dir)
    }
}
