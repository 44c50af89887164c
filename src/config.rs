use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use thiserror::Error;

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub protocol_version: String,
    pub resource_directory: PathBuf,
    pub prompts_directory: PathBuf,
    pub capabilities: CapabilitiesConfig,
    /// Names of the tool sources to register; `None` registers every built-in source.
    pub tool_sources: Option<Vec<String>>,
    pub bind_addr: String,
    pub bind_port: u16,
    pub sse: SseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitiesConfig {
    pub resources: ResourcesCapability,
    pub tools: ToolsCapability,
    pub prompts: PromptsCapability,
    pub logging: bool,
    pub experimental: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcesCapability {
    pub enabled: bool,
    pub subscribe: bool,
    pub list_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolsCapability {
    pub enabled: bool,
    pub list_changed: bool,
    pub call: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptsCapability {
    pub enabled: bool,
    pub list_changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SseConfig {
    pub timeout: Duration,
    pub retry: Duration,
    pub interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a boolean (true/false, 1/0, yes/no, on/off)")]
    InvalidFlag(&'static str),
    #[error("{0} must be a non-negative integer")]
    InvalidNumber(&'static str),
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            resources: ResourcesCapability {
                enabled: true,
                subscribe: true,
                list_changed: true,
            },
            tools: ToolsCapability {
                enabled: true,
                list_changed: true,
                call: true,
            },
            prompts: PromptsCapability {
                enabled: true,
                list_changed: true,
            },
            logging: false,
            experimental: false,
        }
    }
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: Duration::from_millis(3000),
            interval: Duration::from_secs(10),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            resource_directory: PathBuf::from("storage/mcp_resources"),
            prompts_directory: PathBuf::from("storage/mcp_prompts"),
            capabilities: CapabilitiesConfig::default(),
            tool_sources: None,
            bind_addr: "127.0.0.1".to_string(),
            bind_port: 8080,
            sse: SseConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let flag = |key: &'static str, default: bool| -> Result<bool, ConfigError> {
            get(key)
                .map(|value| parse_flag(&value).ok_or(ConfigError::InvalidFlag(key)))
                .transpose()
                .map(|value| value.unwrap_or(default))
        };
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            get(key)
                .map(|value| {
                    value
                        .parse::<u64>()
                        .map_err(|_| ConfigError::InvalidNumber(key))
                })
                .transpose()
                .map(|value| value.unwrap_or(default))
        };

        let defaults = Self::default();
        let capabilities = CapabilitiesConfig {
            resources: ResourcesCapability {
                enabled: flag("MCP_CAPABILITY_RESOURCES", true)?,
                subscribe: flag("MCP_CAPABILITY_RESOURCES_SUBSCRIBE", true)?,
                list_changed: flag("MCP_CAPABILITY_RESOURCES_LIST_CHANGED", true)?,
            },
            tools: ToolsCapability {
                enabled: flag("MCP_CAPABILITY_TOOLS", true)?,
                list_changed: flag("MCP_CAPABILITY_TOOLS_LIST_CHANGED", true)?,
                call: flag("MCP_CAPABILITY_TOOLS_CALL", true)?,
            },
            prompts: PromptsCapability {
                enabled: flag("MCP_CAPABILITY_PROMPTS", true)?,
                list_changed: flag("MCP_CAPABILITY_PROMPTS_LIST_CHANGED", true)?,
            },
            logging: flag("MCP_CAPABILITY_LOGGING", false)?,
            experimental: flag("MCP_CAPABILITY_EXPERIMENTAL", false)?,
        };

        let bind_port = get("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(defaults.bind_port);

        let tool_sources = get("MCP_TOOL_SOURCES").map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        let config = Self {
            server_name: get("MCP_SERVER_NAME").unwrap_or(defaults.server_name),
            server_version: get("MCP_SERVER_VERSION").unwrap_or(defaults.server_version),
            protocol_version: get("MCP_PROTOCOL_VERSION").unwrap_or(defaults.protocol_version),
            resource_directory: get("MCP_RESOURCE_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.resource_directory),
            prompts_directory: get("MCP_PROMPTS_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_directory),
            capabilities,
            tool_sources,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            bind_port,
            sse: SseConfig {
                timeout: Duration::from_secs(number("MCP_SSE_TIMEOUT", 30)?),
                retry: Duration::from_millis(number("MCP_SSE_RETRY", 3000)?),
                interval: Duration::from_secs(number("MCP_SSE_INTERVAL", 10)?.max(1)),
            },
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
