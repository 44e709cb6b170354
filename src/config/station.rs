use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default station to use
    #[serde(default = "default_station_id")]
    pub default_station: String,

    /// Available LLM stations
    #[serde(default)]
    pub stations: Vec<Station>,

    /// Agent identity and system instructions
    #[serde(default)]
    pub agent: AgentProfile,

    /// MCP tool servers to launch at session start.
    ///
    /// The field itself is required; an empty table means a text-only
    /// session with no tools attached.
    pub mcp_servers: BTreeMap<String, McpServerConfig>,

    /// Enable debug logging to a file
    #[serde(default)]
    pub debug: bool,

    /// Override the debug log file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_path: Option<String>,
}

impl Config {
    /// Resolve the station named by `default_station`.
    pub fn default_station(&self) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == self.default_station)
    }
}

/// A "station" represents one LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Unique identifier for this station
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Provider type
    pub provider: Provider,

    /// API key
    pub api_key: String,

    /// Optional custom API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Model identifier
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
}

/// Agent display name and system instructions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Fixed text steering the model's behavior (system prompt)
    #[serde(default)]
    pub instructions: String,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: String::new(),
        }
    }
}

/// Launch spec for a single MCP tool server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpServerConfig {
    /// Executable path or name
    pub command: String,

    /// Command-line arguments, in order
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_station_id() -> String {
    "claude".to_string()
}

fn default_agent_name() -> String {
    "Assistant".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_empty_server_table() {
        let config: Config = toml::from_str(
            r#"
            [mcp_servers]
            "#,
        )
        .unwrap();
        assert!(config.mcp_servers.is_empty());
        assert_eq!(config.agent.name, "Assistant");
        assert!(!config.debug);
    }

    #[test]
    fn missing_mcp_servers_field_is_an_error() {
        let result = toml::from_str::<Config>("default_station = \"claude\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn server_args_default_to_empty() {
        let config: Config = toml::from_str(
            r#"
            [mcp_servers.youtube]
            command = "yt-server"
            "#,
        )
        .unwrap();
        let server = &config.mcp_servers["youtube"];
        assert_eq!(server.command, "yt-server");
        assert!(server.args.is_empty());
    }

    #[test]
    fn server_without_command_is_an_error() {
        let result = toml::from_str::<Config>(
            r#"
            [mcp_servers.broken]
            args = ["--x"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn resolves_default_station() {
        let config: Config = toml::from_str(
            r#"
            default_station = "claude"

            [[stations]]
            id = "claude"
            name = "Claude"
            provider = "anthropic"
            api_key = "sk-test"
            model = "claude-3-5-sonnet-20241022"

            [mcp_servers]
            "#,
        )
        .unwrap();
        let station = config.default_station().unwrap();
        assert_eq!(station.model, "claude-3-5-sonnet-20241022");
    }
}
