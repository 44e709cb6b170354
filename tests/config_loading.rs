use tempfile::TempDir;
use toolchat::config::{load_config_from, ConfigError};

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write test config");
    path
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn invalid_structure_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "this is not = [valid");

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn missing_mcp_servers_field_fails_fast() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "default_station = \"claude\"\n");

    let err = load_config_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn loads_search_server_launch_spec() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [mcp_servers.search]
        command = "search-server"
        args = ["--mode", "fast"]
        "#,
    );

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.mcp_servers.len(), 1);

    let search = &config.mcp_servers["search"];
    assert_eq!(search.command, "search-server");
    assert_eq!(search.args, vec!["--mode", "fast"]);
}

#[test]
fn empty_server_table_is_valid() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[mcp_servers]\n");

    let config = load_config_from(&path).unwrap();
    assert!(config.mcp_servers.is_empty());
}

#[test]
fn servers_iterate_in_name_order() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [mcp_servers.zeta]
        command = "z-server"

        [mcp_servers.alpha]
        command = "a-server"
        "#,
    );

    let config = load_config_from(&path).unwrap();
    let names: Vec<&String> = config.mcp_servers.keys().collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn full_config_round_trips_agent_and_station() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        default_station = "claude"
        debug = true

        [[stations]]
        id = "claude"
        name = "Claude"
        provider = "anthropic"
        api_key = "sk-test"
        model = "claude-3-5-sonnet-20241022"
        max_tokens = 4096

        [agent]
        name = "Researcher"
        instructions = "You help with research."

        [mcp_servers]
        "#,
    );

    let config = load_config_from(&path).unwrap();
    assert!(config.debug);
    assert_eq!(config.agent.name, "Researcher");
    assert_eq!(config.agent.instructions, "You help with research.");

    let station = config.default_station().unwrap();
    assert_eq!(station.max_tokens, Some(4096));
}
