//! Session teardown against a scripted tool server that would outlive
//! the session if nothing killed it.

#![cfg(unix)]

use std::fs;
use std::path::Path;

// One fake MCP server: records its pid, completes the handshake, then
// parks indefinitely so only an explicit close can end it.
const CONFIG: &str = r#"
default_station = "test"

[[stations]]
id = "test"
name = "Test"
provider = "anthropic"
api_key = "sk-none"
model = "claude-test"

[mcp_servers.sleeper]
command = "sh"
args = ["-c", '''
echo $$ > "$TOOLCHAT_TEST_PID_FILE"
read a; printf '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2025-06-18","capabilities":{}}}\n'
read a
read a; printf '{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}\n'
exec sleep 300
''']
"#;

#[tokio::test]
async fn launched_servers_are_closed_when_terminal_setup_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = dir.path().join("server.pid");
    let config_dir = dir.path().join("toolchat");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), CONFIG).unwrap();

    std::env::set_var("XDG_CONFIG_HOME", dir.path());
    std::env::set_var("TOOLCHAT_TEST_PID_FILE", &pid_file);

    // The test harness has no tty attached, so the session fails at
    // terminal setup, after the tool servers have already launched.
    let result = toolchat::cli::run().await;
    assert!(result.is_err(), "expected terminal setup to fail without a tty");

    let pid = fs::read_to_string(&pid_file)
        .expect("server never launched: pid file missing")
        .trim()
        .to_string();
    assert!(
        !Path::new(&format!("/proc/{pid}")).exists(),
        "tool server child survived session teardown: pid {pid}"
    );
}
