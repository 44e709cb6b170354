use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[allow(dead_code)]
pub struct LogGuard(tracing_appender::non_blocking::WorkerGuard);

/// Initialize debug logging.
///
/// When `debug` is enabled, logs are written to
/// `~/.config/toolchat/toolchat-debug.log` by default. When `debug` is
/// disabled, this is a no-op. Stdout is never used for logs: the TUI owns
/// the terminal.
pub fn init(config: &crate::config::Config) -> Result<Option<LogGuard>> {
    if !config.debug {
        return Ok(None);
    }

    let log_path = resolve_log_path(config.debug_log_path.as_deref())?;
    ensure_parent_dir(&log_path)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(file);

    // Default: debug our crate, warn for everything else.
    let filter =
        EnvFilter::try_new("toolchat=debug,warn").unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .ok(); // If already initialized (e.g., in tests), don't crash.

    tracing::info!(log_file = %log_path.display(), "debug logging enabled");

    Ok(Some(LogGuard(guard)))
}

fn default_log_path() -> Result<PathBuf> {
    let config_path = crate::config::config_path()?;
    Ok(config_path.with_file_name("toolchat-debug.log"))
}

fn resolve_log_path(config_value: Option<&str>) -> Result<PathBuf> {
    let Some(raw) = config_value else {
        return default_log_path();
    };

    let expanded = expand_tilde(raw);
    let path = PathBuf::from(expanded);

    // A trailing separator or an existing directory means: put the default
    // file name inside it.
    if raw.ends_with(std::path::MAIN_SEPARATOR) || path.is_dir() {
        return Ok(path.join("toolchat-debug.log"));
    }

    Ok(path)
}

fn expand_tilde(raw: &str) -> String {
    if raw == "~" || raw.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            let suffix = raw.strip_prefix('~').unwrap_or("");
            return format!("{}{}", home.display(), suffix);
        }
    }
    raw.to_string()
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Best-effort redaction for common API key patterns (e.g. `sk-...`).
pub fn redact_secrets(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut last = 0usize;
    let mut i = 0usize;

    while i < input.len() {
        if input[i..].starts_with("sk-") && i + 3 < input.len() {
            let mut j = i + 3;
            while j < input.len() {
                match bytes[j] {
                    b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => j += 1,
                    _ => break,
                }
            }

            // Require a minimum length to reduce false positives.
            if j.saturating_sub(i + 3) >= 8 {
                out.push_str(&input[last..i]);
                out.push_str("sk-***REDACTED***");
                last = j;
                i = j;
                continue;
            }
        }

        let ch = input[i..].chars().next().unwrap();
        i += ch.len_utf8();
    }

    out.push_str(&input[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::redact_secrets;

    #[test]
    fn redacts_long_api_keys() {
        let input = "key sk-abcdefgh1234 in payload";
        assert_eq!(redact_secrets(input), "key sk-***REDACTED*** in payload");
    }

    #[test]
    fn leaves_short_prefixes_alone() {
        let input = "sk-123 is not a key";
        assert_eq!(redact_secrets(input), input);
    }
}
