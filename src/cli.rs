use crate::agent::Agent;
use crate::config;
use crate::event::Event;
use crate::llm::anthropic::AnthropicClient;
use crate::mcp;
use crate::tui::App;
use anyhow::{Context, Result};
use crossterm::{
    event::{self as term_event, Event as CtEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

type Tui = Terminal<CrosstermBackend<Stdout>>;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run one chat session: load config, launch tool servers, drive the TUI,
/// and tear everything down on exit.
pub async fn run() -> Result<()> {
    let config = config::load_config().context(
        "Could not load configuration. Create ~/.config/toolchat/config.toml \
         with at least one [[stations]] entry and an [mcp_servers] table.",
    )?;

    let _log_guard = crate::logging::init(&config)?;

    let station = config
        .default_station()
        .ok_or_else(|| config::ConfigError::UnknownStation(config.default_station.clone()))?
        .clone();

    // Tool servers are launched once for the whole session and closed once
    // at teardown. A single launch failure aborts the session.
    let servers = Arc::new(mcp::launch_all(&config.mcp_servers).await?);
    let tool_count: usize = servers.iter().map(|s| s.tools().len()).sum();
    tracing::info!(
        servers = servers.len(),
        tools = tool_count,
        model = %station.model,
        "session ready"
    );

    let agent = Agent::new(
        config.agent.clone(),
        AnthropicClient::new(station),
        servers.clone(),
    );
    let mut app = App::new(agent, tool_count);

    // Tool servers are released on every exit path, including a failed
    // terminal setup.
    let result = run_session(&mut app).await;
    mcp::close_all(&servers).await;

    result
}

async fn run_session(app: &mut App) -> Result<()> {
    let mut terminal = init_terminal()?;
    let result = run_loop(&mut terminal, app).await;

    if let Err(err) = restore_terminal() {
        tracing::warn!(%err, "failed to restore terminal");
    }

    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    while !app.should_quit() {
        app.poll_agent_events();
        app.tick();

        terminal.draw(|frame| app.render(frame))?;

        if term_event::poll(POLL_INTERVAL)? {
            match term_event::read()? {
                CtEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_event(Event::Key(key))?;
                }
                CtEvent::Mouse(mouse) => {
                    app.handle_event(Event::Mouse(mouse))?;
                }
                CtEvent::Resize(w, h) => {
                    app.handle_event(Event::Resize(w, h))?;
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}
