//! Terminal dashboard and diagnostic tool for Canterbury bin collections.

mod app;
mod cli;
mod input;
mod logging;
mod ui;

use std::io::{self, Write};
use std::time::Duration as StdDuration;

use anyhow::Result;
use binday_core::{config::BindayConfig, entity::EntityRegistry, normalize::normalize, ports::CollectionPort};
use binday_provider_canterbury::CanterburyCollectionPort;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::App;
use crate::cli::{Args, Command};
use crate::input::Action;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = cli::load_config(&args)?;

    match args.command.unwrap_or_default() {
        Command::Watch => {
            logging::to_file(&args.log_file)?;
            watch(config).await
        }
        Command::Dump => {
            logging::to_stderr();
            dump(&config).await
        }
    }
}

async fn watch(config: BindayConfig) -> Result<()> {
    // Setup fails here, before the terminal is taken over, on bad config or a failed first fetch.
    let property = config.validate()?;
    let coordinator = binday_provider_canterbury::initialize(&config).await?;
    let mut app = App::new(coordinator, property);

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    app.shutdown().await;
    info!("dashboard closed");
    res
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // The cache is pulled on every frame, so refreshes show up without extra wiring.
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(StdDuration::from_millis(250))?
            && let CEvent::Key(key) = event::read()?
            && input::handle_key_event(key, app) == Action::Quit
        {
            break;
        }
    }

    Ok(())
}

/// One fetch through the same normalizer the coordinator uses, printed for inspection.
async fn dump(config: &BindayConfig) -> Result<()> {
    let port = CanterburyCollectionPort::new(config)?;
    let body = port.fetch().await?;
    let result = normalize(&body);

    let registry = EntityRegistry::new();
    let today = App::today();

    let mut out = io::stdout().lock();
    writeln!(out, "Raw API response:")?;
    serde_json::to_writer_pretty(&mut out, &body)?;
    writeln!(out, "\n\nNormalized result:")?;
    serde_json::to_writer_pretty(&mut out, &result)?;
    writeln!(out, "\n\nEntities:")?;

    for entity in registry.entities_iter() {
        let state = registry.state(entity, Some(&result), today);
        writeln!(
            out,
            "{} [{}] ({}): {}",
            entity.name,
            entity.unique_id,
            entity.icon,
            state.value.as_deref().unwrap_or("unknown")
        )?;
        for (key, value) in &state.attributes {
            writeln!(out, "    {key}: {value}")?;
        }
    }
    out.flush()?;
    Ok(())
}
