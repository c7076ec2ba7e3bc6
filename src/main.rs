use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use std::io::stdout;

mod chat;
mod config;
mod core;
mod desktop;
mod scores;
mod status;
mod ui;

use ui::Term;

// ── Terminal setup / teardown ─────────────────────────────────────────────────

fn init_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(ratatui::Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn run(terminal: &mut Term) -> Result<()> {
    config::reload_settings();
    config::reload_nickname();
    desktop::desktop_mode(terminal)
}

fn main() -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| run(&mut terminal)));

    // Always restore terminal
    restore_terminal(&mut terminal).ok();
    print!("{}", crossterm::terminal::Clear(crossterm::terminal::ClearType::All));

    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => {
            eprintln!("PLAYDESK crashed; your terminal has been restored.");
            Ok(())
        }
    }
}
