mod app;
mod gemini;
mod input;
mod model;
mod prompt;
mod secret;
mod session;
mod text;
mod ui;
mod worker;

use crate::app::{AppState, Focus};
use crate::model::Sender;
use crate::ui::draw_ui;
use crate::worker::{spawn_session_worker, SessionCommand, SessionEvent};
use crossterm::cursor::Show;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::env;
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

type CommandTx = std::sync::mpsc::Sender<SessionCommand>;
type EventRx = std::sync::mpsc::Receiver<SessionEvent>;

const POLL_TIMEOUT: Duration = Duration::from_millis(50);
const MAX_EVENTS_PER_TICK: usize = 32;

const SESSION_INACTIVE_NOTICE: &str =
    "AI chat session is not active. Please check configuration.";
const WORKER_EXITED_BANNER: &str = "Internal error: session worker exited.";
const CONTEXT_UPDATED_NOTICE: &str =
    "CEO context updated. AI is re-initializing with new information...";

fn pick_api_key(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|key| !key.trim().is_empty())
        .or(fallback.filter(|key| !key.trim().is_empty()))
}

fn api_key_from_env() -> Option<String> {
    pick_api_key(env::var("GEMINI_API_KEY").ok(), env::var("API_KEY").ok())
}

/// Sends a command to the session worker; a dead worker becomes a banner
/// rather than a panic.
fn dispatch(app: &mut AppState, commands: &CommandTx, command: SessionCommand) {
    app.is_loading = true;
    if commands.send(command).is_err() {
        app.is_loading = false;
        app.banner = Some(WORKER_EXITED_BANNER.to_string());
    }
}

fn process_session_events(app: &mut AppState, events: &EventRx) -> bool {
    let mut changed = false;
    for _ in 0..MAX_EVENTS_PER_TICK {
        match events.try_recv() {
            Ok(event) => {
                app.apply_session_event(event);
                changed = true;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                // A dead worker can never answer an in-flight command.
                if app.banner.as_deref() != Some(WORKER_EXITED_BANNER) {
                    app.is_loading = false;
                    app.session_active = false;
                    app.banner = Some(WORKER_EXITED_BANNER.to_string());
                    changed = true;
                }
                break;
            }
        }
    }
    changed
}

fn submit_message(app: &mut AppState, commands: &CommandTx) -> bool {
    let text = app.input.current().trim().to_string();
    if text.is_empty() || app.is_loading {
        return false;
    }
    if !app.session_active {
        app.transcript.push(Sender::SystemNotice, SESSION_INACTIVE_NOTICE);
        return true;
    }
    app.transcript.push(Sender::User, text.clone());
    app.scroll_from_bottom = 0;
    app.input.record_history(&text);
    app.input.clear();
    dispatch(app, commands, SessionCommand::SendMessage { text });
    true
}

fn submit_context(app: &mut AppState, commands: &CommandTx) -> bool {
    if app.is_loading {
        return false;
    }
    let context = app.context_input.current();
    app.transcript.push(Sender::SystemNotice, CONTEXT_UPDATED_NOTICE);
    app.scroll_from_bottom = 0;
    dispatch(app, commands, SessionCommand::UpdateContext { context });
    true
}

fn handle_composer_key(app: &mut AppState, commands: &CommandTx, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.focus = Focus::Browse;
            app.detector.reset();
            true
        }
        KeyCode::Enter => submit_message(app, commands),
        KeyCode::Backspace => {
            app.input.backspace();
            true
        }
        KeyCode::Delete => {
            app.input.delete();
            true
        }
        KeyCode::Left => {
            app.input.move_left();
            true
        }
        KeyCode::Right => {
            app.input.move_right();
            true
        }
        KeyCode::Home => {
            app.input.move_home();
            true
        }
        KeyCode::End => {
            app.input.move_end();
            true
        }
        KeyCode::Up => {
            app.input.history_up();
            true
        }
        KeyCode::Down => {
            app.input.history_down();
            true
        }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.move_home();
            true
        }
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.move_end();
            true
        }
        KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.kill_to_end();
            true
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            // Typing in a text field resets any partial operator sequence.
            app.detector.observe(ch, true);
            app.input.insert_char(ch);
            true
        }
        _ => false,
    }
}

fn handle_browse_key(app: &mut AppState, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.focus = Focus::Composer;
            true
        }
        KeyCode::Up => {
            app.scroll_up(1);
            true
        }
        KeyCode::Down => {
            app.scroll_down(1);
            true
        }
        KeyCode::PageUp => {
            app.scroll_page_up();
            true
        }
        KeyCode::PageDown => {
            app.scroll_page_down();
            true
        }
        KeyCode::Char(ch) => {
            if app.detector.observe(ch, false) {
                app.toggle_operator_panel();
            }
            true
        }
        _ => false,
    }
}

fn handle_context_key(app: &mut AppState, commands: &CommandTx, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.focus = Focus::Composer;
            true
        }
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            app.context_input.insert_char('\n');
            true
        }
        KeyCode::Enter => submit_context(app, commands),
        KeyCode::Backspace => {
            app.context_input.backspace();
            true
        }
        KeyCode::Delete => {
            app.context_input.delete();
            true
        }
        KeyCode::Left => {
            app.context_input.move_left();
            true
        }
        KeyCode::Right => {
            app.context_input.move_right();
            true
        }
        KeyCode::Home => {
            app.context_input.move_home();
            true
        }
        KeyCode::End => {
            app.context_input.move_end();
            true
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.detector.observe(ch, true);
            app.context_input.insert_char(ch);
            true
        }
        _ => false,
    }
}

fn dispatch_key(app: &mut AppState, commands: &CommandTx, key: KeyEvent) -> bool {
    match app.focus {
        Focus::Composer => handle_composer_key(app, commands, key),
        Focus::Browse => handle_browse_key(app, key),
        Focus::ContextPanel => handle_context_key(app, commands, key),
    }
}

struct TerminalRestoreGuard;

impl Drop for TerminalRestoreGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = std::io::stdout();
        let _ = stdout.execute(LeaveAlternateScreen);
        let _ = stdout.execute(Show);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = api_key_from_env();
    let (commands, events) = spawn_session_worker();

    let _restore_guard = TerminalRestoreGuard;
    let mut stdout = std::io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = AppState::default();
    dispatch(&mut app, &commands, SessionCommand::Configure { api_key });

    let mut needs_redraw = true;
    loop {
        if process_session_events(&mut app, &events) {
            needs_redraw = true;
        }

        if event::poll(POLL_TIMEOUT)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        break;
                    }
                    if dispatch_key(&mut app, &commands, key) {
                        needs_redraw = true;
                    }
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }

        if app.update_spinner(Instant::now()) {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| draw_ui(f, &mut app))?;
            needs_redraw = false;
        }
    }

    Ok(())
}
