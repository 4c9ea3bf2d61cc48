//! Background thread that owns the session manager and the operator context.
//!
//! The UI loop never blocks on the network: it dispatches a command, flips
//! its loading flag, and keeps rendering until the matching event arrives.
//! Every command produces exactly one event, so the loop can treat event
//! receipt as end-of-flight. The thread is the sole mutator of session
//! state; the UI loop is the sole mutator of the transcript.

use crate::prompt;
use crate::session::{ChatError, SessionManager};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

#[derive(Debug)]
pub enum SessionCommand {
    Configure { api_key: Option<String> },
    UpdateContext { context: String },
    SendMessage { text: String },
}

#[derive(Debug)]
pub enum SessionEvent {
    ConfigFailed { detail: String },
    SessionStarted { greeting: String },
    SessionStartFailed { detail: String },
    Reply { text: String },
    SendFailed { notice: String },
}

pub fn spawn_session_worker() -> (Sender<SessionCommand>, Receiver<SessionEvent>) {
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>();
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>();
    thread::spawn(move || run_worker(command_rx, event_tx));
    (command_tx, event_rx)
}

fn run_worker(commands: Receiver<SessionCommand>, events: Sender<SessionEvent>) {
    let mut manager = SessionManager::new();
    let mut operator_context = String::new();
    while let Ok(command) = commands.recv() {
        let event = handle_command(&mut manager, &mut operator_context, command);
        if events.send(event).is_err() {
            break;
        }
    }
}

fn handle_command(
    manager: &mut SessionManager,
    operator_context: &mut String,
    command: SessionCommand,
) -> SessionEvent {
    match command {
        SessionCommand::Configure { api_key } => {
            match manager.configure(api_key.as_deref()) {
                Ok(()) => start_with_context(manager, operator_context),
                Err(error) => SessionEvent::ConfigFailed {
                    detail: error.to_string(),
                },
            }
        }
        SessionCommand::UpdateContext { context } => {
            *operator_context = context;
            start_with_context(manager, operator_context)
        }
        SessionCommand::SendMessage { text } => match manager.send_message(&text) {
            Ok(text) => SessionEvent::Reply { text },
            Err(error) => SessionEvent::SendFailed {
                notice: notice_for(&error),
            },
        },
    }
}

/// Re-derives the system instruction from the latest operator context and
/// replaces the session. History is discarded on purpose: a changed
/// instruction invalidates prior grounding.
fn start_with_context(manager: &mut SessionManager, operator_context: &str) -> SessionEvent {
    let instruction = prompt::build_system_instruction(operator_context);
    match manager.start_session(&instruction) {
        Ok(()) => SessionEvent::SessionStarted {
            greeting: prompt::INITIAL_GREETING.to_string(),
        },
        Err(error) => SessionEvent::SessionStartFailed {
            detail: error.to_string(),
        },
    }
}

/// User-facing transcript text for a failed send.
fn notice_for(error: &ChatError) -> String {
    match error {
        ChatError::SessionInactive => {
            "AI chat session is not active. Please check configuration.".to_string()
        }
        ChatError::InvalidApiKey => {
            "Error: The provided API key is not valid. Please check your API key.".to_string()
        }
        other => format!("Error: {other}"),
    }
}
