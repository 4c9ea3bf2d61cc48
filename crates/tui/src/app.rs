use crate::input::InputState;
use crate::model::{Sender, Transcript};
use crate::secret::SequenceDetector;
use crate::worker::SessionEvent;
use std::time::{Duration, Instant};

/// Where keystrokes go. `Composer` and `ContextPanel` are text-entry
/// focuses; the sequence detector only runs in `Browse`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Browse,
    ContextPanel,
}

impl Focus {
    pub fn is_text_entry(self) -> bool {
        matches!(self, Focus::Composer | Focus::ContextPanel)
    }
}

pub struct AppState {
    pub transcript: Transcript,
    pub input: InputState,
    pub context_input: InputState,
    pub focus: Focus,
    pub detector: SequenceDetector,
    pub operator_panel_visible: bool,
    /// Persistent error banner for config/session-start failures.
    pub banner: Option<String>,
    /// One command in flight at a time; submissions are refused while set.
    pub is_loading: bool,
    pub session_active: bool,
    pub scroll_from_bottom: usize,
    pub spinner_index: usize,
    pub spinner_last_tick: Instant,
    pub last_transcript_height: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            transcript: Transcript::default(),
            input: InputState::default(),
            context_input: InputState::default(),
            focus: Focus::Composer,
            detector: SequenceDetector::default(),
            operator_panel_visible: false,
            banner: None,
            is_loading: false,
            session_active: false,
            scroll_from_bottom: 0,
            spinner_index: 0,
            spinner_last_tick: Instant::now(),
            last_transcript_height: 0,
        }
    }
}

impl AppState {
    /// Folds a worker event into UI state. This is the only place the
    /// assistant greeting and error notices enter the transcript, which
    /// keeps the "exactly one greeting per session start" rule in one spot.
    pub fn apply_session_event(&mut self, event: SessionEvent) {
        self.is_loading = false;
        match event {
            SessionEvent::SessionStarted { greeting } => {
                self.banner = None;
                self.session_active = true;
                self.transcript.push(Sender::Assistant, greeting);
                self.scroll_from_bottom = 0;
            }
            SessionEvent::SessionStartFailed { detail } => {
                self.session_active = false;
                self.banner = Some(format!("Failed to start an AI chat session: {detail}"));
            }
            SessionEvent::ConfigFailed { detail } => {
                self.session_active = false;
                self.banner = Some(format!(
                    "Configuration error: {detail}. Set GEMINI_API_KEY and restart."
                ));
            }
            SessionEvent::Reply { text } => {
                self.transcript.push(Sender::Assistant, text);
                self.scroll_from_bottom = 0;
            }
            SessionEvent::SendFailed { notice } => {
                self.transcript.push(Sender::SystemNotice, notice);
                self.scroll_from_bottom = 0;
            }
        }
    }

    pub fn can_send_message(&self) -> bool {
        self.session_active && !self.is_loading
    }

    /// Boolean flip, not set-to-true: typing the sequence again hides the
    /// panel. Showing it moves focus into the context editor.
    pub fn toggle_operator_panel(&mut self) {
        self.operator_panel_visible = !self.operator_panel_visible;
        if self.operator_panel_visible {
            self.focus = Focus::ContextPanel;
        } else if self.focus == Focus::ContextPanel {
            self.focus = Focus::Browse;
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(lines);
    }

    pub fn scroll_page_up(&mut self) {
        let page = self.last_transcript_height.saturating_sub(1).max(1);
        self.scroll_up(page);
    }

    pub fn scroll_page_down(&mut self) {
        let page = self.last_transcript_height.saturating_sub(1).max(1);
        self.scroll_down(page);
    }

    pub fn spinner_frame(&self) -> &'static str {
        const FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
        FRAMES[self.spinner_index % FRAMES.len()]
    }

    pub fn update_spinner(&mut self, now: Instant) -> bool {
        if !self.is_loading {
            self.spinner_index = 0;
            self.spinner_last_tick = now;
            return false;
        }
        if now.duration_since(self.spinner_last_tick) >= Duration::from_millis(120) {
            self.spinner_last_tick = now;
            self.spinner_index = self.spinner_index.wrapping_add(1);
            return true;
        }
        false
    }
}
