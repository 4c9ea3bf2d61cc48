/// Editable text buffer for the composer and the context editor, with a
/// char-indexed cursor and submit history for the composer.
#[derive(Default)]
pub struct InputState {
    pub buffer: Vec<char>,
    pub cursor: usize,
    history: Vec<String>,
    history_index: Option<usize>,
    history_saved: Option<String>,
}

impl InputState {
    pub fn current(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn set_from(&mut self, value: &str) {
        self.buffer = value.chars().collect();
        self.cursor = self.buffer.len();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.history_index = None;
        self.history_saved = None;
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += 1;
        self.reset_history_nav();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.buffer.remove(self.cursor);
        self.reset_history_nav();
    }

    pub fn delete(&mut self) {
        if self.cursor >= self.buffer.len() {
            return;
        }
        self.buffer.remove(self.cursor);
        self.reset_history_nav();
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    pub fn kill_to_end(&mut self) {
        self.buffer.truncate(self.cursor);
        self.reset_history_nav();
    }

    pub fn record_history(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        if self.history.last().is_some_and(|last| last == value) {
            return;
        }
        self.history.push(value.to_string());
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next_index = match self.history_index {
            None => {
                self.history_saved = Some(self.current());
                self.history.len() - 1
            }
            Some(index) => index.saturating_sub(1),
        };
        self.history_index = Some(next_index);
        let value = self.history[next_index].clone();
        self.set_from(&value);
    }

    pub fn history_down(&mut self) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < self.history.len() {
            let next = index + 1;
            self.history_index = Some(next);
            let value = self.history[next].clone();
            self.set_from(&value);
            return;
        }
        self.history_index = None;
        if let Some(saved) = self.history_saved.take() {
            self.set_from(&saved);
        }
    }

    fn reset_history_nav(&mut self) {
        if self.history_index.is_some() {
            self.history_index = None;
            self.history_saved = None;
        }
    }
}
