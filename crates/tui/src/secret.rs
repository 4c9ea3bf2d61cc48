/// Keystroke sequence that toggles the CEO context panel. Matched
/// case-insensitively against keys typed outside any text-entry field.
pub const OPERATOR_SEQUENCE: &str = "ceoupdates";

/// Accumulates recent keystrokes and reports when the operator sequence has
/// been typed in full. The stored prefix is always a prefix of
/// [`OPERATOR_SEQUENCE`].
#[derive(Default)]
pub struct SequenceDetector {
    typed: String,
}

impl SequenceDetector {
    /// Feed one keystroke. Returns `true` exactly when the key completes the
    /// full sequence; the detector resets itself on completion.
    ///
    /// Keys observed while focus is inside a text-entry field never trigger
    /// and clear any partial match, so typing a message cannot open the
    /// panel by accident.
    pub fn observe(&mut self, key: char, in_text_entry: bool) -> bool {
        if in_text_entry {
            self.typed.clear();
            return false;
        }

        let mut tentative = self.typed.clone();
        tentative.extend(key.to_lowercase());

        if OPERATOR_SEQUENCE.starts_with(&tentative) {
            if tentative == OPERATOR_SEQUENCE {
                self.typed.clear();
                return true;
            }
            self.typed = tentative;
            return false;
        }

        // Sequence broken; the key may still be a fresh start.
        let mut restart = String::new();
        restart.extend(key.to_lowercase());
        self.typed = if OPERATOR_SEQUENCE.starts_with(&restart) {
            restart
        } else {
            String::new()
        };
        false
    }

    pub fn reset(&mut self) {
        self.typed.clear();
    }
}
