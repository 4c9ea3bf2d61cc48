use unicode_width::UnicodeWidthChar;

pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn visual_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Greedy word wrap to `width` terminal columns. Paragraph breaks (`\n`) are
/// preserved; words wider than the line are split at column boundaries so a
/// wide grapheme is never cut in half.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        wrap_paragraph(paragraph, width, &mut out);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn wrap_paragraph(paragraph: &str, width: usize, out: &mut Vec<String>) {
    if paragraph.is_empty() {
        out.push(String::new());
        return;
    }
    let mut line = String::new();
    let mut line_width = 0usize;
    for word in paragraph.split_whitespace() {
        let word_width = visual_width(word);
        let sep = usize::from(!line.is_empty());
        if line_width + sep + word_width <= width {
            if sep == 1 {
                line.push(' ');
            }
            line.push_str(word);
            line_width += sep + word_width;
            continue;
        }
        if !line.is_empty() {
            out.push(std::mem::take(&mut line));
            line_width = 0;
        }
        if word_width <= width {
            line.push_str(word);
            line_width = word_width;
        } else {
            split_long_word(word, width, out, &mut line, &mut line_width);
        }
    }
    out.push(line);
}

fn split_long_word(
    word: &str,
    width: usize,
    out: &mut Vec<String>,
    line: &mut String,
    line_width: &mut usize,
) {
    for ch in word.chars() {
        let w = char_width(ch);
        if *line_width + w > width && !line.is_empty() {
            out.push(std::mem::take(line));
            *line_width = 0;
        }
        line.push(ch);
        *line_width += w;
    }
}

#[cfg(test)]
mod tests {
    use super::{visual_width, wrap_text};

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap_text("hello world", 20), vec!["hello world"]);
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn preserves_paragraph_breaks() {
        let lines = wrap_text("one\n\ntwo", 10);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn splits_overlong_words_without_cutting_wide_chars() {
        let lines = wrap_text("ああああ", 3);
        // Each CJK char is 2 columns wide; only one fits per 3-column line.
        assert_eq!(lines.len(), 4);
        for line in &lines {
            assert!(visual_width(line) <= 3);
        }
    }

    #[test]
    fn zero_width_never_panics() {
        assert_eq!(wrap_text("anything", 0), vec![""]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        assert_eq!(wrap_text("", 12), vec![""]);
    }
}
