/// Emoji offered by the picker, in display order.
pub const EMOJI_PALETTE: [&str; 16] = [
    "😀", "😂", "😍", "😊", "😎", "😢", "😡", "🤔", "👍", "👎", "🙏", "👏", "🎉", "❤️", "🔥", "💯",
];

/// Message input buffer. The caret is a char index into the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    text: String,
    caret: usize,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Replace the whole buffer, leaving the caret at the end.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.caret = self.text.chars().count();
    }

    pub fn set_caret(&mut self, caret: usize) {
        self.caret = caret.min(self.text.chars().count());
    }

    /// Insert at the caret and move the caret past the insertion.
    pub fn insert(&mut self, s: &str) {
        let at = self
            .text
            .char_indices()
            .nth(self.caret)
            .map_or(self.text.len(), |(i, _)| i);
        self.text.insert_str(at, s);
        self.caret += s.chars().count();
    }

    /// Trimmed body to send, or `None` if there is nothing but whitespace.
    pub fn body(&self) -> Option<String> {
        let body = self.text.trim();
        (!body.is_empty()).then(|| body.to_string())
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.caret = 0;
    }
}
