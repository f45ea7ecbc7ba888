use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Line editor for the search prompt. Cursor positions are in chars,
/// insertion and deletion convert to byte offsets.
#[derive(Default)]
pub struct Prompt {
    buffer: String,
    cursor: usize,
}

#[derive(Default, Clone, Debug)]
pub struct PromptState {
    pub text: String,
    pub cursor: usize,
    pub submitted: bool,
    pub cancelled: bool,
}

impl Prompt {
    pub fn open(&mut self, initial: &str) {
        self.buffer = initial.to_string();
        self.cursor = self.buffer.chars().count();
    }

    pub fn state(&self) -> PromptState {
        PromptState {
            text: self.buffer.clone(),
            cursor: self.cursor,
            submitted: false,
            cancelled: false,
        }
    }

    pub fn read(&mut self, key: KeyEvent) -> PromptState {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => {
                let mut state = self.state();
                state.submitted = true;
                trace!("Prompt submitted: {}", state.text);
                state
            }
            (KeyCode::Esc, KeyModifiers::NONE) => {
                let mut state = self.state();
                state.cancelled = true;
                state
            }
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Left, KeyModifiers::NONE) => {
                self.cursor = self.cursor.saturating_sub(1);
                self.state()
            }
            (KeyCode::Right, KeyModifiers::NONE) => {
                if self.cursor < self.buffer.chars().count() {
                    self.cursor += 1;
                }
                self.state()
            }
            (KeyCode::Home, KeyModifiers::NONE) => {
                self.cursor = 0;
                self.state()
            }
            (KeyCode::End, KeyModifiers::NONE) => {
                self.cursor = self.buffer.chars().count();
                self.state()
            }
            (code, _) => self.insert(code),
        }
    }

    fn insert(&mut self, code: KeyCode) -> PromptState {
        if let Some(chr) = code.as_char() {
            let at = self.byte_pos(self.cursor);
            self.buffer.insert(at, chr);
            self.cursor += 1;
        }
        self.state()
    }

    fn backspace(&mut self) -> PromptState {
        if self.cursor > 0 {
            let at = self.byte_pos(self.cursor - 1);
            self.buffer.remove(at);
            self.cursor -= 1;
        }
        self.state()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.buffer.len())
    }
}
