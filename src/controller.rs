use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode};
use tracing::trace;

use crate::domain::{AdminConfig, AdminError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AdminConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, AdminError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            // The search prompt consumes keys unmapped.
            if model.raw_keyevents() {
                return Ok(Some(Message::RawKey(key)));
            }
            return Ok(self.handle_key(key));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::PrevColumn),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::NextColumn),
            KeyCode::Char('n') => Some(Message::NextPage),
            KeyCode::Char('N') => Some(Message::PrevPage),
            KeyCode::Char('g') => Some(Message::FirstPage),
            KeyCode::Char('G') => Some(Message::LastPage),
            KeyCode::Char('s') => Some(Message::Sort),
            KeyCode::Tab => Some(Message::NextFilter),
            KeyCode::Char('v') => Some(Message::CycleFilterValue),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('y') => Some(Message::CopyRow),
            KeyCode::Char('r') => Some(Message::ResetView),
            KeyCode::Char('L') => Some(Message::Logout),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
