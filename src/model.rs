use std::time::Instant;

use arboard::Clipboard;
use tracing::{error, info, trace};

use crate::domain::{AdminConfig, AdminError, HELP_TEXT, Message};
use crate::inputter::{Prompt, PromptState};
use crate::record::Record;
use crate::screens::ScreenSpec;
use crate::session::Session;
use crate::view::TableView;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    BROWSE,
    SEARCH,
    POPUP,
}

pub struct Model {
    config: AdminConfig,
    pub status: Status,
    modus: Modus,
    screen: ScreenSpec,
    view: TableView,
    session: Session,
    cursor_row: usize, // within the visible page
    active_column: usize,
    active_filter: usize,
    clipboard: Option<Clipboard>,
    prompt: Prompt,
    prompt_state: PromptState,
    popup_message: String,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn new(config: AdminConfig, screen: ScreenSpec, session: Session) -> Self {
        let view = TableView::new(
            screen.columns.clone(),
            screen.filters.clone(),
            config.page_size,
        );
        let clipboard = match Clipboard::new() {
            Ok(c) => Some(c),
            Err(e) => {
                error!("No clipboard available: {:?}", e);
                None
            }
        };
        Model {
            config,
            status: Status::READY,
            modus: Modus::BROWSE,
            screen,
            view,
            session,
            cursor_row: 0,
            active_column: 0,
            active_filter: 0,
            clipboard,
            prompt: Prompt::default(),
            prompt_state: PromptState::default(),
            popup_message: String::new(),
            status_message: "Started stayadmin!".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    /// Hand a freshly fetched collection to the view. Search, filters and
    /// sort survive the refresh; only the cursor and page get re-clamped.
    pub fn load_records(&mut self, records: Option<Vec<Record>>) {
        self.view.replace_records(records);
        self.clamp_cursor();
        self.set_status_message(format!("Loaded {} records", self.view.filtered_count()));
    }

    pub fn update(&mut self, message: Message) -> Result<(), AdminError> {
        trace!("Update: modus {:?}, message {:?}", self.modus, message);
        match self.modus {
            Modus::BROWSE => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_cursor_up(),
                Message::MoveDown => self.move_cursor_down(),
                Message::NextColumn => self.move_column(1),
                Message::PrevColumn => self.move_column(-1),
                Message::NextPage => self.goto_page(self.view.page_info().page + 1),
                Message::PrevPage => {
                    self.goto_page(self.view.page_info().page.saturating_sub(1).max(1))
                }
                Message::FirstPage => self.goto_page(1),
                Message::LastPage => self.goto_page(self.view.page_info().total_pages),
                Message::Sort => self.sort_active_column(),
                Message::NextFilter => self.select_next_filter(),
                Message::CycleFilterValue => self.cycle_filter_value(),
                Message::Search => self.enter_search(),
                Message::CopyRow => self.copy_row(),
                Message::ResetView => self.reset_view(),
                Message::Logout => self.logout(),
                Message::Help => self.show_help(),
                Message::Exit => self.clear_search(),
                Message::RawKey(_) => {}
            },
            Modus::SEARCH => {
                if let Message::RawKey(key) = message {
                    self.read_prompt(key);
                }
            }
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => {
                    self.modus = Modus::BROWSE;
                    self.popup_message.clear();
                }
                _ => {}
            },
        }
        Ok(())
    }

    /// While the search prompt is open every key goes to it unmapped.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // ------------------------ browse handling ------------------------- //

    fn move_cursor_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
    }

    fn move_cursor_down(&mut self) {
        if self.cursor_row + 1 < self.view.visible_len() {
            self.cursor_row += 1;
        }
    }

    fn move_column(&mut self, step: i32) {
        let ncols = self.screen.columns.len();
        if ncols == 0 {
            return;
        }
        let ncols = ncols as i32;
        self.active_column = ((self.active_column as i32 + step).rem_euclid(ncols)) as usize;
    }

    fn goto_page(&mut self, page: usize) {
        self.view.set_page(page);
        self.clamp_cursor();
        self.set_status_message(self.view.page_info().caption());
    }

    fn sort_active_column(&mut self) {
        let Some(column) = self.screen.columns.get(self.active_column) else {
            return;
        };
        if !column.sortable {
            self.set_status_message(format!("Column {} is not sortable", column.label));
            return;
        }
        let key = column.key.clone();
        let label = column.label.clone();
        self.view.request_sort(&key);
        self.clamp_cursor();
        let direction = format!("{:?}", self.view.state().sort.direction).to_lowercase();
        self.set_status_message(format!("Sorted by {label}, {direction}"));
    }

    fn select_next_filter(&mut self) {
        let nfilters = self.screen.filters.len();
        if nfilters == 0 {
            self.set_status_message("This screen has no filters");
            return;
        }
        self.active_filter = (self.active_filter + 1) % nfilters;
        let filter = &self.screen.filters[self.active_filter];
        self.set_status_message(format!("Filter: {}", filter.label));
    }

    // Single-select cycling: All -> option 1 -> ... -> last option -> All.
    fn cycle_filter_value(&mut self) {
        let Some(filter) = self.screen.filters.get(self.active_filter) else {
            return;
        };
        let key = filter.key.clone();
        let label = filter.label.clone();
        let current = self.view.active_filter_value(&key);
        let position = current.and_then(|v| filter.options.iter().position(|o| o.value == v));
        let next = match position {
            None => filter.options.first(),
            Some(p) => filter.options.get(p + 1),
        };
        let next_value = next.map(|o| o.value.clone());
        let next_label = next.map(|o| o.label.clone());

        self.view.set_filter_value(&key, next_value.as_deref());
        self.cursor_row = 0;
        self.set_status_message(format!(
            "{}: {}",
            label,
            next_label.unwrap_or_else(|| "All".to_string())
        ));
    }

    fn enter_search(&mut self) {
        self.modus = Modus::SEARCH;
        self.prompt.open(&self.view.state().search_text);
        self.prompt_state = self.prompt.state();
    }

    fn read_prompt(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.prompt_state = self.prompt.read(key);
        if self.prompt_state.submitted {
            let query = self.prompt_state.text.clone();
            self.view.set_search_text(query);
            self.cursor_row = 0;
            self.modus = Modus::BROWSE;
            self.set_status_message(self.view.page_info().caption());
        } else if self.prompt_state.cancelled {
            // Keep whatever search was active before the prompt opened.
            self.modus = Modus::BROWSE;
        }
    }

    fn clear_search(&mut self) {
        if !self.view.state().search_text.is_empty() {
            self.view.set_search_text("");
            self.cursor_row = 0;
            self.set_status_message("Search cleared");
        }
    }

    fn reset_view(&mut self) {
        self.view.reset_view();
        self.cursor_row = 0;
        self.active_filter = 0;
        self.set_status_message("View reset");
    }

    fn logout(&mut self) {
        self.session.clear();
        self.set_status_message("Logged out");
    }

    fn show_help(&mut self) {
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn copy_row(&mut self) {
        let Some(record) = self.view.visible_record(self.cursor_row) else {
            return;
        };
        let line = self
            .screen
            .columns
            .iter()
            .map(|c| wrap_cell_content(&c.render_cell(record)))
            .collect::<Vec<String>>()
            .join(",");

        // Identity: the id field when present, the absolute row number
        // otherwise.
        let row_id = record
            .id()
            .unwrap_or_else(|| (self.view.page_info().first_row + self.cursor_row).to_string());

        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(line) {
                Ok(_) => {
                    info!("Copied row {row_id} to clipboard");
                    self.set_status_message(format!("Row {row_id} copied"));
                }
                Err(e) => {
                    error!("Error copying to clipboard: {:?}", e);
                    self.set_status_message("Copy failed");
                }
            },
            None => self.set_status_message("No clipboard available"),
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.view.visible_len();
        if len == 0 {
            self.cursor_row = 0;
        } else if self.cursor_row >= len {
            self.cursor_row = len - 1;
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    // --------------------------- ui access ---------------------------- //

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn screen(&self) -> &ScreenSpec {
        &self.screen
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn active_column(&self) -> usize {
        self.active_column
    }

    pub fn active_filter(&self) -> usize {
        self.active_filter
    }

    pub fn searching(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn prompt_state(&self) -> &PromptState {
        &self.prompt_state
    }

    pub fn popup(&self) -> Option<&str> {
        match self.modus {
            Modus::POPUP => Some(&self.popup_message),
            _ => None,
        }
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }
}

// CSV quoting for clipboard rows.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace("\"", "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}
