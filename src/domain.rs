use std::io::Error;

use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum AdminError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
    UnknownScreen(String),
}

impl From<Error> for AdminError {
    fn from(err: Error) -> Self {
        AdminError::IoError(err)
    }
}

impl From<PolarsError> for AdminError {
    fn from(err: PolarsError) -> Self {
        AdminError::PolarsError(err)
    }
}

/// Everything the controller can ask the model to do.
#[derive(Debug, Clone, Copy)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    NextColumn,
    PrevColumn,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    Sort,
    NextFilter,
    CycleFilterValue,
    Search,
    CopyRow,
    ResetView,
    Logout,
    Help,
    Exit,
    RawKey(KeyEvent),
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Event poll interval in milliseconds.
    pub event_poll_time: u64,
    pub page_size: usize,
    pub max_column_width: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        AdminConfig {
            event_poll_time: 100,
            page_size: crate::view::DEFAULT_PAGE_SIZE,
            max_column_width: 40,
        }
    }
}

pub const HELP_TEXT: &str = "\
stayadmin keys

  j / Down      next row
  k / Up        previous row
  h / Left      previous column
  l / Right     next column
  n / N         next / previous page
  g / G         first / last page
  s             sort by the current column (again to flip direction)
  /             search (Enter applies, Esc cancels)
  Tab           select next filter
  v             cycle the selected filter's value
  y             copy the current row as CSV
  r             reset search, filters, sort and page
  L             log out
  Esc           clear search / close popup
  ?             this help
  q             quit
";
