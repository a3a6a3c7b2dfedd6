use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum DVError {
    IoError(Error),
    ParseError(serde_json::Error),
    UnexpectedShape(String),
    PathExpansion(String),
    FileNotFound,
    PermissionDenied,
}

impl fmt::Display for DVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DVError::IoError(e) => write!(f, "{e}"),
            DVError::ParseError(e) => write!(f, "{e}"),
            DVError::UnexpectedShape(s) => write!(f, "{s}"),
            DVError::PathExpansion(s) => write!(f, "Could not expand path: {s}"),
            DVError::FileNotFound => write!(f, "File not found"),
            DVError::PermissionDenied => write!(f, "Permission denied"),
        }
    }
}

impl std::error::Error for DVError {}

impl From<Error> for DVError {
    fn from(err: Error) -> Self {
        DVError::IoError(err)
    }
}

impl From<serde_json::Error> for DVError {
    fn from(err: serde_json::Error) -> Self {
        DVError::ParseError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct DVConfig {
    pub data_type: String,
    pub event_poll_time: u64,
    pub max_column_width: usize,
    #[setters(strip_option)]
    pub log_file: Option<PathBuf>,
}

impl Default for DVConfig {
    fn default() -> Self {
        Self {
            data_type: "History".to_string(),
            event_poll_time: 100,
            max_column_width: 40,
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    SaveCsv,
}

#[derive(Debug, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Exit,
    Help,
    DownloadCsv,
    CopyCell,
    CopyRow,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  Up/Down, k/j     move selection
  Left/Right, h/l  move column (record view: previous/next record)
  PgUp/PgDn        page up/down
  g/G, Home/End    first/last row
  Enter            show the selected record
  Esc              leave record view or close popup

Actions
  s                download table as CSV
  c                copy cell
  C                copy row as CSV line
  ?                this help
  q                close
";
