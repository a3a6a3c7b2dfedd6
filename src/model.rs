use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

use crate::domain::{CMDMode, DVConfig, DVError, HELP_TEXT, Message};
use crate::export::csv_row;
use crate::inputter::{InputResult, Inputter};
use crate::table::TableGrid;
use crate::ui::{
    BORDER_WIDTH, CMDLINE_HEIGH, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH, TABLE_HEADER_HEIGHT,
};
use crate::viewer::{DataViewer, ViewerSurface};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    RECORD,
    POPUP,
    CMDINPUT,
}

/// Display text of one grid column, one entry per row.
struct Column {
    name: String,
    render_width: usize,
    data: Vec<String>,
}

impl Column {
    fn load(idx: usize, name: &str, grid: &TableGrid, max_column_width: usize) -> Self {
        let data: Vec<String> = (0..grid.nrows())
            .map(|row| Self::single_line(&grid.cell_text(row, idx)))
            .collect();
        let max_width = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        let width = std::cmp::max(name.chars().count(), max_width) + COLUMN_WIDTH_MARGIN;
        Self {
            name: name.to_string(),
            render_width: std::cmp::min(width, max_column_width),
            data,
        }
    }

    fn single_line(s: &str) -> String {
        s.replace(['\n', '\r', '\t'], " ")
    }
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

#[derive(Default)]
struct TableView {
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    visible_columns: Vec<usize>,
    data: Vec<ColumnView>,
}

#[derive(Default)]
struct RecordView {
    record_idx: usize,
    header_data: Vec<String>,
    row_data: Vec<String>,
    header_view: ColumnView,
    row_view: ColumnView,
    curser_row: usize,
    curser_offset: usize,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let inner_width = ui_width.saturating_sub(BORDER_WIDTH);
        let inner_height = ui_height.saturating_sub(BORDER_WIDTH);
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: inner_width.saturating_sub(SCROLLBAR_WIDTH),
            table_height: inner_height.saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

#[derive(Default, Clone, Debug)]
pub struct UIData {
    pub title: String,
    pub name: String,
    pub table: Vec<ColumnView>,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_title: String,
    pub popup_message: String,
    pub popup_is_error: bool,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

pub struct Model {
    config: DVConfig,
    viewer: Rc<DataViewer>,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    data: Vec<Column>,
    table: TableView,
    record_view: RecordView,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    pending_save: Option<PathBuf>,
    status_message: String,
}

impl Model {
    pub fn init(config: &DVConfig, viewer: DataViewer, ui_width: usize, ui_height: usize) -> Self {
        let viewer = Rc::new(viewer);
        let mut model = Self {
            config: config.clone(),
            viewer: Rc::clone(&viewer),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            data: Vec::new(),
            table: TableView::default(),
            record_view: RecordView::default(),
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::default(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            pending_save: None,
            status_message: String::new(),
        };
        viewer.show(&mut model);
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        info!("Closing viewer");
        self.status = Status::QUITTING;
    }

    fn grid(&self) -> &TableGrid {
        self.viewer.grid()
    }

    fn nrows(&self) -> usize {
        self.viewer.grid().nrows()
    }

    fn selected_row(&self) -> usize {
        self.table.offset_row + self.table.curser_row
    }

    fn selected_column(&self) -> usize {
        self.table.offset_column + self.table.curser_column
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.page_size()),
                Message::MovePageDown => self.move_table_selection_down(self.page_size()),
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.nrows().saturating_sub(1)),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::DownloadCsv => self.enter_cmd_mode(CMDMode::SaveCsv),
                Message::Enter => self.enter(),
                _ => (),
            },
            Modus::RECORD => match msg {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_record_selection_down(1),
                Message::MoveUp => self.move_record_selection_up(1),
                Message::MoveLeft => self.previous_record(),
                Message::MoveRight => self.next_record(),
                Message::MovePageUp => self.move_record_selection_up(self.page_size()),
                Message::MovePageDown => self.move_record_selection_down(self.page_size()),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::CopyCell => self.copy_record_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Help => self.show_help(),
                Message::DownloadCsv => self.enter_cmd_mode(CMDMode::SaveCsv),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Enter => self.exit(),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        std::cmp::max(self.uilayout.table_height, 1)
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        // keep the selection on screen
        self.select_row(self.selected_row());
        if self.underlying_modus() == Modus::RECORD {
            let line = self.record_view.curser_offset + self.record_view.curser_row;
            self.select_record_line(line);
        }
    }

    /// The view below any popup or command line.
    fn underlying_modus(&self) -> Modus {
        match self.modus {
            Modus::POPUP | Modus::CMDINPUT => self.previous_modus,
            modus => modus,
        }
    }

    // -------------------- Table view ---------------------- //

    fn visible_columns(data: &[Column], offset_column: usize, table_width: usize) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut used = 0;
        for (idx, column) in data.iter().enumerate().skip(offset_column) {
            if !visible.is_empty() && used + column.render_width > table_width {
                break;
            }
            used += column.render_width;
            visible.push(idx);
        }
        visible
    }

    fn update_table_data(&mut self) {
        let nrows = self.nrows();
        let rbegin = std::cmp::min(self.table.offset_row, nrows);
        let rend = std::cmp::min(rbegin + self.page_size(), nrows);

        let table = &mut self.table;
        table.visible_columns =
            Self::visible_columns(&self.data, table.offset_column, self.uilayout.table_width);
        table.data = table
            .visible_columns
            .iter()
            .map(|&idx| {
                let column = &self.data[idx];
                ColumnView {
                    name: column.name.clone(),
                    width: column.render_width,
                    data: column.data[rbegin..rend].to_vec(),
                }
            })
            .collect();
        table.curser_column =
            std::cmp::min(table.curser_column, table.visible_columns.len().saturating_sub(1));
        self.update_uidata_for_table();
    }

    fn update_uidata_for_table(&mut self) {
        let table = &self.table;
        self.uidata = UIData {
            title: self.viewer.title(),
            name: format!("{} rows", self.nrows()),
            table: table.data.clone(),
            nrows: self.nrows(),
            selected_row: table.curser_row,
            selected_column: table.curser_column,
            abs_selected_row: table.offset_row + table.curser_row,
            show_popup: self.uidata.show_popup,
            popup_title: std::mem::take(&mut self.uidata.popup_title),
            popup_message: std::mem::take(&mut self.uidata.popup_message),
            popup_is_error: self.uidata.popup_is_error,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }

    /// Moves the cursor to `row`, scrolling the table as little as possible.
    fn select_row(&mut self, row: usize) {
        let nrows = self.nrows();
        let height = self.page_size();
        let row = std::cmp::min(row, nrows.saturating_sub(1));
        let table = &mut self.table;
        if row < table.offset_row {
            table.offset_row = row;
        } else if row >= table.offset_row + height {
            table.offset_row = row + 1 - height;
        }
        table.curser_row = row - table.offset_row;
        self.update_table_data();
    }

    fn select_column(&mut self, column: usize) {
        let column = std::cmp::min(column, self.data.len().saturating_sub(1));
        let table = &mut self.table;
        if column < table.offset_column {
            table.offset_column = column;
        }
        loop {
            let visible =
                Self::visible_columns(&self.data, table.offset_column, self.uilayout.table_width);
            if visible.is_empty() || column < table.offset_column + visible.len() {
                break;
            }
            table.offset_column += 1;
        }
        table.curser_column = column - table.offset_column;
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        self.select_row(self.selected_row().saturating_sub(size));
    }

    fn move_table_selection_down(&mut self, size: usize) {
        self.select_row(self.selected_row() + size);
    }

    fn move_table_selection_left(&mut self) {
        self.select_column(self.selected_column().saturating_sub(1));
    }

    fn move_table_selection_right(&mut self) {
        self.select_column(self.selected_column() + 1);
    }

    // -------------------- Record view ---------------------- //

    fn enter(&mut self) {
        if self.nrows() == 0 {
            self.set_status_message("Nothing to show");
            return;
        }
        self.build_record_view(self.selected_row());
        self.previous_modus = Modus::TABLE;
        self.modus = Modus::RECORD;
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::RECORD => {
                self.previous_modus = Modus::RECORD;
                self.modus = Modus::TABLE;
                self.select_row(self.record_view.record_idx);
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.uidata.show_popup = false;
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn build_record_view(&mut self, record_idx: usize) {
        let grid = self.viewer.grid();
        self.record_view = RecordView {
            record_idx,
            header_data: grid.columns().iter().map(str::to_string).collect(),
            row_data: (0..grid.ncolumns())
                .map(|col| Column::single_line(&grid.cell_text(record_idx, col)))
                .collect(),
            ..Default::default()
        };
        self.update_record_data();
    }

    fn update_record_data(&mut self) {
        let height = self.page_size();
        let record = &mut self.record_view;
        let rbegin = std::cmp::min(record.curser_offset, record.row_data.len());
        let rend = std::cmp::min(rbegin + height, record.row_data.len());

        let header_width = record
            .header_data
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0)
            + COLUMN_WIDTH_MARGIN;
        record.header_view = ColumnView {
            name: "Column".to_string(),
            width: header_width,
            data: record.header_data[rbegin..rend].to_vec(),
        };
        record.row_view = ColumnView {
            name: "Value".to_string(),
            width: self.uilayout.table_width.saturating_sub(header_width),
            data: record.row_data[rbegin..rend].to_vec(),
        };
        self.update_uidata_for_record();
    }

    fn update_uidata_for_record(&mut self) {
        let record = &self.record_view;
        self.uidata = UIData {
            title: self.viewer.title(),
            name: format!("Record {}/{}", record.record_idx + 1, self.nrows()),
            table: vec![record.header_view.clone(), record.row_view.clone()],
            nrows: record.row_data.len(),
            selected_row: record.curser_row,
            selected_column: 1,
            abs_selected_row: record.curser_offset + record.curser_row,
            show_popup: self.uidata.show_popup,
            popup_title: std::mem::take(&mut self.uidata.popup_title),
            popup_message: std::mem::take(&mut self.uidata.popup_message),
            popup_is_error: self.uidata.popup_is_error,
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
        };
    }

    fn select_record_line(&mut self, line: usize) {
        let height = self.page_size();
        let record = &mut self.record_view;
        let line = std::cmp::min(line, record.row_data.len().saturating_sub(1));
        if line < record.curser_offset {
            record.curser_offset = line;
        } else if line >= record.curser_offset + height {
            record.curser_offset = line + 1 - height;
        }
        record.curser_row = line - record.curser_offset;
        self.update_record_data();
    }

    fn move_record_selection_up(&mut self, size: usize) {
        let line = self.record_view.curser_offset + self.record_view.curser_row;
        self.select_record_line(line.saturating_sub(size));
    }

    fn move_record_selection_down(&mut self, size: usize) {
        let line = self.record_view.curser_offset + self.record_view.curser_row;
        self.select_record_line(line + size);
    }

    fn previous_record(&mut self) {
        let idx = self.record_view.record_idx;
        if idx > 0 {
            self.switch_record(idx - 1);
        }
    }

    fn next_record(&mut self) {
        let idx = self.record_view.record_idx;
        if idx + 1 < self.nrows() {
            self.switch_record(idx + 1);
        }
    }

    fn switch_record(&mut self, record_idx: usize) {
        let line = self.record_view.curser_offset + self.record_view.curser_row;
        self.build_record_view(record_idx);
        self.select_record_line(line);
    }

    // -------------------- Popups and command line ---------------------- //

    fn show_popup(&mut self, title: &str, message: &str, is_error: bool) {
        if self.modus != Modus::POPUP {
            self.previous_modus = self.modus;
        }
        self.modus = Modus::POPUP;
        self.uidata.popup_title = title.to_string();
        self.uidata.popup_message = message.to_string();
        self.uidata.popup_is_error = is_error;
        self.uidata.show_popup = true;
    }

    fn show_help(&mut self) {
        self.show_popup("Help", HELP_TEXT, false);
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?}");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        self.input.clear();
        match mode {
            CMDMode::SaveCsv => {
                let suggested = self.viewer.suggested_file_name();
                self.input.set(&suggested.to_string_lossy());
            }
        }
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = self.active_cmdinput;
        self.uidata.cmd_mode = self.cmd_mode;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            self.uidata.cmdinput = self.last_input.clone();
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.uidata.active_cmdinput = false;
        let mode = self.cmd_mode.take();
        self.uidata.cmd_mode = None;

        if self.last_input.canceled {
            self.set_status_message("Download cancelled");
            return;
        }
        let input = self.last_input.input.clone();
        match mode {
            Some(CMDMode::SaveCsv) => self.save_csv(&input),
            None => debug!("Command input without mode: {input}"),
        }
    }

    fn save_csv(&mut self, input: &str) {
        let input = input.trim();
        if input.is_empty() {
            self.set_status_message("No file name given, nothing saved");
            return;
        }
        match shellexpand::full(input) {
            Ok(path) => self.pending_save = Some(PathBuf::from(path.into_owned())),
            Err(e) => {
                let err = DVError::PathExpansion(e.to_string());
                warn!("{err}");
                self.notify("Error", &format!("Failed to save file: {err}"), true);
                return;
            }
        }
        let viewer = Rc::clone(&self.viewer);
        viewer.download_csv(self);
    }

    // -------------------- Clipboard ---------------------- //

    fn copy_to_clipboard(&mut self, text: String, what: &str) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => warn!("Clipboard unavailable: {e}"),
            }
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        };
        match result {
            Ok(_) => {
                trace!("Copied {what} to clipboard.");
                self.set_status_message(format!("Copied {what}"));
            }
            Err(e) => self.set_status_message(format!("Copy failed: {e}")),
        }
    }

    fn copy_table_cell(&mut self) {
        if self.nrows() == 0 {
            return;
        }
        let cell = self.grid().cell_text(self.selected_row(), self.selected_column());
        self.copy_to_clipboard(cell, "cell");
    }

    fn copy_record_cell(&mut self) {
        let record = &self.record_view;
        let column = record.curser_offset + record.curser_row;
        let cell = self.grid().cell_text(record.record_idx, column);
        self.copy_to_clipboard(cell, "cell");
    }

    fn copy_table_row(&mut self) {
        if self.nrows() == 0 {
            return;
        }
        let row = match self.modus {
            Modus::RECORD => self.record_view.record_idx,
            _ => self.selected_row(),
        };
        let line = csv_row(self.grid(), row);
        self.copy_to_clipboard(line, "row");
    }
}

impl ViewerSurface for Model {
    fn pick_save_file(&mut self, _suggested: &Path) -> Option<PathBuf> {
        self.pending_save.take()
    }

    fn render_grid(&mut self, title: &str, grid: &TableGrid) {
        self.data = grid
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| Column::load(idx, name, grid, self.config.max_column_width))
            .collect();
        self.table = TableView::default();
        self.update_table_data();
        info!("Showing {title}: {} rows, {} columns", grid.nrows(), grid.ncolumns());
        if grid.columns().is_empty() {
            self.set_status_message("No columns to show. Press ? for help");
        } else {
            self.set_status_message(format!(
                "Loaded {} rows, {} columns. Press ? for help",
                grid.nrows(),
                grid.ncolumns()
            ));
        }
    }

    fn notify(&mut self, title: &str, message: &str, is_error: bool) {
        self.set_status_message(message);
        self.show_popup(title, message, is_error);
    }
}
