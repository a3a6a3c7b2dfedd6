use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState, Wrap,
    },
};

use crate::domain::CMDMode;
use crate::model::{Model, UIData};

pub const BORDER_WIDTH: usize = 2;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

#[derive(Debug, Default)]
pub struct TableUI {
    table_state: TableState,
}

impl TableUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();

        let title = Line::from(format!(" {} ", uidata.title).bold());
        let instructions = Line::from(vec![
            " Download CSV ".into(),
            "<S>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Close ".into(),
            "<Q> ".blue().bold(),
        ]);
        let block = Block::bordered()
            .title(title.centered())
            .title_bottom(instructions.centered())
            .border_set(border::THICK);
        let inner = block.inner(frame.area());
        frame.render_widget(block, frame.area());

        let [table_area, status_area] = Layout::vertical([
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(inner);
        let [table_area, scrollbar_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(table_area);

        self.draw_table(uidata, frame, table_area);
        Self::draw_scrollbar(uidata, frame, scrollbar_area);
        Self::draw_statusline(uidata, frame, status_area);

        if uidata.show_popup {
            Self::draw_popup(uidata, frame);
        }
    }

    fn draw_table(&mut self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(
            uidata
                .table
                .iter()
                .map(|c| Cell::from(c.name.as_str())),
        )
        .style(Style::new().add_modifier(Modifier::BOLD).fg(Color::Yellow))
        .height(TABLE_HEADER_HEIGHT as u16);

        let nrows = uidata.table.first().map(|c| c.data.len()).unwrap_or(0);
        let rows = (0..nrows).map(|r| {
            Row::new(
                uidata
                    .table
                    .iter()
                    .map(|c| Cell::from(c.data[r].as_str())),
            )
        });
        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(0)
            .row_highlight_style(Style::new().bg(Color::DarkGray))
            .cell_highlight_style(Style::new().reversed());

        // The model hands over only the visible slice, so the selection is relative.
        self.table_state = TableState::default()
            .with_selected(if nrows > 0 {
                Some(uidata.selected_row)
            } else {
                None
            })
            .with_selected_column(Some(uidata.selected_column));
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_scrollbar(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut state = ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }

    fn draw_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::SaveCsv) | None => "Save CSV as: ",
            };
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(uidata.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.len() + uidata.cmdinput.cursor_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let position = if uidata.nrows == 0 {
            format!("{} | 0/0 ", uidata.name)
        } else {
            format!(
                "{} | {}/{} ",
                uidata.name,
                uidata.abs_selected_row + 1,
                uidata.nrows
            )
        };
        let [message_area, position_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(position.chars().count() as u16),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), message_area);
        frame.render_widget(Paragraph::new(position).right_aligned(), position_area);
    }

    fn draw_popup(uidata: &UIData, frame: &mut Frame) {
        let area = Self::popup_area(frame.area(), 60, 60);
        let style = if uidata.popup_is_error {
            Style::new().fg(Color::Red)
        } else {
            Style::new()
        };
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", uidata.popup_title).bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::ROUNDED)
            .border_style(style);
        let popup = Paragraph::new(uidata.popup_message.as_str())
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
        let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
            .flex(Flex::Center)
            .areas(area);
        let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
            .flex(Flex::Center)
            .areas(area);
        area
    }
}
