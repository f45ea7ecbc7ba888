use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::model::Model;
use crate::view::{SortDirection, TableView};

pub fn draw(model: &Model, frame: &mut Frame) {
    let [title_area, table_area, filter_area, status_area, prompt_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_title(model, frame, title_area);
    render_table(model, frame, table_area);
    render_filter_bar(model, frame, filter_area);
    render_status(model, frame, status_area);
    render_prompt(model, frame, prompt_area);

    if let Some(message) = model.popup() {
        render_popup(message, frame);
    }
}

fn render_title(model: &Model, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::from(format!(" {} ", model.screen().title)).bold(),
        Span::from(format!("· {} items", model.view().filtered_count())),
    ];
    if let Some(operator) = model.session().operator() {
        spans.push(Span::from(format!(" · {}", operator.name)).dim());
    }
    frame.render_widget(Line::from(spans), area);
}

fn render_table(model: &Model, frame: &mut Frame, area: Rect) {
    let view = model.view();
    if view.visible_len() == 0 {
        let text = model
            .screen()
            .empty_text
            .as_deref()
            .unwrap_or("No matching records");
        frame.render_widget(Paragraph::new(text).centered().dim(), area);
        return;
    }

    let max_width = model.config().max_column_width;
    let columns = view.columns();

    // Render all visible cells first; column widths derive from content.
    let cells: Vec<Vec<String>> = view
        .visible_records()
        .map(|record| {
            columns
                .iter()
                .map(|c| truncate(&c.render_cell(record), max_width))
                .collect()
        })
        .collect();

    let headers: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut label = c.label.clone();
            if view.state().sort.key.as_deref() == Some(c.key.as_str()) {
                label.push(match view.state().sort.direction {
                    SortDirection::Ascending => '▲',
                    SortDirection::Descending => '▼',
                });
            }
            truncate(&label, max_width)
        })
        .collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .enumerate()
        .map(|(cidx, _)| {
            let content = cells
                .iter()
                .map(|row| row[cidx].chars().count())
                .max()
                .unwrap_or(0);
            let w = std::cmp::max(headers[cidx].chars().count(), content).min(max_width);
            Constraint::Length(w as u16)
        })
        .collect();

    let header = Row::new(headers.iter().enumerate().map(|(cidx, h)| {
        let style = if cidx == model.active_column() {
            Style::new().bold().underlined()
        } else {
            Style::new().bold()
        };
        Cell::from(h.as_str()).style(style)
    }));

    let rows = cells.iter().enumerate().map(|(ridx, row)| {
        let style = if ridx == model.cursor_row() {
            Style::new().add_modifier(Modifier::REVERSED)
        } else {
            Style::new()
        };
        Row::new(row.iter().map(|c| Cell::from(c.as_str()))).style(style)
    });

    frame.render_widget(Table::new(rows, widths).header(header), area);
}

fn render_filter_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let filters = model.view().filters();
    if filters.is_empty() {
        frame.render_widget(Line::from(" no filters".dim()), area);
        return;
    }
    let mut spans = vec![Span::from(" ")];
    for (fidx, filter) in filters.iter().enumerate() {
        if fidx > 0 {
            spans.push(Span::from(" │ "));
        }
        let selected = selected_filter_label(model.view(), fidx);
        let text = format!("{}: {}", filter.label, selected);
        if fidx == model.active_filter() {
            spans.push(Span::from(text).bold().underlined());
        } else {
            spans.push(Span::from(text));
        }
    }
    frame.render_widget(Line::from(spans), area);
}

fn selected_filter_label(view: &TableView, fidx: usize) -> String {
    let filter = &view.filters()[fidx];
    view.active_filter_value(&filter.key)
        .and_then(|v| filter.options.iter().find(|o| o.value == v))
        .map(|o| o.label.clone())
        .unwrap_or_else(|| "All".to_string())
}

fn render_status(model: &Model, frame: &mut Frame, area: Rect) {
    let info = model.view().page_info();
    let line = Line::from(vec![
        Span::from(format!(
            " {} · Page {}/{}",
            info.caption(),
            info.page,
            info.total_pages
        )),
        Span::from(format!(" · {}", model.status_message())).dim(),
    ]);
    frame.render_widget(line, area);
}

fn render_prompt(model: &Model, frame: &mut Frame, area: Rect) {
    if model.searching() {
        let state = model.prompt_state();
        frame.render_widget(Line::from(format!("/{}", state.text)), area);
        frame.set_cursor_position(Position::new(
            area.x + 1 + state.cursor as u16,
            area.y,
        ));
    } else {
        let mut hint = String::from(" ? help · / search · s sort · Tab filter · q quit");
        if let (Some(action), Some(record)) = (
            &model.screen().row_action,
            model.view().visible_record(model.cursor_row()),
        ) {
            hint = format!(" {} · ? help", action(record));
        }
        frame.render_widget(Line::from(hint.dim()), area);
    }
}

fn render_popup(message: &str, frame: &mut Frame) {
    let area = frame.area();
    let lines = message.lines().count() as u16 + 2;
    let width = std::cmp::min(60, area.width.saturating_sub(4));
    let height = std::cmp::min(lines, area.height.saturating_sub(2));
    let popup = Rect {
        x: area.width.saturating_sub(width) / 2,
        y: area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(message).block(Block::bordered().title(" Help ")),
        popup,
    );
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
