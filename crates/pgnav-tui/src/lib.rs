// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use pgnav_app::{
    Browser, CellView, Completion, ConnectionParams, ItemView, NULL_MARKER, PreparedRequest,
    Refresh, RegionId, RegionView, RequestDescriptor, RequestError, RequestSink, STARTUP_DELAY,
    TableView, Ticket,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const BANNER_HINT: &str = "press c to connect, v to validate";
const INPUT_CURSOR: &str = "▏";
const ACTIVE_MARK: &str = "▸ ";

/// Side effects the UI needs from its host.
pub trait AppRuntime {
    fn execute(&mut self, request: &PreparedRequest) -> Completion;
    fn save_api_base(&mut self, api_base: &str) -> Result<()>;
    fn connection_defaults(&self) -> ConnectionParams {
        ConnectionParams::default()
    }
    /// Runs `request` and reports back through `tx`. Hosts override this to
    /// move the work off the UI thread.
    fn spawn_request(&mut self, request: PreparedRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let ticket = request.ticket;
        let completion = self.execute(&request);
        tx.send(InternalEvent::Completed { ticket, completion })
            .map_err(|_| anyhow!("request event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    Startup,
    Completed {
        ticket: Ticket,
        completion: Completion,
    },
}

struct RuntimeSink<'a, R> {
    runtime: &'a mut R,
    tx: &'a Sender<InternalEvent>,
}

impl<R: AppRuntime> RequestSink for RuntimeSink<'_, R> {
    fn submit(&mut self, request: PreparedRequest) -> Result<(), RequestError> {
        self.runtime
            .spawn_request(request, self.tx.clone())
            .map_err(|error| RequestError::TransportFailure(format!("{error:#}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pane {
    #[default]
    Schemas,
    Tables,
    Data,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Self::Schemas => Self::Tables,
            Self::Tables => Self::Data,
            Self::Data => Self::Schemas,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Schemas => Self::Data,
            Self::Tables => Self::Schemas,
            Self::Data => Self::Tables,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ResultView {
    #[default]
    Data,
    Query,
}

impl ResultView {
    fn region(self) -> RegionId {
        match self {
            Self::Data => RegionId::TableData,
            Self::Query => RegionId::QueryResult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Query,
    ApiBase,
    Connect,
}

impl InputKind {
    fn mode_label(self) -> &'static str {
        match self {
            Self::Query => "QUERY",
            Self::ApiBase => "API",
            Self::Connect => "CONNECT",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Query => "query: enter run | esc cancel | ctrl+u clear",
            Self::ApiBase => "API base: enter save | esc cancel | ctrl+u clear",
            Self::Connect => "connect user@host:port/database[?sslmode=require]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InputState {
    kind: InputKind,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    focus: Pane,
    schema_cursor: usize,
    table_cursor: usize,
    data_offset: usize,
    result_view: ResultView,
    input: Option<InputState>,
    last_query: String,
    connect_line: Option<String>,
    help_visible: bool,
}

pub fn run_app<R: AppRuntime>(browser: &mut Browser, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    schedule_startup(&internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(browser, runtime, &internal_tx, &internal_rx);

        let now = Instant::now();
        if let Err(error) = terminal.draw(|frame| render(frame, browser, &view_data, now)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(POLL_INTERVAL).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(browser, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn schedule_startup(internal_tx: &Sender<InternalEvent>) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STARTUP_DELAY);
        let _ = sender.send(InternalEvent::Startup);
    });
}

fn process_internal_events<R: AppRuntime>(
    browser: &mut Browser,
    runtime: &mut R,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::Startup => {
                let mut sink = RuntimeSink {
                    runtime: &mut *runtime,
                    tx,
                };
                browser.boot(&mut sink);
            }
            InternalEvent::Completed { ticket, completion } => {
                browser.complete(ticket, &completion);
            }
        }
    }
}

fn handle_key_event<R: AppRuntime>(
    browser: &mut Browser,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.input.is_some() {
        handle_input_key(browser, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    let mut sink = RuntimeSink {
        runtime: &mut *runtime,
        tx: internal_tx,
    };
    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => view_data.focus = view_data.focus.next(),
        (KeyCode::BackTab, _) => view_data.focus = view_data.focus.prev(),
        (KeyCode::Char('j') | KeyCode::Down, _) => move_cursor(browser, view_data, 1),
        (KeyCode::Char('k') | KeyCode::Up, _) => move_cursor(browser, view_data, -1),
        (KeyCode::Enter, _) => activate(browser, view_data, &mut sink),
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            let refresh = match view_data.focus {
                Pane::Schemas => Refresh::Schemas,
                Pane::Tables => Refresh::Tables,
                Pane::Data => Refresh::TableData,
            };
            browser.refresh(refresh, &mut sink);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            view_data.result_view = match view_data.result_view {
                ResultView::Data => ResultView::Query,
                ResultView::Query => ResultView::Data,
            };
            view_data.data_offset = 0;
        }
        (KeyCode::Char('v'), KeyModifiers::NONE) => {
            browser.request(&RequestDescriptor::validate(), &mut sink);
        }
        (KeyCode::Char('x'), KeyModifiers::NONE) => {
            browser.request(&RequestDescriptor::close(), &mut sink);
        }
        (KeyCode::Char('/'), _) => {
            let last_query = view_data.last_query.clone();
            open_input(view_data, InputKind::Query, last_query);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            let current = browser.selection().api_base.clone();
            open_input(view_data, InputKind::ApiBase, current);
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => {
            let line = view_data
                .connect_line
                .clone()
                .unwrap_or_else(|| format_connection_line(&sink.runtime.connection_defaults()));
            open_input(view_data, InputKind::Connect, line);
        }
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn open_input(view_data: &mut ViewData, kind: InputKind, buffer: String) {
    view_data.input = Some(InputState { kind, buffer });
}

fn handle_input_key<R: AppRuntime>(
    browser: &mut Browser,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(input) = view_data.input.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.input = None,
        KeyCode::Enter => {
            if let Some(input) = view_data.input.take() {
                submit_input(browser, runtime, view_data, internal_tx, input);
            }
        }
        KeyCode::Backspace => {
            input.buffer.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.buffer.clear();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            input.buffer.push(ch);
        }
        _ => {}
    }
}

fn submit_input<R: AppRuntime>(
    browser: &mut Browser,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    input: InputState,
) {
    match input.kind {
        InputKind::Query => {
            view_data.last_query = input.buffer.clone();
            let mut sink = RuntimeSink {
                runtime,
                tx: internal_tx,
            };
            if browser.run_query(&input.buffer, &mut sink).is_some() {
                view_data.result_view = ResultView::Query;
                view_data.data_offset = 0;
            }
        }
        InputKind::ApiBase => {
            let trimmed = input.buffer.trim();
            if !trimmed.is_empty()
                && let Err(error) = pgnav_api::validate_api_base(trimmed)
            {
                browser.notify(&format!("{error:#}"));
                return;
            }
            let Some(api_base) = browser.set_api_base(trimmed) else {
                return;
            };
            if let Err(error) = runtime.save_api_base(&api_base) {
                warn!(error = %format!("{error:#}"), "persist API base");
                browser.notify(&format!("save API base failed: {error:#}"));
            }
        }
        InputKind::Connect => {
            match parse_connection_line(&input.buffer, &runtime.connection_defaults()) {
                Ok(params) => {
                    view_data.connect_line = Some(input.buffer);
                    let mut sink = RuntimeSink {
                        runtime,
                        tx: internal_tx,
                    };
                    browser.request(&RequestDescriptor::connect(&params), &mut sink);
                }
                Err(error) => browser.notify(&format!("{error:#}")),
            }
        }
    }
}

fn activate<R: AppRuntime>(browser: &mut Browser, view_data: &mut ViewData, sink: &mut RuntimeSink<'_, R>) {
    match view_data.focus {
        Pane::Schemas => {
            let Some(label) = item_label(browser, RegionId::Schemas, view_data.schema_cursor) else {
                return;
            };
            browser.select_schema(&label, sink);
            view_data.focus = Pane::Tables;
            view_data.table_cursor = 0;
            view_data.result_view = ResultView::Data;
            view_data.data_offset = 0;
        }
        Pane::Tables => {
            let Some(label) = item_label(browser, RegionId::Tables, view_data.table_cursor) else {
                return;
            };
            browser.select_table(&label, sink);
            if browser.selection().table == label {
                view_data.focus = Pane::Data;
                view_data.result_view = ResultView::Data;
                view_data.data_offset = 0;
            }
        }
        Pane::Data => {}
    }
}

fn item_label(browser: &Browser, region: RegionId, cursor: usize) -> Option<String> {
    browser
        .regions()
        .get(region)?
        .items()
        .get(cursor)
        .map(|item| item.label.clone())
}

fn region_len(browser: &Browser, region: RegionId) -> usize {
    match browser.regions().get(region) {
        Some(RegionView::Items(items)) => items.len(),
        Some(RegionView::Table(table)) => table.rows.len(),
        _ => 0,
    }
}

fn move_cursor(browser: &Browser, view_data: &mut ViewData, delta: isize) {
    let (cursor, len) = match view_data.focus {
        Pane::Schemas => (
            &mut view_data.schema_cursor,
            region_len(browser, RegionId::Schemas),
        ),
        Pane::Tables => (
            &mut view_data.table_cursor,
            region_len(browser, RegionId::Tables),
        ),
        Pane::Data => (
            &mut view_data.data_offset,
            region_len(browser, view_data.result_view.region()),
        ),
    };
    *cursor = shift_cursor(*cursor, delta, len);
}

fn shift_cursor(cursor: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    cursor.saturating_add_signed(delta).min(len - 1)
}

/// Parses `user@host:port/database[?sslmode=require|disable]`. Missing
/// parts keep the values from `defaults`.
pub fn parse_connection_line(line: &str, defaults: &ConnectionParams) -> Result<ConnectionParams> {
    let mut params = defaults.clone();
    let trimmed = line.trim();
    let (main, options) = trimmed.split_once('?').unwrap_or((trimmed, ""));
    let (address, database) = main.split_once('/').unwrap_or((main, ""));
    let (username, host_port) = match address.rsplit_once('@') {
        Some((username, host_port)) => (username, host_port),
        None => ("", address),
    };
    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    };

    if !username.is_empty() {
        params.username = username.to_owned();
    }
    if !host.is_empty() {
        params.host = host.to_owned();
    }
    if let Some(port) = port {
        params.port = port
            .parse::<u16>()
            .ok()
            .filter(|port| *port > 0)
            .ok_or_else(|| anyhow!("port {port:?} must be a number between 1 and 65535"))?;
    }
    if !database.is_empty() {
        params.database = database.to_owned();
    }
    for option in options.split('&').filter(|option| !option.is_empty()) {
        match option.split_once('=') {
            Some(("sslmode", "require")) => params.ssl_mode = true,
            Some(("sslmode", "disable")) => params.ssl_mode = false,
            _ => bail!(
                "unsupported connection option {option:?}; use sslmode=require or sslmode=disable"
            ),
        }
    }

    if params.database.trim().is_empty() {
        bail!("database must not be empty; use user@host:port/database");
    }
    Ok(params)
}

pub fn format_connection_line(params: &ConnectionParams) -> String {
    let mut line = format!(
        "{}@{}:{}/{}",
        params.username, params.host, params.port, params.database
    );
    if params.ssl_mode {
        line.push_str("?sslmode=require");
    }
    line
}

fn render(frame: &mut ratatui::Frame<'_>, browser: &Browser, view_data: &ViewData, now: Instant) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_lines(browser))
        .block(Block::default().title("pgnav").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(28), Constraint::Percentage(72)])
        .split(layout[1]);
    let lists = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(body[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(3)])
        .split(body[1]);
    let details = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(right[0]);

    let focused = |pane: Pane| view_data.input.is_none() && view_data.focus == pane;
    let panels = [
        (RegionId::Schemas, lists[0], focused(Pane::Schemas).then_some(view_data.schema_cursor), 0),
        (RegionId::Tables, lists[1], focused(Pane::Tables).then_some(view_data.table_cursor), 0),
        (RegionId::Columns, details[0], None, 0),
        (RegionId::Indexes, details[1], None, 0),
        (RegionId::Views, details[2], None, 0),
        (
            view_data.result_view.region(),
            right[1],
            focused(Pane::Data).then_some(view_data.data_offset),
            view_data.data_offset,
        ),
    ];
    for (region, area, cursor, offset) in panels {
        render_region(frame, area, browser.regions().get(region), region, cursor, offset);
    }

    let status = Paragraph::new(status_text(browser, view_data, now))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(input) = &view_data.input {
        let area = centered_rect(70, 20, frame.area());
        frame.render_widget(Clear, area);
        let editor = Paragraph::new(format!("{}{INPUT_CURSOR}", input.buffer)).block(
            Block::default()
                .title(input.kind.title())
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(editor, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn header_lines(browser: &Browser) -> Vec<Line<'static>> {
    let banner = match browser.regions().get(RegionId::ConnectBanner) {
        Some(RegionView::Message(text)) => Span::styled(text.clone(), Style::default().fg(Color::Green)),
        Some(RegionView::Placeholder(text)) => {
            Span::styled(text.clone(), Style::default().fg(Color::DarkGray))
        }
        _ => Span::styled(BANNER_HINT, Style::default().fg(Color::DarkGray)),
    };
    vec![
        Line::from(vec![
            Span::styled(
                browser.schema_chip(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" | "),
            Span::styled(
                browser.table_chip(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" | api: {}", browser.selection().api_base)),
        ]),
        Line::from(banner),
    ]
}

fn region_block(region: RegionId, focused: bool) -> Block<'static> {
    let block = Block::default().title(region.title()).borders(Borders::ALL);
    if focused {
        block.border_style(Style::default().fg(Color::Cyan))
    } else {
        block
    }
}

fn render_region(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    view: Option<&RegionView>,
    region: RegionId,
    cursor: Option<usize>,
    offset: usize,
) {
    let block = region_block(region, cursor.is_some());
    match view {
        None => frame.render_widget(Paragraph::new(String::new()).block(block), area),
        Some(RegionView::Placeholder(text)) => frame.render_widget(
            Paragraph::new(text.clone())
                .style(Style::default().fg(Color::DarkGray))
                .block(block),
            area,
        ),
        Some(RegionView::Message(text)) => {
            frame.render_widget(Paragraph::new(text.clone()).block(block), area);
        }
        Some(RegionView::Items(items)) => {
            frame.render_widget(Paragraph::new(item_lines(items, cursor)).block(block), area);
        }
        Some(RegionView::Table(table)) => {
            frame.render_widget(result_table(table, offset).block(block), area);
        }
    }
}

fn item_lines(items: &[ItemView], cursor: Option<usize>) -> Vec<Line<'static>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let mut label_style = Style::default();
            if item.active {
                label_style = label_style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            let mut spans = vec![
                Span::raw(if item.active { ACTIVE_MARK } else { "  " }),
                Span::styled(item.label.clone(), label_style),
            ];
            if let Some(annotation) = &item.annotation {
                spans.push(Span::styled(
                    format!("  {annotation}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            let line = Line::from(spans);
            if cursor == Some(index) {
                line.style(Style::default().bg(Color::DarkGray))
            } else {
                line
            }
        })
        .collect()
}

fn result_table(table: &TableView, offset: usize) -> Table<'static> {
    let count = u32::try_from(table.columns.len().max(1)).unwrap_or(u32::MAX);
    let widths = vec![Constraint::Ratio(1, count); table.columns.len().max(1)];
    let header = Row::new(table.columns.iter().map(|column| {
        Cell::from(column.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let rows = table.rows.iter().skip(offset).map(|row| {
        Row::new(row.iter().map(|cell| match cell {
            CellView::Null => Cell::from(NULL_MARKER).style(
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ),
            CellView::Text(text) => Cell::from(text.clone()),
        }))
    });
    Table::new(rows, widths).header(header).column_spacing(1)
}

fn status_text(browser: &Browser, view_data: &ViewData, now: Instant) -> String {
    let mode = view_data
        .input
        .as_ref()
        .map_or("NAV", |input| input.kind.mode_label());
    let hints = "tab pane | j/k move | enter select | r refresh | / query | d data/query | c/v/x connect/validate/close | a api | ? help | ctrl+q";
    match browser.notifications().visible_at(now) {
        Some(message) => format!("{mode} | {message} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
nav: tab/shift+tab pane | j/k or up/down move | enter select schema/table\n\
nav: r refresh focused pane | d switch data/query result\n\
query: / open editor | enter run | esc cancel | ctrl+u clear\n\
connection: c connect | v validate | x close\n\
settings: a edit API base (saved for next launch)"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, InternalEvent, Pane, ResultView, ViewData, format_connection_line,
        handle_key_event, help_overlay_text, parse_connection_line, process_internal_events,
        render, shift_cursor, status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use pgnav_app::{
        Browser, Completion, ConnectionParams, Method, NOTIFICATION_TTL, NO_DATA, NO_INDEXES,
        NO_ROWS, PreparedRequest, RegionId, RegionView,
    };
    use pgnav_testkit::{Catalog, DemoState};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;
    use std::time::Instant;

    const API_BASE: &str = "http://api.test";

    struct TestRuntime {
        api: DemoState,
        executed: Vec<String>,
        saved_api_base: Option<String>,
        fail_save: bool,
    }

    impl Default for TestRuntime {
        fn default() -> Self {
            Self {
                api: DemoState::new(Catalog::default()),
                executed: Vec::new(),
                saved_api_base: None,
                fail_save: false,
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn execute(&mut self, request: &PreparedRequest) -> Completion {
            let path = request
                .url
                .strip_prefix(API_BASE)
                .unwrap_or(&request.url)
                .to_owned();
            self.executed
                .push(format!("{} {path}", request.method.as_str()));
            let method = match request.method {
                Method::Get => tiny_http::Method::Get,
                Method::Post => tiny_http::Method::Post,
            };
            let body = request
                .body
                .as_ref()
                .map(|body| body.to_string())
                .unwrap_or_default();
            let reply = self.api.handle(&method, &path, &body);
            Completion::Response {
                status: reply.status,
                body: reply.body,
            }
        }

        fn save_api_base(&mut self, api_base: &str) -> anyhow::Result<()> {
            if self.fail_save {
                anyhow::bail!("disk full");
            }
            self.saved_api_base = Some(api_base.to_owned());
            Ok(())
        }
    }

    struct Harness {
        browser: Browser,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::channel();
            Self {
                browser: Browser::new(API_BASE),
                runtime: TestRuntime::default(),
                view_data: ViewData::default(),
                tx,
                rx,
            }
        }

        fn started() -> Self {
            let mut harness = Self::new();
            harness.send(InternalEvent::Startup);
            harness
        }

        fn pump(&mut self) {
            process_internal_events(&mut self.browser, &mut self.runtime, &self.tx, &self.rx);
        }

        fn send(&mut self, event: InternalEvent) {
            self.tx.send(event).expect("channel open");
            self.pump();
        }

        fn key(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.browser,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            self.pump();
            quit
        }

        fn press(&mut self, code: KeyCode) {
            self.key(KeyEvent::new(code, KeyModifiers::NONE));
        }

        fn ctrl(&mut self, ch: char) -> bool {
            self.key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn labels(&self, region: RegionId) -> Vec<String> {
            self.browser
                .regions()
                .get(region)
                .map(|view| view.items().iter().map(|item| item.label.clone()).collect())
                .unwrap_or_default()
        }

        fn toast(&self) -> Option<&str> {
            self.browser
                .notifications()
                .latest()
                .map(|notification| notification.message.as_str())
        }

        fn executed_since(&self, start: usize) -> Vec<&str> {
            self.runtime.executed[start..]
                .iter()
                .map(String::as_str)
                .collect()
        }
    }

    #[test]
    fn startup_event_loads_schema_list_once() {
        let mut harness = Harness::started();
        harness.send(InternalEvent::Startup);

        assert_eq!(harness.runtime.executed, vec!["GET /schemas"]);
        assert_eq!(harness.labels(RegionId::Schemas), vec!["public", "reporting"]);
    }

    #[test]
    fn enter_on_schema_cascades_and_focuses_tables() {
        let mut harness = Harness::started();
        let start = harness.runtime.executed.len();
        harness.press(KeyCode::Enter);

        assert_eq!(
            harness.executed_since(start),
            vec![
                "GET /schemas/public/tables",
                "GET /schemas/public/views",
                "GET /schemas/public/indexes",
            ]
        );
        assert_eq!(harness.browser.schema_chip(), "Schema: public");
        assert_eq!(harness.browser.table_chip(), "No table selected");
        assert_eq!(harness.view_data.focus, Pane::Tables);
        assert_eq!(
            harness.labels(RegionId::Tables),
            vec!["customers", "orders", "order items"]
        );
        assert_eq!(harness.labels(RegionId::Views), vec!["active_customers"]);
    }

    #[test]
    fn selecting_table_loads_columns_then_rows() {
        let mut harness = Harness::started();
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Char('j'));
        harness.press(KeyCode::Char('j'));
        let start = harness.runtime.executed.len();
        harness.press(KeyCode::Enter);

        assert_eq!(
            harness.executed_since(start),
            vec![
                "GET /schemas/public/tables/order%20items/columns",
                "GET /schemas/public/tables/order%20items/data",
            ]
        );
        assert_eq!(harness.browser.table_chip(), "Table: order items");
        assert_eq!(harness.view_data.focus, Pane::Data);
        assert_eq!(
            harness.browser.regions().get(RegionId::TableData),
            Some(&RegionView::placeholder(NO_ROWS))
        );
        assert!(matches!(
            harness.browser.regions().get(RegionId::Columns),
            Some(RegionView::Table(_))
        ));
    }

    #[test]
    fn second_schema_shows_empty_placeholders() {
        let mut harness = Harness::started();
        harness.press(KeyCode::Down);
        harness.press(KeyCode::Enter);

        assert_eq!(harness.browser.schema_chip(), "Schema: reporting");
        assert_eq!(harness.labels(RegionId::Tables), vec!["monthly_revenue"]);
        assert_eq!(
            harness.browser.regions().get(RegionId::Indexes),
            Some(&RegionView::placeholder(NO_INDEXES))
        );
        assert_eq!(
            harness.browser.regions().get(RegionId::Views),
            Some(&RegionView::placeholder(NO_DATA))
        );
    }

    #[test]
    fn cursor_stays_within_list_bounds() {
        let mut harness = Harness::started();
        for _ in 0..5 {
            harness.press(KeyCode::Char('j'));
        }
        assert_eq!(harness.view_data.schema_cursor, 1);
        for _ in 0..5 {
            harness.press(KeyCode::Char('k'));
        }
        assert_eq!(harness.view_data.schema_cursor, 0);
        assert_eq!(shift_cursor(3, 1, 0), 0);
    }

    #[test]
    fn query_editor_runs_query_and_shows_result() {
        let mut harness = Harness::started();
        harness.press(KeyCode::Char('/'));
        harness.type_text("select * from orders");
        harness.press(KeyCode::Enter);

        assert!(harness.view_data.input.is_none());
        assert_eq!(harness.view_data.result_view, ResultView::Query);
        assert_eq!(harness.runtime.executed.last().map(String::as_str), Some("POST /query"));
        let Some(RegionView::Table(table)) = harness.browser.regions().get(RegionId::QueryResult)
        else {
            panic!("expected query result table");
        };
        assert_eq!(table.columns, vec!["id", "customer_id", "total_cents", "tags"]);
        assert_eq!(table.rows[0][3].text(), "gift, rush");

        harness.press(KeyCode::Char('/'));
        assert_eq!(
            harness.view_data.input.as_ref().map(|input| input.buffer.as_str()),
            Some("select * from orders")
        );
    }

    #[test]
    fn empty_query_notifies_without_request() {
        let mut harness = Harness::started();
        let start = harness.runtime.executed.len();
        harness.press(KeyCode::Char('/'));
        harness.type_text("   ");
        harness.press(KeyCode::Enter);

        assert!(harness.executed_since(start).is_empty());
        assert_eq!(harness.toast(), Some("Query must not be empty"));
    }

    #[test]
    fn failed_query_surfaces_server_text() {
        let mut harness = Harness::started();
        harness.press(KeyCode::Char('/'));
        harness.type_text("selec 1");
        harness.press(KeyCode::Enter);

        let toast = harness.toast().unwrap_or_default();
        assert!(toast.contains("syntax error"), "{toast}");
        assert!(harness.browser.regions().get(RegionId::QueryResult).is_none());
    }

    #[test]
    fn escape_cancels_editor_without_sending() {
        let mut harness = Harness::started();
        let start = harness.runtime.executed.len();
        harness.press(KeyCode::Char('/'));
        harness.type_text("select 1");
        harness.press(KeyCode::Esc);

        assert!(harness.view_data.input.is_none());
        assert!(harness.executed_since(start).is_empty());
        assert_eq!(harness.view_data.last_query, "");
    }

    #[test]
    fn api_base_editor_saves_trimmed_value() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('a'));
        harness.ctrl('u');
        harness.type_text(" http://db.local:9000 ");
        harness.press(KeyCode::Enter);

        assert_eq!(
            harness.runtime.saved_api_base.as_deref(),
            Some("http://db.local:9000")
        );
        assert_eq!(harness.browser.selection().api_base, "http://db.local:9000");
        assert_eq!(harness.toast(), Some("API base updated"));
    }

    #[test]
    fn blank_api_base_is_not_saved() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('a'));
        harness.ctrl('u');
        harness.press(KeyCode::Enter);

        assert_eq!(harness.runtime.saved_api_base, None);
        assert_eq!(harness.browser.selection().api_base, API_BASE);
        assert_eq!(harness.toast(), Some("API base must not be empty"));
    }

    #[test]
    fn invalid_api_base_keeps_current_value() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Char('a'));
        harness.ctrl('u');
        harness.type_text("localhost:8080");
        harness.press(KeyCode::Enter);

        assert_eq!(harness.browser.selection().api_base, API_BASE);
        assert_eq!(harness.runtime.saved_api_base, None);
        assert_eq!(harness.browser.notifications().shown_count(), 1);
        let toast = harness.toast().unwrap_or_default();
        assert!(toast.contains("unsupported scheme"), "{toast}");
    }

    #[test]
    fn api_base_save_failure_is_reported() {
        let mut harness = Harness::new();
        harness.runtime.fail_save = true;
        harness.press(KeyCode::Char('a'));
        harness.press(KeyCode::Backspace);
        harness.press(KeyCode::Char('1'));
        harness.press(KeyCode::Enter);

        assert_eq!(harness.browser.selection().api_base, "http://api.tes1");
        assert_eq!(harness.toast(), Some("save API base failed: disk full"));
    }

    #[test]
    fn connect_validate_close_round_trip() {
        let mut harness = Harness::started();

        harness.press(KeyCode::Char('c'));
        assert_eq!(
            harness.view_data.input.as_ref().map(|input| input.buffer.as_str()),
            Some("postgres@localhost:5432/postgres")
        );
        harness.press(KeyCode::Enter);
        assert_eq!(
            harness.browser.regions().get(RegionId::ConnectBanner),
            Some(&RegionView::Message("Connected to database postgres".to_owned()))
        );

        harness.press(KeyCode::Char('v'));
        assert_eq!(harness.toast(), Some("Database postgres connection is healthy"));

        harness.press(KeyCode::Char('x'));
        assert_eq!(harness.toast(), Some("Database connection closed successfully"));
        assert_eq!(
            harness.browser.regions().get(RegionId::ConnectBanner),
            Some(&RegionView::placeholder("Not connected"))
        );

        harness.press(KeyCode::Char('r'));
        assert_eq!(
            harness.toast(),
            Some("No active connection. Call POST /connect first")
        );
    }

    #[test]
    fn invalid_connect_line_is_reported_locally() {
        let mut harness = Harness::started();
        let start = harness.runtime.executed.len();
        harness.press(KeyCode::Char('c'));
        harness.ctrl('u');
        harness.type_text("me@db:notaport/shop");
        harness.press(KeyCode::Enter);

        assert!(harness.executed_since(start).is_empty());
        let toast = harness.toast().unwrap_or_default();
        assert!(toast.contains("between 1 and 65535"), "{toast}");
    }

    #[test]
    fn help_overlay_swallows_keys_until_closed() {
        let mut harness = Harness::started();
        harness.press(KeyCode::Char('?'));
        assert!(harness.view_data.help_visible);
        harness.press(KeyCode::Enter);
        assert_eq!(harness.browser.schema_chip(), "No schema selected");
        harness.press(KeyCode::Esc);
        assert!(!harness.view_data.help_visible);
        assert!(help_overlay_text().contains("ctrl+q quit"));
    }

    #[test]
    fn tab_cycles_panes() {
        let mut harness = Harness::new();
        harness.press(KeyCode::Tab);
        assert_eq!(harness.view_data.focus, Pane::Tables);
        harness.press(KeyCode::Tab);
        assert_eq!(harness.view_data.focus, Pane::Data);
        harness.press(KeyCode::BackTab);
        assert_eq!(harness.view_data.focus, Pane::Tables);
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::new();
        assert!(harness.ctrl('q'));
        assert!(!harness.key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
    }

    #[test]
    fn status_text_shows_toast_until_expiry() {
        let mut harness = Harness::new();
        harness.browser.notify("API base updated");
        let now = Instant::now();
        let status = status_text(&harness.browser, &harness.view_data, now);
        assert!(status.starts_with("NAV | API base updated | "));

        let later = now + NOTIFICATION_TTL;
        let status = status_text(&harness.browser, &harness.view_data, later);
        assert!(!status.contains("API base updated"));

        harness.press(KeyCode::Char('/'));
        assert!(status_text(&harness.browser, &harness.view_data, later).starts_with("QUERY | "));
    }

    #[test]
    fn connection_line_parsing_fills_defaults() -> anyhow::Result<()> {
        let defaults = ConnectionParams::default();
        assert_eq!(parse_connection_line("", &defaults)?, defaults);

        let parsed = parse_connection_line("app@db.internal:6543/shop?sslmode=require", &defaults)?;
        assert_eq!(parsed.username, "app");
        assert_eq!(parsed.host, "db.internal");
        assert_eq!(parsed.port, 6543);
        assert_eq!(parsed.database, "shop");
        assert!(parsed.ssl_mode);
        assert_eq!(
            format_connection_line(&parsed),
            "app@db.internal:6543/shop?sslmode=require"
        );

        let host_only = parse_connection_line("replica", &defaults)?;
        assert_eq!(host_only.host, "replica");
        assert_eq!(host_only.username, "postgres");

        assert!(parse_connection_line("db:0/shop", &defaults).is_err());
        assert!(parse_connection_line("db/shop?sslmode=verify-full", &defaults).is_err());
        Ok(())
    }

    #[test]
    fn render_draws_chips_and_null_cells() -> anyhow::Result<()> {
        let mut harness = Harness::started();
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Enter);
        assert_eq!(harness.browser.table_chip(), "Table: customers");

        let mut terminal = Terminal::new(TestBackend::new(140, 40))?;
        let now = Instant::now();
        terminal.draw(|frame| render(frame, &harness.browser, &harness.view_data, now))?;
        let screen: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();

        assert!(screen.contains("Schema: public"));
        assert!(screen.contains("Table: customers"));
        assert!(screen.contains("Jordan Hill"));
        assert!(screen.contains("NULL"));
        assert!(screen.contains("PRIMARY KEY"));
        Ok(())
    }
}
