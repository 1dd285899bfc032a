use anyhow::Result;
use chrono::Utc;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::board::JobBoard;
use crate::db::KeyValueStore;
use crate::display::{
    applicants_label, apply_path, badge_style, format_job_type, html_to_text, logo_url, time_since,
};
use crate::filters::{EXPERIENCE_LEVELS, FacetKind};
use crate::models::{Job, JobType, JobsPage};
use crate::query::{FetchError, JobSource, PendingFetch};
use crate::selection::LayoutClass;

type Completion = (u64, Result<JobsPage, FetchError>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    EditSearch,
    EditLocation,
    Filters,
}

fn facet_options() -> Vec<(FacetKind, String)> {
    JobType::ALL
        .iter()
        .map(|t| (FacetKind::JobType, t.as_str().to_string()))
        .chain(EXPERIENCE_LEVELS.iter().map(|e| (FacetKind::Experience, e.to_string())))
        .collect()
}

struct App<S: KeyValueStore> {
    board: JobBoard<S>,
    cursor: usize,
    scroll_offset: u16,
    mode: Mode,
    filter_cursor: usize,
    quit: bool,
}

impl<S: KeyValueStore> App<S> {
    fn new(board: JobBoard<S>) -> Self {
        Self {
            board,
            cursor: 0,
            scroll_offset: 0,
            mode: Mode::Browse,
            filter_cursor: 0,
            quit: false,
        }
    }

    fn highlighted(&self) -> Option<&Job> {
        self.board.results().get(self.cursor)
    }

    fn next(&mut self) {
        let len = self.board.results().len();
        if len > 0 && self.cursor < len - 1 {
            self.cursor += 1;
        }
    }

    fn prev(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn complete(&mut self, seq: u64, result: Result<JobsPage, FetchError>) {
        let before = self.board.selected().map(|job| job.id.clone());
        self.board.complete_fetch(seq, result);
        if self.board.selected().map(|job| &job.id) != before.as_ref() {
            self.scroll_offset = 0;
        }
        let len = self.board.results().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<PendingFetch> {
        match self.mode {
            Mode::Browse => self.handle_browse_key(key),
            Mode::EditSearch | Mode::EditLocation => self.handle_edit_key(key),
            Mode::Filters => self.handle_filter_key(key),
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Option<PendingFetch> {
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Esc => {
                if self.board.detail_foregrounded() {
                    self.board.dismiss_detail();
                } else {
                    self.quit = true;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(3)
            }
            KeyCode::Char('K') | KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(3)
            }
            KeyCode::Enter => {
                if self.board.select_index(self.cursor) {
                    self.scroll_offset = 0;
                }
            }
            KeyCode::Char('b') => {
                let target = if self.board.detail_foregrounded() {
                    self.board.selected()
                } else {
                    self.highlighted()
                };
                if let Some(id) = target.map(|job| job.id.clone()) {
                    self.board.toggle_saved(&id);
                }
            }
            KeyCode::Char('/') => self.mode = Mode::EditSearch,
            KeyCode::Char('l') => self.mode = Mode::EditLocation,
            KeyCode::Char('f') => self.mode = Mode::Filters,
            KeyCode::Char('s') => {
                let next = self.board.filters().sort_by.next();
                return self.board.set_sort(next);
            }
            KeyCode::Char('C') => return self.board.clear_all(),
            KeyCode::Char('n') | KeyCode::Right => return self.board.next_page(),
            KeyCode::Char('p') | KeyCode::Left => return self.board.prev_page(),
            _ => {}
        }
        None
    }

    fn handle_edit_key(&mut self, key: KeyEvent) -> Option<PendingFetch> {
        let mut text = match self.mode {
            Mode::EditLocation => self.board.filters().location.clone(),
            _ => self.board.filters().search_query.clone(),
        };
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.mode = Mode::Browse;
                return None;
            }
            KeyCode::Backspace => {
                text.pop();
            }
            KeyCode::Char(c) => text.push(c),
            _ => return None,
        }
        // One fetch per keystroke.
        match self.mode {
            Mode::EditLocation => self.board.set_location(&text),
            _ => self.board.set_search_query(&text),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Option<PendingFetch> {
        let options = facet_options();
        match key.code {
            KeyCode::Esc | KeyCode::Char('f') | KeyCode::Char('q') => self.mode = Mode::Browse,
            KeyCode::Down | KeyCode::Char('j') => {
                self.filter_cursor = (self.filter_cursor + 1).min(options.len() - 1)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.filter_cursor = self.filter_cursor.saturating_sub(1)
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                let (kind, value) = &options[self.filter_cursor];
                return self.board.toggle_facet(*kind, value);
            }
            KeyCode::Char('C') => return self.board.clear_all(),
            _ => {}
        }
        None
    }
}

fn dispatch(source: &Arc<dyn JobSource>, tx: &Sender<Completion>, pending: PendingFetch) {
    let source = Arc::clone(source);
    let tx = tx.clone();
    thread::spawn(move || {
        let result = source.search(&pending.query);
        // The receiver is gone once the screen has closed.
        let _ = tx.send((pending.seq, result));
    });
}

pub fn run_browse<S: KeyValueStore>(
    source: Arc<dyn JobSource>,
    mount: impl FnOnce(LayoutClass) -> (JobBoard<S>, PendingFetch),
) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let layout = LayoutClass::from_width(terminal.size()?.width);
    let (board, initial) = mount(layout);
    let mut app = App::new(board);

    let (tx, rx) = mpsc::channel();
    dispatch(&source, &tx, initial);

    let result = run_loop(&mut terminal, &mut app, &source, &tx, &rx);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result?;
    info!("job board closed");
    app.board.unmount()
}

fn run_loop<S: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App<S>,
    source: &Arc<dyn JobSource>,
    tx: &Sender<Completion>,
    rx: &Receiver<Completion>,
) -> Result<()> {
    let mut list_state = ListState::default();

    while !app.quit {
        while let Ok((seq, result)) = rx.try_recv() {
            app.complete(seq, result);
        }

        list_state.select((!app.board.results().is_empty()).then_some(app.cursor));
        terminal.draw(|frame| draw(frame, app, &mut list_state))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(pending) = app.handle_key(key) {
                    dispatch(source, tx, pending);
                }
            }
            Event::Resize(width, _) => app.board.set_layout(LayoutClass::from_width(width)),
            _ => {}
        }
    }
    Ok(())
}

fn draw<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    frame.render_widget(build_header(app), rows[0]);

    match app.board.layout() {
        LayoutClass::Wide => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(rows[1]);
            draw_list(frame, app, list_state, panes[0]);
            draw_detail(frame, app, panes[1]);
        }
        LayoutClass::Narrow => {
            if app.board.detail_foregrounded() {
                draw_detail(frame, app, rows[1]);
            } else {
                draw_list(frame, app, list_state, rows[1]);
            }
        }
    }

    if app.mode == Mode::Filters {
        draw_filters(frame, app, rows[1]);
    }

    let help = match app.mode {
        Mode::Browse => {
            " j/k:move  enter:open  b:save  /:search  l:location  f:filters  s:sort  C:clear  n/p:page  q:quit"
        }
        Mode::EditSearch | Mode::EditLocation => " type to search  enter/esc:done",
        Mode::Filters => " j/k:move  space:toggle  C:clear  esc:close",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[2],
    );
}

fn build_header<S: KeyValueStore>(app: &App<S>) -> Paragraph<'_> {
    let filters = app.board.filters();
    let pager = app.board.pager();
    let editing = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let field_style = |mode: Mode| {
        if app.mode == mode {
            editing
        } else {
            Style::default()
        }
    };

    let mut status = vec![Span::raw(format!(
        "sort: {}  filters: {}  page {}/{}  ({} jobs)  saved: {}",
        filters.sort_by.as_str(),
        filters.active_filters_count(),
        pager.page,
        pager.total_pages.max(1),
        pager.total_count,
        app.board.saved_count(),
    ))];
    if app.board.loading() {
        status.push(Span::styled("  loading...", Style::default().fg(Color::Cyan)));
    }
    if let Some(err) = app.board.last_error() {
        status.push(Span::styled(format!("  error: {}", err), Style::default().fg(Color::Red)));
    }

    let lines = vec![
        Line::from(vec![
            Span::styled(format!("Search: {}", filters.search_query), field_style(Mode::EditSearch)),
            Span::raw("   "),
            Span::styled(format!("Location: {}", filters.location), field_style(Mode::EditLocation)),
        ]),
        Line::from(status),
    ];
    Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM))
}

fn draw_list<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, list_state: &mut ListState, area: Rect) {
    let selected_id = app.board.selected().map(|job| &job.id);
    let items: Vec<ListItem> = app
        .board
        .results()
        .iter()
        .map(|job| {
            let saved = if app.board.is_saved(&job.id) { "*" } else { " " };
            let open = if Some(&job.id) == selected_id { ">" } else { " " };
            let title = if job.title.chars().count() > 35 {
                format!("{}...", job.title.chars().take(32).collect::<String>())
            } else {
                job.title.clone()
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}{} {} | {} ", saved, open, title, job.company)),
                Span::styled(format_job_type(&job.job_type).to_string(), badge_style(&job.job_type)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({}) ",
            app.board.results().len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, list_state);
}

fn draw_detail<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let detail = Paragraph::new(build_detail(app))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset, 0));
    frame.render_widget(detail, area);
}

fn draw_filters<S: KeyValueStore>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let filters = app.board.filters();
    let items: Vec<ListItem> = facet_options()
        .iter()
        .map(|(kind, value)| {
            let mark = if filters.has_facet(*kind, value) { "[x]" } else { "[ ]" };
            let label = match kind {
                FacetKind::JobType => format_job_type(&JobType::from(value.clone())).to_string(),
                _ => value.clone(),
            };
            ListItem::new(format!("{} {}", mark, label))
        })
        .collect();

    let popup = Rect {
        x: area.x + area.width.saturating_sub(34) / 2,
        y: area.y + 1,
        width: area.width.min(34),
        height: area.height.min(items.len() as u16 + 2),
    };
    let mut state = ListState::default();
    state.select(Some(app.filter_cursor));

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Type / Experience "))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    frame.render_widget(Clear, popup);
    frame.render_stateful_widget(list, popup, &mut state);
}

fn build_detail<S: KeyValueStore>(app: &App<S>) -> Text<'_> {
    let Some(job) = app.board.selected() else {
        return Text::raw("No job selected");
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let mut lines: Vec<Line> = Vec::new();

    let mut title = vec![Span::styled(job.title.clone(), bold)];
    if job.urgent {
        title.push(Span::styled("  URGENT", Style::default().fg(Color::Red)));
    }
    lines.push(Line::from(title));

    let verified = if job.company_verified { " (verified)" } else { "" };
    lines.push(Line::from(format!("at {}{}", job.company, verified)));
    if let Some(url) = logo_url(job) {
        lines.push(Line::from(Span::styled(format!("Logo: {}", url), dim)));
    }

    let remote = if job.remote { " · Remote" } else { "" };
    lines.push(Line::from(vec![
        Span::styled(format_job_type(&job.job_type).to_string(), badge_style(&job.job_type)),
        Span::raw(format!("  {}{}", job.location, remote)),
    ]));

    if let Some(salary) = &job.salary {
        lines.push(Line::from(format!("Salary: {}", salary)));
    }

    let mut meta = format!(
        "Posted {}  ·  {}",
        time_since(job.posted_date, Utc::now()),
        applicants_label(job)
    );
    if let Some(exp) = &job.experience {
        meta.push_str(&format!("  ·  Min. {}", exp));
    }
    lines.push(Line::from(Span::styled(meta, dim)));

    if job.has_applied {
        lines.push(Line::from(Span::styled("Applied", Style::default().fg(Color::Green))));
    } else {
        lines.push(Line::from(format!("Apply: {}", apply_path(job))));
    }
    if app.board.is_saved(&job.id) {
        lines.push(Line::from(Span::styled("Saved", Style::default().fg(Color::Yellow))));
    }
    lines.push(Line::from(""));

    let sections = [
        ("Description", job.description.as_deref()),
        ("Requirements", job.requirements.as_deref()),
    ];
    for (heading, body) in sections {
        let Some(html) = body else { continue };
        lines.push(Line::from(Span::styled(heading, bold)));
        for line in textwrap::fill(&html_to_text(html), 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    if let Some(benefits) = job.benefits.as_ref().filter(|b| !b.is_empty()) {
        lines.push(Line::from(Span::styled("Benefits", bold)));
        for benefit in benefits {
            lines.push(Line::from(format!("  - {}", benefit)));
        }
    }

    Text::from(lines)
}
