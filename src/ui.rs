use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::feed::{FeedView, Snapshot};
use crate::model::{FeedContext, Item};
use crate::scroll::Geometry;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(250, 179, 135);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Each item is drawn as a title row and a metadata row.
const ROWS_PER_ITEM: usize = 2;
const PAGE_STEP: usize = 5;

pub struct Options {
    pub feed: FeedView,
    pub initial_context: FeedContext,
    pub tick_rate: Duration,
}

#[derive(Clone, Copy)]
enum LinkTarget {
    Permalink,
    Target,
}

impl LinkTarget {
    fn resolve(self, item: &Item) -> (String, &'static str) {
        match self {
            LinkTarget::Permalink => (item.permalink.clone(), "post"),
            LinkTarget::Target => (item.target_url.clone(), "link"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    Feed(String),
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

/// Raw mode, alternate screen and mouse capture for as long as the guard lives.
/// Mouse capture is the source of scroll geometry events.
struct TerminalGuard;

impl TerminalGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let guard = TerminalGuard;
        let mut stdout = io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .context("enter alternate screen")?;
        stdout
            .execute(EnableMouseCapture)
            .context("enable mouse capture")?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = stdout.execute(DisableMouseCapture);
        let _ = stdout.execute(LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

pub struct Model {
    feed: FeedView,
    snapshot: Snapshot,
    initial_context: FeedContext,
    tick_rate: Duration,
    input: InputMode,
    selected: usize,
    offset: usize,
    list_rows: u16,
    status_message: String,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let snapshot = options.feed.snapshot();
        Self {
            feed: options.feed,
            snapshot,
            initial_context: options.initial_context,
            tick_rate: options.tick_rate,
            input: InputMode::Normal,
            selected: 0,
            offset: 0,
            list_rows: 0,
            status_message: String::new(),
            spinner: Spinner::new(),
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let _guard = TerminalGuard::acquire()?;
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend).context("create terminal")?;
        terminal.clear()?;

        self.reset_to(self.initial_context.clone());
        let result = self.event_loop(&mut terminal);
        terminal.show_cursor()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            self.sync_feed();

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(_, _) => {
                        self.mark_dirty();
                        self.check_scroll();
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                last_tick = Instant::now();
                if self.snapshot.is_loading {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    /// Applies finished fetches. Geometry is re-checked only when more items became
    /// visible; failures and filtered-out pages wait for the user to scroll or refresh.
    fn sync_feed(&mut self) {
        if !self.feed.poll() {
            return;
        }
        let shown = self.snapshot.visible_items.len();
        self.refresh_snapshot();
        if !self.snapshot.is_loading {
            self.status_message.clear();
        }
        if self.snapshot.error.is_none() && self.snapshot.visible_items.len() > shown {
            self.check_scroll();
        }
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn refresh_snapshot(&mut self) {
        self.snapshot = self.feed.snapshot();
        let len = self.snapshot.visible_items.len();
        self.selected = self.selected.min(len.saturating_sub(1));
        self.offset = self.offset.min(len.saturating_sub(1));
        self.mark_dirty();
    }

    fn reset_to(&mut self, context: FeedContext) {
        self.status_message = format!("Loading {context}…");
        self.feed.request_reset(context);
        self.selected = 0;
        self.offset = 0;
        self.spinner.reset();
        self.refresh_snapshot();
    }

    fn current_context(&self) -> FeedContext {
        self.feed
            .context()
            .cloned()
            .unwrap_or_else(|| self.initial_context.clone())
    }

    fn geometry(&self) -> Geometry {
        let rows = |items: usize| u32::try_from(items * ROWS_PER_ITEM).unwrap_or(u32::MAX);
        Geometry {
            viewport_height: u32::from(self.list_rows),
            scroll_offset: rows(self.offset),
            content_height: rows(self.snapshot.visible_items.len()),
        }
    }

    fn check_scroll(&mut self) {
        if self.list_rows == 0 {
            return;
        }
        if self.feed.on_geometry(self.geometry()) {
            self.status_message = format!("Loading more posts from {}…", self.current_context());
            self.refresh_snapshot();
        }
    }

    /// Returns true when the application should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match self.input.clone() {
            InputMode::Search => {
                self.handle_search_key(code);
                false
            }
            InputMode::Feed(buffer) => {
                self.handle_feed_key(code, buffer);
                false
            }
            InputMode::Normal => self.handle_normal_key(code),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::PageDown => self.move_selection(PAGE_STEP as isize),
            KeyCode::PageUp => self.move_selection(-(PAGE_STEP as isize)),
            KeyCode::Char('g') | KeyCode::Home => self.move_selection(isize::MIN),
            KeyCode::Char('G') | KeyCode::End => self.move_selection(isize::MAX),
            KeyCode::Char('/') => {
                self.input = InputMode::Search;
                self.status_message =
                    "Search: type to filter, Enter to keep, Esc to clear.".to_string();
                self.mark_dirty();
            }
            KeyCode::Char('f') => {
                self.input = InputMode::Feed(String::new());
                self.status_message = "Change subreddit: type a name and press Enter.".to_string();
                self.mark_dirty();
            }
            KeyCode::Char('s') => {
                let context = self.current_context();
                let next = context.with_sort(context.sort.next());
                self.reset_to(next);
            }
            KeyCode::Char('r') => {
                if self.feed.refresh() {
                    self.status_message = format!("Refreshing {}…", self.current_context());
                    self.selected = 0;
                    self.offset = 0;
                    self.refresh_snapshot();
                }
            }
            KeyCode::Char('o') => self.open_selected(LinkTarget::Permalink),
            KeyCode::Char('O') => self.open_selected(LinkTarget::Target),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, code: KeyCode) {
        let mut term = self.feed.search_term().to_string();
        match code {
            KeyCode::Enter => {
                self.input = InputMode::Normal;
                self.status_message.clear();
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                term.clear();
                self.status_message.clear();
            }
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(ch) => term.push(ch),
            _ => return,
        }
        self.feed.set_search_term(term);
        self.selected = 0;
        self.offset = 0;
        self.refresh_snapshot();
    }

    fn handle_feed_key(&mut self, code: KeyCode, mut buffer: String) {
        match code {
            KeyCode::Enter => {
                self.input = InputMode::Normal;
                let name = buffer.trim();
                if name.is_empty() {
                    self.status_message.clear();
                    self.mark_dirty();
                    return;
                }
                let next = self.current_context().with_feed(name);
                self.reset_to(next);
                return;
            }
            KeyCode::Esc => {
                self.input = InputMode::Normal;
                self.status_message.clear();
                self.mark_dirty();
                return;
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(ch) => buffer.push(ch),
            _ => return,
        }
        self.input = InputMode::Feed(buffer);
        self.mark_dirty();
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollDown => self.move_selection(1),
            MouseEventKind::ScrollUp => self.move_selection(-1),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.snapshot.visible_items.len();
        if len == 0 {
            self.check_scroll();
            return;
        }
        let last = len - 1;
        self.selected = if delta == isize::MIN {
            0
        } else if delta == isize::MAX {
            last
        } else if delta < 0 {
            self.selected.saturating_sub(delta.unsigned_abs())
        } else {
            self.selected.saturating_add(delta as usize).min(last)
        };
        self.ensure_selected_visible();
        self.mark_dirty();
        self.check_scroll();
    }

    fn items_per_page(&self) -> usize {
        (usize::from(self.list_rows) / ROWS_PER_ITEM).max(1)
    }

    fn ensure_selected_visible(&mut self) {
        let per_page = self.items_per_page();
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + per_page {
            self.offset = self.selected + 1 - per_page;
        }
    }

    fn open_selected(&mut self, target: LinkTarget) {
        let Some(item) = self.snapshot.visible_items.get(self.selected) else {
            return;
        };
        let (url, label) = target.resolve(item);
        if url.is_empty() {
            self.status_message = format!("Selected post has no {label} URL.");
        } else {
            match webbrowser::open(&url) {
                Ok(_) => self.status_message = format!("Opened {label} in your browser."),
                Err(err) => {
                    log::warn!("failed to open {url}: {err}");
                    self.status_message = format!("Failed to open {label}: {err} (URL: {url})");
                }
            }
        }
        self.mark_dirty();
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(2),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        self.draw_posts(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let context = self.current_context();
        let mut spans = vec![
            Span::styled(
                "reddit ",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                context.to_string(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
        ];
        match &self.input {
            InputMode::Search => spans.push(Span::styled(
                format!("   search: {}▏", self.snapshot.search_term),
                Style::default().fg(COLOR_ACCENT),
            )),
            InputMode::Feed(buffer) => spans.push(Span::styled(
                format!("   subreddit: {buffer}▏"),
                Style::default().fg(COLOR_ACCENT),
            )),
            InputMode::Normal if !self.snapshot.search_term.is_empty() => {
                spans.push(Span::styled(
                    format!("   filter: {}", self.snapshot.search_term),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ))
            }
            InputMode::Normal => {}
        }
        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER))
                .title(" feedscroll "),
        );
        frame.render_widget(header, area);
    }

    fn draw_posts(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::LEFT | Borders::RIGHT)
            .border_style(Style::default().fg(COLOR_BORDER));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.list_rows != inner.height {
            self.list_rows = inner.height;
            self.ensure_selected_visible();
        }
        let width = usize::from(inner.width);
        let snapshot = &self.snapshot;

        let placeholder = if snapshot.is_loading && snapshot.total_items == 0 {
            Some(format!("{} Loading posts…", self.spinner.frame()))
        } else if snapshot.visible_items.is_empty() && snapshot.error.is_none() {
            Some("No posts found. Try a different search term.".to_string())
        } else {
            None
        };
        if let Some(text) = placeholder {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                text,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )));
            frame.render_widget(paragraph, inner);
            return;
        }

        let score_width = snapshot
            .visible_items
            .iter()
            .map(|item| item.score.to_string().len())
            .max()
            .unwrap_or(0)
            .max(3);

        let mut lines: Vec<Line<'static>> = Vec::new();
        for (idx, item) in snapshot
            .visible_items
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.items_per_page())
        {
            let selected = idx == self.selected;
            let background = if selected {
                COLOR_PANEL_SELECTED_BG
            } else {
                COLOR_BG
            };
            let mut title_style = Style::default().fg(COLOR_TEXT_PRIMARY).bg(background);
            if selected {
                title_style = title_style.add_modifier(Modifier::BOLD);
            }
            let prefix = format!(" {:>score_width$} ", item.score);
            let title_width = width.saturating_sub(prefix.chars().count());
            lines.push(Line::from(vec![
                Span::styled(prefix, Style::default().fg(COLOR_ACCENT).bg(background)),
                Span::styled(truncate_to_width(&item.title, title_width), title_style),
            ]));

            let mut meta = format!(
                "{:indent$}u/{} • {} comments • {}",
                "",
                item.author,
                item.comment_count,
                item.created_date(),
                indent = score_width + 2
            );
            if item.thumbnail_url.is_some() {
                meta.push_str(" • [thumbnail]");
            }
            lines.push(Line::from(Span::styled(
                truncate_to_width(&meta, width),
                Style::default().fg(COLOR_TEXT_SECONDARY).bg(background),
            )));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let snapshot = &self.snapshot;
        let summary = format!(
            " Displaying {} of {} posts • Page {} ",
            snapshot.visible_items.len(),
            snapshot.total_items,
            snapshot.page_count
        );
        let state_line = if let Some(error) = &snapshot.error {
            Line::from(Span::styled(
                format!(" Error loading content: {error}. Press r to retry."),
                Style::default().fg(COLOR_ERROR),
            ))
        } else if snapshot.is_loading && snapshot.total_items > 0 {
            Line::from(Span::styled(
                format!(" {} Loading more posts…", self.spinner.frame()),
                Style::default().fg(COLOR_ACCENT),
            ))
        } else if !snapshot.has_more && snapshot.total_items > 0 {
            Line::from(Span::styled(
                " No more posts to load.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
        } else {
            Line::from(Span::styled(
                format!(" {}", self.status_hint()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
        };
        let lines = vec![
            Line::from(Span::styled(
                summary,
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )),
            state_line,
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn status_hint(&self) -> &str {
        if self.status_message.is_empty() {
            "j/k scroll • / search • f subreddit • s sort • r refresh • o open • q quit"
        } else {
            &self.status_message
        }
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let budget = width - 1;
    let mut used = 0usize;
    let mut out = String::new();
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > budget {
            break;
        }
        used += ch_width;
        out.push(ch);
    }
    out.push('…');
    out
}
