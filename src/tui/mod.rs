//! Ratatui-based grade editor.
//!
//! Loads a grade CSV (and optionally the curriculum plan), shows every course
//! with its weighted points and GPA impact, and lets the user try out
//! hypothetical grade points, credits and extra courses before saving the
//! result to a separate CSV.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState},
};

use crate::domain::fields;
use crate::error::AppError;
use crate::io::snapshot::{SNAPSHOT_NUMERIC_FIELDS, load_table};

mod editor;

pub use editor::{Column, GradeBook};

/// Files the editor reads and writes.
#[derive(Debug, Clone)]
pub struct EditorPaths {
    pub grades: PathBuf,
    pub plan: PathBuf,
    pub output: PathBuf,
}

/// Start the editor.
pub fn run(paths: EditorPaths) -> Result<(), AppError> {
    let book = load_book(&paths)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(book, paths);
    app.event_loop(&mut terminal)
}

fn load_book(paths: &EditorPaths) -> Result<GradeBook, AppError> {
    let (headers, courses) = if paths.grades.exists() {
        load_table(&paths.grades, SNAPSHOT_NUMERIC_FIELDS)?
    } else {
        tracing::warn!(path = %paths.grades.display(), "grade file not found; starting empty");
        (Vec::new(), Vec::new())
    };

    let plan = if paths.plan.exists() {
        load_table(&paths.plan, &[fields::PLAN_CREDIT])?.1
    } else {
        tracing::info!(path = %paths.plan.display(), "no plan file; adding from plan disabled");
        Vec::new()
    };

    Ok(GradeBook::new(headers, courses, plan))
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    GradePoint,
    Credit,
    Manual,
    /// Grade point for the plan course at this index.
    PlanPoint(usize),
}

impl InputKind {
    fn prompt(self) -> &'static str {
        match self {
            InputKind::GradePoint => "grade point (0.0-5.0)",
            InputKind::Credit => "credit",
            InputKind::Manual => "id, name, credit, point",
            InputKind::PlanPoint(_) => "grade point for plan course (0.0-5.0)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Input { kind: InputKind, buffer: String },
    PlanPicker { filter: String, selected: usize },
}

struct App {
    book: GradeBook,
    paths: EditorPaths,
    selected: usize,
    mode: Mode,
    status: String,
    dirty: bool,
    /// Set by a quit attempt with unsaved changes; the next key decides.
    confirm_quit: bool,
}

impl App {
    fn new(book: GradeBook, paths: EditorPaths) -> Self {
        let status = format!("Loaded {} courses from {}", book.len(), paths.grades.display());
        Self {
            book,
            paths,
            selected: 0,
            mode: Mode::Browse,
            status,
            dirty: false,
            confirm_quit: false,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the editor should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match self.mode.clone() {
            Mode::Browse => return self.handle_browse(code),
            Mode::Input { kind, buffer } => self.handle_input(kind, buffer, code),
            Mode::PlanPicker { filter, selected } => self.handle_picker(filter, selected, code),
        }
        false
    }

    fn handle_browse(&mut self, code: KeyCode) -> bool {
        let confirming = std::mem::take(&mut self.confirm_quit);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.dirty && !confirming {
                    self.status = "Unsaved changes: press q again to discard or s to save.".to_string();
                    self.confirm_quit = true;
                    return false;
                }
                return true;
            }
            KeyCode::Char('Q') => return true,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.book.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char('p') if !self.book.is_empty() => self.start_input(InputKind::GradePoint),
            KeyCode::Char('c') if !self.book.is_empty() => self.start_input(InputKind::Credit),
            KeyCode::Char('a') => self.start_input(InputKind::Manual),
            KeyCode::Char('n') => {
                if self.book.plan().is_empty() {
                    self.status = format!("No plan courses loaded from {}", self.paths.plan.display());
                } else {
                    self.mode = Mode::PlanPicker {
                        filter: String::new(),
                        selected: 0,
                    };
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(removed) = self.book.delete(self.selected) {
                    self.status = format!("Deleted {}", removed.text(fields::COURSE_NAME));
                    self.selected = self.selected.min(self.book.len().saturating_sub(1));
                    self.dirty = true;
                }
            }
            KeyCode::Char(c @ '1'..='7') => {
                let idx = c as usize - '1' as usize;
                let column = Column::ALL[idx];
                self.book.sort_by(column);
                self.status = format!("Sorted by {}", column.title());
            }
            KeyCode::Char('s') => match self.book.save(&self.paths.output) {
                Ok(()) => {
                    self.status = format!("Saved to {}", self.paths.output.display());
                    self.dirty = false;
                }
                Err(e) => self.status = format!("Save failed: {e}"),
            },
            _ => {}
        }
        false
    }

    fn start_input(&mut self, kind: InputKind) {
        let buffer = match kind {
            InputKind::GradePoint => self.current_text(fields::GRADE_POINT),
            InputKind::Credit => self.current_text(fields::CREDIT),
            InputKind::Manual | InputKind::PlanPoint(_) => String::new(),
        };
        self.mode = Mode::Input { kind, buffer };
        self.status = format!("Enter {}. Enter to apply, Esc to cancel.", kind.prompt());
    }

    fn current_text(&self, field: &str) -> String {
        self.book
            .courses()
            .get(self.selected)
            .map(|c| c.text(field))
            .unwrap_or_default()
    }

    fn handle_input(&mut self, kind: InputKind, mut buffer: String, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.status = "Edit canceled.".to_string();
                return;
            }
            KeyCode::Enter => {
                let applied = match kind {
                    InputKind::GradePoint => self.book.set_grade_point(self.selected, &buffer),
                    InputKind::Credit => self.book.set_credit(self.selected, &buffer),
                    InputKind::Manual => self.book.add_manual(&buffer),
                    InputKind::PlanPoint(plan_index) => self.book.add_from_plan(plan_index, &buffer),
                };
                match applied {
                    Ok(()) => {
                        if matches!(kind, InputKind::Manual | InputKind::PlanPoint(_)) {
                            self.selected = self.book.len().saturating_sub(1);
                        }
                        self.mode = Mode::Browse;
                        self.dirty = true;
                        self.status = format!("GPA now {:.2}", self.book.gpa());
                    }
                    // Keep the buffer so the user can fix the value.
                    Err(msg) => self.status = msg,
                }
                return;
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
        self.mode = Mode::Input { kind, buffer };
    }

    fn handle_picker(&mut self, mut filter: String, mut selected: usize, code: KeyCode) {
        let matches = self.book.plan_matches(&filter);
        match code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                return;
            }
            KeyCode::Enter => {
                if let Some(&plan_index) = matches.get(selected) {
                    self.start_input(InputKind::PlanPoint(plan_index));
                }
                return;
            }
            KeyCode::Up => selected = selected.saturating_sub(1),
            KeyCode::Down => {
                if selected + 1 < matches.len() {
                    selected += 1;
                }
            }
            KeyCode::Backspace => {
                filter.pop();
                selected = 0;
            }
            KeyCode::Char(c) => {
                filter.push(c);
                selected = 0;
            }
            _ => {}
        }
        self.mode = Mode::PlanPicker { filter, selected };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);

        if let Mode::PlanPicker { filter, selected } = &self.mode {
            self.draw_picker(frame, chunks[1], filter, *selected);
        }
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(vec![
                Span::styled("neu edit", Style::default().fg(Color::Cyan)),
                Span::raw(format!("  {}", self.paths.grades.display())),
            ]),
            Line::from(Span::styled(
                format!(
                    "GPA: {:.2} | credits: {} | courses: {} | save to: {}",
                    self.book.gpa(),
                    self.book.total_credits(),
                    self.book.len(),
                    self.paths.output.display(),
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let sort = self.book.sort_state();
        let header = Row::new(Column::ALL.iter().enumerate().map(|(i, col)| {
            let arrow = match sort {
                Some((c, false)) if c == *col => " ↑",
                Some((c, true)) if c == *col => " ↓",
                _ => "",
            };
            Cell::from(format!("{} {}{arrow}", i + 1, col.title()))
        }))
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows = self.book.rows().into_iter().map(|row| {
            let impact_style = if row.impact > 0.0 {
                Style::default().fg(Color::Green)
            } else if row.impact < 0.0 {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            Row::new(Column::ALL.iter().map(|&col| {
                let cell = Cell::from(row.cell(col));
                if col == Column::Impact { cell.style(impact_style) } else { cell }
            }))
        });

        let widths = [
            Constraint::Length(12),
            Constraint::Min(20),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(10),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().title("Courses").borders(Borders::ALL))
            .row_highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = TableState::default();
        if !self.book.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_picker(&self, frame: &mut ratatui::Frame<'_>, area: Rect, filter: &str, selected: usize) {
        let popup = centered(area, 80, 70);
        frame.render_widget(Clear, popup);

        let plan = self.book.plan();
        let items: Vec<ListItem> = self
            .book
            .plan_matches(filter)
            .into_iter()
            .map(|i| {
                let c = &plan[i];
                ListItem::new(format!(
                    "{:<12} {}  ({} credits, {})",
                    c.text(fields::COURSE_ID),
                    c.text(fields::COURSE_NAME),
                    c.text(fields::PLAN_CREDIT),
                    c.text(fields::PLAN_GRADING),
                ))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("Add from plan | search: {filter}"))
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(selected));
        frame.render_stateful_widget(list, popup, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let line = match &self.mode {
            Mode::Input { kind, buffer } => Line::from(vec![
                Span::styled(format!("{}: ", kind.prompt()), Style::default().fg(Color::Cyan)),
                Span::raw(buffer.as_str()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                Span::raw(" | "),
                Span::styled(&self.status, Style::default().fg(Color::Yellow)),
            ]),
            Mode::PlanPicker { .. } => Line::from(Span::styled(
                "type to search  ↑/↓ select  Enter pick  Esc back",
                Style::default().fg(Color::Gray),
            )),
            Mode::Browse => Line::from(vec![
                Span::styled(
                    "↑/↓ move  p point  c credit  a add  n from plan  d delete  1-7 sort  s save  q quit",
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(" | "),
                Span::styled(&self.status, Style::default().fg(Color::Yellow)),
            ]),
        };
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Rectangle of `pct_x`% by `pct_y`% centered in `area`.
fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let width = area.width * pct_x / 100;
    let height = area.height * pct_y / 100;
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
