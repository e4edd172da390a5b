use anyhow::Result;
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::models::{JobRecord, Status};
use crate::tracker::Tracker;

const HIDE_REASON: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    MarkApplied,
    SetStatus(Status),
    Hide,
    Unhide,
}

impl Action {
    fn for_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('a') => Some(Action::MarkApplied),
            KeyCode::Char('c') => Some(Action::SetStatus(Status::PositionClosed)),
            KeyCode::Char('r') => Some(Action::SetStatus(Status::Rejected)),
            KeyCode::Char('w') => Some(Action::SetStatus(Status::Withdrawn)),
            KeyCode::Char('h') => Some(Action::Hide),
            KeyCode::Char('u') => Some(Action::Unhide),
            _ => None,
        }
    }
}

struct AppState {
    jobs: Vec<JobRecord>,
    selected: usize,
    scroll_offset: u16,
    message: Option<String>,
}

impl AppState {
    fn new(jobs: Vec<JobRecord>) -> Self {
        Self {
            jobs,
            selected: 0,
            scroll_offset: 0,
            message: None,
        }
    }

    fn current_job(&self) -> Option<&JobRecord> {
        self.jobs.get(self.selected)
    }

    fn next(&mut self) {
        if !self.jobs.is_empty() && self.selected < self.jobs.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Writes the action to the tracker, then reloads every row so the view
    /// matches the file.
    fn apply(&mut self, tracker: &Tracker, action: Action, today: NaiveDate) -> Result<()> {
        if self.current_job().is_none() {
            return Ok(());
        }
        let index = self.selected;
        let updated = match action {
            Action::MarkApplied => tracker.set_applied(index, today)?,
            Action::SetStatus(status) => tracker.modify(index, |job| job.status = status)?,
            Action::Hide => tracker.hide(index, HIDE_REASON)?,
            Action::Unhide => tracker.unhide(index)?,
        };
        self.message = updated.map(|job| format!("{}: {}", job.label(), job.status));
        self.jobs = tracker.load()?;
        self.selected = self.selected.min(self.jobs.len().saturating_sub(1));
        Ok(())
    }
}

pub fn run_browse(tracker: &Tracker) -> Result<()> {
    let jobs = tracker.load()?;
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut state = AppState::new(jobs);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, tracker);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    tracker: &Tracker,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                code => {
                    if let Some(action) = Action::for_key(code) {
                        if let Err(e) = state.apply(tracker, action, Local::now().date_naive()) {
                            tracing::warn!(error = %e, "tracker update failed");
                            state.message = Some(format!("Error: {e:#}"));
                        }
                    }
                }
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn status_icon(job: &JobRecord) -> &'static str {
    let status = &job.status;
    if status.is_offer() {
        "$"
    } else if status.is_interviewing() {
        "*"
    } else if status.is_dead_end() {
        "x"
    } else {
        match status {
            Status::NotApplied => " ",
            Status::Withdrawn => "-",
            _ => "+",
        }
    }
}

fn status_style(status: &Status) -> Style {
    if status.is_offer() {
        Style::default().fg(Color::Green)
    } else if status.is_interviewing() {
        Style::default().fg(Color::Yellow)
    } else if status.is_dead_end() {
        Style::default().fg(Color::Red)
    } else {
        match status {
            Status::NotApplied => Style::default(),
            Status::Withdrawn => Style::default().fg(Color::DarkGray),
            _ => Style::default().fg(Color::Cyan),
        }
    }
}

fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(65),
        ])
        .split(rows[0]);

    // Left panel: tracker rows
    let items: Vec<ListItem> = state
        .jobs
        .iter()
        .enumerate()
        .map(|(i, job)| {
            let hidden = if job.hidden { "h" } else { " " };
            let item = ListItem::new(format!(
                "{}{} #{:<3} {} | {}",
                status_icon(job),
                hidden,
                i + 1,
                shorten(&job.company, 20),
                shorten(&job.position, 30)
            ));
            if job.hidden {
                item.style(Style::default().fg(Color::DarkGray))
            } else {
                item
            }
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({}) ", state.jobs.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer: last result, or key help
    let footer = match &state.message {
        Some(message) => Paragraph::new(format!(" {message}")).style(Style::default().fg(Color::Yellow)),
        None => Paragraph::new(
            " j/k:navigate  J/K:scroll  a:applied c:closed r:rejected w:withdrawn h:hide u:unhide  q:quit",
        )
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, rows[1]);
}

fn field<'a>(label: &'a str, value: &'a str) -> Option<Line<'a>> {
    if value.trim().is_empty() {
        return None;
    }
    Some(Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ]))
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(job) = state.current_job() else {
        return Text::raw("No job selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.company.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(job.position.as_str()));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", job.status),
        status_style(&job.status),
    )));
    if job.hidden {
        lines.push(Line::from(Span::styled(
            format!("Hidden: {}", job.hide_reason),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));

    let stage = job.interview_stage.as_ref().map(|s| s.as_str()).unwrap_or("");
    let priority = job.priority.as_ref().map(|p| p.as_str()).unwrap_or("");
    lines.extend(
        [
            field("Location", &job.location),
            field("Salary", &job.salary_base),
            field("Total comp", &job.total_comp),
            field("Priority", priority),
            field("Applied", &job.applied_date),
            field("Follow-up", &job.next_follow_up),
            field("Stage", stage),
            field("Contact", &job.contact_name),
            field("Email", &job.contact_email),
            field("Phone", &job.contact_phone),
            field("Last contact", &job.last_contact_date),
            field("URL", &job.job_url),
        ]
        .into_iter()
        .flatten(),
    );

    if !job.notes.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "NOTES",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for entry in job.notes.split(" | ") {
            for line in textwrap::fill(entry, 70).lines() {
                lines.push(Line::from(format!("  {}", line)));
            }
        }
    }

    Text::from(lines)
}
