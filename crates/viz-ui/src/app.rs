//! Application state and TUI event loop.
//!
//! [`App`] owns the theme and the selected figure; the composition itself is
//! borrowed for the lifetime of the loop.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};

use viz_data::composer::Composition;

use crate::chart_view::{self, truncate_to_width};
use crate::themes::Theme;

/// Longest figure title shown in the tab bar.
const TAB_TITLE_WIDTH: usize = 32;

/// Root application state for the chart viewer.
pub struct App {
    pub theme: Theme,
    /// Index into [`Composition::figures`].
    pub selected: usize,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            selected: 0,
            should_quit: false,
        }
    }

    /// Draw `composition` until the user quits.
    ///
    /// Uses `crossterm::event::poll` with a 250 ms timeout. The loop exits on
    /// `q`, `Q`, `Esc`, or `Ctrl+C`; `Tab`/`→` and `Shift+Tab`/`←` cycle
    /// through figures.
    pub fn run(mut self, composition: &Composition<'_>) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let figure_count = composition.figures().len();
        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame, composition)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key, figure_count),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent, figure_count: usize) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.next_figure(figure_count),
            KeyCode::BackTab | KeyCode::Left => self.previous_figure(figure_count),
            _ => {}
        }
    }

    fn next_figure(&mut self, figure_count: usize) {
        if figure_count > 0 {
            self.selected = (self.selected + 1) % figure_count;
        }
    }

    fn previous_figure(&mut self, figure_count: usize) {
        if figure_count > 0 {
            self.selected = (self.selected + figure_count - 1) % figure_count;
        }
    }

    /// Tab bar, the selected figure, and a key-help footer.
    pub fn render(&self, frame: &mut Frame, composition: &Composition<'_>) {
        let figures = composition.figures();
        let [tabs_area, body, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let Some(figure) = figures.get(self.selected) else {
            chart_view::render_placeholder(frame, body, &format!(" {} ", composition.title), &self.theme);
            return;
        };

        let titles: Vec<Line> = figures
            .iter()
            .map(|f| Line::from(truncate_to_width(f.id, TAB_TITLE_WIDTH)))
            .collect();
        frame.render_widget(
            Tabs::new(titles)
                .select(self.selected)
                .style(self.theme.tab)
                .highlight_style(self.theme.tab_selected),
            tabs_area,
        );

        chart_view::render_figure(frame, body, figure, &self.theme);

        let help = format!(
            " figure {}/{}  ·  Tab/←/→ switch  ·  q quit ",
            self.selected + 1,
            figures.len()
        );
        frame.render_widget(
            Paragraph::new(Span::styled(help, self.theme.footer)),
            footer,
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
