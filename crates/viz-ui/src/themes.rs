use ratatui::style::{Color, Modifier, Style};

/// Terminal background type detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Detect terminal background type from a `COLORFGBG` value.
///
/// The format is `"foreground;background"`. Background values 0–6 are dark,
/// 7–15 light. Missing or unparseable values count as dark.
pub fn background_from_colorfgbg(value: Option<&str>) -> BackgroundType {
    value
        .and_then(|v| v.split(';').next_back())
        .and_then(|bg| bg.parse::<u8>().ok())
        .map(|bg| {
            if bg <= 6 {
                BackgroundType::Dark
            } else {
                BackgroundType::Light
            }
        })
        .unwrap_or(BackgroundType::Dark)
}

pub fn detect_background() -> BackgroundType {
    background_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

/// Styles used by the chart screens.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Frame ────────────────────────────────────────────────────────────────
    pub title: Style,
    pub border: Style,
    pub footer: Style,
    pub tab: Style,
    pub tab_selected: Style,

    // ── Chart ────────────────────────────────────────────────────────────────
    pub axis: Style,
    pub axis_label: Style,
    pub placeholder: Style,
    /// Horizontal threshold lines.
    pub reference_line: Style,
    /// One colour per series, cycled.
    pub series: Vec<Color>,
}

impl Theme {
    /// Dark-background terminal theme (default).
    pub fn dark() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::DarkGray),
            footer: Style::default().fg(Color::DarkGray),
            tab: Style::default().fg(Color::Gray),
            tab_selected: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            axis: Style::default().fg(Color::Gray),
            axis_label: Style::default().fg(Color::Gray),
            placeholder: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            reference_line: Style::default().fg(Color::DarkGray),
            series: vec![
                Color::Cyan,
                Color::Yellow,
                Color::Green,
                Color::Magenta,
                Color::LightRed,
                Color::LightBlue,
            ],
        }
    }

    /// Light-background terminal theme.
    pub fn light() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Gray),
            footer: Style::default().fg(Color::DarkGray),
            tab: Style::default().fg(Color::DarkGray),
            tab_selected: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            axis: Style::default().fg(Color::DarkGray),
            axis_label: Style::default().fg(Color::Black),
            placeholder: Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
            reference_line: Style::default().fg(Color::Gray),
            series: vec![
                Color::Blue,
                Color::Red,
                Color::Green,
                Color::Magenta,
                Color::Black,
                Color::Cyan,
            ],
        }
    }

    /// Choose a theme automatically based on the detected terminal background.
    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            BackgroundType::Dark => Self::dark(),
        }
    }

    /// Construct a theme by name. Unknown names fall back to `auto_detect`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::auto_detect(),
        }
    }

    /// Line colour for the `index`-th series of a panel.
    pub fn series_color(&self, index: usize) -> Color {
        if self.series.is_empty() {
            return Color::Reset;
        }
        self.series[index % self.series.len()]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
