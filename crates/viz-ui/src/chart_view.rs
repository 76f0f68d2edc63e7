//! Chart rendering for panel descriptors.
//!
//! A figure is drawn as its rows × cols grid; each cell holds one panel as a
//! line chart with one dataset per series plus its reference lines.

use chrono::Duration;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use viz_core::formatting::{format_axis_time, format_number};
use viz_core::models::Timestamp;
use viz_core::profiles::Layout as GridLayout;
use viz_data::composer::{Figure, PanelDescriptor};

use crate::themes::Theme;

/// Headroom above the highest value or reference line.
const Y_HEADROOM: f64 = 1.1;

// ── Text helpers ──────────────────────────────────────────────────────────────

/// Cut `text` to at most `max_width` display columns, ending with `…` when
/// anything was dropped.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Row-major cell rectangles of a `layout` grid inside `area`.
pub fn grid_cells(area: Rect, layout: GridLayout) -> Vec<Rect> {
    let rows = layout.rows.max(1) as u32;
    let cols = layout.cols.max(1) as u32;
    Layout::vertical((0..rows).map(|_| Constraint::Ratio(1, rows)))
        .split(area)
        .iter()
        .flat_map(|row| {
            Layout::horizontal((0..cols).map(|_| Constraint::Ratio(1, cols)))
                .split(*row)
                .to_vec()
        })
        .collect()
}

/// Axis ranges of a panel. `x` is in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelBounds {
    pub start: Timestamp,
    pub end: Timestamp,
    pub x: [f64; 2],
    pub y: [f64; 2],
}

impl PanelBounds {
    /// `None` when no draw entry has a point.
    pub fn of(panel: &PanelDescriptor<'_>) -> Option<Self> {
        let mut points = panel.draws.iter().flat_map(|d| d.points());
        let (first, first_value) = points.next()?;
        let (mut start, mut end, mut max) = (first, first, first_value);
        for (ts, v) in points {
            start = start.min(ts);
            end = end.max(ts);
            max = max.max(v);
        }
        if end == start {
            end = start + Duration::hours(1);
        }

        let reference_max = panel
            .reference_lines
            .iter()
            .map(|r| r.value)
            .fold(0.0_f64, f64::max);
        let y_max = (max.max(reference_max) * Y_HEADROOM).max(1.0);

        Some(Self {
            start,
            end,
            x: [x_of(&start), x_of(&end)],
            y: [0.0, y_max],
        })
    }

    /// Start, middle and end of the time axis.
    pub fn x_labels(&self) -> Vec<String> {
        let middle = self.start + (self.end - self.start) / 2;
        [self.start, middle, self.end]
            .iter()
            .map(format_axis_time)
            .collect()
    }

    pub fn y_labels(&self) -> Vec<String> {
        let [lo, hi] = self.y;
        [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|v| format_number(*v, 1))
            .collect()
    }
}

fn x_of(ts: &Timestamp) -> f64 {
    ts.timestamp() as f64
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render every panel of `figure` into its grid cell.
pub fn render_figure(frame: &mut Frame, area: Rect, figure: &Figure<'_, '_>, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(Span::styled(
            format!(" {} ", truncate_to_width(figure.title, area.width.saturating_sub(4) as usize)),
            theme.title,
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = grid_cells(inner, figure.layout);
    for panel in &figure.panels {
        if let Some(cell) = cells.get(panel.cell) {
            render_panel(frame, *cell, panel, theme);
        }
    }
}

/// Render one panel as a line chart, or a placeholder when it has no data.
pub fn render_panel(frame: &mut Frame, area: Rect, panel: &PanelDescriptor<'_>, theme: &Theme) {
    let title = format!(" {} [{}] ", panel.title, panel.unit);
    let Some(bounds) = PanelBounds::of(panel) else {
        render_placeholder(frame, area, &title, theme);
        return;
    };

    // Legend entries get at most a third of the panel width.
    let legend_width = (area.width / 3).max(8) as usize;

    let series_points: Vec<Vec<(f64, f64)>> = panel
        .draws
        .iter()
        .map(|d| d.points().map(|(ts, v)| (x_of(&ts), v)).collect())
        .collect();
    let reference_points: Vec<[(f64, f64); 2]> = panel
        .reference_lines
        .iter()
        .map(|r| [(bounds.x[0], r.value), (bounds.x[1], r.value)])
        .collect();

    let mut datasets: Vec<Dataset> = panel
        .draws
        .iter()
        .zip(&series_points)
        .enumerate()
        .map(|(i, (draw, points))| {
            Dataset::default()
                .name(truncate_to_width(draw.label, legend_width))
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(theme.series_color(i)))
                .data(points)
        })
        .collect();
    // Dotted markers stand in for dashed threshold lines.
    datasets.extend(panel.reference_lines.iter().zip(&reference_points).map(
        |(line, points)| {
            Dataset::default()
                .name(truncate_to_width(
                    &format!("{} {}", line.label, format_number(line.value, 0)),
                    legend_width,
                ))
                .marker(Marker::Dot)
                .graph_type(GraphType::Line)
                .style(theme.reference_line)
                .data(points)
        },
    ));

    let chart = Chart::new(datasets)
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border)
                .title(Span::styled(title, theme.title)),
        )
        .x_axis(
            Axis::default()
                .style(theme.axis)
                .bounds(bounds.x)
                .labels(
                    bounds
                        .x_labels()
                        .into_iter()
                        .map(|l| Line::styled(l, theme.axis_label))
                        .collect::<Vec<_>>(),
                ),
        )
        .y_axis(
            Axis::default()
                .style(theme.axis)
                .title(Span::styled(panel.unit, theme.axis_label))
                .bounds(bounds.y)
                .labels(
                    bounds
                        .y_labels()
                        .into_iter()
                        .map(|l| Line::styled(l, theme.axis_label))
                        .collect::<Vec<_>>(),
                ),
        );

    frame.render_widget(chart, area);
}

/// Bordered "no data" box for panels without points.
pub fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("no data", theme.placeholder)),
    ];
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border)
                .title(Span::styled(title.to_string(), theme.title)),
        ),
        area,
    );
}

// ── Tests ─────────────────────────────────────────────────────────────────────
