//! Terminal host for the recorder widget.
//!
//! Replays the widget's display list on a braille canvas every frame, with a
//! one-line footer for state, duration and chunk counts.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    style::{Color, Style},
    symbols::Marker,
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine},
        Paragraph,
    },
};
use std::error::Error;
use std::io::{stdout, Stdout};
use std::time::Duration;

use super::surface::{DisplayList, DrawCommand, Point, Rect as SurfaceRect, Rgba, Surface};
use super::widget::WidgetState;
use crate::ui::wait_for_dismissal;

/// User input during recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingCommand {
    /// No key pressed
    Continue,
    /// Start or stop recording ('r')
    ToggleRecord,
    /// Pause or resume (Space)
    TogglePause,
    /// Leave the recorder (Enter, Escape or 'q')
    Quit,
}

/// Footer contents for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterStatus {
    pub state: WidgetState,
    pub elapsed: Duration,
    pub chunks: usize,
    pub bytes: usize,
    pub setting: String,
}

pub struct MicwaveTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl MicwaveTui {
    /// Enters raw mode and the alternate screen.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    pub fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    /// Draws the surface and footer.
    pub fn render(&mut self, surface: &DisplayList, footer: &FooterStatus) -> Result<(), Box<dyn Error>> {
        self.terminal.draw(|frame| draw_recorder(frame, surface, footer))?;
        Ok(())
    }

    /// Shows a notice full screen until a key is pressed.
    pub fn show_notice(&mut self, message: &str) -> Result<(), Box<dyn Error>> {
        tracing::debug!("Showing notice: {}", message);
        wait_for_dismissal(&mut self.terminal, message)?;
        Ok(())
    }

    /// Polls for one key press for at most `timeout`.
    pub fn handle_input(&mut self, timeout: Duration) -> Result<RecordingCommand, Box<dyn Error>> {
        if !event::poll(timeout)? {
            return Ok(RecordingCommand::Continue);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(RecordingCommand::Continue);
        };
        if key.kind != KeyEventKind::Press {
            return Ok(RecordingCommand::Continue);
        }

        Ok(match key.code {
            KeyCode::Char('r') => RecordingCommand::ToggleRecord,
            KeyCode::Char(' ') => RecordingCommand::TogglePause,
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => RecordingCommand::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                tracing::debug!("Ctrl+C pressed: leaving recorder");
                RecordingCommand::Quit
            }
            _ => RecordingCommand::Continue,
        })
    }

    /// Restores the terminal.
    pub fn cleanup(&mut self) -> Result<(), Box<dyn Error>> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

/// Renders one recorder frame. Split out so it can be drawn on any backend.
pub fn draw_recorder(frame: &mut Frame, surface: &DisplayList, footer: &FooterStatus) {
    let area = frame.area();
    let footer_height = 1;
    let canvas_area = Rect {
        height: area.height.saturating_sub(footer_height),
        ..area
    };
    let footer_area = Rect {
        y: area.y + area.height.saturating_sub(footer_height),
        height: footer_height.min(area.height),
        ..area
    };

    frame.render_widget(surface_canvas(surface), canvas_area);
    frame.render_widget(
        Paragraph::new(footer_line(footer)).style(
            Style::default()
                .fg(Color::Rgb(185, 207, 212))
                .bg(Color::Rgb(0, 0, 0)),
        ),
        footer_area,
    );
}

fn terminal_color(color: Rgba) -> Color {
    let opaque = color.over(Rgba::BLACK);
    Color::Rgb(opaque.r, opaque.g, opaque.b)
}

/// Background implied by a full-surface fill, if the list starts with one.
fn background_of(surface: &DisplayList) -> Option<Rgba> {
    match surface.commands().first() {
        Some(DrawCommand::FillRect { rect, color }) if rect.contains_rect(&surface.bounds()) => {
            Some(*color)
        }
        _ => None,
    }
}

fn surface_canvas(surface: &DisplayList) -> impl Widget + '_ {
    let width = surface.width() as f64;
    let height = surface.height() as f64;
    let background = background_of(surface).map_or(Color::Black, terminal_color);

    Canvas::default()
        .marker(Marker::Braille)
        .background_color(background)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            let skip = usize::from(background_of(surface).is_some());
            for command in &surface.commands()[skip..] {
                paint_command(ctx, command, height);
            }
        })
}

/// Canvas y grows upward; surface y grows downward.
fn line(ctx: &mut Context, from: Point, to: Point, height: f64, color: Color) {
    ctx.draw(&CanvasLine {
        x1: from.x as f64,
        y1: height - from.y as f64,
        x2: to.x as f64,
        y2: height - to.y as f64,
        color,
    });
}

fn fill_rect(ctx: &mut Context, rect: SurfaceRect, height: f64, color: Color) {
    let mut y = rect.y;
    while y < rect.y + rect.height {
        line(ctx, Point::new(rect.x, y), Point::new(rect.x + rect.width, y), height, color);
        y += 1.0;
    }
}

fn paint_command(ctx: &mut Context, command: &DrawCommand, height: f64) {
    match command {
        DrawCommand::Clear(rect) => fill_rect(ctx, *rect, height, Color::Black),
        DrawCommand::FillRect { rect, color } => fill_rect(ctx, *rect, height, terminal_color(*color)),
        DrawCommand::StrokePath { points, color, .. } => {
            let color = terminal_color(*color);
            for pair in points.windows(2) {
                line(ctx, pair[0], pair[1], height, color);
            }
        }
        DrawCommand::FillCircle { center, radius, color } => {
            let color = terminal_color(*color);
            let mut dy = -radius;
            while dy <= *radius {
                let half = (radius * radius - dy * dy).max(0.0).sqrt();
                let y = center.y + dy;
                line(ctx, Point::new(center.x - half, y), Point::new(center.x + half, y), height, color);
                dy += 1.0;
            }
        }
        DrawCommand::StrokeCircle { center, radius, color, .. } => {
            ctx.draw(&ratatui::widgets::canvas::Circle {
                x: center.x as f64,
                y: height - center.y as f64,
                radius: *radius as f64,
                color: terminal_color(*color),
            });
        }
    }
}

fn footer_line(status: &FooterStatus) -> ratatui::text::Line<'static> {
    let indicator = match status.state {
        WidgetState::Recording => Span::styled("● ", Style::default().fg(Color::Red)),
        WidgetState::Paused => Span::styled("⏸ ", Style::default().fg(Color::Yellow)),
        WidgetState::Acquiring => Span::styled("… ", Style::default().fg(Color::Yellow)),
        WidgetState::Idle => Span::styled("○ ", Style::default().fg(Color::DarkGray)),
    };

    let secs = status.elapsed.as_secs();
    ratatui::text::Line::from(vec![
        indicator,
        Span::raw(format!("{}:{:02}", secs / 60, secs % 60)),
        Span::raw(" / "),
        Span::raw(format!("{} chunks", status.chunks)),
        Span::raw(" / "),
        Span::raw(format_bytes(status.bytes)),
        Span::raw(" / "),
        Span::raw(status.setting.clone()),
        Span::styled(
            "   r record  space pause  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn format_bytes(bytes: usize) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn footer(state: WidgetState) -> FooterStatus {
        FooterStatus {
            state,
            elapsed: Duration::from_secs(75),
            chunks: 12,
            bytes: 2048,
            setting: "sinewave".to_string(),
        }
    }

    fn row(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_footer_shows_status() {
        let mut terminal = Terminal::new(TestBackend::new(80, 6)).unwrap();
        let surface = DisplayList::new(640, 100);
        terminal
            .draw(|frame| draw_recorder(frame, &surface, &footer(WidgetState::Recording)))
            .unwrap();

        let last = row(&terminal, 5);
        assert!(last.contains("1:15"));
        assert!(last.contains("12 chunks"));
        assert!(last.contains("2.0 KB"));
        assert!(last.contains("sinewave"));
    }

    #[test]
    fn test_background_fill_sets_canvas_color() {
        let mut surface = DisplayList::new(640, 100);
        surface.fill_rect(surface.bounds(), Rgba::WHITE);
        assert_eq!(background_of(&surface), Some(Rgba::WHITE));

        let mut terminal = Terminal::new(TestBackend::new(20, 4)).unwrap();
        terminal
            .draw(|frame| draw_recorder(frame, &surface, &footer(WidgetState::Idle)))
            .unwrap();
        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(0, 0)].bg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_stroke_is_painted() {
        let mut surface = DisplayList::new(100, 100);
        surface.stroke_path(
            &[Point::new(0.0, 50.0), Point::new(100.0, 50.0)],
            Rgba::rgb(255, 0, 0),
            2.0,
        );

        let mut terminal = Terminal::new(TestBackend::new(10, 5)).unwrap();
        terminal
            .draw(|frame| draw_recorder(frame, &surface, &footer(WidgetState::Recording)))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let painted = (0..4).any(|y| buffer[(5, y)].fg == Color::Rgb(255, 0, 0));
        assert!(painted);
    }

    #[test]
    fn test_translucent_colors_blend_over_black() {
        let half_white = Rgba { a: 0.5, ..Rgba::WHITE };
        assert_eq!(terminal_color(half_white), Color::Rgb(128, 128, 128));
    }
}
