//! Full-screen error and notice display.
//!
//! Red background with centered white text. Used for startup failures and
//! for notices raised while the recorder is on screen.

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::Paragraph};
use std::io::{self, Stdout};

const ERROR_BG: Color = Color::Rgb(255, 0, 0);
const ERROR_FG: Color = Color::Rgb(255, 255, 255);

/// Paints `message` over the whole frame. Text wraps at 80% of the width.
pub fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();
    frame
        .buffer_mut()
        .set_style(area, Style::default().bg(ERROR_BG));

    let padding_x = area.width / 10;
    let text_width = (area.width * 80) / 100;

    let lines: Vec<Line> = message
        .lines()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(ERROR_FG).bg(ERROR_BG))))
        .collect();
    let text_height = lines.len() as u16;

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });

    let centered_area = Rect {
        x: area.x + padding_x,
        y: area.y + area.height.saturating_sub(text_height) / 2,
        width: text_width,
        height: area.height / 2,
    };

    frame.render_widget(paragraph, centered_area);
}

/// Waits until any key is pressed, redrawing `message` meanwhile.
pub fn wait_for_dismissal<B: Backend>(terminal: &mut Terminal<B>, message: &str) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| render_error(frame, message))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(_) = event::read()? {
                return Ok(());
            }
        }
    }
}

/// Standalone error screen for failures before the recorder UI exists.
pub struct ErrorScreen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl ErrorScreen {
    /// Creates a new error screen and enters alternate screen mode.
    ///
    /// # Errors
    /// - If terminal cannot be initialized
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(ErrorScreen { terminal })
    }

    /// Displays an error message until a key is pressed.
    pub fn show_error(&mut self, error_message: &str) -> anyhow::Result<()> {
        wait_for_dismissal(&mut self.terminal, error_message)
    }

    /// Cleans up terminal state and exits alternate screen mode.
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for ErrorScreen {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    #[test]
    fn test_render_error_fills_red_and_centers_text() {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        terminal
            .draw(|frame| render_error(frame, "Microphone denied"))
            .unwrap();

        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(0, 0)].bg, ERROR_BG);
        assert_eq!(buffer[(39, 9)].bg, ERROR_BG);

        let row: String = (0..40).map(|x| buffer[(x, 4)].symbol().to_string()).collect();
        assert!(row.contains("Microphone denied"));
    }
}
