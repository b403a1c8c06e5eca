pub mod widgets;

use std::str::FromStr;

use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::{Line, Span},
    Frame,
};

use crate::app::{App, Phase};
use crate::error::ConfigError;
use crate::events::Event;
use crate::models::ThemeConfig;

/// Colours used by every widget, passed down from `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub subtext: Color,
    pub alt_text: Color,
    pub accent: Color,
    pub button: Color,
}

impl Theme {
    pub fn from_config(config: &ThemeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            text: parse_color("text_color", &config.text_color)?,
            subtext: parse_color("subtext_color", &config.subtext_color)?,
            alt_text: parse_color("alt_text_color", &config.alt_text_color)?,
            accent: parse_color("accent_color", &config.accent_color)?,
            button: parse_color("button_color", &config.button_color)?,
        })
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn subtext_style(&self) -> Style {
        Style::default().fg(self.subtext)
    }

    pub fn alt_text_style(&self) -> Style {
        Style::default().fg(self.alt_text)
    }

    pub fn accent_style(&self) -> Style {
        Style::default().fg(self.accent)
    }
}

fn parse_color(field: &'static str, value: &str) -> Result<Color, ConfigError> {
    Color::from_str(value).map_err(|_| ConfigError::InvalidColor {
        field,
        value: value.to_string(),
    })
}

pub fn render(frame: &mut Frame, app: &App, theme: &Theme) {
    let [body, footer] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    let secs = app.elapsed().as_secs_f64();
    let footer_text = match app.phase() {
        Phase::SelectingKeyword => {
            widgets::render_picker(frame, app, theme, body);
            format!("quick commit v{}", app.version)
        }
        Phase::Loading => {
            widgets::render_spinner(frame, app, theme, body);
            format!("{secs:.1}s elapsed")
        }
        Phase::Streaming => {
            widgets::render_transcript(frame, app, theme, body);
            format!("{secs:.1}s elapsed  |  tab: toggle thoughts")
        }
        Phase::AwaitingDecision | Phase::Committing => {
            widgets::render_confirmation(frame, app, theme, body);
            format!("took {secs:.1}s")
        }
    };

    widgets::render_footer(frame, &footer_text, theme, footer);
}

/// Flatten the event history into display lines, one per `\n`.
///
/// Thoughts are dimmed, or dropped entirely when hidden.
pub fn transcript_lines<'a>(app: &'a App, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines: Vec<Line<'a>> = vec![Line::default()];

    for event in &app.events {
        let style = match event {
            Event::Thought(_) if !app.show_thinking => continue,
            Event::Thought(_) => theme.subtext_style(),
            Event::Response(_) => theme.text_style(),
            Event::Loading | Event::Commit(_) => continue,
        };

        for (i, part) in event.text().split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::default());
            }
            if part.is_empty() {
                continue;
            }
            if let Some(last) = lines.last_mut() {
                last.spans.push(Span::styled(part, style));
            }
        }
    }

    // Leading blank lines come from models that open with "\n\n"
    while lines.len() > 1 && lines.first().is_some_and(|line| line.width() == 0) {
        lines.remove(0);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen(app: &App) -> String {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(f, app, &theme)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(ratatui::buffer::Cell::symbol).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_theme_from_default_config() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        assert_eq!(theme.accent, Color::Rgb(0x89, 0xdc, 0xeb));
    }

    #[test]
    fn test_theme_rejects_unknown_color() {
        let config = ThemeConfig {
            accent_color: "not-a-color".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            Theme::from_config(&config),
            Err(ConfigError::InvalidColor { field: "accent_color", .. })
        ));
    }

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_transcript_lines_split_on_newlines() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        let mut app = App::new(vec!["fix".to_string()]);
        app.handle_event(Event::Loading);
        app.handle_event(Event::Thought("\n\nfirst ".to_string()));
        app.handle_event(Event::Thought("thought\nsecond".to_string()));
        app.handle_event(Event::Response("\nfix: y".to_string()));

        let lines = transcript_lines(&app, &theme);
        assert_eq!(plain(&lines), vec!["first thought", "second", "fix: y"]);
        assert_eq!(lines[0].spans[0].style, theme.subtext_style());
        assert_eq!(lines[2].spans[0].style, theme.text_style());
    }

    #[test]
    fn test_transcript_lines_hide_thoughts() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        let mut app = App::new(vec!["fix".to_string()]);
        app.show_thinking = false;
        app.handle_event(Event::Thought("hidden".to_string()));
        app.handle_event(Event::Response("fix: y".to_string()));

        assert_eq!(plain(&transcript_lines(&app, &theme)), vec!["fix: y"]);
    }

    #[test]
    fn test_render_picker() {
        let app = App::new(vec!["fix".to_string(), "feat".to_string()]);
        let screen = screen(&app);
        assert!(screen.contains("> fix"));
        assert!(screen.contains("feat"));
        assert!(screen.contains("quick commit v"));
    }

    #[test]
    fn test_render_streaming_and_confirmation() {
        let mut app = App::new(vec!["feat".to_string()]);
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        app.handle_event(Event::Loading);
        app.handle_event(Event::Thought("pondering".to_string()));
        app.handle_event(Event::Response("feat: add x".to_string()));
        let streaming = screen(&app);
        assert!(streaming.contains("pondering"));
        assert!(streaming.contains("elapsed"));

        app.handle_event(Event::Commit("feat: add x".to_string()));
        let confirm = screen(&app);
        assert!(confirm.contains("feat: add x"));
        assert!(confirm.contains("looks good?"));
        assert!(confirm.contains("Yes"));
        assert!(confirm.contains("took"));
    }
}
