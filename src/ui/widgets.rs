use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::{transcript_lines, Theme};
use crate::app::{App, Phase};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Center a `width` x `height` box inside `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;

    Rect {
        x: area.x + x,
        y: area.y + y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

pub fn render_picker(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let lines: Vec<Line> = app
        .keywords
        .iter()
        .enumerate()
        .map(|(i, keyword)| {
            if i == app.selected {
                Line::from(Span::styled(
                    format!("> {keyword}"),
                    theme.accent_style().add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(format!("  {keyword}"), theme.text_style()))
            }
        })
        .collect();

    let width = app
        .keywords
        .iter()
        .map(|keyword| u16::try_from(keyword.len()).unwrap_or(u16::MAX))
        .max()
        .unwrap_or(0)
        .saturating_add(8)
        .max(16);
    let height = u16::try_from(lines.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2);

    let picker = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Type ")
            .border_style(theme.subtext_style()),
    );

    frame.render_widget(picker, centered(area, width, height));
}

pub fn render_spinner(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let glyph = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
    let spinner = Paragraph::new(Line::from(vec![
        Span::styled(glyph, theme.accent_style()),
        Span::styled(" generating", theme.subtext_style()),
    ]))
    .alignment(Alignment::Center);

    frame.render_widget(spinner, centered(area, area.width, 1));
}

pub fn render_transcript(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let lines = transcript_lines(app, theme);

    // Approximate the wrapped height so the newest text stays in view
    let available_width = (area.width as usize).max(1);
    let total_visual_lines: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(available_width).max(1))
        .sum();
    let scroll = total_visual_lines.saturating_sub(area.height as usize);

    let transcript = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));

    frame.render_widget(transcript, area);
}

pub fn render_confirmation(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let message = app.commit_message().unwrap_or_default();
    let [message_area, question_area, buttons_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .areas(centered(area, area.width, 5));

    let message = Paragraph::new(message.to_string())
        .alignment(Alignment::Center)
        .style(theme.accent_style().add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true });
    frame.render_widget(message, message_area);

    let question = if app.phase() == Phase::Committing {
        Span::styled("committing...", theme.subtext_style())
    } else {
        Span::styled("looks good?", theme.text_style())
    };
    frame.render_widget(
        Paragraph::new(Line::from(question)).alignment(Alignment::Center),
        question_area,
    );

    let buttons = Line::from(vec![
        button(" Yes ", app.looks_good, theme),
        Span::raw("   "),
        button(" No ", !app.looks_good, theme),
    ]);
    frame.render_widget(
        Paragraph::new(buttons).alignment(Alignment::Center),
        buttons_area,
    );
}

fn button<'a>(label: &'a str, active: bool, theme: &Theme) -> Span<'a> {
    if active {
        Span::styled(
            label,
            Style::default()
                .fg(theme.accent)
                .bg(theme.button)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(label, theme.subtext_style())
    }
}

pub fn render_footer(frame: &mut Frame, text: &str, theme: &Theme, area: Rect) {
    let footer = Paragraph::new(text.to_string())
        .alignment(Alignment::Center)
        .style(theme.alt_text_style());

    frame.render_widget(footer, area);
}
