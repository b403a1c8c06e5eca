use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::events::{Decision, Event};

/// What the UI is showing, derived from the event history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SelectingKeyword,
    Loading,
    Streaming,
    AwaitingDecision,
    Committing,
}

#[derive(Debug)]
pub struct App {
    pub keywords: Vec<String>,
    pub selected: usize,
    pub keyword: Option<String>,
    pub events: Vec<Event>,
    pub looks_good: bool,
    pub show_thinking: bool,
    pub should_quit: bool,
    pub spinner_frame: usize,
    pub version: &'static str,
    decision_sent: bool,
    started: Option<Instant>,
    finished: Option<Duration>,
}

impl App {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            selected: 0,
            keyword: None,
            events: Vec::new(),
            looks_good: true,
            show_thinking: true,
            should_quit: false,
            spinner_frame: 0,
            version: env!("CARGO_PKG_VERSION"),
            decision_sent: false,
            started: None,
            finished: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.keyword.is_none() {
            return Phase::SelectingKeyword;
        }

        match self.events.last() {
            None | Some(Event::Loading) => Phase::Loading,
            Some(Event::Commit(_)) if self.decision_sent => Phase::Committing,
            Some(Event::Commit(_)) => Phase::AwaitingDecision,
            Some(_) => Phase::Streaming,
        }
    }

    /// The proposed message, once generation produced one.
    pub fn commit_message(&self) -> Option<&str> {
        match self.events.last() {
            Some(Event::Commit(message)) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match &event {
            Event::Loading => {
                self.started = Some(Instant::now());
                self.finished = None;
            }
            Event::Commit(_) => {
                self.finished = Some(self.elapsed());
                self.looks_good = true;
                self.decision_sent = false;
            }
            Event::Thought(_) | Event::Response(_) => {}
        }
        self.events.push(event);
    }

    /// Apply a key press; returns the decision to send back, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Decision> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit();
                return None;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit();
                return None;
            }
            _ => {}
        }

        match self.phase() {
            Phase::SelectingKeyword => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => self.select_next(),
                KeyCode::Enter => return self.choose_keyword(),
                _ => {}
            },
            Phase::AwaitingDecision => match key.code {
                KeyCode::Left | KeyCode::Char('h' | 'y') => self.looks_good = true,
                KeyCode::Right | KeyCode::Char('l' | 'n') => self.looks_good = false,
                KeyCode::Enter => return Some(self.submit()),
                KeyCode::Tab => self.toggle_thinking(),
                _ => {}
            },
            Phase::Loading | Phase::Streaming | Phase::Committing => {
                if key.code == KeyCode::Tab {
                    self.toggle_thinking();
                }
            }
        }
        None
    }

    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_thinking(&mut self) {
        self.show_thinking = !self.show_thinking;
    }

    /// Time spent on the current attempt; frozen once the message arrives.
    pub fn elapsed(&self) -> Duration {
        self.finished
            .or_else(|| self.started.map(|start| start.elapsed()))
            .unwrap_or_default()
    }

    fn select_previous(&mut self) {
        if self.keywords.is_empty() {
            return;
        }
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.keywords.len() - 1);
    }

    fn select_next(&mut self) {
        if self.keywords.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.keywords.len();
    }

    fn choose_keyword(&mut self) -> Option<Decision> {
        let keyword = self.keywords.get(self.selected)?.clone();
        self.keyword = Some(keyword.clone());
        Some(Decision::Keyword(keyword))
    }

    fn submit(&mut self) -> Decision {
        if self.looks_good {
            self.decision_sent = true;
        } else {
            self.events.clear();
        }
        Decision::from_signal(if self.looks_good { "true" } else { "false" })
    }
}
