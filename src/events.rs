// Messages exchanged between the generation driver and the terminal UI

use std::fmt;

/// Discriminant of an [`Event`], used where only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Loading,
    Thought,
    Response,
    Commit,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Thought => "thinking",
            Self::Response => "response",
            Self::Commit => "done",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation progress, sent from the driver to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new attempt started; the model has not produced anything yet
    Loading,
    /// Text from the model's reasoning block
    Thought(String),
    /// Text from the model's answer
    Response(String),
    /// The extracted commit message; terminates the attempt
    Commit(String),
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Loading => EventKind::Loading,
            Self::Thought(_) => EventKind::Thought,
            Self::Response(_) => EventKind::Response,
            Self::Commit(_) => EventKind::Commit,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Loading => "",
            Self::Thought(text) | Self::Response(text) | Self::Commit(text) => text,
        }
    }
}

/// User input, sent from the presentation layer back to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The commit type picked from the keyword list (once per process)
    Keyword(String),
    /// Accept (`true`) or retry (`false`) the proposed message
    Accept(bool),
}

impl Decision {
    /// Only the exact signal `"false"` asks for a retry.
    pub fn from_signal(signal: &str) -> Self {
        Self::Accept(signal != "false")
    }
}
