//! Splits a streamed model answer into reasoning and response text.
//!
//! Models that reason out loud wrap that block in a tag of their own
//! choosing (`<think>`, `<thinking>`, ...). The tag name is not known up
//! front, so it is discovered from the first `<` in the stream and the
//! matching closing tag is derived from it.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::debug;

use crate::events::Event;

static OPENING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)>").expect("Invalid regex"));

/// Where the classifier is in the reasoning-block protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagState {
    /// Plain response text, no `<` seen yet
    NoTagSeen,
    /// A `<` was seen; buffering until a full opening tag appears
    AwaitingOpening,
    /// Inside the reasoning block, waiting for `closing`
    OpeningCaptured { closing: String },
    /// The reasoning block ended; everything else is response
    Closed,
}

/// Per-attempt classifier. Create a fresh one for every generation.
#[derive(Debug)]
pub struct StreamClassifier {
    state: TagState,
    thought: String,
    response: String,
    /// Text received but not yet emitted
    pending: String,
}

impl StreamClassifier {
    pub const fn new() -> Self {
        Self {
            state: TagState::NoTagSeen,
            thought: String::new(),
            response: String::new(),
            pending: String::new(),
        }
    }

    pub const fn state(&self) -> &TagState {
        &self.state
    }

    pub const fn in_thought(&self) -> bool {
        matches!(
            self.state,
            TagState::AwaitingOpening | TagState::OpeningCaptured { .. }
        )
    }

    pub fn closing_tag(&self) -> Option<&str> {
        match &self.state {
            TagState::OpeningCaptured { closing } => Some(closing.as_str()),
            _ => None,
        }
    }

    /// All thought text emitted so far.
    pub fn thought(&self) -> &str {
        &self.thought
    }

    /// All response text emitted so far.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Classify one fragment, returning the events it produces in order.
    pub fn push(&mut self, fragment: &str) -> Vec<Event> {
        let mut events = Vec::new();

        match self.state {
            TagState::NoTagSeen => {
                if let Some(pos) = fragment.find('<') {
                    self.emit_response(&fragment[..pos], &mut events);
                    self.pending.push_str(&fragment[pos..]);
                    self.state = TagState::AwaitingOpening;
                    self.resolve_opening(&mut events);
                } else {
                    self.emit_response(fragment, &mut events);
                }
            }
            TagState::AwaitingOpening => {
                self.pending.push_str(fragment);
                self.resolve_opening(&mut events);
            }
            TagState::OpeningCaptured { .. } => {
                self.pending.push_str(fragment);
                self.resolve_closing(&mut events);
            }
            TagState::Closed => self.emit_response(fragment, &mut events),
        }

        events
    }

    /// End of stream: anything still buffered inside an unterminated
    /// reasoning block is thought.
    pub fn finish(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.in_thought() {
            let rest = std::mem::take(&mut self.pending);
            self.emit_thought(&rest, &mut events);
        }
        events
    }

    fn resolve_opening(&mut self, events: &mut Vec<Event>) {
        let Some((start, end, name)) = OPENING_TAG.captures(&self.pending).and_then(|caps| {
            let tag = caps.get(0)?;
            let name = caps.get(1)?;
            Some((tag.start(), tag.end(), name.as_str().to_string()))
        }) else {
            return;
        };

        debug!(tag = %name, "discovered reasoning block");

        let before = self.pending[..start].to_string();
        self.pending.drain(..end);
        self.emit_thought(&before, events);
        self.state = TagState::OpeningCaptured {
            closing: format!("</{name}>"),
        };
        self.resolve_closing(events);
    }

    fn resolve_closing(&mut self, events: &mut Vec<Event>) {
        let TagState::OpeningCaptured { closing } = &self.state else {
            return;
        };
        let closing = closing.clone();

        if let Some(pos) = self.pending.find(&closing) {
            let thought = self.pending[..pos].to_string();
            let response = self.pending[pos + closing.len()..].to_string();
            self.pending.clear();
            self.state = TagState::Closed;
            self.emit_thought(&thought, events);
            self.emit_response(&response, events);
            return;
        }

        // Hold back a tail that might be the start of the closing tag
        let held = partial_suffix_len(&self.pending, &closing);
        let ready: String = self.pending.drain(..self.pending.len() - held).collect();
        self.emit_thought(&ready, events);
    }

    fn emit_thought(&mut self, text: &str, events: &mut Vec<Event>) {
        if !text.is_empty() {
            self.thought.push_str(text);
            events.push(Event::Thought(text.to_string()));
        }
    }

    fn emit_response(&mut self, text: &str, events: &mut Vec<Event>) {
        if !text.is_empty() {
            self.response.push_str(text);
            events.push(Event::Response(text.to_string()));
        }
    }
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the longest proper prefix of `pattern` that `text` ends with.
fn partial_suffix_len(text: &str, pattern: &str) -> usize {
    (1..pattern.len())
        .rev()
        .find(|&len| pattern.is_char_boundary(len) && text.ends_with(&pattern[..len]))
        .unwrap_or(0)
}
