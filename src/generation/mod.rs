//! One request/stream/extract cycle against the model.

pub mod classifier;
pub mod extract;
pub mod prompt;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::Generator;
use crate::error::Error;
use crate::events::Event;
use crate::models::GenerationConfig;

use classifier::StreamClassifier;

/// How an attempt ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A commit message was extracted and sent to the UI
    Commit(String),
    /// The token fired or the UI went away; nothing more to report
    Cancelled,
}

pub struct GenerationSession<'a, G: ?Sized> {
    generator: &'a G,
    config: &'a GenerationConfig,
}

impl<'a, G: Generator + ?Sized> GenerationSession<'a, G> {
    pub const fn new(generator: &'a G, config: &'a GenerationConfig) -> Self {
        Self { generator, config }
    }

    /// Run one attempt, forwarding every classified fragment to `events`
    /// as soon as it arrives.
    ///
    /// Extraction failure is returned as [`Error::NoCommitMessage`] and is
    /// not retried here; retrying is up to the user.
    pub async fn run(
        &self,
        diff: &str,
        keyword: &str,
        events: &mpsc::Sender<Event>,
        cancel: &CancellationToken,
    ) -> Result<Outcome, Error> {
        info!(keyword, model = %self.config.model, "starting generation attempt");

        if !send(events, Event::Loading, cancel).await {
            return Ok(Outcome::Cancelled);
        }

        let prompt = prompt::build_prompt(keyword, diff);
        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(Outcome::Cancelled),
            result = self.generator.generate(&self.config.model, &prompt, &self.config.options) => result?,
        };

        let mut classifier = StreamClassifier::new();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(Outcome::Cancelled),
                next = stream.next() => next,
            };
            let Some(fragment) = next else {
                break;
            };

            for event in classifier.push(&fragment?) {
                if !send(events, event, cancel).await {
                    return Ok(Outcome::Cancelled);
                }
            }
        }

        if classifier.in_thought() {
            warn!(
                closing_tag = classifier.closing_tag().unwrap_or_default(),
                "stream ended inside a reasoning block"
            );
        }
        for event in classifier.finish() {
            if !send(events, event, cancel).await {
                return Ok(Outcome::Cancelled);
            }
        }
        debug!(
            state = ?classifier.state(),
            thought_len = classifier.thought().len(),
            response_len = classifier.response().len(),
            "stream finished"
        );

        let message = match extract::extract(classifier.response(), keyword, &self.config.keywords) {
            Ok(message) => message,
            Err(err) => {
                warn!(response = classifier.response(), "no commit message in response");
                return Err(err);
            }
        };
        info!(%message, "extracted commit message");

        if !send(events, Event::Commit(message.clone()), cancel).await {
            return Ok(Outcome::Cancelled);
        }

        Ok(Outcome::Commit(message))
    }
}

/// Deliver `event` unless the token fires first. `false` means stop.
async fn send(events: &mpsc::Sender<Event>, event: Event, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = events.send(event) => result.is_ok(),
    }
}
