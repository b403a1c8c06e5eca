//! Runs the terminal UI and the generation driver side by side.
//!
//! The two halves only talk through a bounded event channel
//! (driver to UI), a bounded decision channel (UI to driver) and one
//! shared cancellation token. Whichever half finishes first cancels the
//! token so the other one unwinds.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::Generator;
use crate::error::Error;
use crate::events::{Decision, Event};
use crate::generation::{GenerationSession, Outcome};
use crate::git::Repository;
use crate::models::GenerationConfig;

pub const EVENT_BUFFER: usize = 10;
pub const DECISION_BUFFER: usize = 1;

/// Fetch the staged diff, refusing to start when there is nothing staged.
pub async fn prepare_diff<R: Repository + ?Sized>(repository: &R) -> Result<String, Error> {
    let diff = repository.staged_diff().await?;
    if diff.trim().is_empty() {
        return Err(Error::NoChanges);
    }
    Ok(diff)
}

/// Wait for the next value on `rx`, giving up when the token fires.
pub async fn next_decision<T>(
    rx: &mut mpsc::Receiver<T>,
    cancel: &CancellationToken,
) -> Option<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        value = rx.recv() => value,
    }
}

pub struct Coordinator<G, R> {
    generator: G,
    repository: R,
    config: GenerationConfig,
    diff: String,
}

impl<G, R> Coordinator<G, R>
where
    G: Generator + 'static,
    R: Repository + 'static,
{
    pub const fn new(generator: G, repository: R, config: GenerationConfig, diff: String) -> Self {
        Self {
            generator,
            repository,
            config,
            diff,
        }
    }

    /// Spawn `presentation` and the generation driver, wait for both, and
    /// return git's confirmation output if a commit was made.
    ///
    /// `None` means the user quit before accepting a message. When both
    /// halves fail, the driver's error is reported.
    pub async fn run<P, Fut>(self, presentation: P) -> Result<Option<String>, Error>
    where
        P: FnOnce(mpsc::Receiver<Event>, mpsc::Sender<Decision>, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (decision_tx, decision_rx) = mpsc::channel(DECISION_BUFFER);

        let ui_cancel = cancel.clone();
        let ui_loop = presentation(event_rx, decision_tx, cancel.clone());
        let ui = tokio::spawn(async move {
            let result = ui_loop.await;
            ui_cancel.cancel();
            result
        });

        let driver_cancel = cancel.clone();
        let driver = tokio::spawn(async move {
            let result = self.drive(event_tx, decision_rx, &driver_cancel).await;
            driver_cancel.cancel();
            result
        });

        let (ui_result, driver_result) = tokio::join!(ui, driver);
        let committed = driver_result??;
        ui_result??;

        Ok(committed)
    }

    async fn drive(
        self,
        events: mpsc::Sender<Event>,
        mut decisions: mpsc::Receiver<Decision>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, Error> {
        let Some(keyword) = wait_for_keyword(&mut decisions, cancel).await else {
            debug!("exited before choosing a commit type");
            return Ok(None);
        };
        info!(%keyword, "commit type selected");

        let session = GenerationSession::new(&self.generator, &self.config);
        let mut attempt = 1_u32;
        let message = loop {
            debug!(attempt, "generating");
            let message = match session.run(&self.diff, &keyword, &events, cancel).await? {
                Outcome::Commit(message) => message,
                Outcome::Cancelled => return Ok(None),
            };

            match wait_for_confirmation(&mut decisions, cancel).await {
                Some(true) => break message,
                Some(false) => {
                    info!(attempt, "message rejected, retrying");
                    attempt += 1;
                }
                None => return Ok(None),
            }
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }

        let output = self.repository.commit(&message).await?;
        Ok(Some(output))
    }
}

async fn wait_for_keyword(
    decisions: &mut mpsc::Receiver<Decision>,
    cancel: &CancellationToken,
) -> Option<String> {
    loop {
        match next_decision(decisions, cancel).await? {
            Decision::Keyword(keyword) => return Some(keyword),
            other => warn!(?other, "ignoring decision while waiting for a commit type"),
        }
    }
}

async fn wait_for_confirmation(
    decisions: &mut mpsc::Receiver<Decision>,
    cancel: &CancellationToken,
) -> Option<bool> {
    loop {
        match next_decision(decisions, cancel).await? {
            Decision::Accept(accepted) => return Some(accepted),
            other => warn!(?other, "ignoring decision while waiting for confirmation"),
        }
    }
}
