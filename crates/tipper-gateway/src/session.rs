use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tipper_types::events::PlatformEvent;

use crate::classifier::{Route, classify};
use crate::dedup::RecentEvents;
use crate::handlers::Handler;
use crate::identity::SelfIdentity;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reaction name that triggers a tip
    pub trigger_reaction: String,
    /// Maximum number of events handled concurrently
    pub workers: usize,
    /// How many recent event ids the redelivery guard remembers
    pub dedup_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    StreamClosed,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("platform rejected the bot credentials")]
    InvalidAuth,
}

/// Sole consumer of the platform event stream.
///
/// Identity changes are applied in stream order. Transfers and
/// registrations run on a bounded pool of workers; once every worker is busy
/// the loop stops reading until one frees up.
pub struct Session {
    identity: Arc<SelfIdentity>,
    handler: Handler,
    trigger: String,
    workers: Arc<Semaphore>,
    recent: RecentEvents,
}

impl Session {
    pub fn new(config: SessionConfig, identity: Arc<SelfIdentity>, handler: Handler) -> Self {
        Self {
            identity,
            handler,
            trigger: config.trigger_reaction,
            workers: Arc::new(Semaphore::new(config.workers.max(1))),
            recent: RecentEvents::new(config.dedup_capacity),
        }
    }

    /// Consume events until the stream closes, `cancel` fires, or the
    /// platform rejects our credentials. In-flight work is awaited before
    /// returning; on cancellation it is abandoned at its next await point.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<PlatformEvent>,
        cancel: CancellationToken,
    ) -> Result<SessionEnd, SessionError> {
        let mut tasks = JoinSet::new();

        let result = loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break Ok(SessionEnd::Cancelled),
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break Ok(SessionEnd::StreamClosed),
                },
            };

            if let Some(id) = event.event_id() {
                if !self.recent.first_seen(id) {
                    debug!("Dropping redelivered event {}", id);
                    continue;
                }
            }

            let bot = self.identity.get();
            match classify(event, bot.as_deref(), &self.trigger) {
                Route::SetIdentity(identity) => self.identity.set(identity),
                Route::ClearIdentity => {
                    info!("Platform session lost, waiting for reconnect");
                    self.identity.clear();
                }
                Route::TransientError(message) => warn!("Platform error: {}", message),
                Route::Ignore => {}
                Route::Stop => {
                    error!("Invalid credentials, stopping session");
                    break Err(SessionError::InvalidAuth);
                }
                Route::Work(work) => {
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => break Ok(SessionEnd::Cancelled),
                        permit = self.workers.clone().acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break Ok(SessionEnd::Cancelled),
                        },
                    };

                    let handler = self.handler.clone();
                    let cancel = cancel.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        tokio::select! {
                            _ = cancel.cancelled() => warn!("Shutdown interrupted in-flight work"),
                            _ = handler.handle(work) => {}
                        }
                    });
                }
            }

            while let Some(done) = tasks.try_join_next() {
                log_worker_exit(done);
            }
        };

        while let Some(done) = tasks.join_next().await {
            log_worker_exit(done);
        }

        result
    }
}

fn log_worker_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("Worker task failed: {}", e);
    }
}
