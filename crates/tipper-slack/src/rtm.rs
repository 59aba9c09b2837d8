use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tipper_gateway::platform::{ChatSink, SendError};
use tipper_types::events::PlatformEvent;

use crate::SlackError;
use crate::api::{RtmConnect, SlackApi};
use crate::events::{RtmFrame, to_platform_event};

/// Heartbeat interval: we send a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the socket is dropped and we reconnect.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Slack as seen by the dispatch core.
#[derive(Clone)]
pub struct SlackPlatform {
    api: Arc<SlackApi>,
}

impl SlackPlatform {
    pub fn new(api: Arc<SlackApi>) -> Self {
        Self { api }
    }

    /// Keep an RTM session open and forward its events until `cancel`
    /// fires, the receiver goes away, or Slack rejects the token.
    pub async fn run(&self, events: mpsc::Sender<PlatformEvent>, cancel: CancellationToken) {
        let mut backoff = INITIAL_BACKOFF;

        while !cancel.is_cancelled() {
            match self.api.rtm_connect().await {
                Ok(session) => {
                    backoff = INITIAL_BACKOFF;
                    let result = run_socket(session, &events, &cancel).await;
                    if let Err(e) = result {
                        warn!("RTM socket closed: {}", e);
                    }
                    if events.send(PlatformEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
                Err(e) if e.is_auth_failure() => {
                    warn!("Slack rejected the bot token: {}", e);
                    let _ = events.send(PlatformEvent::InvalidAuth).await;
                    return;
                }
                Err(e) => {
                    let event = PlatformEvent::PlatformError {
                        message: e.to_string(),
                    };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }

            if cancel.is_cancelled() {
                break;
            }

            debug!("Reconnecting to Slack in {:?}", backoff);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        info!("Slack listener stopped");
    }
}

#[async_trait]
impl ChatSink for SlackPlatform {
    async fn send_message(&self, target: &str, text: &str) -> Result<(), SendError> {
        self.api
            .post_message(target, text)
            .await
            .map_err(|e| SendError {
                target: target.to_string(),
                reason: e.to_string(),
            })
    }

    async fn display_name(&self, identity: &str) -> Option<String> {
        match self.api.display_name(identity).await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!("Could not look up {}: {}", identity, e);
                None
            }
        }
    }
}

/// One socket lifetime: returns when the socket closes, a heartbeat is
/// missed, or we are cancelled.
async fn run_socket(
    session: RtmConnect,
    events: &mpsc::Sender<PlatformEvent>,
    cancel: &CancellationToken,
) -> Result<(), SlackError> {
    let (socket, _) = tokio_tungstenite::connect_async(session.url.as_str()).await?;
    let (mut sender, mut receiver) = socket.split();

    info!("RTM socket open for {} ({})", session.bot.name, session.bot.id);

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut pong_received = true;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = sender.send(Message::Close(None)).await;
                return Ok(());
            }
            _ = heartbeat.tick() => {
                if std::mem::replace(&mut pong_received, false) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping socket", missed_heartbeats);
                        return Ok(());
                    }
                }
                sender.send(Message::Ping(vec![].into())).await?;
            }
            msg = receiver.next() => {
                let msg = match msg {
                    Some(msg) => msg?,
                    None => return Ok(()),
                };

                match msg {
                    Message::Text(text) => {
                        let frame = match serde_json::from_str::<RtmFrame>(text.as_str()) {
                            Ok(frame) => frame,
                            Err(e) => {
                                let raw: String = text.as_str().chars().take(200).collect();
                                trace!("Skipping unrecognised frame: {} -- raw: {}", e, raw);
                                continue;
                            }
                        };

                        let event = match frame {
                            RtmFrame::Hello => Some(PlatformEvent::Connected {
                                identity: session.bot.id.clone(),
                            }),
                            RtmFrame::Goodbye => {
                                info!("Slack asked us to reconnect");
                                return Ok(());
                            }
                            other => to_platform_event(other),
                        };

                        if let Some(event) = event {
                            if events.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    Message::Pong(_) => pong_received = true,
                    Message::Close(_) => return Ok(()),
                    _ => {}
                }
            }
        }
    }
}
