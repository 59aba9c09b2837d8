use serde::Deserialize;

use tipper_types::events::PlatformEvent;

/// RTM frames we care about. Anything else is `Other`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RtmFrame {
    Hello,
    Goodbye,
    Message(MessageFrame),
    ReactionAdded(ReactionFrame),
    Error { error: RtmErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct MessageFrame {
    pub subtype: Option<String>,
    pub channel: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,
    pub client_msg_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionFrame {
    pub user: String,
    pub reaction: String,
    pub item_user: Option<String>,
    pub item: ReactionItem,
    pub event_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RtmErrorBody {
    pub code: Option<i64>,
    pub msg: Option<String>,
}

/// Map a frame to a platform event. Lifecycle frames (`hello`, `goodbye`)
/// are handled by the socket loop and map to `None` here.
pub fn to_platform_event(frame: RtmFrame) -> Option<PlatformEvent> {
    match frame {
        RtmFrame::Message(msg) => {
            // Edits, deletions, bot posts and joins are not commands
            if msg.subtype.as_deref().is_some_and(|s| s != "thread_broadcast") {
                return None;
            }
            let channel = msg.channel?;
            let event_id = msg
                .client_msg_id
                .or_else(|| msg.ts.map(|ts| format!("{}:{}", channel, ts)));

            Some(PlatformEvent::IncomingMessage {
                event_id,
                sender: msg.user?,
                channel,
                text: msg.text?,
            })
        }

        RtmFrame::ReactionAdded(reaction) => Some(PlatformEvent::ReactionAdded {
            event_id: reaction.event_ts,
            reactor: reaction.user,
            target: reaction.item_user.unwrap_or_default(),
            channel: (reaction.item.kind == "message")
                .then_some(reaction.item.channel)
                .flatten(),
            reaction: reaction.reaction,
        }),

        RtmFrame::Error { error } => Some(PlatformEvent::PlatformError {
            message: format!(
                "rtm error {}: {}",
                error.code.unwrap_or_default(),
                error.msg.unwrap_or_default()
            ),
        }),

        RtmFrame::Hello | RtmFrame::Goodbye | RtmFrame::Other => None,
    }
}
