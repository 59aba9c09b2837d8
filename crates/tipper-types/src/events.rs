/// Events delivered by the messaging platform to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Platform confirms the session; carries the bot's own identity
    Connected { identity: String },

    /// The session dropped; the bot identity is unknown until the next `Connected`
    Disconnected,

    /// A chat message was posted in a channel or DM
    IncomingMessage {
        event_id: Option<String>,
        sender: String,
        channel: String,
        text: String,
    },

    /// A reaction was added to a message
    ReactionAdded {
        event_id: Option<String>,
        /// User who added the reaction
        reactor: String,
        /// Author of the message that was reacted to
        target: String,
        /// Channel of the reacted message, when the item is a message
        channel: Option<String>,
        reaction: String,
    },

    /// Transient platform error; the stream continues
    PlatformError { message: String },

    /// The platform rejected our credential. Terminal.
    InvalidAuth,
}

impl PlatformEvent {
    /// Platform delivery id, used to drop redelivered events.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::IncomingMessage { event_id, .. } => event_id.as_deref(),
            Self::ReactionAdded { event_id, .. } => event_id.as_deref(),
            _ => None,
        }
    }
}
