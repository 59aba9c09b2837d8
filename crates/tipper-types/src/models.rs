/// Commands the bot understands. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Tip,
    Register,
}

impl Verb {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "tip" => Some(Self::Tip),
            "register" => Some(Self::Register),
            _ => None,
        }
    }
}

/// A parsed bot command. `argument` is an identity for `tip` and an
/// address for `register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub argument: String,
}

/// What caused a transfer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// `@bot tip @user` posted in `channel`
    Command { tipper: String, channel: String },
    /// Trigger reaction added by `tipper`
    Reaction { tipper: String, channel: Option<String> },
}

impl Trigger {
    pub fn tipper(&self) -> &str {
        match self {
            Self::Command { tipper, .. } | Self::Reaction { tipper, .. } => tipper,
        }
    }

    /// Channel the trigger happened in, if the platform reported one.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::Command { channel, .. } => Some(channel),
            Self::Reaction { channel, .. } => channel.as_deref(),
        }
    }
}

/// Result of one dispatch attempt.
///
/// `Sent` means the ledger accepted the transfer for broadcast. It does not
/// mean the transfer has settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Sent { tx_reference: String },
    /// No address registered for the recipient; the ledger was not called
    Unregistered,
    /// Registry or ledger failure. A ledger failure is indeterminate: the
    /// transfer may or may not have been broadcast.
    Failed { detail: String },
}
