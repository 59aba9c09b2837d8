use tipper_types::events::PlatformEvent;
use tipper_types::models::Verb;

use crate::parser::{self, ParseResult};

/// What the session loop should do with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SetIdentity(String),
    ClearIdentity,
    /// Hand to the worker pool
    Work(Work),
    /// Transient platform error; log and carry on
    TransientError(String),
    Ignore,
    /// Credentials rejected; stop reading events
    Stop,
}

/// Per-event work that touches the registry or the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Work {
    Tip {
        tipper: String,
        channel: String,
        recipient: String,
    },
    Register {
        identity: String,
        channel: String,
        address: String,
    },
    Reaction {
        tipper: String,
        recipient: String,
        channel: Option<String>,
    },
    UnknownCommand {
        channel: String,
    },
}

/// Route an event. `bot` is the current self identity, `trigger` the
/// configured tip reaction.
pub fn classify(event: PlatformEvent, bot: Option<&str>, trigger: &str) -> Route {
    match event {
        PlatformEvent::Connected { identity } => Route::SetIdentity(identity),
        PlatformEvent::Disconnected => Route::ClearIdentity,
        PlatformEvent::InvalidAuth => Route::Stop,
        PlatformEvent::PlatformError { message } => Route::TransientError(message),

        PlatformEvent::IncomingMessage {
            sender,
            channel,
            text,
            ..
        } if bot != Some(sender.as_str()) => match parser::parse(&text, bot) {
            ParseResult::NotAddressed => Route::Ignore,
            ParseResult::Command(cmd) => match cmd.verb {
                Verb::Tip => Route::Work(Work::Tip {
                    tipper: sender,
                    channel,
                    recipient: cmd.argument,
                }),
                Verb::Register => Route::Work(Work::Register {
                    identity: sender,
                    channel,
                    address: cmd.argument,
                }),
            },
            ParseResult::UnknownCommand { .. } | ParseResult::ParseFailure => {
                Route::Work(Work::UnknownCommand { channel })
            }
        },
        // Our own messages
        PlatformEvent::IncomingMessage { .. } => Route::Ignore,

        PlatformEvent::ReactionAdded {
            reactor,
            target,
            channel,
            reaction,
            ..
        } => {
            if reaction != trigger || target.is_empty() {
                return Route::Ignore;
            }
            Route::Work(Work::Reaction {
                tipper: reactor,
                recipient: target,
                channel,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> PlatformEvent {
        PlatformEvent::IncomingMessage {
            event_id: None,
            sender: "UA".into(),
            channel: "C1".into(),
            text: text.into(),
        }
    }

    fn reaction(name: &str) -> PlatformEvent {
        PlatformEvent::ReactionAdded {
            event_id: None,
            reactor: "UA".into(),
            target: "UB".into(),
            channel: Some("C1".into()),
            reaction: name.into(),
        }
    }

    #[test]
    fn lifecycle_events() {
        assert_eq!(
            classify(PlatformEvent::Connected { identity: "BOT".into() }, None, "tip"),
            Route::SetIdentity("BOT".into())
        );
        assert_eq!(classify(PlatformEvent::Disconnected, Some("BOT"), "tip"), Route::ClearIdentity);
        assert_eq!(classify(PlatformEvent::InvalidAuth, Some("BOT"), "tip"), Route::Stop);
        assert_eq!(
            classify(PlatformEvent::PlatformError { message: "ratelimited".into() }, None, "tip"),
            Route::TransientError("ratelimited".into())
        );
    }

    #[test]
    fn tip_command() {
        assert_eq!(
            classify(message("<@BOT> tip <@UB>"), Some("BOT"), "tip"),
            Route::Work(Work::Tip {
                tipper: "UA".into(),
                channel: "C1".into(),
                recipient: "UB".into(),
            })
        );
    }

    #[test]
    fn register_command_binds_sender() {
        assert_eq!(
            classify(message("<@BOT> register 0xABC"), Some("BOT"), "tip"),
            Route::Work(Work::Register {
                identity: "UA".into(),
                channel: "C1".into(),
                address: "0xABC".into(),
            })
        );
    }

    #[test]
    fn unaddressed_and_unknown() {
        assert_eq!(classify(message("hello"), Some("BOT"), "tip"), Route::Ignore);
        assert_eq!(classify(message("<@BOT> tip <@UB>"), None, "tip"), Route::Ignore);
        assert_eq!(
            classify(message("<@BOT> foo bar"), Some("BOT"), "tip"),
            Route::Work(Work::UnknownCommand { channel: "C1".into() })
        );
        assert_eq!(
            classify(message("<@BOT> ???"), Some("BOT"), "tip"),
            Route::Work(Work::UnknownCommand { channel: "C1".into() })
        );
    }

    #[test]
    fn own_messages_are_ignored() {
        let own = PlatformEvent::IncomingMessage {
            event_id: None,
            sender: "BOT".into(),
            channel: "C1".into(),
            text: "<@BOT> register 0xA".into(),
        };
        assert_eq!(classify(own.clone(), Some("BOT"), "tip"), Route::Ignore);

        let own = PlatformEvent::IncomingMessage {
            event_id: None,
            sender: "BOT".into(),
            channel: "C1".into(),
            text: "<@BOT> foo bar".into(),
        };
        assert_eq!(classify(own, Some("BOT"), "tip"), Route::Ignore);
    }

    #[test]
    fn only_trigger_reaction_dispatches() {
        assert_eq!(
            classify(reaction("tip"), Some("BOT"), "tip"),
            Route::Work(Work::Reaction {
                tipper: "UA".into(),
                recipient: "UB".into(),
                channel: Some("C1".into()),
            })
        );
        assert_eq!(classify(reaction("thumbsup"), Some("BOT"), "tip"), Route::Ignore);
        assert_eq!(classify(reaction("Tip"), Some("BOT"), "tip"), Route::Ignore);
    }
}
