use std::sync::LazyLock;

use regex::Regex;

use tipper_types::models::{Command, Verb};

/// `<@BOT> <verb> <argument>` where the argument is either a mention
/// (`<@U123>`) or a bare token (an address).
static COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<@[^>]+> ([^<]+) (?:<@)?([^ <>]+)(?:>)?").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// Text does not start with a mention of the bot. Ignored silently.
    NotAddressed,
    Command(Command),
    UnknownCommand { verb: String },
    /// Addressed to the bot but not in `<verb> <argument>` form
    ParseFailure,
}

/// Parse a chat message. `bot` is `None` until the platform has told us who
/// we are; everything is unaddressed in that window.
pub fn parse(text: &str, bot: Option<&str>) -> ParseResult {
    let Some(bot) = bot else {
        return ParseResult::NotAddressed;
    };

    if !text.starts_with(&mention(bot)) {
        return ParseResult::NotAddressed;
    }

    let Some(caps) = COMMAND_RE.captures(text) else {
        return ParseResult::ParseFailure;
    };

    let verb = &caps[1];
    let argument = strip_label(&caps[2]);

    match Verb::from_word(verb) {
        Some(verb) => ParseResult::Command(Command {
            verb,
            argument: argument.to_string(),
        }),
        None => ParseResult::UnknownCommand {
            verb: verb.to_string(),
        },
    }
}

/// Mention token for an identity, as it appears in message text.
pub fn mention(identity: &str) -> String {
    format!("<@{}>", identity)
}

/// `U123|alice` → `U123`
fn strip_label(token: &str) -> &str {
    token.split_once('|').map_or(token, |(id, _)| id)
}
