//! Event-to-action dispatch core: classifies platform events, parses bot
//! commands, resolves recipients, requests transfers and reports back.

pub mod classifier;
pub mod dedup;
pub mod dispatcher;
pub mod handlers;
pub mod identity;
pub mod locks;
pub mod notifier;
pub mod parser;
pub mod platform;
pub mod registry;
pub mod session;
