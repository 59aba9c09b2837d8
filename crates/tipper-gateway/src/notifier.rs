use std::sync::Arc;

use tracing::warn;

use tipper_types::models::{TransferOutcome, Trigger};

use crate::parser::mention;
use crate::platform::ChatSink;
use crate::registry::RegistryError;

/// Formats outcomes and posts them back to chat. One message per outcome.
/// Send failures are logged and dropped; whatever already happened stays.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ChatSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self { sink }
    }

    pub async fn transfer_outcome(
        &self,
        trigger: &Trigger,
        recipient: &str,
        outcome: &TransferOutcome,
        bot: Option<&str>,
    ) {
        match outcome {
            TransferOutcome::Unregistered => {
                self.send(recipient, &register_prompt(bot)).await;
            }
            TransferOutcome::Sent { tx_reference } => {
                let from = match self.sink.display_name(trigger.tipper()).await {
                    Some(name) => format!("@{}", name),
                    None => mention(trigger.tipper()),
                };
                let text = format!(":+1: You got a token from {} at {}", from, tx_reference);
                self.send(recipient, &text).await;
            }
            TransferOutcome::Failed { detail } => {
                let target = trigger.channel().unwrap_or(trigger.tipper());
                self.send(target, &format!(":x: {}", detail)).await;
            }
        }
    }

    pub async fn registered(&self, channel: &str, address: &str) {
        self.send(channel, &format!(":o: Registered `{}`", address)).await;
    }

    pub async fn registry_failure(&self, channel: &str, err: &RegistryError) {
        self.send(channel, &format!(":x: {}", err)).await;
    }

    pub async fn unknown_command(&self, channel: &str, bot: Option<&str>) {
        let bot = bot.map(mention).unwrap_or_else(|| "@bot".to_string());
        let text = format!(
            ":question: Unknown command. Try:\n\n> {bot} tip @user\n> {bot} register YOUR_ADDRESS"
        );
        self.send(channel, &text).await;
    }

    async fn send(&self, target: &str, text: &str) {
        if let Err(e) = self.sink.send_message(target, text).await {
            warn!("{}", e);
        }
    }
}

fn register_prompt(bot: Option<&str>) -> String {
    let bot = bot.map(mention).unwrap_or_else(|| "@bot".to_string());
    format!(":question: Please register your address:\n\n> {} register YOUR_ADDRESS", bot)
}
