use std::sync::Arc;

use tracing::{debug, info};

use tipper_types::models::Trigger;

use crate::classifier::Work;
use crate::dispatcher::TransferDispatcher;
use crate::identity::SelfIdentity;
use crate::notifier::Notifier;

/// Executes one unit of work and reports the result back to chat.
#[derive(Clone)]
pub struct Handler {
    dispatcher: TransferDispatcher,
    notifier: Notifier,
    identity: Arc<SelfIdentity>,
}

impl Handler {
    pub fn new(dispatcher: TransferDispatcher, notifier: Notifier, identity: Arc<SelfIdentity>) -> Self {
        Self {
            dispatcher,
            notifier,
            identity,
        }
    }

    pub async fn handle(&self, work: Work) {
        let bot = self.identity.get();

        match work {
            Work::Tip {
                tipper,
                channel,
                recipient,
            } => {
                info!("{} tipped {} in {}", tipper, recipient, channel);
                let trigger = Trigger::Command { tipper, channel };
                self.transfer(trigger, &recipient, bot.as_deref()).await;
            }

            Work::Reaction {
                tipper,
                recipient,
                channel,
            } => {
                info!("{} reacted to a message from {}", tipper, recipient);
                let trigger = Trigger::Reaction { tipper, channel };
                self.transfer(trigger, &recipient, bot.as_deref()).await;
            }

            Work::Register {
                identity,
                channel,
                address,
            } => match self.dispatcher.register(&identity, &address).await {
                Ok(()) => self.notifier.registered(&channel, &address).await,
                Err(e) => self.notifier.registry_failure(&channel, &e).await,
            },

            Work::UnknownCommand { channel } => {
                debug!("Unknown command in {}", channel);
                self.notifier.unknown_command(&channel, bot.as_deref()).await;
            }
        }
    }

    async fn transfer(&self, trigger: Trigger, recipient: &str, bot: Option<&str>) {
        let outcome = self.dispatcher.dispatch(recipient).await;
        self.notifier
            .transfer_outcome(&trigger, recipient, &outcome, bot)
            .await;
    }
}
