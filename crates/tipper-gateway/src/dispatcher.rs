use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use tipper_ledger::LedgerGateway;
use tipper_types::models::TransferOutcome;

use crate::locks::KeyedLocks;
use crate::registry::{AddressRegistry, RegistryError};

/// Fixed transfer parameters. The amount never comes from chat input.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub amount: u128,
    pub ledger_timeout: Duration,
}

/// Resolves recipients and requests transfers. One outcome per call.
///
/// Work on one identity is serialized: a `register` and a transfer to the
/// same identity never interleave, so a transfer never goes to an address
/// that was replaced while it was being resolved.
#[derive(Clone)]
pub struct TransferDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    registry: Arc<dyn AddressRegistry>,
    ledger: Arc<dyn LedgerGateway>,
    settings: DispatchSettings,
    locks: KeyedLocks,
}

impl TransferDispatcher {
    pub fn new(
        registry: Arc<dyn AddressRegistry>,
        ledger: Arc<dyn LedgerGateway>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                ledger,
                settings,
                locks: KeyedLocks::new(),
            }),
        }
    }

    /// Send the configured amount to `recipient`'s registered address.
    ///
    /// `Sent` means accepted for broadcast, not settled.
    pub async fn dispatch(&self, recipient: &str) -> TransferOutcome {
        let _guard = self.inner.locks.lock(recipient).await;

        let address = match self.inner.registry.resolve(recipient).await {
            Ok(Some(address)) => address,
            Ok(None) => {
                info!("{} has no registered address, skipping transfer", recipient);
                return TransferOutcome::Unregistered;
            }
            Err(e) => {
                warn!("Address lookup for {} failed: {}", recipient, e);
                return TransferOutcome::Failed {
                    detail: e.to_string(),
                };
            }
        };

        let DispatchSettings {
            amount,
            ledger_timeout,
        } = self.inner.settings;

        match tokio::time::timeout(ledger_timeout, self.inner.ledger.transfer(&address, amount)).await
        {
            Ok(Ok(tx_reference)) => {
                info!("Sent {} to {} ({}): {}", amount, recipient, address, tx_reference);
                TransferOutcome::Sent { tx_reference }
            }
            Ok(Err(e)) => {
                warn!("Transfer to {} ({}) failed: {}", recipient, address, e);
                TransferOutcome::Failed {
                    detail: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    "Transfer to {} ({}) timed out after {:?}",
                    recipient, address, ledger_timeout
                );
                TransferOutcome::Failed {
                    detail: format!(
                        "ledger did not answer within {}s, the transfer may still go through",
                        ledger_timeout.as_secs()
                    ),
                }
            }
        }
    }

    /// Bind `identity` to `address`, replacing any earlier registration.
    pub async fn register(&self, identity: &str, address: &str) -> Result<(), RegistryError> {
        let _guard = self.inner.locks.lock(identity).await;

        self.inner.registry.upsert(identity, address).await?;
        info!("Registered {} for {}", address, identity);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tipper_db::Database;
    use tipper_ledger::LedgerError;

    use crate::registry::SqliteRegistry;

    /// Records every transfer request and answers with a canned result.
    pub struct RecordingLedger {
        pub calls: Mutex<Vec<(String, u128)>>,
        pub reply: Result<String, String>,
        pub delay: Duration,
    }

    impl RecordingLedger {
        pub fn ok(tx: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                reply: Ok(tx.to_string()),
                delay: Duration::ZERO,
            })
        }

        pub fn calls(&self) -> Vec<(String, u128)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LedgerGateway for RecordingLedger {
        async fn transfer(&self, to_address: &str, amount: u128) -> Result<String, LedgerError> {
            self.calls.lock().unwrap().push((to_address.to_string(), amount));
            tokio::time::sleep(self.delay).await;
            self.reply.clone().map_err(|message| LedgerError::Rpc { code: -32000, message })
        }
    }

    fn settings() -> DispatchSettings {
        DispatchSettings {
            amount: 100,
            ledger_timeout: Duration::from_secs(5),
        }
    }

    fn dispatcher(ledger: Arc<RecordingLedger>) -> TransferDispatcher {
        let registry = SqliteRegistry::new(Arc::new(Database::open_in_memory().unwrap()));
        TransferDispatcher::new(Arc::new(registry), ledger, settings())
    }

    #[tokio::test]
    async fn unregistered_recipient_never_reaches_ledger() {
        let ledger = RecordingLedger::ok("0x123");
        let dispatcher = dispatcher(ledger.clone());

        assert_eq!(dispatcher.dispatch("U1").await, TransferOutcome::Unregistered);
        assert!(ledger.calls().is_empty());
    }

    #[tokio::test]
    async fn registered_recipient_gets_fixed_amount_once() {
        let ledger = RecordingLedger::ok("0x123");
        let dispatcher = dispatcher(ledger.clone());
        dispatcher.register("U1", "0xABC").await.unwrap();

        let outcome = dispatcher.dispatch("U1").await;

        assert_eq!(
            outcome,
            TransferOutcome::Sent {
                tx_reference: "0x123".into()
            }
        );
        assert_eq!(ledger.calls(), vec![("0xABC".to_string(), 100)]);
    }

    #[tokio::test]
    async fn ledger_error_becomes_failed_outcome() {
        let ledger = Arc::new(RecordingLedger {
            calls: Mutex::new(Vec::new()),
            reply: Err("insufficient funds".into()),
            delay: Duration::ZERO,
        });
        let dispatcher = dispatcher(ledger.clone());
        dispatcher.register("U1", "0xABC").await.unwrap();

        match dispatcher.dispatch("U1").await {
            TransferOutcome::Failed { detail } => assert!(detail.contains("insufficient funds")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        // not retried
        assert_eq!(ledger.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ledger_times_out() {
        let ledger = Arc::new(RecordingLedger {
            calls: Mutex::new(Vec::new()),
            reply: Ok("0x123".into()),
            delay: Duration::from_secs(60),
        });
        let dispatcher = dispatcher(ledger.clone());
        dispatcher.register("U1", "0xABC").await.unwrap();

        match dispatcher.dispatch("U1").await {
            TransferOutcome::Failed { detail } => assert!(detail.contains("within 5s")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn register_waits_for_in_flight_transfer() {
        let ledger = Arc::new(RecordingLedger {
            calls: Mutex::new(Vec::new()),
            reply: Ok("0x1".into()),
            delay: Duration::from_millis(200),
        });
        let dispatcher = dispatcher(ledger.clone());
        dispatcher.register("U1", "0xA1").await.unwrap();

        let transfer = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.dispatch("U1").await }
        });
        // let the transfer take the lock and reach the ledger
        while ledger.calls().is_empty() {
            tokio::task::yield_now().await;
        }

        let register = dispatcher.register("U1", "0xA2");
        tokio::pin!(register);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut register)
                .await
                .is_err(),
            "register finished while the transfer held the lock"
        );
        assert!(!transfer.is_finished());

        register.await.unwrap();
        assert!(transfer.is_finished());
        assert_eq!(
            transfer.await.unwrap(),
            TransferOutcome::Sent {
                tx_reference: "0x1".into()
            }
        );
        assert_eq!(ledger.calls(), vec![("0xA1".to_string(), 100)]);

        dispatcher.dispatch("U1").await;
        assert_eq!(ledger.calls()[1], ("0xA2".to_string(), 100));
    }

    #[tokio::test]
    async fn reregistration_redirects_next_transfer() {
        let ledger = RecordingLedger::ok("0x1");
        let dispatcher = dispatcher(ledger.clone());

        dispatcher.register("U1", "0xA1").await.unwrap();
        dispatcher.register("U1", "0xA2").await.unwrap();
        dispatcher.dispatch("U1").await;

        assert_eq!(ledger.calls(), vec![("0xA2".to_string(), 100)]);
    }
}
