use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use locker_core::address::TonAddress;
use locker_core::helpers::dto::AccountStatus;
use log::info;

/// Deposit lookup against the locker contract, one call per new address.
#[async_trait]
pub trait DepositChecker: Send + Sync {
    async fn has_deposit(&self, user: &TonAddress) -> Result<bool>;
}

/// Resolves a pasted or session-provided address into an account status.
/// The deposit check runs once per distinct address; a `NotFound` outcome is
/// terminal for that address and is never re-queried here — the user has to
/// disconnect and try a different one.
pub struct WalletConnection {
    checker: Arc<dyn DepositChecker>,
    last: Mutex<Option<(TonAddress, bool)>>,
}

impl WalletConnection {
    pub fn new(checker: Arc<dyn DepositChecker>) -> Self {
        Self {
            checker,
            last: Mutex::new(None),
        }
    }

    pub async fn resolve(&self, address: &str) -> Result<AccountStatus> {
        let user: TonAddress = address
            .trim()
            .parse()
            .context("invalid wallet address")?;

        let cached = *self.last.lock().expect("wallet cache lock poisoned");
        if let Some((seen, has_deposit)) = cached {
            if seen == user {
                return Ok(status(user, has_deposit));
            }
        }

        let has_deposit = self.checker.has_deposit(&user).await?;
        *self.last.lock().expect("wallet cache lock poisoned") = Some((user, has_deposit));
        if !has_deposit {
            info!("No locker deposit found for {}", user.to_raw());
        }

        Ok(status(user, has_deposit))
    }
}

fn status(user: TonAddress, has_deposit: bool) -> AccountStatus {
    if has_deposit {
        AccountStatus::Active { user }
    } else {
        AccountStatus::NotFound { user }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingChecker {
        calls: AtomicUsize,
        deposits: Vec<TonAddress>,
        fail_next: Mutex<bool>,
    }

    impl CountingChecker {
        fn new(deposits: Vec<TonAddress>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                deposits,
                fail_next: Mutex::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DepositChecker for CountingChecker {
        async fn has_deposit(&self, user: &TonAddress) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
                return Err(anyhow!("validation service unavailable"));
            }
            Ok(self.deposits.contains(user))
        }
    }

    fn depositor() -> TonAddress {
        TonAddress::new(0, [0x22; 32])
    }

    fn stranger() -> TonAddress {
        TonAddress::new(0, [0x33; 32])
    }

    #[tokio::test]
    async fn known_depositor_resolves_active() {
        let checker = CountingChecker::new(vec![depositor()]);
        let connection = WalletConnection::new(checker.clone());

        let status = connection.resolve(&depositor().to_raw()).await.unwrap();

        assert_eq!(status, AccountStatus::Active { user: depositor() });
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test]
    async fn validation_runs_once_per_address() {
        let checker = CountingChecker::new(vec![depositor()]);
        let connection = WalletConnection::new(checker.clone());

        connection.resolve(&depositor().to_raw()).await.unwrap();
        connection.resolve(&depositor().to_raw()).await.unwrap();
        assert_eq!(checker.calls(), 1);

        connection.resolve(&stranger().to_raw()).await.unwrap();
        assert_eq!(checker.calls(), 2);
    }

    #[tokio::test]
    async fn missing_deposit_is_terminal_for_the_address() {
        let checker = CountingChecker::new(vec![]);
        let connection = WalletConnection::new(checker.clone());

        let status = connection.resolve(&stranger().to_raw()).await.unwrap();
        assert_eq!(status, AccountStatus::NotFound { user: stranger() });

        // Resolving again does not retry the validation call.
        let status = connection.resolve(&stranger().to_raw()).await.unwrap();
        assert_eq!(status, AccountStatus::NotFound { user: stranger() });
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test]
    async fn transport_failures_are_not_cached() {
        let checker = CountingChecker::new(vec![depositor()]);
        let connection = WalletConnection::new(checker.clone());

        *checker.fail_next.lock().unwrap() = true;
        assert!(connection.resolve(&depositor().to_raw()).await.is_err());

        let status = connection.resolve(&depositor().to_raw()).await.unwrap();
        assert_eq!(status, AccountStatus::Active { user: depositor() });
        assert_eq!(checker.calls(), 2);
    }

    #[tokio::test]
    async fn garbage_input_is_rejected_without_a_call() {
        let checker = CountingChecker::new(vec![]);
        let connection = WalletConnection::new(checker.clone());

        assert!(connection.resolve("definitely not an address").await.is_err());
        assert_eq!(checker.calls(), 0);
    }
}
