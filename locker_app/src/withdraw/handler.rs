use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use locker_core::address::{Network, TonAddress};
use locker_core::helpers::config::{
    POST_WITHDRAW_REFRESH_DELAY, TX_VALIDITY_WINDOW_SECS, WITHDRAW_COMMENT,
    WITHDRAW_TRIGGER_AMOUNT,
};
use locker_core::helpers::deeplink::transfer_link;
use locker_core::helpers::dto::{PaymentRecipe, TransactionReceipt, WithdrawRequest};
use locker_core::helpers::payload::comment_payload;
use log::{info, warn};

use crate::poller::handler::BalancePoller;
use crate::qr::render_qr_data_uri;
use crate::session::handler::WalletSession;

/// Which withdrawal path is active for the current address.
#[derive(Clone)]
pub enum SessionMode {
    Connected(Arc<dyn WalletSession>),
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawOutcome {
    /// Nothing to withdraw; no call was made and nothing changed.
    Unavailable,
    /// The wallet session signed and broadcast the transaction.
    Submitted(TransactionReceipt),
    /// Manual mode: the payment recipe now showing in the dialog.
    Recipe(PaymentRecipe),
}

/// Produces and executes (or presents) the withdrawal request appropriate to
/// the session mode.
pub struct WithdrawDispatcher {
    mode: SessionMode,
    network: Network,
    contract: TonAddress,
    poller: BalancePoller,
}

impl WithdrawDispatcher {
    pub fn new(
        mode: SessionMode,
        network: Network,
        contract: TonAddress,
        poller: BalancePoller,
    ) -> Self {
        Self {
            mode,
            network,
            contract,
            poller,
        }
    }

    pub async fn withdraw(&self) -> Result<WithdrawOutcome> {
        let available = self
            .poller
            .state()
            .last_balance
            .map_or(0, |balance| balance.available_to_withdraw);
        if available == 0 {
            info!("Nothing available to withdraw, ignoring request");
            return Ok(WithdrawOutcome::Unavailable);
        }

        let destination = self.contract.to_friendly(true, self.network);

        match &self.mode {
            SessionMode::Manual => {
                let link = transfer_link(&destination, WITHDRAW_TRIGGER_AMOUNT, WITHDRAW_COMMENT);
                let qr_data_uri = render_qr_data_uri(&link)?;
                info!("Presenting manual withdrawal recipe for {}", destination);

                self.poller.open_dialog();
                Ok(WithdrawOutcome::Recipe(PaymentRecipe {
                    address: destination,
                    amount: WITHDRAW_TRIGGER_AMOUNT,
                    comment: WITHDRAW_COMMENT.to_string(),
                    link,
                    qr_data_uri,
                }))
            }
            SessionMode::Connected(session) => {
                let request = WithdrawRequest {
                    to: destination,
                    amount: WITHDRAW_TRIGGER_AMOUNT,
                    payload: comment_payload(WITHDRAW_COMMENT)?,
                    valid_until: Utc::now().timestamp() + TX_VALIDITY_WINDOW_SECS,
                };

                match session.send_transaction(&request).await {
                    Ok(receipt) => {
                        info!("Withdrawal submitted: {}", receipt.hash);
                        let poller = self.poller.clone();
                        tokio::spawn(async move {
                            // One best-effort pickup of the post-transaction
                            // balance; the chain may not have settled yet.
                            tokio::time::sleep(POST_WITHDRAW_REFRESH_DELAY).await;
                            poller.refresh().await;
                        });
                        Ok(WithdrawOutcome::Submitted(receipt))
                    }
                    Err(e) => {
                        warn!("Wallet rejected or failed the withdrawal: {}", e);
                        Err(anyhow!("Withdrawal was not sent: {}", e))
                    }
                }
            }
        }
    }

    /// User-driven only; closing never fetches by itself, the poller's
    /// regular cadence resumes on its own.
    pub fn close_dialog(&self) {
        self.poller.close_dialog();
    }

    /// Tears the wallet session down first when the SDK still reports it
    /// connected, then stops polling. Manual mode has no session to close.
    pub async fn disconnect(&self) -> Result<()> {
        if let SessionMode::Connected(session) = &self.mode {
            if session.connected() {
                session.disconnect().await?;
            }
        }
        self.poller.stop();
        info!("Disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::handler::{BalanceReader, PollTarget};
    use async_trait::async_trait;
    use locker_core::helpers::dto::WalletBalance;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    struct FixedReader {
        calls: AtomicUsize,
        balance: WalletBalance,
    }

    impl FixedReader {
        fn new(available: u128) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                balance: WalletBalance {
                    available_to_withdraw: available,
                    still_locked: 7_500_000_000,
                    total_user_deposit: 10_000_000_000,
                    total_user_deposit_and_reward: 10_200_000_000,
                },
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceReader for FixedReader {
        async fn wallet_balance(
            &self,
            _contract: &TonAddress,
            _user: &TonAddress,
        ) -> Result<WalletBalance> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.balance)
        }
    }

    struct MockSession {
        connected: AtomicBool,
        fail: bool,
        sent: Mutex<Vec<WithdrawRequest>>,
        disconnects: AtomicUsize,
    }

    impl MockSession {
        fn new(connected: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(connected),
                fail,
                sent: Mutex::new(Vec::new()),
                disconnects: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl WalletSession for MockSession {
        fn connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn send_transaction(&self, request: &WithdrawRequest) -> Result<TransactionReceipt> {
            if self.fail {
                return Err(anyhow!("user rejected the transaction"));
            }
            self.sent.lock().unwrap().push(request.clone());
            Ok(TransactionReceipt {
                hash: "txhash".to_string(),
            })
        }

        async fn disconnect(&self) -> Result<()> {
            self.connected.store(false, Ordering::SeqCst);
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn contract() -> TonAddress {
        TonAddress::new(0, [0x11; 32])
    }

    fn target(network: Network) -> PollTarget {
        PollTarget {
            contract: contract(),
            user: TonAddress::new(0, [0x22; 32]),
            network,
        }
    }

    async fn started_poller(reader: Arc<FixedReader>, network: Network) -> BalancePoller {
        let poller = BalancePoller::new(reader);
        poller.start(target(network)).await;
        poller
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_refuses_when_nothing_available() {
        let reader = FixedReader::new(0);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let session = MockSession::new(true, false);
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Connected(session.clone()),
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        let outcome = dispatcher.withdraw().await.unwrap();

        assert_eq!(outcome, WithdrawOutcome::Unavailable);
        assert!(session.sent.lock().unwrap().is_empty());
        assert!(!poller.dialog_open());
    }

    #[tokio::test(start_paused = true)]
    async fn withdraw_refuses_before_first_balance() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = BalancePoller::new(reader.clone());
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Manual,
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        let outcome = dispatcher.withdraw().await.unwrap();

        assert_eq!(outcome, WithdrawOutcome::Unavailable);
        assert_eq!(reader.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_withdraw_presents_network_correct_recipe() {
        for (network, prefix) in [(Network::Mainnet, "EQ"), (Network::Testnet, "kQ")] {
            let reader = FixedReader::new(2_500_000_000);
            let poller = started_poller(reader.clone(), network).await;
            let dispatcher =
                WithdrawDispatcher::new(SessionMode::Manual, network, contract(), poller.clone());

            let outcome = dispatcher.withdraw().await.unwrap();
            let recipe = match outcome {
                WithdrawOutcome::Recipe(recipe) => recipe,
                other => panic!("expected a recipe, got {:?}", other),
            };

            assert!(recipe.address.starts_with(prefix));
            assert_eq!(recipe.address, contract().to_friendly(true, network));
            assert_eq!(recipe.amount, 1_000_000_000);
            assert_eq!(recipe.comment, "w");
            assert_eq!(
                recipe.link,
                format!(
                    "ton://transfer/{}?amount=1000000000&text=w",
                    recipe.address
                )
            );
            assert!(recipe.qr_data_uri.starts_with("data:image/svg+xml;base64,"));
            assert!(poller.dialog_open());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_dialog_leaves_the_balance_alone() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Manual,
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        dispatcher.withdraw().await.unwrap();
        let before = poller.state().last_balance;

        dispatcher.close_dialog();

        assert!(!poller.dialog_open());
        assert_eq!(poller.state().last_balance, before);
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connected_withdraw_sends_request_and_repolls_once() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let session = MockSession::new(true, false);
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Connected(session.clone()),
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        let before = Utc::now().timestamp();
        let outcome = dispatcher.withdraw().await.unwrap();
        assert_eq!(
            outcome,
            WithdrawOutcome::Submitted(TransactionReceipt {
                hash: "txhash".to_string()
            })
        );

        let sent = session.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, contract().to_friendly(true, Network::Mainnet));
        assert_eq!(sent[0].amount, 1_000_000_000);
        assert_eq!(sent[0].payload, "te6ccgEBAQEABwAACgAAAAB3");
        assert!(sent[0].valid_until >= before + 295 && sent[0].valid_until <= before + 305);

        // Exactly one delayed re-poll, five seconds out.
        assert_eq!(reader.calls(), 1);
        sleep(Duration::from_millis(4_900)).await;
        assert_eq!(reader.calls(), 1);
        sleep(Duration::from_millis(200)).await;
        assert_eq!(reader.calls(), 2);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(reader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_schedules_no_repoll() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let session = MockSession::new(true, true);
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Connected(session.clone()),
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        let error = dispatcher.withdraw().await.unwrap_err().to_string();
        assert!(error.contains("user rejected"));

        sleep(Duration::from_secs(10)).await;
        assert_eq!(reader.calls(), 1);
        assert!(!poller.dialog_open());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_tears_down_a_live_session() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let session = MockSession::new(true, false);
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Connected(session.clone()),
            Network::Mainnet,
            contract(),
            poller.clone(),
        );

        dispatcher.disconnect().await.unwrap();

        assert_eq!(session.disconnects.load(Ordering::SeqCst), 1);
        sleep(Duration::from_secs(120)).await;
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_skips_an_already_closed_session() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let session = MockSession::new(false, false);
        let dispatcher = WithdrawDispatcher::new(
            SessionMode::Connected(session.clone()),
            Network::Mainnet,
            contract(),
            poller,
        );

        dispatcher.disconnect().await.unwrap();

        assert_eq!(session.disconnects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_disconnect_needs_no_session() {
        let reader = FixedReader::new(2_500_000_000);
        let poller = started_poller(reader.clone(), Network::Mainnet).await;
        let dispatcher =
            WithdrawDispatcher::new(SessionMode::Manual, Network::Mainnet, contract(), poller);

        dispatcher.disconnect().await.unwrap();

        sleep(Duration::from_secs(120)).await;
        assert_eq!(reader.calls(), 1);
    }
}
