use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::Result;
use async_trait::async_trait;
use locker_core::address::{Network, TonAddress};
use locker_core::helpers::config::POLL_PERIOD;
use locker_core::helpers::dto::{PollState, WalletBalance};
use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Read side of the locker contract, as the poller consumes it.
#[async_trait]
pub trait BalanceReader: Send + Sync {
    async fn wallet_balance(
        &self,
        contract: &TonAddress,
        user: &TonAddress,
    ) -> Result<WalletBalance>;
}

pub const BALANCE_FETCH_ERROR: &str = "Failed to load the locker balance. Please retry.";

/// The (contract, user, network) triple a poller keeps fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTarget {
    pub contract: TonAddress,
    pub user: TonAddress,
    pub network: Network,
}

/// Owns the balance refresh lifecycle: one immediate fetch on start, a
/// 30-second cadence afterwards, and a manual refresh sharing the same
/// guarded fetch path. The timer is an owned task, aborted whenever the
/// target changes or the last handle is dropped.
#[derive(Clone)]
pub struct BalancePoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    reader: Arc<dyn BalanceReader>,
    state: Mutex<PollState>,
    dialog_open: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
    target: Mutex<Option<PollTarget>>,
}

impl PollerInner {
    fn state_guard(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().expect("poll state lock poisoned")
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl BalancePoller {
    pub fn new(reader: Arc<dyn BalanceReader>) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                reader,
                state: Mutex::new(PollState::default()),
                dialog_open: AtomicBool::new(false),
                timer: Mutex::new(None),
                target: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> PollState {
        self.inner.state_guard().clone()
    }

    /// Begins polling for `target`: cancels any previous timer, performs one
    /// fetch right away and arms the periodic refresh. A balance fetched for
    /// an earlier target stays visible while the first call is in flight.
    pub async fn start(&self, target: PollTarget) {
        info!(
            "Polling locker balance for {} on {}",
            target.user.to_raw(),
            target.network
        );
        self.stop();
        *self
            .inner
            .target
            .lock()
            .expect("poll target lock poisoned") = Some(target);

        fetch(&self.inner, target).await;
        self.arm(target);
    }

    /// Manual refresh over the same fetch path, ignored while a fetch is
    /// already in flight.
    pub async fn refresh(&self) {
        let target = match *self
            .inner
            .target
            .lock()
            .expect("poll target lock poisoned")
        {
            Some(target) => target,
            None => {
                warn!("Refresh requested before polling started");
                return;
            }
        };

        if self.inner.state_guard().in_flight() {
            debug!("Fetch already in flight, ignoring manual refresh");
            return;
        }

        fetch(&self.inner, target).await;
    }

    /// Cancels the periodic refresh. Mandatory before the target changes and
    /// on disposal; `start` calls it internally.
    pub fn stop(&self) {
        if let Some(handle) = self
            .inner
            .timer
            .lock()
            .expect("poll timer lock poisoned")
            .take()
        {
            handle.abort();
            debug!("Polling timer cancelled");
        }
    }

    /// While the withdrawal dialog is open the timer contributes no fetch;
    /// skipped ticks are dropped, never queued.
    pub fn open_dialog(&self) {
        self.inner.dialog_open.store(true, Ordering::SeqCst);
    }

    pub fn close_dialog(&self) {
        self.inner.dialog_open.store(false, Ordering::SeqCst);
    }

    pub fn dialog_open(&self) -> bool {
        self.inner.dialog_open.load(Ordering::SeqCst)
    }

    fn arm(&self, target: PollTarget) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + POLL_PERIOD, POLL_PERIOD);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                let Some(inner) = Weak::upgrade(&weak) else {
                    break;
                };
                if inner.dialog_open.load(Ordering::SeqCst) {
                    debug!("Withdrawal dialog open, skipping scheduled refresh");
                    continue;
                }
                if inner.state_guard().in_flight() {
                    debug!("Fetch already in flight, skipping scheduled refresh");
                    continue;
                }
                fetch(&inner, target).await;
            }
        });

        if let Some(previous) = self
            .inner
            .timer
            .lock()
            .expect("poll timer lock poisoned")
            .replace(handle)
        {
            previous.abort();
        }
    }
}

async fn fetch(inner: &Arc<PollerInner>, target: PollTarget) {
    {
        let mut state = inner.state_guard();
        if state.last_balance.is_none() {
            state.loading = true;
        } else {
            state.refreshing = true;
        }
    }

    let result = inner
        .reader
        .wallet_balance(&target.contract, &target.user)
        .await;

    let mut state = inner.state_guard();
    state.loading = false;
    state.refreshing = false;
    match result {
        Ok(balance) => {
            debug!(
                "Locker balance updated, {} available",
                balance.available_to_withdraw
            );
            state.last_balance = Some(balance);
            state.error = None;
        }
        Err(e) => {
            warn!("Balance fetch failed: {}", e);
            state.error = Some(BALANCE_FETCH_ERROR.to_string());
        }
    }
}
