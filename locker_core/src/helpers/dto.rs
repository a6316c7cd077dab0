use serde::{Deserialize, Serialize};

use crate::address::TonAddress;

/// Locker figures for one user, in nanotons. Replaced wholesale on every
/// fetch, never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub available_to_withdraw: u128,
    pub still_locked: u128,
    pub total_user_deposit: u128,
    pub total_user_deposit_and_reward: u128,
}

impl WalletBalance {
    pub fn can_withdraw(&self) -> bool {
        self.available_to_withdraw > 0
    }
}

/// What the balance view is currently doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
    pub last_balance: Option<WalletBalance>,
}

impl PollState {
    pub fn in_flight(&self) -> bool {
        self.loading || self.refreshing
    }
}

/// A withdrawal handed to a connected wallet session for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawRequest {
    pub to: String,
    pub amount: u128,
    pub payload: String,
    pub valid_until: i64,
}

/// The manual-mode payment recipe shown in the withdrawal dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecipe {
    pub address: String,
    pub amount: u128,
    pub comment: String,
    pub link: String,
    pub qr_data_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub hash: String,
}

/// Outcome of validating a newly supplied address against the locker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active { user: TonAddress },
    NotFound { user: TonAddress },
}
