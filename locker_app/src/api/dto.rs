use anyhow::{Result, anyhow};
use locker_core::helpers::dto::WalletBalance;
use serde::Deserialize;

/// Balance read response. The API serves the four figures as decimal
/// strings since they can exceed what a JSON number carries safely.
#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    pub available_to_withdraw: String,
    pub still_locked: String,
    pub total_user_deposit: String,
    pub total_user_deposit_and_reward: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckDepositResponse {
    pub has_deposit: bool,
}

impl TryFrom<BalanceResponse> for WalletBalance {
    type Error = anyhow::Error;

    fn try_from(response: BalanceResponse) -> Result<Self> {
        Ok(WalletBalance {
            available_to_withdraw: parse_nanotons(&response.available_to_withdraw)?,
            still_locked: parse_nanotons(&response.still_locked)?,
            total_user_deposit: parse_nanotons(&response.total_user_deposit)?,
            total_user_deposit_and_reward: parse_nanotons(
                &response.total_user_deposit_and_reward,
            )?,
        })
    }
}

fn parse_nanotons(value: &str) -> Result<u128> {
    value
        .parse::<u128>()
        .map_err(|e| anyhow!("invalid nanoton amount {:?}: {}", value, e))
}
