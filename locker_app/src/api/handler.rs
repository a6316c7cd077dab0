use anyhow::{Result, anyhow};
use async_trait::async_trait;
use locker_core::address::TonAddress;
use locker_core::helpers::dto::WalletBalance;
use log::{debug, error};
use reqwest::Client;

use crate::api::dto::{BalanceResponse, CheckDepositResponse};
use crate::poller::handler::BalanceReader;
use crate::wallet::handler::DepositChecker;

/// Read-side client for the locker API.
#[derive(Clone)]
pub struct LockerApi {
    client: Client,
    base_url: String,
}

impl LockerApi {
    pub fn new(base_url: String) -> Self {
        let client = Client::new();

        Self { client, base_url }
    }

    pub async fn wallet_balance(
        &self,
        contract: &TonAddress,
        user: &TonAddress,
    ) -> Result<WalletBalance> {
        let url = format!("{}/balance", self.base_url);
        debug!("Fetching locker balance from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("contract", contract.to_raw()), ("user", user.to_raw())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!("Balance request failed with status {}: {}", status, body);
            return Err(anyhow!(
                "Balance request failed with status {}: {}",
                status,
                body
            ));
        }

        let body = response.json::<BalanceResponse>().await?;
        body.try_into()
    }

    pub async fn check_deposit(&self, user: &TonAddress) -> Result<bool> {
        let url = format!("{}/check-deposit", self.base_url);
        debug!("Checking locker deposit via {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("user", user.to_raw())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            error!("Deposit check failed with status {}: {}", status, body);
            return Err(anyhow!(
                "Deposit check failed with status {}: {}",
                status,
                body
            ));
        }

        let body = response.json::<CheckDepositResponse>().await?;
        Ok(body.has_deposit)
    }
}

#[async_trait]
impl BalanceReader for LockerApi {
    async fn wallet_balance(
        &self,
        contract: &TonAddress,
        user: &TonAddress,
    ) -> Result<WalletBalance> {
        LockerApi::wallet_balance(self, contract, user).await
    }
}

#[async_trait]
impl DepositChecker for LockerApi {
    async fn has_deposit(&self, user: &TonAddress) -> Result<bool> {
        self.check_deposit(user).await
    }
}
