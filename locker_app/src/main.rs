mod api;
mod poller;
mod qr;
mod session;
mod wallet;
mod withdraw;

use std::env;
use std::sync::Arc;

use anyhow::Result;
use locker_core::address::{Network, TonAddress};
use locker_core::helpers::config::{POLL_PERIOD, locker_contract};
use locker_core::helpers::dto::AccountStatus;
use locker_core::helpers::format::format_ton;

use crate::api::handler::LockerApi;
use crate::poller::handler::{BalancePoller, PollTarget};
use crate::wallet::handler::WalletConnection;
use crate::withdraw::handler::{SessionMode, WithdrawDispatcher, WithdrawOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    log::info!("Starting locker_app...");

    let network = match env::var("NETWORK")
        .unwrap_or_else(|_| "testnet".to_string())
        .as_str()
    {
        "mainnet" => Network::Mainnet,
        "testnet" => Network::Testnet,
        _ => Network::Testnet,
    };
    let api_url = env::var("LOCKER_API_URL").expect("LOCKER_API_URL environment variable not set");
    let wallet_address =
        env::var("WALLET_ADDRESS").expect("WALLET_ADDRESS environment variable not set");
    let contract: TonAddress = env::var("LOCKER_CONTRACT")
        .unwrap_or_else(|_| locker_contract(network).to_string())
        .parse()
        .expect("LOCKER_CONTRACT is not a valid address");

    let api = LockerApi::new(api_url);
    let connection = WalletConnection::new(Arc::new(api.clone()));

    let user = match connection.resolve(&wallet_address).await? {
        AccountStatus::Active { user } => user,
        AccountStatus::NotFound { user } => {
            log::error!(
                "No locker deposit found for {}. Reconnect with a different address.",
                user.to_raw()
            );
            return Ok(());
        }
    };

    let poller = BalancePoller::new(Arc::new(api));
    poller
        .start(PollTarget {
            contract,
            user,
            network,
        })
        .await;

    // The binary runs the manual path; a connected session only exists when
    // an embedding frontend supplies one through the WalletSession trait.
    let dispatcher =
        WithdrawDispatcher::new(SessionMode::Manual, network, contract, poller.clone());

    if env::var("WITHDRAW").is_ok() {
        match dispatcher.withdraw().await? {
            WithdrawOutcome::Recipe(recipe) => {
                log::info!(
                    "Send {} with comment {:?} to {} to trigger the withdrawal",
                    format_ton(recipe.amount),
                    recipe.comment,
                    recipe.address
                );
                log::info!("Deep link: {}", recipe.link);
                dispatcher.close_dialog();
            }
            WithdrawOutcome::Unavailable => log::info!("Nothing available to withdraw yet"),
            WithdrawOutcome::Submitted(receipt) => log::info!("Submitted: {}", receipt.hash),
        }
    }

    let mut snapshots = tokio::time::interval(POLL_PERIOD);
    loop {
        tokio::select! {
            _ = snapshots.tick() => {
                let state = poller.state();
                match (&state.last_balance, &state.error) {
                    (Some(balance), None) => {
                        log::info!(
                            "Available: {} | Locked: {} | Deposited: {} (+{} reward)",
                            format_ton(balance.available_to_withdraw),
                            format_ton(balance.still_locked),
                            format_ton(balance.total_user_deposit),
                            format_ton(
                                balance
                                    .total_user_deposit_and_reward
                                    .saturating_sub(balance.total_user_deposit)
                            ),
                        );
                        if balance.can_withdraw() {
                            log::info!("Run with WITHDRAW=1 to print the withdrawal recipe");
                        }
                    }
                    (_, Some(message)) => log::warn!("{}", message),
                    _ => log::info!("Loading locker balance..."),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                dispatcher.disconnect().await?;
                break;
            }
        }
    }

    Ok(())
}
