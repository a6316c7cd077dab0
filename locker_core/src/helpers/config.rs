use std::time::Duration;

use crate::address::Network;

/// Locker contract addresses are kept in raw form so every user-facing
/// rendering derives its encoding from the active network.
pub const LOCKER_CONTRACT_MAINNET: &str =
    "0:5f0d1f3b2a84c06e9d17b7f12f9e8a3c4d5b6a798812f3e4d5c6b7a89e0f1d2c";
pub const LOCKER_CONTRACT_TESTNET: &str =
    "0:3a9c64f01e8b2d7c5a4f3e2d1c0b9a887766554433221100ffeeddccbbaa9988";

/// Outgoing transaction amount that triggers a withdrawal. This is not the
/// amount being withdrawn; the contract pays out whatever is unlocked.
pub const WITHDRAW_TRIGGER_AMOUNT: u128 = 1_000_000_000;

/// Comment tag the locker contract recognises as a withdrawal instruction.
pub const WITHDRAW_COMMENT: &str = "w";

pub const POLL_PERIOD: Duration = Duration::from_secs(30);

/// How long to wait after a submitted transaction before re-polling. A
/// heuristic, not a finality acknowledgment; the balance may be unchanged.
pub const POST_WITHDRAW_REFRESH_DELAY: Duration = Duration::from_secs(5);

/// Wallet transactions expire five minutes after they are built.
pub const TX_VALIDITY_WINDOW_SECS: i64 = 5 * 60;

pub fn locker_contract(network: Network) -> &'static str {
    match network {
        Network::Mainnet => LOCKER_CONTRACT_MAINNET,
        Network::Testnet => LOCKER_CONTRACT_TESTNET,
    }
}
