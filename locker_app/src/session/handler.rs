use anyhow::Result;
use async_trait::async_trait;
use locker_core::helpers::dto::{TransactionReceipt, WithdrawRequest};

/// Minimal contract the dispatcher needs from a connected wallet session.
/// Session establishment and the connect handshake live in the embedding
/// frontend; this crate only consumes an already-negotiated session.
#[async_trait]
pub trait WalletSession: Send + Sync {
    fn connected(&self) -> bool;

    async fn send_transaction(&self, request: &WithdrawRequest) -> Result<TransactionReceipt>;

    async fn disconnect(&self) -> Result<()>;
}
