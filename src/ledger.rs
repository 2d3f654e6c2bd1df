//! Ledger client module split into protocol concerns
//!
//! Everything the relay needs to talk to an EOS-compatible chain lives
//! here: key material ([`keys`]), account-name and asset value handling
//! ([`name`], [`asset`]), binary transaction packing ([`wire`]) and the
//! HTTP chain client ([`client`]). The relay handler only sees the
//! [`LedgerGateway`] trait so tests can substitute the chain entirely.

pub mod asset;
pub mod client;
pub mod keys;
pub mod name;
pub mod wire;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Connection parameters for one request, taken verbatim from the caller.
/// A gateway session is scoped to a single relay request; there is no
/// process-wide client handle.
#[derive(Debug, Clone, Default)]
pub struct SessionParams {
    pub http_endpoint: String,
    pub chain_id: String,
    pub key_provider: Vec<String>,
}

/// One `actor@permission` entry of an action's authorization.
#[derive(Debug, Clone)]
pub struct PermissionLevel {
    pub actor: String,
    pub permission: String,
}

/// Payload of a draft action: either JSON arguments still to be serialized
/// against the contract ABI, or raw pre-serialized bytes.
#[derive(Debug, Clone)]
pub enum ActionData {
    Json(Value),
    Raw(Vec<u8>),
}

/// A single action of a transaction, before binding to a chain session.
#[derive(Debug, Clone)]
pub struct ActionDraft {
    pub account: String,
    pub name: String,
    pub authorization: Vec<PermissionLevel>,
    pub data: ActionData,
}

/// An unsigned transaction as assembled by the relay.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    pub actions: Vec<ActionDraft>,
    /// Seconds after the current head block time at which the transaction
    /// expires.
    pub expire_secs: u32,
}

/// The ledger's confirmation record for a submitted transaction.
#[derive(Debug, Clone)]
pub struct Receipt {
    /// 64-character hex transaction id.
    pub id: String,
    /// Execution status as reported by the chain, e.g. `executed`.
    pub status: String,
}

/// Capability for broadcasting one transaction and receiving its receipt.
///
/// Submissions are independent; sequencing across transactions is the
/// caller's responsibility.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn submit(&self, session: &SessionParams, draft: &TransactionDraft) -> Result<Receipt>;
}
