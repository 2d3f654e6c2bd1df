//! HTTP relay server
//!
//! Accepts JSON-encoded transaction requests on any path and method,
//! dispatches on the request's `description` field and forwards the work
//! to the ledger gateway, returning receipts to the caller. Application
//! failures are reported inside the JSON body; the HTTP status for a
//! handled request is always 200.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

use crate::actions;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::ledger::keys::KeyPair;
use crate::ledger::{LedgerGateway, SessionParams, TransactionDraft};

const DESC_CREATE_ACCOUNT: &str = "createNewAccount";
const DESC_CREATE_ACCOUNT_WITH_KEY: &str = "createNewAccountWithPublicKey";

/// Relay state shared across requests: configuration, the ledger gateway
/// and counters. Ledger sessions themselves are request-scoped.
pub struct RelayApp {
    pub config: Config,
    ledger: Arc<dyn LedgerGateway>,
    stats: Arc<RwLock<RelayStats>>,
}

/// Relay statistics and monitoring
#[derive(Debug, Default)]
struct RelayStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    transactions_submitted: u64,
    accounts_created: u64,
    start_time: Option<Instant>,
}

impl RelayStats {
    fn new() -> Self {
        RelayStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RelayStatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub transactions_submitted: u64,
    pub accounts_created: u64,
    pub uptime_seconds: u64,
}

impl RelayApp {
    pub fn new(config: Config, ledger: Arc<dyn LedgerGateway>) -> Self {
        RelayApp {
            config,
            ledger,
            stats: Arc::new(RwLock::new(RelayStats::new())),
        }
    }

    /// Get relay statistics
    pub async fn stats(&self) -> RelayStatsSnapshot {
        let stats = self.stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        RelayStatsSnapshot {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            transactions_submitted: stats.transactions_submitted,
            accounts_created: stats.accounts_created,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Private keys for signing. The original SDK accepted either a single key
/// or an array, so both are tolerated here.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum KeyProvider {
    Single(String),
    Many(Vec<String>),
}

impl Default for KeyProvider {
    fn default() -> Self {
        KeyProvider::Many(Vec::new())
    }
}

impl KeyProvider {
    fn to_vec(&self) -> Vec<String> {
        match self {
            KeyProvider::Single(key) => vec![key.clone()],
            KeyProvider::Many(keys) => keys.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub http_endpoint: String,
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub key_provider: KeyProvider,
    pub description: Option<String>,
    #[serde(default)]
    pub new_account_name: String,
    #[serde(default)]
    pub stake_net_quantity: String,
    #[serde(default)]
    pub stake_cpu_quantity: String,
    #[serde(default, rename = "transferEOSAmount")]
    pub transfer_eos_amount: String,
    pub public_key: Option<String>,
    #[serde(default)]
    pub transactions: Vec<ActionRequest>,
}

impl RelayRequest {
    fn session(&self) -> SessionParams {
        SessionParams {
            http_endpoint: self.http_endpoint.clone(),
            chain_id: self.chain_id.clone(),
            key_provider: self.key_provider.to_vec(),
        }
    }
}

/// One entry of the generic submission list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub action_name: String,
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub bin_args: String,
}

/// Per-transaction result record. Key fields only appear on the
/// account-creation branches; they are empty strings when that branch
/// fails.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub transno: String,
    pub eostransid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub status: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RelayResponse {
    pub transactions: Vec<TransactionRecord>,
}

// ============================================================================
// Branch Implementations
// ============================================================================

impl RelayApp {
    /// `createNewAccount`: generate a key pair and create the account with
    /// RAM, stake and the welcome transfer in a single transaction.
    async fn create_account_with_generated_key(
        &self,
        session: &SessionParams,
        request: &RelayRequest,
    ) -> Vec<TransactionRecord> {
        let keypair = match KeyPair::generate() {
            Ok(keypair) => keypair,
            Err(e) => return vec![account_failure_record(e, true)],
        };
        let private_key = keypair.to_wif();
        let public_key = keypair.public_key_string();

        match self
            .submit_account_bundle(session, request, &public_key, Some(&request.transfer_eos_amount))
            .await
        {
            Ok(receipt) => {
                tracing::info!(account = %request.new_account_name, "relay.account_created");
                vec![TransactionRecord {
                    transno: "1".to_string(),
                    eostransid: receipt.id,
                    private_key: Some(private_key),
                    public_key: Some(public_key),
                    status: receipt.status,
                }]
            }
            Err(e) => vec![account_failure_record(e, true)],
        }
    }

    /// `createNewAccountWithPublicKey`: same bundle but the caller owns the
    /// key material. The welcome transfer is left out unless configured in;
    /// such accounts are funded externally.
    async fn create_account_with_supplied_key(
        &self,
        session: &SessionParams,
        request: &RelayRequest,
    ) -> Vec<TransactionRecord> {
        let public_key = match request.public_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return vec![account_failure_record(
                    RelayError::InvalidInput("publicKey is required".to_string()),
                    false,
                )]
            }
        };

        let transfer = if self.config.sponsor.fund_supplied_key_accounts {
            Some(request.transfer_eos_amount.as_str())
        } else {
            None
        };

        match self
            .submit_account_bundle(session, request, &public_key, transfer)
            .await
        {
            Ok(receipt) => {
                tracing::info!(account = %request.new_account_name, "relay.account_created");
                vec![TransactionRecord {
                    transno: "1".to_string(),
                    eostransid: receipt.id,
                    private_key: None,
                    public_key: Some(public_key),
                    status: receipt.status,
                }]
            }
            Err(e) => vec![account_failure_record(e, false)],
        }
    }

    async fn submit_account_bundle(
        &self,
        session: &SessionParams,
        request: &RelayRequest,
        owner_key: &str,
        transfer_quantity: Option<&str>,
    ) -> Result<crate::ledger::Receipt> {
        let params = actions::CreateAccountParams {
            new_account_name: &request.new_account_name,
            stake_net_quantity: &request.stake_net_quantity,
            stake_cpu_quantity: &request.stake_cpu_quantity,
            transfer_quantity,
        };
        let bundle = actions::create_account_bundle(&self.config.sponsor, &params, owner_key)?;
        let draft = TransactionDraft {
            actions: bundle,
            expire_secs: self.config.relay.expire_secs,
        };
        let receipt = self.ledger.submit(session, &draft).await?;

        let mut stats = self.stats.write().await;
        stats.transactions_submitted += 1;
        stats.accounts_created += 1;
        Ok(receipt)
    }

    /// Generic path: one ledger transaction per input entry, submitted
    /// strictly in input order, each awaited before the next. On failure
    /// the failed position gets an in-band error record and the remaining
    /// entries are skipped; the response is always sent.
    async fn run_actions(
        &self,
        session: &SessionParams,
        request: &RelayRequest,
    ) -> Vec<TransactionRecord> {
        let limit = self.config.relay.max_actions;
        if request.transactions.len() > limit {
            tracing::debug!(
                dropped = request.transactions.len() - limit,
                "relay.extra_actions_ignored"
            );
        }

        let mut records = Vec::new();
        for (index, entry) in request.transactions.iter().take(limit).enumerate() {
            let transno = (index + 1).to_string();
            let outcome = match actions::single_action(
                &entry.account,
                &entry.action_name,
                &entry.actor,
                &entry.bin_args,
            ) {
                Ok(draft) => {
                    self.ledger
                        .submit(
                            session,
                            &TransactionDraft {
                                actions: vec![draft],
                                expire_secs: self.config.relay.expire_secs,
                            },
                        )
                        .await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(receipt) => {
                    self.stats.write().await.transactions_submitted += 1;
                    records.push(TransactionRecord {
                        transno,
                        eostransid: receipt.id,
                        private_key: None,
                        public_key: None,
                        status: receipt.status,
                    });
                }
                Err(e) => {
                    tracing::warn!(transno = %transno, error = %e, "relay.submission_failed");
                    records.push(TransactionRecord {
                        transno,
                        eostransid: String::new(),
                        private_key: None,
                        public_key: None,
                        status: e.to_string(),
                    });
                    break;
                }
            }
        }
        records
    }
}

fn account_failure_record(error: RelayError, include_private_key: bool) -> TransactionRecord {
    TransactionRecord {
        transno: "1".to_string(),
        eostransid: String::new(),
        private_key: include_private_key.then(String::new),
        public_key: Some(String::new()),
        status: error.to_string(),
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging and statistics middleware
async fn stats_middleware(State(app): State<Arc<RelayApp>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = app.stats.write().await;
    stats.record_request(success);

    response
}

/// Detailed request logging middleware. Logs method, path, status and
/// duration for every inbound request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "relay.request"
    );

    response
}

// ============================================================================
// Route Handlers
// ============================================================================

/// The single relay handler. The original service handled every path and
/// method identically, so the router funnels everything here.
async fn relay_transactions(State(app): State<Arc<RelayApp>>, body: Bytes) -> Response {
    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "relay.malformed_request");
            return (StatusCode::OK, Json(RelayResponse::default())).into_response();
        }
    };

    let session = request.session();
    let records = match request.description.as_deref() {
        Some(DESC_CREATE_ACCOUNT) => {
            app.create_account_with_generated_key(&session, &request).await
        }
        Some(DESC_CREATE_ACCOUNT_WITH_KEY) => {
            app.create_account_with_supplied_key(&session, &request).await
        }
        _ => app.run_actions(&session, &request).await,
    };

    (
        StatusCode::OK,
        Json(RelayResponse {
            transactions: records,
        }),
    )
        .into_response()
}

// ============================================================================
// Relay Server
// ============================================================================

/// Build the relay router (for testing)
pub fn build_router(app: Arc<RelayApp>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .fallback(relay_transactions)
        // logging before stats so we always record timing
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn_with_state(
            app.clone(),
            stats_middleware,
        ))
        .with_state(app)
        .layer(cors)
}

/// Run the relay server until the listener fails.
pub async fn run_server(app: Arc<RelayApp>) -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Get port from environment or fall back to the configured one
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(app.config.server.port);

    let router = build_router(app);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "relay server listening");

    axum::serve(listener, router).await?;

    Ok(())
}
