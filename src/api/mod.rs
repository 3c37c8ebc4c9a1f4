//! HTTP API for the transfer workflow
//!
//! The step operations the original browser client drives: submit, confirm,
//! back, reset, plus estimates, registry listing, status, and history.

use crate::config::ApiConfig;
use crate::contracts::BridgeClient;
use crate::error::{BridgeError, BridgeResult};
use crate::pricing::tracker::Quote;
use crate::tokens::TokenRegistry;
use crate::workflow::{SubmitError, Transaction, TransferForm, WorkflowController, WorkflowStatus};

use ethers::types::Address;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<WorkflowController>,
    pub bridge: Arc<BridgeClient>,
    pub registry: Arc<TokenRegistry>,
    pub networks: Vec<String>,
}

/// Run the HTTP API server
pub async fn run_server(
    config: ApiConfig,
    controller: Arc<WorkflowController>,
    bridge: Arc<BridgeClient>,
    registry: Arc<TokenRegistry>,
    networks: Vec<String>,
) -> BridgeResult<()> {
    let state = AppState {
        controller,
        bridge,
        registry,
        networks,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/tokens", get(get_tokens))
        .route("/estimate", get(get_estimate))
        .route("/transfer", post(submit_transfer))
        .route("/confirm", post(confirm_transfer))
        .route("/back", post(go_back))
        .route("/reset", post(reset_workflow))
        .route("/history", get(get_history))
        .route("/fees", get(get_fees))
        .route("/balance", get(get_balance))
        // the browser client lives on another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Current workflow status, including the step display strings
async fn get_status(State(state): State<AppState>) -> Json<WorkflowStatus> {
    Json(state.controller.status().await)
}

/// Supported tokens and selectable networks
async fn get_tokens(State(state): State<AppState>) -> impl IntoResponse {
    Json(TokensResponse {
        tokens: state
            .registry
            .all()
            .into_iter()
            .map(|token| TokenListing {
                symbol: token.symbol.clone(),
                address: format!("{:#x}", token.address),
                decimals: token.decimals,
                priceable: state.registry.price_id(&token.symbol).is_some(),
            })
            .collect(),
        networks: state.networks.clone(),
    })
}

#[derive(Deserialize)]
struct EstimateParams {
    origin_token: String,
    destination_token: String,
    destination_amount: f64,
}

/// Estimate the source amount for a destination amount
async fn get_estimate(
    State(state): State<AppState>,
    Query(params): Query<EstimateParams>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state
        .controller
        .estimate(
            &params.origin_token,
            &params.destination_token,
            params.destination_amount,
        )
        .await?;
    Ok(Json(quote))
}

/// Submit the transfer form: validate, approve the allowance, advance to review
async fn submit_transfer(
    State(state): State<AppState>,
    Json(form): Json<TransferForm>,
) -> Result<Json<Transaction>, ApiError> {
    match state.controller.submit_transfer(form).await {
        Ok(draft) => Ok(Json(draft)),
        Err(SubmitError::Invalid(fields)) => Err(ApiError::Invalid(fields)),
        Err(SubmitError::Bridge(e)) => Err(ApiError::Bridge(e)),
    }
}

/// Execute the bridge transfer and finalize the transaction
async fn confirm_transfer(State(state): State<AppState>) -> Result<Json<Transaction>, ApiError> {
    let confirmed = state.controller.confirm().await?;
    Ok(Json(confirmed))
}

/// Back to the form, keeping the draft for pre-fill
async fn go_back(State(state): State<AppState>) -> Json<WorkflowStatus> {
    state.controller.back().await;
    Json(state.controller.status().await)
}

/// Reset to a fresh form
async fn reset_workflow(State(state): State<AppState>) -> Json<WorkflowStatus> {
    state.controller.reset().await;
    Json(state.controller.status().await)
}

/// Confirmed transactions in confirmation order
async fn get_history(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.controller.history().await)
}

/// Current bridge contract fees
async fn get_fees(State(state): State<AppState>) -> Result<Json<FeesResponse>, ApiError> {
    let platform_fee = state.bridge.platform_fee().await?;
    let pool_fee = state.bridge.pool_fee().await?;
    Ok(Json(FeesResponse {
        platform_fee: platform_fee.to_string(),
        pool_fee,
    }))
}

#[derive(Deserialize)]
struct BalanceParams {
    token: String,
    owner: String,
}

/// ERC-20 balance of an owner for a registered token, in base units
async fn get_balance(
    State(state): State<AppState>,
    Query(params): Query<BalanceParams>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let owner: Address = params.owner.parse().map_err(|_| {
        ApiError::Bridge(BridgeError::Validation {
            field: "owner".to_string(),
            message: "not a valid wallet address".to_string(),
        })
    })?;

    let balance = state.bridge.token_balance(&params.token, owner).await?;
    Ok(Json(BalanceResponse {
        token: params.token,
        balance: balance.to_string(),
    }))
}

/// API-level error rendering
enum ApiError {
    Invalid(Vec<crate::workflow::FieldError>),
    Bridge(BridgeError),
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        ApiError::Bridge(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: "validation failed".to_string(),
                    fields,
                }),
            )
                .into_response(),
            ApiError::Bridge(e) => {
                let status = match &e {
                    BridgeError::Validation { .. } | BridgeError::UnsupportedToken { .. } => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    BridgeError::MissingDraft { .. } => StatusCode::CONFLICT,
                    BridgeError::PriceUnavailable { .. }
                    | BridgeError::PriceApi(_)
                    | BridgeError::ContractCall(_)
                    | BridgeError::Wallet(_) => StatusCode::BAD_GATEWAY,
                    BridgeError::Config(_) | BridgeError::Internal(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (
                    status,
                    Json(ErrorResponse {
                        error: e.user_message(),
                        fields: Vec::new(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct TokensResponse {
    tokens: Vec<TokenListing>,
    networks: Vec<String>,
}

#[derive(Serialize)]
struct TokenListing {
    symbol: String,
    address: String,
    decimals: u8,
    priceable: bool,
}

#[derive(Serialize)]
struct FeesResponse {
    platform_fee: String,
    pool_fee: u32,
}

#[derive(Serialize)]
struct BalanceResponse {
    token: String,
    balance: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<crate::workflow::FieldError>,
}
