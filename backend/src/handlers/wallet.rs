use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppState, CurrentSession};
use crate::error::RideError;
use crate::models::{MonthlySummary, TransactionType, WalletSummary, WalletTransaction};

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
}

/// Everything the wallet screen shows.
#[derive(Debug, Serialize)]
pub struct WalletView {
    #[serde(flatten)]
    pub summary: WalletSummary,
    pub this_month: MonthlySummary,
    pub transactions: Vec<WalletTransaction>,
}

pub async fn get_wallet(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(wallet_id): Path<Uuid>,
) -> Result<Json<WalletView>, RideError> {
    Ok(Json(WalletView {
        summary: service.wallet(&session, wallet_id).await?,
        this_month: service.monthly_summary(&session, wallet_id).await?,
        transactions: service.wallet_transactions(&session, wallet_id).await?,
    }))
}

/// Top-up, withdrawal or any other owner-initiated ledger move.
pub async fn apply_transaction(
    State(service): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(wallet_id): Path<Uuid>,
    Json(req): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), RideError> {
    let tx = service
        .wallet_apply(&session, wallet_id, req.tx_type, req.amount, &req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}
