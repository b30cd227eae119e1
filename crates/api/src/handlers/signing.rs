//! Signing session handlers

use crate::error::ApiResult;
use crate::handlers::{
    decode_b64, decode_entries, encode_b64, Ack, FetchMessagesQuery, FetchMessagesResponse,
    SubmitMessagesRequest,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use relay_coordinator::SessionKind;
use relay_types::{PartyId, SessionStatus};
use serde::{Deserialize, Serialize};

/// Request to create a signing session
#[derive(Debug, Deserialize)]
pub struct InitiateSigningRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub t: u16,
    pub n: u16,
}

#[derive(Debug, Serialize)]
pub struct InitiateSigningResponse {
    pub message: String,
    pub t: u16,
    pub n: u16,
}

/// Request to join a signing session under a chosen party ID
#[derive(Debug, Deserialize)]
pub struct JoinSigningRequest {
    #[serde(rename = "partyID")]
    pub party_id: u16,
}

#[derive(Debug, Serialize)]
pub struct JoinSigningResponse {
    pub message: String,
    #[serde(rename = "partyID")]
    pub party_id: u16,
    pub n: u16,
}

/// Request carrying the base64-encoded transaction payload
#[derive(Debug, Deserialize)]
pub struct BroadcastTransactionRequest {
    pub transaction: String,
}

/// The staged transaction, duplicated under a legacy key some party
/// clients still read.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub transaction: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub message: String,
    #[serde(rename = "transactionLength")]
    pub transaction_length: usize,
    #[serde(rename = "signatureLength")]
    pub signature_length: usize,
}

/// POST /sign/initiate
pub async fn initiate(
    State(state): State<AppState>,
    Json(req): Json<InitiateSigningRequest>,
) -> ApiResult<Json<InitiateSigningResponse>> {
    state
        .coordinator
        .create_signing_session(&req.session_id, req.t, req.n)
        .await?;
    Ok(Json(InitiateSigningResponse {
        message: "Signing session created. Parties can now join.".to_string(),
        t: req.t,
        n: req.n,
    }))
}

/// POST /sign/{session_id}/join
pub async fn join(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<JoinSigningRequest>,
) -> ApiResult<Json<JoinSigningResponse>> {
    let joined = state
        .coordinator
        .join_signing(&session_id, PartyId(req.party_id))
        .await?;
    Ok(Json(JoinSigningResponse {
        message: "Party joined signing session successfully".to_string(),
        party_id: joined.party.0,
        n: joined.total_parties,
    }))
}

/// POST /sign/{session_id}/messages
pub async fn submit_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SubmitMessagesRequest>,
) -> ApiResult<Json<Ack>> {
    let messages = decode_entries(&req)?;
    state
        .coordinator
        .submit_messages(SessionKind::Signing, &session_id, req.round, messages)
        .await?;
    Ok(Json(Ack {
        message: "Messages received".to_string(),
    }))
}

/// GET /sign/{session_id}/messages?partyID=&round=
pub async fn fetch_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<FetchMessagesQuery>,
) -> ApiResult<Json<FetchMessagesResponse>> {
    let contents = state
        .coordinator
        .fetch_messages(
            SessionKind::Signing,
            &session_id,
            query.round,
            PartyId(query.party_id),
        )
        .await?;
    Ok(Json(FetchMessagesResponse {
        messages: contents.iter().map(|c| encode_b64(c)).collect(),
    }))
}

/// GET /sign/{session_id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionStatus>> {
    let status = state
        .coordinator
        .session_status(SessionKind::Signing, &session_id)
        .await?;
    Ok(Json(status))
}

/// POST /sign/{session_id}/broadcast, also mounted at POST
/// /sign/{session_id}/transaction
pub async fn broadcast_transaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<BroadcastTransactionRequest>,
) -> ApiResult<Json<Ack>> {
    let payload = decode_b64(&req.transaction, "transaction")?;
    state.coordinator.set_transaction(&session_id, payload).await?;
    Ok(Json(Ack {
        message: "Transaction received".to_string(),
    }))
}

/// GET /sign/{session_id}/transaction
pub async fn transaction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<TransactionResponse>> {
    let payload = state.coordinator.transaction(&session_id).await?;
    let encoded = encode_b64(&payload);
    Ok(Json(TransactionResponse {
        transaction: encoded.clone(),
        message: encoded,
    }))
}

/// POST /sign/{session_id}/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let signature = decode_b64(&req.signature, "signature")?;
    let summary = state.coordinator.finalize_signing(&session_id, signature).await?;
    Ok(Json(FinalizeResponse {
        message: "Transaction finalized successfully".to_string(),
        transaction_length: summary.transaction_len,
        signature_length: summary.signature_len,
    }))
}
