//! Key generation session handlers

use crate::error::ApiResult;
use crate::handlers::{
    decode_entries, encode_b64, Ack, FetchMessagesQuery, FetchMessagesResponse,
    SubmitMessagesRequest,
};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use relay_coordinator::SessionKind;
use relay_types::{PartyId, SessionStatus};
use serde::{Deserialize, Serialize};

/// Request to create a keygen session
#[derive(Debug, Deserialize)]
pub struct InitiateKeygenRequest {
    pub t: u16,
    pub n: u16,
}

/// Response from keygen session creation
#[derive(Debug, Serialize)]
pub struct InitiateKeygenResponse {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub message: String,
}

/// Response from joining a keygen session
#[derive(Debug, Serialize)]
pub struct JoinKeygenResponse {
    pub message: String,
    #[serde(rename = "partyID")]
    pub party_id: u16,
    pub t: u16,
    pub n: u16,
}

/// POST /keygen/initiate
pub async fn initiate(
    State(state): State<AppState>,
    Json(req): Json<InitiateKeygenRequest>,
) -> ApiResult<Json<InitiateKeygenResponse>> {
    let session_id = state.coordinator.create_keygen_session(req.t, req.n).await?;
    Ok(Json(InitiateKeygenResponse {
        session_id,
        message: "Session created. Parties can now join.".to_string(),
    }))
}

/// POST /keygen/{session_id}/join
pub async fn join(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<JoinKeygenResponse>> {
    let joined = state.coordinator.join_keygen(&session_id).await?;
    Ok(Json(JoinKeygenResponse {
        message: "Party joined successfully".to_string(),
        party_id: joined.party.0,
        t: joined.threshold,
        n: joined.total_parties,
    }))
}

/// POST /keygen/{session_id}/messages
pub async fn submit_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SubmitMessagesRequest>,
) -> ApiResult<Json<Ack>> {
    let messages = decode_entries(&req)?;
    state
        .coordinator
        .submit_messages(SessionKind::Keygen, &session_id, req.round, messages)
        .await?;
    Ok(Json(Ack {
        message: "Messages received".to_string(),
    }))
}

/// GET /keygen/{session_id}/messages?partyID=&round=
pub async fn fetch_messages(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<FetchMessagesQuery>,
) -> ApiResult<Json<FetchMessagesResponse>> {
    let contents = state
        .coordinator
        .fetch_messages(
            SessionKind::Keygen,
            &session_id,
            query.round,
            PartyId(query.party_id),
        )
        .await?;
    Ok(Json(FetchMessagesResponse {
        messages: contents.iter().map(|c| encode_b64(c)).collect(),
    }))
}

/// GET /keygen/{session_id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionStatus>> {
    let status = state
        .coordinator
        .session_status(SessionKind::Keygen, &session_id)
        .await?;
    Ok(Json(status))
}
