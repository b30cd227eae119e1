//! Battle signing session handlers

use crate::error::{ApiError, ApiResult};
use crate::handlers::{decode_b64, encode_b64};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use relay_types::{BattleSnapshot, BattleStatus, Role};
use serde::{Deserialize, Serialize};

fn parse_role(role: &str) -> ApiResult<Role> {
    role.parse()
        .map_err(|e: relay_types::ParseRoleError| ApiError::BadRequest(e.to_string()))
}

/// Request to create a battle signing session
#[derive(Debug, Deserialize)]
pub struct InitBattleRequest {
    #[serde(rename = "winnerIsChallenger")]
    pub winner_is_challenger: bool,
    pub role: String,
    #[serde(rename = "partyID")]
    pub party_id: String,
}

#[derive(Debug, Serialize)]
pub struct InitBattleResponse {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub status: String,
    /// Base64-encoded canonical message to sign
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinBattleRequest {
    pub role: String,
    #[serde(rename = "partyID")]
    pub party_id: String,
}

#[derive(Debug, Serialize)]
pub struct JoinBattleResponse {
    pub status: BattleStatus,
    pub participants: usize,
    pub message: String,
}

/// Request carrying a base64-encoded outcome payload for verification
#[derive(Debug, Deserialize)]
pub struct BattleMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BattleMessageResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct BattleSignatureRequest {
    pub role: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct BattleSignatureResponse {
    pub status: BattleStatus,
    #[serde(rename = "signatures_collected")]
    pub signatures_collected: usize,
}

/// The three collected signatures, ready for on-chain submission
#[derive(Debug, Serialize)]
pub struct FinalizeBattleResponse {
    #[serde(rename = "battleID")]
    pub battle_id: u64,
    #[serde(rename = "winnerIsChallenger")]
    pub winner_is_challenger: bool,
    pub message: String,
    #[serde(rename = "challengerSig")]
    pub challenger_sig: String,
    #[serde(rename = "defenderSig")]
    pub defender_sig: String,
    #[serde(rename = "judgeSig")]
    pub judge_sig: String,
}

/// POST /battle/{battle_id}/init
pub async fn init(
    State(state): State<AppState>,
    Path(battle_id): Path<String>,
    Json(req): Json<InitBattleRequest>,
) -> ApiResult<Json<InitBattleResponse>> {
    let battle_id: u64 = battle_id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid battle ID: {}", battle_id)))?;
    let role = parse_role(&req.role)?;
    let created = state
        .coordinator
        .init_battle(battle_id, req.winner_is_challenger, role, req.party_id)
        .await?;
    Ok(Json(InitBattleResponse {
        session_id: created.session_id,
        status: "created".to_string(),
        message: encode_b64(&created.message),
    }))
}

/// POST /battle/{session_id}/join
pub async fn join(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<JoinBattleRequest>,
) -> ApiResult<Json<JoinBattleResponse>> {
    let role = parse_role(&req.role)?;
    let (status, message) = state
        .coordinator
        .join_battle(&session_id, role, req.party_id)
        .await?;
    let snapshot = state.coordinator.battle_status(&session_id).await?;
    Ok(Json(JoinBattleResponse {
        status,
        participants: snapshot.participants,
        message: encode_b64(&message),
    }))
}

/// POST /battle/{session_id}/message
pub async fn broadcast_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<BattleMessageRequest>,
) -> ApiResult<Json<BattleMessageResponse>> {
    let payload = decode_b64(&req.message, "message")?;
    state
        .coordinator
        .broadcast_battle_message(&session_id, &payload)
        .await?;
    Ok(Json(BattleMessageResponse {
        status: "message_received".to_string(),
    }))
}

/// POST /battle/{session_id}/signature
pub async fn submit_signature(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<BattleSignatureRequest>,
) -> ApiResult<Json<BattleSignatureResponse>> {
    let role = parse_role(&req.role)?;
    let signature = decode_b64(&req.signature, "signature")?;
    let (status, signatures_collected) = state
        .coordinator
        .submit_battle_signature(&session_id, role, signature)
        .await?;
    Ok(Json(BattleSignatureResponse {
        status,
        signatures_collected,
    }))
}

/// GET /battle/{session_id}/status
pub async fn status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<BattleSnapshot>> {
    let snapshot = state.coordinator.battle_status(&session_id).await?;
    Ok(Json(snapshot))
}

/// GET /battle/{session_id}/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<FinalizeBattleResponse>> {
    let outcome = state.coordinator.finalize_battle(&session_id).await?;
    Ok(Json(FinalizeBattleResponse {
        battle_id: outcome.battle_id,
        winner_is_challenger: outcome.winner_is_challenger,
        message: encode_b64(&outcome.message),
        challenger_sig: encode_b64(&outcome.signatures.challenger),
        defender_sig: encode_b64(&outcome.signatures.defender),
        judge_sig: encode_b64(&outcome.signatures.judge),
    }))
}
