//! HTTP client for the relay API.

use crate::error::{ClientError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use relay_types::{BattleSnapshot, PartyId, Role, SessionStatus};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Which endpoint family a session operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Keygen,
    Signing,
}

impl SessionKind {
    fn prefix(&self) -> &'static str {
        match self {
            SessionKind::Keygen => "keygen",
            SessionKind::Signing => "sign",
        }
    }
}

/// An outbound message for one round: recipient plus raw payload.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Recipient, or [`PartyId::BROADCAST`] for everyone.
    pub to: PartyId,
    pub content: Vec<u8>,
}

impl OutboundMessage {
    pub fn broadcast(content: Vec<u8>) -> Self {
        Self {
            to: PartyId::BROADCAST,
            content,
        }
    }

    pub fn directed(to: PartyId, content: Vec<u8>) -> Self {
        Self { to, content }
    }
}

/// Identity assigned when joining a session.
#[derive(Debug, Clone, Copy)]
pub struct JoinedSession {
    pub party: PartyId,
    pub threshold: Option<u16>,
    pub total_parties: u16,
}

#[derive(Debug, Deserialize)]
struct JoinKeygenResponse {
    #[serde(rename = "partyID")]
    party_id: u16,
    t: u16,
    n: u16,
}

#[derive(Debug, Deserialize)]
struct JoinSigningResponse {
    #[serde(rename = "partyID")]
    party_id: u16,
    n: u16,
}

#[derive(Debug, Deserialize)]
struct InitiateKeygenResponse {
    #[serde(rename = "sessionID")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct FetchMessagesResponse {
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    transaction: String,
}

/// Sizes reported when a signing session is finalized.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FinalizeReport {
    #[serde(rename = "transactionLength")]
    pub transaction_length: usize,
    #[serde(rename = "signatureLength")]
    pub signature_length: usize,
}

/// A created battle session: its ID and the canonical message to sign.
#[derive(Debug, Clone)]
pub struct BattleHandle {
    pub session_id: String,
    pub message: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct InitBattleResponse {
    #[serde(rename = "sessionID")]
    session_id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JoinBattleResponse {
    status: relay_types::BattleStatus,
    message: String,
}

/// The finalized battle outcome with all three signatures.
#[derive(Debug, Clone, Deserialize)]
pub struct BattleResult {
    #[serde(rename = "battleID")]
    pub battle_id: u64,
    #[serde(rename = "winnerIsChallenger")]
    pub winner_is_challenger: bool,
    #[serde(rename = "challengerSig")]
    pub challenger_sig: String,
    #[serde(rename = "defenderSig")]
    pub defender_sig: String,
    #[serde(rename = "judgeSig")]
    pub judge_sig: String,
}

#[derive(Debug, Serialize)]
struct MessageEntryBody {
    to: u16,
    content: String,
}

/// Client for one relay coordinator instance.
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let reason = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            Err(ClientError::Api {
                status: status.as_u16(),
                reason,
            })
        }
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::parse(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::parse(response).await
    }

    /// Creates a keygen session and returns its server-assigned ID.
    pub async fn initiate_keygen(&self, threshold: u16, total_parties: u16) -> Result<String> {
        let response: InitiateKeygenResponse = self
            .post_json("keygen/initiate", &serde_json::json!({"t": threshold, "n": total_parties}))
            .await?;
        Ok(response.session_id)
    }

    pub async fn join_keygen(&self, session_id: &str) -> Result<JoinedSession> {
        let response: JoinKeygenResponse = self
            .post_json(&format!("keygen/{}/join", session_id), &Value::Null)
            .await?;
        Ok(JoinedSession {
            party: PartyId(response.party_id),
            threshold: Some(response.t),
            total_parties: response.n,
        })
    }

    /// Creates a signing session under a caller-chosen ID.
    pub async fn initiate_signing(
        &self,
        session_id: &str,
        threshold: u16,
        total_parties: u16,
    ) -> Result<()> {
        let _: Value = self
            .post_json(
                "sign/initiate",
                &serde_json::json!({"sessionID": session_id, "t": threshold, "n": total_parties}),
            )
            .await?;
        Ok(())
    }

    pub async fn join_signing(&self, session_id: &str, party: PartyId) -> Result<JoinedSession> {
        let response: JoinSigningResponse = self
            .post_json(
                &format!("sign/{}/join", session_id),
                &serde_json::json!({"partyID": party.0}),
            )
            .await?;
        Ok(JoinedSession {
            party: PartyId(response.party_id),
            threshold: None,
            total_parties: response.n,
        })
    }

    /// Submits one party's outbound messages for a round.
    pub async fn submit_messages(
        &self,
        kind: SessionKind,
        session_id: &str,
        party: PartyId,
        round: u32,
        messages: &[OutboundMessage],
    ) -> Result<()> {
        let entries: Vec<MessageEntryBody> = messages
            .iter()
            .map(|m| MessageEntryBody {
                to: m.to.0,
                content: BASE64.encode(&m.content),
            })
            .collect();
        let body = serde_json::json!({
            "partyID": party.0,
            "round": round,
            "messages": entries,
        });
        let _: Value = self
            .post_json(&format!("{}/{}/messages", kind.prefix(), session_id), &body)
            .await?;
        debug!(session_id, round, count = messages.len(), "submitted round messages");
        Ok(())
    }

    /// Fetches and decodes the round messages addressed to one party.
    pub async fn fetch_messages(
        &self,
        kind: SessionKind,
        session_id: &str,
        party: PartyId,
        round: u32,
    ) -> Result<Vec<Vec<u8>>> {
        let response: FetchMessagesResponse = self
            .get_json(&format!(
                "{}/{}/messages?partyID={}&round={}",
                kind.prefix(),
                session_id,
                party.0,
                round
            ))
            .await?;
        response
            .messages
            .iter()
            .map(|m| BASE64.decode(m).map_err(ClientError::from))
            .collect()
    }

    pub async fn status(&self, kind: SessionKind, session_id: &str) -> Result<SessionStatus> {
        self.get_json(&format!("{}/{}/status", kind.prefix(), session_id))
            .await
    }

    /// Polls until at least `expected` parties have joined.
    pub async fn wait_for_parties(
        &self,
        kind: SessionKind,
        session_id: &str,
        expected: usize,
    ) -> Result<SessionStatus> {
        loop {
            let status = self.status(kind, session_id).await?;
            if status.joined_parties.len() >= expected {
                return Ok(status);
            }
            debug!(
                session_id,
                joined = status.joined_parties.len(),
                expected,
                "waiting for parties"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Polls until a round holds at least `expected` messages.
    pub async fn wait_for_round(
        &self,
        kind: SessionKind,
        session_id: &str,
        round: u32,
        expected: usize,
    ) -> Result<()> {
        loop {
            let status = self.status(kind, session_id).await?;
            let count = status.messages.get(&round).copied().unwrap_or(0);
            if count >= expected {
                return Ok(());
            }
            debug!(session_id, round, count, expected, "waiting for round");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Stages the transaction payload on a signing session.
    pub async fn broadcast_transaction(&self, session_id: &str, payload: &[u8]) -> Result<()> {
        let _: Value = self
            .post_json(
                &format!("sign/{}/broadcast", session_id),
                &serde_json::json!({"transaction": BASE64.encode(payload)}),
            )
            .await?;
        Ok(())
    }

    pub async fn transaction(&self, session_id: &str) -> Result<Vec<u8>> {
        let response: TransactionResponse = self
            .get_json(&format!("sign/{}/transaction", session_id))
            .await?;
        Ok(BASE64.decode(&response.transaction)?)
    }

    /// Finalizes a signing session with the combined signature.
    pub async fn finalize(&self, session_id: &str, signature: &[u8]) -> Result<FinalizeReport> {
        debug!(session_id, signature = %hex::encode(signature), "finalizing session");
        self.post_json(
            &format!("sign/{}/finalize", session_id),
            &serde_json::json!({"signature": BASE64.encode(signature)}),
        )
        .await
    }

    /// Creates a battle signing session, joining as `role`.
    pub async fn init_battle(
        &self,
        battle_id: u64,
        winner_is_challenger: bool,
        role: Role,
        participant_key: &str,
    ) -> Result<BattleHandle> {
        let response: InitBattleResponse = self
            .post_json(
                &format!("battle/{}/init", battle_id),
                &serde_json::json!({
                    "winnerIsChallenger": winner_is_challenger,
                    "role": role.as_str(),
                    "partyID": participant_key,
                }),
            )
            .await?;
        Ok(BattleHandle {
            session_id: response.session_id,
            message: BASE64.decode(&response.message)?,
        })
    }

    /// Joins a battle session; returns the status after the join and the
    /// canonical message to sign.
    pub async fn join_battle(
        &self,
        session_id: &str,
        role: Role,
        participant_key: &str,
    ) -> Result<(relay_types::BattleStatus, Vec<u8>)> {
        let response: JoinBattleResponse = self
            .post_json(
                &format!("battle/{}/join", session_id),
                &serde_json::json!({"role": role.as_str(), "partyID": participant_key}),
            )
            .await?;
        Ok((response.status, BASE64.decode(&response.message)?))
    }

    pub async fn broadcast_battle_message(&self, session_id: &str, message: &[u8]) -> Result<()> {
        let _: Value = self
            .post_json(
                &format!("battle/{}/message", session_id),
                &serde_json::json!({"message": BASE64.encode(message)}),
            )
            .await?;
        Ok(())
    }

    pub async fn submit_battle_signature(
        &self,
        session_id: &str,
        role: Role,
        signature: &[u8],
    ) -> Result<()> {
        let _: Value = self
            .post_json(
                &format!("battle/{}/signature", session_id),
                &serde_json::json!({"role": role.as_str(), "signature": BASE64.encode(signature)}),
            )
            .await?;
        Ok(())
    }

    pub async fn battle_status(&self, session_id: &str) -> Result<BattleSnapshot> {
        self.get_json(&format!("battle/{}/status", session_id)).await
    }

    /// Polls until the battle session reports complete.
    pub async fn wait_for_battle_complete(&self, session_id: &str) -> Result<BattleSnapshot> {
        loop {
            let snapshot = self.battle_status(session_id).await?;
            if snapshot.complete {
                return Ok(snapshot);
            }
            debug!(session_id, status = %snapshot.status, "waiting for battle completion");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub async fn finalize_battle(&self, session_id: &str) -> Result<BattleResult> {
        self.get_json(&format!("battle/{}/finalize", session_id)).await
    }
}
