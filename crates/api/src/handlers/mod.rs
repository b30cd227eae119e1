//! HTTP request handlers for the relay API

pub mod battle;
pub mod keygen;
pub mod signing;

use crate::error::{ApiError, ApiResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use relay_types::{Message, PartyId};
use serde::{Deserialize, Serialize};

pub(crate) fn decode_b64(value: &str, what: &str) -> ApiResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {} encoding: {}", what, e)))
}

pub(crate) fn encode_b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// One outbound message in a submission batch.
#[derive(Debug, Deserialize)]
pub struct MessageEntry {
    /// Recipient party ID, 0 for broadcast
    pub to: u16,
    /// Base64-encoded payload
    pub content: String,
}

/// Request to submit a batch of round messages
#[derive(Debug, Deserialize)]
pub struct SubmitMessagesRequest {
    #[serde(rename = "partyID")]
    pub party_id: u16,
    pub round: u32,
    pub messages: Vec<MessageEntry>,
}

/// Query parameters for fetching round messages
#[derive(Debug, Deserialize)]
pub struct FetchMessagesQuery {
    #[serde(rename = "partyID")]
    pub party_id: u16,
    pub round: u32,
}

/// Response carrying base64-encoded message payloads
#[derive(Debug, Serialize)]
pub struct FetchMessagesResponse {
    pub messages: Vec<String>,
}

/// Generic acknowledgement response
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

/// Decodes a whole submission batch before anything is stored, so a bad
/// entry rejects the batch without a partial write.
pub(crate) fn decode_entries(req: &SubmitMessagesRequest) -> ApiResult<Vec<Message>> {
    let from = PartyId(req.party_id);
    req.messages
        .iter()
        .map(|entry| {
            let content = decode_b64(&entry.content, "message")?;
            Ok(Message {
                from,
                to: PartyId(entry.to),
                round: req.round,
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_decode_is_all_or_nothing() {
        let req = SubmitMessagesRequest {
            party_id: 1,
            round: 2,
            messages: vec![
                MessageEntry { to: 0, content: encode_b64(b"ok") },
                MessageEntry { to: 2, content: "not base64!!".to_string() },
            ],
        };
        assert!(decode_entries(&req).is_err());

        let req = SubmitMessagesRequest {
            party_id: 1,
            round: 2,
            messages: vec![MessageEntry { to: 0, content: encode_b64(b"ok") }],
        };
        let decoded = decode_entries(&req).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].from, PartyId(1));
        assert_eq!(decoded[0].round, 2);
        assert_eq!(decoded[0].content, b"ok".to_vec());
    }
}
