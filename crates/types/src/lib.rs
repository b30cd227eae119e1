use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of one protocol party within a session.
///
/// Party IDs are assigned `1..=N` at session creation. ID `0` is reserved as
/// the broadcast address on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyId(pub u16);

impl PartyId {
    /// The broadcast address: a message to party 0 is delivered to everyone.
    pub const BROADCAST: PartyId = PartyId(0);

    pub fn is_broadcast(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "party-{}", self.0)
    }
}

impl From<u16> for PartyId {
    fn from(id: u16) -> Self {
        PartyId(id)
    }
}

/// One relayed protocol message. Immutable once stored; ordering within a
/// round is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub from: PartyId,
    /// Addressed recipient, or [`PartyId::BROADCAST`] for everyone.
    pub to: PartyId,
    pub round: u32,
    pub content: Vec<u8>,
}

impl Message {
    /// Whether a fetch by `party` should see this message.
    pub fn is_for(&self, party: PartyId) -> bool {
        self.to.is_broadcast() || self.to == party
    }
}

/// Gating policy for round fetches, fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPolicy {
    /// Every party talks to every party: round 1 expects N messages, round 2
    /// expects the full N×(N-1) pairwise exchange, later rounds expect N.
    /// Fetches are rejected until the round holds its full complement.
    FullExchange,
    /// No server-side gate. Clients watch per-round counts via the status
    /// endpoint and self-throttle until the threshold is reached.
    ClientPaced,
}

impl RoundPolicy {
    /// Number of messages a round must hold before fetches succeed, or
    /// `None` when fetches are never gated.
    pub fn expected_messages(&self, round: u32, total_parties: u16) -> Option<usize> {
        let n = total_parties as usize;
        match self {
            RoundPolicy::FullExchange => Some(match round {
                2 => n * (n - 1),
                _ => n,
            }),
            RoundPolicy::ClientPaced => None,
        }
    }
}

/// Read-only snapshot of a session, as reported by the status endpoints.
/// Field names match the wire format the party clients expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(rename = "partyIDs")]
    pub party_ids: Vec<u16>,
    #[serde(rename = "joinedParties")]
    pub joined_parties: Vec<u16>,
    pub t: u16,
    pub n: u16,
    /// Per-round message counts.
    pub messages: BTreeMap<u32, usize>,
    #[serde(rename = "hasTransaction")]
    pub has_transaction: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// The three fixed roles of a battle signing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Challenger,
    Defender,
    Judge,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Challenger, Role::Defender, Role::Judge];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Challenger => "challenger",
            Role::Defender => "defender",
            Role::Judge => "judge",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "challenger" => Ok(Role::Challenger),
            "defender" => Ok(Role::Defender),
            "judge" => Ok(Role::Judge),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

/// Lifecycle of a battle signing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    /// Waiting for all three roles to join.
    Pending,
    /// All roles present; collecting signatures.
    Signing,
    /// All three signatures collected.
    Complete,
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleStatus::Pending => write!(f, "pending"),
            BattleStatus::Signing => write!(f, "signing"),
            BattleStatus::Complete => write!(f, "complete"),
        }
    }
}

/// Fixed width of the payload every battle role co-signs.
pub const BATTLE_MESSAGE_LEN: usize = 9;

/// Required width of a submitted battle signature.
pub const BATTLE_SIGNATURE_LEN: usize = 64;

/// The payload a battle session collects signatures over: the little-endian
/// battle ID followed by the winner flag byte. Computed once at session
/// creation; any later broadcast must match it byte for byte.
pub fn battle_message(battle_id: u64, winner_is_challenger: bool) -> [u8; BATTLE_MESSAGE_LEN] {
    let mut buf = [0u8; BATTLE_MESSAGE_LEN];
    buf[..8].copy_from_slice(&battle_id.to_le_bytes());
    buf[8] = winner_is_challenger as u8;
    buf
}

/// Read-only snapshot of a battle session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSnapshot {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "battleID")]
    pub battle_id: u64,
    #[serde(rename = "winnerIsChallenger")]
    pub winner_is_challenger: bool,
    pub status: BattleStatus,
    /// Number of roles that have joined.
    pub participants: usize,
    /// Which roles have submitted a signature.
    pub signatures: BTreeMap<Role, bool>,
    pub complete: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
