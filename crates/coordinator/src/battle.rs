use crate::error::{Result, SessionError};
use crate::registry::IdleTracked;
use chrono::{DateTime, Utc};
use relay_types::{
    battle_message, BattleSnapshot, BattleStatus, Role, BATTLE_SIGNATURE_LEN,
};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// The three collected battle signatures, in role order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleSignatures {
    pub challenger: Vec<u8>,
    pub defender: Vec<u8>,
    pub judge: Vec<u8>,
}

/// A fixed three-role signing session over one battle outcome payload.
pub struct BattleSession {
    id: String,
    battle_id: u64,
    winner_is_challenger: bool,
    message: Vec<u8>,
    participants: BTreeMap<Role, String>,
    signatures: BTreeMap<Role, Vec<u8>>,
    status: BattleStatus,
    created_at: DateTime<Utc>,
    last_activity: Instant,
}

impl BattleSession {
    pub fn new(id: String, battle_id: u64, winner_is_challenger: bool) -> Self {
        Self {
            id,
            battle_id,
            winner_is_challenger,
            message: battle_message(battle_id, winner_is_challenger).to_vec(),
            participants: BTreeMap::new(),
            signatures: BTreeMap::new(),
            status: BattleStatus::Pending,
            created_at: Utc::now(),
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn battle_id(&self) -> u64 {
        self.battle_id
    }

    pub fn winner_is_challenger(&self) -> bool {
        self.winner_is_challenger
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Records a role joining. Re-joining a role replaces the previous
    /// participant key. Once all three roles are present the session moves
    /// to signing.
    pub fn join(&mut self, role: Role, participant_key: String) -> BattleStatus {
        self.touch();
        self.participants.insert(role, participant_key);
        if self.status == BattleStatus::Pending && self.participants.len() == Role::ALL.len() {
            self.status = BattleStatus::Signing;
        }
        self.status
    }

    /// Checks a broadcast payload against the canonical session message.
    pub fn verify_message(&mut self, payload: &[u8]) -> Result<()> {
        self.touch();
        if payload != self.message.as_slice() {
            return Err(SessionError::MessageMismatch);
        }
        Ok(())
    }

    /// Stores one role's signature. A resubmission overwrites the previous
    /// value. Once all three roles have signed the session is complete.
    pub fn submit_signature(&mut self, role: Role, signature: Vec<u8>) -> Result<BattleStatus> {
        if signature.len() != BATTLE_SIGNATURE_LEN {
            return Err(SessionError::InvalidSignatureLength(signature.len()));
        }
        self.touch();
        self.signatures.insert(role, signature);
        if self.signatures.len() == Role::ALL.len() {
            self.status = BattleStatus::Complete;
        }
        Ok(self.status)
    }

    pub fn signatures_collected(&self) -> usize {
        self.signatures.len()
    }

    /// Returns all three signatures, or fails if any role has not signed.
    pub fn signatures(&self) -> Result<BattleSignatures> {
        let get = |role: Role| {
            self.signatures
                .get(&role)
                .cloned()
                .ok_or(SessionError::Incomplete)
        };
        Ok(BattleSignatures {
            challenger: get(Role::Challenger)?,
            defender: get(Role::Defender)?,
            judge: get(Role::Judge)?,
        })
    }

    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            session_id: self.id.clone(),
            battle_id: self.battle_id,
            winner_is_challenger: self.winner_is_challenger,
            status: self.status,
            participants: self.participants.len(),
            signatures: Role::ALL
                .iter()
                .map(|role| (*role, self.signatures.contains_key(role)))
                .collect(),
            complete: self.status == BattleStatus::Complete,
            created_at: self.created_at,
        }
    }
}

impl IdleTracked for BattleSession {
    fn last_activity(&self) -> Instant {
        self.last_activity
    }
}
