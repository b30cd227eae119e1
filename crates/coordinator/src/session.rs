use crate::error::{Result, SessionError};
use crate::registry::IdleTracked;
use chrono::{DateTime, Utc};
use relay_types::{Message, PartyId, RoundPolicy, SessionStatus};
use std::collections::BTreeMap;
use tokio::time::Instant;

/// One signing or key-generation session: roster, per-round message log and
/// the optional transaction payload.
pub struct Session {
    id: String,
    threshold: u16,
    total_parties: u16,
    party_ids: Vec<PartyId>,
    joined: Vec<PartyId>,
    rounds: BTreeMap<u32, Vec<Message>>,
    transaction: Option<Vec<u8>>,
    policy: RoundPolicy,
    created_at: DateTime<Utc>,
    last_activity: Instant,
}

impl Session {
    pub fn new(id: String, threshold: u16, total_parties: u16, policy: RoundPolicy) -> Result<Self> {
        if threshold == 0 || total_parties == 0 || threshold > total_parties {
            return Err(SessionError::InvalidParameters(format!(
                "threshold {} of {} parties",
                threshold, total_parties
            )));
        }
        let party_ids = (1..=total_parties).map(PartyId).collect();
        Ok(Self {
            id,
            threshold,
            total_parties,
            party_ids,
            joined: Vec::new(),
            rounds: BTreeMap::new(),
            transaction: None,
            policy,
            created_at: Utc::now(),
            last_activity: Instant::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    pub fn total_parties(&self) -> u16 {
        self.total_parties
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Assigns the next unclaimed party ID to a joining participant.
    pub fn join_next(&mut self) -> Result<PartyId> {
        self.touch();
        if self.joined.len() >= self.party_ids.len() {
            return Err(SessionError::SessionFull(self.id.clone()));
        }
        let party = self.party_ids[self.joined.len()];
        self.joined.push(party);
        Ok(party)
    }

    /// Records a participant joining under a specific party ID.
    pub fn join_as(&mut self, party: PartyId) -> Result<()> {
        self.touch();
        if party.is_broadcast() || party.0 > self.total_parties {
            return Err(SessionError::InvalidParameters(format!(
                "party ID {} out of range 1..={}",
                party.0, self.total_parties
            )));
        }
        if self.joined.contains(&party) {
            return Err(SessionError::AlreadyExists(format!(
                "{} in session {}",
                party, self.id
            )));
        }
        if self.joined.len() >= self.party_ids.len() {
            return Err(SessionError::SessionFull(self.id.clone()));
        }
        self.joined.push(party);
        Ok(())
    }

    /// Appends a batch of messages to a round. The batch was validated by the
    /// caller before decoding, so it lands whole or not at all.
    pub fn append_messages(&mut self, round: u32, messages: Vec<Message>) -> Result<()> {
        if round == 0 {
            return Err(SessionError::InvalidParameters(
                "round must be positive".to_string(),
            ));
        }
        self.touch();
        self.rounds.entry(round).or_default().extend(messages);
        Ok(())
    }

    /// Returns the message contents addressed to `party` for a round, in
    /// arrival order. Under a gating policy the round must hold its full
    /// complement first; re-fetching a complete round always succeeds.
    pub fn fetch(&mut self, round: u32, party: PartyId) -> Result<Vec<Vec<u8>>> {
        self.touch();
        let stored = self.rounds.get(&round).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(expected) = self.policy.expected_messages(round, self.total_parties) {
            if stored.len() < expected {
                return Err(SessionError::NotReady(format!(
                    "round {} has {} of {} messages",
                    round,
                    stored.len(),
                    expected
                )));
            }
        }
        Ok(stored
            .iter()
            .filter(|m| m.is_for(party))
            .map(|m| m.content.clone())
            .collect())
    }

    /// Stores the transaction payload. Set once; a second attempt fails.
    pub fn set_transaction(&mut self, payload: Vec<u8>) -> Result<()> {
        self.touch();
        if self.transaction.is_some() {
            return Err(SessionError::AlreadyExists(format!(
                "transaction for session {}",
                self.id
            )));
        }
        self.transaction = Some(payload);
        Ok(())
    }

    pub fn transaction(&mut self) -> Result<Vec<u8>> {
        self.touch();
        self.transaction
            .clone()
            .ok_or_else(|| SessionError::NotReady("transaction not set".to_string()))
    }

    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            party_ids: self.party_ids.iter().map(|p| p.0).collect(),
            joined_parties: self.joined.iter().map(|p| p.0).collect(),
            t: self.threshold,
            n: self.total_parties,
            messages: self
                .rounds
                .iter()
                .map(|(round, msgs)| (*round, msgs.len()))
                .collect(),
            has_transaction: self.transaction.is_some(),
            created_at: self.created_at,
        }
    }
}

impl IdleTracked for Session {
    fn last_activity(&self) -> Instant {
        self.last_activity
    }
}
