use crate::battle::{BattleSession, BattleSignatures};
use crate::config::CoordinatorConfig;
use crate::error::{Result, SessionError};
use crate::registry::SessionRegistry;
use crate::session::Session;
use relay_types::{
    BattleSnapshot, BattleStatus, Message, PartyId, Role, RoundPolicy, SessionStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Result of joining a session: the assigned party ID plus the quorum shape.
#[derive(Debug, Clone, Copy)]
pub struct JoinedParty {
    pub party: PartyId,
    pub threshold: u16,
    pub total_parties: u16,
}

/// Summary returned when a signing session is finalized and torn down.
#[derive(Debug, Clone, Copy)]
pub struct FinalizeSummary {
    pub transaction_len: usize,
    pub signature_len: usize,
}

/// Result of creating a battle session.
#[derive(Debug, Clone)]
pub struct BattleCreated {
    pub session_id: String,
    pub message: Vec<u8>,
}

/// The finalized outcome of a battle session.
#[derive(Debug, Clone)]
pub struct BattleOutcome {
    pub battle_id: u64,
    pub winner_is_challenger: bool,
    pub message: Vec<u8>,
    pub signatures: BattleSignatures,
}

/// Which registry a generic session operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Keygen,
    Signing,
}

/// Central coordination service: owns the keygen, signing and battle
/// registries and implements every session operation over them.
pub struct Coordinator {
    config: CoordinatorConfig,
    keygen: Arc<SessionRegistry<Session>>,
    signing: Arc<SessionRegistry<Session>>,
    battles: Arc<SessionRegistry<BattleSession>>,
    /// Battle ID to live session ID, to reject a duplicate in-flight battle.
    active_battles: Mutex<HashMap<u64, String>>,
    keygen_seq: AtomicU64,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            keygen: Arc::new(SessionRegistry::new()),
            signing: Arc::new(SessionRegistry::new()),
            battles: Arc::new(SessionRegistry::new()),
            active_battles: Mutex::new(HashMap::new()),
            keygen_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn registry(&self, kind: SessionKind) -> &Arc<SessionRegistry<Session>> {
        match kind {
            SessionKind::Keygen => &self.keygen,
            SessionKind::Signing => &self.signing,
        }
    }

    /// Creates a keygen session with a server-assigned sequential ID.
    pub async fn create_keygen_session(&self, threshold: u16, total_parties: u16) -> Result<String> {
        let seq = self.keygen_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("session-{}", seq);
        let session = Session::new(id.clone(), threshold, total_parties, RoundPolicy::FullExchange)?;
        self.keygen.insert(&id, session).await?;
        info!(session_id = %id, t = threshold, n = total_parties, "keygen session created");
        Ok(id)
    }

    /// Joins a keygen session, receiving the next unclaimed party ID.
    pub async fn join_keygen(&self, session_id: &str) -> Result<JoinedParty> {
        let handle = self.keygen.get(session_id).await?;
        let mut session = handle.lock().await;
        let party = session.join_next()?;
        info!(session_id, %party, "party joined keygen session");
        Ok(JoinedParty {
            party,
            threshold: session.threshold(),
            total_parties: session.total_parties(),
        })
    }

    /// Creates a signing session under a caller-chosen ID.
    pub async fn create_signing_session(
        &self,
        session_id: &str,
        threshold: u16,
        total_parties: u16,
    ) -> Result<()> {
        let session = Session::new(
            session_id.to_string(),
            threshold,
            total_parties,
            RoundPolicy::ClientPaced,
        )?;
        self.signing.insert(session_id, session).await?;
        info!(session_id, t = threshold, n = total_parties, "signing session created");
        Ok(())
    }

    /// Joins a signing session under a caller-chosen party ID.
    pub async fn join_signing(&self, session_id: &str, party: PartyId) -> Result<JoinedParty> {
        let handle = self.signing.get(session_id).await?;
        let mut session = handle.lock().await;
        session.join_as(party)?;
        info!(session_id, %party, "party joined signing session");
        Ok(JoinedParty {
            party,
            threshold: session.threshold(),
            total_parties: session.total_parties(),
        })
    }

    /// Appends a batch of round messages to a session.
    pub async fn submit_messages(
        &self,
        kind: SessionKind,
        session_id: &str,
        round: u32,
        messages: Vec<Message>,
    ) -> Result<()> {
        let handle = self.registry(kind).get(session_id).await?;
        let mut session = handle.lock().await;
        let count = messages.len();
        session.append_messages(round, messages)?;
        info!(session_id, round, count, "stored round messages");
        Ok(())
    }

    /// Fetches the round messages visible to one party.
    pub async fn fetch_messages(
        &self,
        kind: SessionKind,
        session_id: &str,
        round: u32,
        party: PartyId,
    ) -> Result<Vec<Vec<u8>>> {
        let handle = self.registry(kind).get(session_id).await?;
        let mut session = handle.lock().await;
        session.fetch(round, party)
    }

    pub async fn session_status(&self, kind: SessionKind, session_id: &str) -> Result<SessionStatus> {
        let handle = self.registry(kind).get(session_id).await?;
        let mut session = handle.lock().await;
        session.touch();
        Ok(session.status())
    }

    /// Stores the transaction payload on a signing session.
    pub async fn set_transaction(&self, session_id: &str, payload: Vec<u8>) -> Result<()> {
        let handle = self.signing.get(session_id).await?;
        let mut session = handle.lock().await;
        session.set_transaction(payload)?;
        info!(session_id, "transaction stored");
        Ok(())
    }

    pub async fn transaction(&self, session_id: &str) -> Result<Vec<u8>> {
        let handle = self.signing.get(session_id).await?;
        let mut session = handle.lock().await;
        session.transaction()
    }

    /// Finalizes a signing session: verifies a transaction was staged,
    /// removes the session, and reports the payload sizes.
    ///
    /// The session lock is held across the removal so concurrent finalizers
    /// serialize; the loser observes the session as gone.
    pub async fn finalize_signing(
        &self,
        session_id: &str,
        signature: Vec<u8>,
    ) -> Result<FinalizeSummary> {
        let handle = self.signing.get(session_id).await?;
        let mut session = handle.lock().await;
        if !self.signing.contains(session_id).await {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        let transaction = session.transaction()?;
        self.signing.remove(session_id).await?;
        info!(session_id, "signing session finalized");
        Ok(FinalizeSummary {
            transaction_len: transaction.len(),
            signature_len: signature.len(),
        })
    }

    /// Creates a battle session, recording the initiator's role. A battle ID
    /// with a live session is rejected.
    pub async fn init_battle(
        &self,
        battle_id: u64,
        winner_is_challenger: bool,
        role: Role,
        participant_key: String,
    ) -> Result<BattleCreated> {
        let mut active = self.active_battles.lock().await;
        if let Some(existing) = active.get(&battle_id) {
            if self.battles.contains(existing).await {
                return Err(SessionError::AlreadyExists(format!("battle {}", battle_id)));
            }
        }
        let session_id = format!("battle-{}-{}", battle_id, Uuid::new_v4());
        let mut session = BattleSession::new(session_id.clone(), battle_id, winner_is_challenger);
        session.join(role, participant_key);
        let message = session.message().to_vec();
        self.battles.insert(&session_id, session).await?;
        active.insert(battle_id, session_id.clone());
        info!(session_id = %session_id, battle_id, "battle session created");
        Ok(BattleCreated { session_id, message })
    }

    /// Joins a battle session in a role. Returns the status after the join
    /// and the canonical message to sign.
    pub async fn join_battle(
        &self,
        session_id: &str,
        role: Role,
        participant_key: String,
    ) -> Result<(BattleStatus, Vec<u8>)> {
        let handle = self.battles.get(session_id).await?;
        let mut session = handle.lock().await;
        let status = session.join(role, participant_key);
        info!(session_id, %role, %status, "role joined battle session");
        Ok((status, session.message().to_vec()))
    }

    /// Verifies a broadcast battle payload against the canonical message.
    pub async fn broadcast_battle_message(&self, session_id: &str, payload: &[u8]) -> Result<()> {
        let handle = self.battles.get(session_id).await?;
        let mut session = handle.lock().await;
        session.verify_message(payload)
    }

    /// Records one role's signature; reports status and collected count.
    pub async fn submit_battle_signature(
        &self,
        session_id: &str,
        role: Role,
        signature: Vec<u8>,
    ) -> Result<(BattleStatus, usize)> {
        let handle = self.battles.get(session_id).await?;
        let mut session = handle.lock().await;
        let status = session.submit_signature(role, signature)?;
        info!(session_id, %role, %status, "battle signature stored");
        Ok((status, session.signatures_collected()))
    }

    pub async fn battle_status(&self, session_id: &str) -> Result<BattleSnapshot> {
        let handle = self.battles.get(session_id).await?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Returns the collected signatures of a complete battle and schedules
    /// the session for removal after the grace period. Until then, repeated
    /// finalize and status calls keep working.
    pub async fn finalize_battle(&self, session_id: &str) -> Result<BattleOutcome> {
        let handle = self.battles.get(session_id).await?;
        let session = handle.lock().await;
        let signatures = session.signatures()?;
        let outcome = BattleOutcome {
            battle_id: session.battle_id(),
            winner_is_challenger: session.winner_is_challenger(),
            message: session.message().to_vec(),
            signatures,
        };
        drop(session);

        let mut active = self.active_battles.lock().await;
        if active.get(&outcome.battle_id).map(String::as_str) == Some(session_id) {
            active.remove(&outcome.battle_id);
        }
        drop(active);

        self.battles
            .remove_after(session_id.to_string(), self.config.battle_grace_period);
        info!(session_id, battle_id = outcome.battle_id, "battle session finalized");
        Ok(outcome)
    }

    /// One eviction pass over all three registries. Returns the number of
    /// sessions removed.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.config.session_ttl;
        let mut removed = self.keygen.evict_idle(ttl).await.len();
        removed += self.signing.evict_idle(ttl).await.len();
        let battles = self.battles.evict_idle(ttl).await;
        removed += battles.len();
        if !battles.is_empty() {
            let mut active = self.active_battles.lock().await;
            active.retain(|_, session_id| !battles.contains(session_id));
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::battle_message;
    use std::time::Duration;

    fn coordinator() -> Coordinator {
        Coordinator::new(CoordinatorConfig::default())
    }

    fn msg(from: u16, to: u16, round: u32, content: &[u8]) -> Message {
        Message {
            from: PartyId(from),
            to: PartyId(to),
            round,
            content: content.to_vec(),
        }
    }

    #[tokio::test]
    async fn keygen_ids_are_sequential() {
        let c = coordinator();
        assert_eq!(c.create_keygen_session(2, 3).await.unwrap(), "session-1");
        assert_eq!(c.create_keygen_session(2, 2).await.unwrap(), "session-2");
    }

    #[tokio::test]
    async fn keygen_join_assigns_parties_in_order() {
        let c = coordinator();
        let id = c.create_keygen_session(2, 3).await.unwrap();
        for expected in 1..=3u16 {
            let joined = c.join_keygen(&id).await.unwrap();
            assert_eq!(joined.party, PartyId(expected));
            assert_eq!(joined.threshold, 2);
            assert_eq!(joined.total_parties, 3);
        }
        assert!(matches!(
            c.join_keygen(&id).await,
            Err(SessionError::SessionFull(_))
        ));
    }

    #[tokio::test]
    async fn keygen_fetch_is_gated_per_round() {
        let c = coordinator();
        let id = c.create_keygen_session(2, 2).await.unwrap();
        c.submit_messages(SessionKind::Keygen, &id, 1, vec![msg(1, 0, 1, b"a")])
            .await
            .unwrap();
        assert!(matches!(
            c.fetch_messages(SessionKind::Keygen, &id, 1, PartyId(2)).await,
            Err(SessionError::NotReady(_))
        ));
        c.submit_messages(SessionKind::Keygen, &id, 1, vec![msg(2, 0, 1, b"b")])
            .await
            .unwrap();
        let got = c
            .fetch_messages(SessionKind::Keygen, &id, 1, PartyId(2))
            .await
            .unwrap();
        assert_eq!(got.len(), 2);
    }

    #[tokio::test]
    async fn signing_session_ids_are_caller_chosen_and_unique() {
        let c = coordinator();
        c.create_signing_session("tx-abc", 2, 3).await.unwrap();
        assert!(matches!(
            c.create_signing_session("tx-abc", 2, 3).await,
            Err(SessionError::AlreadyExists(_))
        ));
        // Keygen and signing namespaces are independent.
        let keygen_id = c.create_keygen_session(2, 3).await.unwrap();
        c.create_signing_session(&keygen_id, 2, 3).await.unwrap();
    }

    #[tokio::test]
    async fn signing_fetch_is_ungated() {
        let c = coordinator();
        c.create_signing_session("s", 2, 3).await.unwrap();
        let got = c
            .fetch_messages(SessionKind::Signing, "s", 1, PartyId(1))
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn finalize_removes_exactly_once() {
        let c = coordinator();
        c.create_signing_session("s", 2, 2).await.unwrap();

        // Without a transaction finalize must not consume the session.
        assert!(matches!(
            c.finalize_signing("s", vec![0u8; 64]).await,
            Err(SessionError::NotReady(_))
        ));
        assert!(c.session_status(SessionKind::Signing, "s").await.is_ok());

        c.set_transaction("s", b"payload".to_vec()).await.unwrap();
        let summary = c.finalize_signing("s", vec![0u8; 64]).await.unwrap();
        assert_eq!(summary.transaction_len, 7);
        assert_eq!(summary.signature_len, 64);

        assert!(matches!(
            c.finalize_signing("s", vec![0u8; 64]).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_in_flight_battle_rejected() {
        let c = coordinator();
        let created = c
            .init_battle(7, true, Role::Challenger, "c".into())
            .await
            .unwrap();
        assert!(created.session_id.starts_with("battle-7-"));
        assert_eq!(created.message, battle_message(7, true).to_vec());

        assert!(matches!(
            c.init_battle(7, false, Role::Defender, "d".into()).await,
            Err(SessionError::AlreadyExists(_))
        ));

        // A different battle ID is fine.
        c.init_battle(8, false, Role::Judge, "j".into()).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn battle_finalize_keeps_session_through_grace_period() {
        let c = Coordinator::new(
            CoordinatorConfig::builder()
                .battle_grace_period(Duration::from_secs(300))
                .build(),
        );
        let created = c
            .init_battle(5, false, Role::Challenger, "c".into())
            .await
            .unwrap();
        let id = created.session_id.clone();
        c.join_battle(&id, Role::Defender, "d".into()).await.unwrap();
        let (status, _) = c.join_battle(&id, Role::Judge, "j".into()).await.unwrap();
        assert_eq!(status, BattleStatus::Signing);

        assert!(matches!(
            c.finalize_battle(&id).await,
            Err(SessionError::Incomplete)
        ));

        for role in Role::ALL {
            c.submit_battle_signature(&id, role, vec![role as u8; 64])
                .await
                .unwrap();
        }

        let outcome = c.finalize_battle(&id).await.unwrap();
        assert_eq!(outcome.battle_id, 5);
        assert!(!outcome.winner_is_challenger);
        // Let the spawned grace-period task register its timer before
        // advancing the paused clock.
        tokio::task::yield_now().await;

        // Readable and re-finalizable during the grace window.
        tokio::time::advance(Duration::from_secs(200)).await;
        assert!(c.battle_status(&id).await.is_ok());
        assert!(c.finalize_battle(&id).await.is_ok());

        // After finalize the battle ID may be reused.
        c.init_battle(5, true, Role::Challenger, "c2".into())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        tokio::task::yield_now().await;
        assert!(matches!(
            c.battle_status(&id).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn battle_message_mismatch_rejected() {
        let c = coordinator();
        let created = c
            .init_battle(9, true, Role::Challenger, "c".into())
            .await
            .unwrap();
        assert!(c
            .broadcast_battle_message(&created.session_id, &created.message)
            .await
            .is_ok());
        assert!(matches!(
            c.broadcast_battle_message(&created.session_id, &battle_message(9, false))
                .await,
            Err(SessionError::MessageMismatch)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_idle_sessions_across_registries() {
        let c = Coordinator::new(
            CoordinatorConfig::builder()
                .session_ttl(Duration::from_secs(60))
                .build(),
        );
        let keygen_id = c.create_keygen_session(2, 2).await.unwrap();
        c.create_signing_session("s", 2, 2).await.unwrap();
        let battle = c
            .init_battle(1, true, Role::Challenger, "c".into())
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        // Activity on the signing session resets its idle clock.
        c.session_status(SessionKind::Signing, "s").await.unwrap();

        tokio::time::advance(Duration::from_secs(40)).await;
        let removed = c.evict_idle().await;
        assert_eq!(removed, 2);
        assert!(matches!(
            c.session_status(SessionKind::Keygen, &keygen_id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(c.session_status(SessionKind::Signing, "s").await.is_ok());
        assert!(matches!(
            c.battle_status(&battle.session_id).await,
            Err(SessionError::NotFound(_))
        ));

        // The evicted battle ID is free again.
        c.init_battle(1, true, Role::Challenger, "c".into())
            .await
            .unwrap();
    }
}
