//! Round-loop drivers that run a full protocol session against the relay.
//!
//! The relay never interprets payloads, so the cryptographic per-round step
//! lives behind a trait the embedding application implements.

use crate::client::{CoordinatorClient, OutboundMessage, SessionKind};
use crate::error::Result;
use relay_types::{PartyId, Role, RoundPolicy, BATTLE_SIGNATURE_LEN};
use tracing::{debug, info};

/// One step of a multi-round protocol: consumes the previous round's
/// incoming payloads and produces this round's outbound messages.
pub trait RoundDriver {
    fn step(&mut self, round: u32, incoming: &[Vec<u8>]) -> Result<Vec<OutboundMessage>>;
}

/// Produces a 64-byte signature over a battle outcome payload.
pub trait BattleSigner {
    fn sign(&mut self, message: &[u8]) -> Result<[u8; BATTLE_SIGNATURE_LEN]>;
}

/// Runs the round loop for one party.
///
/// Each iteration fetches the previous round's messages, steps the driver,
/// and submits the produced batch. The final round only consumes: protocol
/// output leaves through the driver, not the relay, so nothing is submitted
/// or waited for after the last step.
pub async fn run_rounds<D: RoundDriver>(
    client: &CoordinatorClient,
    kind: SessionKind,
    session_id: &str,
    party: PartyId,
    rounds: u32,
    driver: &mut D,
) -> Result<()> {
    let status = client.status(kind, session_id).await?;
    let total_parties = status.n;
    let quorum = status.t as usize;

    for round in 1..=rounds {
        let incoming = if round > 1 {
            fetch_with_retry(client, kind, session_id, party, round - 1).await?
        } else {
            Vec::new()
        };

        debug!(session_id, round, incoming = incoming.len(), "stepping round");
        let outbound = driver.step(round, &incoming)?;

        if round < rounds {
            client
                .submit_messages(kind, session_id, party, round, &outbound)
                .await?;

            let expected = match kind {
                SessionKind::Keygen => RoundPolicy::FullExchange
                    .expected_messages(round, total_parties)
                    .unwrap_or(total_parties as usize),
                SessionKind::Signing => quorum,
            };
            client
                .wait_for_round(kind, session_id, round, expected)
                .await?;
        }
    }

    info!(session_id, %party, rounds, "round loop complete");
    Ok(())
}

/// Fetches a round, retrying while the server reports it still filling.
async fn fetch_with_retry(
    client: &CoordinatorClient,
    kind: SessionKind,
    session_id: &str,
    party: PartyId,
    round: u32,
) -> Result<Vec<Vec<u8>>> {
    loop {
        match client.fetch_messages(kind, session_id, party, round).await {
            Ok(messages) => return Ok(messages),
            Err(err) if err.is_not_ready() => {
                debug!(session_id, round, "round not ready, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Runs one role's half of a battle signing session from join to finalize.
pub async fn run_battle<S: BattleSigner>(
    client: &CoordinatorClient,
    session_id: &str,
    role: Role,
    participant_key: &str,
    signer: &mut S,
) -> Result<crate::client::BattleResult> {
    let (status, message) = client.join_battle(session_id, role, participant_key).await?;
    debug!(session_id, %role, %status, "joined battle session");

    client.broadcast_battle_message(session_id, &message).await?;

    let signature = signer.sign(&message)?;
    client
        .submit_battle_signature(session_id, role, &signature)
        .await?;

    client.wait_for_battle_complete(session_id).await?;
    let result = client.finalize_battle(session_id).await?;
    info!(session_id, %role, battle_id = result.battle_id, "battle signing complete");
    Ok(result)
}
