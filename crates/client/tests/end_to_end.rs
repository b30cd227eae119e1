//! Full client-against-server tests over a real socket.

use relay_api::{router, AppState};
use relay_client::{
    run_battle, run_rounds, BattleSigner, CoordinatorClient, OutboundMessage, RoundDriver,
    SessionKind,
};
use relay_coordinator::{Coordinator, CoordinatorConfig};
use relay_types::{PartyId, Role, BATTLE_SIGNATURE_LEN};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server() -> String {
    let coordinator = Arc::new(Coordinator::new(CoordinatorConfig::default()));
    let app = router(AppState::new(coordinator));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: &str) -> CoordinatorClient {
    CoordinatorClient::new(base_url).with_poll_interval(Duration::from_millis(20))
}

/// Echo protocol shaped like a full-exchange ceremony: round 1 broadcasts a
/// greeting, round 2 sends a directed message to every other party, round 3
/// only consumes. Deterministic, so parties can cross-check.
struct EchoDriver {
    party: PartyId,
    total_parties: u16,
    seen: Vec<Vec<Vec<u8>>>,
}

impl EchoDriver {
    fn new(party: PartyId, total_parties: u16) -> Self {
        Self {
            party,
            total_parties,
            seen: Vec::new(),
        }
    }
}

impl RoundDriver for EchoDriver {
    fn step(&mut self, round: u32, incoming: &[Vec<u8>]) -> relay_client::Result<Vec<OutboundMessage>> {
        self.seen.push(incoming.to_vec());
        let payload = format!("p{}-r{}-saw{}", self.party.0, round, incoming.len());
        let outbound = match round {
            2 => (1..=self.total_parties)
                .filter(|&id| id != self.party.0)
                .map(|id| OutboundMessage::directed(PartyId(id), payload.clone().into_bytes()))
                .collect(),
            _ => vec![OutboundMessage::broadcast(payload.into_bytes())],
        };
        Ok(outbound)
    }
}

#[tokio::test]
async fn three_party_keygen_round_loop() {
    let base_url = spawn_server().await;
    let setup = client(&base_url);

    let session_id = setup.initiate_keygen(2, 3).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let base_url = base_url.clone();
        let session_id = session_id.clone();
        handles.push(tokio::spawn(async move {
            let client = client(&base_url);
            let joined = client.join_keygen(&session_id).await.unwrap();
            client
                .wait_for_parties(SessionKind::Keygen, &session_id, 3)
                .await
                .unwrap();

            let mut driver = EchoDriver::new(joined.party, joined.total_parties);
            run_rounds(
                &client,
                SessionKind::Keygen,
                &session_id,
                joined.party,
                3,
                &mut driver,
            )
            .await
            .unwrap();
            driver
        }));
    }

    for handle in handles {
        let driver = handle.await.unwrap();
        // Round 1 consumes nothing; round 2 sees the three broadcasts of
        // round 1; round 3 sees the two directed messages addressed to it.
        assert_eq!(driver.seen.len(), 3);
        assert!(driver.seen[0].is_empty());
        assert_eq!(driver.seen[1].len(), 3);
        assert_eq!(driver.seen[2].len(), 2);
    }
}

#[tokio::test]
async fn signing_session_transaction_and_finalize() {
    let base_url = spawn_server().await;
    let client = client(&base_url);

    client.initiate_signing("game-7", 2, 2).await.unwrap();
    client.join_signing("game-7", PartyId(1)).await.unwrap();
    client.join_signing("game-7", PartyId(2)).await.unwrap();

    client
        .broadcast_transaction("game-7", b"serialized transaction")
        .await
        .unwrap();
    assert_eq!(
        client.transaction("game-7").await.unwrap(),
        b"serialized transaction".to_vec()
    );

    // Ungated relay: party 2 reads party 1's message as soon as it lands.
    client
        .submit_messages(
            SessionKind::Signing,
            "game-7",
            PartyId(1),
            1,
            &[OutboundMessage::broadcast(b"share".to_vec())],
        )
        .await
        .unwrap();
    let got = client
        .fetch_messages(SessionKind::Signing, "game-7", PartyId(2), 1)
        .await
        .unwrap();
    assert_eq!(got, vec![b"share".to_vec()]);

    let report = client.finalize("game-7", &[5u8; 64]).await.unwrap();
    assert_eq!(report.transaction_length, 22);
    assert_eq!(report.signature_length, 64);

    let err = client.finalize("game-7", &[5u8; 64]).await.unwrap_err();
    assert!(matches!(err, relay_client::ClientError::Api { status: 404, .. }));
}

struct PatternSigner(u8);

impl BattleSigner for PatternSigner {
    fn sign(&mut self, message: &[u8]) -> relay_client::Result<[u8; BATTLE_SIGNATURE_LEN]> {
        assert_eq!(message.len(), 9);
        Ok([self.0; BATTLE_SIGNATURE_LEN])
    }
}

#[tokio::test]
async fn battle_session_collects_three_signatures() {
    let base_url = spawn_server().await;
    let initiator = client(&base_url);

    let handle = initiator
        .init_battle(1234, true, Role::Challenger, "pk-challenger")
        .await
        .unwrap();
    assert_eq!(handle.message[8], 1);

    let mut workers = Vec::new();
    for (role, tag) in [(Role::Challenger, 1u8), (Role::Defender, 2), (Role::Judge, 3)] {
        let base_url = base_url.clone();
        let session_id = handle.session_id.clone();
        workers.push(tokio::spawn(async move {
            let client = client(&base_url);
            let mut signer = PatternSigner(tag);
            run_battle(&client, &session_id, role, &format!("pk-{}", role), &mut signer)
                .await
                .unwrap()
        }));
    }

    for worker in workers {
        let result = worker.await.unwrap();
        assert_eq!(result.battle_id, 1234);
        assert!(result.winner_is_challenger);
    }
}
