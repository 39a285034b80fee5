//! End-to-end tests: real server, real WebSocket clients, JSON on the wire.

use std::sync::Arc;
use std::time::Duration;

use colorclash::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

struct TestServer {
    addr: String,
    registry: Arc<RoomRegistry>,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<Result<(), ColorclashError>>,
}

impl TestServer {
    async fn start() -> Self {
        let server = ColorclashServer::builder()
            .bind("127.0.0.1:0")
            .room_config(RoomConfig {
                seed: Some(99),
                ..RoomConfig::default()
            })
            .build()
            .await
            .expect("server should bind");
        let addr = server.local_addr().unwrap().to_string();
        let registry = server.registry();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stopped.await;
        }));
        Self {
            addr,
            registry,
            stop: Some(stop),
            task,
        }
    }

    async fn connect(&self) -> Client {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", self.addr))
            .await
            .expect("client should connect");
        ws
    }

    async fn stop(mut self) -> Result<(), ColorclashError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.expect("server task should not panic")
    }
}

async fn send(client: &mut Client, cmd: ClientCommand) {
    let text = serde_json::to_string(&cmd).unwrap();
    client.send(Message::Text(text.into())).await.unwrap();
}

async fn send_raw(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_owned().into())).await.unwrap();
}

/// Next event from the server, failing the test after two seconds.
async fn recv(client: &mut Client) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("event should decode");
        }
    }
}

/// Skips events until one matches `pred`.
async fn recv_until(client: &mut Client, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        let event = recv(client).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Ana hosts (yellow), Bo joins (pink). Returns both clients after their
/// seating events have been read.
async fn seated_pair(server: &TestServer) -> (Client, Client, RoomId) {
    let mut ana = server.connect().await;
    send(
        &mut ana,
        ClientCommand::CreateRoom {
            username: "ana".into(),
            room_name: Some("duel".into()),
        },
    )
    .await;
    let room_id = match recv(&mut ana).await {
        ServerEvent::RoomCreated { state } => state.id,
        other => panic!("expected room-created, got {other:?}"),
    };

    let mut bo = server.connect().await;
    send(
        &mut bo,
        ClientCommand::JoinRoom {
            username: "bo".into(),
            room_id,
        },
    )
    .await;
    assert!(matches!(recv(&mut bo).await, ServerEvent::Joined { .. }));
    assert!(matches!(recv(&mut ana).await, ServerEvent::PlayerJoined { .. }));
    (ana, bo, room_id)
}

async fn start_round(ana: &mut Client, bo: &mut Client) {
    send(ana, ClientCommand::SetReady { ready: true }).await;
    send(bo, ClientCommand::SetReady { ready: true }).await;
    for client in [ana, bo] {
        recv_until(client, |e| matches!(e, ServerEvent::RoundStarted { .. })).await;
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_list_rooms_starts_empty() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send(&mut client, ClientCommand::ListRooms).await;

    match recv(&mut client).await {
        ServerEvent::RoomList { rooms } => assert!(rooms.is_empty()),
        other => panic!("unexpected: {other:?}"),
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_create_and_join_over_the_wire() {
    let server = TestServer::start().await;
    let (mut ana, _bo, room_id) = seated_pair(&server).await;

    send(&mut ana, ClientCommand::ListRooms).await;
    match recv(&mut ana).await {
        ServerEvent::RoomList { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].id, room_id);
            assert_eq!(rooms[0].name, "duel");
            assert_eq!(rooms[0].player_count, 2);
            assert_eq!(rooms[0].state, GameState::Waiting);
        }
        other => panic!("unexpected: {other:?}"),
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_garbage_is_rejected_not_fatal() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send_raw(&mut client, "not json").await;
    match recv(&mut client).await {
        ServerEvent::Rejected { reason } => assert!(reason.starts_with("invalid command")),
        other => panic!("unexpected: {other:?}"),
    }

    send_raw(&mut client, r#"{"type":"play-card","target_team":"green","target_slot":0}"#).await;
    assert!(matches!(recv(&mut client).await, ServerEvent::Rejected { .. }));

    // The connection is still usable.
    send(&mut client, ClientCommand::ListRooms).await;
    assert!(matches!(recv(&mut client).await, ServerEvent::RoomList { .. }));
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_room_commands_outside_a_room_are_rejected() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send(&mut client, ClientCommand::CallTeamOut).await;

    match recv(&mut client).await {
        ServerEvent::Rejected { reason } => assert!(reason.contains("not in a room")),
        other => panic!("unexpected: {other:?}"),
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_blank_username_is_rejected() {
    let server = TestServer::start().await;
    let mut client = server.connect().await;

    send(
        &mut client,
        ClientCommand::CreateRoom {
            username: "   ".into(),
            room_name: None,
        },
    )
    .await;

    match recv(&mut client).await {
        ServerEvent::Rejected { reason } => assert_eq!(reason, "username is required"),
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(server.registry.room_count().await, 0);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_third_player_sees_room_full() {
    let server = TestServer::start().await;
    let (_ana, _bo, room_id) = seated_pair(&server).await;
    let mut cy = server.connect().await;

    send(
        &mut cy,
        ClientCommand::JoinRoom {
            username: "cy".into(),
            room_id,
        },
    )
    .await;

    match recv(&mut cy).await {
        ServerEvent::Rejected { reason } => assert!(reason.contains("is full")),
        other => panic!("unexpected: {other:?}"),
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_play_before_round_starts_is_rejected() {
    let server = TestServer::start().await;
    let (mut ana, _bo, _) = seated_pair(&server).await;

    send(
        &mut ana,
        ClientCommand::PlayCard {
            target_team: Team::Pink,
            target_slot: 0,
        },
    )
    .await;

    match recv(&mut ana).await {
        ServerEvent::Rejected { reason } => {
            assert_eq!(reason, "cannot play a card while the room is waiting");
        }
        other => panic!("unexpected: {other:?}"),
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_round_start_shows_each_team_only_its_card() {
    let server = TestServer::start().await;
    let (mut ana, mut bo, _) = seated_pair(&server).await;

    send(&mut ana, ClientCommand::SetReady { ready: true }).await;
    send(&mut bo, ClientCommand::SetReady { ready: true }).await;

    for (client, team) in [(&mut ana, Team::Yellow), (&mut bo, Team::Pink)] {
        match recv_until(client, |e| matches!(e, ServerEvent::RoundStarted { .. })).await {
            ServerEvent::RoundStarted {
                board,
                time_left,
                round,
            } => {
                assert_eq!(board.player_card.map(|c| c.owner), Some(team));
                assert_eq!(board.shared.yellow.len(), 3);
                assert_eq!(board.shared.pink.len(), 3);
                assert_eq!(time_left, 60);
                assert_eq!(round, 1);
            }
            _ => unreachable!(),
        }
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_both_teams_out_ends_round() {
    let server = TestServer::start().await;
    let (mut ana, mut bo, _) = seated_pair(&server).await;
    start_round(&mut ana, &mut bo).await;

    send(&mut ana, ClientCommand::CallTeamOut).await;
    send(&mut bo, ClientCommand::CallTeamOut).await;

    for client in [&mut ana, &mut bo] {
        let event = recv_until(client, |e| matches!(e, ServerEvent::RoundEnded { .. })).await;
        let ServerEvent::RoundEnded {
            scores,
            total_points,
            ..
        } = event
        else {
            unreachable!()
        };
        assert_eq!(scores, total_points);
    }
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_disconnect_mid_round_forfeits_to_remaining_team() {
    let server = TestServer::start().await;
    let (mut ana, mut bo, room_id) = seated_pair(&server).await;
    start_round(&mut ana, &mut bo).await;

    bo.close(None).await.unwrap();

    match recv_until(&mut ana, |e| !matches!(e, ServerEvent::Tick { .. })).await {
        ServerEvent::GameEnded {
            rounds_won,
            outcome,
            forfeited,
            ..
        } => {
            assert!(rounds_won.yellow >= 3);
            assert_eq!(outcome, Outcome::Winner(Team::Yellow));
            assert!(forfeited);
        }
        other => panic!("expected game-ended, got {other:?}"),
    }
    match recv(&mut ana).await {
        ServerEvent::PlayerLeft { roster } => assert_eq!(roster.len(), 1),
        other => panic!("expected player-left, got {other:?}"),
    }
    assert!(server.registry.handle(room_id).await.is_some());
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_room_is_destroyed_when_everyone_leaves() {
    let server = TestServer::start().await;
    let (mut ana, mut bo, _) = seated_pair(&server).await;

    ana.close(None).await.unwrap();
    bo.close(None).await.unwrap();

    let mut rooms = usize::MAX;
    for _ in 0..50 {
        rooms = server.registry.room_count().await;
        if rooms == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(rooms, 0);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_shuts_rooms_down() {
    let server = TestServer::start().await;
    let (_ana, _bo, room_id) = seated_pair(&server).await;
    let handle = server.registry.handle(room_id).await.unwrap();
    let registry = Arc::clone(&server.registry);

    server.stop().await.unwrap();

    assert_eq!(registry.room_count().await, 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(handle.is_closed());
}
