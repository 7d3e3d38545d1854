//! Client behavior over the in-memory transport.
//!
//! The [`MemoryPeer`] plays the server, which lets each test decide exactly
//! when and in what order replies and pushes arrive.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use rallypoint::prelude::*;
use rallypoint::protocol::{Codec, Envelope, Message, ProtobufCodec};
use rallypoint::DispatchError;
use rallypoint_transport::{MemoryConnection, MemoryPeer};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn connect() -> (Client<MemoryConnection>, MemoryPeer) {
    connect_with(ClientBuilder::new())
}

fn connect_with(builder: ClientBuilder) -> (Client<MemoryConnection>, MemoryPeer) {
    let (conn, peer) = MemoryConnection::pair();
    (builder.connect_with(conn), peer)
}

/// Waits for the next request the client sent.
async fn next_request(peer: &mut MemoryPeer) -> Envelope {
    let frame = tokio::time::timeout(Duration::from_secs(2), peer.recv())
        .await
        .expect("client should send a request")
        .expect("connection should be open");
    ProtobufCodec.decode(&frame).expect("request should decode")
}

/// Asserts the client sends nothing for a little while.
async fn assert_nothing_sent(peer: &mut MemoryPeer) {
    let sent = tokio::time::timeout(Duration::from_millis(50), peer.recv()).await;
    assert!(sent.is_err(), "nothing should reach the server");
}

fn respond(peer: &MemoryPeer, cid: &str, message: Option<Message>) {
    let envelope = Envelope {
        cid: cid.to_string(),
        message,
    };
    assert!(peer.send(ProtobufCodec.encode(&envelope).unwrap()));
}

fn push(peer: &MemoryPeer, message: Message) {
    respond(peer, "", Some(message));
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_concurrent_rpcs_answered_in_reverse_get_their_own_replies() {
    let (client, mut peer) = connect();

    let mut calls = Vec::new();
    for i in 0..8 {
        let client = client.clone();
        calls.push(tokio::spawn(async move {
            let payload = format!("call-{i}");
            client.rpc("echo", Some(payload.as_str())).await
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(next_request(&mut peer).await);
    }

    for envelope in requests.into_iter().rev() {
        let Some(Message::Rpc(rpc)) = envelope.message else {
            panic!("expected rpc request, got {:?}", envelope.message);
        };
        let reply = Rpc {
            payload: format!("echo:{}", rpc.payload),
            ..rpc
        };
        respond(&peer, &envelope.cid, Some(Message::Rpc(reply)));
    }

    for (i, call) in calls.into_iter().enumerate() {
        let rpc = call.await.unwrap().unwrap();
        assert_eq!(rpc.payload, format!("echo:call-{i}"));
    }
}

#[tokio::test]
async fn test_second_request_answered_first() {
    let (client, mut peer) = connect();

    let creating = {
        let client = client.clone();
        tokio::spawn(async move { client.create_match().await })
    };
    let create = next_request(&mut peer).await;
    assert_eq!(create.cid, "0");
    assert!(matches!(create.message, Some(Message::MatchCreate(_))));

    let joining = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .join_channel("lobby", ChannelType::Room, true, false)
                .await
        })
    };
    let join = next_request(&mut peer).await;
    assert_eq!(join.cid, "1");
    match join.message {
        Some(Message::ChannelJoin(ref req)) => {
            assert_eq!(req.target, "lobby");
            assert_eq!(req.kind, ChannelType::Room as i32);
            assert_eq!(req.persistence, Some(true));
            assert_eq!(req.hidden, Some(false));
        }
        ref other => panic!("expected channel_join, got {other:?}"),
    }

    respond(
        &peer,
        "1",
        Some(Message::Channel(Channel {
            id: "2...lobby".into(),
            room_name: "lobby".into(),
            ..Channel::default()
        })),
    );
    let channel = joining.await.unwrap().unwrap();
    assert_eq!(channel.room_name, "lobby");
    assert!(!creating.is_finished());

    respond(
        &peer,
        "0",
        Some(Message::Match(Match {
            match_id: "m-1".into(),
            size: 1,
            ..Match::default()
        })),
    );
    let created = creating.await.unwrap().unwrap();
    assert_eq!(created.match_id, "m-1");
}

#[tokio::test]
async fn test_empty_reply_completes_fire_and_forget_operations() {
    let (client, mut peer) = connect();

    let leaving = {
        let client = client.clone();
        tokio::spawn(async move { client.leave_match("m-1").await })
    };
    let request = next_request(&mut peer).await;
    assert!(matches!(request.message, Some(Message::MatchLeave(ref m)) if m.match_id == "m-1"));

    respond(&peer, &request.cid, None);
    leaving.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_server_error_reply_surfaces_as_server_error() {
    let (client, mut peer) = connect();

    let joining = {
        let client = client.clone();
        tokio::spawn(async move { client.join_match("missing").await })
    };
    let request = next_request(&mut peer).await;
    respond(
        &peer,
        &request.cid,
        Some(Message::Error(ServerError {
            code: 4,
            message: "match not found".into(),
            ..ServerError::default()
        })),
    );

    match joining.await.unwrap() {
        Err(ClientError::Server(err)) => {
            assert_eq!(err.code, 4);
            assert_eq!(err.message, "match not found");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_reply_shape_is_reported_once() {
    let (client, mut peer) = connect();

    let creating = {
        let client = client.clone();
        tokio::spawn(async move { client.create_match().await })
    };
    let request = next_request(&mut peer).await;
    respond(&peer, &request.cid, Some(Message::Status(Status::default())));

    match creating.await.unwrap() {
        Err(ClientError::Dispatch(DispatchError::UnexpectedReply { got, .. })) => {
            assert_eq!(got, "status");
        }
        other => panic!("expected unexpected-reply error, got {other:?}"),
    }

    // A duplicate of the same response is dropped by the receive loop.
    respond(&peer, &request.cid, Some(Message::Match(Match::default())));
    assert_eq!(client.state(), ConnectionState::Open);
}

#[tokio::test]
async fn test_join_match_by_token_sends_token_target() {
    let (client, mut peer) = connect();

    let joining = {
        let client = client.clone();
        tokio::spawn(async move { client.join_match_by_token("mm-token").await })
    };
    let request = next_request(&mut peer).await;
    match request.message {
        Some(Message::MatchJoin(ref join)) => {
            assert_eq!(
                join.target,
                Some(rallypoint::protocol::MatchTarget::Token("mm-token".into()))
            );
        }
        ref other => panic!("expected match_join, got {other:?}"),
    }
    respond(&peer, &request.cid, Some(Message::Match(Match::default())));
    joining.await.unwrap().unwrap();
}

// ---------------------------------------------------------------------------
// Malformed input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_malformed_frames_are_skipped() {
    let (client, mut peer) = connect();
    let mut data = client.subscribe::<MatchData>().await.unwrap();

    let sending = {
        let client = client.clone();
        tokio::spawn(async move { client.send_match_data("m-1", 7, &[1, 2, 3]).await })
    };
    let request = next_request(&mut peer).await;
    match request.message {
        Some(Message::MatchDataSend(ref send)) => {
            assert_eq!(send.op_code, 7);
            assert_eq!(send.data, vec![1, 2, 3]);
        }
        ref other => panic!("expected match_data_send, got {other:?}"),
    }

    push(
        &peer,
        Message::MatchData(rallypoint::protocol::MatchData {
            match_id: "m-1".into(),
            op_code: 6,
            ..Default::default()
        }),
    );
    assert_eq!(data.next().await.unwrap().op_code, 6);

    // Garbage, a response for a ticket never issued, and a stray error all
    // get dropped without disturbing the connection.
    assert!(peer.send(vec![0xff, 0xff, 0xff, 0x01]));
    respond(&peer, "99", None);
    push(&peer, Message::Error(ServerError::default()));

    push(
        &peer,
        Message::MatchData(rallypoint::protocol::MatchData {
            match_id: "m-1".into(),
            op_code: 8,
            ..Default::default()
        }),
    );
    respond(&peer, &request.cid, None);

    sending.await.unwrap().unwrap();
    assert_eq!(data.next().await.unwrap().op_code, 8);
    assert_eq!(client.state(), ConnectionState::Open);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_matchmaker_validation_happens_before_sending() {
    let (client, mut peer) = connect();

    let err = client.add_matchmaker(MatchmakerRequest::new(1)).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));

    let err = client
        .add_matchmaker(MatchmakerRequest::new(2).max_count(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_nothing_sent(&mut peer).await;

    let adding = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .add_matchmaker(MatchmakerRequest::new(2).max_count(4))
                .await
        })
    };
    let request = next_request(&mut peer).await;
    // Rejected requests never consumed an id.
    assert_eq!(request.cid, "0");
    match request.message {
        Some(Message::MatchmakerAdd(ref add)) => {
            assert_eq!((add.min_count, add.max_count), (2, 4));
            assert_eq!(add.query, "*");
        }
        ref other => panic!("expected matchmaker_add, got {other:?}"),
    }
    respond(
        &peer,
        &request.cid,
        Some(Message::MatchmakerTicket(MatchmakerTicket {
            ticket: "t-1".into(),
        })),
    );
    assert_eq!(adding.await.unwrap().unwrap().ticket, "t-1");
}

#[tokio::test]
async fn test_argument_checks_reject_empty_inputs() {
    let (client, mut peer) = connect();

    assert!(matches!(
        client.rpc("", None).await,
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.follow_users(&[], &[]).await,
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.join_channel("", ChannelType::Group, false, false).await,
        Err(ClientError::InvalidArgument(_))
    ));
    assert!(matches!(
        client.join_channel("lobby", ChannelType::Unspecified, false, false).await,
        Err(ClientError::InvalidArgument(_))
    ));
    assert_nothing_sent(&mut peer).await;
}

#[tokio::test]
async fn test_channel_message_content_is_json_text() {
    let (client, mut peer) = connect();

    let sending = {
        let client = client.clone();
        tokio::spawn(async move {
            let content = HashMap::from([("text".to_string(), "gg".to_string())]);
            client.send_channel_message("chan-1", &content).await
        })
    };
    let request = next_request(&mut peer).await;
    match request.message {
        Some(Message::ChannelMessageSend(ref send)) => {
            assert_eq!(send.channel_id, "chan-1");
            let content: serde_json::Value = serde_json::from_str(&send.content).unwrap();
            assert_eq!(content, serde_json::json!({"text": "gg"}));
        }
        ref other => panic!("expected channel_message_send, got {other:?}"),
    }
    respond(
        &peer,
        &request.cid,
        Some(Message::ChannelMessageAck(ChannelMessageAck {
            channel_id: "chan-1".into(),
            message_id: "msg-1".into(),
            ..ChannelMessageAck::default()
        })),
    );
    assert_eq!(sending.await.unwrap().unwrap().message_id, "msg-1");
}

#[tokio::test]
async fn test_chat_and_status_requests_carry_their_arguments() {
    let (client, mut peer) = connect();

    let running = {
        let client = client.clone();
        tokio::spawn(async move {
            client.unfollow_users(&["u-1", "u-2"]).await?;
            let content = HashMap::from([("text".to_string(), "edited".to_string())]);
            let updated = client.update_channel_message("chan-1", "msg-1", &content).await?;
            let removed = client.remove_channel_message("chan-1", "msg-1").await?;
            client.leave_channel("chan-1").await?;
            Ok::<_, ClientError>((updated, removed))
        })
    };

    let request = next_request(&mut peer).await;
    match request.message {
        Some(Message::StatusUnfollow(ref unfollow)) => {
            assert_eq!(unfollow.user_ids, ["u-1", "u-2"]);
        }
        ref other => panic!("expected status_unfollow, got {other:?}"),
    }
    respond(&peer, &request.cid, None);

    let request = next_request(&mut peer).await;
    match request.message {
        Some(Message::ChannelMessageUpdate(ref update)) => {
            assert_eq!(update.message_id, "msg-1");
            assert_eq!(update.content, r#"{"text":"edited"}"#);
        }
        ref other => panic!("expected channel_message_update, got {other:?}"),
    }
    let ack = ChannelMessageAck {
        channel_id: "chan-1".into(),
        message_id: "msg-1".into(),
        ..ChannelMessageAck::default()
    };
    respond(&peer, &request.cid, Some(Message::ChannelMessageAck(ack.clone())));

    let request = next_request(&mut peer).await;
    assert!(matches!(
        request.message,
        Some(Message::ChannelMessageRemove(ref remove)) if remove.message_id == "msg-1"
    ));
    respond(&peer, &request.cid, Some(Message::ChannelMessageAck(ack.clone())));

    let request = next_request(&mut peer).await;
    assert!(matches!(
        request.message,
        Some(Message::ChannelLeave(ref leave)) if leave.channel_id == "chan-1"
    ));
    assert_eq!(request.cid, "3");
    respond(&peer, &request.cid, None);

    let (updated, removed) = running.await.unwrap().unwrap();
    assert_eq!(updated, ack);
    assert_eq!(removed, ack);
}

// ---------------------------------------------------------------------------
// Push events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_pushes_reach_only_subscribers_of_their_kind() {
    let (client, peer) = connect();
    let mut presence = client.subscribe::<MatchPresenceEvent>().await.unwrap();
    let mut notes = client.subscribe::<Notifications>().await.unwrap();

    push(
        &peer,
        Message::MatchPresenceEvent(MatchPresenceEvent {
            match_id: "m-1".into(),
            ..MatchPresenceEvent::default()
        }),
    );
    push(&peer, Message::Notifications(Notifications::default()));
    push(
        &peer,
        Message::MatchPresenceEvent(MatchPresenceEvent {
            match_id: "m-2".into(),
            ..MatchPresenceEvent::default()
        }),
    );

    assert_eq!(presence.next().await.unwrap().match_id, "m-1");
    assert_eq!(presence.next().await.unwrap().match_id, "m-2");
    assert!(notes.next().await.unwrap().notifications.is_empty());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_close_fails_pending_requests_and_ends_streams() {
    let disconnects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disconnects);
    let (client, mut peer) = connect_with(ClientBuilder::new().on_disconnect(move |reason| {
        assert_eq!(reason, CloseReason::Normal);
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let mut events = client.subscribe::<ChannelMessage>().await.unwrap();
    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.create_match().await })
    };
    next_request(&mut peer).await;

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(matches!(pending.await.unwrap(), Err(ClientError::NotConnected)));
    assert!(events.next().await.is_none());
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);

    // Closing again is a no-op and the hook does not run twice.
    client.close().await;
    assert_eq!(client.closed().await, CloseReason::Normal);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);

    assert!(matches!(client.create_match().await, Err(ClientError::NotConnected)));
    assert!(matches!(
        client.subscribe::<MatchData>().await,
        Err(ClientError::NotConnected)
    ));
    // The socket itself was closed.
    assert!(peer.recv().await.is_none());
}

#[tokio::test]
async fn test_concurrent_close_calls_share_teardown() {
    let disconnects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disconnects);
    let (client, _peer) = connect_with(ClientBuilder::new().on_disconnect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let a = client.clone();
    let b = client.clone();
    tokio::join!(a.close(), b.close(), client.close());

    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_panicking_disconnect_hook_still_finishes_close() {
    let (client, _peer) = connect_with(
        ClientBuilder::new().on_disconnect(|_| panic!("disconnect hook failed")),
    );

    tokio::time::timeout(Duration::from_secs(1), client.close())
        .await
        .expect("close should complete");
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.closed().await, CloseReason::Normal);
}

#[tokio::test]
async fn test_server_close_is_reported_as_remote() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let (client, peer) = connect_with(ClientBuilder::new().on_disconnect(move |reason| {
        let _ = tx.send(reason);
    }));

    drop(peer);

    assert_eq!(client.closed().await, CloseReason::Remote);
    assert_eq!(rx.await.unwrap(), CloseReason::Remote);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_socket_failure_is_reported_as_transport() {
    let (client, mut peer) = connect();

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.update_status(Some("online")).await })
    };
    let request = next_request(&mut peer).await;
    assert!(matches!(
        request.message,
        Some(Message::StatusUpdate(ref update)) if update.status.as_deref() == Some("online")
    ));

    peer.fail("connection reset by peer");

    match client.closed().await {
        CloseReason::Transport(reason) => assert!(reason.contains("connection reset")),
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert!(matches!(pending.await.unwrap(), Err(ClientError::NotConnected)));
}

#[tokio::test]
async fn test_dropping_every_handle_closes_the_socket() {
    let (client, mut peer) = connect();
    let other = client.clone();
    drop(client);
    drop(other);

    let closed = tokio::time::timeout(Duration::from_secs(2), peer.recv()).await;
    assert_eq!(closed.expect("socket should close"), None);
}

#[tokio::test]
async fn test_request_timeout_abandons_ticket() {
    let (client, mut peer) =
        connect_with(ClientBuilder::new().request_timeout(Duration::from_millis(50)));

    let slow = {
        let client = client.clone();
        tokio::spawn(async move { client.rpc("slow", None).await })
    };
    let first = next_request(&mut peer).await;
    assert!(matches!(slow.await.unwrap(), Err(ClientError::Timeout(_))));

    // The late reply is dropped; the connection keeps working.
    respond(&peer, &first.cid, Some(Message::Rpc(Rpc::default())));

    let next = {
        let client = client.clone();
        tokio::spawn(async move { client.remove_matchmaker("t-1").await })
    };
    let second = next_request(&mut peer).await;
    assert_eq!(second.cid, "1");
    respond(&peer, &second.cid, None);
    next.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cancelled_requests_release_their_tickets() {
    let (client, mut peer) = connect();

    for _ in 0..5 {
        let call = tokio::time::timeout(Duration::from_millis(10), client.create_match());
        let (cancelled, _) = tokio::join!(call, next_request(&mut peer));
        assert!(cancelled.is_err());
    }
    assert_eq!(client.pending_requests().await, 0);

    // A reply to a cancelled call is dropped; the connection keeps working.
    respond(&peer, "4", Some(Message::Match(Match::default())));
    let next = {
        let client = client.clone();
        tokio::spawn(async move { client.leave_match("m-1").await })
    };
    let request = next_request(&mut peer).await;
    assert_eq!(request.cid, "5");
    respond(&peer, &request.cid, None);
    next.await.unwrap().unwrap();
    assert_eq!(client.pending_requests().await, 0);
}

#[tokio::test]
async fn test_keep_alive_pings_while_idle() {
    let (_client, peer) =
        connect_with(ClientBuilder::new().keep_alive(Duration::from_millis(100)));

    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(peer.pings() >= 2, "expected pings, got {}", peer.pings());
}
