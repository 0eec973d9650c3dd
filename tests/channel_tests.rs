// Integration tests for the duplex channel state machine, against a local
// websocket listener. Backoff delays are shrunk through the channel config;
// the production schedule itself is unit-tested next to the config.

use futures::{SinkExt, StreamExt};
use lecture_bridge::channel::{ChannelConfig, ChannelState, TranscriptChannel};
use lecture_bridge::session::{SourceEvent, TranscriptSource};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

fn test_config(addr: SocketAddr) -> ChannelConfig {
    ChannelConfig {
        url: format!("ws://{}", addr),
        max_reconnect_attempts: 3,
        reconnect_base_delay: Duration::from_millis(5),
    }
}

async fn next_event(events: &mut tokio::sync::mpsc::Receiver<SourceEvent>) -> SourceEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream ended")
}

/// Wait for a specific state transition, ignoring everything else.
async fn wait_for_state(
    events: &mut tokio::sync::mpsc::Receiver<SourceEvent>,
    wanted: ChannelState,
) {
    loop {
        if let SourceEvent::State(state) = next_event(events).await {
            if state == wanted {
                return;
            }
        }
    }
}

#[tokio::test]
async fn forwards_parsed_events_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            r#"{"text":"partial res","is_final":false,"confidence":0.5}"#.to_string(),
        ))
        .await
        .unwrap();
        // Malformed payloads must be dropped without disturbing the stream.
        ws.send(Message::Text("garbage".to_string())).await.unwrap();
        ws.send(Message::Text(
            r#"{"text":"final result","is_final":true,"confidence":0.9}"#.to_string(),
        ))
        .await
        .unwrap();
    });

    let mut channel = TranscriptChannel::new(test_config(addr));
    let mut events = channel.start().await.unwrap();

    assert_eq!(next_event(&mut events).await, SourceEvent::State(ChannelState::Connecting));
    assert_eq!(next_event(&mut events).await, SourceEvent::State(ChannelState::Connected));

    let first = next_event(&mut events).await;
    match first {
        SourceEvent::Transcript(ev) => {
            assert_eq!(ev.text, "partial res");
            assert!(!ev.is_final);
        }
        other => panic!("expected transcript event, got {:?}", other),
    }
    let second = next_event(&mut events).await;
    match second {
        SourceEvent::Transcript(ev) => {
            assert_eq!(ev.text, "final result");
            assert!(ev.is_final);
        }
        other => panic!("expected transcript event, got {:?}", other),
    }

    channel.stop().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn reconnects_after_involuntary_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // Drop the first connection right after the handshake, then accept
        // the reconnect and keep it open.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(ws);
    });

    let mut channel = TranscriptChannel::new(test_config(addr));
    let mut events = channel.start().await.unwrap();

    wait_for_state(&mut events, ChannelState::Connected).await;
    wait_for_state(&mut events, ChannelState::Disconnected).await;
    wait_for_state(&mut events, ChannelState::Connecting).await;
    wait_for_state(&mut events, ChannelState::Connected).await;

    channel.stop().await.unwrap();
    assert_eq!(*channel.state_watch().borrow(), ChannelState::Idle);
    server.abort();
}

#[tokio::test]
async fn exhausted_retries_settle_in_error() {
    // Bind to learn a free port, then close it so every attempt is refused.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut channel = TranscriptChannel::new(test_config(addr));
    let mut events = channel.start().await.unwrap();

    let mut connecting = 0;
    let mut disconnected = 0;
    loop {
        match next_event(&mut events).await {
            SourceEvent::State(ChannelState::Connecting) => connecting += 1,
            SourceEvent::State(ChannelState::Disconnected) => disconnected += 1,
            SourceEvent::State(ChannelState::Error) => break,
            other => panic!("unexpected event {:?}", other),
        }
    }

    // One initial attempt plus exactly three reconnects.
    assert_eq!(connecting, 4);
    assert_eq!(disconnected, 4);
    assert_eq!(*channel.state_watch().borrow(), ChannelState::Error);

    // Terminal: the stream ends with no further attempts.
    assert!(timeout(Duration::from_millis(200), events.recv())
        .await
        .expect("stream should close")
        .is_none());
}

#[tokio::test]
async fn caller_disconnect_suppresses_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Hold the connection until the client closes it, then watch for
        // any reconnect attempt.
        while let Some(msg) = ws.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
        timeout(Duration::from_millis(300), listener.accept()).await
    });

    let mut channel = TranscriptChannel::new(test_config(addr));
    let mut events = channel.start().await.unwrap();
    wait_for_state(&mut events, ChannelState::Connected).await;

    channel.stop().await.unwrap();
    assert_eq!(*channel.state_watch().borrow(), ChannelState::Idle);

    // No reconnect must reach the listener after a caller-initiated close.
    let reconnect = server.await.unwrap();
    assert!(reconnect.is_err(), "unexpected reconnect after disconnect");
}

#[tokio::test]
async fn disconnect_during_backoff_cancels_the_timer() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut channel = TranscriptChannel::new(ChannelConfig {
        url: format!("ws://{}", addr),
        max_reconnect_attempts: 3,
        reconnect_base_delay: Duration::from_millis(500),
    });
    let mut events = channel.start().await.unwrap();

    wait_for_state(&mut events, ChannelState::Disconnected).await;
    // The channel is now waiting out the backoff; a caller disconnect must
    // win that race and settle in idle, not connecting.
    channel.stop().await.unwrap();
    assert_eq!(*channel.state_watch().borrow(), ChannelState::Idle);
}

#[tokio::test]
async fn frames_flow_only_while_connected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Binary(bytes) = msg {
                return bytes;
            }
        }
        panic!("no binary frame received");
    });

    let mut channel = TranscriptChannel::new(test_config(addr));
    let sink = channel.frame_sink();

    // Not connected yet: dropped silently.
    sink.send(vec![9, 9, 9]);

    let mut events = channel.start().await.unwrap();
    wait_for_state(&mut events, ChannelState::Connected).await;

    sink.send(vec![1, 2, 3, 4]);
    let received = timeout(Duration::from_secs(5), server)
        .await
        .expect("timed out waiting for frame")
        .unwrap();
    assert_eq!(received, vec![1, 2, 3, 4]);

    channel.stop().await.unwrap();
}
