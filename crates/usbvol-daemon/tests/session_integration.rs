//! Integration tests for the HQPlayer control session.
//!
//! # Purpose
//!
//! These tests run [`HqpSession`] against a throwaway `TcpListener` on
//! `127.0.0.1` that plays the part of HQPlayer.  They verify:
//!
//! - Connecting reports [`SessionEvent::Connected`] and requests arrive as
//!   newline-terminated XML.
//! - `VolumeRange` and `State` responses come back as typed events.
//! - A line that is not valid UTF-8 is decoded lossily instead of closing
//!   the connection.
//! - A refused connection and a peer hang-up both surface as
//!   [`SessionEvent::Error`], and the session can connect again afterwards.
//!
//! Every wait is wrapped in a timeout so a broken session fails the test
//! instead of hanging it.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time;
use usbvol_daemon::application::control_volume::{RemoteSession, SessionEvent};
use usbvol_daemon::infrastructure::remote::{HqpSession, DEFAULT_CONNECT_TIMEOUT};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

async fn read_line(lines: &mut tokio::io::Lines<BufReader<TcpStream>>) -> String {
    time::timeout(WAIT, lines.next_line())
        .await
        .expect("timed out waiting for request")
        .expect("read failed")
        .expect("session closed the connection")
}

/// Binds a listener, connects the session to it, and returns both ends.
async fn connected_pair() -> (
    HqpSession,
    mpsc::Receiver<SessionEvent>,
    TcpStream,
    TcpListener,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (session, mut rx) = HqpSession::spawn(DEFAULT_CONNECT_TIMEOUT);

    session.connect("127.0.0.1", port);
    let (socket, _) = time::timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    assert_eq!(next_event(&mut rx).await, SessionEvent::Connected);

    (session, rx, socket, listener)
}

// ── Requests ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_requests_are_sent_in_order_as_xml_lines() {
    // Arrange
    let (session, _rx, socket, _listener) = connected_pair().await;
    let mut lines = BufReader::new(socket).lines();

    // Act
    session.query_range();
    session.query_state();
    session.set_volume(-20.0);

    // Assert
    let decl = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
    assert_eq!(read_line(&mut lines).await, format!("{decl}<VolumeRange/>"));
    assert_eq!(read_line(&mut lines).await, format!("{decl}<State/>"));
    assert_eq!(read_line(&mut lines).await, format!("{decl}<Volume value=\"-20\"/>"));
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_range_and_state_responses_become_events() {
    // Arrange
    let (_session, mut rx, mut socket, _listener) = connected_pair().await;

    // Act
    socket
        .write_all(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><VolumeRange min=\"-60\" max=\"0\" enabled=\"1\" adaptive=\"1\"/>\n\
              <?xml version=\"1.0\" encoding=\"UTF-8\"?><State state=\"2\" volume=\"-32.5\" rate=\"352800\"/>\n",
        )
        .await
        .unwrap();

    // Assert
    match next_event(&mut rx).await {
        SessionEvent::RangeResponse(range) => {
            assert_eq!(range.min, -60.0);
            assert_eq!(range.max, 0.0);
            assert!(range.enabled);
            assert!(range.adaptive);
        }
        other => panic!("expected RangeResponse, got {other:?}"),
    }
    match next_event(&mut rx).await {
        SessionEvent::StateResponse(state) => {
            assert_eq!(state.volume, -32.5);
            assert_eq!(state.attribute("rate"), Some("352800"));
        }
        other => panic!("expected StateResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_utf8_line_keeps_connection_open() {
    // Arrange: a matrix profile name written in Latin-1
    let (_session, mut rx, mut socket, _listener) = connected_pair().await;

    // Act
    socket
        .write_all(b"<State volume=\"-7\" matrix_profile=\"caf\xe9\"/>\n<State volume=\"-8\"/>\n")
        .await
        .unwrap();

    // Assert: both lines are delivered and no Error is reported
    match next_event(&mut rx).await {
        SessionEvent::StateResponse(state) => {
            assert_eq!(state.volume, -7.0);
            assert_eq!(state.attribute("matrix_profile"), Some("caf\u{fffd}"));
        }
        other => panic!("expected StateResponse, got {other:?}"),
    }
    match next_event(&mut rx).await {
        SessionEvent::StateResponse(state) => assert_eq!(state.volume, -8.0),
        other => panic!("expected StateResponse, got {other:?}"),
    }
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_refused_connection_reports_error() {
    // Arrange: bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let (session, mut rx) = HqpSession::spawn(DEFAULT_CONNECT_TIMEOUT);

    // Act
    session.connect("127.0.0.1", port);

    // Assert
    assert!(matches!(next_event(&mut rx).await, SessionEvent::Error(_)));
}

#[tokio::test]
async fn test_peer_hang_up_reports_error_and_reconnect_works() {
    // Arrange
    let (session, mut rx, socket, listener) = connected_pair().await;
    let port = listener.local_addr().unwrap().port();

    // Act: HQPlayer restarts
    drop(socket);

    // Assert
    assert!(matches!(next_event(&mut rx).await, SessionEvent::Error(_)));

    // Act: commands while disconnected are dropped, then reconnect
    session.set_volume(-50.0);
    session.connect("127.0.0.1", port);
    let (socket, _) = time::timeout(WAIT, listener.accept()).await.unwrap().unwrap();

    // Assert
    assert_eq!(next_event(&mut rx).await, SessionEvent::Connected);
    session.query_state();
    let mut lines = BufReader::new(socket).lines();
    assert!(read_line(&mut lines).await.ends_with("<State/>"));
}
