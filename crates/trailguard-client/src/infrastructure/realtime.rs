//! WebSocket client for the per-project realtime feed.
//!
//! [`connect`] opens `ws(s)://<host>/api/ws/projects/{id}` with
//! tokio-tungstenite and turns the socket into a stream of parsed
//! [`ProjectEvent`]s, ready to hand to
//! [`LiveUpdates::start`](crate::application::live_updates::LiveUpdates::start).
//!
//! Frame handling:
//!
//! - **Text** frames are parsed as JSON events.  A frame that is not a valid
//!   event is logged and skipped; one bad message does not end the feed.
//! - **Ping/Pong/Binary** frames carry no events and are skipped.
//! - A **Close** frame ends the stream.
//! - A socket error is yielded once as [`RealtimeError::Socket`].

use futures_util::future;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use thiserror::Error;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, warn};
use trailguard_core::domain::realtime::ProjectEvent;
use trailguard_core::protocol::endpoints;

/// Errors raised while opening or reading the realtime socket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// The API base URL does not use an `http`, `https`, `ws`, or `wss` scheme.
    #[error("cannot derive a WebSocket URL from '{0}'")]
    InvalidUrl(String),

    #[error("WebSocket error: {0}")]
    Socket(String),
}

/// Parsed realtime events for one project.
pub type EventStream = BoxStream<'static, Result<ProjectEvent, RealtimeError>>;

/// Maps the REST base URL onto the realtime endpoint of `project_id`.
///
/// `http` becomes `ws` and `https` becomes `wss`.
///
/// # Errors
///
/// Returns [`RealtimeError::InvalidUrl`] for any other scheme.
pub fn websocket_url(base_url: &str, project_id: &str) -> Result<String, RealtimeError> {
    let base = base_url.trim_end_matches('/');
    let socket_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(RealtimeError::InvalidUrl(base_url.to_string()));
    };
    Ok(format!(
        "{socket_base}{}",
        endpoints::live_updates_path(project_id)
    ))
}

/// Connects to the realtime feed of `project_id`.
///
/// # Errors
///
/// Returns [`RealtimeError`] when the URL is invalid or the handshake fails.
pub async fn connect(base_url: &str, project_id: &str) -> Result<EventStream, RealtimeError> {
    let url = websocket_url(base_url, project_id)?;
    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| RealtimeError::Socket(e.to_string()))?;
    info!("realtime feed open at {url}");
    Ok(events(socket).boxed())
}

/// Converts raw WebSocket frames into project events.
pub fn events<S>(frames: S) -> impl Stream<Item = Result<ProjectEvent, RealtimeError>>
where
    S: Stream<Item = Result<WsMessage, WsError>>,
{
    frames
        .take_while(|frame| future::ready(!matches!(frame, Ok(WsMessage::Close(_)))))
        .filter_map(|frame| future::ready(decode_frame(frame)))
}

fn decode_frame(frame: Result<WsMessage, WsError>) -> Option<Result<ProjectEvent, RealtimeError>> {
    match frame {
        Ok(WsMessage::Text(text)) => match ProjectEvent::parse(&text) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("invalid realtime message skipped: {e}");
                None
            }
        },
        Ok(WsMessage::Binary(_)) => {
            warn!("unexpected binary WebSocket frame (ignored)");
            None
        }
        Ok(other) => {
            debug!("control frame ignored: {other:?}");
            None
        }
        Err(e) => Some(Err(RealtimeError::Socket(e.to_string()))),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn text(s: &str) -> Result<WsMessage, WsError> {
        Ok(WsMessage::Text(s.to_string()))
    }

    #[test]
    fn test_http_schemes_map_to_websocket_schemes() {
        assert_eq!(
            websocket_url("http://localhost:8000/", "p1").unwrap(),
            "ws://localhost:8000/api/ws/projects/p1"
        );
        assert_eq!(
            websocket_url("https://api.trailguard.example", "p 2").unwrap(),
            "wss://api.trailguard.example/api/ws/projects/p%202"
        );
    }

    #[test]
    fn test_unsupported_scheme_is_rejected() {
        assert_eq!(
            websocket_url("ftp://host", "p1"),
            Err(RealtimeError::InvalidUrl("ftp://host".to_string()))
        );
    }

    #[tokio::test]
    async fn test_events_skip_control_and_invalid_frames_and_stop_at_close() {
        // Arrange
        let frames = stream::iter(vec![
            text(r#"{"type":"connected","project_id":"p1"}"#),
            Ok(WsMessage::Ping(vec![1])),
            text("not json"),
            Ok(WsMessage::Binary(vec![0, 1])),
            text(r#"{"type":"image_processed","image_id":"i1"}"#),
            Ok(WsMessage::Close(None)),
            text(r#"{"type":"after_close"}"#),
        ]);

        // Act
        let kinds: Vec<String> = events(frames)
            .map(|event| event.map(|e| e.kind).unwrap_or_default())
            .collect()
            .await;

        // Assert
        assert_eq!(kinds, vec!["connected", "image_processed"]);
    }

    #[tokio::test]
    async fn test_socket_error_is_surfaced() {
        let frames = stream::iter(vec![Err(WsError::ConnectionClosed)]);

        let collected: Vec<_> = events(frames).collect().await;

        assert_eq!(collected.len(), 1);
        assert!(matches!(collected[0], Err(RealtimeError::Socket(_))));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails_with_socket_error() {
        let result = connect("http://127.0.0.1:1", "p1").await;
        assert!(matches!(result, Err(RealtimeError::Socket(_))));
    }
}
