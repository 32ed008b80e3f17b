//! Lifecycle of one chat socket, from upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::services::chat_events::ChatEvent;
use crate::presentation::http::auth::{AuthenticatedUser, bearer_from_headers, unauthorized};
use crate::presentation::ws::connection::ClientConnection;
use crate::presentation::ws::gateway::ChatGateway;
use crate::presentation::ws::protocol::ServerEvent;

/// Interval between server-initiated Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong before considering the client dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on a single frame write to a client that stopped reading.
const SEND_TIMEOUT: Duration = PONG_TIMEOUT;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

/// Authenticates before upgrading; browsers cannot set headers on a socket, so
/// `?token=` is accepted as well.
pub async fn ws_handler(
    State(gateway): State<Arc<ChatGateway>>,
    Query(params): Query<WsAuthQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let bearer = bearer_from_headers(&headers)
        .map(str::to_string)
        .or(params.token);

    match gateway.authenticate(bearer.as_deref()).await {
        Ok(AuthenticatedUser(user_id)) => {
            ws.on_upgrade(move |socket| run_ws_session(socket, gateway, user_id))
        }
        Err(e) => {
            warn!(error = %e, "websocket upgrade refused");
            unauthorized(&e)
        }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "failed to encode server event");
            None
        }
    }
}

/// Writes one frame, giving up after `deadline`. Returns false when the client is gone.
async fn send_frame<S>(sink: &mut S, frame: Message, deadline: Duration) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    match tokio::time::timeout(deadline, sink.send(frame)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "websocket write failed");
            false
        }
        Err(_) => {
            warn!("client stopped reading for {:?}, disconnecting", deadline);
            false
        }
    }
}

#[instrument(skip_all, fields(user_id = %user_id))]
pub async fn run_ws_session(ws: WebSocket, gateway: Arc<ChatGateway>, user_id: Uuid) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (events_tx, mut events_rx) = mpsc::channel::<ChatEvent>(gateway.outbound_buffer());
    let connection = Arc::new(ClientConnection::new(user_id, events_tx));
    let connection_id = connection.id();
    info!(%connection_id, "client connected");

    if let Some(json) = encode(&ServerEvent::Connected { connection_id }) {
        if !send_frame(&mut ws_tx, Message::Text(json.into()), SEND_TIMEOUT).await {
            info!(%connection_id, "client gone before handshake completed");
            return;
        }
    }

    let outbound_conn = connection.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    let Some(event) = event else { break };
                    let Some(json) = encode(&ServerEvent::from(event)) else { continue };
                    if !send_frame(&mut ws_tx, Message::Text(json.into()), SEND_TIMEOUT).await {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > PONG_TIMEOUT
                    {
                        warn!("client unresponsive for {:?}, disconnecting", PONG_TIMEOUT);
                        let _ = send_frame(&mut ws_tx, Message::Close(None), SEND_TIMEOUT).await;
                        break;
                    }
                    if !send_frame(&mut ws_tx, Message::Ping(Vec::new().into()), SEND_TIMEOUT).await {
                        break;
                    }
                }
            }
        }
    });

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            _ = &mut outbound => break,
        };
        let Some(Ok(msg)) = msg else { break };

        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_string()),
                Err(_) => {
                    debug!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!(%connection_id, "client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };
        connection.mark_alive();
        gateway.handle_text(&connection, &text).await;
    }

    // In-flight turns keep running; their events are discarded once the queue closes.
    info!(%connection_id, "client disconnected");
    outbound.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    #[test]
    fn test_connected_event_shape() {
        let connection_id = Uuid::new_v4();
        let json = encode(&ServerEvent::Connected { connection_id }).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "WsConnected");
        assert_eq!(value["connection_id"], connection_id.to_string());
    }

    #[test]
    fn test_pong_timeout_outlasts_ping_interval() {
        assert!(PONG_TIMEOUT > PING_INTERVAL);
        assert!(SEND_TIMEOUT <= PONG_TIMEOUT);
    }

    /// A socket whose peer never drains its receive window.
    struct StalledSink;

    impl Sink<Message> for StalledSink {
        type Error = axum::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_stalled_client_write_gives_up() {
        let mut sink = StalledSink;

        let started = std::time::Instant::now();
        let sent = send_frame(
            &mut sink,
            Message::Ping(Vec::new().into()),
            Duration::from_millis(50),
        )
        .await;

        assert!(!sent);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_writable_client_receives_frame() {
        let (mut tx, mut rx) = futures::channel::mpsc::unbounded::<Message>();

        let sent = send_frame(&mut tx, Message::Text("hi".into()), Duration::from_millis(50)).await;

        assert!(sent);
        assert!(matches!(rx.next().await, Some(Message::Text(t)) if t.as_str() == "hi"));
    }
}
