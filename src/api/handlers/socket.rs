//! Per-connection pumps.
//!
//! Every upgraded socket gets a reader task that turns client actions into
//! registry calls and a writer task that delivers snapshots and keep-alive
//! pings. When either task stops, the other is stopped too and the player's
//! session is torn down.

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::api::models::{ClientAction, PlayerAction};
use crate::api::state::AppState;
use crate::application::{SessionError, SessionRegistry};
use crate::config::ConnectionConfig;
use crate::domain::game::SnapshotReceiver;
use crate::domain::models::{Color, Move, PlayerToken};

type WsSink = SplitSink<WebSocket, Message>;
type WsStream = SplitStream<WebSocket>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),
    #[error("malformed message: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("no pong within {0:?}")]
    ReadTimeout(Duration),
    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),
}

pub async fn game_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.config.connection.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| run_connection(socket, state))
}

/// Drives one player connection until either side gives up.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let token = PlayerToken::generate();
    let (outbound, snapshots) = mpsc::unbounded_channel();
    state.registry.connect(token.clone(), outbound);
    info!(player = %token, "connection established");

    let (sink, stream) = socket.split();
    let limits = state.config.connection.clone();
    let mut writer = tokio::spawn(write_loop(sink, snapshots, limits.clone()));
    let mut reader = tokio::spawn(read_loop(
        stream,
        token.clone(),
        Arc::clone(&state.registry),
        limits,
    ));

    let writer_finished = tokio::select! {
        result = &mut reader => {
            log_exit(&token, "read", result);
            false
        }
        result = &mut writer => {
            reader.abort();
            log_exit(&token, "write", result);
            true
        }
    };

    // Closes the outbound channel of everyone in the session, which makes
    // each writer send a close frame and stop.
    state.registry.disconnect(&token);
    if !writer_finished {
        log_exit(&token, "write", writer.await);
    }
    info!(player = %token, "connection closed");
}

fn log_exit(token: &PlayerToken, side: &str, result: Result<Result<(), ConnectionError>, JoinError>) {
    match result {
        Ok(Ok(())) => debug!(player = %token, side, "loop finished"),
        Ok(Err(ConnectionError::Decode(err))) => {
            warn!(player = %token, %err, "dropping connection after malformed message")
        }
        Ok(Err(err)) => info!(player = %token, side, %err, "loop stopped"),
        Err(err) if err.is_cancelled() => {}
        Err(err) => error!(player = %token, side, %err, "connection task failed"),
    }
}

async fn read_loop(
    mut stream: WsStream,
    token: PlayerToken,
    registry: Arc<SessionRegistry>,
    limits: ConnectionConfig,
) -> Result<(), ConnectionError> {
    let pong_wait = limits.pong_wait();
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let message = match timeout_at(deadline, stream.next()).await {
            Err(_) => return Err(ConnectionError::ReadTimeout(pong_wait)),
            Ok(None) => return Ok(()),
            Ok(Some(message)) => message?,
        };

        match message {
            Message::Text(text) => {
                let action = PlayerAction::parse(text).map_err(ConnectionError::Decode)?;
                dispatch(&registry, &token, action);
            }
            Message::Binary(bytes) => {
                let action = PlayerAction::parse(bytes).map_err(ConnectionError::Decode)?;
                dispatch(&registry, &token, action);
            }
            Message::Pong(_) => deadline = Instant::now() + pong_wait,
            Message::Ping(_) => {}
            Message::Close(frame) => {
                debug!(player = %token, ?frame, "peer closed the connection");
                return Ok(());
            }
        }
    }
}

fn dispatch(registry: &SessionRegistry, token: &PlayerToken, action: ClientAction) {
    let refused = match action {
        ClientAction::StartGame => registry.create_session(token, Color::White).err(),
        ClientAction::JoinGame(session_id) => registry.join_session(token, &session_id).err(),
        ClientAction::Move { from, to } => {
            registry.submit_move(Move {
                mover: token.clone(),
                from,
                to,
            });
            None
        }
    };

    if let Some(err) = refused {
        report_refusal(registry, token, err);
    }
}

fn report_refusal(registry: &SessionRegistry, token: &PlayerToken, err: SessionError) {
    info!(player = %token, %err, "request refused");
    registry.notify(token, &err.to_string());
}

async fn write_loop(
    mut sink: WsSink,
    mut snapshots: SnapshotReceiver,
    limits: ConnectionConfig,
) -> Result<(), ConnectionError> {
    let write_wait = limits.write_wait();
    let ping_period = limits.ping_period();
    let mut ticker = interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            snapshot = snapshots.recv() => match snapshot {
                Some(snapshot) => {
                    let text = serde_json::to_string(&snapshot).map_err(ConnectionError::Encode)?;
                    send_within(&mut sink, Message::Text(text), write_wait).await?;
                }
                None => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "session closed".into(),
                    };
                    // The peer may already be gone.
                    let _ = send_within(&mut sink, Message::Close(Some(frame)), write_wait).await;
                    return Ok(());
                }
            },
            _ = ticker.tick() => {
                send_within(&mut sink, Message::Ping(Vec::new()), write_wait).await?;
            }
        }
    }
}

async fn send_within(
    sink: &mut WsSink,
    message: Message,
    write_wait: Duration,
) -> Result<(), ConnectionError> {
    match timeout(write_wait, sink.send(message)).await {
        Ok(result) => result.map_err(ConnectionError::from),
        Err(_) => Err(ConnectionError::WriteTimeout(write_wait)),
    }
}
