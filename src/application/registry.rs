use crate::domain::game::{GameError, GameSession, Player, SnapshotSender};
use crate::domain::models::{Color, Move, PlayerToken, SessionId};
use crate::domain::snapshot::Snapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a create or join request was refused. The display text is sent back
/// to the requesting player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session not found")]
    SessionNotFound(SessionId),
    #[error("session is full")]
    SessionFull(SessionId),
    #[error("already in a session")]
    AlreadyInSession,
    #[error("unknown player")]
    UnknownPlayer(PlayerToken),
}

type SharedSession = Arc<Mutex<GameSession>>;

#[derive(Default)]
struct Directory {
    /// Connected players that have not created or joined a session yet.
    lobby: HashMap<PlayerToken, Player>,
    sessions: HashMap<SessionId, SharedSession>,
    players: HashMap<PlayerToken, SharedSession>,
}

/// Owns every live session and the queue through which all moves pass.
///
/// Lock order is always directory, then session. The move consumer releases
/// the directory before taking a session lock.
pub struct SessionRegistry {
    directory: Mutex<Directory>,
    moves: mpsc::UnboundedSender<Move>,
}

/// Drains the move queue one move at a time, in submission order.
pub struct MoveConsumer {
    registry: Weak<SessionRegistry>,
    queue: mpsc::UnboundedReceiver<Move>,
}

impl MoveConsumer {
    pub async fn run(mut self) {
        while let Some(mv) = self.queue.recv().await {
            let Some(registry) = self.registry.upgrade() else {
                break;
            };
            registry.apply_move(mv);
        }
        debug!("move queue closed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionRegistry {
    /// Builds the registry together with the consumer that must be spawned to
    /// process its moves.
    pub fn new() -> (Arc<Self>, MoveConsumer) {
        let (moves, queue) = mpsc::unbounded_channel();
        let registry = Arc::new(Self {
            directory: Mutex::new(Directory::default()),
            moves,
        });
        let consumer = MoveConsumer {
            registry: Arc::downgrade(&registry),
            queue,
        };
        (registry, consumer)
    }

    fn directory(&self) -> MutexGuard<'_, Directory> {
        lock(&self.directory)
    }

    /// Registers a freshly connected player. The registry owns its outbound
    /// sender from here on.
    pub fn connect(&self, token: PlayerToken, outbound: SnapshotSender) {
        let player = Player::new(token.clone(), outbound);
        self.directory().lobby.insert(token.clone(), player);
        debug!(player = %token, "player connected");
    }

    pub fn create_session(
        &self,
        token: &PlayerToken,
        color: Color,
    ) -> Result<SessionId, SessionError> {
        let mut dir = self.directory();
        if dir.players.contains_key(token) {
            return Err(SessionError::AlreadyInSession);
        }
        let mut player = dir
            .lobby
            .remove(token)
            .ok_or_else(|| SessionError::UnknownPlayer(token.clone()))?;
        player.color = color;

        let id = SessionId::generate();
        let session = Arc::new(Mutex::new(GameSession::new(id.clone(), player)));
        dir.sessions.insert(id.clone(), Arc::clone(&session));
        dir.players.insert(token.clone(), session);

        info!(session = %id, player = %token, ?color, "session created");
        Ok(id)
    }

    pub fn join_session(
        &self,
        token: &PlayerToken,
        session_id: &SessionId,
    ) -> Result<(), SessionError> {
        let mut dir = self.directory();
        if dir.players.contains_key(token) {
            return Err(SessionError::AlreadyInSession);
        }
        let session = dir
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.clone()))?;

        let mut game = lock(&session);
        if game.is_full() {
            return Err(SessionError::SessionFull(session_id.clone()));
        }
        let mut player = dir
            .lobby
            .remove(token)
            .ok_or_else(|| SessionError::UnknownPlayer(token.clone()))?;
        player.color = game.open_color();
        let color = player.color;
        game.add_second_player(player);
        drop(game);

        dir.players.insert(token.clone(), session);
        info!(session = %session_id, player = %token, ?color, "player joined session");
        Ok(())
    }

    /// Queues a move for the consumer. Never blocks.
    pub fn submit_move(&self, mv: Move) {
        if let Err(err) = self.moves.send(mv) {
            warn!(player = %err.0.mover, "move queue is closed, move dropped");
        }
    }

    /// Applies one move to the mover's session. Moves from players that are no
    /// longer seated are dropped.
    pub fn apply_move(&self, mv: Move) {
        let session = self.directory().players.get(&mv.mover).cloned();
        let Some(session) = session else {
            debug!(player = %mv.mover, "move from untracked player dropped");
            return;
        };

        let mut game = lock(&session);
        match game.handle_move(&mv) {
            Ok(()) => debug!(
                session = %game.id(),
                player = %mv.mover,
                from = %mv.from,
                to = %mv.to,
                board = %game.board(),
                "move applied"
            ),
            Err(GameError::UnknownPlayer(_)) => {
                debug!(player = %mv.mover, "move for a closed session dropped")
            }
            Err(err) => debug!(session = %game.id(), player = %mv.mover, %err, "move rejected"),
        }
    }

    /// Ends the player's session for everyone in it. Unknown players are
    /// ignored, so calling this twice is harmless.
    pub fn disconnect(&self, token: &PlayerToken) {
        let mut dir = self.directory();
        if dir.lobby.remove(token).is_some() {
            debug!(player = %token, "player left the lobby");
            return;
        }
        let Some(session) = dir.players.remove(token) else {
            return;
        };

        let mut game = lock(&session);
        for seated in game.close() {
            dir.players.remove(&seated);
        }
        dir.sessions.remove(game.id());
        info!(session = %game.id(), player = %token, "session closed after disconnect");
    }

    /// Sends a status message to a player wherever it currently is.
    pub fn notify(&self, token: &PlayerToken, msg: &str) {
        let dir = self.directory();
        if let Some(player) = dir.lobby.get(token) {
            player.send(Snapshot::notice(msg));
        } else if let Some(session) = dir.players.get(token) {
            lock(session).draw_screen(token, msg);
        }
    }

    /// Closes every session and lobby connection.
    pub fn shutdown(&self) {
        let mut dir = self.directory();
        let lobby = dir.lobby.len();
        dir.lobby.clear();
        for session in dir.sessions.values() {
            lock(session).close();
        }
        let sessions = dir.sessions.len();
        dir.sessions.clear();
        dir.players.clear();
        info!(sessions, lobby, "registry shut down");
    }

    pub fn session_count(&self) -> usize {
        self.directory().sessions.len()
    }

    pub fn lobby_count(&self) -> usize {
        self.directory().lobby.len()
    }

    pub fn session_of(&self, token: &PlayerToken) -> Option<SessionId> {
        let session = self.directory().players.get(token).cloned()?;
        let id = lock(&session).id().clone();
        Some(id)
    }

    /// Runs `f` against a session, if it is still registered.
    pub fn with_session<R>(&self, id: &SessionId, f: impl FnOnce(&GameSession) -> R) -> Option<R> {
        let session = self.directory().sessions.get(id).cloned()?;
        let game = lock(&session);
        Some(f(&game))
    }
}
