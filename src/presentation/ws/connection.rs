use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::services::chat_events::ChatEvent;

/// One authenticated socket. All turns started on it share its outbound queue.
pub struct ClientConnection {
    id: Uuid,
    user_id: Uuid,
    events: mpsc::Sender<ChatEvent>,
    connected_at: Instant,
    is_alive: AtomicBool,
    /// Milliseconds after `connected_at` at which the last pong arrived.
    last_pong_ms: AtomicU64,
}

impl ClientConnection {
    pub fn new(user_id: Uuid, events: mpsc::Sender<ChatEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            events,
            connected_at: Instant::now(),
            is_alive: AtomicBool::new(true),
            last_pong_ms: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn events(&self) -> &mpsc::Sender<ChatEvent> {
        &self.events
    }

    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        let elapsed = self.connected_at.elapsed().as_millis() as u64;
        self.last_pong_ms.store(elapsed, Ordering::Relaxed);
    }

    pub fn last_pong_elapsed(&self) -> Duration {
        let last_pong = Duration::from_millis(self.last_pong_ms.load(Ordering::Relaxed));
        self.connected_at.elapsed().saturating_sub(last_pong)
    }

    /// Returns whether the client showed activity since the previous check, and resets the flag.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<ChatEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientConnection::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn test_check_alive_resets_flag() {
        let (conn, _rx) = make_connection();
        assert!(conn.check_alive());
        assert!(!conn.check_alive());

        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn test_last_pong_elapsed_resets_on_activity() {
        let (conn, _rx) = make_connection();
        std::thread::sleep(Duration::from_millis(20));
        assert!(conn.last_pong_elapsed() >= Duration::from_millis(20));

        conn.mark_alive();
        assert!(conn.last_pong_elapsed() < Duration::from_millis(20));
    }
}
