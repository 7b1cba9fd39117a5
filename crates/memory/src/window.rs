//! Window memory: the last K exchanges of every session, held in process.

use async_trait::async_trait;
use gitbuddy_core::memory::{ConversationMemory, Exchange, SessionId};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Session-keyed conversation windows.
///
/// Cloning shares the underlying map.
#[derive(Clone)]
pub struct WindowMemory {
    k: usize,
    sessions: Arc<RwLock<HashMap<SessionId, VecDeque<Exchange>>>>,
}

impl WindowMemory {
    /// A memory keeping the last `k` exchanges per session (at least one).
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of sessions with recorded history.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl ConversationMemory for WindowMemory {
    fn window(&self) -> usize {
        self.k
    }

    async fn load(&self, session: &SessionId) -> Vec<Exchange> {
        self.sessions
            .read()
            .await
            .get(session)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn save(&self, session: &SessionId, exchange: Exchange) {
        let mut sessions = self.sessions.write().await;
        let window = sessions.entry(session.clone()).or_default();
        window.push_back(exchange);
        while window.len() > self.k {
            window.pop_front();
        }
    }

    async fn clear(&self, session: &SessionId) {
        self.sessions.write().await.remove(session);
    }
}
