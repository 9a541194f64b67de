use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::errors::ProfileError;
use crate::identity::SessionCredential;
use crate::session::editor::{EditorSession, SessionServices};

/// In-memory index of live editing sessions. Nothing here outlives the process.
pub struct SessionRegistry {
    services: SessionServices,
    sessions: RwLock<HashMap<Uuid, Arc<EditorSession>>>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices) -> Self {
        Self {
            services,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self, credential: Option<SessionCredential>) -> Arc<EditorSession> {
        let session = Arc::new(EditorSession::new(self.services.clone(), credential));
        self.sessions
            .write()
            .insert(session.id, Arc::clone(&session));
        info!(
            "Session {} started ({})",
            session.id,
            if session.is_authenticated() {
                "logged in"
            } else {
                "anonymous"
            }
        );
        session
    }

    pub fn get(&self, id: Uuid) -> Result<Arc<EditorSession>, ProfileError> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(ProfileError::SessionNotFound(id))
    }

    /// Takes the session out of the index; later lookups report `SessionNotFound`.
    pub fn remove(&self, id: Uuid) -> Result<Arc<EditorSession>, ProfileError> {
        let session = self
            .sessions
            .write()
            .remove(&id)
            .ok_or(ProfileError::SessionNotFound(id))?;
        info!("Session {id} closed");
        Ok(session)
    }

    /// Drops sessions with no document change for `max_idle` and nothing in flight.
    pub fn evict_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_idle(max_idle, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle session(s); {} remain", sessions.len());
        }
        evicted
    }

    /// Runs `evict_idle` in the background for the life of the process.
    pub fn spawn_sweeper(self: &Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = (max_idle / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                registry.evict_idle(max_idle, Utc::now());
            }
        })
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}
