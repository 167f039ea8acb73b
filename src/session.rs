use crate::mentions::Ticker;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

pub const COOKIE_NAME: &str = "traders_den_session";

pub type SessionId = Uuid;

const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Per-session memo of mention counts.
#[async_trait]
pub trait MentionCache: Send + Sync {
    async fn cached_count(&self, session: SessionId, ticker: &Ticker) -> Option<u64>;
    async fn remember_count(&self, session: SessionId, ticker: &Ticker, count: u64);
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub username: Option<String>,
    pub mentions: HashMap<Ticker, u64>,
    last_seen: i64,
}

/// In-memory sessions keyed by the id stored in the session cookie.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self::with_limits(idle_ttl, DEFAULT_MAX_SESSIONS)
    }

    /// At most `max_sessions` are kept; the least recently seen one makes room for a new one.
    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Returns the live session named by the request cookie, or starts a new one.
    /// The bool is true when a cookie must be set on the response.
    pub async fn resume(&self, headers: &HeaderMap) -> (SessionId, bool) {
        let now = Utc::now().timestamp_millis();
        let cutoff = now - self.idle_ttl.num_milliseconds();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen >= cutoff);
        if sessions.len() < before {
            debug!("[Session] Expired {} idle session(s)", before - sessions.len());
        }

        if let Some(id) = session_cookie(headers) {
            if let Some(session) = sessions.get_mut(&id) {
                session.last_seen = now;
                return (id, false);
            }
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions.iter().min_by_key(|(_, s)| s.last_seen).map(|(id, _)| *id) else {
                break;
            };
            sessions.remove(&oldest);
            debug!("[Session] Evicted least recently seen session (cap: {})", self.max_sessions);
        }

        let id = Uuid::new_v4();
        sessions.insert(id, Session { last_seen: now, ..Session::default() });
        info!("[Session] Started session (total: {})", sessions.len());
        (id, true)
    }

    pub async fn set_user(&self, id: SessionId, username: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.username = Some(username.to_string());
        }
    }

    pub async fn username(&self, id: SessionId) -> Option<String> {
        self.sessions.read().await.get(&id).and_then(|s| s.username.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

#[async_trait]
impl MentionCache for SessionStore {
    async fn cached_count(&self, session: SessionId, ticker: &Ticker) -> Option<u64> {
        self.sessions
            .read()
            .await
            .get(&session)
            .and_then(|s| s.mentions.get(ticker).copied())
    }

    async fn remember_count(&self, session: SessionId, ticker: &Ticker, count: u64) {
        if let Some(s) = self.sessions.write().await.get_mut(&session) {
            s.mentions.insert(ticker.clone(), count);
        }
    }
}

pub fn session_cookie(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

pub fn set_cookie_header(id: SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax")).ok()
}
