//! In-memory session store for chunk sets
//!
//! Sessions are created once, never edited, and destroyed on expiry or
//! eviction. All mutations take the table's write lock; readers take the
//! read lock and treat expired sessions as absent, so a session is always
//! observed either whole or not at all.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SessionError;
use crate::splitter::{Fragment, SplitOutcome};

/// Opaque session identifier
pub type SessionId = String;

/// Ordered fragments derived from one payload
#[derive(Debug, Clone)]
pub struct ChunkSet {
    pub fragments: Vec<Fragment>,
    /// Opaque fingerprint of the originating query
    pub fingerprint: String,
    pub total_records: usize,
    pub rows_field: Option<String>,
}

impl ChunkSet {
    pub fn from_split(outcome: SplitOutcome, fingerprint: impl Into<String>) -> Self {
        let rows_field = outcome.rows_field().map(str::to_string);
        Self {
            fragments: outcome.fragments,
            fingerprint: fingerprint.into(),
            total_records: outcome.total_records,
            rows_field,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.fragments.len()
    }

    /// Indexes of fragments holding a single over-budget record
    pub fn oversized_chunks(&self) -> Vec<usize> {
        self.fragments.iter().filter(|f| f.oversized).map(|f| f.index).collect()
    }
}

#[derive(Debug)]
struct Session {
    chunks: ChunkSet,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A session as stored by `put`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Metadata for a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub chunk_count: usize,
    pub total_row_count: usize,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_field: Option<String>,
    pub oversized_chunks: Vec<usize>,
}

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<SessionId, Arc<Session>>,
    /// Session ids in creation order
    created: VecDeque<SessionId>,
}

impl SessionTable {
    fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let removed = before - self.sessions.len();
        if removed > 0 {
            let sessions = &self.sessions;
            self.created.retain(|id| sessions.contains_key(id));
        }
        removed
    }
}

/// Session-addressed storage for chunk sets
pub struct SessionStore {
    ttl: chrono::Duration,
    max_sessions: Option<usize>,
    table: RwLock<SessionTable>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .field("max_sessions", &self.max_sessions)
            .field("len", &self.len())
            .finish()
    }
}

impl SessionStore {
    /// Create a store with a session TTL and optional capacity cap
    pub fn new(ttl: Duration, max_sessions: Option<usize>) -> Self {
        debug!(?ttl, ?max_sessions, "SessionStore::new: called");
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            ttl,
            max_sessions: max_sessions.map(|m| m.max(1)),
            table: RwLock::new(SessionTable::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionTable> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionTable> {
        self.table.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a chunk set under a new session id
    pub fn put(&self, chunks: ChunkSet) -> NewSession {
        self.put_at(chunks, Utc::now())
    }

    /// Store a chunk set as of `now`
    pub fn put_at(&self, chunks: ChunkSet, now: DateTime<Utc>) -> NewSession {
        let session_id = Uuid::new_v4().to_string();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let chunk_count = chunks.chunk_count();
        let session = Arc::new(Session {
            chunks,
            created_at: now,
            expires_at,
        });

        let mut table = self.write();
        table.remove_expired(now);

        if let Some(max) = self.max_sessions {
            while table.sessions.len() >= max {
                let Some(oldest) = table.created.pop_front() else {
                    break;
                };
                if table.sessions.remove(&oldest).is_some() {
                    info!(session_id = %oldest, max, "Evicted oldest session at capacity");
                }
            }
        }

        table.sessions.insert(session_id.clone(), session);
        table.created.push_back(session_id.clone());
        drop(table);

        info!(%session_id, chunk_count, %expires_at, "Created chunking session");
        NewSession {
            id: session_id,
            created_at: now,
            expires_at,
        }
    }

    fn live(&self, session_id: &str, now: DateTime<Utc>) -> Result<Arc<Session>, SessionError> {
        let table = self.read();
        match table.sessions.get(session_id) {
            Some(session) if !session.is_expired(now) => Ok(Arc::clone(session)),
            _ => {
                debug!(%session_id, "SessionStore::live: not found or expired");
                Err(SessionError::SessionNotFound {
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    /// Fetch one fragment of a session
    pub fn get(&self, session_id: &str, index: usize) -> Result<Fragment, SessionError> {
        self.get_at(session_id, index, Utc::now())
    }

    pub fn get_at(&self, session_id: &str, index: usize, now: DateTime<Utc>) -> Result<Fragment, SessionError> {
        debug!(%session_id, index, "SessionStore::get: called");
        let session = self.live(session_id, now)?;
        session
            .chunks
            .fragments
            .get(index)
            .cloned()
            .ok_or_else(|| SessionError::ChunkIndexOutOfRange {
                session_id: session_id.to_string(),
                index: i64::try_from(index).unwrap_or(i64::MAX),
                chunk_count: session.chunks.chunk_count(),
            })
    }

    /// Describe a session
    pub fn info(&self, session_id: &str) -> Result<SessionInfo, SessionError> {
        self.info_at(session_id, Utc::now())
    }

    pub fn info_at(&self, session_id: &str, now: DateTime<Utc>) -> Result<SessionInfo, SessionError> {
        let session = self.live(session_id, now)?;
        let chunks = &session.chunks;
        Ok(SessionInfo {
            session_id: session_id.to_string(),
            chunk_count: chunks.chunk_count(),
            total_row_count: chunks.total_records,
            created_at: session.created_at,
            expires_at: session.expires_at,
            fingerprint: chunks.fingerprint.clone(),
            rows_field: chunks.rows_field.clone(),
            oversized_chunks: chunks.oversized_chunks(),
        })
    }

    /// Remove all sessions past their expiry, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Utc::now())
    }

    pub fn evict_expired_at(&self, now: DateTime<Utc>) -> usize {
        let removed = self.write().remove_expired(now);
        if removed > 0 {
            info!(removed, "Evicted expired sessions");
        }
        removed
    }

    /// Remove a session explicitly
    pub fn evict(&self, session_id: &str) -> bool {
        let mut table = self.write();
        let removed = table.sessions.remove(session_id).is_some();
        if removed {
            table.created.retain(|id| id != session_id);
            info!(%session_id, "Evicted session");
        }
        removed
    }

    /// Number of stored sessions, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
