//! In-memory local sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use smbridge_auth::{LocalAccount, LocalSession};
use smbridge_core::{AccountId, SessionId};

/// Server-side state of one local session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub account_id: AccountId,
    pub authname: String,
}

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SessionId) -> Option<SessionRecord> {
        let map = self.inner.read().ok()?;
        map.get(&id).cloned()
    }

    pub fn insert(&self, id: SessionId, record: SessionRecord) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(id, record);
        }
    }

    pub fn remove(&self, id: SessionId) {
        if let Ok(mut map) = self.inner.write() {
            map.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the HTTP layer must do with the session cookie after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    Established(SessionId),
    Destroyed,
}

/// Request-scoped view of a session; implements [`LocalSession`].
///
/// Changes are written through to the store immediately, so a destroy is
/// visible to the client's next request.
#[derive(Debug)]
pub struct SessionHandle {
    store: Arc<InMemorySessionStore>,
    id: Option<SessionId>,
    record: Option<SessionRecord>,
    change: SessionChange,
}

impl SessionHandle {
    /// Resolve the session named by the client's cookie, if it still exists.
    pub fn load(store: Arc<InMemorySessionStore>, id: Option<SessionId>) -> Self {
        let record = id.and_then(|id| store.get(id));
        Self {
            store,
            id: if record.is_some() { id } else { None },
            record,
            change: SessionChange::Unchanged,
        }
    }

    pub fn record(&self) -> Option<&SessionRecord> {
        self.record.as_ref()
    }

    pub fn change(&self) -> SessionChange {
        self.change
    }
}

impl LocalSession for SessionHandle {
    fn authname(&self) -> Option<&str> {
        self.record.as_ref().map(|r| r.authname.as_str())
    }

    fn destroy(&mut self) {
        if let Some(id) = self.id.take() {
            self.store.remove(id);
        }
        self.record = None;
        self.change = SessionChange::Destroyed;
    }

    fn establish(&mut self, account: &LocalAccount, authname: &str) {
        // Fresh id on every login.
        if let Some(old) = self.id.take() {
            self.store.remove(old);
        }
        let id = SessionId::new();
        let record = SessionRecord {
            account_id: account.id,
            authname: authname.to_string(),
        };
        self.store.insert(id, record.clone());
        self.id = Some(id);
        self.record = Some(record);
        self.change = SessionChange::Established(id);
    }
}
