//! Per-connection state: display name and current channel.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use salon_shared::{ChannelId, SessionId};

/// Server-side state for one live connection. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// `None` until the client registers.
    pub display_name: Option<String>,
    /// Exactly one channel at a time; starts in General.
    pub current_channel: ChannelId,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            display_name: None,
            current_channel: ChannelId::general(),
            connected_at: Utc::now(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.display_name.is_some()
    }

    /// Display name, or an empty string before registration.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SessionId, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Sessions whose current channel is `channel`.
    pub fn in_channel(&self, channel: &ChannelId) -> Vec<SessionId> {
        self.sessions
            .values()
            .filter(|s| &s.current_channel == channel)
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn registered_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_registered()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_in_general() {
        let session = Session::new(SessionId::new());
        assert!(session.current_channel.is_general());
        assert!(!session.is_registered());
        assert_eq!(session.name(), "");
    }

    #[test]
    fn test_in_channel() {
        let mut table = SessionTable::new();
        let rust = ChannelId::new();

        let a = Session::new(SessionId::new());
        let mut b = Session::new(SessionId::new());
        b.current_channel = rust.clone();
        let (a_id, b_id) = (a.id, b.id);
        table.insert(a);
        table.insert(b);

        assert_eq!(table.in_channel(&rust), vec![b_id]);
        assert_eq!(table.in_channel(&ChannelId::general()), vec![a_id]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.registered_count(), 0);
    }
}
