//! Delivery of server events to sessions and channel groups.
//!
//! The chat service only ever talks to connections through [`Transport`].
//! [`Hub`] implements it with one unbounded mpsc queue per session; the
//! WebSocket gateway drains that queue into the socket.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::debug;

use salon_shared::protocol::ServerEvent;
use salon_shared::{ChannelId, SessionId};

pub trait Transport {
    /// Start delivering to a newly connected session.
    fn attach(&mut self, session: SessionId, outbound: mpsc::UnboundedSender<ServerEvent>);

    /// Forget a session and drop it from every group.
    fn detach(&mut self, session: SessionId);

    fn join_group(&mut self, group: &ChannelId, session: SessionId);

    fn leave_group(&mut self, group: &ChannelId, session: SessionId);

    /// Unicast to one session.
    fn send_to(&self, session: SessionId, event: ServerEvent);

    /// Multicast to every member of `group`.
    fn broadcast(&self, group: &ChannelId, event: ServerEvent);

    /// Send to every attached session.
    fn broadcast_all(&self, event: ServerEvent);
}

#[derive(Debug, Default)]
pub struct Hub {
    outbound: HashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>,
    groups: HashMap<ChannelId, HashSet<SessionId>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn deliver(&self, session: &SessionId, event: ServerEvent) {
        if let Some(tx) = self.outbound.get(session) {
            if tx.send(event).is_err() {
                debug!(session = %session, "Dropping event for closed session");
            }
        }
    }
}

#[cfg(test)]
impl Hub {
    /// Attach a session and hand back the receiving end of its queue.
    pub fn connect(&mut self, session: SessionId) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.attach(session, tx);
        rx
    }

    pub fn connection_count(&self) -> usize {
        self.outbound.len()
    }

    pub fn group_size(&self, group: &ChannelId) -> usize {
        self.groups.get(group).map(|g| g.len()).unwrap_or(0)
    }
}

impl Transport for Hub {
    fn attach(&mut self, session: SessionId, outbound: mpsc::UnboundedSender<ServerEvent>) {
        self.outbound.insert(session, outbound);
    }

    fn detach(&mut self, session: SessionId) {
        self.outbound.remove(&session);
        self.groups.retain(|_, members| {
            members.remove(&session);
            !members.is_empty()
        });
    }

    fn join_group(&mut self, group: &ChannelId, session: SessionId) {
        self.groups.entry(group.clone()).or_default().insert(session);
    }

    fn leave_group(&mut self, group: &ChannelId, session: SessionId) {
        let now_empty = match self.groups.get_mut(group) {
            Some(members) => {
                members.remove(&session);
                members.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.groups.remove(group);
        }
    }

    fn send_to(&self, session: SessionId, event: ServerEvent) {
        self.deliver(&session, event);
    }

    fn broadcast(&self, group: &ChannelId, event: ServerEvent) {
        if let Some(members) = self.groups.get(group) {
            for session in members {
                self.deliver(session, event.clone());
            }
        }
    }

    fn broadcast_all(&self, event: ServerEvent) {
        for session in self.outbound.keys() {
            self.deliver(session, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice(text: &str) -> ServerEvent {
        ServerEvent::Notice { text: text.into() }
    }

    #[test]
    fn test_broadcast_reaches_group_members_only() {
        let mut hub = Hub::new();
        let room = ChannelId::new();
        let (a, b) = (SessionId::new(), SessionId::new());
        let mut a_rx = hub.connect(a);
        let mut b_rx = hub.connect(b);

        hub.join_group(&room, a);
        hub.broadcast(&room, notice("room only"));

        assert_eq!(a_rx.try_recv().unwrap(), notice("room only"));
        assert!(b_rx.try_recv().is_err());

        hub.broadcast_all(notice("everyone"));
        assert_eq!(a_rx.try_recv().unwrap(), notice("everyone"));
        assert_eq!(b_rx.try_recv().unwrap(), notice("everyone"));
    }

    #[test]
    fn test_leave_and_detach_clean_up_groups() {
        let mut hub = Hub::new();
        let room = ChannelId::new();
        let a = SessionId::new();
        let _rx = hub.connect(a);

        hub.join_group(&room, a);
        hub.join_group(&ChannelId::general(), a);
        assert_eq!(hub.group_size(&room), 1);

        hub.leave_group(&room, a);
        assert_eq!(hub.group_size(&room), 0);

        hub.detach(a);
        assert_eq!(hub.group_size(&ChannelId::general()), 0);
        assert_eq!(hub.connection_count(), 0);
    }

    #[test]
    fn test_send_to_closed_session_is_ignored() {
        let mut hub = Hub::new();
        let a = SessionId::new();
        drop(hub.connect(a));
        hub.send_to(a, notice("nobody home"));
    }
}
