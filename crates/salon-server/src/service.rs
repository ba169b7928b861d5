//! The single event loop that owns all chat state.
//!
//! WebSocket tasks and HTTP handlers never touch the registry directly;
//! they enqueue [`InboundEvent`]s and the service processes them one at a
//! time, each to completion. That serialization is what gives every channel
//! a total message order without any locking.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use salon_shared::protocol::ServerEvent;
use salon_shared::{ChannelId, ChannelSummary, Message, SessionId};
use salon_store::backup::BackupPayload;
use salon_store::{MessageLog, Result};

use crate::persistence::Persistence;
use crate::registry::ChannelRegistry;
use crate::session::{Session, SessionTable};
use crate::transport::Transport;

/// Events delivered into the service.
#[derive(Debug)]
pub enum InboundEvent {
    /// A new connection; `outbound` receives everything sent to it.
    Connect {
        session: SessionId,
        outbound: mpsc::UnboundedSender<ServerEvent>,
    },
    Register {
        session: SessionId,
        display_name: String,
    },
    Message {
        session: SessionId,
        text: String,
    },
    Command {
        session: SessionId,
        line: String,
    },
    Disconnect {
        session: SessionId,
    },
    /// Read-only request from the HTTP API.
    Query(Query),
    /// Flush everything to disk and stop.
    Shutdown,
}

#[derive(Debug)]
pub enum Query {
    Channels(oneshot::Sender<Vec<ChannelSummary>>),
    History(oneshot::Sender<MessageLog>),
    Stats(oneshot::Sender<ServiceStats>),
    Backup(oneshot::Sender<Result<BackupPayload>>),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceStats {
    pub channels: usize,
    pub sessions: usize,
    pub registered: usize,
    pub messages: usize,
}

pub struct ChatService<T: Transport> {
    pub(crate) registry: ChannelRegistry,
    pub(crate) sessions: SessionTable,
    pub(crate) transport: T,
    persistence: Persistence,
    pub(crate) max_message_len: usize,
}

impl<T: Transport> ChatService<T> {
    /// Load persisted state and build the service.
    pub fn new(persistence: Persistence, transport: T, max_message_len: usize) -> Result<Self> {
        let registry = persistence.load_registry()?;
        // Write back so repaired or defaulted collections are on disk from
        // the first event on.
        persistence.save_all(&registry)?;

        Ok(Self {
            registry,
            sessions: SessionTable::new(),
            transport,
            persistence,
            max_message_len,
        })
    }

    /// Consume events until the queue closes or a shutdown is requested.
    /// A persistence failure stops the loop and is returned to the caller.
    pub async fn run(mut self, mut events: mpsc::Receiver<InboundEvent>) -> Result<()> {
        info!(channels = self.registry.len(), "Chat service running");

        while let Some(event) = events.recv().await {
            if matches!(event, InboundEvent::Shutdown) {
                info!("Chat service shutdown requested");
                break;
            }

            if let Err(e) = self.handle(event) {
                error!(error = %e, "Persistence failed, stopping chat service");
                return Err(e);
            }
        }

        self.persistence.save_all(&self.registry)?;
        info!("Chat service stopped, state flushed");
        Ok(())
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: InboundEvent) -> Result<()> {
        match event {
            InboundEvent::Connect { session, outbound } => {
                self.on_connect(session, outbound);
                Ok(())
            }
            InboundEvent::Register {
                session,
                display_name,
            } => self.on_register(session, &display_name),
            InboundEvent::Message { session, text } => self.on_message(session, &text),
            InboundEvent::Command { session, line } => self.handle_command(session, &line),
            InboundEvent::Disconnect { session } => self.on_disconnect(session),
            InboundEvent::Query(query) => {
                self.answer(query);
                Ok(())
            }
            InboundEvent::Shutdown => Ok(()),
        }
    }

    fn on_connect(&mut self, session: SessionId, outbound: mpsc::UnboundedSender<ServerEvent>) {
        self.sessions.insert(Session::new(session));
        self.transport.attach(session, outbound);
        debug!(session = %session, connections = self.sessions.len(), "Session connected");
    }

    fn answer(&self, query: Query) {
        let delivered = match query {
            Query::Channels(reply) => reply.send(self.registry.summaries()).is_ok(),
            Query::History(reply) => reply.send(self.registry.history().clone()).is_ok(),
            Query::Stats(reply) => reply.send(self.stats()).is_ok(),
            Query::Backup(reply) => reply.send(self.persistence.export_backup()).is_ok(),
        };

        if !delivered {
            debug!("Query requester went away before the reply");
        }
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            channels: self.registry.len(),
            sessions: self.sessions.len(),
            registered: self.sessions.registered_count(),
            messages: self.registry.history().0.len(),
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers for the router and the command interpreter
    // ------------------------------------------------------------------

    /// Append a message to a channel, persist it, then deliver it to the
    /// channel's members.
    pub(crate) fn post(&mut self, channel: &ChannelId, message: Message) -> Result<()> {
        if let Err(e) = self.registry.append_message(channel, message.clone()) {
            warn!(channel = %channel, error = %e, "Dropping message for unknown channel");
            return Ok(());
        }
        self.persistence.save_messages(&self.registry)?;
        self.transport.broadcast(channel, ServerEvent::ChatMessage(message));
        Ok(())
    }

    /// Persist after a channel lifecycle change.
    pub(crate) fn save_channels(&self) -> Result<()> {
        self.persistence.save_channels(&self.registry)
    }

    /// Send a channel's full history to one session.
    pub(crate) fn send_history(&self, session: SessionId, channel: &ChannelId) {
        match self.registry.get_channel(channel) {
            Ok(c) => self.transport.send_to(
                session,
                ServerEvent::ChatHistory {
                    channel_id: c.id.clone(),
                    channel_name: c.name.clone(),
                    messages: c.messages.clone(),
                },
            ),
            Err(e) => warn!(channel = %channel, error = %e, "No history to send"),
        }
    }

    pub(crate) fn channel_list(&self) -> ServerEvent {
        ServerEvent::UpdateChannels {
            channels: self.registry.summaries(),
        }
    }

    pub(crate) fn notice(&self, session: SessionId, text: impl Into<String>) {
        self.transport
            .send_to(session, ServerEvent::Notice { text: text.into() });
    }

    /// Move a session's transport membership and channel pointer.
    pub(crate) fn move_session(&mut self, session: SessionId, from: &ChannelId, to: &ChannelId) {
        self.transport.leave_group(from, session);
        self.transport.join_group(to, session);
        if let Some(s) = self.sessions.get_mut(&session) {
            s.current_channel = to.clone();
        }
    }

    pub(crate) fn channel_name(&self, channel: &ChannelId) -> String {
        self.registry
            .get_channel(channel)
            .map(|c| c.name.clone())
            .unwrap_or_else(|_| channel.to_string())
    }
}
