//! Message attribution and delivery.
//!
//! Routing always follows the sender's server-side session: the channel a
//! message lands in, and the name stamped on it, come from the session's
//! current channel and never from anything the client sent.

use tracing::{debug, info};

use salon_shared::constants::COMMAND_PREFIX;
use salon_shared::{is_reserved_name, ChannelId, Message, SessionId};
use salon_store::Result;

use crate::service::ChatService;
use crate::transport::Transport;

impl<T: Transport> ChatService<T> {
    /// Bind a display name and place the session in General.
    pub fn on_register(&mut self, session: SessionId, display_name: &str) -> Result<()> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            debug!(session = %session, "Ignoring register with blank name");
            return Ok(());
        }
        if is_reserved_name(display_name) {
            debug!(session = %session, "Ignoring register with reserved name");
            return Ok(());
        }

        let Some(state) = self.sessions.get_mut(&session) else {
            debug!(session = %session, "Register for unknown session");
            return Ok(());
        };

        if state.is_registered() {
            // Re-registering only swaps the name; the login has already been announced.
            state.display_name = Some(display_name.to_string());
            return Ok(());
        }

        let previous = std::mem::replace(&mut state.current_channel, ChannelId::general());
        state.display_name = Some(display_name.to_string());

        let general = ChannelId::general();
        self.transport.leave_group(&previous, session);
        self.transport.join_group(&general, session);
        self.send_history(session, &general);
        self.transport.broadcast_all(self.channel_list());

        info!(session = %session, user = display_name, "User logged in");
        let name = self.channel_name(&general);
        self.post(
            &general,
            Message::system(format!("{display_name} has logged in."), name),
        )
    }

    /// Chat text from a session, delivered to its current channel only.
    pub fn on_message(&mut self, session: SessionId, text: &str) -> Result<()> {
        if text.trim_start().starts_with(COMMAND_PREFIX) {
            return self.handle_command(session, text);
        }

        let Some(state) = self.sessions.get(&session) else {
            return Ok(());
        };
        let Some(user) = state.display_name.clone() else {
            debug!(session = %session, "Dropping message from unregistered session");
            return Ok(());
        };
        let channel = state.current_channel.clone();

        if text.trim().is_empty() {
            return Ok(());
        }
        if text.len() > self.max_message_len {
            self.notice(
                session,
                format!(
                    "Message too long ({} bytes, max {}).",
                    text.len(),
                    self.max_message_len
                ),
            );
            return Ok(());
        }

        let name = self.channel_name(&channel);
        self.post(&channel, Message::new(user, text, name))
    }

    /// Announce the logout in the session's channel and forget the session.
    pub fn on_disconnect(&mut self, session: SessionId) -> Result<()> {
        self.transport.detach(session);
        let Some(state) = self.sessions.remove(&session) else {
            return Ok(());
        };

        let Some(user) = state.display_name else {
            debug!(session = %session, "Unregistered session disconnected");
            return Ok(());
        };

        let online = chrono::Utc::now() - state.connected_at;
        info!(
            session = %session,
            user = %user,
            online_secs = online.num_seconds(),
            "User logged out"
        );
        let channel = state.current_channel;
        let name = self.channel_name(&channel);
        self.post(&channel, Message::system(format!("{user} has logged out."), name))
    }
}
