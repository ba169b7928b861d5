//! Slash-command parsing and dispatch.
//!
//! A command line is `/<action> <argument…>`, where the argument is the
//! rest of the line so channel names may contain spaces.

use tracing::{debug, info};

use salon_shared::constants::COMMAND_PREFIX;
use salon_shared::protocol::ServerEvent;
use salon_shared::{is_reserved_name, ChannelError, ChannelId, Message, SessionId};
use salon_store::Result;

use crate::service::ChatService;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(String),
    Join(String),
    Leave,
    Nick(String),
    Delete(String),
    List(String),
    /// A known action that needs an argument and got none.
    MissingArgument(&'static str),
    /// Anything else. Ignored.
    Unknown(String),
}

impl Command {
    /// Parse a command line. `None` if the line is not a command at all.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix(COMMAND_PREFIX)?;
        let (action, argument) = match body.split_once(char::is_whitespace) {
            Some((action, rest)) => (action, rest.trim()),
            None => (body, ""),
        };

        let with_arg = |usage: &'static str, build: fn(String) -> Command| {
            if argument.is_empty() {
                Command::MissingArgument(usage)
            } else {
                build(argument.to_string())
            }
        };

        Some(match action {
            "create" => with_arg("/create <channel name>", Command::Create),
            "join" => with_arg("/join <channel name>", Command::Join),
            "leave" => Command::Leave,
            "nick" => with_arg("/nick <new name>", Command::Nick),
            "delete" => with_arg("/delete <channel name>", Command::Delete),
            "list" => Command::List(argument.to_string()),
            other => Command::Unknown(other.to_string()),
        })
    }
}

impl<T: Transport> ChatService<T> {
    /// Parse and run a command line on behalf of a registered session.
    pub fn handle_command(&mut self, session: SessionId, line: &str) -> Result<()> {
        let registered = self
            .sessions
            .get(&session)
            .map(|s| s.is_registered())
            .unwrap_or(false);
        if !registered {
            debug!(session = %session, "Ignoring command from unregistered session");
            return Ok(());
        }

        let Some(command) = Command::parse(line) else {
            return Ok(());
        };
        debug!(session = %session, command = ?command, "Command received");

        match command {
            Command::Create(name) => self.cmd_create(session, &name),
            Command::Join(name) => self.cmd_join(session, &name),
            Command::Leave => self.cmd_leave(session),
            Command::Nick(name) => self.cmd_nick(session, &name),
            Command::Delete(name) => self.cmd_delete(session, &name),
            Command::List(query) => {
                self.cmd_list(session, &query);
                Ok(())
            }
            Command::MissingArgument(usage) => {
                self.notice(session, format!("Usage: {usage}"));
                Ok(())
            }
            Command::Unknown(action) => {
                debug!(session = %session, action = %action, "Ignoring unknown command");
                Ok(())
            }
        }
    }

    fn reject(&self, session: SessionId, err: ChannelError) {
        debug!(session = %session, error = %err, "Command rejected");
        self.notice(session, err.to_string());
    }

    fn cmd_create(&mut self, session: SessionId, name: &str) -> Result<()> {
        if let Err(e) = self.registry.create_channel(name) {
            self.reject(session, e);
            return Ok(());
        }
        self.save_channels()?;
        self.transport.send_to(session, self.channel_list());
        Ok(())
    }

    fn cmd_join(&mut self, session: SessionId, name: &str) -> Result<()> {
        let target = match self.registry.resolve_by_name(name) {
            Ok(id) => id,
            Err(e) => {
                self.reject(session, e);
                return Ok(());
            }
        };
        let Some(current) = self.current_channel(session) else {
            return Ok(());
        };

        self.move_session(session, &current, &target);
        self.send_history(session, &target);
        Ok(())
    }

    fn cmd_leave(&mut self, session: SessionId) -> Result<()> {
        let Some(current) = self.current_channel(session) else {
            return Ok(());
        };
        if current.is_general() {
            return Ok(());
        }
        let user = self.display_name(session);
        let general = ChannelId::general();

        let old_name = self.channel_name(&current);
        self.post(&current, Message::system(format!("{user} has left the channel."), old_name))?;

        self.move_session(session, &current, &general);

        let general_name = self.channel_name(&general);
        self.post(
            &general,
            Message::system(format!("{user} has joined the channel."), general_name),
        )?;
        self.send_history(session, &general);
        Ok(())
    }

    fn cmd_nick(&mut self, session: SessionId, new_name: &str) -> Result<()> {
        if is_reserved_name(new_name) {
            self.notice(session, format!("The name '{new_name}' is reserved."));
            return Ok(());
        }
        let Some(state) = self.sessions.get_mut(&session) else {
            return Ok(());
        };
        let old_name = state.name().to_string();
        if old_name == new_name {
            return Ok(());
        }
        state.display_name = Some(new_name.to_string());
        let channel = state.current_channel.clone();

        info!(session = %session, from = %old_name, to = new_name, "User renamed");
        let channel_name = self.channel_name(&channel);
        self.post(
            &channel,
            Message::system(format!("{old_name} is now known as {new_name}."), channel_name),
        )
    }

    fn cmd_delete(&mut self, session: SessionId, name: &str) -> Result<()> {
        let deleted_name = name.trim().to_string();
        let deleted_id = match self.registry.resolve_by_name(&deleted_name) {
            Ok(id) => id,
            Err(e) => {
                self.reject(session, e);
                return Ok(());
            }
        };
        let evicted = match self.registry.delete_channel(&deleted_name, &self.sessions) {
            Ok(evicted) => evicted,
            Err(e) => {
                self.reject(session, e);
                return Ok(());
            }
        };
        self.save_channels()?;

        let general = ChannelId::general();
        let mut moved = Vec::with_capacity(evicted.len());
        for evictee in &evicted {
            self.move_session(*evictee, &deleted_id, &general);
            self.send_history(*evictee, &general);
            moved.push(self.display_name(*evictee));
        }

        let notice = if moved.is_empty() {
            format!("Channel '{deleted_name}' has been deleted.")
        } else {
            format!(
                "Channel '{deleted_name}' has been deleted. Moved to General: {}.",
                moved.join(", ")
            )
        };
        let general_name = self.channel_name(&general);
        self.post(&general, Message::system(notice, general_name))?;

        self.transport.broadcast_all(self.channel_list());
        Ok(())
    }

    fn cmd_list(&self, session: SessionId, query: &str) {
        let matches = self.registry.list_matching(query);
        let content = if matches.is_empty() {
            "No channels found.".to_string()
        } else {
            format!("Channels: {}", matches.join(", "))
        };

        let channel_name = self
            .current_channel(session)
            .map(|c| self.channel_name(&c))
            .unwrap_or_default();
        self.transport.send_to(
            session,
            ServerEvent::ChatMessage(Message::system(content, channel_name)),
        );
    }

    fn current_channel(&self, session: SessionId) -> Option<ChannelId> {
        self.sessions.get(&session).map(|s| s.current_channel.clone())
    }

    fn display_name(&self, session: SessionId) -> String {
        self.sessions
            .get(&session)
            .map(|s| s.name().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use salon_store::Database;

    use crate::service::tests::*;

    use super::*;

    #[test]
    fn test_parse_keeps_spaces_in_argument() {
        assert_eq!(
            Command::parse("/join  Rust Talk "),
            Some(Command::Join("Rust Talk".into()))
        );
        assert_eq!(Command::parse("/leave"), Some(Command::Leave));
        assert_eq!(Command::parse("/list"), Some(Command::List(String::new())));
        assert_eq!(
            Command::parse("/create"),
            Some(Command::MissingArgument("/create <channel name>"))
        );
        assert_eq!(Command::parse("/dance wildly"), Some(Command::Unknown("dance".into())));
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_create_notifies_creator_only() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");
        alice.drain();

        command(&mut service, &alice, "/create Book Club");

        let events = alice.drain();
        match events.as_slice() {
            [ServerEvent::UpdateChannels { channels }] => {
                let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["General", "Book Club"]);
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert!(bob.drain().is_empty());
    }

    #[test]
    fn test_duplicate_create_is_rejected_with_notice() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");

        command(&mut service, &alice, "/create Foo");
        alice.drain();
        command(&mut service, &alice, "/create Foo");

        let events = alice.drain();
        assert!(matches!(&events[..], [ServerEvent::Notice { text }] if text.contains("already exists")));
        assert_eq!(service.registry.list_matching("foo"), vec!["Foo".to_string()]);
    }

    #[test]
    fn test_join_sends_history_of_new_channel() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");

        command(&mut service, &alice, "/create Garden");
        command(&mut service, &alice, "/join Garden");
        say(&mut service, &alice, "tomatoes");
        say(&mut service, &alice, "basil");
        bob.drain();

        command(&mut service, &bob, "/join Garden");
        match bob.drain().as_slice() {
            [ServerEvent::ChatHistory {
                channel_name,
                messages,
                ..
            }] => {
                assert_eq!(channel_name, "Garden");
                let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
                assert_eq!(contents, vec!["tomatoes", "basil"]);
            }
            other => panic!("unexpected events {other:?}"),
        }

        alice.drain();
        say(&mut service, &bob, "and mint");
        assert_eq!(alice.messages()[0].channel_name, "Garden");
    }

    #[test]
    fn test_join_unknown_channel_is_a_no_op() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");

        command(&mut service, &alice, "/join Nowhere");
        assert!(matches!(&alice.drain()[..], [ServerEvent::Notice { .. }]));
        assert!(service.sessions.get(&alice.id).unwrap().current_channel.is_general());
    }

    #[test]
    fn test_leave_returns_to_general_with_notices() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");
        let mut carol = login(&mut service, "carol");

        command(&mut service, &alice, "/create Attic");
        command(&mut service, &alice, "/join Attic");
        command(&mut service, &bob, "/join Attic");
        alice.drain();
        bob.drain();
        carol.drain();

        command(&mut service, &alice, "/leave");

        let bob_saw = bob.messages();
        assert_eq!(bob_saw.len(), 1);
        assert_eq!(bob_saw[0].content, "alice has left the channel.");
        assert_eq!(bob_saw[0].channel_name, "Attic");

        let carol_saw = carol.messages();
        assert_eq!(carol_saw.len(), 1);
        assert_eq!(carol_saw[0].content, "alice has joined the channel.");

        let events = alice.drain();
        assert!(matches!(events.last(), Some(ServerEvent::ChatHistory { channel_id, .. }) if channel_id.is_general()));
        assert!(service.sessions.get(&alice.id).unwrap().current_channel.is_general());
    }

    #[test]
    fn test_leave_in_general_does_nothing() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let before = service.registry.history().0.len();

        command(&mut service, &alice, "/leave");
        assert!(alice.drain().is_empty());
        assert_eq!(service.registry.history().0.len(), before);
    }

    #[test]
    fn test_nick_announces_once_and_renames() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");
        alice.drain();
        let before = service.registry.history().0.len();

        command(&mut service, &alice, "/nick Alicia");

        assert_eq!(service.registry.history().0.len(), before + 1);
        let seen = bob.messages();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_system());
        assert!(seen[0].content.contains("alice"));
        assert!(seen[0].content.contains("Alicia"));

        say(&mut service, &alice, "new me");
        assert_eq!(bob.messages()[0].user, "Alicia");
    }

    #[test]
    fn test_nick_to_system_is_refused() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");
        alice.drain();
        let before = service.registry.history().0.len();

        command(&mut service, &alice, "/nick SYSTEM");

        assert!(matches!(&alice.drain()[..], [ServerEvent::Notice { text }] if text.contains("reserved")));
        assert!(bob.drain().is_empty());
        assert_eq!(service.registry.history().0.len(), before);

        say(&mut service, &alice, "still me");
        let seen = bob.messages();
        assert_eq!(seen[0].user, "alice");
        assert!(!seen[0].is_system());
    }

    #[test]
    fn test_delete_evicts_members_to_general() {
        let mut service = service();
        let mut owner = login(&mut service, "owner");
        let mut guest = login(&mut service, "guest");
        let mut bystander = login(&mut service, "bystander");

        command(&mut service, &owner, "/create Shed");
        command(&mut service, &guest, "/join Shed");
        owner.drain();
        guest.drain();
        bystander.drain();

        command(&mut service, &owner, "/delete Shed");

        assert!(service.registry.resolve_by_name("Shed").is_err());
        assert!(service.sessions.get(&guest.id).unwrap().current_channel.is_general());

        let guest_events = guest.drain();
        assert!(matches!(guest_events.first(), Some(ServerEvent::ChatHistory { channel_id, .. }) if channel_id.is_general()));
        assert!(guest_events.iter().any(|e| matches!(
            e,
            ServerEvent::ChatMessage(m) if m.is_system() && m.content.contains("Shed")
        )));
        assert!(matches!(guest_events.last(), Some(ServerEvent::UpdateChannels { .. })));

        assert!(bystander
            .drain()
            .iter()
            .any(|e| matches!(e, ServerEvent::UpdateChannels { channels } if channels.len() == 1)));

        owner.drain();
        say(&mut service, &guest, "back home");
        let seen = owner.messages();
        assert_eq!(seen[0].channel_name, "General");
        assert_eq!(seen[0].user, "guest");
    }

    #[test]
    fn test_delete_general_is_refused() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let history_before = service.registry.history().0.len();

        command(&mut service, &alice, "/delete General");

        assert!(matches!(&alice.drain()[..], [ServerEvent::Notice { text }] if text.contains("cannot be deleted")));
        assert!(service.registry.get_channel(&ChannelId::general()).is_ok());
        assert_eq!(service.registry.history().0.len(), history_before);
    }

    #[test]
    fn test_list_filters_case_insensitively() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut bob = login(&mut service, "bob");
        command(&mut service, &alice, "/create Testing");
        command(&mut service, &alice, "/create Test2");
        alice.drain();
        bob.drain();
        let before = service.registry.history().0.len();

        command(&mut service, &alice, "/list test");
        let reply = alice.messages();
        assert_eq!(reply.len(), 1);
        assert!(reply[0].is_system());
        assert_eq!(reply[0].content, "Channels: Testing, Test2");

        command(&mut service, &alice, "/list zebra");
        assert_eq!(alice.messages()[0].content, "No channels found.");

        assert!(bob.drain().is_empty());
        assert_eq!(service.registry.history().0.len(), before);
    }

    #[test]
    fn test_unknown_and_unregistered_commands_are_ignored() {
        let mut service = service();
        let mut alice = login(&mut service, "alice");
        let mut lurker = connect(&mut service);

        command(&mut service, &alice, "/teleport Mars");
        command(&mut service, &lurker, "/create Secret");

        assert!(alice.drain().is_empty());
        assert!(lurker.drain().is_empty());
        assert!(service.registry.resolve_by_name("Secret").is_err());
    }

    #[test]
    fn test_history_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salon.db");

        {
            let mut service = service_with(Database::open_at(&path).unwrap());
            let alice = login(&mut service, "alice");
            command(&mut service, &alice, "/create Archive");
            command(&mut service, &alice, "/join Archive");
            say(&mut service, &alice, "first");
            say(&mut service, &alice, "second");
        }

        let mut service = service_with(Database::open_at(&path).unwrap());
        let mut bob = login(&mut service, "bob");
        command(&mut service, &bob, "/join Archive");

        match bob.drain().as_slice() {
            [ServerEvent::ChatHistory { messages, .. }] => {
                let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
                assert_eq!(contents, vec!["first", "second"]);
                assert!(messages.iter().all(|m| m.user == "alice"));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }
}
