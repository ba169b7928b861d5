//! # salon-shared
//!
//! Types shared by the Salon store and server: identifiers, the chat
//! message model, the WebSocket wire protocol and the channel error
//! taxonomy.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{ChannelError, ProtocolError};
pub use types::{is_reserved_name, ChannelId, ChannelSummary, Message, SessionId};
