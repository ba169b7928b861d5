/// Application name
pub const APP_NAME: &str = "Salon";

/// Id of the default channel every session starts in.
pub const GENERAL_CHANNEL_ID: &str = "general";

/// Display name of the default channel.
pub const GENERAL_CHANNEL_NAME: &str = "General";

/// Sender name used for server-authored notices.
pub const SYSTEM_USER: &str = "System";

/// Lines starting with this character are parsed as commands.
pub const COMMAND_PREFIX: char = '/';

/// Maximum chat message length in bytes (4 KiB)
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Default HTTP / WebSocket port
pub const DEFAULT_HTTP_PORT: u16 = 3000;
