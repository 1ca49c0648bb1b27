/// Application name
pub const APP_NAME: &str = "Campus Live";

/// Seconds after the last keystroke signal during which a user still counts
/// as typing.
pub const DEFAULT_TYPING_TTL_SECS: u64 = 3;

/// Interval between two system statistics refreshes, in seconds.
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 5;

/// Capacity of the broadcast channel that mirrors hub events to async
/// consumers.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Maximum length of a reaction emoji, in bytes.
pub const MAX_EMOJI_LEN: usize = 64;
