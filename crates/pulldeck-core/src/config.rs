//! Runtime configuration handed to the engine and session store at startup

use std::time::Duration;

/// Default body chunk written per I/O call
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Default session lifetime
pub const DEFAULT_SESSION_VALIDITY: Duration = Duration::from_secs(30 * 60);

/// Download engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on bytes written per chunk
    pub chunk_size: usize,
    /// Maximum number of transfers streaming at once (None = unbounded)
    pub max_concurrent: Option<usize>,
    /// Fail a transfer when no body bytes arrive for this long
    pub stall_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent: None,
            stall_timeout: None,
            user_agent: format!("PullDeck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Session store settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub validity: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            validity: DEFAULT_SESSION_VALIDITY,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub engine: EngineConfig,
    pub session: SessionConfig,
}
