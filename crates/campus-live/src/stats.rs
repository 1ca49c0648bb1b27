//! Last-known system statistics snapshot.

use tracing::trace;

use campus_shared::SystemStats;

/// Holds one [`SystemStats`] record. Updates replace it wholesale.
#[derive(Debug, Clone, Default)]
pub struct StatsHolder {
    current: SystemStats,
}

impl StatsHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, stats: SystemStats) -> SystemStats {
        self.current = stats;
        trace!(
            connected = self.current.connected_users,
            health = ?self.current.health,
            "System stats replaced"
        );
        self.current.clone()
    }

    /// The last stored snapshot, or `SystemStats::default()` before the
    /// first update.
    pub fn current(&self) -> SystemStats {
        self.current.clone()
    }
}
