//! Periodic system stats refresher.
//!
//! Every tick builds a complete new [`SystemStats`] from the previous
//! snapshot and the hub's live counts, then hands it to
//! [`Hub::update_system_stats`]. Resource figures are synthetic: they drift
//! randomly around their previous value.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Duration as ChronoDuration;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::debug;

use campus_live::Hub;
use campus_shared::{HealthStatus, SystemStats};

/// Counts read from the hub for one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveCounts {
    pub connected_users: u32,
    pub active_chats: u32,
    pub messages_last_hour: u32,
}

impl LiveCounts {
    pub fn read(hub: &Hub) -> Self {
        let hour_ago = hub.now() - ChronoDuration::hours(1);
        Self {
            connected_users: saturating_u32(hub.online_count()),
            active_chats: saturating_u32(hub.channels().len()),
            messages_last_hour: saturating_u32(hub.messages_since(hour_ago)),
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Build the snapshot that follows `prev`.
pub fn next_snapshot<R: Rng>(
    prev: &SystemStats,
    counts: LiveCounts,
    uptime: Duration,
    rng: &mut R,
) -> SystemStats {
    let cpu_usage = drift(prev.cpu_usage, 20.0..40.0, 8.0, rng);
    let memory_usage = drift(prev.memory_usage, 40.0..60.0, 4.0, rng);
    let disk_usage = drift(prev.disk_usage, 30.0..50.0, 0.5, rng);

    SystemStats {
        connected_users: counts.connected_users,
        active_chats: counts.active_chats,
        messages_per_hour: counts.messages_last_hour,
        health: health_for(cpu_usage, memory_usage, disk_usage),
        uptime: format_uptime(uptime),
        cpu_usage,
        memory_usage,
        disk_usage,
        network_latency_ms: rng.gen_range(12..=60),
    }
}

/// Move `prev` by at most `step` in either direction, staying within
/// 1..=99. A zero value is seeded from `initial`.
fn drift<R: Rng>(prev: f64, initial: std::ops::Range<f64>, step: f64, rng: &mut R) -> f64 {
    let value = if prev <= 0.0 {
        rng.gen_range(initial)
    } else {
        prev + rng.gen_range(-step..=step)
    };
    (value.clamp(1.0, 99.0) * 10.0).round() / 10.0
}

pub fn health_for(cpu: f64, memory: f64, disk: f64) -> HealthStatus {
    let worst = cpu.max(memory).max(disk);
    if worst >= 90.0 {
        HealthStatus::Critical
    } else if worst >= 75.0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

/// Render an uptime like `3d 4h 12m`, dropping leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let total_minutes = uptime.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Refresh the hub's stats every `every` until the task is aborted.
pub fn spawn(hub: Arc<Hub>, every: Duration) -> JoinHandle<()> {
    let started = Instant::now();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;

            let prev = hub.get_system_stats();
            let counts = LiveCounts::read(&hub);
            let snapshot = {
                let mut rng = rand::thread_rng();
                next_snapshot(&prev, counts, started.elapsed(), &mut rng)
            };

            debug!(
                connected = snapshot.connected_users,
                chats = snapshot.active_chats,
                health = ?snapshot.health,
                "Refreshing system stats"
            );
            hub.update_system_stats(snapshot);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_live::HubConfig;
    use campus_shared::{MessageDraft, PresenceStatus, Role, User};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m");
        assert_eq!(format_uptime(Duration::from_secs(61 * 60)), "1h 1m");
        assert_eq!(
            format_uptime(Duration::from_secs(2 * 86_400 + 3 * 3600 + 5 * 60)),
            "2d 3h 5m"
        );
    }

    #[test]
    fn test_health_thresholds() {
        assert_eq!(health_for(30.0, 50.0, 40.0), HealthStatus::Healthy);
        assert_eq!(health_for(80.0, 50.0, 40.0), HealthStatus::Degraded);
        assert_eq!(health_for(30.0, 95.0, 40.0), HealthStatus::Critical);
    }

    #[test]
    fn test_next_snapshot_is_full_record() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = LiveCounts {
            connected_users: 3,
            active_chats: 2,
            messages_last_hour: 40,
        };

        let first = next_snapshot(
            &SystemStats::default(),
            counts,
            Duration::from_secs(600),
            &mut rng,
        );
        assert_eq!(first.connected_users, 3);
        assert_eq!(first.active_chats, 2);
        assert_eq!(first.messages_per_hour, 40);
        assert_eq!(first.uptime, "10m");
        assert!((20.0..=40.0).contains(&first.cpu_usage));
        assert!((12..=60).contains(&first.network_latency_ms));

        let second = next_snapshot(&first, counts, Duration::from_secs(605), &mut rng);
        assert!((second.cpu_usage - first.cpu_usage).abs() <= 8.1);
        assert!((1.0..=99.0).contains(&second.memory_usage));
    }

    #[test]
    fn test_live_counts_from_hub() {
        let hub = Hub::new(HubConfig::default());
        let alice = hub.add_user(User::new("u1", "Alice", Role::Student)).unwrap();
        hub.add_user(User::new("u2", "Bob", Role::Teacher).with_status(PresenceStatus::Offline))
            .unwrap();
        hub.add_message("general", MessageDraft::from_user(&alice, "hi"))
            .unwrap();
        hub.add_message("projects", MessageDraft::from_user(&alice, "status?"))
            .unwrap();

        assert_eq!(
            LiveCounts::read(&hub),
            LiveCounts {
                connected_users: 1,
                active_chats: 2,
                messages_last_hour: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_spawned_refresher_updates_hub() {
        let hub = Arc::new(Hub::new(HubConfig::default()));
        hub.add_user(User::new("u1", "Alice", Role::Student)).unwrap();
        let mut rx = hub.subscribe();

        let task = spawn(Arc::clone(&hub), Duration::from_secs(5));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), campus_shared::EventKind::SystemStatsUpdated);
        assert_eq!(hub.get_system_stats().connected_users, 1);

        task.abort();
    }
}
