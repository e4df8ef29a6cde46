//! Connection pool bookkeeping.
//!
//! # Responsibilities
//! - Track connection identifiers with last-use time and health flag
//! - Enforce a capacity limit on tracked entries
//! - Periodically evict idle entries and report aggregate health
//!
//! This does not own sockets. Components that need real pooling build it on
//! top and use the tracker for liveness accounting.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;

/// Default idle timeout after which entries are evicted.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct ConnectionEntry {
    last_used: Instant,
    healthy: bool,
}

/// Aggregate pool statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoolStats {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    /// Percentage of capacity in use.
    pub utilization: f64,
}

/// Capacity-bounded map of connection id → liveness record.
#[derive(Debug)]
pub struct ConnectionPool {
    connections: DashMap<String, ConnectionEntry>,
    max_connections: usize,
    idle_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(max_connections: usize, idle_timeout: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            max_connections,
            idle_timeout,
        }
    }

    /// Mark a tracked, healthy connection as used. Returns false when the id
    /// is unknown or unhealthy.
    pub fn get_connection(&self, id: &str) -> bool {
        match self.connections.get_mut(id) {
            Some(mut entry) if entry.healthy => {
                entry.last_used = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Start tracking `id`. Returns false when the pool is at capacity.
    /// Re-adding a known id refreshes it and marks it healthy.
    pub fn add_connection(&self, id: &str) -> bool {
        if let Some(mut entry) = self.connections.get_mut(id) {
            entry.last_used = Instant::now();
            entry.healthy = true;
            return true;
        }
        if self.connections.len() >= self.max_connections {
            tracing::debug!(id, max = self.max_connections, "Connection pool at capacity");
            return false;
        }
        self.connections.insert(
            id.to_string(),
            ConnectionEntry {
                last_used: Instant::now(),
                healthy: true,
            },
        );
        true
    }

    pub fn remove_connection(&self, id: &str) {
        self.connections.remove(id);
    }

    pub fn mark_unhealthy(&self, id: &str) {
        if let Some(mut entry) = self.connections.get_mut(id) {
            entry.healthy = false;
        }
    }

    pub fn is_tracked(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    pub fn stats(&self) -> PoolStats {
        // One pass so the counts agree with each other under concurrent adds.
        let (total, healthy) = self
            .connections
            .iter()
            .fold((0usize, 0usize), |(total, healthy), e| {
                (total + 1, healthy + usize::from(e.healthy))
            });
        let utilization = if self.max_connections == 0 {
            0.0
        } else {
            total as f64 * 100.0 / self.max_connections as f64
        };
        PoolStats {
            total,
            healthy,
            unhealthy: total.saturating_sub(healthy),
            utilization,
        }
    }

    /// Drop entries idle longer than the idle timeout. Returns how many were evicted.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) <= self.idle_timeout);
        before - self.connections.len()
    }

    /// One sweep: evict idle entries, publish gauges, log when unhealthy entries exist.
    pub fn sweep(&self) -> PoolStats {
        let evicted = self.evict_idle();
        let stats = self.stats();
        metrics::record_pool_stats(&stats);

        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle connections");
        }
        if stats.unhealthy > 0 {
            tracing::info!(
                total = stats.total,
                healthy = stats.healthy,
                unhealthy = stats.unhealthy,
                utilization = %format!("{:.2}%", stats.utilization),
                "Connection pool stats"
            );
        }
        stats
    }

    /// Background sweeper. Runs until the shutdown signal fires.
    pub async fn run(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = interval.as_secs(), "Connection pool sweeper starting");
        let mut ticker = time::interval(interval);
        // The first tick fires immediately; skip it so a fresh pool is not swept.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Connection pool sweeper received shutdown signal");
                    break;
                }
            }
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(10, DEFAULT_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_capacity_limit() {
        let pool = ConnectionPool::new(2, DEFAULT_IDLE_TIMEOUT);
        assert!(pool.add_connection("a"));
        assert!(pool.add_connection("b"));
        assert!(!pool.add_connection("c"));
        // Refreshing an existing id does not need spare capacity.
        assert!(pool.add_connection("a"));
        assert_eq!(pool.stats().total, 2);
    }

    #[test]
    fn test_unhealthy_connections_are_not_handed_out() {
        let pool = ConnectionPool::default();
        pool.add_connection("remote");
        assert!(pool.get_connection("remote"));
        pool.mark_unhealthy("remote");
        assert!(!pool.get_connection("remote"));
        assert!(!pool.get_connection("missing"));

        let stats = pool.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.healthy, 0);
        assert_eq!(stats.unhealthy, 1);
        assert!((stats.utilization - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_evicts_idle_entries() {
        let pool = ConnectionPool::new(5, Duration::from_millis(50));
        pool.add_connection("old");
        let later = Instant::now() + Duration::from_millis(200);
        pool.add_connection("fresh");
        assert_eq!(pool.evict_idle_at(later), 2);

        pool.add_connection("kept");
        assert_eq!(pool.evict_idle(), 0);
        assert!(pool.is_tracked("kept"));
    }

    #[test]
    fn test_stats_consistent_under_concurrent_adds() {
        let pool = Arc::new(ConnectionPool::new(10_000, DEFAULT_IDLE_TIMEOUT));
        let writer = {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for i in 0..2_000 {
                    pool.add_connection(&format!("conn-{i}"));
                    if i % 3 == 0 {
                        pool.mark_unhealthy(&format!("conn-{i}"));
                    }
                }
            })
        };

        while !writer.is_finished() {
            let stats = pool.stats();
            assert_eq!(stats.healthy + stats.unhealthy, stats.total);
        }
        writer.join().unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total, 2_000);
        assert_eq!(stats.unhealthy, 667);
    }

    #[test]
    fn test_remove() {
        let pool = ConnectionPool::default();
        pool.add_connection("x");
        pool.remove_connection("x");
        assert!(!pool.is_tracked("x"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let pool = Arc::new(ConnectionPool::new(5, Duration::from_millis(10)));
        pool.add_connection("idle");
        let (tx, rx) = broadcast::channel(1);

        let p = pool.clone();
        let handle = tokio::spawn(async move { p.run(Duration::from_millis(20), rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!pool.is_tracked("idle"));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
