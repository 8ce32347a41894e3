//! Per-destination backlog sampling with a TTL cache.
//!
//! The cache is shared by every batch running in the same worker. Refreshes
//! are serialized through `refresh_lock`; readers clone the current
//! `Arc<LoadSnapshot>` and may see a snapshot up to one TTL old.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use contracts::{DepthOracle, Destination, DestinationId};
use observability::{record_depth_query_failure, record_destination_depth, record_load_refresh};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Last known load of one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationLoad {
    /// Approximate backlog
    pub depth: u64,
    /// When `depth` was obtained (or carried over)
    pub sampled_at: Instant,
    /// True when the last query failed and `depth` is a fallback value
    pub degraded: bool,
}

/// Depths of every registered destination at one point in time
#[derive(Debug, Clone)]
pub struct LoadSnapshot {
    taken_at: Instant,
    loads: BTreeMap<DestinationId, DestinationLoad>,
}

impl LoadSnapshot {
    /// Build a snapshot from plain depths (all sampled now, none degraded)
    pub fn from_depths(depths: impl IntoIterator<Item = (DestinationId, u64)>) -> Self {
        let now = Instant::now();
        let loads = depths
            .into_iter()
            .map(|(id, depth)| {
                (
                    id,
                    DestinationLoad {
                        depth,
                        sampled_at: now,
                        degraded: false,
                    },
                )
            })
            .collect();
        Self {
            taken_at: now,
            loads,
        }
    }

    pub fn taken_at(&self) -> Instant {
        self.taken_at
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.taken_at)
    }

    /// Strictly younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    pub fn get(&self, destination: &str) -> Option<&DestinationLoad> {
        self.loads.get(destination)
    }

    pub fn depth(&self, destination: &str) -> Option<u64> {
        self.get(destination).map(|load| load.depth)
    }

    /// Destination -> depth view used by weight calculation
    pub fn depths(&self) -> BTreeMap<DestinationId, u64> {
        self.loads
            .iter()
            .map(|(id, load)| (id.clone(), load.depth))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DestinationId, &DestinationLoad)> {
        self.loads.iter()
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    /// Destinations whose depth is a fallback value
    pub fn degraded_count(&self) -> usize {
        self.loads.values().filter(|load| load.degraded).count()
    }
}

/// Cached backlog sampler over a [`DepthOracle`]
pub struct LoadSampler<O> {
    oracle: O,
    destinations: Vec<Destination>,
    ttl: Duration,
    cache: RwLock<Option<Arc<LoadSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl<O: DepthOracle + Sync> LoadSampler<O> {
    /// Create a sampler for `destinations` with cache lifetime `ttl`
    pub fn new(oracle: O, destinations: Vec<Destination>, ttl: Duration) -> Self {
        Self {
            oracle,
            destinations,
            ttl,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Look up a registered destination by id
    pub fn destination(&self, id: &str) -> Option<&Destination> {
        self.destinations.iter().find(|d| d.id == id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Current cached snapshot regardless of age
    pub async fn cached(&self) -> Option<Arc<LoadSnapshot>> {
        self.cache.read().await.clone()
    }

    /// Drop the cached snapshot; the next call re-queries every destination
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Current loads, served from cache while younger than the TTL
    ///
    /// Never fails: a destination whose query fails keeps its previous
    /// depth, or 0 if it was never sampled.
    pub async fn get_loads(&self, force_refresh: bool) -> Arc<LoadSnapshot> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                debug!(
                    age_ms = snapshot.age().as_millis() as u64,
                    "Using cached destination loads"
                );
                return snapshot;
            }
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited for the lock
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot().await {
                return snapshot;
            }
        }

        let previous = self.cached().await;
        let snapshot = Arc::new(self.sample(previous.as_deref()).await);
        *self.cache.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }

    async fn fresh_snapshot(&self) -> Option<Arc<LoadSnapshot>> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|snapshot| snapshot.is_fresh(self.ttl))
            .cloned()
    }

    #[instrument(
        name = "load_sampler_refresh",
        skip(self, previous),
        fields(destinations = self.destinations.len())
    )]
    async fn sample(&self, previous: Option<&LoadSnapshot>) -> LoadSnapshot {
        let started = Instant::now();
        let mut loads = BTreeMap::new();

        for destination in &self.destinations {
            let load = match self.oracle.queue_depth(destination).await {
                Ok(depth) => {
                    record_destination_depth(destination.id.as_str(), depth);
                    DestinationLoad {
                        depth,
                        sampled_at: Instant::now(),
                        degraded: false,
                    }
                }
                Err(e) => {
                    record_depth_query_failure(destination.id.as_str());
                    self.fallback_load(destination, previous, &e.to_string())
                }
            };
            loads.insert(destination.id.clone(), load);
        }

        let elapsed = started.elapsed();
        record_load_refresh(elapsed.as_secs_f64() * 1000.0);

        let snapshot = LoadSnapshot {
            taken_at: Instant::now(),
            loads,
        };
        info!(
            degraded = snapshot.degraded_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Destination loads refreshed"
        );
        snapshot
    }

    /// Degraded branch: keep the previous value, or assume an empty queue
    fn fallback_load(
        &self,
        destination: &Destination,
        previous: Option<&LoadSnapshot>,
        error: &str,
    ) -> DestinationLoad {
        match previous.and_then(|s| s.get(destination.id.as_str())) {
            Some(last) => {
                warn!(
                    destination = %destination.id,
                    fallback_depth = last.depth,
                    error,
                    "Depth query failed, keeping previous depth"
                );
                DestinationLoad {
                    depth: last.depth,
                    sampled_at: last.sampled_at,
                    degraded: true,
                }
            }
            None => {
                warn!(
                    destination = %destination.id,
                    error,
                    "Depth query failed with no previous sample, assuming depth 0"
                );
                DestinationLoad {
                    depth: 0,
                    sampled_at: Instant::now(),
                    degraded: true,
                }
            }
        }
    }
}
