// src/engine.rs

//! The scheduler: drives periodic and on-demand refresh of all sources.
//!
//! One background task ticks at the fast-tier period; slower tiers are
//! decided per tick from their own last-run stamps. Every fetch runs as an
//! independent spawned task whose only effects are a store update and a log
//! line, so a slow upstream never stalls the tick loop and stopping the
//! engine never cancels an in-flight request.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::Result;
use crate::models::{EngineConfig, ScheduleConfig, Source, Tier};
use crate::services::{DirectoryResolver, SourceClients};
use crate::store::{AggregationStore, Snapshot};
use crate::utils::http;

/// Last-run stamps for the slow tiers. The fast tier runs every tick and
/// needs no stamp.
#[derive(Debug, Default)]
struct TierTimers {
    page_last: Option<Instant>,
    brand_last: Option<Instant>,
}

impl TierTimers {
    /// Tiers due at `now`, stamping the slow tiers that fire. Fast is always
    /// due; a slow tier fires when it has never run or its interval elapsed.
    fn due(&mut self, now: Instant, schedule: &ScheduleConfig) -> Vec<Tier> {
        let mut tiers = vec![Tier::Fast];

        let page_interval = Duration::from_secs(schedule.page_interval_secs);
        if self
            .page_last
            .is_none_or(|last| now.duration_since(last) >= page_interval)
        {
            self.page_last = Some(now);
            tiers.push(Tier::Page);
        }

        let brand_interval = Duration::from_secs(schedule.brand_interval_secs);
        if self
            .brand_last
            .is_none_or(|last| now.duration_since(last) >= brand_interval)
        {
            self.brand_last = Some(now);
            tiers.push(Tier::Brand);
        }

        tiers
    }

    /// Stamp every slow tier as though a sweep just ran, so the next regular
    /// tick does not re-trigger them.
    fn stamp_all(&mut self, now: Instant) {
        self.page_last = Some(now);
        self.brand_last = Some(now);
    }

    /// Forget all stamps; the next tick sweeps every tier.
    fn clear(&mut self) {
        self.page_last = None;
        self.brand_last = None;
    }
}

struct Shared {
    config: EngineConfig,
    store: AggregationStore,
    clients: SourceClients,
    directory: Arc<DirectoryResolver>,
    timers: Mutex<TierTimers>,
}

impl Shared {
    /// Fetch one source and record the outcome. Every failure kind reduces
    /// to "unavailable" plus a diagnostic log line; nothing propagates.
    async fn fetch_and_record(&self, source: Source) {
        match self.clients.fetch(source).await {
            Ok(reading) => {
                log::debug!("{source}: {:.2} at {}", reading.price, reading.observed_at);
                self.store
                    .mark_available(reading.source, reading.price, reading.observed_at);
            }
            Err(error) => {
                log::warn!("fetch failed: {error}");
                self.store.mark_unavailable(error.source());
            }
        }
    }

    fn spawn_fetch(self: &Arc<Self>, source: Source) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.fetch_and_record(source).await;
        });
    }

    async fn tick_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(
            self.config.schedule.fast_interval_ms,
        ));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let tiers = self
                .timers
                .lock()
                .expect("timer mutex poisoned")
                .due(Instant::now(), &self.config.schedule);
            for tier in tiers {
                for source in Source::in_tier(tier) {
                    self.spawn_fetch(source);
                }
            }
        }
    }
}

/// The aggregation engine: scheduler plus the read/command interface the
/// presentation layer consumes.
pub struct Engine {
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Build an engine from configuration. The initial selection is the
    /// spot API, matching the original app's startup view.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let directory_client = http::create_client(&config.http)?;
        let directory = Arc::new(DirectoryResolver::new(
            directory_client,
            config.providers.brands.directory_url.clone(),
        ));
        let clients = SourceClients::new(&config, Arc::clone(&directory))?;

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store: AggregationStore::new(Source::SpotApi),
                clients,
                directory,
                timers: Mutex::new(TierTimers::default()),
            }),
            ticker: Mutex::new(None),
        })
    }

    /// Start scheduling.
    ///
    /// Marks every source unavailable, fetches the current selection
    /// out-of-band for immediate responsiveness, makes sure the brand
    /// directory is populated before the first full sweep, then begins
    /// ticking. Calling start on a running engine restarts the ticker.
    pub async fn start(&self) {
        self.stop();
        self.shared.store.reset();

        // Selected source first; the user is looking at it.
        self.shared.spawn_fetch(self.shared.store.selected());

        if let Err(error) = self.shared.directory.ensure_loaded().await {
            log::warn!("brand directory not available at start: {error}");
        }

        self.shared
            .timers
            .lock()
            .expect("timer mutex poisoned")
            .clear();

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(shared.tick_loop());
        *self.ticker.lock().expect("ticker mutex poisoned") = Some(handle);
    }

    /// Cancel the periodic tick. In-flight fetches run to completion and
    /// still update the store.
    pub fn stop(&self) {
        if let Some(handle) = self
            .ticker
            .lock()
            .expect("ticker mutex poisoned")
            .take()
        {
            handle.abort();
        }
    }

    /// Change the selection and fetch only that source immediately.
    pub fn select_source(&self, source: Source) {
        self.shared.store.select(source);
        self.shared.spawn_fetch(source);
    }

    /// Fetch the current selection immediately.
    pub fn refresh_selected(&self) {
        self.shared.spawn_fetch(self.shared.store.selected());
    }

    /// Fetch every source immediately, out of cycle, and reset the tier
    /// timers as though this sweep were the scheduled run.
    pub fn force_refresh_all(&self) {
        self.shared
            .timers
            .lock()
            .expect("timer mutex poisoned")
            .stamp_all(Instant::now());
        for source in Source::ALL {
            self.shared.spawn_fetch(source);
        }
    }

    /// Refresh the brand directory; resolves when the refresh completes.
    pub async fn refresh_directory(&self) -> Result<usize> {
        self.shared.directory.refresh().await
    }

    /// Read-only, non-blocking copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.store.snapshot()
    }

    /// Change-notification channel for the presentation layer.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Snapshot> {
        self.shared.store.subscribe()
    }

    /// The brand directory resolver.
    pub fn directory(&self) -> &DirectoryResolver {
        &self.shared.directory
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineConfig;

    fn schedule() -> ScheduleConfig {
        ScheduleConfig {
            fast_interval_ms: 1000,
            page_interval_secs: 300,
            brand_interval_secs: 300,
        }
    }

    #[test]
    fn first_tick_sweeps_every_tier() {
        let mut timers = TierTimers::default();
        let tiers = timers.due(Instant::now(), &schedule());
        assert!(tiers.contains(&Tier::Fast));
        assert!(tiers.contains(&Tier::Page));
        assert!(tiers.contains(&Tier::Brand));
    }

    #[test]
    fn slow_tiers_wait_for_their_interval() {
        let mut timers = TierTimers::default();
        let start = Instant::now();
        timers.due(start, &schedule());

        // One fast period later: only the fast tier fires.
        let tiers = timers.due(start + Duration::from_secs(1), &schedule());
        assert_eq!(tiers, vec![Tier::Fast]);

        // Past the slow interval: everything fires again.
        let tiers = timers.due(start + Duration::from_secs(301), &schedule());
        assert!(tiers.contains(&Tier::Page));
        assert!(tiers.contains(&Tier::Brand));
    }

    #[test]
    fn force_refresh_stamp_suppresses_following_tick() {
        let mut timers = TierTimers::default();
        let now = Instant::now();
        timers.stamp_all(now);

        // The tick right after a forced sweep still refreshes the fast tier
        // but does not re-trigger the slow tiers.
        let tiers = timers.due(now + Duration::from_millis(1), &schedule());
        assert_eq!(tiers, vec![Tier::Fast]);
    }

    #[test]
    fn clear_makes_everything_due_again() {
        let mut timers = TierTimers::default();
        let now = Instant::now();
        timers.stamp_all(now);
        timers.clear();
        let tiers = timers.due(now + Duration::from_millis(1), &schedule());
        assert_eq!(tiers.len(), 3);
    }

    /// Config pointing every endpoint at a closed local port, so engine
    /// tests never reach the real upstreams.
    fn offline_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.providers.spot.url = "http://127.0.0.1:9/spot".into();
        config.providers.quote_page.url = "http://127.0.0.1:9/page".into();
        config.providers.exchange.url = "http://127.0.0.1:9/exchange".into();
        config.providers.brands.directory_url = "http://127.0.0.1:9/brands.js".into();
        config.providers.brands.quote_url = "http://127.0.0.1:9/brand?id={id}".into();
        config.http.timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn start_marks_every_source_unavailable() {
        let engine = Engine::new(offline_config()).expect("engine builds");
        engine.start().await;

        let snapshot = engine.snapshot();
        for source in Source::ALL {
            assert!(!snapshot.entry(source).available);
        }
        assert_eq!(snapshot.selected, Source::SpotApi);

        engine.stop();
    }

    #[tokio::test]
    async fn select_source_switches_view_before_any_fetch_lands() {
        let engine = Engine::new(offline_config()).expect("engine builds");
        engine.start().await;

        engine.select_source(Source::ChowTaiFook);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.selected, Source::ChowTaiFook);
        assert!(!snapshot.selected_available);
        assert!(!snapshot.entry(Source::ChowTaiFook).available);

        engine.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = Engine::new(offline_config()).expect("engine builds");
        engine.start().await;
        engine.stop();
        engine.stop();
    }
}
